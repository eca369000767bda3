use std::sync::Arc;

use tracing::{debug, warn};

use super::audit::{AuditDetails, AuditEntry, AuditEventType, AuditTrailRecorder};
use super::domain::{ActorToken, ApplicationId, LoanApplication, LoanApplicationStatus};
use super::error::WorkflowError;
use super::repository::{ActorDirectory, ApplicationRepository, AuditTrail, Clock, DocumentVault};
use super::verification;

/// Requested status change, with the optional operator note and the
/// rejection reason that becomes mandatory when the target is `rejected`.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub new_status: LoanApplicationStatus,
    pub reason: Option<String>,
    pub rejection_reason: Option<String>,
}

impl TransitionRequest {
    pub fn to(status: LoanApplicationStatus) -> Self {
        Self {
            new_status: status,
            reason: None,
            rejection_reason: None,
        }
    }

    pub fn with_rejection_reason(mut self, reason: impl Into<String>) -> Self {
        self.rejection_reason = Some(reason.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Validates and applies application status changes.
///
/// Guards, in order: the application must exist, the target must differ from
/// the current status, the current status must not be terminal, and a move to
/// `rejected` must carry a reason. Pipeline order between non-terminal stages
/// is deliberately not enforced (administrative override kept from the source
/// system; see DESIGN.md).
pub struct StatusTransitionEngine<R, V, T, D> {
    repository: Arc<R>,
    vault: Arc<V>,
    recorder: AuditTrailRecorder<T, D>,
    clock: Arc<dyn Clock>,
}

impl<R, V, T, D> Clone for StatusTransitionEngine<R, V, T, D> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            vault: self.vault.clone(),
            recorder: self.recorder.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<R, V, T, D> StatusTransitionEngine<R, V, T, D>
where
    R: ApplicationRepository,
    V: DocumentVault,
    T: AuditTrail,
    D: ActorDirectory,
{
    pub fn new(
        repository: Arc<R>,
        vault: Arc<V>,
        recorder: AuditTrailRecorder<T, D>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            vault,
            recorder,
            clock,
        }
    }

    pub fn transition(
        &self,
        id: &ApplicationId,
        actor: Option<ActorToken>,
        request: TransitionRequest,
    ) -> Result<LoanApplication, WorkflowError> {
        let new_status = request.new_status;
        let mut application = self
            .repository
            .fetch(id)?
            .ok_or_else(|| WorkflowError::ApplicationNotFound(id.clone()))?;
        let current = application.status;

        if new_status == current {
            return Err(WorkflowError::NoOp { current });
        }
        if current.is_terminal() {
            return Err(WorkflowError::InvalidTransition {
                current,
                requested: new_status,
            });
        }

        let rejection_reason = match new_status {
            LoanApplicationStatus::Rejected => {
                let reason = request
                    .rejection_reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|reason| !reason.is_empty())
                    .ok_or(WorkflowError::MissingRejectionReason)?;
                Some(reason.to_string())
            }
            _ => None,
        };

        let now = self.clock.now();
        let reason_was_set = application.rejection_reason.is_some();

        application.status = new_status;
        application.rejection_reason = rejection_reason.clone();
        if new_status.is_terminal() && application.terminal_reached_at(new_status).is_none() {
            application.set_terminal_reached_at(new_status, now);
        }

        self.repository.update(application.clone())?;

        let (event_type, title) = event_for(new_status);
        let mut details = AuditDetails::new()
            .entry_opt("reason", request.reason.clone())
            .entry_opt("rejection_reason", rejection_reason);
        if reason_was_set && new_status != LoanApplicationStatus::Rejected {
            details = details.cleared("rejection_reason");
        }
        self.recorder.record(AuditEntry {
            application_id: id.clone(),
            actor: actor.map(Into::into),
            event_type,
            title,
            description: request.reason,
            previous_status: Some(current),
            new_status: Some(new_status),
            details,
        });

        // Convenience pre-population; verification records are also created
        // lazily on first decision, so a failure here is only logged.
        if new_status == LoanApplicationStatus::KycKybVerification {
            match verification::bootstrap_pending_records(self.vault.as_ref(), &application) {
                Ok(created) => {
                    debug!(application = %id, created, "verification ledger bootstrapped");
                }
                Err(err) => {
                    warn!(application = %id, "verification ledger bootstrap failed: {err}");
                }
            }
        }

        Ok(application)
    }
}

/// Status to audit event mapping: non-terminal review stages share the
/// generic stage-entry type with the stage name in the title, while
/// `awaiting_disbursement` and the terminal statuses carry their own types.
pub(crate) fn event_for(status: LoanApplicationStatus) -> (AuditEventType, String) {
    match status {
        LoanApplicationStatus::Submitted => (
            AuditEventType::ApplicationSubmitted,
            "Application submitted".to_string(),
        ),
        LoanApplicationStatus::KycKybVerification
        | LoanApplicationStatus::EligibilityAssessment
        | LoanApplicationStatus::ContractSigning => (
            AuditEventType::ReviewStageEntered,
            format!("Review in progress: {}", status.stage_name()),
        ),
        LoanApplicationStatus::AwaitingDisbursement => (
            AuditEventType::AwaitingDisbursement,
            "Awaiting disbursement".to_string(),
        ),
        LoanApplicationStatus::Approved => (
            AuditEventType::ApplicationApproved,
            "Application approved".to_string(),
        ),
        LoanApplicationStatus::Rejected => (
            AuditEventType::ApplicationRejected,
            "Application rejected".to_string(),
        ),
        LoanApplicationStatus::Disbursed => (
            AuditEventType::ApplicationDisbursed,
            "Funds disbursed".to_string(),
        ),
        LoanApplicationStatus::Cancelled => (
            AuditEventType::ApplicationCancelled,
            "Application cancelled".to_string(),
        ),
    }
}
