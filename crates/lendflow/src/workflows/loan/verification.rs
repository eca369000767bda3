use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::audit::{AuditDetails, AuditEntry, AuditEventType, AuditTrailRecorder};
use super::domain::{
    ActorId, ActorToken, ApplicationId, DocumentId, DocumentKind, DocumentVerificationRecord,
    LoanApplication, LoanApplicationStatus, VerificationDecision, VerificationStatus,
};
use super::error::WorkflowError;
use super::repository::{
    ActorDirectory, ApplicationRepository, AuditTrail, Clock, DocumentLock, DocumentVault,
};
use super::status::{StatusTransitionEngine, TransitionRequest};

/// Upper bound on a single bulk verification batch.
pub const MAX_BULK_ITEMS: usize = 100;

/// Reviewer decision payload for a single document.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationRequest {
    pub decision: VerificationDecision,
    pub rejection_reason: Option<String>,
    pub notes: Option<String>,
}

/// One item of a bulk verification batch.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkVerificationItem {
    pub document_id: DocumentId,
    pub document_kind: DocumentKind,
    pub decision: VerificationDecision,
    pub rejection_reason: Option<String>,
    pub notes: Option<String>,
}

/// Per-item outcome of a bulk batch; `error` carries the machine code of the
/// failure when `success` is false.
#[derive(Debug, Clone, Serialize)]
pub struct BulkItemOutcome {
    pub document_id: DocumentId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate result of a bulk batch. Partial success is expected and
/// reported, never hidden.
#[derive(Debug, Clone, Serialize)]
pub struct BulkVerificationOutcome {
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BulkItemOutcome>,
}

/// Receipt returned when document review for an application is completed.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionReceipt {
    pub application_id: ApplicationId,
    pub status: LoanApplicationStatus,
    pub completed_at: DateTime<Utc>,
    pub completed_by: ActorId,
}

/// Per-application verification state for evidentiary documents.
///
/// A verification decision exclusively locks the document to the deciding
/// application: a second application cannot verify the same document until
/// the lock is released, while the holding application may re-decide in
/// place. The record upsert and the lock mutation commit as one atomic store
/// call.
pub struct DocumentVerificationLedger<R, V, T, D> {
    repository: Arc<R>,
    vault: Arc<V>,
    directory: Arc<D>,
    recorder: AuditTrailRecorder<T, D>,
    engine: StatusTransitionEngine<R, V, T, D>,
    clock: Arc<dyn Clock>,
}

impl<R, V, T, D> DocumentVerificationLedger<R, V, T, D>
where
    R: ApplicationRepository,
    V: DocumentVault,
    T: AuditTrail,
    D: ActorDirectory,
{
    pub fn new(
        repository: Arc<R>,
        vault: Arc<V>,
        directory: Arc<D>,
        recorder: AuditTrailRecorder<T, D>,
        engine: StatusTransitionEngine<R, V, T, D>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            vault,
            directory,
            recorder,
            engine,
            clock,
        }
    }

    /// Apply a reviewer decision to one document.
    pub fn verify(
        &self,
        application_id: &ApplicationId,
        kind: DocumentKind,
        document_id: &DocumentId,
        actor: &ActorToken,
        request: VerificationRequest,
    ) -> Result<DocumentVerificationRecord, WorkflowError> {
        let application = self.fetch_application(application_id)?;
        require_verification_stage(&application)?;

        let reviewer = self
            .directory
            .resolve(actor)
            .map_err(|_| WorkflowError::Unauthorized)?;

        let document = self
            .vault
            .find_document(&application.borrower, kind, document_id)?
            .ok_or_else(|| WorkflowError::DocumentNotFound(document_id.clone()))?;

        let rejection_reason = match request.decision {
            VerificationDecision::Rejected => {
                let reason = request
                    .rejection_reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|reason| !reason.is_empty())
                    .ok_or(WorkflowError::MissingRejectionReason)?;
                Some(reason.to_string())
            }
            VerificationDecision::Approved => None,
        };

        if let Some(holder) = &document.verified_for_application {
            if holder != application_id {
                return Err(WorkflowError::DocumentAlreadyVerified {
                    held_by: holder.clone(),
                });
            }
        }

        let now = self.clock.now();
        let record = DocumentVerificationRecord {
            application_id: application_id.clone(),
            document_kind: kind,
            document_id: document_id.clone(),
            status: request.decision.into(),
            verified_by: Some(reviewer.id.clone()),
            verified_at: Some(now),
            rejection_reason: rejection_reason.clone(),
            notes: request.notes.clone(),
        };
        let lock = DocumentLock {
            borrower: application.borrower.clone(),
            document_kind: kind,
            document_id: document_id.clone(),
            application_id: application_id.clone(),
            locked_at: now,
        };
        self.vault.commit_verification(record.clone(), lock)?;

        let (event_type, verdict) = match request.decision {
            VerificationDecision::Approved => (AuditEventType::DocumentVerifiedApproved, "approved"),
            VerificationDecision::Rejected => (AuditEventType::DocumentVerifiedRejected, "rejected"),
        };
        self.recorder.record(AuditEntry {
            application_id: application_id.clone(),
            actor: Some(reviewer.into()),
            event_type,
            title: format!("Document {verdict}: {}", document.name),
            description: request.notes,
            previous_status: None,
            new_status: None,
            details: AuditDetails::new()
                .entry("document_id", document_id.0.clone())
                .entry("document_kind", kind.label())
                .entry("decision", verdict)
                .entry_opt("rejection_reason", rejection_reason),
        });

        Ok(record)
    }

    /// Best-effort batch: every item goes through the single-item path on its
    /// own, so one failure never rolls back or blocks the others.
    pub fn bulk_verify(
        &self,
        application_id: &ApplicationId,
        actor: &ActorToken,
        items: Vec<BulkVerificationItem>,
    ) -> Result<BulkVerificationOutcome, WorkflowError> {
        if items.is_empty() || items.len() > MAX_BULK_ITEMS {
            return Err(WorkflowError::Validation(format!(
                "bulk verification accepts 1 to {MAX_BULK_ITEMS} items"
            )));
        }

        let mut results = Vec::with_capacity(items.len());
        let mut successful = 0;
        let mut failed = 0;
        for item in items {
            let outcome = self.verify(
                application_id,
                item.document_kind,
                &item.document_id,
                actor,
                VerificationRequest {
                    decision: item.decision,
                    rejection_reason: item.rejection_reason,
                    notes: item.notes,
                },
            );
            match outcome {
                Ok(_) => {
                    successful += 1;
                    results.push(BulkItemOutcome {
                        document_id: item.document_id,
                        success: true,
                        error: None,
                    });
                }
                Err(err) => {
                    failed += 1;
                    results.push(BulkItemOutcome {
                        document_id: item.document_id,
                        success: false,
                        error: Some(err.code().to_string()),
                    });
                }
            }
        }

        Ok(BulkVerificationOutcome {
            successful,
            failed,
            results,
        })
    }

    /// Close the verification stage and advance the pipeline. Requires at
    /// least one record to have moved out of `pending`.
    pub fn complete_verification(
        &self,
        application_id: &ApplicationId,
        actor: &ActorToken,
    ) -> Result<CompletionReceipt, WorkflowError> {
        let application = self.fetch_application(application_id)?;
        require_verification_stage(&application)?;

        let reviewer = self
            .directory
            .resolve(actor)
            .map_err(|_| WorkflowError::Unauthorized)?;

        let reviewed = self
            .vault
            .records_for_application(application_id)?
            .iter()
            .filter(|record| record.status != VerificationStatus::Pending)
            .count();
        if reviewed == 0 {
            return Err(WorkflowError::NoDocumentsReviewed);
        }

        let updated = self.engine.transition(
            application_id,
            Some(actor.clone()),
            TransitionRequest::to(LoanApplicationStatus::EligibilityAssessment),
        )?;

        self.recorder.record(AuditEntry {
            application_id: application_id.clone(),
            actor: Some(reviewer.clone().into()),
            event_type: AuditEventType::KycKybCompleted,
            title: "KYC/KYB verification completed".to_string(),
            description: None,
            previous_status: Some(LoanApplicationStatus::KycKybVerification),
            new_status: Some(updated.status),
            details: AuditDetails::new().entry("reviewed_documents", reviewed as u64),
        });

        Ok(CompletionReceipt {
            application_id: application_id.clone(),
            status: updated.status,
            completed_at: self.clock.now(),
            completed_by: reviewer.id,
        })
    }

    /// Idempotently create `pending` records for every currently-known
    /// borrower document. Non-throwing: callers must not depend on it, since
    /// records are also created lazily on first decision.
    pub fn bootstrap(&self, application_id: &ApplicationId) -> usize {
        let application = match self.fetch_application(application_id) {
            Ok(application) => application,
            Err(err) => {
                warn!(application = %application_id, "ledger bootstrap skipped: {err}");
                return 0;
            }
        };
        match bootstrap_pending_records(self.vault.as_ref(), &application) {
            Ok(created) => created,
            Err(err) => {
                warn!(application = %application_id, "ledger bootstrap failed: {err}");
                0
            }
        }
    }

    fn fetch_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<LoanApplication, WorkflowError> {
        self.repository
            .fetch(application_id)?
            .ok_or_else(|| WorkflowError::ApplicationNotFound(application_id.clone()))
    }
}

fn require_verification_stage(application: &LoanApplication) -> Result<(), WorkflowError> {
    if application.status != LoanApplicationStatus::KycKybVerification {
        return Err(WorkflowError::InvalidStatus {
            required: LoanApplicationStatus::KycKybVerification,
            current: application.status,
        });
    }
    Ok(())
}

/// Create `pending` records for borrower documents that have none for this
/// application. Shared by the ledger's `bootstrap` and the transition
/// engine's stage-entry side effect.
pub(crate) fn bootstrap_pending_records<V: DocumentVault>(
    vault: &V,
    application: &LoanApplication,
) -> Result<usize, WorkflowError> {
    let mut created = 0;
    for document in vault.documents_for(&application.borrower)? {
        let record = DocumentVerificationRecord::pending(
            application.id.clone(),
            document.kind,
            document.id.clone(),
        );
        if vault.insert_pending(record)? {
            created += 1;
        }
    }
    Ok(created)
}
