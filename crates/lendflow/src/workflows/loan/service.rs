use std::sync::Arc;

use super::audit::{AuditDetails, AuditEntry, AuditEventType, AuditTrailRecorder};
use super::display_code::{self, DisplayCodeAllocator};
use super::domain::{
    ActorToken, ApplicationId, ContractStatus, DocumentId, DocumentKind,
    DocumentVerificationRecord, LoanApplication, LoanApplicationStatus, LoanIntake,
};
use super::error::WorkflowError;
use super::repository::{
    ActorDirectory, ApplicationRepository, AuditTrail, Clock, DocumentVault, IdGenerator,
};
use super::status::{StatusTransitionEngine, TransitionRequest};
use super::timeline::{ContractTimeline, TimelineAudience, TimelineEvent, TimelineProjector};
use super::verification::{
    BulkVerificationItem, BulkVerificationOutcome, CompletionReceipt, DocumentVerificationLedger,
    VerificationRequest,
};

/// Facade composing the transition engine, verification ledger, audit
/// recorder, and timeline projector over shared ports. This is the unit the
/// HTTP layer holds.
pub struct LoanWorkflowService<R, V, T, D> {
    repository: Arc<R>,
    engine: StatusTransitionEngine<R, V, T, D>,
    ledger: DocumentVerificationLedger<R, V, T, D>,
    projector: TimelineProjector<R, T>,
    recorder: AuditTrailRecorder<T, D>,
    ids: Arc<dyn IdGenerator>,
    codes: Arc<dyn DisplayCodeAllocator>,
    clock: Arc<dyn Clock>,
}

impl<R, V, T, D> LoanWorkflowService<R, V, T, D>
where
    R: ApplicationRepository + 'static,
    V: DocumentVault + 'static,
    T: AuditTrail + 'static,
    D: ActorDirectory + 'static,
{
    pub fn new(
        repository: Arc<R>,
        vault: Arc<V>,
        trail: Arc<T>,
        directory: Arc<D>,
        ids: Arc<dyn IdGenerator>,
        codes: Arc<dyn DisplayCodeAllocator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let recorder = AuditTrailRecorder::new(trail.clone(), directory.clone(), clock.clone());
        let engine = StatusTransitionEngine::new(
            repository.clone(),
            vault.clone(),
            recorder.clone(),
            clock.clone(),
        );
        let ledger = DocumentVerificationLedger::new(
            repository.clone(),
            vault,
            directory,
            recorder.clone(),
            engine.clone(),
            clock.clone(),
        );
        let projector = TimelineProjector::new(repository.clone(), trail);

        Self {
            repository,
            engine,
            ledger,
            projector,
            recorder,
            ids,
            codes,
            clock,
        }
    }

    /// Register a new application in `submitted` with a freshly allocated
    /// display code.
    pub fn create(
        &self,
        intake: LoanIntake,
        actor: Option<ActorToken>,
    ) -> Result<LoanApplication, WorkflowError> {
        if intake.terms.amount_minor <= 0 {
            return Err(WorkflowError::Validation(
                "loan amount must be positive".to_string(),
            ));
        }
        if intake.terms.term_months == 0 {
            return Err(WorkflowError::Validation(
                "loan term must be at least one month".to_string(),
            ));
        }
        if intake.terms.currency.len() != 3 {
            return Err(WorkflowError::Validation(
                "currency must be a three-letter ISO code".to_string(),
            ));
        }

        let display_code = display_code::allocate(self.codes.as_ref())?;
        let now = self.clock.now();
        let application = LoanApplication {
            id: self.ids.next_application_id(),
            display_code: display_code.clone(),
            borrower: intake.borrower,
            funded_entity: intake.funded_entity,
            terms: intake.terms,
            status: LoanApplicationStatus::Submitted,
            rejection_reason: None,
            contract_status: ContractStatus::NotStarted,
            submitted_at: now,
            approved_at: None,
            rejected_at: None,
            disbursed_at: None,
            cancelled_at: None,
        };
        let stored = self.repository.insert(application)?;

        self.recorder.record(AuditEntry {
            application_id: stored.id.clone(),
            actor: actor.map(Into::into),
            event_type: AuditEventType::ApplicationSubmitted,
            title: "Application submitted".to_string(),
            description: None,
            previous_status: None,
            new_status: Some(LoanApplicationStatus::Submitted),
            details: AuditDetails::new()
                .entry("display_code", display_code)
                .entry("amount_minor", stored.terms.amount_minor)
                .entry("currency", stored.terms.currency.clone()),
        });

        Ok(stored)
    }

    pub fn get(&self, id: &ApplicationId) -> Result<LoanApplication, WorkflowError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| WorkflowError::ApplicationNotFound(id.clone()))
    }

    pub fn transition(
        &self,
        id: &ApplicationId,
        actor: Option<ActorToken>,
        request: TransitionRequest,
    ) -> Result<LoanApplication, WorkflowError> {
        self.engine.transition(id, actor, request)
    }

    pub fn verify_document(
        &self,
        id: &ApplicationId,
        kind: DocumentKind,
        document_id: &DocumentId,
        actor: &ActorToken,
        request: VerificationRequest,
    ) -> Result<DocumentVerificationRecord, WorkflowError> {
        self.ledger.verify(id, kind, document_id, actor, request)
    }

    pub fn bulk_verify(
        &self,
        id: &ApplicationId,
        actor: &ActorToken,
        items: Vec<BulkVerificationItem>,
    ) -> Result<BulkVerificationOutcome, WorkflowError> {
        self.ledger.bulk_verify(id, actor, items)
    }

    pub fn complete_verification(
        &self,
        id: &ApplicationId,
        actor: &ActorToken,
    ) -> Result<CompletionReceipt, WorkflowError> {
        self.ledger.complete_verification(id, actor)
    }

    pub fn bootstrap_verification(&self, id: &ApplicationId) -> usize {
        self.ledger.bootstrap(id)
    }

    pub fn timeline(
        &self,
        id: &ApplicationId,
        audience: TimelineAudience,
    ) -> Result<Vec<TimelineEvent>, WorkflowError> {
        self.projector.project(id, audience)
    }

    pub fn contract_timeline(&self, id: &ApplicationId) -> Result<ContractTimeline, WorkflowError> {
        self.projector.contract_timeline(id)
    }

    /// Record that the contract packet went out to the applicant.
    pub fn mark_contract_sent(
        &self,
        id: &ApplicationId,
        actor: &ActorToken,
    ) -> Result<LoanApplication, WorkflowError> {
        self.advance_contract(
            id,
            actor,
            ContractStatus::NotStarted,
            ContractStatus::Sent,
            AuditEventType::ContractSent,
            "Contract sent for signature",
        )
    }

    /// Record that the applicant returned a signed contract.
    pub fn mark_contract_signed(
        &self,
        id: &ApplicationId,
        actor: &ActorToken,
    ) -> Result<LoanApplication, WorkflowError> {
        self.advance_contract(
            id,
            actor,
            ContractStatus::Sent,
            ContractStatus::Signed,
            AuditEventType::ContractSigned,
            "Contract signed",
        )
    }

    fn advance_contract(
        &self,
        id: &ApplicationId,
        actor: &ActorToken,
        expected: ContractStatus,
        next: ContractStatus,
        event_type: AuditEventType,
        title: &str,
    ) -> Result<LoanApplication, WorkflowError> {
        let mut application = self.get(id)?;
        if application.status != LoanApplicationStatus::ContractSigning {
            return Err(WorkflowError::InvalidStatus {
                required: LoanApplicationStatus::ContractSigning,
                current: application.status,
            });
        }
        if application.contract_status != expected {
            return Err(WorkflowError::Validation(format!(
                "contract is not in the '{}' sub-state",
                expected.label()
            )));
        }

        application.contract_status = next;
        self.repository.update(application.clone())?;

        self.recorder.record(AuditEntry {
            application_id: id.clone(),
            actor: Some(actor.clone().into()),
            event_type,
            title: title.to_string(),
            description: None,
            previous_status: None,
            new_status: None,
            details: AuditDetails::new().entry("contract_status", next.label()),
        });

        Ok(application)
    }
}
