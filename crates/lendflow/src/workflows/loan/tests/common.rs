use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::workflows::loan::audit::{AuditEvent, NewAuditEvent};
use crate::workflows::loan::display_code::{DisplayCodeAllocator, ReserveOutcome};
use crate::workflows::loan::domain::{
    Actor, ActorId, ActorRole, ActorToken, ApplicationId, BorrowerId, ContractStatus, Document,
    DocumentId, DocumentKind, LoanApplication, LoanApplicationStatus, LoanIntake, LoanTerms,
};
use crate::workflows::loan::repository::{
    ActorDirectory, ApplicationRepository, AuditStoreError, AuditTrail, Clock, DirectoryError,
    IdGenerator, RepositoryError,
};
use crate::workflows::loan::service::LoanWorkflowService;

pub(super) use crate::workflows::loan::memory::{
    InMemoryApplicationRepository as MemoryRepository, InMemoryAuditTrail as MemoryTrail,
    InMemoryDocumentVault as MemoryVault,
};

pub(super) const REVIEWER_TOKEN: &str = "token-reviewer";
pub(super) const ADMIN_TOKEN: &str = "token-admin";

pub(super) fn reviewer_token() -> ActorToken {
    ActorToken(REVIEWER_TOKEN.to_string())
}

pub(super) fn admin_token() -> ActorToken {
    ActorToken(ADMIN_TOKEN.to_string())
}

pub(super) fn borrower() -> BorrowerId {
    BorrowerId("borrower-1".to_string())
}

pub(super) fn intake() -> LoanIntake {
    LoanIntake {
        borrower: borrower(),
        funded_entity: "Fernwood Bakery Ltd".to_string(),
        terms: LoanTerms {
            amount_minor: 2_500_000,
            currency: "EUR".to_string(),
            term_months: 24,
        },
    }
}

pub(super) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).single().expect("valid instant")
}

pub(super) fn application(id: &str, status: LoanApplicationStatus) -> LoanApplication {
    LoanApplication {
        id: ApplicationId(id.to_string()),
        display_code: format!("LN-{}", id.to_uppercase()),
        borrower: borrower(),
        funded_entity: "Fernwood Bakery Ltd".to_string(),
        terms: LoanTerms {
            amount_minor: 2_500_000,
            currency: "EUR".to_string(),
            term_months: 24,
        },
        status,
        rejection_reason: None,
        contract_status: ContractStatus::NotStarted,
        submitted_at: epoch(),
        approved_at: None,
        rejected_at: None,
        disbursed_at: None,
        cancelled_at: None,
    }
}

pub(super) fn document(id: &str, kind: DocumentKind) -> Document {
    Document {
        id: DocumentId(id.to_string()),
        borrower: borrower(),
        kind,
        name: format!("{id}.pdf"),
        is_verified: false,
        verified_for_application: None,
        locked_at: None,
    }
}

/// Trail double whose storage is permanently down.
#[derive(Default)]
pub(super) struct UnavailableTrail;

impl AuditTrail for UnavailableTrail {
    fn append(&self, _event: NewAuditEvent) -> Result<AuditEvent, AuditStoreError> {
        Err(AuditStoreError::Unavailable("audit store offline".to_string()))
    }

    fn for_application(&self, _id: &ApplicationId) -> Result<Vec<AuditEvent>, AuditStoreError> {
        Err(AuditStoreError::Unavailable("audit store offline".to_string()))
    }
}

pub(super) struct StaticDirectory {
    actors: HashMap<String, Actor>,
}

impl Default for StaticDirectory {
    fn default() -> Self {
        let mut actors = HashMap::new();
        actors.insert(
            REVIEWER_TOKEN.to_string(),
            Actor {
                id: ActorId("reviewer-1".to_string()),
                name: "Riley Chen".to_string(),
                role: ActorRole::Reviewer,
            },
        );
        actors.insert(
            ADMIN_TOKEN.to_string(),
            Actor {
                id: ActorId("admin-1".to_string()),
                name: "Ade Okafor".to_string(),
                role: ActorRole::Admin,
            },
        );
        Self { actors }
    }
}

impl ActorDirectory for StaticDirectory {
    fn resolve(&self, token: &ActorToken) -> Result<Actor, DirectoryError> {
        self.actors
            .get(&token.0)
            .cloned()
            .ok_or(DirectoryError::UnknownActor)
    }
}

/// Deterministic, manually advanced time source.
pub(super) struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for FixedClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(epoch()),
        }
    }
}

impl FixedClock {
    pub(super) fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

/// Id source handing out predictable, ascending identifiers.
#[derive(Default)]
pub(super) struct SequentialIds {
    sequence: AtomicU64,
}

impl IdGenerator for SequentialIds {
    fn next_application_id(&self) -> ApplicationId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        ApplicationId(format!("loan-{id:06}"))
    }
}

/// Allocator returning predictable codes with no conflicts.
#[derive(Default)]
pub(super) struct SequentialCodes {
    sequence: AtomicU64,
}

impl DisplayCodeAllocator for SequentialCodes {
    fn generate(&self) -> String {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("LN-TEST{id:04}")
    }

    fn reserve(&self, _candidate: &str) -> Result<ReserveOutcome, RepositoryError> {
        Ok(ReserveOutcome::Reserved)
    }
}

pub(super) struct TestEnv {
    pub(super) service: LoanWorkflowService<MemoryRepository, MemoryVault, MemoryTrail, StaticDirectory>,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) vault: Arc<MemoryVault>,
    pub(super) trail: Arc<MemoryTrail>,
    pub(super) clock: Arc<FixedClock>,
}

pub(super) fn build_env() -> TestEnv {
    let repository = Arc::new(MemoryRepository::default());
    let vault = Arc::new(MemoryVault::default());
    let trail = Arc::new(MemoryTrail::default());
    let directory = Arc::new(StaticDirectory::default());
    let clock = Arc::new(FixedClock::default());
    let service = LoanWorkflowService::new(
        repository.clone(),
        vault.clone(),
        trail.clone(),
        directory,
        Arc::new(SequentialIds::default()),
        Arc::new(SequentialCodes::default()),
        clock.clone(),
    );
    TestEnv {
        service,
        repository,
        vault,
        trail,
        clock,
    }
}

/// Insert an application directly in the given status, bypassing intake.
pub(super) fn seed_application(
    env: &TestEnv,
    id: &str,
    status: LoanApplicationStatus,
) -> ApplicationId {
    let inserted = env
        .repository
        .insert(application(id, status))
        .expect("seed application");
    inserted.id
}
