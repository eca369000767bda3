use chrono::{DateTime, Utc};
use rand::Rng;

use super::audit::{AuditEvent, NewAuditEvent};
use super::domain::{
    Actor, ActorToken, ApplicationId, BorrowerId, Document, DocumentId, DocumentKind,
    DocumentVerificationRecord, LoanApplication,
};

/// Storage abstraction for loan applications so the workflow services can be
/// exercised in isolation.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: LoanApplication) -> Result<LoanApplication, RepositoryError>;
    fn update(&self, application: LoanApplication) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<LoanApplication>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Lock fields written onto a document when a verification decision lands.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLock {
    pub borrower: BorrowerId,
    pub document_kind: DocumentKind,
    pub document_id: DocumentId,
    pub application_id: ApplicationId,
    pub locked_at: DateTime<Utc>,
}

/// Access to the borrower's documents and their per-application verification
/// records.
///
/// `commit_verification` persists the record upsert and the document lock as
/// one atomic unit: a reader never observes a locked document without its
/// record or vice versa. There is no version check on the lock; concurrent
/// writers are last-writer-wins (known gap, see DESIGN.md).
pub trait DocumentVault: Send + Sync {
    fn documents_for(&self, borrower: &BorrowerId) -> Result<Vec<Document>, VaultError>;
    fn find_document(
        &self,
        borrower: &BorrowerId,
        kind: DocumentKind,
        id: &DocumentId,
    ) -> Result<Option<Document>, VaultError>;
    fn record(
        &self,
        application_id: &ApplicationId,
        kind: DocumentKind,
        document_id: &DocumentId,
    ) -> Result<Option<DocumentVerificationRecord>, VaultError>;
    fn records_for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<DocumentVerificationRecord>, VaultError>;
    /// Insert a `pending` record unless one already exists for the key.
    /// Returns whether a record was created.
    fn insert_pending(&self, record: DocumentVerificationRecord) -> Result<bool, VaultError>;
    /// Upsert the verification record and set the document lock atomically.
    fn commit_verification(
        &self,
        record: DocumentVerificationRecord,
        lock: DocumentLock,
    ) -> Result<(), VaultError>;
}

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("document not found")]
    NotFound,
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only audit trail storage. The store assigns event ids; events are
/// returned in creation order and are never mutated or deleted.
pub trait AuditTrail: Send + Sync {
    fn append(&self, event: NewAuditEvent) -> Result<AuditEvent, AuditStoreError>;
    fn for_application(&self, id: &ApplicationId) -> Result<Vec<AuditEvent>, AuditStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditStoreError {
    #[error("audit store unavailable: {0}")]
    Unavailable(String),
}

/// Resolves an external actor token to an internal actor reference.
pub trait ActorDirectory: Send + Sync {
    fn resolve(&self, token: &ActorToken) -> Result<Actor, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("unknown actor")]
    UnknownActor,
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Time source injected into the workflow services.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used outside of tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of fresh application identifiers, injected so tests can pin ids
/// and stores can keep assigning them after a restart.
pub trait IdGenerator: Send + Sync {
    fn next_application_id(&self) -> ApplicationId;
}

const ID_CHARSET: &[u8] = b"abcdefghjkmnpqrstuvwxyz23456789";
const ID_LENGTH: usize = 12;

/// Default generator producing random `loan-<suffix>` identifiers; random
/// rather than sequential so restarts cannot reissue an id a persistent
/// store already holds.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomApplicationIds;

impl IdGenerator for RandomApplicationIds {
    fn next_application_id(&self) -> ApplicationId {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ID_LENGTH)
            .map(|_| ID_CHARSET[rng.gen_range(0..ID_CHARSET.len())] as char)
            .collect();
        ApplicationId(format!("loan-{suffix}"))
    }
}
