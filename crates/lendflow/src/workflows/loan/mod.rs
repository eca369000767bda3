//! Loan application workflow engine.
//!
//! Four components cooperate over injected ports: the
//! [`StatusTransitionEngine`] guards and applies status changes, the
//! [`DocumentVerificationLedger`] tracks per-application document review and
//! the exclusive document lock, the [`AuditTrailRecorder`] appends immutable
//! workflow events, and the [`TimelineProjector`] derives audience-scoped
//! views from the accumulated trail. [`LoanWorkflowService`] wires them
//! together for the HTTP layer.

pub mod audit;
pub mod display_code;
pub mod domain;
pub mod error;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;
pub mod status;
pub mod timeline;
pub mod verification;

#[cfg(test)]
mod tests;

pub use audit::{
    AuditActor, AuditDetails, AuditEntry, AuditEvent, AuditEventType, AuditTrailRecorder,
    NewAuditEvent,
};
pub use display_code::{DisplayCodeAllocator, RandomDisplayCodes, ReserveOutcome};
pub use domain::{
    Actor, ActorId, ActorRole, ActorToken, ApplicationId, BorrowerId, ContractStatus, Document,
    DocumentId, DocumentKind, DocumentVerificationRecord, LoanApplication, LoanApplicationStatus,
    LoanIntake, LoanTerms, VerificationDecision, VerificationStatus,
};
pub use error::WorkflowError;
pub use memory::{InMemoryApplicationRepository, InMemoryAuditTrail, InMemoryDocumentVault};
pub use repository::{
    ActorDirectory, ApplicationRepository, AuditStoreError, AuditTrail, Clock, DirectoryError,
    DocumentLock, DocumentVault, IdGenerator, RandomApplicationIds, RepositoryError, SystemClock,
    VaultError,
};
pub use router::loan_router;
pub use service::LoanWorkflowService;
pub use status::{StatusTransitionEngine, TransitionRequest};
pub use timeline::{
    ContractTimeline, PublicEventType, TimelineAudience, TimelineEvent, TimelineProjector,
};
pub use verification::{
    BulkItemOutcome, BulkVerificationItem, BulkVerificationOutcome, CompletionReceipt,
    DocumentVerificationLedger, VerificationRequest, MAX_BULK_ITEMS,
};
