use super::domain::{ApplicationId, DocumentId, LoanApplicationStatus};
use super::repository::{AuditStoreError, DirectoryError, RepositoryError, VaultError};

/// Closed error taxonomy for the loan workflow core.
///
/// Every variant carries a stable machine-readable [`code`](Self::code);
/// mapping to transport status codes happens only at the HTTP boundary.
/// Unexpected adapter failures are wrapped into [`Internal`](Self::Internal)
/// so root causes never leak to an external audience.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("loan application {0} not found")]
    ApplicationNotFound(ApplicationId),
    #[error("document {0} does not belong to this applicant")]
    DocumentNotFound(DocumentId),
    #[error("application is already in status {current}")]
    NoOp { current: LoanApplicationStatus },
    #[error("no transition from terminal status {current} to {requested}")]
    InvalidTransition {
        current: LoanApplicationStatus,
        requested: LoanApplicationStatus,
    },
    #[error("a rejection reason is required")]
    MissingRejectionReason,
    #[error("document is already verified for application {held_by}")]
    DocumentAlreadyVerified { held_by: ApplicationId },
    #[error("operation requires status {required}, application is {current}")]
    InvalidStatus {
        required: LoanApplicationStatus,
        current: LoanApplicationStatus,
    },
    #[error("no documents have been reviewed for this application")]
    NoDocumentsReviewed,
    #[error("actor identity could not be resolved")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ApplicationNotFound(_) => "NOT_FOUND",
            Self::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
            Self::NoOp { .. } => "NO_OP",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::MissingRejectionReason => "MISSING_REJECTION_REASON",
            Self::DocumentAlreadyVerified { .. } => "DOCUMENT_ALREADY_VERIFIED",
            Self::InvalidStatus { .. } => "INVALID_STATUS",
            Self::NoDocumentsReviewed => "NO_DOCUMENTS_REVIEWED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<RepositoryError> for WorkflowError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => Self::Internal("storage conflict".to_string()),
            RepositoryError::NotFound => {
                Self::Internal("record disappeared mid-operation".to_string())
            }
            RepositoryError::Unavailable(detail) => Self::Internal(detail),
        }
    }
}

impl From<VaultError> for WorkflowError {
    fn from(value: VaultError) -> Self {
        match value {
            VaultError::NotFound => Self::Internal("vault record missing".to_string()),
            VaultError::Unavailable(detail) => Self::Internal(detail),
        }
    }
}

impl From<AuditStoreError> for WorkflowError {
    fn from(value: AuditStoreError) -> Self {
        match value {
            AuditStoreError::Unavailable(detail) => Self::Internal(detail),
        }
    }
}

impl From<DirectoryError> for WorkflowError {
    fn from(_: DirectoryError) -> Self {
        Self::Unauthorized
    }
}
