use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for loan applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for the borrowing party whose profile owns the documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BorrowerId(pub String);

/// Identifier for an evidentiary document in the profile store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Internal identifier for a platform actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

/// Opaque external identity supplied by the request layer; resolved to an
/// [`Actor`] through the directory port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorToken(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Reviewer,
    Admin,
    System,
}

/// Resolved internal actor reference attached to audit events and
/// verification records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    pub role: ActorRole,
}

/// Statuses an application moves through: an ordered review pipeline
/// followed by four terminal states that admit no further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanApplicationStatus {
    Submitted,
    KycKybVerification,
    EligibilityAssessment,
    ContractSigning,
    AwaitingDisbursement,
    Approved,
    Rejected,
    Disbursed,
    Cancelled,
}

impl LoanApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::KycKybVerification => "kyc_kyb_verification",
            Self::EligibilityAssessment => "eligibility_assessment",
            Self::ContractSigning => "contract_signing",
            Self::AwaitingDisbursement => "awaiting_disbursement",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Disbursed => "disbursed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Human-readable stage name used in audit event titles.
    pub const fn stage_name(self) -> &'static str {
        match self {
            Self::Submitted => "Submission",
            Self::KycKybVerification => "KYC/KYB verification",
            Self::EligibilityAssessment => "Eligibility assessment",
            Self::ContractSigning => "Contract signing",
            Self::AwaitingDisbursement => "Awaiting disbursement",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Disbursed => "Disbursed",
            Self::Cancelled => "Cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Approved | Self::Rejected | Self::Disbursed | Self::Cancelled
        )
    }
}

impl fmt::Display for LoanApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Monetary terms requested by the borrower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Principal in minor currency units.
    pub amount_minor: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    pub term_months: u16,
}

/// Sub-state of the contract signing stage, surfaced by the contract
/// timeline view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    NotStarted,
    Sent,
    Signed,
}

impl ContractStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Sent => "sent",
            Self::Signed => "signed",
        }
    }
}

/// A loan application record as held by the relational store.
///
/// Once a terminal status is reached no further status mutation is
/// permitted; each terminal status has a reached-at timestamp set exactly
/// once. `rejection_reason` is populated while the status is `rejected` and
/// cleared whenever the status legitimately differs from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: ApplicationId,
    /// Human-readable code shown to staff and applicants, e.g. `LN-7KQ2M9XF`.
    pub display_code: String,
    pub borrower: BorrowerId,
    pub funded_entity: String,
    pub terms: LoanTerms,
    pub status: LoanApplicationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub contract_status: ContractStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disbursed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl LoanApplication {
    pub fn terminal_reached_at(&self, status: LoanApplicationStatus) -> Option<DateTime<Utc>> {
        match status {
            LoanApplicationStatus::Approved => self.approved_at,
            LoanApplicationStatus::Rejected => self.rejected_at,
            LoanApplicationStatus::Disbursed => self.disbursed_at,
            LoanApplicationStatus::Cancelled => self.cancelled_at,
            _ => None,
        }
    }

    pub(crate) fn set_terminal_reached_at(
        &mut self,
        status: LoanApplicationStatus,
        at: DateTime<Utc>,
    ) {
        match status {
            LoanApplicationStatus::Approved => self.approved_at = Some(at),
            LoanApplicationStatus::Rejected => self.rejected_at = Some(at),
            LoanApplicationStatus::Disbursed => self.disbursed_at = Some(at),
            LoanApplicationStatus::Cancelled => self.cancelled_at = Some(at),
            _ => {}
        }
    }
}

/// Payload accepted when a new application is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanIntake {
    pub borrower: BorrowerId,
    pub funded_entity: String,
    pub terms: LoanTerms,
}

/// Evidentiary document kinds tracked during verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Personal,
    Business,
}

impl DocumentKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Business => "business",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "personal" => Some(Self::Personal),
            "business" => Some(Self::Business),
            _ => None,
        }
    }
}

/// A document owned by the borrower's profile, carrying the derived lock.
///
/// A document can be locked to at most one application at a time; verifying
/// it for a second application while the lock is held must fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub borrower: BorrowerId,
    pub kind: DocumentKind,
    pub name: String,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_for_application: Option<ApplicationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<DateTime<Utc>>,
}

/// Per-document verification state within one application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

/// Reviewer decision submitted for a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationDecision {
    Approved,
    Rejected,
}

impl From<VerificationDecision> for VerificationStatus {
    fn from(decision: VerificationDecision) -> Self {
        match decision {
            VerificationDecision::Approved => Self::Approved,
            VerificationDecision::Rejected => Self::Rejected,
        }
    }
}

/// Verification state of one document under one application, uniquely keyed
/// by `(application_id, document_kind, document_id)`. Created as `pending`,
/// mutated by reviewer decisions, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentVerificationRecord {
    pub application_id: ApplicationId,
    pub document_kind: DocumentKind,
    pub document_id: DocumentId,
    pub status: VerificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DocumentVerificationRecord {
    /// A fresh `pending` record for a document that has not been reviewed yet.
    pub fn pending(
        application_id: ApplicationId,
        document_kind: DocumentKind,
        document_id: DocumentId,
    ) -> Self {
        Self {
            application_id,
            document_kind,
            document_id,
            status: VerificationStatus::Pending,
            verified_by: None,
            verified_at: None,
            rejection_reason: None,
            notes: None,
        }
    }
}
