use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use super::domain::{Actor, ActorToken, ApplicationId, LoanApplicationStatus};
use super::repository::{ActorDirectory, AuditTrail, Clock};

/// Closed taxonomy of workflow events written to the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    ApplicationSubmitted,
    /// Generic stage-entry event; the specific stage name lives in the title.
    ReviewStageEntered,
    KycKybCompleted,
    EligibilityAssessmentCompleted,
    DocumentVerifiedApproved,
    DocumentVerifiedRejected,
    ContractSent,
    ContractSigned,
    AwaitingDisbursement,
    ApplicationApproved,
    ApplicationRejected,
    ApplicationCancelled,
    ApplicationDisbursed,
    /// Unlabeled fallback; projections drop it for every audience.
    StatusChanged,
}

impl AuditEventType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ApplicationSubmitted => "application_submitted",
            Self::ReviewStageEntered => "review_stage_entered",
            Self::KycKybCompleted => "kyc_kyb_completed",
            Self::EligibilityAssessmentCompleted => "eligibility_assessment_completed",
            Self::DocumentVerifiedApproved => "document_verified_approved",
            Self::DocumentVerifiedRejected => "document_verified_rejected",
            Self::ContractSent => "contract_sent",
            Self::ContractSigned => "contract_signed",
            Self::AwaitingDisbursement => "awaiting_disbursement",
            Self::ApplicationApproved => "application_approved",
            Self::ApplicationRejected => "application_rejected",
            Self::ApplicationCancelled => "application_cancelled",
            Self::ApplicationDisbursed => "application_disbursed",
            Self::StatusChanged => "status_changed",
        }
    }
}

/// An immutable audit trail row. Ordering is by `created_at`, ties broken by
/// the store-assigned `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: u64,
    pub application_id: ApplicationId,
    pub event_type: AuditEventType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<LoanApplicationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<LoanApplicationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<Actor>,
    pub details: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
}

/// Event payload handed to the trail store, which assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEvent {
    pub application_id: ApplicationId,
    pub event_type: AuditEventType,
    pub title: String,
    pub description: Option<String>,
    pub previous_status: Option<LoanApplicationStatus>,
    pub new_status: Option<LoanApplicationStatus>,
    pub actor: Option<Actor>,
    pub details: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
}

/// Builder for the structured detail payload. Absent values are dropped
/// before storage; an explicit null means "cleared" and is preserved.
#[derive(Debug, Default, Clone)]
pub struct AuditDetails(BTreeMap<String, Value>);

impl AuditDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Insert the value if present; a `None` never reaches storage.
    pub fn entry_opt(mut self, key: &str, value: Option<impl Into<Value>>) -> Self {
        if let Some(value) = value {
            self.0.insert(key.to_string(), value.into());
        }
        self
    }

    /// Record that a field was explicitly cleared.
    pub fn cleared(mut self, key: &str) -> Self {
        self.0.insert(key.to_string(), Value::Null);
        self
    }

    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.0
    }
}

/// Actor attribution for an audit entry: either an unresolved external token
/// or an actor the caller already resolved.
#[derive(Debug, Clone)]
pub enum AuditActor {
    Token(ActorToken),
    Resolved(Actor),
}

impl From<ActorToken> for AuditActor {
    fn from(token: ActorToken) -> Self {
        Self::Token(token)
    }
}

impl From<Actor> for AuditActor {
    fn from(actor: Actor) -> Self {
        Self::Resolved(actor)
    }
}

/// One audit trail entry as produced by a workflow component.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub application_id: ApplicationId,
    pub actor: Option<AuditActor>,
    pub event_type: AuditEventType,
    pub title: String,
    pub description: Option<String>,
    pub previous_status: Option<LoanApplicationStatus>,
    pub new_status: Option<LoanApplicationStatus>,
    pub details: AuditDetails,
}

/// Appends workflow events to the audit trail.
///
/// `record` returns `()`: audit logging is supplementary telemetry and must
/// never gate the operation it accompanies. Actor resolution failures record
/// the event without attribution; storage failures are reported through
/// tracing only. The trail is therefore best-effort relative to the primary
/// state mutation.
pub struct AuditTrailRecorder<T, D> {
    trail: Arc<T>,
    directory: Arc<D>,
    clock: Arc<dyn Clock>,
}

impl<T, D> Clone for AuditTrailRecorder<T, D> {
    fn clone(&self) -> Self {
        Self {
            trail: self.trail.clone(),
            directory: self.directory.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<T, D> AuditTrailRecorder<T, D>
where
    T: AuditTrail,
    D: ActorDirectory,
{
    pub fn new(trail: Arc<T>, directory: Arc<D>, clock: Arc<dyn Clock>) -> Self {
        Self {
            trail,
            directory,
            clock,
        }
    }

    pub fn record(&self, entry: AuditEntry) {
        let actor = match entry.actor {
            Some(AuditActor::Resolved(actor)) => Some(actor),
            Some(AuditActor::Token(token)) => match self.directory.resolve(&token) {
                Ok(actor) => Some(actor),
                Err(err) => {
                    warn!(
                        application = %entry.application_id,
                        event = entry.event_type.label(),
                        "audit actor resolution failed, recording without attribution: {err}"
                    );
                    None
                }
            },
            None => None,
        };

        let event = NewAuditEvent {
            application_id: entry.application_id.clone(),
            event_type: entry.event_type,
            title: entry.title,
            description: entry.description,
            previous_status: entry.previous_status,
            new_status: entry.new_status,
            actor,
            details: entry.details.into_map(),
            created_at: self.clock.now(),
        };

        if let Err(err) = self.trail.append(event) {
            error!(
                application = %entry.application_id,
                event = entry.event_type.label(),
                "audit append failed, event lost: {err}"
            );
        }
    }
}
