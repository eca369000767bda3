use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::audit::{AuditEvent, AuditEventType};
use super::domain::{ActorId, ApplicationId, ContractStatus, LoanApplication};
use super::error::WorkflowError;
use super::repository::{ApplicationRepository, AuditTrail};

/// Which view of the trail a caller is entitled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineAudience {
    /// Staff view: full titles, descriptions, and actor attribution.
    Internal,
    /// Applicant view: internal detail generalized and deduplicated.
    External,
}

/// Closed public vocabulary both audiences are restricted to. Internal event
/// types with no mapping never appear in a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicEventType {
    Submitted,
    Cancelled,
    ReviewInProgress,
    Rejected,
    Approved,
    AwaitingDisbursement,
    Disbursed,
}

impl PublicEventType {
    /// Presentation hint consumed by timeline renderers.
    pub const fn line_color(self) -> &'static str {
        match self {
            Self::Submitted => "#2563eb",
            Self::Cancelled => "#6b7280",
            Self::ReviewInProgress => "#f59e0b",
            Self::Rejected => "#dc2626",
            Self::Approved => "#16a34a",
            Self::AwaitingDisbursement => "#0ea5e9",
            Self::Disbursed => "#16a34a",
        }
    }
}

/// Derived, never-persisted projection of one audit event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: PublicEventType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performed_by_id: Option<ActorId>,
    pub line_color: &'static str,
}

/// Contract signing subset of the timeline together with the application's
/// current contract sub-status. Internal-only; no audience masking.
#[derive(Debug, Clone, Serialize)]
pub struct ContractTimeline {
    pub contract_status: ContractStatus,
    pub data: Vec<TimelineEvent>,
}

/// Derives ordered, audience-scoped views from the audit trail.
pub struct TimelineProjector<R, T> {
    repository: Arc<R>,
    trail: Arc<T>,
}

impl<R, T> TimelineProjector<R, T>
where
    R: ApplicationRepository,
    T: AuditTrail,
{
    pub fn new(repository: Arc<R>, trail: Arc<T>) -> Self {
        Self { repository, trail }
    }

    pub fn project(
        &self,
        application_id: &ApplicationId,
        audience: TimelineAudience,
    ) -> Result<Vec<TimelineEvent>, WorkflowError> {
        let application = self.fetch_application(application_id)?;
        let events = self.ordered_events(application_id)?;

        let mut timeline = Vec::with_capacity(events.len() + 1);
        let has_submitted = events
            .iter()
            .any(|event| public_type(event.event_type) == Some(PublicEventType::Submitted));
        if !has_submitted {
            // Applications created before audit logging existed still get a
            // submission entry, synthesized from the application record.
            timeline.push(synthesized_submitted(&application));
        }

        for event in &events {
            let Some(public) = public_type(event.event_type) else {
                continue;
            };
            let entry = match audience {
                TimelineAudience::Internal => detailed_entry(event, public),
                TimelineAudience::External => masked_entry(event, public),
            };
            timeline.push(entry);
        }

        if audience == TimelineAudience::External {
            // Adjacency-based: equal public types separated by another type
            // are all kept.
            timeline.dedup_by(|later, earlier| later.event_type == earlier.event_type);
        }

        Ok(timeline)
    }

    /// Contract-signing subset plus the current contract sub-status, for
    /// embedding in the document-signing view.
    pub fn contract_timeline(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ContractTimeline, WorkflowError> {
        let application = self.fetch_application(application_id)?;
        let data = self
            .ordered_events(application_id)?
            .iter()
            .filter(|event| {
                matches!(
                    event.event_type,
                    AuditEventType::ContractSent | AuditEventType::ContractSigned
                )
            })
            .map(|event| detailed_entry(event, PublicEventType::ReviewInProgress))
            .collect();

        Ok(ContractTimeline {
            contract_status: application.contract_status,
            data,
        })
    }

    fn fetch_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<LoanApplication, WorkflowError> {
        self.repository
            .fetch(application_id)?
            .ok_or_else(|| WorkflowError::ApplicationNotFound(application_id.clone()))
    }

    fn ordered_events(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<AuditEvent>, WorkflowError> {
        let mut events = self.trail.for_application(application_id)?;
        events.sort_by_key(|event| (event.created_at, event.id));
        Ok(events)
    }
}

/// Internal taxonomy to public vocabulary. `None` drops the event for both
/// audiences.
fn public_type(event_type: AuditEventType) -> Option<PublicEventType> {
    match event_type {
        AuditEventType::ApplicationSubmitted => Some(PublicEventType::Submitted),
        AuditEventType::ReviewStageEntered
        | AuditEventType::KycKybCompleted
        | AuditEventType::EligibilityAssessmentCompleted
        | AuditEventType::DocumentVerifiedApproved
        | AuditEventType::DocumentVerifiedRejected
        | AuditEventType::ContractSent
        | AuditEventType::ContractSigned => Some(PublicEventType::ReviewInProgress),
        AuditEventType::AwaitingDisbursement => Some(PublicEventType::AwaitingDisbursement),
        AuditEventType::ApplicationApproved => Some(PublicEventType::Approved),
        AuditEventType::ApplicationRejected => Some(PublicEventType::Rejected),
        AuditEventType::ApplicationCancelled => Some(PublicEventType::Cancelled),
        AuditEventType::ApplicationDisbursed => Some(PublicEventType::Disbursed),
        AuditEventType::StatusChanged => None,
    }
}

/// Per-stage detail events whose titles are internal-only; externally they
/// collapse into the generic review entry.
fn is_stage_detail(event_type: AuditEventType) -> bool {
    matches!(
        event_type,
        AuditEventType::ReviewStageEntered
            | AuditEventType::KycKybCompleted
            | AuditEventType::EligibilityAssessmentCompleted
            | AuditEventType::DocumentVerifiedApproved
            | AuditEventType::DocumentVerifiedRejected
            | AuditEventType::ContractSent
            | AuditEventType::ContractSigned
    )
}

fn detailed_entry(event: &AuditEvent, public: PublicEventType) -> TimelineEvent {
    TimelineEvent {
        id: event.id.to_string(),
        event_type: public,
        title: event.title.clone(),
        description: event.description.clone(),
        date: event.created_at.date_naive(),
        time: Some(event.created_at.format("%H:%M").to_string()),
        performed_by: event.actor.as_ref().map(|actor| actor.name.clone()),
        performed_by_id: event.actor.as_ref().map(|actor| actor.id.clone()),
        line_color: public.line_color(),
    }
}

fn masked_entry(event: &AuditEvent, public: PublicEventType) -> TimelineEvent {
    let title = if is_stage_detail(event.event_type) {
        "Review in progress".to_string()
    } else {
        event.title.clone()
    };
    TimelineEvent {
        id: event.id.to_string(),
        event_type: public,
        title,
        description: None,
        date: event.created_at.date_naive(),
        time: Some(event.created_at.format("%H:%M").to_string()),
        performed_by: None,
        performed_by_id: None,
        line_color: public.line_color(),
    }
}

fn synthesized_submitted(application: &LoanApplication) -> TimelineEvent {
    TimelineEvent {
        id: format!("submitted-{}", application.id),
        event_type: PublicEventType::Submitted,
        title: "Application submitted".to_string(),
        description: None,
        date: application.submitted_at.date_naive(),
        time: Some(application.submitted_at.format("%H:%M").to_string()),
        performed_by: None,
        performed_by_id: None,
        line_color: PublicEventType::Submitted.line_color(),
    }
}
