use std::sync::Arc;

use super::common::{reviewer_token, FixedClock, MemoryTrail, StaticDirectory, UnavailableTrail};
use crate::workflows::loan::audit::{
    AuditActor, AuditDetails, AuditEntry, AuditEventType, AuditTrailRecorder,
};
use crate::workflows::loan::domain::{Actor, ActorId, ActorRole, ActorToken, ApplicationId};
use crate::workflows::loan::repository::Clock;

fn recorder(trail: Arc<MemoryTrail>) -> AuditTrailRecorder<MemoryTrail, StaticDirectory> {
    AuditTrailRecorder::new(
        trail,
        Arc::new(StaticDirectory::default()),
        Arc::new(FixedClock::default()),
    )
}

fn entry(actor: Option<AuditActor>, details: AuditDetails) -> AuditEntry {
    AuditEntry {
        application_id: ApplicationId("app-audit".to_string()),
        actor,
        event_type: AuditEventType::StatusChanged,
        title: "Status changed".to_string(),
        description: None,
        previous_status: None,
        new_status: None,
        details,
    }
}

#[test]
fn absent_detail_values_are_dropped_and_nulls_preserved() {
    let trail = Arc::new(MemoryTrail::default());
    let recorder = recorder(trail.clone());

    let details = AuditDetails::new()
        .entry("kept", "value")
        .entry_opt("dropped", None::<String>)
        .entry_opt("also_kept", Some("present"))
        .cleared("rejection_reason");
    recorder.record(entry(None, details));

    let events = trail.events();
    assert_eq!(events.len(), 1);
    let details = &events[0].details;
    assert_eq!(details.get("kept").and_then(|v| v.as_str()), Some("value"));
    assert!(!details.contains_key("dropped"));
    assert_eq!(
        details.get("also_kept").and_then(|v| v.as_str()),
        Some("present")
    );
    // Null is meaningful: the field was explicitly cleared.
    assert!(details.get("rejection_reason").expect("key present").is_null());
}

#[test]
fn token_actors_are_resolved_through_the_directory() {
    let trail = Arc::new(MemoryTrail::default());
    let recorder = recorder(trail.clone());

    recorder.record(entry(
        Some(AuditActor::Token(reviewer_token())),
        AuditDetails::new(),
    ));

    let events = trail.events();
    let actor = events[0].actor.as_ref().expect("actor attached");
    assert_eq!(actor.id.0, "reviewer-1");
    assert_eq!(actor.name, "Riley Chen");
}

#[test]
fn unresolvable_actor_records_the_event_without_attribution() {
    let trail = Arc::new(MemoryTrail::default());
    let recorder = recorder(trail.clone());

    recorder.record(entry(
        Some(AuditActor::Token(ActorToken("stranger".to_string()))),
        AuditDetails::new(),
    ));

    let events = trail.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].actor.is_none());
}

#[test]
fn pre_resolved_actors_skip_the_directory() {
    let trail = Arc::new(MemoryTrail::default());
    let recorder = recorder(trail.clone());

    let actor = Actor {
        id: ActorId("svc-1".to_string()),
        name: "Disbursement Bot".to_string(),
        role: ActorRole::System,
    };
    recorder.record(entry(Some(AuditActor::Resolved(actor)), AuditDetails::new()));

    let events = trail.events();
    assert_eq!(
        events[0].actor.as_ref().map(|a| a.name.as_str()),
        Some("Disbursement Bot")
    );
}

#[test]
fn storage_failure_never_reaches_the_caller() {
    let recorder: AuditTrailRecorder<UnavailableTrail, StaticDirectory> = AuditTrailRecorder::new(
        Arc::new(UnavailableTrail),
        Arc::new(StaticDirectory::default()),
        Arc::new(FixedClock::default()),
    );

    // The signature admits no error; this must simply return.
    recorder.record(entry(None, AuditDetails::new()));
}

#[test]
fn events_are_stamped_with_the_injected_clock() {
    let trail = Arc::new(MemoryTrail::default());
    let clock = Arc::new(FixedClock::default());
    let recorder = AuditTrailRecorder::new(
        trail.clone(),
        Arc::new(StaticDirectory::default()),
        clock.clone(),
    );

    recorder.record(entry(None, AuditDetails::new()));

    let events = trail.events();
    assert_eq!(events[0].created_at, clock.now());
}
