use chrono::Duration;

use super::common::{admin_token, build_env, document, seed_application};
use crate::workflows::loan::audit::AuditEventType;
use crate::workflows::loan::domain::{ApplicationId, DocumentKind, LoanApplicationStatus};
use crate::workflows::loan::error::WorkflowError;
use crate::workflows::loan::status::TransitionRequest;

#[test]
fn terminal_statuses_reject_every_transition() {
    let env = build_env();
    let terminals = [
        LoanApplicationStatus::Approved,
        LoanApplicationStatus::Rejected,
        LoanApplicationStatus::Disbursed,
        LoanApplicationStatus::Cancelled,
    ];

    for (index, terminal) in terminals.into_iter().enumerate() {
        let id = seed_application(&env, &format!("app-terminal-{index}"), terminal);
        for target in [
            LoanApplicationStatus::Submitted,
            LoanApplicationStatus::KycKybVerification,
            LoanApplicationStatus::Cancelled,
        ] {
            if target == terminal {
                continue;
            }
            let result = env
                .service
                .transition(&id, None, TransitionRequest::to(target));
            assert!(
                matches!(result, Err(WorkflowError::InvalidTransition { .. })),
                "expected InvalidTransition from {terminal} to {target}"
            );
        }
    }
}

#[test]
fn same_status_is_a_no_op() {
    let env = build_env();
    let id = seed_application(&env, "app-noop", LoanApplicationStatus::Submitted);

    let result = env.service.transition(
        &id,
        None,
        TransitionRequest::to(LoanApplicationStatus::Submitted),
    );

    assert!(matches!(
        result,
        Err(WorkflowError::NoOp {
            current: LoanApplicationStatus::Submitted
        })
    ));
}

#[test]
fn unknown_application_is_not_found() {
    let env = build_env();
    let result = env.service.transition(
        &ApplicationId("missing".to_string()),
        None,
        TransitionRequest::to(LoanApplicationStatus::Cancelled),
    );
    assert!(matches!(
        result,
        Err(WorkflowError::ApplicationNotFound(_))
    ));
}

#[test]
fn rejection_without_reason_fails_and_leaves_status_untouched() {
    let env = build_env();
    let id = seed_application(&env, "app-rej", LoanApplicationStatus::KycKybVerification);

    let result = env.service.transition(
        &id,
        None,
        TransitionRequest::to(LoanApplicationStatus::Rejected),
    );

    assert!(matches!(result, Err(WorkflowError::MissingRejectionReason)));
    let application = env.service.get(&id).expect("application present");
    assert_eq!(application.status, LoanApplicationStatus::KycKybVerification);
    assert!(application.rejected_at.is_none());
}

#[test]
fn blank_rejection_reason_is_rejected_too() {
    let env = build_env();
    let id = seed_application(&env, "app-rej-blank", LoanApplicationStatus::Submitted);

    let result = env.service.transition(
        &id,
        None,
        TransitionRequest::to(LoanApplicationStatus::Rejected).with_rejection_reason("   "),
    );

    assert!(matches!(result, Err(WorkflowError::MissingRejectionReason)));
}

#[test]
fn rejection_with_reason_sets_terminal_timestamp_once() {
    let env = build_env();
    let id = seed_application(&env, "app-rej-ok", LoanApplicationStatus::Submitted);

    let updated = env
        .service
        .transition(
            &id,
            Some(admin_token()),
            TransitionRequest::to(LoanApplicationStatus::Rejected)
                .with_rejection_reason("incomplete financials"),
        )
        .expect("rejection applies");

    assert_eq!(updated.status, LoanApplicationStatus::Rejected);
    assert_eq!(
        updated.rejection_reason.as_deref(),
        Some("incomplete financials")
    );
    let first_rejected_at = updated.rejected_at.expect("timestamp set");

    // A retry after the terminal state is reached cannot move the timestamp.
    env.clock.advance(Duration::hours(2));
    let retry = env.service.transition(
        &id,
        Some(admin_token()),
        TransitionRequest::to(LoanApplicationStatus::Rejected)
            .with_rejection_reason("incomplete financials"),
    );
    assert!(matches!(retry, Err(WorkflowError::NoOp { .. })));

    let application = env.service.get(&id).expect("application present");
    assert_eq!(application.rejected_at, Some(first_rejected_at));
}

#[test]
fn pipeline_order_is_not_enforced_between_review_stages() {
    let env = build_env();
    let id = seed_application(&env, "app-skip", LoanApplicationStatus::Submitted);

    // Administrative override straight to the last review stage is allowed.
    let updated = env
        .service
        .transition(
            &id,
            None,
            TransitionRequest::to(LoanApplicationStatus::AwaitingDisbursement),
        )
        .expect("jump permitted");

    assert_eq!(updated.status, LoanApplicationStatus::AwaitingDisbursement);
}

#[test]
fn entering_verification_bootstraps_pending_records() {
    let env = build_env();
    env.vault.seed_document(document("doc-id", DocumentKind::Personal));
    env.vault.seed_document(document("doc-reg", DocumentKind::Business));
    let id = seed_application(&env, "app-boot", LoanApplicationStatus::Submitted);

    env.service
        .transition(
            &id,
            None,
            TransitionRequest::to(LoanApplicationStatus::KycKybVerification),
        )
        .expect("stage change applies");

    assert_eq!(env.vault.record_count(&id), 2);

    // Re-entering the stage later must not duplicate records.
    env.service
        .transition(
            &id,
            None,
            TransitionRequest::to(LoanApplicationStatus::EligibilityAssessment),
        )
        .expect("stage change applies");
    env.service
        .transition(
            &id,
            None,
            TransitionRequest::to(LoanApplicationStatus::KycKybVerification),
        )
        .expect("stage change applies");
    assert_eq!(env.vault.record_count(&id), 2);
}

#[test]
fn transitions_emit_mapped_audit_events() {
    let env = build_env();
    let id = seed_application(&env, "app-events", LoanApplicationStatus::Submitted);

    env.service
        .transition(
            &id,
            Some(admin_token()),
            TransitionRequest::to(LoanApplicationStatus::EligibilityAssessment),
        )
        .expect("stage change applies");
    env.service
        .transition(
            &id,
            Some(admin_token()),
            TransitionRequest::to(LoanApplicationStatus::Approved).with_reason("strong covenant"),
        )
        .expect("approval applies");

    let events = env.trail.events();
    assert_eq!(events.len(), 2);

    let stage = &events[0];
    assert_eq!(stage.event_type, AuditEventType::ReviewStageEntered);
    assert!(stage.title.contains("Eligibility assessment"));
    assert_eq!(stage.previous_status, Some(LoanApplicationStatus::Submitted));
    assert_eq!(
        stage.new_status,
        Some(LoanApplicationStatus::EligibilityAssessment)
    );
    assert_eq!(
        stage.actor.as_ref().map(|actor| actor.name.as_str()),
        Some("Ade Okafor")
    );

    let approval = &events[1];
    assert_eq!(approval.event_type, AuditEventType::ApplicationApproved);
    assert_eq!(approval.description.as_deref(), Some("strong covenant"));
}

#[test]
fn rejection_event_carries_the_reason_detail() {
    let env = build_env();
    let id = seed_application(&env, "app-rej-detail", LoanApplicationStatus::Submitted);

    env.service
        .transition(
            &id,
            Some(admin_token()),
            TransitionRequest::to(LoanApplicationStatus::Rejected)
                .with_rejection_reason("incomplete financials"),
        )
        .expect("rejection applies");

    let events = env.trail.events();
    let event = events.last().expect("event recorded");
    assert_eq!(event.event_type, AuditEventType::ApplicationRejected);
    assert_eq!(
        event.details.get("rejection_reason").and_then(|v| v.as_str()),
        Some("incomplete financials")
    );
}
