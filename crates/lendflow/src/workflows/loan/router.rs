use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    ActorToken, ApplicationId, DocumentId, DocumentKind, LoanApplicationStatus, LoanIntake,
    VerificationDecision,
};
use super::error::WorkflowError;
use super::repository::{ActorDirectory, ApplicationRepository, AuditTrail, DocumentVault};
use super::service::LoanWorkflowService;
use super::status::TransitionRequest;
use super::timeline::TimelineAudience;
use super::verification::{BulkVerificationItem, VerificationRequest};

/// Header carrying the authenticated actor identity supplied by the
/// request-handling layer in front of this service.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Router builder exposing the loan workflow over HTTP.
pub fn loan_router<R, V, T, D>(service: Arc<LoanWorkflowService<R, V, T, D>>) -> Router
where
    R: ApplicationRepository + 'static,
    V: DocumentVault + 'static,
    T: AuditTrail + 'static,
    D: ActorDirectory + 'static,
{
    Router::new()
        .route("/api/v1/loans", post(intake_handler::<R, V, T, D>))
        .route(
            "/api/v1/loans/:application_id",
            get(detail_handler::<R, V, T, D>),
        )
        .route(
            "/api/v1/loans/:application_id/status",
            patch(status_handler::<R, V, T, D>),
        )
        .route(
            "/api/v1/loans/:application_id/documents/:kind/:document_id/verification",
            post(verify_handler::<R, V, T, D>),
        )
        .route(
            "/api/v1/loans/:application_id/documents/verification/bulk",
            post(bulk_verify_handler::<R, V, T, D>),
        )
        .route(
            "/api/v1/loans/:application_id/verification/complete",
            post(complete_handler::<R, V, T, D>),
        )
        .route(
            "/api/v1/loans/:application_id/timeline",
            get(timeline_handler::<R, V, T, D>),
        )
        .route(
            "/api/v1/loans/:application_id/contract/timeline",
            get(contract_timeline_handler::<R, V, T, D>),
        )
        .route(
            "/api/v1/loans/:application_id/contract/sent",
            post(contract_sent_handler::<R, V, T, D>),
        )
        .route(
            "/api/v1/loans/:application_id/contract/signed",
            post(contract_signed_handler::<R, V, T, D>),
        )
        .with_state(service)
}

/// Transport mapping for the workflow error taxonomy. The machine code is
/// always surfaced; internal root causes are not.
fn error_response(err: &WorkflowError) -> Response {
    let status = match err {
        WorkflowError::ApplicationNotFound(_) | WorkflowError::DocumentNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        WorkflowError::NoOp { .. }
        | WorkflowError::InvalidTransition { .. }
        | WorkflowError::DocumentAlreadyVerified { .. }
        | WorkflowError::InvalidStatus { .. }
        | WorkflowError::NoDocumentsReviewed => StatusCode::CONFLICT,
        WorkflowError::MissingRejectionReason | WorkflowError::Validation(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        WorkflowError::Unauthorized => StatusCode::UNAUTHORIZED,
        WorkflowError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = match err {
        WorkflowError::Internal(_) => "internal error".to_string(),
        other => other.to_string(),
    };
    let payload = json!({
        "error": { "code": err.code(), "message": message },
    });
    (status, axum::Json(payload)).into_response()
}

fn actor_token(headers: &HeaderMap) -> Option<ActorToken> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| ActorToken(value.to_string()))
}

fn require_actor(headers: &HeaderMap) -> Result<ActorToken, Response> {
    actor_token(headers).ok_or_else(|| error_response(&WorkflowError::Unauthorized))
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusChangeBody {
    status: LoanApplicationStatus,
    reason: Option<String>,
    rejection_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerificationBody {
    status: VerificationDecision,
    rejection_reason: Option<String>,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkVerificationBody {
    verifications: Vec<BulkItemBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkItemBody {
    document_id: DocumentId,
    document_type: DocumentKind,
    status: VerificationDecision,
    rejection_reason: Option<String>,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TimelineQuery {
    audience: Option<TimelineAudience>,
}

pub(crate) async fn intake_handler<R, V, T, D>(
    State(service): State<Arc<LoanWorkflowService<R, V, T, D>>>,
    headers: HeaderMap,
    axum::Json(intake): axum::Json<LoanIntake>,
) -> Response
where
    R: ApplicationRepository + 'static,
    V: DocumentVault + 'static,
    T: AuditTrail + 'static,
    D: ActorDirectory + 'static,
{
    match service.create(intake, actor_token(&headers)) {
        Ok(application) => (StatusCode::CREATED, axum::Json(application)).into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn detail_handler<R, V, T, D>(
    State(service): State<Arc<LoanWorkflowService<R, V, T, D>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    V: DocumentVault + 'static,
    T: AuditTrail + 'static,
    D: ActorDirectory + 'static,
{
    match service.get(&ApplicationId(application_id)) {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn status_handler<R, V, T, D>(
    State(service): State<Arc<LoanWorkflowService<R, V, T, D>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<StatusChangeBody>,
) -> Response
where
    R: ApplicationRepository + 'static,
    V: DocumentVault + 'static,
    T: AuditTrail + 'static,
    D: ActorDirectory + 'static,
{
    let request = TransitionRequest {
        new_status: body.status,
        reason: body.reason,
        rejection_reason: body.rejection_reason,
    };
    match service.transition(
        &ApplicationId(application_id),
        actor_token(&headers),
        request,
    ) {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn verify_handler<R, V, T, D>(
    State(service): State<Arc<LoanWorkflowService<R, V, T, D>>>,
    Path((application_id, kind, document_id)): Path<(String, String, String)>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<VerificationBody>,
) -> Response
where
    R: ApplicationRepository + 'static,
    V: DocumentVault + 'static,
    T: AuditTrail + 'static,
    D: ActorDirectory + 'static,
{
    let actor = match require_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let Some(kind) = DocumentKind::parse(&kind) else {
        return error_response(&WorkflowError::Validation(format!(
            "unknown document kind '{kind}'"
        )));
    };
    let request = VerificationRequest {
        decision: body.status,
        rejection_reason: body.rejection_reason,
        notes: body.notes,
    };
    match service.verify_document(
        &ApplicationId(application_id),
        kind,
        &DocumentId(document_id),
        &actor,
        request,
    ) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn bulk_verify_handler<R, V, T, D>(
    State(service): State<Arc<LoanWorkflowService<R, V, T, D>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<BulkVerificationBody>,
) -> Response
where
    R: ApplicationRepository + 'static,
    V: DocumentVault + 'static,
    T: AuditTrail + 'static,
    D: ActorDirectory + 'static,
{
    let actor = match require_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let items = body
        .verifications
        .into_iter()
        .map(|item| BulkVerificationItem {
            document_id: item.document_id,
            document_kind: item.document_type,
            decision: item.status,
            rejection_reason: item.rejection_reason,
            notes: item.notes,
        })
        .collect();
    match service.bulk_verify(&ApplicationId(application_id), &actor, items) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn complete_handler<R, V, T, D>(
    State(service): State<Arc<LoanWorkflowService<R, V, T, D>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    V: DocumentVault + 'static,
    T: AuditTrail + 'static,
    D: ActorDirectory + 'static,
{
    let actor = match require_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.complete_verification(&ApplicationId(application_id), &actor) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn timeline_handler<R, V, T, D>(
    State(service): State<Arc<LoanWorkflowService<R, V, T, D>>>,
    Path(application_id): Path<String>,
    Query(query): Query<TimelineQuery>,
) -> Response
where
    R: ApplicationRepository + 'static,
    V: DocumentVault + 'static,
    T: AuditTrail + 'static,
    D: ActorDirectory + 'static,
{
    let audience = query.audience.unwrap_or(TimelineAudience::External);
    match service.timeline(&ApplicationId(application_id), audience) {
        Ok(data) => (StatusCode::OK, axum::Json(json!({ "data": data }))).into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn contract_timeline_handler<R, V, T, D>(
    State(service): State<Arc<LoanWorkflowService<R, V, T, D>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    V: DocumentVault + 'static,
    T: AuditTrail + 'static,
    D: ActorDirectory + 'static,
{
    match service.contract_timeline(&ApplicationId(application_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn contract_sent_handler<R, V, T, D>(
    State(service): State<Arc<LoanWorkflowService<R, V, T, D>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    V: DocumentVault + 'static,
    T: AuditTrail + 'static,
    D: ActorDirectory + 'static,
{
    let actor = match require_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.mark_contract_sent(&ApplicationId(application_id), &actor) {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(err) => error_response(&err),
    }
}

pub(crate) async fn contract_signed_handler<R, V, T, D>(
    State(service): State<Arc<LoanWorkflowService<R, V, T, D>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    V: DocumentVault + 'static,
    T: AuditTrail + 'static,
    D: ActorDirectory + 'static,
{
    let actor = match require_actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.mark_contract_signed(&ApplicationId(application_id), &actor) {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(err) => error_response(&err),
    }
}
