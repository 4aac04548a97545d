use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use snapshot::{AttributeSet, TicketType};
use std::sync::Arc;
use validation::{AttendeeClaim, Outcome, RefreshSummary, Verdict};

/// Attendee validation response
///
/// Every attribute flag (`is_speaker`, `is_remote`, ...) is always present
/// inline and is `false` on a rejection. `hint` is empty on success.
#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub is_attendee: bool,
    pub outcome: Outcome,
    pub hint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_type: Option<String>,
    #[serde(flatten)]
    pub attributes: AttributeSet,
}

impl From<Verdict> for ValidationResponse {
    fn from(verdict: Verdict) -> Self {
        let is_attendee = verdict.is_attendee();
        Self {
            is_attendee,
            outcome: verdict.outcome,
            hint: verdict.hint,
            reference: verdict.reference,
            order: verdict.order,
            name: verdict.name,
            ticket_type: verdict.ticket_type,
            attributes: if is_attendee {
                verdict.attributes
            } else {
                AttributeSet::default()
            },
        }
    }
}

/// Email validation request
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

/// Refresh response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: String,
    pub summary: RefreshSummary,
}

/// Validate an attendee claim (order code, ticket id or email, plus name).
///
/// Status follows the verdict: 200 accepted, 404 not found, 406 close
/// match / wrong ticket type / mismatched identifiers. Malformed claims are
/// rejected with 422 before the engine runs.
pub async fn validate_attendee(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<AttendeeClaim>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let Json(claim) = payload?;
    let verdict = state.validator.validate_attendee(&claim).await?;

    let status = StatusCode::from_u16(verdict.outcome.status_code())
        .map_err(|err| ServerError::Internal(err.to_string()))?;

    Ok((status, Json(ValidationResponse::from(verdict))))
}

/// Check whether an email belongs to an in-scope ticket.
pub async fn validate_email(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let Json(request) = payload?;
    let valid = state.validator.validate_email(&request.email).await?;

    let status = if valid {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    Ok((status, Json(json!({ "valid": valid }))))
}

/// Rebuild the snapshot from the provider.
pub async fn refresh_all(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<Json<RefreshResponse>> {
    let summary = state.validator.refresh().await?;
    let message = format!(
        "Refreshed {} tickets and {} ticket types from {}",
        summary.sales, summary.ticket_types, summary.provider
    );
    Ok(Json(RefreshResponse { message, summary }))
}

pub async fn ticket_types(State(state): State<Arc<ServerState>>) -> Json<Vec<TicketType>> {
    Json(state.validator.ticket_types())
}

pub async fn ticket_count(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(json!({ "ticket_count": state.validator.ticket_count() }))
}
