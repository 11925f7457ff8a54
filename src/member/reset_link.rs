//! Endpoints for administrators to issue password reset links.
//!
//! Links are shown to the administrator, who passes them on to the member.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState, Error,
    alert::Alert,
    auth::{create_reset_token, reset_link},
    member::{MemberId, get_member, normalize_email},
};

/// The state needed for issuing reset links.
#[derive(Debug, Clone)]
pub struct ResetLinkState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The address members use to reach the server, e.g. "https://club.example.com".
    pub public_url: String,
}

impl FromRef<AppState> for ResetLinkState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            public_url: state.public_url.clone(),
        }
    }
}

fn issue_reset_link(
    member_id: MemberId,
    expected_email: Option<&str>,
    state: &ResetLinkState,
) -> Result<String, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let member = get_member(member_id, &connection)?;

    if let Some(email) = expected_email
        && normalize_email(email) != member.email
    {
        return Err(Error::EmailMismatch);
    }

    let token = create_reset_token(member.id, &connection)?;
    tracing::info!("issued a password reset link for member {member_id}");

    Ok(reset_link(&state.public_url, &token))
}

/// Issue a reset link for a member and show it in an alert.
pub async fn create_reset_link_endpoint(
    Path(member_id): Path<MemberId>,
    State(state): State<ResetLinkState>,
) -> Response {
    match issue_reset_link(member_id, None, &state) {
        Ok(link) => Alert::Success {
            message: "Password reset link created. It is valid for 24 hours.".to_owned(),
            details: link,
        }
        .into_response(),
        Err(error) => error.into_alert_response(),
    }
}

/// The body of a JSON reset link request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub member_id: Option<i64>,
    pub email: Option<String>,
}

/// Issue a reset link from a JSON request.
///
/// Responds with `{"link": "..."}`, or `{"error": "..."}` on failure.
pub async fn reset_password_json(
    State(state): State<ResetLinkState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Response {
    let (Some(member_id), Some(email)) = (request.member_id, request.email) else {
        return Error::InvalidInput("Missing memberId or email".to_owned()).into_json_response();
    };

    match issue_reset_link(MemberId::new(member_id), Some(&email), &state) {
        Ok(link) => (StatusCode::OK, Json(json!({ "link": link }))).into_response(),
        Err(error) => error.into_json_response(),
    }
}
