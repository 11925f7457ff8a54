//! htmx endpoints for adding and deleting contributions and fees.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// axum_extra's Form parses empty fields as None.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    contribution::{
        FeeAdjustment, NewContribution, add_contribution, add_outstanding_fee,
        delete_contribution,
    },
    database_id::DatabaseId,
    endpoints::{self, format_endpoint},
    fortnight::Fortnight,
    member::MemberId,
};

/// The state needed to change a member's contributions.
#[derive(Debug, Clone)]
pub struct RecordContributionState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RecordContributionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The fields of the add-contribution form. Blank amounts count as zero.
#[derive(Debug, Deserialize)]
pub struct ContributionForm {
    pub fortnight: i64,
    pub date: Date,
    pub shares: Option<f64>,
    pub social_fund: Option<f64>,
    pub late_fee: Option<f64>,
    pub absent_fee: Option<f64>,
    pub notes: Option<String>,
}

/// The fields of the add-fee form.
#[derive(Debug, Deserialize)]
pub struct FeeForm {
    pub amount: f64,
    pub reason: Option<String>,
    pub fortnight: i64,
    pub date: Date,
}

fn member_page_redirect(member_id: MemberId) -> Response {
    (
        HxRedirect(format_endpoint(endpoints::MEMBER_VIEW, member_id.as_i64())),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// Add a contribution for a member and reload the member page.
pub async fn create_contribution_endpoint(
    Path(member_id): Path<MemberId>,
    State(state): State<RecordContributionState>,
    Form(form): Form<ContributionForm>,
) -> Response {
    let fortnight = match Fortnight::new(form.fortnight) {
        Ok(fortnight) => fortnight,
        Err(error) => return error.into_alert_response(),
    };

    let new_contribution = NewContribution {
        member_id,
        fortnight,
        date: form.date,
        shares: form.shares.unwrap_or_default(),
        social_fund: form.social_fund.unwrap_or_default(),
        late_fee: form.late_fee.unwrap_or_default(),
        absent_fee: form.absent_fee.unwrap_or_default(),
        notes: form.notes,
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match add_contribution(new_contribution, &connection) {
        Ok(_) => member_page_redirect(member_id),
        Err(error) => {
            tracing::warn!("could not add contribution for member {member_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// Add an outstanding fee to a member's balance and reload the member page.
pub async fn create_fee_endpoint(
    Path(member_id): Path<MemberId>,
    State(state): State<RecordContributionState>,
    Form(form): Form<FeeForm>,
) -> Response {
    let fortnight = match Fortnight::new(form.fortnight) {
        Ok(fortnight) => fortnight,
        Err(error) => return error.into_alert_response(),
    };

    let fee = FeeAdjustment {
        member_id,
        amount: form.amount,
        reason: form.reason.unwrap_or_default(),
        fortnight,
        date: form.date,
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match add_outstanding_fee(fee, &connection) {
        Ok(_) => member_page_redirect(member_id),
        Err(error) => error.into_alert_response(),
    }
}

/// Delete a contribution and reload the owner's member page.
///
/// The page is reloaded rather than the row removed since deleting the
/// latest row moves the balance onto another row.
pub async fn delete_contribution_endpoint(
    Path(contribution_id): Path<DatabaseId>,
    State(state): State<RecordContributionState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_contribution(contribution_id, &connection) {
        Ok(contribution) => member_page_redirect(contribution.member_id),
        Err(error) => error.into_alert_response(),
    }
}
