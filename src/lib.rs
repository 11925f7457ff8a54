//! Savings Club is a web app for running a fortnightly savings club.
//!
//! Members sign in to see their own contribution ledger, settlements and
//! attendance. Administrators manage members and record contributions,
//! attendance, outstanding fees, settlements and signed contribution sheets.
//!
//! This library provides a REST API that directly serves HTML pages, plus a
//! small JSON API for member administration.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod alert;
mod app_state;
mod attendance;
mod auth;
mod contribution;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod fortnight;
mod html;
mod internal_server_error;
mod logging;
mod member;
mod navigation;
mod not_found;
mod routing;
mod settlement;
mod sheet;
mod timezone;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{PasswordHash, ValidatedPassword};
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use member::{MemberId, NewMember, Role, create_member, get_member_by_email};
pub use routing::{STATIC_DIR, build_router, missing_static_assets};
pub use sheet::LocalSheetStorage;

use crate::{alert::Alert, internal_server_error::InternalServerError, not_found::NotFoundPage};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The email and password combination did not match a member.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The auth token cookie is missing from the cookie jar in the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// The auth token cookie could not be parsed.
    #[error("the auth token is invalid: {0}")]
    InvalidToken(String),

    /// The auth token cookie has expired.
    #[error("the auth token has expired")]
    TokenExpired,

    /// A date-time could not be computed or formatted.
    #[error("invalid date-time: {0}")]
    InvalidDateTime(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// The password and its confirmation differ.
    #[error("passwords do not match")]
    PasswordsDoNotMatch,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The password reset token is unknown, used or expired.
    #[error("the password reset link is invalid or has expired")]
    InvalidResetToken,

    /// The email address is already used by another member.
    #[error("the email \"{0}\" is already registered")]
    DuplicateEmail(String),

    /// The email given does not belong to the member.
    #[error("the email does not match the member")]
    EmailMismatch,

    /// Request input failed validation.
    #[error("{0}")]
    InvalidInput(String),

    /// A fortnight outside of 1 to 23 was given.
    #[error("fortnight {0} is not between 1 and 23")]
    InvalidFortnight(i64),

    /// A fee or settlement amount was zero or less.
    #[error("the amount must be greater than zero")]
    InvalidAmount,

    /// A contribution amount was negative.
    #[error("amounts cannot be negative")]
    NegativeAmount,

    /// A role other than `member` or `admin` was given.
    #[error("\"{0}\" is not a valid role")]
    InvalidRole(String),

    /// The signed-in member is not an administrator.
    #[error("administrator access is required")]
    Forbidden,

    /// The multipart form could not be parsed.
    #[error("Could not parse multipart form: {0}")]
    MultipartError(String),

    /// The multipart form did not contain a file.
    #[error("no file was uploaded")]
    MissingFile,

    /// The sheet storage failed to store or remove a file.
    #[error("sheet storage error: {0}")]
    StorageError(String),

    /// A CSV export could not be written.
    #[error("could not write CSV: {0}")]
    CsvError(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to update a member that does not exist
    #[error("tried to update a member that is not in the database")]
    UpdateMissingMember,

    /// Tried to delete a contribution that does not exist
    #[error("tried to delete a contribution that is not in the database")]
    DeleteMissingContribution,

    /// Tried to delete a contribution sheet that does not exist
    #[error("tried to delete a contribution sheet that is not in the database")]
    DeleteMissingSheet,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("member.email") =>
            {
                Error::DuplicateEmail(String::new())
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => NotFoundPage.into_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// The status code used when this error is reported to a client.
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidCredentials
            | Error::TooWeak(_)
            | Error::PasswordsDoNotMatch
            | Error::InvalidResetToken
            | Error::DuplicateEmail(_)
            | Error::EmailMismatch
            | Error::InvalidInput(_)
            | Error::InvalidFortnight(_)
            | Error::InvalidAmount
            | Error::NegativeAmount
            | Error::InvalidRole(_)
            | Error::MultipartError(_)
            | Error::MissingFile => StatusCode::BAD_REQUEST,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::NotFound
            | Error::UpdateMissingMember
            | Error::DeleteMissingContribution
            | Error::DeleteMissingSheet => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_alert_response(self) -> Response {
        let status_code = self.status_code();
        let description = capitalise_first_char(&self.to_string());

        let alert = match self {
            Error::InvalidTimezoneError(timezone) => Alert::Error {
                message: "Invalid Timezone Settings".to_owned(),
                details: format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            },
            Error::InvalidFortnight(_)
            | Error::InvalidAmount
            | Error::NegativeAmount
            | Error::InvalidInput(_)
            | Error::InvalidRole(_)
            | Error::TooWeak(_)
            | Error::PasswordsDoNotMatch
            | Error::InvalidResetToken
            | Error::EmailMismatch
            | Error::MissingFile => Alert::Error {
                message: "Invalid input".to_owned(),
                details: description,
            },
            Error::DuplicateEmail(email) => Alert::Error {
                message: "Duplicate Email".to_owned(),
                details: format!(
                    "The email {email} is already registered. \
                    Use a different email address or edit the existing member."
                ),
            },
            Error::Forbidden => Alert::Error {
                message: "Access Denied".to_owned(),
                details: "Only administrators can do this.".to_owned(),
            },
            Error::NotFound => Alert::Error {
                message: "Not found".to_owned(),
                details: "The requested record could not be found. \
                    Try refreshing the page."
                    .to_owned(),
            },
            Error::UpdateMissingMember => Alert::Error {
                message: "Could not update member".to_owned(),
                details: "The member could not be found.".to_owned(),
            },
            Error::DeleteMissingContribution => Alert::Error {
                message: "Could not delete contribution".to_owned(),
                details: "The contribution could not be found. \
                    Try refreshing the page to see if the contribution has already been deleted."
                    .to_owned(),
            },
            Error::DeleteMissingSheet => Alert::Error {
                message: "Could not delete sheet".to_owned(),
                details: "The contribution sheet could not be found. \
                    Try refreshing the page to see if the sheet has already been deleted."
                    .to_owned(),
            },
            Error::MultipartError(error) => Alert::Error {
                message: "Upload failed".to_owned(),
                details: error,
            },
            _ => Alert::Error {
                message: "Something went wrong".to_owned(),
                details: "An unexpected error occurred, check the server logs for more details."
                    .to_owned(),
            },
        };

        (status_code, alert).into_response()
    }

    /// Render the error as a JSON body of the form `{"error": "..."}`.
    fn into_json_response(self) -> Response {
        let status_code = self.status_code();

        let message = match &self {
            Error::Forbidden => "Unauthorized".to_owned(),
            error if status_code == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("An unexpected error occurred: {error}");
                "An unexpected error occurred".to_owned()
            }
            error => error.to_string(),
        };

        (status_code, Json(json!({ "error": message }))).into_response()
    }
}

/// From https://crates.io/crates/capitalize
fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}
