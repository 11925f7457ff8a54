//! Single-use password reset links.
//!
//! An administrator issues a link for a member, and the member follows it to
//! choose a new password. Links expire after [RESET_TOKEN_DURATION].

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword, endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, LINK_STYLE, base, error_view, loading_spinner, log_in_register,
        password_input,
    },
    member::{MemberId, set_member_password},
};

/// How long a reset link stays valid after it is issued.
pub const RESET_TOKEN_DURATION: Duration = Duration::hours(24);

pub fn create_password_reset_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS password_reset (
            token TEXT PRIMARY KEY,
            member_id INTEGER NOT NULL,
            expires_at TEXT NOT NULL,
            FOREIGN KEY(member_id) REFERENCES member(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Issue a new reset token for `member_id`.
///
/// Expired tokens of the member are removed first.
///
/// # Errors
/// Returns [Error::NotFound] if the member does not exist, or an SQL error.
pub fn create_reset_token(member_id: MemberId, connection: &Connection) -> Result<String, Error> {
    let token = Uuid::new_v4().to_string();
    let now = OffsetDateTime::now_utc();
    let expires_at = now + RESET_TOKEN_DURATION;

    let removed = connection.execute(
        "DELETE FROM password_reset WHERE member_id = ?1 AND expires_at <= ?2",
        (member_id, now),
    )?;
    if removed > 0 {
        tracing::debug!("removed {removed} expired reset tokens for member {member_id}");
    }

    connection
        .execute(
            "INSERT INTO password_reset (token, member_id, expires_at) VALUES (?1, ?2, ?3)",
            (&token, member_id, expires_at),
        )
        .map_err(|error| match error {
            // Code 787 occurs when a FOREIGN KEY constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, _) if sql_error.extended_code == 787 => {
                Error::NotFound
            }
            error => error.into(),
        })?;

    Ok(token)
}

/// The link a member follows to reset their password.
pub fn reset_link(public_url: &str, token: &str) -> String {
    format!(
        "{}{}?token={token}",
        public_url.trim_end_matches('/'),
        endpoints::RESET_PASSWORD_VIEW
    )
}

/// Look up the member a token was issued for, ignoring expired tokens.
fn find_reset_token(token: &str, connection: &Connection) -> Result<MemberId, Error> {
    let row: Option<(MemberId, OffsetDateTime)> = connection
        .query_row(
            "SELECT member_id, expires_at FROM password_reset WHERE token = ?1",
            [token],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match row {
        Some((member_id, expires_at)) if expires_at > OffsetDateTime::now_utc() => Ok(member_id),
        _ => Err(Error::InvalidResetToken),
    }
}

/// Set a new password for the member that `token` was issued for, and consume the token.
///
/// The lookup, the password update and the token removal happen in one transaction.
///
/// # Errors
/// Returns [Error::InvalidResetToken] if the token is unknown, used or expired.
pub fn reset_password_with_token(
    token: &str,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<MemberId, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let member_id = find_reset_token(token, &transaction)?;
    set_member_password(member_id, password_hash, &transaction)?;
    transaction.execute(
        "DELETE FROM password_reset WHERE member_id = ?1",
        [member_id],
    )?;

    transaction.commit()?;

    Ok(member_id)
}

#[derive(Debug, Clone)]
pub struct ResetPasswordState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ResetPasswordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResetTokenQuery {
    pub token: Option<String>,
}

fn reset_password_form(token: &str, error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::RESET_PASSWORD_API)
            hx-indicator="#indicator"
            hx-target-error="#alert-container"
            class="space-y-4 md:space-y-6"
        {
            input type="hidden" name="token" value=(token);

            (password_input("password", "New password", 8, error_message))
            (password_input("confirm_password", "Confirm new password", 8, None))

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Set password"
            }
        }
    }
}

fn invalid_link_page() -> Response {
    (
        StatusCode::BAD_REQUEST,
        error_view(
            "Invalid Link",
            "400",
            "This password reset link is invalid or has expired.",
            "Ask a club administrator for a new link.",
        ),
    )
        .into_response()
}

/// Display the form for choosing a new password, if the token in the query is still valid.
pub async fn get_reset_password_page(
    State(state): State<ResetPasswordState>,
    Query(query): Query<ResetTokenQuery>,
) -> Result<Response, Error> {
    let Some(token) = query.token.filter(|token| !token.is_empty()) else {
        return Ok(invalid_link_page());
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    match find_reset_token(&token, &connection) {
        Ok(_) => {}
        Err(Error::InvalidResetToken) => return Ok(invalid_link_page()),
        Err(error) => return Err(error),
    }

    let content = html! {
        (reset_password_form(&token, None))

        p class="text-sm"
        {
            a href=(endpoints::LOG_IN_VIEW) class=(LINK_STYLE) { "Back to log in" }
        }
    };

    Ok(base(
        "Reset Password",
        &[],
        &log_in_register("Choose a new password", &content),
    )
    .into_response())
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordForm {
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

/// Set a new password from the reset form and redirect to the log-in page.
///
/// Weak or mismatched passwords re-render the form with an explanation.
pub async fn post_reset_password(
    State(state): State<ResetPasswordState>,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    let form_with_error = |message: &str| reset_password_form(&form.token, Some(message));

    if form.password != form.confirm_password {
        return form_with_error("Passwords do not match.").into_response();
    }

    let password = match ValidatedPassword::new(&form.password) {
        Ok(password) => password,
        Err(Error::TooWeak(feedback)) => {
            return form_with_error(&format!("Password is too weak: {feedback}")).into_response();
        }
        Err(error) => return error.into_alert_response(),
    };

    let password_hash = match PasswordHash::new(password, PasswordHash::DEFAULT_COST) {
        Ok(password_hash) => password_hash,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match reset_password_with_token(&form.token, &password_hash, &connection) {
        Ok(member_id) => {
            tracing::info!("member {member_id} reset their password");
            (
                HxRedirect(endpoints::LOG_IN_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => error.into_alert_response(),
    }
}

#[cfg(test)]
mod reset_token_tests {
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error, PasswordHash,
        db::initialize,
        member::{MemberId, Role, get_member, test_members::must_create_member},
    };

    use super::{create_reset_token, reset_link, reset_password_with_token};

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn token_resets_password_once() {
        let connection = get_test_connection();
        let member = must_create_member("Ana Ramo", Role::Member, &connection);
        let token = create_reset_token(member.id, &connection).unwrap();
        let new_hash = PasswordHash::new_unchecked("new-hash");

        let member_id = reset_password_with_token(&token, &new_hash, &connection).unwrap();

        assert_eq!(member_id, member.id);
        let updated = get_member(member.id, &connection).unwrap();
        assert_eq!(updated.password_hash, new_hash);
        assert_eq!(
            reset_password_with_token(&token, &new_hash, &connection),
            Err(Error::InvalidResetToken)
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let connection = get_test_connection();
        let member = must_create_member("Ana Ramo", Role::Member, &connection);
        connection
            .execute(
                "INSERT INTO password_reset (token, member_id, expires_at) VALUES (?1, ?2, ?3)",
                (
                    "stale",
                    member.id,
                    OffsetDateTime::now_utc() - Duration::minutes(1),
                ),
            )
            .unwrap();

        let result = reset_password_with_token(
            "stale",
            &PasswordHash::new_unchecked("new-hash"),
            &connection,
        );

        assert_eq!(result, Err(Error::InvalidResetToken));
    }

    #[test]
    fn new_token_removes_expired_tokens() {
        let connection = get_test_connection();
        let member = must_create_member("Ana Ramo", Role::Member, &connection);
        connection
            .execute(
                "INSERT INTO password_reset (token, member_id, expires_at) VALUES (?1, ?2, ?3)",
                (
                    "stale",
                    member.id,
                    OffsetDateTime::now_utc() - Duration::minutes(1),
                ),
            )
            .unwrap();
        let first = create_reset_token(member.id, &connection).unwrap();

        let second = create_reset_token(member.id, &connection).unwrap();

        let mut tokens: Vec<String> = connection
            .prepare("SELECT token FROM password_reset WHERE member_id = ?1")
            .unwrap()
            .query_map([member.id], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        tokens.sort();
        let mut want = vec![first, second];
        want.sort();
        assert_eq!(tokens, want);
    }

    #[test]
    fn token_for_missing_member_is_not_found() {
        let connection = get_test_connection();

        let result = create_reset_token(MemberId::new(42), &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn link_contains_token() {
        assert_eq!(
            reset_link("https://club.test/", "abc"),
            "https://club.test/reset_password?token=abc"
        );
    }
}

#[cfg(test)]
mod reset_password_route_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Form,
        extract::{Query, State},
        http::StatusCode,
    };
    use rusqlite::Connection;

    use crate::{
        db::initialize,
        endpoints,
        member::{MemberId, Role, get_member, test_members::must_create_member},
        test_utils::{
            assert_form_error_message, assert_hx_endpoint, assert_hx_redirect, assert_valid_html,
            must_get_form, parse_html_document, parse_html_fragment,
        },
    };

    use super::{
        ResetPasswordForm, ResetPasswordState, ResetTokenQuery, create_reset_token,
        get_reset_password_page, post_reset_password,
    };

    fn get_test_state() -> (ResetPasswordState, String) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let member = must_create_member("Ana Ramo", Role::Member, &connection);
        let token = create_reset_token(member.id, &connection).unwrap();

        (
            ResetPasswordState {
                db_connection: Arc::new(Mutex::new(connection)),
            },
            token,
        )
    }

    #[tokio::test]
    async fn page_shows_form_for_valid_token() {
        let (state, token) = get_test_state();

        let response = get_reset_password_page(
            State(state),
            Query(ResetTokenQuery {
                token: Some(token.clone()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::RESET_PASSWORD_API, "hx-post");
    }

    #[tokio::test]
    async fn page_rejects_unknown_token() {
        let (state, _) = get_test_state();

        let response = get_reset_password_page(
            State(state),
            Query(ResetTokenQuery {
                token: Some("not-a-token".to_owned()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn strong_password_is_saved_and_redirects_to_log_in() {
        let (state, token) = get_test_state();
        let db_connection = state.db_connection.clone();
        let password = "correct horse battery staple".to_owned();

        let response = post_reset_password(
            State(state),
            Form(ResetPasswordForm {
                token,
                password: password.clone(),
                confirm_password: password.clone(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::LOG_IN_VIEW);
        let connection = db_connection.lock().unwrap();
        let member = get_member(MemberId::new(1), &connection).unwrap();
        assert!(member.password_hash.verify(&password).unwrap());
    }

    #[tokio::test]
    async fn mismatched_passwords_show_error() {
        let (state, token) = get_test_state();

        let response = post_reset_password(
            State(state),
            Form(ResetPasswordForm {
                token,
                password: "correct horse battery staple".to_owned(),
                confirm_password: "correct horse battery stable".to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let fragment = parse_html_fragment(response).await;
        let form = must_get_form(&fragment);
        assert_form_error_message(&form, "Passwords do not match.");
    }

    #[tokio::test]
    async fn weak_password_is_rejected() {
        let (state, token) = get_test_state();

        let response = post_reset_password(
            State(state),
            Form(ResetPasswordForm {
                token,
                password: "password".to_owned(),
                confirm_password: "password".to_owned(),
            }),
        )
        .await;

        let fragment = parse_html_fragment(response).await;
        let form = must_get_form(&fragment);
        let text = form.text().collect::<String>();
        assert!(text.contains("Password is too weak"), "got {text}");
    }

    #[tokio::test]
    async fn unknown_token_returns_alert() {
        let (state, _) = get_test_state();
        let password = "correct horse battery staple".to_owned();

        let response = post_reset_password(
            State(state),
            Form(ResetPasswordForm {
                token: "not-a-token".to_owned(),
                password: password.clone(),
                confirm_password: password,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
