//! Member creation from the members page and from the JSON API.

use std::sync::{Arc, Mutex};

use axum::{
    Form, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    auth::MIN_PASSWORD_LENGTH,
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, password_input},
    member::{
        NewMember, Role, create_member,
        form::{address_input, form_error, full_name_input, role_select},
    },
};

/// The state needed for creating a member.
#[derive(Debug, Clone)]
pub struct CreateMemberState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateMemberState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The fields of the member creation form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberFormData {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub address: Option<String>,
    #[serde(default)]
    pub role: Role,
}

/// Check the submitted fields and hash the initial password.
///
/// The initial password only needs [MIN_PASSWORD_LENGTH] characters since the
/// member is expected to choose their own through a reset link.
fn validate_new_member(form: MemberFormData) -> Result<NewMember, Error> {
    if form.email.trim().is_empty() || form.full_name.trim().is_empty() {
        return Err(Error::InvalidInput("Invalid input".to_owned()));
    }

    let password = ValidatedPassword::new_with_min_length(&form.password)?;
    let password_hash = PasswordHash::new(password, PasswordHash::DEFAULT_COST)?;

    Ok(NewMember {
        email: form.email,
        password_hash,
        full_name: form.full_name,
        role: form.role,
        address: form.address,
    })
}

pub(super) fn create_member_form_view(form: &MemberFormData, error_message: &str) -> Markup {
    html! {
        form
            hx-post=(endpoints::POST_MEMBER)
            hx-target-error="#alert-container"
            hx-swap="outerHTML"
            class="w-full space-y-4 md:space-y-6"
        {
            (full_name_input(&form.full_name))

            div
            {
                label for="email" class=(FORM_LABEL_STYLE) { "Email" }

                input
                    id="email"
                    type="email"
                    name="email"
                    value=(form.email)
                    placeholder="member@example.com"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            (password_input("password", "Initial password", MIN_PASSWORD_LENGTH as u8, None))
            (address_input(form.address.as_deref()))
            (role_select(form.role))
            (form_error(error_message))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Member" }
        }
    }
}

/// Handle the member creation form submission.
pub async fn create_member_endpoint(
    State(state): State<CreateMemberState>,
    Form(form): Form<MemberFormData>,
) -> Response {
    let redisplay = form.clone();
    let new_member = match validate_new_member(form) {
        Ok(new_member) => new_member,
        Err(error @ Error::InvalidInput(_)) => {
            let message = format!(
                "Error: {error}. Enter a name, an email and a password of at least \
                {MIN_PASSWORD_LENGTH} characters."
            );
            return create_member_form_view(&redisplay, &message).into_response();
        }
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_member(new_member, &connection) {
        Ok(member) => {
            tracing::info!("created member {} with role {}", member.id, member.role);
            (
                HxRedirect(endpoints::MEMBERS_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => error.into_alert_response(),
    }
}

/// The body of a JSON member creation request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMemberRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub address: Option<String>,
}

/// Create a member with the role `member` from a JSON request.
///
/// Responds with `{"success": true}`, or `{"error": "..."}` on failure.
pub async fn create_member_json(
    State(state): State<CreateMemberState>,
    Json(request): Json<CreateMemberRequest>,
) -> Response {
    let form = MemberFormData {
        full_name: request.full_name.unwrap_or_default(),
        email: request.email.unwrap_or_default(),
        password: request.password.unwrap_or_default(),
        address: request.address,
        role: Role::Member,
    };

    let new_member = match validate_new_member(form) {
        Ok(new_member) => new_member,
        Err(error) => return error.into_json_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match create_member(new_member, &connection) {
        Ok(member) => {
            tracing::info!("created member {} through the API", member.id);
            (StatusCode::OK, Json(json!({ "success": true }))).into_response()
        }
        Err(error) => error.into_json_response(),
    }
}

#[cfg(test)]
mod create_member_endpoint_tests {
    use axum::{Form, extract::State, http::StatusCode};

    use crate::{
        endpoints,
        member::{Role, get_member_by_email},
        test_utils::{
            assert_form_error_message, assert_hx_redirect, must_get_alert_text, must_get_form,
            must_open_shared_test_db, parse_html_fragment,
        },
    };

    use super::{CreateMemberState, MemberFormData, create_member_endpoint};

    fn get_test_state() -> CreateMemberState {
        CreateMemberState {
            db_connection: must_open_shared_test_db(),
        }
    }

    fn form(email: &str, password: &str) -> MemberFormData {
        MemberFormData {
            full_name: "John Kari".to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
            address: Some("Auki".to_owned()),
            role: Role::Admin,
        }
    }

    #[tokio::test]
    async fn creates_member_and_redirects() {
        let state = get_test_state();

        let response =
            create_member_endpoint(State(state.clone()), Form(form("john@club.test", "kiakeke8")))
                .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::MEMBERS_VIEW);
        let connection = state.db_connection.lock().unwrap();
        let member = get_member_by_email("john@club.test", &connection)
            .unwrap()
            .expect("member should have been created");
        assert_eq!(member.full_name, "John Kari");
        assert_eq!(member.role, Role::Admin);
        assert_eq!(member.address.as_deref(), Some("Auki"));
        assert!(member.password_hash.verify("kiakeke8").unwrap());
    }

    #[tokio::test]
    async fn short_password_redisplays_form() {
        let response =
            create_member_endpoint(State(get_test_state()), Form(form("john@club.test", "short")))
                .await;

        assert_eq!(response.status(), StatusCode::OK);
        let fragment = parse_html_fragment(response).await;
        let form = must_get_form(&fragment);
        assert_form_error_message(
            &form,
            "Error: Invalid input. Enter a name, an email and a password of at least 8 characters.",
        );
    }

    #[tokio::test]
    async fn duplicate_email_returns_alert() {
        let state = get_test_state();
        create_member_endpoint(State(state.clone()), Form(form("john@club.test", "kiakeke8")))
            .await;

        let response =
            create_member_endpoint(State(state), Form(form("JOHN@club.test", "kiakeke8"))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let text = must_get_alert_text(response, "error").await;
        assert!(text.contains("john@club.test is already registered"), "got {text}");
    }
}

#[cfg(test)]
mod create_member_json_tests {
    use axum::{Json, extract::State, http::StatusCode};
    use serde_json::json;

    use crate::{
        member::{Role, get_member_by_email},
        test_utils::{must_open_shared_test_db, parse_json_body},
    };

    use super::{CreateMemberRequest, CreateMemberState, create_member_json};

    fn request(email: Option<&str>, password: Option<&str>) -> CreateMemberRequest {
        CreateMemberRequest {
            full_name: Some("Rose Tome".to_owned()),
            email: email.map(str::to_owned),
            password: password.map(str::to_owned),
            address: None,
        }
    }

    #[tokio::test]
    async fn creates_member_with_member_role() {
        let state = CreateMemberState {
            db_connection: must_open_shared_test_db(),
        };

        let response = create_member_json(
            State(state.clone()),
            Json(request(Some("rose@club.test"), Some("kiakeke8"))),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(parse_json_body(response).await, json!({ "success": true }));
        let connection = state.db_connection.lock().unwrap();
        let member = get_member_by_email("rose@club.test", &connection)
            .unwrap()
            .unwrap();
        assert_eq!(member.role, Role::Member);
    }

    #[tokio::test]
    async fn rejects_missing_email_and_short_password() {
        for request in [
            request(None, Some("kiakeke8")),
            request(Some(""), Some("kiakeke8")),
            request(Some("rose@club.test"), Some("short")),
            request(Some("rose@club.test"), None),
        ] {
            let state = CreateMemberState {
                db_connection: must_open_shared_test_db(),
            };

            let response = create_member_json(State(state), Json(request)).await;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                parse_json_body(response).await,
                json!({ "error": "Invalid input" })
            );
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_email() {
        let state = CreateMemberState {
            db_connection: must_open_shared_test_db(),
        };
        create_member_json(
            State(state.clone()),
            Json(request(Some("rose@club.test"), Some("kiakeke8"))),
        )
        .await;

        let response = create_member_json(
            State(state),
            Json(request(Some("rose@club.test"), Some("kiakeke8"))),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = parse_json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("already registered"));
    }
}
