//! Member editing page and endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Form, Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState, Error, endpoints,
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, LINK_STYLE, base},
    member::{
        MemberId, MemberUpdate, Role,
        form::{address_input, form_error, full_name_input, role_select},
        get_member, update_member,
    },
    navigation::NavBar,
};

/// The state needed for editing a member.
#[derive(Debug, Clone)]
pub struct EditMemberState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditMemberState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The fields of the member editing form.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberUpdateFormData {
    pub full_name: String,
    pub address: Option<String>,
    pub role: Role,
}

fn validate_update(
    full_name: &str,
    address: Option<String>,
    role: Role,
) -> Result<MemberUpdate, Error> {
    if full_name.trim().is_empty() {
        return Err(Error::InvalidInput("Full name cannot be empty".to_owned()));
    }

    Ok(MemberUpdate {
        full_name: full_name.to_owned(),
        address,
        role,
    })
}

/// Render the member editing page.
pub async fn get_edit_member_page(
    Path(member_id): Path<MemberId>,
    State(state): State<EditMemberState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let member = get_member(member_id, &connection)?;
    let update = MemberUpdate {
        full_name: member.full_name,
        address: member.address,
        role: member.role,
    };

    Ok(edit_member_view(member_id, &update).into_response())
}

fn edit_member_view(member_id: MemberId, update: &MemberUpdate) -> Markup {
    let nav_bar = NavBar::new(endpoints::MEMBERS_VIEW, Role::Admin).into_html();
    let member_url = endpoints::format_endpoint(endpoints::MEMBER_VIEW, member_id.as_i64());

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            div class="w-full max-w-md space-y-4"
            {
                h1 class="text-xl font-bold" { "Edit Member" }

                (edit_member_form_view(member_id, update, ""))

                a href=(member_url) class=(LINK_STYLE) { "Back to member" }
            }
        }
    };

    base("Edit Member", &[], &content)
}

fn edit_member_form_view(
    member_id: MemberId,
    update: &MemberUpdate,
    error_message: &str,
) -> Markup {
    let update_endpoint = endpoints::format_endpoint(endpoints::PUT_MEMBER, member_id.as_i64());

    html! {
        form
            hx-put=(update_endpoint)
            hx-target-error="#alert-container"
            hx-swap="outerHTML"
            class="w-full space-y-4 md:space-y-6"
        {
            (full_name_input(&update.full_name))
            (address_input(update.address.as_deref()))
            (role_select(update.role))
            (form_error(error_message))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save Member" }
        }
    }
}

/// Handle the member editing form submission.
pub async fn update_member_endpoint(
    Path(member_id): Path<MemberId>,
    State(state): State<EditMemberState>,
    Form(form): Form<MemberUpdateFormData>,
) -> Response {
    let update = match validate_update(&form.full_name, form.address.clone(), form.role) {
        Ok(update) => update,
        Err(error) => {
            let redisplay = MemberUpdate {
                full_name: form.full_name,
                address: form.address,
                role: form.role,
            };
            return edit_member_form_view(member_id, &redisplay, &format!("Error: {error}"))
                .into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_member(member_id, &update, &connection) {
        Ok(()) => (
            HxRedirect(endpoints::format_endpoint(
                endpoints::MEMBER_VIEW,
                member_id.as_i64(),
            )),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::warn!("could not update member {member_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// The body of a JSON member update request.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMemberRequest {
    pub id: Option<i64>,
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub role: Option<String>,
}

/// Update a member's name, address and role from a JSON request.
///
/// Responds with `{"success": true}`, or `{"error": "..."}` on failure.
pub async fn update_member_json(
    State(state): State<EditMemberState>,
    Json(request): Json<UpdateMemberRequest>,
) -> Response {
    let (Some(id), Some(full_name)) = (request.id, request.full_name) else {
        return Error::InvalidInput("Missing id or full_name".to_owned()).into_json_response();
    };

    let role = match request.role.as_deref().map(str::parse::<Role>).transpose() {
        Ok(role) => role.unwrap_or_default(),
        Err(error) => return error.into_json_response(),
    };

    let update = match validate_update(&full_name, request.address, role) {
        Ok(update) => update,
        Err(error) => return error.into_json_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match update_member(MemberId::new(id), &update, &connection) {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(error) => error.into_json_response(),
    }
}


#[cfg(test)]
mod update_member_tests {
    use axum::{
        Form, Json,
        extract::{Path, State},
        http::StatusCode,
    };
    use serde_json::json;

    use crate::{
        endpoints,
        member::{MemberId, Role, get_member, test_members::must_create_member},
        test_utils::{
            assert_form_error_message, assert_hx_redirect, must_get_form,
            must_open_shared_test_db, parse_html_fragment, parse_json_body,
        },
    };

    use super::{
        EditMemberState, MemberUpdateFormData, UpdateMemberRequest, update_member_endpoint,
        update_member_json,
    };

    fn get_test_state() -> (EditMemberState, MemberId) {
        let state = EditMemberState {
            db_connection: must_open_shared_test_db(),
        };
        let member = must_create_member(
            "Ben Suri",
            Role::Member,
            &state.db_connection.lock().unwrap(),
        );

        (state, member.id)
    }

    #[tokio::test]
    async fn form_update_saves_and_redirects() {
        let (state, member_id) = get_test_state();

        let response = update_member_endpoint(
            Path(member_id),
            State(state.clone()),
            Form(MemberUpdateFormData {
                full_name: "Benjamin Suri".to_owned(),
                address: Some("Gizo".to_owned()),
                role: Role::Admin,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(
            &response,
            &endpoints::format_endpoint(endpoints::MEMBER_VIEW, member_id.as_i64()),
        );
        let member = get_member(member_id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(member.full_name, "Benjamin Suri");
        assert_eq!(member.address.as_deref(), Some("Gizo"));
        assert_eq!(member.role, Role::Admin);
    }

    #[tokio::test]
    async fn empty_name_redisplays_form() {
        let (state, member_id) = get_test_state();

        let response = update_member_endpoint(
            Path(member_id),
            State(state),
            Form(MemberUpdateFormData {
                full_name: "  ".to_owned(),
                address: None,
                role: Role::Member,
            }),
        )
        .await;

        let fragment = parse_html_fragment(response).await;
        let form = must_get_form(&fragment);
        assert_form_error_message(&form, "Error: Full name cannot be empty");
    }

    #[tokio::test]
    async fn json_update_succeeds() {
        let (state, member_id) = get_test_state();

        let response = update_member_json(
            State(state.clone()),
            Json(UpdateMemberRequest {
                id: Some(member_id.as_i64()),
                full_name: Some("Ben S.".to_owned()),
                address: None,
                role: Some("admin".to_owned()),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(parse_json_body(response).await, json!({ "success": true }));
        let member = get_member(member_id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(member.role, Role::Admin);
    }

    #[tokio::test]
    async fn json_update_of_unknown_member_is_not_found() {
        let (state, _) = get_test_state();

        let response = update_member_json(
            State(state),
            Json(UpdateMemberRequest {
                id: Some(404),
                full_name: Some("Nobody".to_owned()),
                address: None,
                role: None,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn json_update_rejects_unknown_role() {
        let (state, member_id) = get_test_state();

        let response = update_member_json(
            State(state),
            Json(UpdateMemberRequest {
                id: Some(member_id.as_i64()),
                full_name: Some("Ben".to_owned()),
                address: None,
                role: Some("treasurer".to_owned()),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
