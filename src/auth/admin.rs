//! Middleware that limits routes to administrators.
//!
//! These guards must run after one of the auth guards, which put the signed-in
//! member's [MemberId] into the request extensions.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    html::{PAGE_CONTAINER_STYLE, base, link},
    member::{MemberId, Role, get_member},
    navigation::NavBar,
};

/// The state needed to look up a member's role.
#[derive(Debug, Clone)]
pub struct AdminGuardState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AdminGuardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn get_role(state: &AdminGuardState, request: &Request) -> Result<Role, Error> {
    let member_id = request
        .extensions()
        .get::<MemberId>()
        .copied()
        .ok_or_else(|| {
            tracing::error!(
                "admin guard ran without a member ID for {}, check the auth guard is applied",
                request.uri()
            );
            Error::Forbidden
        })?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    match get_member(member_id, &connection) {
        Ok(member) => Ok(member.role),
        // The member was removed after logging in.
        Err(Error::NotFound) => Err(Error::Forbidden),
        Err(error) => Err(error),
    }
}

async fn admin_guard_internal(
    state: AdminGuardState,
    request: Request,
    next: Next,
    reject: impl Fn(Error) -> Response,
) -> Response {
    match get_role(&state, &request) {
        Ok(Role::Admin) => next.run(request).await,
        Ok(Role::Member) => {
            tracing::warn!("member tried to access admin route {}", request.uri());
            reject(Error::Forbidden)
        }
        Err(error) => reject(error),
    }
}

/// Guards admin pages: other members get an "Access Denied" page.
pub async fn admin_guard(
    State(state): State<AdminGuardState>,
    request: Request,
    next: Next,
) -> Response {
    admin_guard_internal(state, request, next, |error| match error {
        Error::Forbidden => (StatusCode::FORBIDDEN, access_denied_view()).into_response(),
        error => error.into_response(),
    })
    .await
}

/// Guards admin htmx endpoints: other members get an error alert.
pub async fn admin_guard_hx(
    State(state): State<AdminGuardState>,
    request: Request,
    next: Next,
) -> Response {
    admin_guard_internal(state, request, next, Error::into_alert_response).await
}

/// Guards the JSON admin API: other members get a 403 with `{"error":"Unauthorized"}`.
pub async fn admin_guard_json(
    State(state): State<AdminGuardState>,
    request: Request,
    next: Next,
) -> Response {
    admin_guard_internal(state, request, next, Error::into_json_response).await
}

fn access_denied_view() -> Markup {
    let nav_bar = NavBar::new("", Role::Member).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="max-w-md text-center space-y-4"
            {
                h1 class="text-2xl font-bold" { "Access Denied" }

                p
                {
                    "This page is only available to club administrators. "
                    (link(endpoints::DASHBOARD_VIEW, "Back to your dashboard"))
                }
            }
        }
    };

    base("Access Denied", &[], &content)
}
