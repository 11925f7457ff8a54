//! Application router configuration with public, member and admin route definitions.

use std::path::Path;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    response::Redirect,
    routing::{delete, get, patch, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    attendance::{get_attendance_page, get_take_attendance_page, save_attendance_endpoint},
    auth::{
        admin_guard, admin_guard_hx, admin_guard_json, auth_guard, auth_guard_hx,
        auth_guard_json, get_forgot_password_page, get_log_in_page, get_log_out,
        get_reset_password_page, post_log_in, post_reset_password,
    },
    contribution::{
        create_contribution_endpoint, create_fee_endpoint, delete_contribution_endpoint,
        get_ledger_export, get_ledger_page, get_member_page, get_overview_export,
        get_overview_page,
    },
    dashboard::{get_admin_dashboard_page, get_dashboard_page},
    endpoints,
    internal_server_error::get_internal_server_error_page,
    member::{
        create_member_endpoint, create_member_json, create_reset_link_endpoint,
        get_edit_member_page, get_members_page, reset_password_json, update_member_endpoint,
        update_member_json,
    },
    not_found::get_404_not_found,
    settlement::{get_admin_settlements_page, get_settlements_page, settle_payment_endpoint},
    sheet::{
        MAX_SHEET_UPLOAD_BYTES, delete_sheet_endpoint, get_sheets_page, upload_sheet_endpoint,
    },
};

/// The directory, relative to the working directory, that `/static` is served from.
pub const STATIC_DIR: &str = "static";

/// The files the pages load from `/static`.
const STATIC_ASSETS: [&str; 6] = [
    "main.css",
    "htmx-2.0.8-min.js",
    "htmx-ext-response-targets-2.0.4.js",
    "echarts.6.0.0.min.js",
    "favicon-32x32.png",
    "favicon-128x128.png",
];

/// List the static assets missing from `static_dir`.
pub fn missing_static_assets(static_dir: impl AsRef<Path>) -> Vec<&'static str> {
    let static_dir = static_dir.as_ref();

    STATIC_ASSETS
        .into_iter()
        .filter(|asset| !static_dir.join(asset).is_file())
        .collect()
}

/// Return a router with all the app's routes.
///
/// Uploaded sheets are served from `uploads_dir` to signed-in members.
pub fn build_router(state: AppState, uploads_dir: impl AsRef<Path>) -> Router {
    let public_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(
            endpoints::FORGOT_PASSWORD_VIEW,
            get(get_forgot_password_page),
        )
        .route(endpoints::RESET_PASSWORD_VIEW, get(get_reset_password_page))
        .route(endpoints::RESET_PASSWORD_API, post(post_reset_password))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let member_pages = Router::new()
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::LEDGER_VIEW, get(get_ledger_page))
        .route(endpoints::LEDGER_EXPORT, get(get_ledger_export))
        .route(endpoints::SETTLEMENTS_VIEW, get(get_settlements_page))
        .route(endpoints::ATTENDANCE_VIEW, get(get_attendance_page))
        .nest_service(endpoints::UPLOADS, ServeDir::new(uploads_dir))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // Route layers wrap the routes added before them, so the auth guard added
    // last runs first and puts the member ID where the admin guard expects it.
    let admin_pages = Router::new()
        .route(endpoints::ADMIN_DASHBOARD_VIEW, get(get_admin_dashboard_page))
        .route(endpoints::MEMBERS_VIEW, get(get_members_page))
        .route(endpoints::MEMBER_VIEW, get(get_member_page))
        .route(endpoints::EDIT_MEMBER_VIEW, get(get_edit_member_page))
        .route(
            endpoints::CONTRIBUTIONS_OVERVIEW_VIEW,
            get(get_overview_page),
        )
        .route(
            endpoints::CONTRIBUTIONS_OVERVIEW_EXPORT,
            get(get_overview_export),
        )
        .route(
            endpoints::ADMIN_ATTENDANCE_VIEW,
            get(get_take_attendance_page),
        )
        .route(
            endpoints::ADMIN_SETTLEMENTS_VIEW,
            get(get_admin_settlements_page),
        )
        .route(endpoints::SHEETS_VIEW, get(get_sheets_page))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_guard))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These routes are called by htmx and need the HX-Redirect header for auth redirects to work.
    let admin_endpoints = Router::new()
        .route(endpoints::POST_MEMBER, post(create_member_endpoint))
        .route(endpoints::PUT_MEMBER, put(update_member_endpoint))
        .route(
            endpoints::MEMBER_RESET_LINK,
            post(create_reset_link_endpoint),
        )
        .route(
            endpoints::POST_CONTRIBUTION,
            post(create_contribution_endpoint),
        )
        .route(endpoints::POST_FEE, post(create_fee_endpoint))
        .route(endpoints::POST_SETTLEMENT, post(settle_payment_endpoint))
        .route(
            endpoints::DELETE_CONTRIBUTION,
            delete(delete_contribution_endpoint),
        )
        .route(endpoints::POST_ATTENDANCE, post(save_attendance_endpoint))
        .route(
            endpoints::POST_SHEET,
            post(upload_sheet_endpoint).layer(DefaultBodyLimit::max(MAX_SHEET_UPLOAD_BYTES)),
        )
        .route(endpoints::DELETE_SHEET, delete(delete_sheet_endpoint))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_guard_hx,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx));

    let admin_api = Router::new()
        .route(endpoints::ADMIN_CREATE_MEMBER_API, post(create_member_json))
        .route(endpoints::ADMIN_UPDATE_MEMBER_API, patch(update_member_json))
        .route(
            endpoints::ADMIN_RESET_PASSWORD_API,
            post(reset_password_json),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_guard_json,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_guard_json,
        ));

    public_routes
        .merge(member_pages)
        .merge(admin_pages)
        .merge(admin_endpoints)
        .merge(admin_api)
        .nest_service(endpoints::STATIC, ServeDir::new(STATIC_DIR))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}

#[cfg(test)]
mod root_route_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::{endpoints, routing::get_index_page};

    #[tokio::test]
    async fn root_redirects_to_dashboard() {
        let response = get_index_page().await.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let location = response.headers().get("location").unwrap();
        assert_eq!(location, endpoints::DASHBOARD_VIEW);
    }
}
