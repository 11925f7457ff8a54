//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/members/{member_id}', use [format_endpoint].

/// The root route which redirects to the dashboard or log in page.
pub const ROOT: &str = "/";
/// The landing page for logged in members.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page showing a member's own contribution ledger.
pub const LEDGER_VIEW: &str = "/ledger";
/// The CSV download of a member's own contribution ledger.
pub const LEDGER_EXPORT: &str = "/ledger/export";
/// The page showing a member's outstanding fee and payments.
pub const SETTLEMENTS_VIEW: &str = "/settlements";
/// The page showing a member's attendance history.
pub const ATTENDANCE_VIEW: &str = "/attendance";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The route for instructions for resetting a password.
pub const FORGOT_PASSWORD_VIEW: &str = "/forgot_password";
/// The page for choosing a new password with a reset token.
pub const RESET_PASSWORD_VIEW: &str = "/reset_password";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";
/// The route for uploaded contribution sheets.
pub const UPLOADS: &str = "/uploads";

/// The administrator's dashboard.
pub const ADMIN_DASHBOARD_VIEW: &str = "/admin";
/// The page listing members.
pub const MEMBERS_VIEW: &str = "/admin/members";
/// The page showing one member's contributions.
pub const MEMBER_VIEW: &str = "/admin/members/{member_id}";
/// The page for editing a member.
pub const EDIT_MEMBER_VIEW: &str = "/admin/members/{member_id}/edit";
/// The page showing every member's totals.
pub const CONTRIBUTIONS_OVERVIEW_VIEW: &str = "/admin/contributions";
/// The CSV download of every member's totals.
pub const CONTRIBUTIONS_OVERVIEW_EXPORT: &str = "/admin/contributions/export";
/// The page for taking attendance.
pub const ADMIN_ATTENDANCE_VIEW: &str = "/admin/attendance";
/// The page for settling outstanding fees.
pub const ADMIN_SETTLEMENTS_VIEW: &str = "/admin/settlements";
/// The page for uploading signed contribution sheets.
pub const SHEETS_VIEW: &str = "/admin/sheets";

/// The route for logging in a member.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current member.
pub const LOG_OUT: &str = "/api/log_out";
/// The route for setting a new password with a reset token.
pub const RESET_PASSWORD_API: &str = "/api/reset_password";
/// The route to create a member.
pub const POST_MEMBER: &str = "/api/members";
/// The route to update a member.
pub const PUT_MEMBER: &str = "/api/members/{member_id}";
/// The route to issue a password reset link for a member.
pub const MEMBER_RESET_LINK: &str = "/api/members/{member_id}/reset_link";
/// The route to add a contribution for a member.
pub const POST_CONTRIBUTION: &str = "/api/members/{member_id}/contributions";
/// The route to add an outstanding fee for a member.
pub const POST_FEE: &str = "/api/members/{member_id}/fees";
/// The route to settle a payment for a member.
pub const POST_SETTLEMENT: &str = "/api/members/{member_id}/settlements";
/// The route to delete a contribution.
pub const DELETE_CONTRIBUTION: &str = "/api/contributions/{contribution_id}";
/// The route to save attendance for a fortnight.
pub const POST_ATTENDANCE: &str = "/api/attendance";
/// The route to upload a contribution sheet.
pub const POST_SHEET: &str = "/api/sheets";
/// The route to delete a contribution sheet.
pub const DELETE_SHEET: &str = "/api/sheets/{sheet_id}";

/// The JSON route for creating a member.
pub const ADMIN_CREATE_MEMBER_API: &str = "/api/admin/create-member";
/// The JSON route for updating a member.
pub const ADMIN_UPDATE_MEMBER_API: &str = "/api/admin/update-member";
/// The JSON route for generating a password reset link.
pub const ADMIN_RESET_PASSWORD_API: &str = "/api/admin/reset-password";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/members/{member_id}', '{member_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
