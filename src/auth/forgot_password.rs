use axum::{response::IntoResponse, response::Response};
use maud::{Markup, html};

use crate::{
    endpoints,
    html::{LINK_STYLE, base, log_in_register},
};

fn forgot_password_template() -> Markup {
    let content = html! {
        p class="text-justify"
        {
            "Passwords are reset by a club administrator. Ask an administrator
            to issue a reset link for your account, then open the link to
            choose a new password. Reset links expire after 24 hours and can
            only be used once."
        }

        p class="text-sm"
        {
            a href=(endpoints::LOG_IN_VIEW) class=(LINK_STYLE) { "Back to log in" }
        }
    };

    base(
        "Forgot Password",
        &[],
        &log_in_register("Forgot your password?", &content),
    )
}

/// Renders a page describing how the member's password can be reset.
pub async fn get_forgot_password_page() -> Response {
    forgot_password_template().into_response()
}
