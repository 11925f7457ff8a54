//! Alert system for displaying success and error messages to users.
//!
//! Alerts are returned from htmx endpoints and swapped into the
//! `#alert-container` element that [base](crate::html::base) renders on every page.

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

/// A dismissible message shown after an action completes or fails.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// The action worked, with some extra detail.
    Success { message: String, details: String },
    /// The action worked.
    SuccessSimple { message: String },
    /// The action failed, with an explanation.
    Error { message: String, details: String },
    /// The action failed.
    ErrorSimple { message: String },
}

impl Alert {
    /// Render the alert as an HTML fragment.
    pub fn into_html(self) -> Markup {
        let (is_error, message, details) = match self {
            Alert::Success { message, details } => (false, message, details),
            Alert::SuccessSimple { message } => (false, message, String::new()),
            Alert::Error { message, details } => (true, message, details),
            Alert::ErrorSimple { message } => (true, message, String::new()),
        };

        let style = if is_error {
            "text-red-800 border-red-300 bg-red-50 dark:bg-gray-800 \
            dark:text-red-400 dark:border-red-800"
        } else {
            "text-green-800 border-green-300 bg-green-50 dark:bg-gray-800 \
            dark:text-green-400 dark:border-green-800"
        };

        html! {
            div
                role="alert"
                data-alert-kind=(if is_error { "error" } else { "success" })
                class={ "flex items-start justify-between gap-4 p-4 mb-4 text-sm border rounded-lg shadow " (style) }
            {
                div
                {
                    p class="font-semibold" { (message) }

                    @if !details.is_empty() {
                        p class="mt-1 break-words" { (details) }
                    }
                }

                button
                    type="button"
                    aria-label="Dismiss"
                    class="font-bold"
                    onclick="this.closest('[role=alert]').remove()"
                {
                    "×"
                }
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_html().into_response()
    }
}
