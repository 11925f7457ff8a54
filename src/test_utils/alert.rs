use axum::{body::Body, response::Response};
use scraper::{Html, Selector};

use crate::test_utils::parse_html_fragment;

/// Parse an alert fragment and check its kind, returning the alert's text.
pub(crate) async fn must_get_alert_text(response: Response<Body>, want_kind: &str) -> String {
    let fragment = parse_html_fragment(response).await;

    alert_text(&fragment, want_kind)
}

#[track_caller]
fn alert_text(fragment: &Html, want_kind: &str) -> String {
    let alert = fragment
        .select(&Selector::parse("[role=alert]").unwrap())
        .next()
        .expect("No alert found");
    let got_kind = alert.value().attr("data-alert-kind").unwrap_or_default();

    assert_eq!(
        got_kind, want_kind,
        "want {want_kind} alert, got {got_kind}"
    );

    alert.text().collect()
}
