//! Works out where to send a member after they log in.

use axum::{extract::Request, http::Uri};

use crate::endpoints;

/// Reduce `raw_url` to a path and query on this site.
///
/// Returns `None` for absolute URLs, protocol-relative URLs and the log-in
/// page itself, so that the log-in form cannot be used as an open redirect
/// or a redirect loop.
pub fn normalize_redirect_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    if uri.scheme().is_some() || uri.authority().is_some() {
        return None;
    }

    local_path_and_query(&uri)
}

/// Like [normalize_redirect_url], but accepts absolute URLs and keeps only
/// their path and query. htmx sends the full page URL in `HX-Current-URL`.
fn normalize_current_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;

    local_path_and_query(&uri)
}

fn local_path_and_query(uri: &Uri) -> Option<String> {
    let path_and_query = uri.path_and_query()?;
    let path = path_and_query.path();

    let is_local = path.starts_with('/') && !path.starts_with("//");

    (is_local && path != endpoints::LOG_IN_VIEW).then(|| path_and_query.as_str().to_owned())
}

/// The log-in page URL that brings the member back to `redirect_target`.
pub fn log_in_url_with_redirect(redirect_target: &str) -> String {
    match serde_urlencoded::to_string([("redirect_url", redirect_target)]) {
        Ok(query) => format!("{}?{query}", endpoints::LOG_IN_VIEW),
        Err(error) => {
            tracing::error!("could not encode redirect URL {redirect_target}: {error}");
            endpoints::LOG_IN_VIEW.to_owned()
        }
    }
}

/// The log-in page URL for an unauthenticated `request`.
///
/// Page requests come back to the requested page. htmx requests to `/api`
/// come back to the page that made them, taken from `HX-Current-URL`.
/// Anything else falls back to the dashboard.
pub fn build_log_in_redirect_url(request: &Request) -> String {
    let target = if request.uri().path().starts_with("/api") {
        redirect_target_from_htmx(request)
    } else {
        request
            .uri()
            .path_and_query()
            .and_then(|path_and_query| normalize_redirect_url(path_and_query.as_str()))
    };

    let target = target.unwrap_or_else(|| {
        tracing::warn!(
            "no usable redirect target for {}, falling back to the dashboard",
            request.uri()
        );
        endpoints::DASHBOARD_VIEW.to_owned()
    });

    log_in_url_with_redirect(&target)
}

fn redirect_target_from_htmx(request: &Request) -> Option<String> {
    let headers = request.headers();

    let is_htmx = headers
        .get("hx-request")
        .and_then(|header| header.to_str().ok())
        .is_some_and(|header| header.eq_ignore_ascii_case("true"));

    if !is_htmx {
        return None;
    }

    headers
        .get("hx-current-url")
        .and_then(|header| header.to_str().ok())
        .and_then(normalize_current_url)
}

#[cfg(test)]
mod redirect_tests {
    use axum::{body::Body, extract::Request};

    use crate::endpoints;

    use super::{build_log_in_redirect_url, log_in_url_with_redirect, normalize_redirect_url};

    #[test]
    fn keeps_local_paths() {
        assert_eq!(
            normalize_redirect_url("/ledger?sort=asc"),
            Some("/ledger?sort=asc".to_owned())
        );
    }

    #[test]
    fn rejects_off_site_and_log_in_urls() {
        assert_eq!(normalize_redirect_url("https://example.com/ledger"), None);
        assert_eq!(normalize_redirect_url("//example.com"), None);
        assert_eq!(normalize_redirect_url(endpoints::LOG_IN_VIEW), None);
    }

    #[test]
    fn page_request_redirects_back_to_page() {
        let request = Request::get("/admin/members/3").body(Body::empty()).unwrap();

        assert_eq!(
            build_log_in_redirect_url(&request),
            log_in_url_with_redirect("/admin/members/3")
        );
    }

    #[test]
    fn htmx_request_redirects_back_to_current_page() {
        let request = Request::post("/api/members/3/fees")
            .header("HX-Request", "true")
            .header("HX-Current-URL", "https://club.example/admin/members/3")
            .body(Body::empty())
            .unwrap();

        assert_eq!(
            build_log_in_redirect_url(&request),
            log_in_url_with_redirect("/admin/members/3")
        );
    }

    #[test]
    fn api_request_without_htmx_falls_back_to_dashboard() {
        let request = Request::post("/api/attendance").body(Body::empty()).unwrap();

        assert_eq!(
            build_log_in_redirect_url(&request),
            log_in_url_with_redirect(endpoints::DASHBOARD_VIEW)
        );
    }
}
