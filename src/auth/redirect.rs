//! Building the log-in URL that remembers where the user was going.

use axum::http::{HeaderMap, Uri};

use crate::endpoints;

/// The query parameter of the log-in page that holds the return target.
pub const RETURN_URL_PARAM: &str = "returnUrl";

/// Whether `url` points back into this app, and not at the log-in page itself.
fn is_safe_return_url(url: &str) -> bool {
    if !url.starts_with('/') || url.starts_with("//") {
        return false;
    }

    // Browsers read `\` as `/`, so `/\host` leaves the site.
    if url.contains('\\') || url.chars().any(|c| c.is_ascii_control()) {
        return false;
    }

    let path = url.split_once('?').map(|(path, _)| path).unwrap_or(url);

    path != endpoints::LOG_IN_VIEW
}

/// Reduce `raw_url` to a path and query on this site.
///
/// Returns `None` for absolute URLs, protocol-relative URLs and the log-in
/// page.
pub fn normalize_return_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    if uri.scheme().is_some() || uri.authority().is_some() {
        return None;
    }
    let path_and_query = uri.path_and_query()?.as_str();

    is_safe_return_url(path_and_query).then(|| path_and_query.to_owned())
}

/// The log-in page URL that returns to `return_target` after logging in.
///
/// Unsafe targets are replaced with the dashboard.
pub fn log_in_url(return_target: &str) -> String {
    let return_target = normalize_return_url(return_target).unwrap_or_else(|| {
        tracing::warn!("Invalid return URL {return_target:?}. Falling back to dashboard.");
        endpoints::DASHBOARD_VIEW.to_owned()
    });

    match serde_urlencoded::to_string([(RETURN_URL_PARAM, &return_target)]) {
        Ok(query) => format!("{}?{query}", endpoints::LOG_IN_VIEW),
        Err(error) => {
            tracing::error!("Could not encode return URL {return_target}: {error}");
            endpoints::LOG_IN_VIEW.to_owned()
        }
    }
}

/// The page an htmx request was sent from, taken from the `HX-Current-URL` header.
///
/// The header holds the full URL, so the origin is dropped.
pub fn return_target_from_hx_headers(headers: &HeaderMap) -> Option<String> {
    let is_hx_request = headers
        .get("hx-request")
        .and_then(|header| header.to_str().ok())
        .is_some_and(|header| header.eq_ignore_ascii_case("true"));

    if !is_hx_request {
        tracing::warn!("Missing HX-Request header for /api request.");
        return None;
    }

    let Some(current_url) = headers
        .get("hx-current-url")
        .and_then(|header| header.to_str().ok())
    else {
        tracing::warn!("Missing HX-Current-URL header for /api request.");
        return None;
    };

    let path_and_query = current_url
        .parse::<Uri>()
        .ok()
        .and_then(|uri| uri.path_and_query().map(|path| path.as_str().to_owned()));

    if path_and_query.is_none() {
        tracing::warn!("Invalid HX-Current-URL header value: {current_url}");
    }

    path_and_query
}
