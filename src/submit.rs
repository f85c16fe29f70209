//! Final add-visitor POST and response classification
//!
//! The portal answers HTTP 200 with error markup when a submission is
//! refused, so success is decided by the body: the AJAX delta redirects to the
//! visitor list page only when the visitor was saved.

use crate::error::{Stage, VisitError};
use crate::http::{self, HttpClient};
use crate::models::VisitConfirmation;
use crate::portal::PortalUrls;
use reqwest::header::{HeaderValue, CACHE_CONTROL, LOCATION};
use reqwest::StatusCode;

/// Path segment of the visitor list page, plain or percent-encoded, compared
/// against the lowercased body. A `/` or `%2f` must precede the page name, so
/// the `./AddPreAuthorizedVisitors.aspx` form action does not count.
pub const SUCCESS_MARKERS: [&str; 2] = [
    "/preauthorizedvisitors.aspx",
    "%2fpreauthorizedvisitors.aspx",
];

const LOGIN_PAGE_MARKER: &str = "login.aspx";
const EXCERPT_LEN: usize = 200;

/// POST the encoded form with the session cookie and classify the answer
pub async fn submit(
    client: &HttpClient,
    urls: &PortalUrls,
    cookie_header: &str,
    form_body: String,
) -> Result<VisitConfirmation, VisitError> {
    tracing::info!("[Kastle] Step 4: Submitting visitor authorization...");

    let mut headers = http::portal_headers(
        Stage::Submit,
        &urls.origin,
        &urls.add_visitor,
        Some(cookie_header),
    )?;
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert("x-microsoftajax", HeaderValue::from_static("Delta=true"));
    headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));

    let resp = client
        .post_form(
            Stage::Submit,
            &urls.add_visitor,
            form_body,
            "application/x-www-form-urlencoded; charset=UTF-8",
            headers,
        )
        .await?;

    let status = resp.status();
    let location = resp
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = http::read_text(Stage::Submit, resp).await?;

    classify(status, location.as_deref(), body)
}

/// Decide success from status, redirect target and body
pub fn classify(
    status: StatusCode,
    location: Option<&str>,
    body: String,
) -> Result<VisitConfirmation, VisitError> {
    if status.is_success() && has_success_marker(&body) {
        tracing::info!("   -> Visitor authorized");
        return Ok(VisitConfirmation {
            status: status.as_u16(),
            body,
        });
    }

    if let Some(reason) = login_bounce(status, location, &body) {
        tracing::warn!("   -> Session not accepted: {}", reason);
        return Err(VisitError::AuthenticationRejected { reason });
    }

    tracing::warn!("   -> Submission refused (HTTP {})", status);
    Err(VisitError::AuthorizationRejected {
        status: status.as_u16(),
        excerpt: excerpt(&body),
    })
}

fn has_success_marker(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    SUCCESS_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// The portal sends unauthenticated requests back to the login page, either
/// with a plain redirect or an AJAX `pageRedirect` delta
fn login_bounce(status: StatusCode, location: Option<&str>, body: &str) -> Option<String> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Some(format!("HTTP {}", status.as_u16()));
    }
    if status.is_redirection() {
        let target = location.filter(|l| l.to_ascii_lowercase().contains(LOGIN_PAGE_MARKER));
        if let Some(target) = target {
            return Some(format!("redirected to {}", target));
        }
    }
    let lower = body.to_ascii_lowercase();
    if lower.contains("pageredirect") && lower.contains(LOGIN_PAGE_MARKER) {
        return Some("redirected to login page".to_string());
    }
    None
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
