//! HTML scraping for the login page's hidden form tokens
//!
//! Only this module knows what the portal's markup looks like. If the page
//! changes, the sequencing in `session` stays as is.

use crate::error::VisitError;
use crate::models::HiddenFormState;
use regex::Regex;

pub const VIEW_STATE: &str = "__VIEWSTATE";
pub const VIEW_STATE_GENERATOR: &str = "__VIEWSTATEGENERATOR";
pub const EVENT_VALIDATION: &str = "__EVENTVALIDATION";

/// Extract the three hidden tokens from the login page HTML
pub fn parse_hidden_fields(html: &str) -> Result<HiddenFormState, VisitError> {
    let require = |id: &'static str| {
        extract_input_value(html, id).ok_or(VisitError::MissingToken { field: id })
    };

    Ok(HiddenFormState {
        view_state: require(VIEW_STATE)?,
        view_state_generator: require(VIEW_STATE_GENERATOR)?,
        event_validation: require(EVENT_VALIDATION)?,
    })
}

/// Value of the `<input>` whose id is exactly `id`.
///
/// Tag and attribute names match in any case; the id itself is
/// case-sensitive. Attributes must start after whitespace, so `data-value`
/// or `data-id` are never taken for `value` or `id`.
fn extract_input_value(html: &str, id: &str) -> Option<String> {
    let id = regex::escape(id);

    // Try: <input ... id="xxx" ... value="yyy" ...>
    let pattern1 = format!(
        r#"<(?i:input)\b[^>]*\s(?i:id)\s*=\s*"{}"[^>]*\s(?i:value)\s*=\s*"([^"]*)""#,
        id
    );
    if let Some(caps) = Regex::new(&pattern1).ok()?.captures(html) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }

    // Try reverse: <input ... value="yyy" ... id="xxx" ...>
    let pattern2 = format!(
        r#"<(?i:input)\b[^>]*\s(?i:value)\s*=\s*"([^"]*)"[^>]*\s(?i:id)\s*=\s*"{}""#,
        id
    );
    Regex::new(&pattern2)
        .ok()?
        .captures(html)?
        .get(1)
        .map(|m| m.as_str().to_string())
}
