//! Date formatting in the portal's business timezone
//!
//! The portal interprets every date as US Eastern time no matter where this
//! client runs, so nothing here looks at the local timezone.

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::America::New_York;
use chrono_tz::Tz;
use reqwest::header::{HeaderMap, DATE};

pub const BUSINESS_TZ: Tz = New_York;

/// `MM/DD/YYYY` of the instant as seen in Eastern time
pub fn format_visit_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&BUSINESS_TZ).format("%m/%d/%Y").to_string()
}

/// The login form's `setDateTime` value: `yyyy/M/d H:m:s`, unpadded
pub fn format_login_timestamp(at: DateTime<Utc>) -> String {
    let local = at.with_timezone(&BUSINESS_TZ);
    format!(
        "{}/{}/{} {}:{}:{}",
        local.year(),
        local.month(),
        local.day(),
        local.hour(),
        local.minute(),
        local.second()
    )
}

/// Server time from a response's `Date` header
pub fn server_date(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let raw = headers.get(DATE)?.to_str().ok()?;
    match httpdate::parse_http_date(raw) {
        Ok(time) => Some(DateTime::<Utc>::from(time)),
        Err(e) => {
            tracing::warn!("Unparsable Date header '{}': {}", raw, e);
            None
        }
    }
}
