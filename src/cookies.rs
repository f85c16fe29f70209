//! Per-attempt cookie accumulation
//!
//! The portal identifies the session purely through cookies that change on
//! every login round trip. reqwest's automatic store is not used; instead each
//! attempt owns a `CookieJar` that is fed the raw `Set-Cookie` headers and
//! rendered into the next request's `Cookie` header.

use reqwest::header::{HeaderMap, SET_COOKIE};
use std::collections::BTreeMap;
use std::fmt;

/// Name → value map of the cookies issued during one attempt.
///
/// Attributes (`Path`, `Expires`, `HttpOnly`, ...) are dropped on the way in,
/// and no expiry or domain scoping is applied.
#[derive(Clone, Default)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one or more raw `Set-Cookie` header values.
    ///
    /// A value may carry several cookies folded together with commas or
    /// semicolons. Later values overwrite earlier ones with the same name; an
    /// empty value removes the cookie.
    pub fn store<I, S>(&mut self, header_values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for header in header_values {
            for cookie in split_set_cookie(header.as_ref()) {
                for (name, value) in cookie_pairs(cookie) {
                    if value.is_empty() {
                        self.cookies.remove(name);
                    } else {
                        self.cookies.insert(name.to_string(), value.to_string());
                    }
                }
            }
        }
    }

    /// Store every `Set-Cookie` header of a response
    pub fn store_response(&mut self, headers: &HeaderMap) {
        let values: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        tracing::debug!("   -> Received {} Set-Cookie header(s)", values.len());
        self.store(values);
    }

    /// Render as a request `Cookie` header: `a=1; b=2`
    pub fn to_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cookies.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

// Values are session secrets.
impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.cookies.keys()).finish()
    }
}

/// Split a possibly folded `Set-Cookie` value into individual cookies.
///
/// A comma starts a new cookie only when the text after it looks like
/// `name=` (a token with no spaces or separators before the `=`). Commas
/// inside `Expires=Wed, 21 Oct 2015 07:28:00 GMT` do not qualify.
fn split_set_cookie(header: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;

    for (idx, ch) in header.char_indices() {
        if ch == ',' && starts_cookie(&header[idx + 1..]) {
            parts.push(header[start..idx].trim());
            start = idx + 1;
        }
    }
    parts.push(header[start..].trim());

    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

fn starts_cookie(rest: &str) -> bool {
    let rest = rest.trim_start();
    let end = rest.find([';', ',']).unwrap_or(rest.len());
    match rest[..end].split_once('=') {
        Some((name, _)) => is_token(name) && !is_attribute(name),
        None => false,
    }
}

const ATTRIBUTES: &[&str] = &[
    "path",
    "domain",
    "expires",
    "max-age",
    "secure",
    "httponly",
    "samesite",
    "priority",
    "partitioned",
];

fn is_attribute(name: &str) -> bool {
    ATTRIBUTES.iter().any(|a| a.eq_ignore_ascii_case(name.trim()))
}

fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?={}".contains(c))
}

/// Every `name=value` of a single cookie string. The first segment is always
/// a cookie; later `;` segments are attributes unless their name is not a
/// known attribute, in which case a semicolon-folded cookie starts there.
fn cookie_pairs(cookie: &str) -> Vec<(&str, &str)> {
    cookie
        .split(';')
        .enumerate()
        .filter_map(|(idx, segment)| {
            let (name, value) = segment.split_once('=')?;
            let name = name.trim();
            if name.is_empty() || (idx > 0 && (is_attribute(name) || !is_token(name))) {
                return None;
            }
            Some((name, value.trim().trim_matches('"')))
        })
        .collect()
}
