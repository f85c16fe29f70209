//! Login sequencing against the WebForms login page
//!
//! Three strictly ordered round trips, each feeding the next:
//!
//! 1. GET `Login.aspx` for the session cookie and the hidden tokens
//! 2. POST the username with the tokens back to `Login.aspx`
//! 3. POST the password as JSON to `Login.aspx/LoginClick`
//!
//! All state lives in a [`SessionContext`] created per attempt. Nothing is
//! cached between attempts and no step is retried.

use crate::clock;
use crate::cookies::CookieJar;
use crate::error::{Stage, VisitError};
use crate::http::{self, HttpClient};
use crate::models::{Credentials, HiddenFormState};
use crate::parser;
use crate::portal::PortalUrls;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL};
use reqwest::StatusCode;
use serde::Serialize;
use url::form_urlencoded;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Mutable state threaded through one login attempt
#[derive(Debug, Default)]
pub struct SessionContext {
    pub jar: CookieJar,
    /// `Date` of the most recent response, for the server-synced timestamp
    pub server_date: Option<DateTime<Utc>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn absorb(&mut self, headers: &HeaderMap) {
        self.jar.store_response(headers);
        if let Some(date) = clock::server_date(headers) {
            self.server_date = Some(date);
        }
    }

    /// Server time for `setDateTime`, or `fallback` when no response so far
    /// carried a usable `Date` header
    fn clock_or(&self, fallback: DateTime<Utc>) -> DateTime<Utc> {
        match self.server_date {
            Some(date) => date,
            None => {
                tracing::warn!("   -> No usable Date header, falling back to local clock");
                fallback
            }
        }
    }
}

/// Cookies of a completed login, valid only for the rest of this attempt
#[derive(Debug)]
pub struct AuthenticatedSession {
    jar: CookieJar,
}

impl AuthenticatedSession {
    pub fn cookie_header(&self) -> String {
        self.jar.to_header()
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginClick<'a> {
    password: &'a str,
    user_name: &'a str,
    is_persistent_cookie: bool,
}

pub struct LoginSequencer<'a> {
    client: &'a HttpClient,
    urls: &'a PortalUrls,
}

impl<'a> LoginSequencer<'a> {
    pub fn new(client: &'a HttpClient, urls: &'a PortalUrls) -> Self {
        Self { client, urls }
    }

    /// Run the full sequence from an empty jar
    pub async fn login(&self, creds: &Credentials) -> Result<AuthenticatedSession, VisitError> {
        let mut ctx = SessionContext::new();

        let tokens = self.fetch_login_page(&mut ctx).await?;
        self.prelogin(&mut ctx, &tokens, creds).await?;
        self.authenticate(&mut ctx, creds).await?;

        tracing::info!("[Kastle] Login sequence complete ({} cookies)", ctx.jar.len());
        Ok(AuthenticatedSession { jar: ctx.jar })
    }

    /// Step 1: Fetch - GET the login page, keep its cookies and tokens
    pub async fn fetch_login_page(
        &self,
        ctx: &mut SessionContext,
    ) -> Result<HiddenFormState, VisitError> {
        tracing::info!("[Kastle] Step 1: Fetching login page...");

        let resp = self
            .client
            .get(Stage::LoginPage, &self.urls.login_page, HeaderMap::new())
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(VisitError::LoginPageUnavailable {
                status: Some(status.as_u16()),
                reason: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        ctx.absorb(resp.headers());
        let html = http::read_text(Stage::LoginPage, resp).await?;
        if html.trim().is_empty() {
            return Err(VisitError::LoginPageUnavailable {
                status: Some(status.as_u16()),
                reason: "empty body".to_string(),
            });
        }

        let tokens = parser::parse_hidden_fields(&html)?;
        tracing::info!("   -> Found hidden tokens, {} cookie(s)", ctx.jar.len());
        Ok(tokens)
    }

    /// Step 2: Prelogin - POST the username with the page tokens
    pub async fn prelogin(
        &self,
        ctx: &mut SessionContext,
        tokens: &HiddenFormState,
        creds: &Credentials,
    ) -> Result<(), VisitError> {
        tracing::info!("[Kastle] Step 2: Submitting username...");

        let server_now = ctx.clock_or(Utc::now());

        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("__EVENTTARGET", "")
            .append_pair("__EVENTARGUMENT", "")
            .append_pair(parser::VIEW_STATE, &tokens.view_state)
            .append_pair(parser::VIEW_STATE_GENERATOR, &tokens.view_state_generator)
            .append_pair("__VIEWSTATEENCRYPTED", "")
            .append_pair(parser::EVENT_VALIDATION, &tokens.event_validation)
            .append_pair("hdnBruteForceCheck", "true")
            .append_pair("ScriptManager1", "")
            .append_pair("txtUserName", &creds.username)
            .append_pair("chkPersistCookie", "on")
            .append_pair("btnNext", "Next")
            .append_pair("setDateTime", &clock::format_login_timestamp(server_now))
            .finish();

        let mut headers = http::portal_headers(
            Stage::Prelogin,
            &self.urls.origin,
            &self.urls.login_page,
            Some(&ctx.jar.to_header()),
        )?;
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));

        let resp = self
            .client
            .post_form(
                Stage::Prelogin,
                &self.urls.login_page,
                body,
                FORM_CONTENT_TYPE,
                headers,
            )
            .await?;

        check_login_status(Stage::Prelogin, resp.status())?;
        ctx.absorb(resp.headers());
        Ok(())
    }

    /// Step 3: Authenticate - POST the password as JSON
    pub async fn authenticate(
        &self,
        ctx: &mut SessionContext,
        creds: &Credentials,
    ) -> Result<(), VisitError> {
        tracing::info!("[Kastle] Step 3: Submitting password...");

        let payload = LoginClick {
            password: &creds.password,
            user_name: &creds.username,
            is_persistent_cookie: true,
        };
        let headers = http::portal_headers(
            Stage::Authenticate,
            &self.urls.origin,
            &self.urls.login_page,
            Some(&ctx.jar.to_header()),
        )?;

        let resp = self
            .client
            .post_json(Stage::Authenticate, &self.urls.login_click, &payload, headers)
            .await?;

        check_login_status(Stage::Authenticate, resp.status())?;
        ctx.absorb(resp.headers());
        tracing::debug!(
            "   -> Session cookies: {}",
            ctx.jar.names().collect::<Vec<_>>().join(", ")
        );
        Ok(())
    }
}

// WebForms answers postbacks with either a page or a redirect; both carry cookies.
fn check_login_status(stage: Stage, status: StatusCode) -> Result<(), VisitError> {
    if status.is_success() || status.is_redirection() {
        Ok(())
    } else {
        Err(VisitError::UnexpectedStatus {
            stage,
            status: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use reqwest::header::{DATE, SET_COOKIE};

    #[test]
    fn test_login_click_payload() {
        let payload = LoginClick {
            password: "pw",
            user_name: "user@example.com",
            is_persistent_cookie: true,
        };
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"password":"pw","userName":"user@example.com","isPersistentCookie":true}"#
        );
    }

    #[test]
    fn test_check_login_status() {
        assert!(check_login_status(Stage::Prelogin, StatusCode::OK).is_ok());
        assert!(check_login_status(Stage::Prelogin, StatusCode::FOUND).is_ok());

        let err = check_login_status(Stage::Authenticate, StatusCode::INTERNAL_SERVER_ERROR)
            .unwrap_err();
        assert!(matches!(
            err,
            VisitError::UnexpectedStatus {
                stage: Stage::Authenticate,
                status: 500
            }
        ));
    }

    #[test]
    fn test_fresh_context_is_empty() {
        let ctx = SessionContext::new();
        assert!(ctx.jar.is_empty());
        assert!(ctx.server_date.is_none());
    }

    #[test]
    fn test_timestamp_prefers_server_date() {
        let server = Utc.with_ymd_and_hms(2025, 7, 1, 3, 30, 0).unwrap();
        let local = server + Duration::minutes(7);

        let mut headers = HeaderMap::new();
        headers.insert(DATE, "Tue, 01 Jul 2025 03:30:00 GMT".parse().unwrap());
        let mut ctx = SessionContext::new();
        ctx.absorb(&headers);

        assert_eq!(ctx.clock_or(local), server);
        assert_eq!(
            clock::format_login_timestamp(ctx.clock_or(local)),
            "2025/6/30 23:30:0"
        );
    }

    #[test]
    fn test_timestamp_falls_back_without_date_header() {
        let local = Utc.with_ymd_and_hms(2025, 7, 1, 3, 37, 0).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, "ASP.NET_SessionId=abc; path=/".parse().unwrap());
        let mut ctx = SessionContext::new();
        ctx.absorb(&headers);

        assert!(ctx.server_date.is_none());
        assert_eq!(ctx.jar.get("ASP.NET_SessionId"), Some("abc"));
        assert_eq!(ctx.clock_or(local), local);
    }

    #[test]
    fn test_unparsable_date_keeps_earlier_one() {
        let server = Utc.with_ymd_and_hms(2025, 7, 1, 3, 30, 0).unwrap();
        let mut ctx = SessionContext::new();

        let mut first = HeaderMap::new();
        first.insert(DATE, "Tue, 01 Jul 2025 03:30:00 GMT".parse().unwrap());
        ctx.absorb(&first);

        let mut second = HeaderMap::new();
        second.insert(DATE, "yesterday".parse().unwrap());
        ctx.absorb(&second);

        assert_eq!(ctx.server_date, Some(server));
    }
}
