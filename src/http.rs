//! HTTP client with browser-like headers and bounded timeouts
//!
//! Cookies are threaded by hand through [`crate::cookies::CookieJar`], and
//! redirects are surfaced to the caller instead of followed, so that every
//! `Set-Cookie` and every bounce to the login page is observed. Requests are
//! never retried: replaying a half-finished login can trip the portal's
//! brute-force lockout.

use crate::error::{Stage, VisitError};
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, COOKIE, USER_AGENT,
};
use reqwest::{redirect, Client, RequestBuilder, Response};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";
const BROWSER_CH_UA: &str = r#""Not)A;Brand";v="8", "Chromium";v="138", "Google Chrome";v="138""#;

const ACCEPT_DOCUMENT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
const ACCEPT_JSON: &str = "application/json, text/javascript, */*; q=0.01";

pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration, connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert("sec-ch-ua", HeaderValue::from_static(BROWSER_CH_UA));
        headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
        headers.insert("sec-ch-ua-platform", HeaderValue::from_static(r#""macOS""#));

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .redirect(redirect::Policy::none())
            .default_headers(headers)
            .build()?;

        Ok(Self { inner: client })
    }

    pub async fn get(
        &self,
        stage: Stage,
        url: &str,
        headers: HeaderMap,
    ) -> Result<Response, VisitError> {
        self.send(stage, self.inner.get(url).headers(headers)).await
    }

    /// POST an already encoded `application/x-www-form-urlencoded` body
    pub async fn post_form(
        &self,
        stage: Stage,
        url: &str,
        body: String,
        content_type: &'static str,
        headers: HeaderMap,
    ) -> Result<Response, VisitError> {
        self.send(
            stage,
            self.inner
                .post(url)
                .header(CONTENT_TYPE, content_type)
                .headers(headers)
                .body(body),
        )
        .await
    }

    pub async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        stage: Stage,
        url: &str,
        body: &T,
        headers: HeaderMap,
    ) -> Result<Response, VisitError> {
        self.send(
            stage,
            self.inner
                .post(url)
                .header("X-Requested-With", "XMLHttpRequest")
                .headers(headers)
                .json(body),
        )
        .await
    }

    /// Single attempt; any transport failure is terminal for the stage
    async fn send(&self, stage: Stage, request: RequestBuilder) -> Result<Response, VisitError> {
        let resp = request
            .headers(fetch_metadata(stage))
            .send()
            .await
            .map_err(|e| VisitError::transport(stage, e))?;
        tracing::debug!("   -> {} answered HTTP {}", stage, resp.status());
        Ok(resp)
    }
}

/// Read a response body, attributing failures to `stage`
pub async fn read_text(stage: Stage, resp: Response) -> Result<String, VisitError> {
    resp.text().await.map_err(|e| VisitError::transport(stage, e))
}

/// `Accept` plus the `sec-fetch-*` navigation hints a browser sends for the
/// request behind `stage`. The login page is opened directly, the username
/// post is a same-origin navigation, and the last two steps are page scripts.
pub fn fetch_metadata(stage: Stage) -> HeaderMap {
    let mut headers = HeaderMap::new();
    match stage {
        Stage::LoginPage | Stage::Prelogin => {
            let site = if stage == Stage::LoginPage {
                "none"
            } else {
                "same-origin"
            };
            headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_DOCUMENT));
            headers.insert("priority", HeaderValue::from_static("u=0, i"));
            headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
            headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
            headers.insert("sec-fetch-site", HeaderValue::from_static(site));
            headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
            headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));
        }
        Stage::Authenticate | Stage::Submit => {
            let accept = if stage == Stage::Authenticate {
                ACCEPT_JSON
            } else {
                "*/*"
            };
            headers.insert(ACCEPT, HeaderValue::from_static(accept));
            headers.insert("priority", HeaderValue::from_static("u=1, i"));
            headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
            headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
            headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));
        }
    }
    headers
}

/// Request headers shared by every portal page: `Origin`, `Referer` and the
/// session cookie
pub fn portal_headers(
    stage: Stage,
    origin: &str,
    referer: &str,
    cookie: Option<&str>,
) -> Result<HeaderMap, VisitError> {
    let mut headers = HeaderMap::new();
    let value = |v: &str| {
        HeaderValue::from_str(v).map_err(|source| VisitError::InvalidHeader { stage, source })
    };
    headers.insert(reqwest::header::ORIGIN, value(origin)?);
    headers.insert(reqwest::header::REFERER, value(referer)?);
    if let Some(cookie) = cookie.filter(|c| !c.is_empty()) {
        headers.insert(COOKIE, value(cookie)?);
    }
    Ok(headers)
}
