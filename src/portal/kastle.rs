//! MyKastle visitor pre-authorization
//!
//! Logs into the MyKastle web portal (mykastle.com) the way a browser would
//! and saves a pre-authorized visitor through the AddPreAuthorizedVisitors
//! page.

use crate::error::VisitError;
use crate::form::{self, SubmissionTemplate};
use crate::http::{self, HttpClient};
use crate::models::{Credentials, VisitConfirmation, VisitorDetails};
use crate::portal::{PortalUrls, VisitAuthorizer};
use crate::session::LoginSequencer;
use crate::submit;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

pub const BASE_URL: &str = "https://www.mykastle.com/mykastleweb";

/// Configuration for the Kastle portal
#[derive(Debug, Clone)]
pub struct KastleConfig {
    /// Human-readable name for this portal instance
    pub name: String,
    /// Root of the `mykastleweb` application
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for KastleConfig {
    fn default() -> Self {
        Self {
            name: "MyKastle".to_string(),
            base_url: BASE_URL.to_string(),
            timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
        }
    }
}

/// Kastle portal implementation.
///
/// Holds only the connection pool and the form template; the reqwest client
/// keeps no cookies, so concurrent `authorize_visit` calls never share a
/// session.
pub struct KastlePortal {
    config: KastleConfig,
    client: HttpClient,
    urls: PortalUrls,
    template: SubmissionTemplate,
}

impl KastlePortal {
    /// Create a new Kastle portal instance
    pub fn new(config: KastleConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid portal base URL: {}", config.base_url))?;
        let client = HttpClient::new(config.timeout, config.connect_timeout)
            .context("Failed to build HTTP client")?;

        Ok(Self {
            urls: PortalUrls::from_base(&base),
            template: SubmissionTemplate::add_visitor(),
            config,
            client,
        })
    }

    pub fn urls(&self) -> &PortalUrls {
        &self.urls
    }
}

#[async_trait]
impl VisitAuthorizer for KastlePortal {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn authorize_visit(
        &self,
        credentials: &Credentials,
        visitor: &VisitorDetails,
    ) -> Result<VisitConfirmation, VisitError> {
        tracing::info!(
            "[{}] Authorizing visit for {} (template {})",
            self.config.name,
            visitor.scheduled_for,
            form::TEMPLATE_VERSION
        );

        let session = LoginSequencer::new(&self.client, &self.urls)
            .login(credentials)
            .await?;

        let body = form::build(&self.template, visitor)?;
        let confirmation =
            submit::submit(&self.client, &self.urls, &session.cookie_header(), body).await?;

        tracing::info!("[{}] Visitor authorized successfully!", self.config.name);
        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_targets_mykastle() {
        let portal = KastlePortal::new(KastleConfig::default()).unwrap();
        assert_eq!(portal.name(), "MyKastle");
        assert_eq!(
            portal.urls().login_page,
            "https://www.mykastle.com/mykastleweb/Login.aspx"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = KastleConfig {
            base_url: "not a url".to_string(),
            ..KastleConfig::default()
        };
        assert!(KastlePortal::new(config).is_err());
    }
}
