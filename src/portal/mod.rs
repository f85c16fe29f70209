//! Visitor authorization abstraction layer
//!
//! The glue layer that receives bookings talks to a `VisitAuthorizer`, so it
//! can run against a fake in its own tests. `KastlePortal` is the real
//! implementation.

pub mod kastle;

pub use kastle::KastlePortal;

use crate::error::VisitError;
use crate::models::{Credentials, VisitConfirmation, VisitorDetails};
use async_trait::async_trait;
use url::Url;

/// Trait defining one complete visitor pre-authorization
#[async_trait]
pub trait VisitAuthorizer: Send + Sync {
    /// Human-readable name of the destination portal
    fn name(&self) -> &str;

    /// Log in from scratch with `credentials` and register `visitor`.
    ///
    /// Every call uses a fresh session. Nothing is retried; on error the
    /// caller decides whether a new attempt is worthwhile.
    async fn authorize_visit(
        &self,
        credentials: &Credentials,
        visitor: &VisitorDetails,
    ) -> Result<VisitConfirmation, VisitError>;
}

/// The portal pages involved in one attempt, derived from the base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalUrls {
    pub origin: String,
    pub login_page: String,
    pub login_click: String,
    pub add_visitor: String,
}

impl PortalUrls {
    pub fn from_base(base: &Url) -> Self {
        let origin = base.origin().ascii_serialization();
        let base = base.as_str().trim_end_matches('/');

        Self {
            origin,
            login_page: format!("{}/Login.aspx", base),
            login_click: format!("{}/Login.aspx/LoginClick", base),
            add_visitor: format!("{}/VisitorManagement/AddPreAuthorizedVisitors.aspx", base),
        }
    }
}
