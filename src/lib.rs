//! Kastle visitor pre-authorization client
//!
//! Logs into the MyKastle WebForms portal over plain HTTP and saves a
//! pre-authorized visitor, replaying the page tokens and session cookies a
//! browser would. Each call to [`VisitAuthorizer::authorize_visit`] starts
//! from an empty cookie jar and either returns the raw confirmation or the
//! error of the first stage that failed.

pub mod clock;
pub mod config;
pub mod cookies;
pub mod error;
pub mod form;
pub mod http;
pub mod models;
pub mod parser;
pub mod portal;
pub mod session;
pub mod submit;

pub use error::{Stage, VisitError};
pub use models::{Credentials, VisitConfirmation, VisitorDetails};
pub use portal::kastle::KastleConfig;
pub use portal::{KastlePortal, VisitAuthorizer};
