//! Data models for a visitor pre-authorization attempt

use chrono::{DateTime, Utc};
use std::fmt;

/// Used when the visitor name is empty so the portal never receives blanks
pub const PLACEHOLDER_FIRST_NAME: &str = "Guest";
pub const PLACEHOLDER_LAST_NAME: &str = "Visitor";

/// Portal login. Both fields are secrets and never appear in logs.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// The visitor to pre-authorize
#[derive(Debug, Clone)]
pub struct VisitorDetails {
    pub full_name: String,
    pub email: String,
    pub scheduled_for: DateTime<Utc>,
}

impl VisitorDetails {
    pub fn new(
        full_name: impl Into<String>,
        email: impl Into<String>,
        scheduled_for: DateTime<Utc>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            email: email.into(),
            scheduled_for,
        }
    }

    pub fn name_parts(&self) -> NameParts {
        NameParts::split(&self.full_name)
    }
}

/// First/last split of a visitor name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts {
    pub first: String,
    pub last: String,
}

impl NameParts {
    /// The last whitespace token is the last name, everything before it the
    /// first name. A single token fills both slots.
    pub fn split(full_name: &str) -> Self {
        let mut tokens: Vec<&str> = full_name.split_whitespace().collect();

        match tokens.pop() {
            None => Self {
                first: PLACEHOLDER_FIRST_NAME.to_string(),
                last: PLACEHOLDER_LAST_NAME.to_string(),
            },
            Some(last) if tokens.is_empty() => Self {
                first: last.to_string(),
                last: last.to_string(),
            },
            Some(last) => Self {
                first: tokens.join(" "),
                last: last.to_string(),
            },
        }
    }
}

/// Anti-forgery tokens the login page embeds and expects echoed back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenFormState {
    pub view_state: String,
    pub view_state_generator: String,
    pub event_validation: String,
}

/// Raw submission response, kept for the caller's audit trail
#[derive(Debug, Clone)]
pub struct VisitConfirmation {
    pub status: u16,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_two_tokens() {
        let parts = NameParts::split("Jane Doe");
        assert_eq!(parts.first, "Jane");
        assert_eq!(parts.last, "Doe");
    }

    #[test]
    fn test_split_many_tokens_collapses_whitespace() {
        let parts = NameParts::split("  Mary   Ann\tvan  Buren ");
        assert_eq!(parts.first, "Mary Ann van");
        assert_eq!(parts.last, "Buren");
    }

    #[test]
    fn test_split_single_token() {
        let parts = NameParts::split("Cher");
        assert_eq!(parts.first, "Cher");
        assert_eq!(parts.last, "Cher");
    }

    #[test]
    fn test_split_blank_uses_placeholder() {
        for input in ["", "   ", "\t\n"] {
            let parts = NameParts::split(input);
            assert_eq!(parts.first, PLACEHOLDER_FIRST_NAME);
            assert_eq!(parts.last, PLACEHOLDER_LAST_NAME);
        }
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let creds = Credentials::new("frontdesk@example.com", "hunter2");
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("frontdesk"));
        assert!(!rendered.contains("hunter2"));
    }
}
