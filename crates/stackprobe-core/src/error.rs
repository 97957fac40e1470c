//! Unified error types for stackprobe

use std::time::Duration;
use thiserror::Error;

/// Unified error type for all stackprobe operations
#[derive(Error, Debug)]
pub enum StackError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Control plane errors
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Control plane error: {0}")]
    ControlPlane(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("More than one {kind} named '{name}' ({count} matches)")]
    AmbiguousResource {
        kind: String,
        name: String,
        count: usize,
    },

    // Readiness errors
    #[error("Timed out waiting for {what} after {polls} polls ({elapsed:?})")]
    Timeout {
        what: String,
        polls: u32,
        elapsed: Duration,
    },

    // Browser errors
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Element not found: {locator}")]
    ElementNotFound { locator: String },

    /// The element is in the DOM but cannot take input yet.
    #[error("Element not interactable: {0}")]
    ElementNotInteractable(String),

    #[error("Stale element reference: {0}")]
    StaleElement(String),

    #[error("No option matching '{value}' in section '{section}'")]
    NoMatchingOption { section: String, value: String },

    #[error("{count} options match '{value}' in section '{section}'")]
    AmbiguousOption {
        section: String,
        value: String,
        count: usize,
    },

    #[error("Screenshot failed: {0}")]
    ScreenshotFailed(String),

    // Check outcomes
    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("{probe} probe to {target} failed: {detail}")]
    Probe {
        probe: String,
        target: String,
        detail: String,
    },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl StackError {
    /// Whether the failure is only "UI not ready yet" and worth retrying.
    ///
    /// Everything else is permanent and must reach the caller untouched.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ElementNotInteractable(_))
    }
}

/// Result type alias using StackError
pub type Result<T> = std::result::Result<T, StackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_not_interactable_is_transient() {
        assert!(StackError::ElementNotInteractable(".next".to_string()).is_transient());

        let permanent = [
            StackError::ElementNotFound {
                locator: "#loginBtn".to_string(),
            },
            StackError::StaleElement(".next".to_string()),
            StackError::Assertion("title".to_string()),
            StackError::Timeout {
                what: "page change".to_string(),
                polls: 20,
                elapsed: Duration::from_secs(10),
            },
            StackError::Browser("crashed".to_string()),
        ];
        for err in &permanent {
            assert!(!err.is_transient(), "{} should not be transient", err);
        }
    }

    #[test]
    fn test_option_error_messages() {
        let err = StackError::NoMatchingOption {
            section: "flavor".to_string(),
            value: "m1.small".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No option matching 'm1.small' in section 'flavor'"
        );
    }
}
