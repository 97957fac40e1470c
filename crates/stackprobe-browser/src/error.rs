//! Browser error types - re-exports the unified StackError from stackprobe-core
//!
//! The DevTools protocol reports every failure as free text. Interaction
//! failures are sorted here into the three kinds the dashboard check
//! cares about:
//! - ElementNotInteractable - the node exists but has no layout yet (retried)
//! - StaleElement - the node belongs to a page that is gone
//! - Browser - anything else

pub use stackprobe_core::{Result, StackError};

const NOT_INTERACTABLE: &[&str] = &[
    "could not compute box model",
    "noquadfound",
    "no quad",
    "not visible",
    "not interactable",
    "not clickable",
];

const STALE: &[&str] = &[
    "could not find node with given id",
    "no node with given id",
    "does not belong to the document",
    "node is detached",
];

/// Map a raw click/type failure on `target` to a [`StackError`]
pub fn classify_interaction_error(target: &str, err: impl std::fmt::Display) -> StackError {
    let message = err.to_string();
    let lower = message.to_lowercase();

    if NOT_INTERACTABLE.iter().any(|m| lower.contains(m)) {
        StackError::ElementNotInteractable(format!("{}: {}", target, message))
    } else if STALE.iter().any(|m| lower.contains(m)) {
        StackError::StaleElement(format!("{}: {}", target, message))
    } else {
        StackError::Browser(format!("Interaction with {} failed: {}", target, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_model_failure_is_transient() {
        let err = classify_interaction_error("css=.next", "Method call error -32000: Could not compute box model.");
        assert!(matches!(err, StackError::ElementNotInteractable(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_missing_node_is_stale() {
        let err = classify_interaction_error("id=name", "Could not find node with given id");
        assert!(matches!(err, StackError::StaleElement(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_other_failures_are_permanent() {
        let err = classify_interaction_error("id=loginBtn", "connection closed");
        assert!(matches!(err, StackError::Browser(_)));
        assert!(!err.is_transient());
    }
}
