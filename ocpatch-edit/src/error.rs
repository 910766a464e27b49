//! Error types for ocpatch-edit.
//!
//! Rules distinguish between:
//! - Recoverable misses: the key or marker is simply not in this template.
//! - Structural failures: duplicates where one value was expected, unbalanced
//!   containers, or a replacement block that would break the document.

use thiserror::Error;

/// The error type for rule application.
#[derive(Debug, Error)]
pub enum EditError {
    /// The targeted key, marker, or field is absent.
    #[error("not found: {what}")]
    NotFound {
        /// What the rule was looking for.
        what: String,
    },

    /// A key expected to be unique occurs more than once.
    #[error("ambiguous match: {what} occurs {count} times")]
    AmbiguousMatch {
        /// The element that was matched.
        what: String,
        /// How many times it occurred.
        count: usize,
    },

    /// The document is not balanced around the targeted element.
    #[error("malformed document: {what}")]
    Malformed {
        /// Description of the imbalance.
        what: String,
    },

    /// A replacement block is not a complete key/array pair.
    #[error("invalid replacement block for <key>{key}</key>: {reason}")]
    InvalidBlock {
        /// The key the block was meant to replace.
        key: String,
        /// Why the block was rejected.
        reason: String,
    },

    /// A search pattern failed to compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl EditError {
    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        EditError::NotFound { what: what.into() }
    }

    /// Returns true if the target was absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EditError::NotFound { .. })
    }

    /// Returns true if a pipeline may log this error and move on.
    ///
    /// Only absence is recoverable: templates differ in which optional
    /// features they carry, but a structural failure means the document
    /// can no longer be trusted.
    pub fn is_recoverable(&self) -> bool {
        self.is_not_found()
    }
}

/// Result type alias using EditError.
pub type EditResult<T> = Result<T, EditError>;
