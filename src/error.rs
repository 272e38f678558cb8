//! Error types for the prolly tree core.
//!
//! The core has no I/O, so every error is a programming-level failure: a
//! missing key, a duplicate insert, or (in debug builds) a broken
//! invariant. Each carries a stable code for callers that want to branch
//! on kind without matching on the `Display` text.

/// Machine-readable codes for [`TreeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeErrorCode {
    /// `search`/`delete` applied to a key that isn't present.
    KeyNotFound,
    /// `insert` of a key that already exists.
    DuplicateKey,
    /// An internal consistency check failed. Always a bug.
    InvariantViolated,
}

impl TreeErrorCode {
    /// Stable short code for machine parsing, e.g. in logs.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::KeyNotFound => "PT001",
            Self::DuplicateKey => "PT002",
            Self::InvariantViolated => "PT900",
        }
    }
}

/// Errors produced by [`crate::tree::Tree`] operations.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// The key was not found by `search` or `delete`.
    #[error("key not found")]
    KeyNotFound,

    /// `insert` was called with a key already present in the tree.
    ///
    /// The reference implementation admits duplicate keys silently,
    /// producing two equal-key nodes and violating the level-ordering
    /// invariant. This crate rejects the insert instead.
    #[error("key already present")]
    DuplicateKey,

    /// An internal invariant was violated. Only raised from
    /// `debug_assert!`-guarded paths; indicates a bug in this crate.
    #[error("invariant violated: {0}")]
    InvariantViolated(String),
}

impl TreeError {
    /// Return the machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> TreeErrorCode {
        match self {
            TreeError::KeyNotFound => TreeErrorCode::KeyNotFound,
            TreeError::DuplicateKey => TreeErrorCode::DuplicateKey,
            TreeError::InvariantViolated(_) => TreeErrorCode::InvariantViolated,
        }
    }
}

/// Convenience alias for fallible tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;
