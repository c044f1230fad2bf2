//! Error types for identifier allocation.

use thiserror::Error;

/// Errors that can occur while allocating an identifier.
///
/// Exhausting slug retries is deliberately absent: the slug allocator falls
/// back to a timestamp suffix instead of failing the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentError {
    /// The backing store could not be reached or the atomic operation did
    /// not complete. No identifier is fabricated in its place.
    #[error("store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    /// The counter namespace is empty.
    #[error("invalid counter namespace: '{0}'")]
    InvalidNamespace(String),

    /// A string claimed to be a counter identifier does not parse as one.
    #[error("malformed counter identifier: '{0}'")]
    MalformedIdentifier(String),

    /// The store has no uniqueness index registered for this entity type.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),
}

impl IdentError {
    /// Builds a `StoreUnavailable` error from any displayable cause.
    pub fn unavailable(reason: impl std::fmt::Display) -> Self {
        IdentError::StoreUnavailable {
            reason: reason.to_string(),
        }
    }

    /// Returns true if the store could not serve the request.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, IdentError::StoreUnavailable { .. })
    }
}
