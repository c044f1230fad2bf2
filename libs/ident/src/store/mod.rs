//! Store contract consumed by the allocators.
//!
//! The allocators never hold identifier state themselves. Everything that
//! must survive across processes lives behind these two traits:
//!
//! - [`CounterStore`]: atomic increment-and-fetch, create-if-absent, keyed by
//!   namespace. This is the only mutual exclusion the counter allocator uses.
//! - [`SlugIndex`]: read-only existence probe over non-soft-deleted entities.
//!
//! [`MemoryStore`] implements both in-process. The Postgres implementation
//! lives in the `storefront-ident-store` crate.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::IdentError;

/// Identifier of a persisted entity, used to exclude it from its own
/// uniqueness probe when it is renamed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wraps a raw entity id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A single uniqueness question: does a live entity of `entity_type`, other
/// than `exclude_id`, already hold `slug`?
#[derive(Debug, Clone, Copy)]
pub struct SlugProbe<'a> {
    pub entity_type: &'a str,
    pub slug: &'a str,
    pub exclude_id: Option<&'a EntityId>,
}

/// Persistent per-namespace counters.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increments the counter for `namespace` by one, creating it
    /// at zero first if absent, and returns the new value.
    ///
    /// Must be linearizable across all callers for the same namespace.
    async fn increment(&self, namespace: &str) -> Result<u64, IdentError>;

    /// Returns the last issued value for `namespace`, if any.
    ///
    /// For inspection only; identifiers are never derived from this.
    async fn current(&self, namespace: &str) -> Result<Option<u64>, IdentError>;
}

/// Uniqueness index over entity slugs.
#[async_trait]
pub trait SlugIndex: Send + Sync {
    /// Returns true if a non-soft-deleted entity matching `probe` exists.
    async fn slug_exists(&self, probe: SlugProbe<'_>) -> Result<bool, IdentError>;
}
