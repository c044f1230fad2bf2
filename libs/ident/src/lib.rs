//! # storefront-ident
//!
//! Identifier allocation for storefront catalog entities.
//!
//! ## Allocators
//!
//! - [`CounterAllocator`]: strictly sequential `{namespace}-{padded count}`
//!   identifiers (`SKU-00042`), backed by an atomic increment in the shared
//!   store. Collisions are impossible by construction.
//! - [`SlugAllocator`]: human-readable slugs derived from free text
//!   (`mens-running-shoes`), unique among live entities of the same type.
//!   Conflicts are retried with random hex suffixes, then resolved with a
//!   base36 timestamp suffix.
//!
//! ## Design Principles
//!
//! - All shared state lives in the store ([`store::CounterStore`],
//!   [`store::SlugIndex`]); allocators hold only configuration and are cheap
//!   to clone across tasks
//! - Store failures surface as [`IdentError::StoreUnavailable`] and are never
//!   papered over with a locally invented identifier
//! - Randomness and time are injected ([`RandomSource`], [`Clock`]) so every
//!   path is deterministic under test

pub mod clock;
pub mod config;
pub mod counter;
pub mod entropy;
mod error;
pub mod normalize;
pub mod slug;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AllocatorConfig, CounterConfig, SlugConfig};
pub use counter::{
    provisional_label, CounterAllocator, CounterId, ProvisionalLabel, MAX_PAD_WIDTH,
};
pub use entropy::{FixedRandom, OsRandom, RandomSource};
pub use error::IdentError;
pub use normalize::normalize;
pub use slug::{SlugAllocator, SlugRequest};
pub use store::{CounterStore, EntityId, MemoryStore, SlugIndex, SlugProbe};
