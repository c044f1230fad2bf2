//! Human-readable slug allocation.
//!
//! The allocator normalizes free text into a base candidate, then:
//!
//! 1. returns it untouched for entity types whose source name is already
//!    unique upstream (no store access at all);
//! 2. probes the [`SlugIndex`] and returns the base if no live entity of the
//!    same type holds it;
//! 3. otherwise tries `base-<random hex>` candidates, one probe each, up to
//!    `max_attempts` times;
//! 4. and finally returns `base-<base36 unix millis>` without probing again.
//!
//! The allocator never writes. Two callers can both pass the probe for the
//! same candidate before either inserts; the database's unique index on the
//! entity table settles that race, and handling the rejected insert is the
//! caller's job.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::clock::{base36, Clock, SystemClock};
use crate::config::SlugConfig;
use crate::entropy::{random_hex, OsRandom, RandomSource};
use crate::normalize::normalize;
use crate::store::{EntityId, SlugIndex, SlugProbe};
use crate::IdentError;

/// Input for [`SlugAllocator::allocate_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugRequest {
    pub raw_text: String,
    pub entity_type: String,
    pub exclude_id: Option<EntityId>,
}

impl SlugRequest {
    /// Slug request for a new entity.
    pub fn new(raw_text: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            entity_type: entity_type.into(),
            exclude_id: None,
        }
    }

    /// Excludes an existing entity from the collision check (rename).
    #[must_use]
    pub fn excluding(mut self, id: impl Into<EntityId>) -> Self {
        self.exclude_id = Some(id.into());
        self
    }
}

/// Allocates slugs that are unique among live entities of one type.
#[derive(Clone)]
pub struct SlugAllocator {
    index: Arc<dyn SlugIndex>,
    random: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
    config: SlugConfig,
}

impl SlugAllocator {
    /// Creates an allocator using the OS-seeded CSPRNG and the wall clock.
    pub fn new(index: Arc<dyn SlugIndex>, config: SlugConfig) -> Self {
        Self {
            index,
            random: Arc::new(OsRandom),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replaces the random source used for retry suffixes.
    #[must_use]
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Replaces the clock used for the fallback suffix.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Allocates a slug for `raw_text` within `entity_type`.
    ///
    /// `exclude_id` is the entity's own id when renaming, so an unchanged
    /// name keeps its slug.
    ///
    /// Fails only with [`IdentError::StoreUnavailable`] (or another store
    /// error) from a probe. Running out of attempts is not an error.
    ///
    /// Text that normalizes to nothing yields `""`; if `""` is taken the
    /// suffixed candidates start with a hyphen (`-1f2e3d`). Callers are
    /// expected to reject empty names before allocating.
    pub async fn allocate(
        &self,
        raw_text: &str,
        entity_type: &str,
        exclude_id: Option<&EntityId>,
    ) -> Result<String, IdentError> {
        let base = normalize(raw_text);

        if self.config.is_name_unique(entity_type) {
            debug!(entity_type, slug = %base, "Name-unique entity type, skipping slug probe");
            return Ok(base);
        }

        if !self.is_taken(entity_type, &base, exclude_id).await? {
            debug!(entity_type, slug = %base, "Allocated base slug");
            return Ok(base);
        }

        for attempt in 1..=self.config.max_attempts {
            let suffix = random_hex(self.random.as_ref(), self.config.entropy_hex_len.get());
            let candidate = format!("{base}-{suffix}");

            if !self.is_taken(entity_type, &candidate, exclude_id).await? {
                debug!(entity_type, slug = %candidate, attempt, "Allocated suffixed slug");
                return Ok(candidate);
            }
            debug!(entity_type, slug = %candidate, attempt, "Slug candidate taken");
        }

        // Not probed: a collision here needs two writers on the same base in
        // the same millisecond after every random attempt collided.
        let millis = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        let fallback = format!("{base}-{}", base36(millis));
        warn!(
            entity_type,
            base = %base,
            slug = %fallback,
            max_attempts = self.config.max_attempts,
            "Slug attempts exhausted, using timestamp fallback"
        );
        Ok(fallback)
    }

    /// Allocates a slug for a [`SlugRequest`].
    pub async fn allocate_request(&self, request: &SlugRequest) -> Result<String, IdentError> {
        self.allocate(
            &request.raw_text,
            &request.entity_type,
            request.exclude_id.as_ref(),
        )
        .await
    }

    async fn is_taken(
        &self,
        entity_type: &str,
        slug: &str,
        exclude_id: Option<&EntityId>,
    ) -> Result<bool, IdentError> {
        let probe = SlugProbe {
            entity_type,
            slug,
            exclude_id,
        };
        self.index.slug_exists(probe).await.inspect_err(|e| {
            warn!(entity_type, slug, error = %e, "Slug probe failed");
        })
    }
}
