//! In-process store for tests and single-process development.
//!
//! Counters are guarded by a mutex, which makes `increment` linearizable
//! within one process. Slug records keep a soft-delete flag so the probe
//! semantics match the Postgres adapter. The store also counts every
//! access and can be flipped to "unavailable" to exercise failure paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use super::{CounterStore, EntityId, SlugIndex, SlugProbe};
use crate::IdentError;

#[derive(Debug, Clone)]
struct SlugRecord {
    entity_type: String,
    slug: String,
    id: EntityId,
    is_deleted: bool,
}

/// Mutex-backed implementation of [`CounterStore`] and [`SlugIndex`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    counters: Mutex<HashMap<String, u64>>,
    slugs: Mutex<Vec<SlugRecord>>,
    unavailable: AtomicBool,
    probes: AtomicU64,
    increments: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the last issued value for `namespace`, as if `count` allocations
    /// had already happened.
    pub fn seed_counter(&self, namespace: &str, count: u64) {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace.to_string(), count);
    }

    /// Records a live entity holding `slug`.
    pub fn insert_slug(&self, entity_type: &str, slug: &str, id: impl Into<EntityId>) {
        self.slugs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SlugRecord {
                entity_type: entity_type.to_string(),
                slug: slug.to_string(),
                id: id.into(),
                is_deleted: false,
            });
    }

    /// Soft-deletes the entity `id` of `entity_type`. Its slug stays in the
    /// store but no longer counts as taken.
    ///
    /// Returns false if no such entity exists.
    pub fn soft_delete(&self, entity_type: &str, id: &EntityId) -> bool {
        let mut slugs = self.slugs.lock().unwrap_or_else(PoisonError::into_inner);
        let mut found = false;
        for record in slugs
            .iter_mut()
            .filter(|r| r.entity_type == entity_type && &r.id == id)
        {
            record.is_deleted = true;
            found = true;
        }
        found
    }

    /// Makes every subsequent store operation fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of slug probes served or rejected so far.
    pub fn probe_count(&self) -> u64 {
        self.probes.load(Ordering::SeqCst)
    }

    /// Number of counter increments served or rejected so far.
    pub fn increment_count(&self) -> u64 {
        self.increments.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), IdentError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IdentError::unavailable("memory store marked unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn increment(&self, namespace: &str) -> Result<u64, IdentError> {
        self.increments.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let count = counters.entry(namespace.to_string()).or_insert(0);
        *count = count
            .checked_add(1)
            .ok_or_else(|| IdentError::unavailable(format!("counter '{namespace}' overflowed")))?;
        Ok(*count)
    }

    async fn current(&self, namespace: &str) -> Result<Option<u64>, IdentError> {
        self.check_available()?;
        let counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(counters.get(namespace).copied())
    }
}

#[async_trait]
impl SlugIndex for MemoryStore {
    async fn slug_exists(&self, probe: SlugProbe<'_>) -> Result<bool, IdentError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let slugs = self.slugs.lock().unwrap_or_else(PoisonError::into_inner);
        let exists = slugs.iter().any(|r| {
            !r.is_deleted
                && r.entity_type == probe.entity_type
                && r.slug == probe.slug
                && probe.exclude_id != Some(&r.id)
        });
        debug!(
            entity_type = probe.entity_type,
            slug = probe.slug,
            exists,
            "memory slug probe"
        );
        Ok(exists)
    }
}
