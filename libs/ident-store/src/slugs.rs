//! Slug existence probes against entity tables.
//!
//! Each entity type maps to a table that has at least:
//!
//! ```text
//! id         <any type castable to TEXT>
//! slug       TEXT
//! is_deleted BOOLEAN
//! ```
//!
//! Only rows with `is_deleted = true` are ignored; a NULL flag counts as
//! live. The owning service should also keep a partial unique index
//! `ON <table> (slug) WHERE is_deleted IS NOT TRUE`; that index, not the
//! probe, is what finally rejects a racing duplicate.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use storefront_ident::{IdentError, SlugIndex, SlugProbe};
use tracing::debug;

use crate::DbError;

/// Registry of entity type -> table, with the probe query prepared per table.
#[derive(Debug, Clone, Default)]
pub struct SlugTables {
    entries: BTreeMap<String, SlugTable>,
}

#[derive(Debug, Clone)]
struct SlugTable {
    table: String,
    query: String,
}

impl SlugTables {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `table` (optionally schema-qualified) for `entity_type`.
    ///
    /// Table names are interpolated into SQL, so only plain identifiers
    /// (`[a-z_][a-z0-9_]*`, at most one `.`) are accepted.
    pub fn register(
        mut self,
        entity_type: impl Into<String>,
        table: &str,
    ) -> Result<Self, DbError> {
        let entity_type = entity_type.into();
        if !is_valid_table_name(table) {
            return Err(DbError::InvalidTableName {
                entity_type,
                table: table.to_string(),
            });
        }

        let query = format!(
            "SELECT EXISTS (\
                SELECT 1 FROM {table} \
                WHERE slug = $1 \
                  AND is_deleted IS NOT TRUE \
                  AND ($2::TEXT IS NULL OR id::TEXT <> $2)\
            )"
        );
        self.entries.insert(
            entity_type,
            SlugTable {
                table: table.to_string(),
                query,
            },
        );
        Ok(self)
    }

    /// Parses a comma-separated `entity_type=table` list, for example
    /// `product=products,blog=content.posts`. Blank entries are skipped.
    pub fn parse(list: &str) -> Result<Self, DbError> {
        list.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .try_fold(Self::new(), |tables, entry| {
                let (entity_type, table) = entry
                    .split_once('=')
                    .map(|(e, t)| (e.trim(), t.trim()))
                    .filter(|(e, _)| !e.is_empty())
                    .ok_or_else(|| DbError::InvalidSlugTableEntry(entry.to_string()))?;
                tables.register(entity_type, table)
            })
    }

    /// Returns true if `entity_type` has a table.
    pub fn contains(&self, entity_type: &str) -> bool {
        self.entries.contains_key(entity_type)
    }

    /// Returns true if no entity type is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(entity_type, table)` pairs in entity type order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(entity_type, entry)| (entity_type.as_str(), entry.table.as_str()))
    }

    pub(crate) fn query_for(&self, entity_type: &str) -> Option<&str> {
        self.entries.get(entity_type).map(|entry| entry.query.as_str())
    }
}

fn is_valid_table_name(table: &str) -> bool {
    let parts: Vec<&str> = table.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
                && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        })
}

/// [`SlugIndex`] over Postgres entity tables.
#[derive(Clone)]
pub struct PgSlugIndex {
    pool: PgPool,
    tables: SlugTables,
}

impl PgSlugIndex {
    /// Create a new slug index.
    pub fn new(pool: PgPool, tables: SlugTables) -> Self {
        Self { pool, tables }
    }
}

#[async_trait]
impl SlugIndex for PgSlugIndex {
    async fn slug_exists(&self, probe: SlugProbe<'_>) -> Result<bool, IdentError> {
        let query = self
            .tables
            .query_for(probe.entity_type)
            .ok_or_else(|| IdentError::UnknownEntityType(probe.entity_type.to_string()))?;

        let exists: bool = sqlx::query_scalar(query)
            .bind(probe.slug)
            .bind(probe.exclude_id.map(|id| id.as_str()))
            .fetch_one(&self.pool)
            .await
            .map_err(IdentError::unavailable)?;

        debug!(
            entity_type = probe.entity_type,
            slug = probe.slug,
            exists,
            "Probed slug"
        );
        Ok(exists)
    }
}
