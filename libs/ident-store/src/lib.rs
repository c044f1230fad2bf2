//! Postgres-backed identifier store.
//!
//! This crate provides:
//! - [`StoreConfig`]: pool settings plus the entity type -> slug table registry
//! - [`IdentStore`]: opens the pool, applies the counter migration and checks
//!   that every table the allocators will touch exists
//! - [`PgCounterStore`]: atomic per-namespace counters in `ident_counters`
//! - [`PgSlugIndex`]: slug existence probes against the entity tables
//!
//! Setup failures are [`DbError`]. Every query failure on the allocation
//! path is reported as `IdentError::StoreUnavailable`.

mod counters;
mod error;
mod slugs;

pub use counters::PgCounterStore;
pub use error::DbError;
pub use slugs::{PgSlugIndex, SlugTables};

use std::path::PathBuf;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

const COUNTERS_TABLE: &str = "ident_counters";

/// Identifier store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Postgres connection URL.
    pub database_url: String,

    /// Maximum number of pooled connections.
    pub max_connections: u32,

    /// How long an allocation waits for a pooled connection.
    pub acquire_timeout: Duration,

    /// Directory holding the `ident_counters` migration. `None` leaves the
    /// schema to an external migration step; it is still verified on open.
    pub migrations_dir: Option<PathBuf>,

    /// Entity tables probed for slug conflicts.
    pub slug_tables: SlugTables,
}

impl StoreConfig {
    /// Configuration for `database_url` with default pool settings, no
    /// migrations and no slug tables.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            migrations_dir: None,
            slug_tables: SlugTables::new(),
        }
    }

    /// Load configuration from environment variables:
    ///
    /// - `DATABASE_URL` (default `postgres://localhost/storefront`)
    /// - `IDENT_DB_MAX_CONNECTIONS` (default 10)
    /// - `IDENT_DB_ACQUIRE_TIMEOUT_SECS` (default 5)
    /// - `IDENT_MIGRATIONS_DIR` (unset: do not migrate)
    /// - `IDENT_SLUG_TABLES`, e.g. `product=products,blog=content.posts`
    ///
    /// Unparseable numbers fall back to their defaults. A malformed slug
    /// table list is an error, since a missing table would only surface on
    /// the first allocation.
    pub fn from_env() -> Result<Self, DbError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DbError> {
        let mut config = Self::new(
            lookup("DATABASE_URL").unwrap_or_else(|| "postgres://localhost/storefront".to_string()),
        );

        if let Some(max) = lookup("IDENT_DB_MAX_CONNECTIONS").and_then(|s| s.trim().parse().ok()) {
            config.max_connections = max;
        }
        if let Some(secs) =
            lookup("IDENT_DB_ACQUIRE_TIMEOUT_SECS").and_then(|s| s.trim().parse().ok())
        {
            config.acquire_timeout = Duration::from_secs(secs);
        }
        config.migrations_dir = lookup("IDENT_MIGRATIONS_DIR")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        if let Some(list) = lookup("IDENT_SLUG_TABLES") {
            config.slug_tables = SlugTables::parse(&list)?;
        }

        Ok(config)
    }
}

/// An open identifier store whose schema has been verified.
#[derive(Clone)]
pub struct IdentStore {
    pool: PgPool,
    tables: SlugTables,
}

impl IdentStore {
    /// Connects, applies migrations if `migrations_dir` is set, and checks
    /// that `ident_counters` and every registered slug table exist.
    pub async fn open(config: &StoreConfig) -> Result<Self, DbError> {
        info!(
            max_connections = config.max_connections,
            slug_tables = config.slug_tables.iter().count(),
            "Opening identifier store"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await
            .map_err(DbError::Connect)?;

        let store = Self {
            pool,
            tables: config.slug_tables.clone(),
        };
        if let Some(dir) = &config.migrations_dir {
            store.migrate(dir.clone()).await?;
        }
        store.verify_schema().await?;

        info!("Identifier store ready");
        Ok(store)
    }

    async fn migrate(&self, dir: PathBuf) -> Result<(), DbError> {
        let migration_error = |source| DbError::Migration {
            dir: dir.display().to_string(),
            source,
        };

        let migrator = Migrator::new(dir.clone()).await.map_err(migration_error)?;
        migrator.run(&self.pool).await.map_err(migration_error)?;

        info!(migrations_dir = %dir.display(), "Identifier migrations applied");
        Ok(())
    }

    /// Checks that `ident_counters` exists and that every registered slug
    /// table exists and has the columns the slug query reads.
    pub async fn verify_schema(&self) -> Result<(), DbError> {
        if !self.table_exists(COUNTERS_TABLE).await? {
            return Err(DbError::MissingCountersTable);
        }

        for (entity_type, table) in self.tables.iter() {
            if !self.table_exists(table).await? {
                return Err(DbError::MissingSlugTable {
                    entity_type: entity_type.to_string(),
                    table: table.to_string(),
                });
            }

            // Runs the slug query once so a missing column fails here.
            if let Some(query) = self.tables.query_for(entity_type) {
                sqlx::query_scalar::<_, bool>(query)
                    .bind("")
                    .bind(None::<&str>)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|source| DbError::SlugTableShape {
                        entity_type: entity_type.to_string(),
                        table: table.to_string(),
                        source,
                    })?;
            }
            debug!(entity_type, table, "Verified slug table");
        }

        Ok(())
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DbError> {
        sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
            .bind(table)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::Query)
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the store is reachable.
    pub async fn health_check(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;
        Ok(())
    }

    /// Counter store sharing this pool.
    pub fn counter_store(&self) -> PgCounterStore {
        PgCounterStore::new(self.pool.clone())
    }

    /// Slug index over the registered tables, sharing this pool.
    pub fn slug_index(&self) -> PgSlugIndex {
        PgSlugIndex::new(self.pool.clone(), self.tables.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_defaults() {
        let config = StoreConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.database_url, "postgres://localhost/storefront");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
        assert!(config.migrations_dir.is_none());
        assert!(config.slug_tables.is_empty());
    }

    #[test]
    fn test_config_from_lookup() {
        let env = HashMap::from([
            ("DATABASE_URL", "postgres://ident@db/shop"),
            ("IDENT_DB_MAX_CONNECTIONS", "4"),
            ("IDENT_DB_ACQUIRE_TIMEOUT_SECS", "not-a-number"),
            ("IDENT_MIGRATIONS_DIR", "/srv/ident/migrations"),
            ("IDENT_SLUG_TABLES", "product=products,blog=content.posts"),
        ]);
        let config = StoreConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.database_url, "postgres://ident@db/shop");
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
        assert_eq!(
            config.migrations_dir,
            Some(PathBuf::from("/srv/ident/migrations"))
        );
        assert!(config.slug_tables.contains("product"));
        assert!(config.slug_tables.contains("blog"));
        assert!(!config.slug_tables.contains("brand"));
    }

    #[test]
    fn test_config_rejects_bad_slug_tables() {
        let env = HashMap::from([("IDENT_SLUG_TABLES", "product=products,brand")]);
        let err = StoreConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, DbError::InvalidSlugTableEntry(entry) if entry == "brand"));
    }
}
