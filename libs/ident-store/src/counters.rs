//! Atomic namespace counters.
//!
//! One upsert statement increments and returns the counter, so Postgres row
//! locking serializes concurrent allocators on the same namespace and the
//! row is created on first use.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use storefront_ident::{CounterStore, IdentError};
use tracing::debug;

/// [`CounterStore`] over the `ident_counters` table.
#[derive(Clone)]
pub struct PgCounterStore {
    pool: PgPool,
}

impl PgCounterStore {
    /// Create a new counter store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_count(namespace: &str, value: i64) -> Result<u64, IdentError> {
    u64::try_from(value).map_err(|_| {
        IdentError::unavailable(format!("counter '{namespace}' holds negative value {value}"))
    })
}

#[async_trait]
impl CounterStore for PgCounterStore {
    async fn increment(&self, namespace: &str) -> Result<u64, IdentError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO ident_counters (namespace, count)
            VALUES ($1, 1)
            ON CONFLICT (namespace)
            DO UPDATE SET count = ident_counters.count + 1, updated_at = now()
            RETURNING count
            "#,
        )
        .bind(namespace)
        .fetch_one(&self.pool)
        .await
        .map_err(IdentError::unavailable)?;

        debug!(namespace, count, "Incremented counter");
        to_count(namespace, count)
    }

    async fn current(&self, namespace: &str) -> Result<Option<u64>, IdentError> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT count FROM ident_counters WHERE namespace = $1")
                .bind(namespace)
                .fetch_optional(&self.pool)
                .await
                .map_err(IdentError::unavailable)?;

        count.map(|c| to_count(namespace, c)).transpose()
    }
}
