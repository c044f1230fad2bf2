//! Store setup errors.

use thiserror::Error;

/// Errors from opening the Postgres identifier store.
///
/// Errors during allocation itself are reported as
/// [`storefront_ident::IdentError`].
#[derive(Debug, Error)]
pub enum DbError {
    /// The pool could not reach Postgres.
    #[error("failed to connect to identifier store: {0}")]
    Connect(#[source] sqlx::Error),

    /// A schema check or health query failed.
    #[error("identifier store query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// The migration set could not be loaded or applied.
    #[error("failed to apply identifier migrations from {dir}: {source}")]
    Migration {
        dir: String,
        #[source]
        source: sqlx::migrate::MigrateError,
    },

    /// `ident_counters` does not exist in the target database.
    #[error("table ident_counters does not exist; apply the identifier migrations first")]
    MissingCountersTable,

    /// A registered slug table does not exist.
    #[error("slug table '{table}' for entity type '{entity_type}' does not exist")]
    MissingSlugTable { entity_type: String, table: String },

    /// A registered slug table lacks the `id`, `slug` or `is_deleted` column.
    #[error("slug table '{table}' for entity type '{entity_type}' cannot be queried: {source}")]
    SlugTableShape {
        entity_type: String,
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// A slug table name is not a plain SQL identifier.
    #[error("invalid table name for entity type '{entity_type}': '{table}'")]
    InvalidTableName { entity_type: String, table: String },

    /// A slug table list entry is not `entity_type=table`.
    #[error("invalid slug table entry '{0}', expected entity_type=table")]
    InvalidSlugTableEntry(String),
}
