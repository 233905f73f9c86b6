//! Typed error type for the store crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// An eager-load spec names a relation the entity does not declare.
    #[error("'{entity}' has no relation named '{relation}'")]
    UnknownRelation {
        entity: String,
        relation: String,
    },

    /// A table or column name that cannot be spliced into SQL.
    #[error("invalid SQL identifier: '{0}'")]
    InvalidIdentifier(String),
}
