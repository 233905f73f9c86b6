//! The set of entity types a storage backend knows about.

use std::collections::BTreeSet;

use tracing::debug;

use crate::{DbPool, Model, StoreError};

/// Entity-type identifiers known to the storage layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entity_types: BTreeSet<String>,
}

impl Catalog {
    pub fn new<I, S>(entity_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entity_types: entity_types.into_iter().map(Into::into).collect(),
        }
    }

    /// Add the entity type of model `M`.
    pub fn register<M: Model>(mut self) -> Self {
        self.entity_types.insert(M::ENTITY.to_owned());
        self
    }

    /// Read the user tables of a SQLite database.
    ///
    /// SQLite's internal tables and the migration bookkeeping table are not
    /// entity types.
    pub async fn from_pool(pool: &DbPool) -> Result<Self, StoreError> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
              AND name <> '_sqlx_migrations'
            "#,
        )
        .fetch_all(pool)
        .await?;

        debug!("catalog loaded {} entity types", names.len());
        Ok(Self::new(names))
    }

    pub fn contains(&self, entity_type: &str) -> bool {
        self.entity_types.contains(entity_type)
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.entity_types.iter().map(String::as_str)
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Serialize)]
    struct Publisher {
        id: i64,
    }

    impl Model for Publisher {
        const ENTITY: &'static str = "publishers";
    }

    #[test]
    fn registered_models_are_known() {
        let catalog = Catalog::new(["authors"]).register::<Publisher>();
        assert!(catalog.contains("authors"));
        assert!(catalog.contains("publishers"));
        assert!(!catalog.contains("books"));
        assert_eq!(catalog.entity_types().collect::<Vec<_>>(), vec!["authors", "publishers"]);
    }

    #[tokio::test]
    async fn reads_tables_from_sqlite() {
        let pool = crate::pool::create_pool("sqlite::memory:", 1).await.unwrap();
        sqlx::query("CREATE TABLE authors (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();

        let catalog = Catalog::from_pool(&pool).await.unwrap();
        assert!(catalog.contains("authors"));
        assert!(!catalog.contains("sqlite_sequence"));
    }
}
