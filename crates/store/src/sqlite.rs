//! SQLite query handles built on `sqlx`.
//!
//! A [`SqliteQuery`] renders to
//! `SELECT * FROM <table> [WHERE ..] ORDER BY <pk> LIMIT .. OFFSET ..` and,
//! when includes are attached, hands the fetched rows to the entity's
//! [`SqlEntity::preload`] hook to attach related rows.

use std::fmt;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;
use tracing::debug;

use crate::{DbPool, Entity, Include, IncludeTree, Model, Query, StoreError};

/// Rows preloaded together, and keys bound into one `IN (..)` list.
///
/// Stays well below SQLite's limit on bound parameters.
pub const BATCH_SIZE: usize = 1000;

/// A model that maps onto a SQLite table.
///
/// The table name is [`Model::ENTITY`].
#[async_trait]
pub trait SqlEntity: Model + Sized + Unpin + for<'r> FromRow<'r, SqliteRow> {
    /// Primary-key column; defines the natural row order.
    const PRIMARY_KEY: &'static str = "id";

    /// Relations this entity can eager-load.
    const RELATIONS: &'static [&'static str] = &[];

    /// Attach the relations named in `includes` to a batch of rows.
    ///
    /// Only called with relations listed in [`SqlEntity::RELATIONS`].
    async fn preload(
        _pool: &DbPool,
        _rows: &mut [Self],
        _includes: &IncludeTree,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}

/// A bindable value for an equality filter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(i64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A lazy query over the table of `E`.
pub struct SqliteQuery<E> {
    pool: DbPool,
    filters: Vec<(String, SqlValue)>,
    offset: Option<u64>,
    limit: Option<u64>,
    includes: Vec<Include>,
    _entity: std::marker::PhantomData<fn() -> E>,
}

impl<E: SqlEntity> SqliteQuery<E> {
    /// Every row of the table.
    pub fn all(pool: &DbPool) -> Self {
        Self {
            pool: pool.clone(),
            filters: Vec::new(),
            offset: None,
            limit: None,
            includes: Vec::new(),
            _entity: std::marker::PhantomData,
        }
    }

    /// Keep rows whose `column` equals `value`.
    ///
    /// # Errors
    /// [`StoreError::InvalidIdentifier`] if `column` is not a plain identifier.
    pub fn where_eq(mut self, column: &str, value: impl Into<SqlValue>) -> Result<Self, StoreError> {
        check_identifier(column)?;
        self.filters.push((column.to_owned(), value.into()));
        Ok(self)
    }

    fn to_sql(&self) -> String {
        let mut sql = format!("SELECT * FROM {}", E::ENTITY);

        if !self.filters.is_empty() {
            let clauses: Vec<String> = self
                .filters
                .iter()
                .map(|(column, _)| format!("{column} = ?"))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        sql.push_str(&format!(" ORDER BY {}", E::PRIMARY_KEY));

        // SQLite only accepts OFFSET after a LIMIT; -1 means "no limit".
        // Both are signed 64-bit in SQLite, so larger values saturate.
        match (self.limit, self.offset) {
            (None, None) => {}
            (limit, offset) => {
                let limit = limit.map_or(-1, to_sql_integer);
                let offset = offset.map_or(0, to_sql_integer);
                sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
            }
        }

        sql
    }
}

impl<E> fmt::Debug for SqliteQuery<E>
where
    E: SqlEntity,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteQuery")
            .field("sql", &self.to_sql())
            .field("includes", &self.includes)
            .finish()
    }
}

#[async_trait]
impl<E: SqlEntity> Query for SqliteQuery<E> {
    fn entity_type(&self) -> &str {
        E::ENTITY
    }

    fn offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    fn limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    fn includes(&mut self, includes: &[Include]) {
        self.includes.extend_from_slice(includes);
    }

    async fn fetch(&self) -> Result<Vec<Box<dyn Entity>>, StoreError> {
        let sql = self.to_sql();
        debug!(%sql, "fetching rows");

        let mut query = sqlx::query_as::<_, E>(&sql);
        for (_, value) in &self.filters {
            query = match value {
                SqlValue::Integer(i) => query.bind(*i),
                SqlValue::Text(s) => query.bind(s.clone()),
            };
        }
        let mut rows = query.fetch_all(&self.pool).await?;

        let tree = IncludeTree::from_includes(&self.includes);
        for batch in rows.chunks_mut(BATCH_SIZE) {
            preload(&self.pool, batch, &tree).await?;
        }

        Ok(rows
            .into_iter()
            .map(|row| Box::new(row) as Box<dyn Entity>)
            .collect())
    }
}

/// Load the rows of `E` whose `column` is one of `keys`, then preload
/// `includes` on them.
///
/// Intended for [`SqlEntity::preload`] implementations: a belongs-to
/// relation passes the foreign keys of the batch with `column = "id"`, a
/// has-many relation passes the batch's primary keys with the foreign-key
/// column of the child table.
///
/// Keys are queried [`BATCH_SIZE`] at a time; the result is in primary-key
/// order either way.
pub async fn fetch_in<E: SqlEntity>(
    pool: &DbPool,
    column: &str,
    keys: &[i64],
    includes: &IncludeTree,
) -> Result<Vec<E>, StoreError> {
    check_identifier(column)?;

    let mut keys = keys.to_vec();
    keys.sort_unstable();
    keys.dedup();
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let mut rows = Vec::new();
    for chunk in keys.chunks(BATCH_SIZE) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "SELECT * FROM {} WHERE {column} IN ({placeholders}) ORDER BY {}",
            E::ENTITY,
            E::PRIMARY_KEY,
        );
        debug!(%sql, keys = chunk.len(), "fetching related rows");

        let mut query = sqlx::query_as::<_, E>(&sql);
        for key in chunk {
            query = query.bind(*key);
        }
        rows.extend(query.fetch_all(pool).await?);
    }

    // Chunks over a primary key are already in order; over a foreign key
    // they interleave.
    if keys.len() > BATCH_SIZE && column != E::PRIMARY_KEY {
        rows.sort_by_cached_key(|row| row.field(E::PRIMARY_KEY).and_then(|pk| pk.as_i64()));
    }

    for batch in rows.chunks_mut(BATCH_SIZE) {
        preload(pool, batch, includes).await?;
    }
    Ok(rows)
}

fn to_sql_integer(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

async fn preload<E: SqlEntity>(
    pool: &DbPool,
    rows: &mut [E],
    includes: &IncludeTree,
) -> Result<(), StoreError> {
    if includes.is_empty() || rows.is_empty() {
        return Ok(());
    }

    let unknown = includes
        .relations()
        .find(|r| !E::RELATIONS.iter().any(|known| known == r));
    if let Some(unknown) = unknown {
        return Err(StoreError::UnknownRelation {
            entity: E::ENTITY.to_owned(),
            relation: unknown.to_owned(),
        });
    }

    debug!(
        entity = E::ENTITY,
        relations = ?includes.relations().collect::<Vec<_>>(),
        "preloading relations"
    );
    E::preload(pool, rows, includes).await
}

fn check_identifier(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_owned()))
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, sqlx::FromRow)]
    struct Publisher {
        id: i64,
        name: String,
    }

    impl Model for Publisher {
        const ENTITY: &'static str = "publishers";
    }

    impl SqlEntity for Publisher {}

    async fn pool_with_publishers(names: &[&str]) -> DbPool {
        let pool = crate::pool::create_pool("sqlite::memory:", 1).await.unwrap();
        sqlx::query("CREATE TABLE publishers (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        for name in names {
            sqlx::query("INSERT INTO publishers (name) VALUES (?)")
                .bind(*name)
                .execute(&pool)
                .await
                .unwrap();
        }
        pool
    }

    fn names(rows: &[Box<dyn Entity>]) -> Vec<serde_json::Value> {
        rows.iter().map(|row| row.field("name").unwrap()).collect()
    }

    #[tokio::test]
    async fn sql_without_window() {
        let pool = sqlx::SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        let query = SqliteQuery::<Publisher>::all(&pool).where_eq("id", 3).unwrap();
        assert_eq!(query.to_sql(), "SELECT * FROM publishers WHERE id = ? ORDER BY id");
    }

    #[tokio::test]
    async fn offset_without_limit_uses_unbounded_limit() {
        let pool = sqlx::SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        let mut query = SqliteQuery::<Publisher>::all(&pool);
        query.offset(20);
        assert_eq!(query.to_sql(), "SELECT * FROM publishers ORDER BY id LIMIT -1 OFFSET 20");
    }

    #[tokio::test]
    async fn oversized_window_saturates() {
        let pool = sqlx::SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        let mut query = SqliteQuery::<Publisher>::all(&pool);
        query.offset(u64::MAX);
        query.limit(u64::MAX);
        assert_eq!(
            query.to_sql(),
            format!("SELECT * FROM publishers ORDER BY id LIMIT {0} OFFSET {0}", i64::MAX)
        );
    }

    #[tokio::test]
    async fn huge_limit_returns_every_row() {
        let pool = pool_with_publishers(&["A", "B", "C"]).await;
        let mut query = SqliteQuery::<Publisher>::all(&pool);
        query.limit(u64::MAX);
        let rows = query.fetch().await.unwrap();
        assert_eq!(names(&rows), vec![json!("A"), json!("B"), json!("C")]);
    }

    #[tokio::test]
    async fn column_names_are_checked() {
        let pool = sqlx::SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        let result = SqliteQuery::<Publisher>::all(&pool).where_eq("id; DROP TABLE x", 1);
        assert!(matches!(result, Err(StoreError::InvalidIdentifier(_))));
    }

    #[tokio::test]
    async fn fetch_applies_filters_and_window() {
        let pool = pool_with_publishers(&["A", "B", "C", "D"]).await;

        let mut query = SqliteQuery::<Publisher>::all(&pool);
        query.offset(1);
        query.limit(2);
        let rows = query.fetch().await.unwrap();
        assert_eq!(names(&rows), vec![json!("B"), json!("C")]);

        let rows = SqliteQuery::<Publisher>::all(&pool)
            .where_eq("name", "D")
            .unwrap()
            .fetch()
            .await
            .unwrap();
        assert_eq!(names(&rows), vec![json!("D")]);
    }

    #[tokio::test]
    async fn undeclared_relation_is_rejected() {
        let pool = pool_with_publishers(&["A"]).await;
        let mut query = SqliteQuery::<Publisher>::all(&pool);
        query.includes(&[Include::relation("books")]);

        let err = query.fetch().await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnknownRelation { relation, .. } if relation == "books"
        ));
    }

    #[tokio::test]
    async fn fetch_in_dedups_keys() {
        let pool = pool_with_publishers(&["A", "B", "C"]).await;
        let rows: Vec<Publisher> = fetch_in(&pool, "id", &[3, 1, 3], &IncludeTree::default())
            .await
            .unwrap();
        assert_eq!(rows.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), vec!["A", "C"]);

        let none: Vec<Publisher> = fetch_in(&pool, "id", &[], &IncludeTree::default())
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn fetch_in_spans_several_batches() {
        let pool = pool_with_publishers(&[]).await;
        sqlx::query(
            "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 2500)
             INSERT INTO publishers (name) SELECT 'P' || i FROM n",
        )
        .execute(&pool)
        .await
        .unwrap();

        let keys: Vec<i64> = (1..=2500).rev().collect();
        let rows: Vec<Publisher> = fetch_in(&pool, "id", &keys, &IncludeTree::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 2500);
        assert_eq!(rows.iter().map(|p| p.id).collect::<Vec<_>>(), (1..=2500).collect::<Vec<_>>());
    }
}
