//! `store` crate: the storage seam the projector reads from.
//!
//! Provides the [`Entity`] and [`Query`] traits, eager-load specs, an entity
//! [`Catalog`], an in-memory query handle for tests, and a SQLite backend
//! built on `sqlx`.  No projection logic lives here.

pub mod catalog;
pub mod entity;
pub mod error;
pub mod include;
pub mod memory;
pub mod pool;
pub mod query;
pub mod sqlite;

pub use catalog::Catalog;
pub use entity::{Entity, Model};
pub use error::StoreError;
pub use include::{Include, IncludeTree};
pub use memory::{CallLog, MemoryQuery, QueryCall};
pub use pool::DbPool;
pub use query::Query;
pub use sqlite::{SqlEntity, SqlValue, SqliteQuery};
