//! The `Query` trait: a lazy, composable query handle.

use std::fmt;

use async_trait::async_trait;

use crate::{Entity, Include, StoreError};

/// A storage query that has not been executed yet.
///
/// `offset`, `limit` and `includes` only refine the handle; nothing touches
/// storage until [`Query::fetch`].
#[async_trait]
pub trait Query: Send + Sync + fmt::Debug {
    /// Entity type of the rows this query yields.
    fn entity_type(&self) -> &str;

    /// Skip the first `offset` rows.
    fn offset(&mut self, offset: u64);

    /// Yield at most `limit` rows.
    fn limit(&mut self, limit: u64);

    /// Attach an eager-load spec; related entities are fetched with the rows.
    fn includes(&mut self, includes: &[Include]);

    /// Execute the query and return its rows in storage-defined order.
    async fn fetch(&self) -> Result<Vec<Box<dyn Entity>>, StoreError>;
}
