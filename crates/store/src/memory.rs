//! `MemoryQuery`: an in-memory query handle that records its calls.
//!
//! Rows are fully materialised models, so relations are already in place and
//! eager loading is only recorded.  Useful in tests where a database is
//! irrelevant, and for asserting what a caller did to a query handle.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::{Entity, Include, Model, Query, StoreError};

/// One call made on a [`MemoryQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryCall {
    Offset(u64),
    Limit(u64),
    Includes(Vec<Include>),
    Fetch,
}

/// Shared, append-only record of calls made on a query handle and its clones.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<QueryCall>>>);

impl CallLog {
    fn push(&self, call: QueryCall) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }

    /// All calls so far, in call order.
    pub fn calls(&self) -> Vec<QueryCall> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The includes attached before the first fetch, if any.
    pub fn includes_before_fetch(&self) -> Option<Vec<Include>> {
        self.calls()
            .into_iter()
            .take_while(|call| *call != QueryCall::Fetch)
            .find_map(|call| match call {
                QueryCall::Includes(includes) => Some(includes),
                _ => None,
            })
    }
}

type Filter<M> = Arc<dyn Fn(&M) -> bool + Send + Sync>;

/// A query over an in-memory row set of model `M`.
pub struct MemoryQuery<M> {
    rows: Arc<Vec<M>>,
    filter: Option<Filter<M>>,
    offset: u64,
    limit: Option<u64>,
    includes: Vec<Include>,
    log: CallLog,
}

impl<M: Model + Clone> MemoryQuery<M> {
    /// A query over every row, in the given order.
    pub fn new(rows: impl Into<Arc<Vec<M>>>) -> Self {
        Self {
            rows: rows.into(),
            filter: None,
            offset: 0,
            limit: None,
            includes: Vec::new(),
            log: CallLog::default(),
        }
    }

    /// Keep only rows matching `predicate`.
    pub fn filter(mut self, predicate: impl Fn(&M) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(predicate));
        self
    }

    /// Handle to this query's call log; stays valid after the query is moved.
    pub fn call_log(&self) -> CallLog {
        self.log.clone()
    }

    /// The includes currently attached.
    pub fn attached_includes(&self) -> &[Include] {
        &self.includes
    }
}

impl<M> fmt::Debug for MemoryQuery<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryQuery")
            .field("rows", &self.rows.len())
            .field("filtered", &self.filter.is_some())
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .field("includes", &self.includes)
            .finish()
    }
}

#[async_trait]
impl<M: Model + Clone> Query for MemoryQuery<M> {
    fn entity_type(&self) -> &str {
        M::ENTITY
    }

    fn offset(&mut self, offset: u64) {
        self.log.push(QueryCall::Offset(offset));
        self.offset = offset;
    }

    fn limit(&mut self, limit: u64) {
        self.log.push(QueryCall::Limit(limit));
        self.limit = Some(limit);
    }

    fn includes(&mut self, includes: &[Include]) {
        self.log.push(QueryCall::Includes(includes.to_vec()));
        self.includes.extend_from_slice(includes);
    }

    async fn fetch(&self) -> Result<Vec<Box<dyn Entity>>, StoreError> {
        self.log.push(QueryCall::Fetch);

        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = self
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));

        let rows = self
            .rows
            .iter()
            .filter(|row| self.filter.as_ref().map_or(true, |keep| keep(row)))
            .skip(offset)
            .take(limit)
            .map(|row| Box::new(row.clone()) as Box<dyn Entity>)
            .collect();

        Ok(rows)
    }
}
