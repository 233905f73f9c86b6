//! The three shapes a projector can read from.

use store::{Entity, Query};

/// Input to [`Projector::project`](crate::Projector::project).
#[derive(Debug)]
pub enum Source<'a> {
    /// A single entity; projects to one output.
    Entity(&'a dyn Entity),
    /// Already-materialized entities; projects to one output each, in order.
    Entities(Vec<&'a dyn Entity>),
    /// A lazy query; eager loading is attached before it is fetched.
    Query(Box<dyn Query + 'a>),
}

impl<'a> Source<'a> {
    pub fn entity<E: Entity>(entity: &'a E) -> Self {
        Self::Entity(entity)
    }

    pub fn entities<E: Entity>(entities: &'a [E]) -> Self {
        Self::Entities(entities.iter().map(|e| e as &dyn Entity).collect())
    }

    pub fn query<Q: Query + 'a>(query: Q) -> Self {
        Self::Query(Box::new(query))
    }

    /// Short description of the source for errors and logs.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Entity(entity) => format!("a single {} entity {entity:?}", entity.entity_type()),
            Self::Entities(entities) => format!("a sequence of {} entities", entities.len()),
            Self::Query(query) => format!("a query for {} ({query:?})", query.entity_type()),
        }
    }
}
