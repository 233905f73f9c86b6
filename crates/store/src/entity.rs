//! Entities: the rows the storage layer hands out.
//!
//! The projector only ever sees `&dyn Entity`: an entity-type identifier plus
//! by-name field access.  Concrete row structs opt in by implementing
//! [`Model`], which provides [`Entity`] through their `Serialize` form.

use std::any::Any;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// A single row/object produced by the storage layer.
pub trait Entity: Send + Sync + fmt::Debug {
    /// Identifier of the entity type (the table name for SQL-backed rows).
    fn entity_type(&self) -> &str;

    /// Every directly readable field, keyed by name.
    ///
    /// Relations that were eager-loaded show up as nested values; relations
    /// that were not loaded are absent. Callers reading several fields take
    /// one snapshot instead of calling [`Entity::field`] repeatedly.
    fn fields(&self) -> Map<String, Value>;

    /// Read a single field directly by name.
    ///
    /// Returns `None` when the entity has no such field.
    fn field(&self, name: &str) -> Option<Value> {
        self.fields().remove(name)
    }

    /// Access the concrete row type, for resolvers that need typed access.
    fn as_any(&self) -> &dyn Any;
}

impl dyn Entity + '_ {
    /// Downcast to the concrete row type.
    pub fn downcast_ref<T: Entity + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// A serializable row struct bound to one entity type.
///
/// Every `Model` is an [`Entity`]; direct field access reads the value the
/// struct serializes under that name.
pub trait Model: Serialize + fmt::Debug + Send + Sync + 'static {
    /// Entity-type identifier shared by every instance.
    const ENTITY: &'static str;
}

impl<M: Model> Entity for M {
    fn entity_type(&self) -> &str {
        M::ENTITY
    }

    /// Serializes the whole model; eager-loaded relations included.
    fn fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
