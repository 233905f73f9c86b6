//! Custom per-field computations.
//!
//! A field with a registered resolver takes the resolver's result; every other
//! field is read directly off the entity.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use serde_json::Value;

use store::Entity;

/// Computes one output field from a source entity.
pub type Resolver = Arc<dyn Fn(&dyn Entity) -> anyhow::Result<Value> + Send + Sync>;

/// Maps output field names to their resolvers.
pub type ResolverRegistry = HashMap<String, Resolver>;

/// Wrap a closure over any entity.
pub fn resolver<F>(f: F) -> Resolver
where
    F: Fn(&dyn Entity) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure over the concrete row type `E`.
///
/// The resolver fails if it is handed an entity of any other type.
pub fn typed<E, F>(f: F) -> Resolver
where
    E: Entity + 'static,
    F: Fn(&E) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(move |entity: &dyn Entity| {
        let typed = entity.downcast_ref::<E>().ok_or_else(|| {
            anyhow!(
                "expected a {}, got a(n) {} entity",
                std::any::type_name::<E>(),
                entity.entity_type()
            )
        })?;
        f(typed)
    })
}
