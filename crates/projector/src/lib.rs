//! `projector` crate: turns storage rows into validated records.
//!
//! A [`Projector`] is built once from a [`ProjectorConfig`] (field schema,
//! entity type, eager-load spec, page size, output mode) and then projects
//! single entities, entity sequences, or query handles into mappings or
//! typed records.

pub mod config;
pub mod error;
pub mod includes;
pub mod projector;
pub mod record;
pub mod resolver;
pub mod schema;
pub mod source;

pub use config::{OutputMode, PageRequest, ProjectOptions, ProjectorConfig};
pub use error::ProjectorError;
pub use projector::Projector;
pub use record::{Projected, Projection, Record};
pub use resolver::{resolver, typed, Resolver, ResolverRegistry};
pub use schema::{FieldSchema, FieldType};
pub use source::Source;
