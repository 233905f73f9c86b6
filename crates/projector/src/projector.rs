//! The record projector.
//!
//! `Projector` is the central component:
//! 1. Validates its configuration once, at construction.
//! 2. Accepts a single entity, a sequence of entities, or a query handle.
//! 3. For query handles, attaches the eager-load spec (unless suppressed)
//!    and fetches rows in storage order.
//! 4. Resolves every declared field (custom resolver, else direct field
//!    read), type-checks the values into a [`Record`], and emits either a
//!    mapping or the caller's typed record.
//!
//! Nothing is returned on failure: a batch aborts on its first bad record.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use store::{Catalog, Entity, Include, Query};

use crate::config::{OutputMode, PageRequest, ProjectOptions, ProjectorConfig};
use crate::includes::parse_includes;
use crate::record::{Projected, Projection, Record};
use crate::resolver::ResolverRegistry;
use crate::schema::{FieldSchema, FieldType};
use crate::{ProjectorError, Source};

/// Projects entities of one type into records of type `R`.
///
/// `R` only matters in [`OutputMode::Record`]; mappings are produced the same
/// way for every `R`.
pub struct Projector<R = Record> {
    config: ProjectorConfig,
    schema: FieldSchema,
    includes: Vec<Include>,
    resolvers: ResolverRegistry,
    _record: PhantomData<fn() -> R>,
}

impl Projector {
    /// Validate `config` and build a projector producing [`Record`]s.
    ///
    /// # Errors
    /// - [`ProjectorError::InvalidSchema`] / [`ProjectorError::DisallowedType`]
    ///   if the field schema is malformed or uses a type outside the allow-list.
    /// - [`ProjectorError::UnknownEntity`] if `catalog` does not know the
    ///   entity type.
    /// - [`ProjectorError::InvalidIncludes`] if the eager-load spec is not a
    ///   tree of relation names.
    /// - [`ProjectorError::InvalidPageSize`] for a zero default page size.
    /// - [`ProjectorError::UnknownResolverField`] if a resolver targets a field
    ///   the schema does not declare.
    pub fn new(
        config: ProjectorConfig,
        resolvers: ResolverRegistry,
        catalog: &Catalog,
    ) -> Result<Self, ProjectorError> {
        let schema = FieldSchema::parse(
            config
                .fields
                .iter()
                .map(|field| (field.name.as_str(), field.ty.as_str())),
        )?;

        if !catalog.contains(&config.entity) {
            return Err(ProjectorError::UnknownEntity(config.entity));
        }

        let includes = parse_includes(&config.includes)?;

        if config.page_size == 0 {
            return Err(ProjectorError::InvalidPageSize);
        }

        if let Some(field) = resolvers.keys().find(|field| !schema.contains(field)) {
            return Err(ProjectorError::UnknownResolverField(field.clone()));
        }

        info!(
            "projector for '{}' configured: {} fields, {} resolvers, {} includes",
            config.entity,
            schema.len(),
            resolvers.len(),
            includes.len()
        );

        Ok(Self {
            config,
            schema,
            includes,
            resolvers,
            _record: PhantomData,
        })
    }
}

impl<R> Projector<R> {
    /// Produce typed records of type `T` instead.
    pub fn with_record<T: DeserializeOwned>(self) -> Projector<T> {
        Projector {
            config: self.config,
            schema: self.schema,
            includes: self.includes,
            resolvers: self.resolvers,
            _record: PhantomData,
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.config.entity
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn includes(&self) -> &[Include] {
        &self.includes
    }

    pub fn default_page_size(&self) -> u64 {
        self.config.page_size
    }

    pub fn output_mode(&self) -> OutputMode {
        self.config.output
    }
}

impl<R: DeserializeOwned> Projector<R> {
    /// Project `source` with the configured defaults.
    ///
    /// # Errors
    /// See [`Projector::project_with`].
    pub async fn project(&self, source: Source<'_>) -> Result<Projection<R>, ProjectorError> {
        self.project_with(source, ProjectOptions::default()).await
    }

    /// Project `source`: one output for a single entity, one output per
    /// element (in order) for a sequence, one output per row (in storage
    /// order) for a query.
    ///
    /// # Errors
    /// - [`ProjectorError::TypeMismatch`] if an entity or query is of another
    ///   entity type.
    /// - Per-record errors ([`ProjectorError::FieldValidation`],
    ///   [`ProjectorError::MissingField`], [`ProjectorError::Resolver`],
    ///   [`ProjectorError::Decode`]) and storage errors, unchanged.
    #[instrument(skip(self, source), fields(entity = %self.config.entity))]
    pub async fn project_with(
        &self,
        source: Source<'_>,
        options: ProjectOptions,
    ) -> Result<Projection<R>, ProjectorError> {
        let mode = options.output.unwrap_or(self.config.output);

        match source {
            Source::Entity(entity) => {
                self.check_entity(entity)?;
                Ok(Projection::One(self.project_entity(entity, mode)?))
            }
            Source::Entities(entities) => {
                for &entity in &entities {
                    self.check_entity(entity)?;
                }
                let projected = entities
                    .iter()
                    .map(|&entity| self.project_entity(entity, mode))
                    .collect::<Result<Vec<_>, _>>()?;
                debug!("projected {} entities", projected.len());
                Ok(Projection::Many(projected))
            }
            Source::Query(query) => {
                self.check_query(query.as_ref())?;
                let projected = self.fetch_and_project(query, options.skip_includes, mode).await?;
                Ok(Projection::Many(projected))
            }
        }
    }

    /// Project one page of a query: rows `[offset, offset + page_size)`.
    ///
    /// # Errors
    /// - [`ProjectorError::TypeMismatch`] unless `source` is a query for this
    ///   projector's entity type.
    /// - Everything [`Projector::project_with`] can return.
    #[instrument(skip(self, source), fields(entity = %self.config.entity))]
    pub async fn project_page(
        &self,
        source: Source<'_>,
        page: PageRequest,
    ) -> Result<Vec<Projected<R>>, ProjectorError> {
        let mut query = match source {
            Source::Query(query) => query,
            other => {
                return Err(ProjectorError::TypeMismatch {
                    expected: format!("a query for {} entities", self.config.entity),
                    found: other.describe(),
                })
            }
        };
        self.check_query(query.as_ref())?;

        let page_size = page.page_size.unwrap_or(self.config.page_size);
        query.offset(page.offset);
        query.limit(page_size);
        debug!(offset = page.offset, page_size, "projecting page");

        let mode = page.options.output.unwrap_or(self.config.output);
        self.fetch_and_project(query, page.options.skip_includes, mode)
            .await
    }

    // -----------------------------------------------------------------------
    // Internal: type checks.
    // -----------------------------------------------------------------------

    fn check_entity(&self, entity: &dyn Entity) -> Result<(), ProjectorError> {
        if entity.entity_type() == self.config.entity {
            return Ok(());
        }
        Err(ProjectorError::TypeMismatch {
            expected: self.expected_source(),
            found: format!("a(n) {} entity {entity:?}", entity.entity_type()),
        })
    }

    fn check_query(&self, query: &(dyn Query + '_)) -> Result<(), ProjectorError> {
        if query.entity_type() == self.config.entity {
            return Ok(());
        }
        Err(ProjectorError::TypeMismatch {
            expected: self.expected_source(),
            found: format!("a query for {} ({query:?})", query.entity_type()),
        })
    }

    fn expected_source(&self) -> String {
        let entity = &self.config.entity;
        format!("a(n) {entity} entity, a sequence of {entity} entities, or a query for {entity} entities")
    }

    // -----------------------------------------------------------------------
    // Internal: projection.
    // -----------------------------------------------------------------------

    async fn fetch_and_project(
        &self,
        mut query: Box<dyn Query + '_>,
        skip_includes: bool,
        mode: OutputMode,
    ) -> Result<Vec<Projected<R>>, ProjectorError> {
        if !skip_includes && !self.includes.is_empty() {
            debug!("attaching {} includes", self.includes.len());
            query.includes(&self.includes);
        }

        let rows = query.fetch().await?;
        debug!("fetched {} rows", rows.len());

        rows.iter()
            .map(|row| self.project_entity(row.as_ref(), mode))
            .collect()
    }

    fn project_entity(
        &self,
        entity: &dyn Entity,
        mode: OutputMode,
    ) -> Result<Projected<R>, ProjectorError> {
        let mut values = Map::new();
        let mut snapshot: Option<Map<String, Value>> = None;

        for field in self.schema.fields() {
            let value = match self.resolvers.get(&field.name) {
                Some(resolve) => resolve(entity).map_err(|source| {
                    warn!("resolver for '{}' failed: {:#}", field.name, source);
                    ProjectorError::Resolver {
                        field: field.name.clone(),
                        source,
                    }
                })?,
                None => match snapshot
                    .get_or_insert_with(|| entity.fields())
                    .remove(&field.name)
                {
                    Some(value) => value,
                    None if matches!(field.ty, FieldType::Optional(_)) => Value::Null,
                    None => {
                        return Err(ProjectorError::MissingField {
                            entity: entity.entity_type().to_owned(),
                            field: field.name.clone(),
                        })
                    }
                },
            };
            values.insert(field.name.clone(), value);
        }

        let record = Record::new(&self.schema, values)?;

        match mode {
            OutputMode::Mapping => Ok(Projected::Mapping(record.into_map())),
            OutputMode::Record => {
                let typed = serde_json::from_value(Value::Object(record.into_map()))?;
                Ok(Projected::Record(typed))
            }
        }
    }
}

impl<R> fmt::Debug for Projector<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut resolvers: Vec<&str> = self.resolvers.keys().map(String::as_str).collect();
        resolvers.sort_unstable();

        f.debug_struct("Projector")
            .field("entity", &self.config.entity)
            .field("schema", &self.schema)
            .field("includes", &self.includes)
            .field("resolvers", &resolvers)
            .field("page_size", &self.config.page_size)
            .field("output", &self.config.output)
            .finish()
    }
}
