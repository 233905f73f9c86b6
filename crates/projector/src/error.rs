//! Projector-level error types.

use serde_json::Value;
use thiserror::Error;

/// Errors produced while building a projector or projecting records.
#[derive(Debug, Error)]
pub enum ProjectorError {
    // ------ Configuration errors ------

    /// The field schema is empty or not well formed.
    #[error("invalid field schema: {0}")]
    InvalidSchema(String),

    /// A declared field type is not on the allow-list.
    #[error("the '{field}' field has a type that cannot be projected: {ty}")]
    DisallowedType {
        field: String,
        ty: String,
    },

    /// The entity type is not known to the storage layer.
    #[error("unknown entity type: '{0}'")]
    UnknownEntity(String),

    /// The eager-load spec is not a list of relation names, mappings, or lists.
    #[error("invalid includes at {path}: {reason}")]
    InvalidIncludes {
        path: String,
        reason: String,
    },

    #[error("default page size must be greater than zero")]
    InvalidPageSize,

    /// A resolver was registered for a field the schema does not declare.
    #[error("resolver registered for undeclared field '{0}'")]
    UnknownResolverField(String),

    // ------ Input errors ------

    /// The source is not an entity, sequence, or query of the expected type.
    #[error("expected {expected}; got {found}")]
    TypeMismatch {
        expected: String,
        found: String,
    },

    // ------ Per-record errors ------

    /// A resolved value does not satisfy the declared field type.
    #[error("field '{field}' expected {expected}, got {value}")]
    FieldValidation {
        field: String,
        expected: String,
        value: Value,
    },

    /// The typed record type rejected the validated values.
    #[error("cannot build typed record: {0}")]
    Decode(#[from] serde_json::Error),

    /// Neither a resolver nor the entity provides the field.
    #[error("'{entity}' has no field '{field}'")]
    MissingField {
        entity: String,
        field: String,
    },

    /// A custom field computation failed.
    #[error("resolver for field '{field}' failed: {source}")]
    Resolver {
        field: String,
        #[source]
        source: anyhow::Error,
    },

    /// Storage error from the store crate.
    #[error("store error: {0}")]
    Store(#[from] store::StoreError),
}

impl ProjectorError {
    /// Whether this error was raised while validating a configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::InvalidSchema(_)
                | Self::DisallowedType { .. }
                | Self::UnknownEntity(_)
                | Self::InvalidIncludes { .. }
                | Self::InvalidPageSize
                | Self::UnknownResolverField(_)
        )
    }
}
