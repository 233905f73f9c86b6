//! Typed records and projection output.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::FieldSchema;
use crate::ProjectorError;

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// An immutable record whose values have been checked against a schema.
///
/// Compares by value and serializes as a flat object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: Map<String, Value>,
}

impl Record {
    /// Build a record, checking every value against its declared type.
    ///
    /// # Errors
    /// [`ProjectorError::FieldValidation`] if a declared field is missing or
    /// has a value of the wrong type, or if `values` has an undeclared key.
    pub fn new(schema: &FieldSchema, values: Map<String, Value>) -> Result<Self, ProjectorError> {
        for field in schema.fields() {
            let value = values.get(&field.name).unwrap_or(&Value::Null);
            if !field.ty.accepts(value) {
                return Err(ProjectorError::FieldValidation {
                    field: field.name.clone(),
                    expected: field.ty.to_string(),
                    value: value.clone(),
                });
            }
        }

        if let Some((name, value)) = values.iter().find(|(name, _)| !schema.contains(name)) {
            return Err(ProjectorError::FieldValidation {
                field: name.clone(),
                expected: "no such field".into(),
                value: value.clone(),
            });
        }

        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Flatten into a plain mapping.
    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }
}

// ---------------------------------------------------------------------------
// Projection output
// ---------------------------------------------------------------------------

/// One projected source record.
#[derive(Debug, Clone, PartialEq)]
pub enum Projected<R = Record> {
    Mapping(Map<String, Value>),
    Record(R),
}

impl<R> Projected<R> {
    pub fn as_mapping(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Mapping(map) => Some(map),
            Self::Record(_) => None,
        }
    }

    pub fn into_mapping(self) -> Option<Map<String, Value>> {
        match self {
            Self::Mapping(map) => Some(map),
            Self::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&R> {
        match self {
            Self::Record(record) => Some(record),
            Self::Mapping(_) => None,
        }
    }

    pub fn into_record(self) -> Option<R> {
        match self {
            Self::Record(record) => Some(record),
            Self::Mapping(_) => None,
        }
    }
}

/// The result of projecting a [`Source`](crate::Source): one output for a
/// single entity, a sequence otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection<R = Record> {
    One(Projected<R>),
    Many(Vec<Projected<R>>),
}

impl<R> Projection<R> {
    pub fn into_one(self) -> Option<Projected<R>> {
        match self {
            Self::One(projected) => Some(projected),
            Self::Many(_) => None,
        }
    }

    /// Every output; a single output becomes a one-element sequence.
    pub fn into_many(self) -> Vec<Projected<R>> {
        match self {
            Self::One(projected) => vec![projected],
            Self::Many(projected) => projected,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(projected) => projected.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
