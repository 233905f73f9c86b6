//! Field schemas and the type allow-list.
//!
//! Rules enforced when a schema is built:
//! 1. The schema declares at least one field.
//! 2. Field names are unique identifiers.
//! 3. Every declared type parses and is allowed: an allow-listed scalar (or a
//!    subtype of one), an array of such a scalar, or an optional of an
//!    allowed type.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use crate::ProjectorError;

// ---------------------------------------------------------------------------
// FieldType
// ---------------------------------------------------------------------------

/// A declared field type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    Float,
    String,
    Boolean,
    /// `YYYY-MM-DD`
    Date,
    /// RFC 3339 timestamp.
    DateTime,
    /// Any JSON value.
    Json,
    /// Any JSON object.
    Object,
    Array(Box<FieldType>),
    Optional(Box<FieldType>),
}

/// Primitive types a field may be declared as.
pub const ALLOWED_TYPES: [FieldType; 6] = [
    FieldType::Integer,
    FieldType::Float,
    FieldType::String,
    FieldType::Boolean,
    FieldType::Date,
    FieldType::DateTime,
];

impl FieldType {
    /// Whether a value of `self` is always a valid `other`.
    pub fn is_subtype_of(&self, other: &FieldType) -> bool {
        match (self, other) {
            (a, b) if a == b => true,
            (Self::Integer, Self::Float) => true,
            (Self::Array(a), Self::Array(b)) => a.is_subtype_of(b),
            (Self::Optional(a), Self::Optional(b)) => a.is_subtype_of(b),
            (a, Self::Optional(b)) => a.is_subtype_of(b),
            _ => false,
        }
    }

    /// Whether the type may be declared on an output field.
    pub fn is_allowed(&self) -> bool {
        match self {
            Self::Array(inner) => inner.is_allowed_scalar(),
            Self::Optional(inner) => !matches!(**inner, Self::Optional(_)) && inner.is_allowed(),
            scalar => scalar.is_allowed_scalar(),
        }
    }

    fn is_allowed_scalar(&self) -> bool {
        ALLOWED_TYPES.iter().any(|allowed| self.is_subtype_of(allowed))
    }

    /// Whether `value` satisfies this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
            Self::Date => value
                .as_str()
                .is_some_and(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()),
            Self::DateTime => value
                .as_str()
                .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok()),
            Self::Json => true,
            Self::Object => value.is_object(),
            Self::Array(inner) => value
                .as_array()
                .is_some_and(|items| items.iter().all(|item| inner.accepts(item))),
            Self::Optional(inner) => value.is_null() || inner.accepts(value),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "string"),
            Self::Boolean => write!(f, "boolean"),
            Self::Date => write!(f, "date"),
            Self::DateTime => write!(f, "datetime"),
            Self::Json => write!(f, "json"),
            Self::Object => write!(f, "object"),
            Self::Array(inner) => write!(f, "array<{inner}>"),
            Self::Optional(inner) => write!(f, "optional<{inner}>"),
        }
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(inner) = generic_argument(s, "array") {
            return Ok(Self::Array(Box::new(inner.parse()?)));
        }
        if let Some(inner) = generic_argument(s, "optional") {
            return Ok(Self::Optional(Box::new(inner.parse()?)));
        }

        match s {
            "integer" | "int" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "string" => Ok(Self::String),
            "boolean" | "bool" => Ok(Self::Boolean),
            "date" => Ok(Self::Date),
            "datetime" => Ok(Self::DateTime),
            "json" => Ok(Self::Json),
            "object" => Ok(Self::Object),
            other => Err(format!("unknown field type: '{other}'")),
        }
    }
}

/// `array<T>` → `Some("T")` for `name = "array"`.
fn generic_argument<'a>(s: &'a str, name: &str) -> Option<&'a str> {
    s.strip_prefix(name)?
        .trim_start()
        .strip_prefix('<')?
        .strip_suffix('>')
}

// ---------------------------------------------------------------------------
// FieldSchema
// ---------------------------------------------------------------------------

/// A declared output field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
}

/// Ordered, validated list of output fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<Field>,
}

impl FieldSchema {
    /// Parse and validate `(name, type expression)` declarations.
    ///
    /// # Errors
    /// - [`ProjectorError::InvalidSchema`] for an empty schema, a bad or
    ///   duplicate field name, or an unparsable type.
    /// - [`ProjectorError::DisallowedType`] for a type outside the allow-list.
    pub fn parse<'a, I>(declarations: I) -> Result<Self, ProjectorError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut fields = Vec::new();

        for (name, ty) in declarations {
            if !is_identifier(name) {
                return Err(ProjectorError::InvalidSchema(format!(
                    "'{name}' is not a valid field name"
                )));
            }
            if !seen.insert(name) {
                return Err(ProjectorError::InvalidSchema(format!(
                    "duplicate field '{name}'"
                )));
            }

            let ty: FieldType = ty
                .parse()
                .map_err(|e| ProjectorError::InvalidSchema(format!("field '{name}': {e}")))?;

            if !ty.is_allowed() {
                return Err(ProjectorError::DisallowedType {
                    field: name.to_owned(),
                    ty: ty.to_string(),
                });
            }

            fields.push(Field { name: name.to_owned(), ty });
        }

        if fields.is_empty() {
            return Err(ProjectorError::InvalidSchema("no fields declared".into()));
        }

        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
