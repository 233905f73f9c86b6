//! Projector configuration and per-call options.
//!
//! A [`ProjectorConfig`] is plain data: it can be built in code or
//! deserialized from JSON, and is only validated by
//! [`Projector::new`](crate::Projector::new).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Page size used when neither the config nor the call sets one.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

// ---------------------------------------------------------------------------
// Output mode
// ---------------------------------------------------------------------------

/// What each projected record turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// A plain string-keyed mapping.
    #[default]
    Mapping,
    /// A typed, validated record.
    Record,
}

// ---------------------------------------------------------------------------
// ProjectorConfig
// ---------------------------------------------------------------------------

/// One declared output field: a name and a type expression such as
/// `integer` or `array<string>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Everything a projector is built from.
///
/// ```json
/// {
///   "entity": "authors",
///   "fields": [
///     { "name": "id", "type": "integer" },
///     { "name": "publishers", "type": "array<string>" }
///   ],
///   "includes": ["address", { "books": "publisher" }],
///   "page_size": 20,
///   "output": "mapping"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectorConfig {
    /// Entity type the projector reads.
    pub entity: String,
    /// Output fields, in order.
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    /// Eager-load spec; `null` disables eager loading.
    #[serde(default)]
    pub includes: Value,
    /// Default page size for [`Projector::project_page`](crate::Projector::project_page).
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default)]
    pub output: OutputMode,
}

impl ProjectorConfig {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            fields: Vec::new(),
            includes: Value::Null,
            page_size: DEFAULT_PAGE_SIZE,
            output: OutputMode::default(),
        }
    }

    /// Declare an output field.
    pub fn field(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            ty: ty.into(),
        });
        self
    }

    pub fn includes(mut self, includes: Value) -> Self {
        self.includes = includes;
        self
    }

    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }
}

// ---------------------------------------------------------------------------
// Per-call options
// ---------------------------------------------------------------------------

/// Options for a single [`Projector::project_with`](crate::Projector::project_with) call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectOptions {
    /// Do not attach the eager-load spec to query sources.
    pub skip_includes: bool,
    /// Override the configured output mode.
    pub output: Option<OutputMode>,
}

impl ProjectOptions {
    pub fn skip_includes(mut self) -> Self {
        self.skip_includes = true;
        self
    }

    pub fn output(mut self, output: OutputMode) -> Self {
        self.output = Some(output);
        self
    }
}

/// One page of a query for [`Projector::project_page`](crate::Projector::project_page).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u64,
    /// Falls back to the configured page size.
    pub page_size: Option<u64>,
    pub options: ProjectOptions,
}

impl PageRequest {
    /// The page starting at row `offset`.
    pub fn at(offset: u64) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn skip_includes(mut self) -> Self {
        self.options = self.options.skip_includes();
        self
    }

    pub fn output(mut self, output: OutputMode) -> Self {
        self.options = self.options.output(output);
        self
    }
}
