use std::fmt;
use std::fs;
use std::path::Path;

use serde_yaml_ng::{Mapping, Value};

use crate::error::SpecError;

/// Dialect marker key of legacy (Swagger 2.0) documents.
pub const LEGACY_MARKER: &str = "swagger";

/// Dialect marker key of new (OpenAPI 3.x) documents.
pub const NEW_MARKER: &str = "openapi";

/// Keys of a path item that hold operations.
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Whether a path item key names an operation. Case-insensitive.
pub fn is_http_method(key: &str) -> bool {
    HTTP_METHODS.iter().any(|m| m.eq_ignore_ascii_case(key))
}

/// Which API-description dialect a document declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialect {
    Legacy(String),
    New(String),
    Unknown,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Legacy(v) => write!(f, "swagger {v}"),
            Dialect::New(v) => write!(f, "openapi {v}"),
            Dialect::Unknown => f.write_str("no dialect marker"),
        }
    }
}

/// An entire API description as an insertion-ordered mapping.
///
/// The document stays untyped on purpose: legacy descriptions in the wild
/// carry vendor extensions and authoring mistakes that a strict model would
/// reject, and every key has to survive the round trip in its original order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecDocument {
    root: Mapping,
}

impl SpecDocument {
    pub fn new(root: Mapping) -> Self {
        Self { root }
    }

    /// Wrap a parsed value, rejecting anything that is not a mapping.
    pub fn from_value(value: Value) -> Result<Self, SpecError> {
        match value {
            Value::Mapping(root) => Ok(Self { root }),
            Value::Null => Err(SpecError::SpecRead("document is empty".to_string())),
            other => Err(SpecError::SpecRead(format!(
                "expected a mapping at the document root, found {}",
                value_kind(&other)
            ))),
        }
    }

    /// Parse a document from YAML (JSON is accepted as well).
    pub fn from_yaml_str(input: &str) -> Result<Self, SpecError> {
        let value: Value =
            serde_yaml_ng::from_str(input).map_err(|e| SpecError::SpecRead(e.to_string()))?;
        Self::from_value(value)
    }

    /// Parse a document from JSON.
    pub fn from_json_str(input: &str) -> Result<Self, SpecError> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| SpecError::SpecRead(e.to_string()))?;
        Self::from_value(value)
    }

    /// Read and parse a document from disk, choosing the parser by extension.
    pub fn from_path(path: &Path) -> Result<Self, SpecError> {
        let content = fs::read_to_string(path)
            .map_err(|e| SpecError::SpecRead(format!("{}: {}", path.display(), e)))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("yaml");
        let parsed = match ext {
            "json" => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        };
        parsed.map_err(|e| match e {
            SpecError::SpecRead(msg) => SpecError::SpecRead(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn to_yaml_string(&self) -> Result<String, SpecError> {
        Ok(serde_yaml_ng::to_string(&self.root)?)
    }

    /// Serialize to `path` as YAML, creating parent directories as needed.
    pub fn write_to(&self, path: &Path) -> Result<(), SpecError> {
        let content = self.to_yaml_string()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SpecError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| SpecError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn dialect(&self) -> Dialect {
        if let Some(v) = self.root.get(LEGACY_MARKER) {
            return Dialect::Legacy(scalar_to_string(v));
        }
        if let Some(v) = self.root.get(NEW_MARKER) {
            return Dialect::New(scalar_to_string(v));
        }
        Dialect::Unknown
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }

    pub fn into_root(self) -> Mapping {
        self.root
    }

    /// Iterate `(path, method, operation)` triples in document order.
    /// Entries that are not mappings are skipped.
    pub fn operations(&self) -> impl Iterator<Item = (&str, &str, &Mapping)> {
        self.root
            .get("paths")
            .and_then(Value::as_mapping)
            .into_iter()
            .flat_map(|paths| paths.iter())
            .filter_map(|(path, item)| Some((path.as_str()?, item.as_mapping()?)))
            .flat_map(|(path, item)| {
                item.iter().filter_map(move |(method, op)| {
                    let method = method.as_str()?;
                    if !is_http_method(method) {
                        return None;
                    }
                    Some((path, method, op.as_mapping()?))
                })
            })
    }
}

/// Render a scalar marker (`2.0`, `"3.0.3"`) as a string.
pub(crate) fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => value_kind(other).to_string(),
    }
}

/// Short human name of a value's shape, for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Collect a list of strings, ignoring non-string entries.
pub fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    let seq = value?.as_sequence()?;
    Some(
        seq.iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
    )
}
