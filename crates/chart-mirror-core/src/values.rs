//! Chart values with dotted-path access

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};

/// Values tree of a chart (the parsed `values.yaml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Parse values from YAML string
    ///
    /// An empty document (or one holding only comments) yields empty values.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let blank = yaml
            .lines()
            .map(str::trim)
            .all(|line| line.is_empty() || line.starts_with('#') || line == "---");
        if blank {
            return Ok(Self::new());
        }

        let value: JsonValue = serde_yaml::from_str(yaml)?;
        match value {
            JsonValue::Null => Ok(Self::new()),
            JsonValue::Object(_) => Ok(Self(value)),
            other => Err(CoreError::InvalidChart {
                message: format!("values must be a mapping, found {}", type_name(&other)),
            }),
        }
    }

    /// Serialize values to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Set a value by dotted path (e.g., "image.tag")
    ///
    /// Missing or `null` intermediate nodes become mappings. An intermediate
    /// scalar or sequence is an error and leaves the tree untouched.
    pub fn set(&mut self, path: &str, value: JsonValue) -> Result<()> {
        let parts: Vec<&str> = path.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CoreError::ValuesPath {
                path: path.to_string(),
                segment: path.to_string(),
            });
        }
        set_nested(&mut self.0, &parts, 0, value)
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let parts: Vec<&str> = path.split('.').collect();
        get_nested(&self.0, &parts)
    }

    /// Get the inner JSON value
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }
}

fn set_nested(
    value: &mut JsonValue,
    parts: &[&str],
    depth: usize,
    new_value: JsonValue,
) -> Result<()> {
    if value.is_null() {
        *value = JsonValue::Object(serde_json::Map::new());
    }

    let JsonValue::Object(map) = value else {
        let segment = if depth == 0 {
            "<root>".to_string()
        } else {
            parts[..depth].join(".")
        };
        return Err(CoreError::ValuesPath {
            path: parts.join("."),
            segment,
        });
    };

    let key = parts[depth];
    if depth + 1 == parts.len() {
        map.insert(key.to_string(), new_value);
        return Ok(());
    }

    let entry = map.entry(key.to_string()).or_insert(JsonValue::Null);
    set_nested(entry, parts, depth + 1, new_value)
}

fn get_nested<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let Some((key, remaining)) = path.split_first() else {
        return Some(value);
    };

    match value {
        JsonValue::Object(map) => map.get(*key).and_then(|v| get_nested(v, remaining)),
        _ => None,
    }
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a sequence",
        JsonValue::Object(_) => "a mapping",
    }
}
