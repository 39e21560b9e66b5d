//! Values loading.
//!
//! Values are layered: built-in defaults, then each values file in order, then
//! `--set` overrides. Mappings merge recursively and any other value replaces
//! what was there. An explicit `null` removes a key an earlier layer set; a
//! `null` for a key no layer set is kept, so the field sees it.

use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::config::Configuration;
use crate::error::{Error, Result};

/// Accumulates values layers and produces a [`Configuration`].
#[derive(Debug, Clone)]
pub struct ValuesLoader {
    merged: Value,
}

impl ValuesLoader {
    /// Start from the built-in defaults.
    pub fn new() -> Result<Self> {
        let defaults = serde_yaml::to_value(Configuration::default()).map_err(Error::Yaml)?;
        Ok(Self { merged: defaults })
    }

    /// Merge a values file on top of the current layers.
    pub fn with_file(self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), bytes = content.len(), "Loaded values file");
        self.with_yaml(&content)
    }

    /// Merge a YAML document on top of the current layers.
    pub fn with_yaml(mut self, content: &str) -> Result<Self> {
        let overlay: Value = serde_yaml::from_str(content).map_err(Error::Parse)?;
        match overlay {
            // An empty document contributes nothing
            Value::Null => {}
            Value::Mapping(_) => merge_values(&mut self.merged, overlay),
            _ => {
                return Err(Error::validation(
                    "values",
                    "values document must be a mapping",
                ));
            }
        }
        Ok(self)
    }

    /// Apply a `path.to.key=value` override.
    pub fn with_override(mut self, expr: &str) -> Result<Self> {
        apply_override(&mut self.merged, expr)?;
        Ok(self)
    }

    /// Deserialize the merged layers.
    pub fn build(self) -> Result<Configuration> {
        serde_yaml::from_value(self.merged).map_err(Error::Parse)
    }
}

/// Load a configuration from values files and overrides.
pub fn load_values<P: AsRef<Path>>(files: &[P], overrides: &[String]) -> Result<Configuration> {
    let mut loader = ValuesLoader::new()?;
    for file in files {
        loader = loader.with_file(file.as_ref())?;
    }
    for expr in overrides {
        loader = loader.with_override(expr)?;
    }
    loader.build()
}

/// Merge `overlay` into `base`.
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) if !value.is_null() => merge_values(existing, value),
                    _ => set_or_clear(base_map, key, value),
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Apply a single `--set` expression to `root`.
pub fn apply_override(root: &mut Value, expr: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidOverride {
        expr: expr.to_string(),
        reason: reason.to_string(),
    };

    let (path, raw) = expr
        .split_once('=')
        .ok_or_else(|| invalid("expected path=value"))?;
    let segments = split_path(path);
    if segments.iter().any(String::is_empty) {
        return Err(invalid("empty path segment"));
    }
    let Some((leaf, parents)) = segments.split_last() else {
        return Err(invalid("empty path"));
    };

    let mut current = root;
    for segment in parents {
        let map = current
            .as_mapping_mut()
            .ok_or_else(|| invalid("path crosses a non-mapping value"))?;
        current = map
            .entry(Value::String(segment.clone()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }

    let map = current
        .as_mapping_mut()
        .ok_or_else(|| invalid("path crosses a non-mapping value"))?;
    set_or_clear(map, Value::String(leaf.clone()), parse_scalar(raw));
    Ok(())
}

/// Insert `value`, or drop the existing entry when `value` is null.
fn set_or_clear(map: &mut Mapping, key: Value, value: Value) {
    if value.is_null() && map.contains_key(&key) {
        map.remove(&key);
    } else {
        map.insert(key, value);
    }
}

/// Split a dotted path, honouring `\.` as a literal dot.
fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'.') => {
                current.push('.');
                chars.next();
            }
            '.' => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// Interpret an override value as a YAML scalar, falling back to a string.
///
/// Numbers that would not print back as typed (`2024.10`, `1e3`) stay strings.
fn parse_scalar(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::String(String::new());
    }
    match serde_yaml::from_str::<Value>(raw) {
        Ok(Value::Number(n)) if n.to_string() == raw => Value::Number(n),
        Ok(value @ (Value::Bool(_) | Value::Null)) => value,
        _ => Value::String(raw.to_string()),
    }
}
