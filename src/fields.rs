//! Field-mapping introspection
//!
//! Exact-match operators (`exact`, `in`, `not in`) and aggregations need an
//! untokenized representation of the target field. Full-text fields carry
//! one as a keyword sub-field (`name.keyword`); keyword, numeric, boolean
//! and date fields are exact-capable natively. This module is the boundary
//! where that knowledge enters the compiler: a [`FieldCaps`] implementation
//! answers the question per field, and the compiler fails loudly when the
//! answer is "no capability" instead of silently matching on analyzed text.

use crate::error::{CuttleError, Result};
use serde_json::Value;
use std::collections::HashMap;

/// Exact-match capability of a field
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExactCapability {
    /// The field itself is untokenized (keyword, numeric, boolean, date)
    Native,
    /// Exact matching must target this sub-field instead
    Variant(String),
    /// Analyzed text with no untokenized counterpart declared
    Missing,
}

/// Answers whether a field supports exact matching, and through which name
pub trait FieldCaps {
    fn exact_capability(&self, field: &str) -> ExactCapability;

    /// Resolve the name exact-match operators must target
    ///
    /// Fails with a parameter error naming the field when no untokenized
    /// variant exists; there is deliberately no fallback to the raw field.
    fn resolve_exact(&self, field: &str) -> Result<String> {
        match self.exact_capability(field) {
            ExactCapability::Native => Ok(field.to_string()),
            ExactCapability::Variant(variant) => Ok(variant),
            ExactCapability::Missing => Err(CuttleError::parameter(format!(
                "field '{field}' has no untokenized variant; declare a keyword sub-field \
                 to use exact-match operators on it"
            ))),
        }
    }
}

/// Field capabilities declared explicitly or parsed from an index mapping
///
/// Undeclared fields report [`ExactCapability::Missing`]: exact-match
/// operators require an explicit declaration rather than guessing.
#[derive(Clone, Debug, Default)]
pub struct StaticFieldCaps {
    caps: HashMap<String, ExactCapability>,
}

impl StaticFieldCaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a natively exact-capable field
    pub fn with_native(mut self, field: impl Into<String>) -> Self {
        self.caps.insert(field.into(), ExactCapability::Native);
        self
    }

    /// Declare a full-text field with a keyword sub-field
    pub fn with_variant(mut self, field: impl Into<String>, variant: impl Into<String>) -> Self {
        self.caps
            .insert(field.into(), ExactCapability::Variant(variant.into()));
        self
    }

    /// Declare an analyzed field with no untokenized counterpart
    pub fn with_missing(mut self, field: impl Into<String>) -> Self {
        self.caps.insert(field.into(), ExactCapability::Missing);
        self
    }

    /// Build capabilities from the engine's mapping JSON
    ///
    /// Accepts the full mapping response (`{"index": {"mappings": {...}}}`),
    /// a bare `{"mappings": {...}}` object, or the `{"properties": {...}}`
    /// level directly. Text fields gain a `Variant` capability when any
    /// keyword sub-field is declared under `fields`.
    pub fn from_mapping(mapping: &Value) -> Result<Self> {
        let properties = find_properties(mapping).ok_or_else(|| {
            CuttleError::parameter("mapping JSON has no 'properties' object".to_string())
        })?;

        let mut caps = Self::new();
        collect_properties(properties, "", &mut caps.caps)?;
        Ok(caps)
    }
}

impl FieldCaps for StaticFieldCaps {
    fn exact_capability(&self, field: &str) -> ExactCapability {
        self.caps
            .get(field)
            .cloned()
            .unwrap_or(ExactCapability::Missing)
    }
}

/// Treats every field as natively exact-capable
///
/// For fully keyword/numeric schemas, or callers who resolve variant names
/// themselves before building conditions.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeFieldCaps;

impl FieldCaps for NativeFieldCaps {
    fn exact_capability(&self, _field: &str) -> ExactCapability {
        ExactCapability::Native
    }
}

fn find_properties(mapping: &Value) -> Option<&Value> {
    if let Some(properties) = mapping.get("properties") {
        return Some(properties);
    }
    if let Some(mappings) = mapping.get("mappings") {
        return mappings.get("properties");
    }
    // Index-keyed envelope: {"my_index": {"mappings": {"properties": ...}}}
    mapping
        .as_object()?
        .values()
        .find_map(|v| v.get("mappings").and_then(|m| m.get("properties")))
}

fn collect_properties(
    properties: &Value,
    prefix: &str,
    caps: &mut HashMap<String, ExactCapability>,
) -> Result<()> {
    let map = properties.as_object().ok_or_else(|| {
        CuttleError::parameter("mapping 'properties' must be an object".to_string())
    })?;

    for (name, spec) in map {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };

        let field_type = spec.get("type").and_then(|t| t.as_str());
        match field_type {
            Some("text") => {
                let variant = keyword_subfield(spec, &path);
                caps.insert(
                    path,
                    variant.map_or(ExactCapability::Missing, ExactCapability::Variant),
                );
            }
            Some("nested") | Some("object") | None => {
                if let Some(inner) = spec.get("properties") {
                    collect_properties(inner, &path, caps)?;
                }
            }
            Some(_) => {
                // keyword, numeric, boolean, date, ip, geo_point
                caps.insert(path, ExactCapability::Native);
            }
        }
    }
    Ok(())
}

fn keyword_subfield(spec: &Value, path: &str) -> Option<String> {
    let fields = spec.get("fields")?.as_object()?;
    fields
        .iter()
        .find(|(_, sub)| sub.get("type").and_then(|t| t.as_str()) == Some("keyword"))
        .map(|(sub_name, _)| format!("{path}.{sub_name}"))
}
