//! Sort compiler
//!
//! Compiles ordering specs into the engine's native sort-clause list:
//! plain field sorts, geo-distance sorts, nested-path-scoped sorts, and
//! the shard tiebreak appended automatically for snapshot pagination.

use crate::config::CompilerConfig;
use crate::error::{CuttleError, Result};
use serde_json::{json, Map, Value};

/// Sort direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// How multi-valued fields fold into one sort key per document
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortMode {
    Min,
    Max,
    Sum,
    Avg,
    Median,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Min => "min",
            SortMode::Max => "max",
            SortMode::Sum => "sum",
            SortMode::Avg => "avg",
            SortMode::Median => "median",
        }
    }
}

/// Where documents missing the sort field land
#[derive(Clone, Debug, PartialEq)]
pub enum MissingPolicy {
    First,
    Last,
    /// Substitute a concrete value for the missing field
    Custom(Value),
}

impl MissingPolicy {
    fn to_value(&self) -> Value {
        match self {
            MissingPolicy::First => json!("_first"),
            MissingPolicy::Last => json!("_last"),
            MissingPolicy::Custom(value) => value.clone(),
        }
    }
}

/// Anchor for a geo-distance sort
#[derive(Clone, Debug, PartialEq)]
pub struct GeoAnchor {
    /// Anchor point in any representation the engine accepts
    pub point: Value,
    pub unit: Option<String>,
    /// Distance calculation: `arc` (default) or `plane`
    pub distance_type: Option<String>,
}

impl GeoAnchor {
    pub fn new(point: Value) -> Self {
        Self {
            point,
            unit: None,
            distance_type: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_distance_type(mut self, distance_type: impl Into<String>) -> Self {
        self.distance_type = Some(distance_type.into());
        self
    }
}

/// One entry of the ordering specification
#[derive(Clone, Debug, PartialEq)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
    pub mode: Option<SortMode>,
    pub missing: Option<MissingPolicy>,
    /// Scope the sort to elements of a nested-object field
    pub nested_path: Option<String>,
    /// Present for geo-distance sorts; the field is the geo-point field
    pub geo: Option<GeoAnchor>,
}

impl SortSpec {
    pub fn field(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
            mode: None,
            missing: None,
            nested_path: None,
            geo: None,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::field(field, SortOrder::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::field(field, SortOrder::Desc)
    }

    /// Distance from an anchor point, closest first unless reversed
    pub fn geo_distance(field: impl Into<String>, anchor: GeoAnchor, order: SortOrder) -> Self {
        let mut spec = Self::field(field, order);
        spec.geo = Some(anchor);
        spec
    }

    pub fn with_mode(mut self, mode: SortMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_missing(mut self, missing: MissingPolicy) -> Self {
        self.missing = Some(missing);
        self
    }

    pub fn with_nested_path(mut self, path: impl Into<String>) -> Self {
        self.nested_path = Some(path.into());
        self
    }
}

/// Shard-level tiebreak field appended under snapshot pagination
pub const SHARD_TIEBREAK_FIELD: &str = "_shard_doc";

/// The engine's internal identity field
pub const ID_FIELD: &str = "_id";

/// Compiles sort specs into the native sort-clause list
pub struct SortCompiler<'a> {
    config: &'a CompilerConfig,
}

impl<'a> SortCompiler<'a> {
    pub fn new(config: &'a CompilerConfig) -> Self {
        Self { config }
    }

    /// Compile the sort list
    ///
    /// When `with_snapshot` is set, a `_shard_doc` tiebreak is appended so
    /// snapshot pages have a total order: no duplicates or skips even under
    /// concurrent writes to the live data.
    pub fn compile(&self, specs: &[SortSpec], with_snapshot: bool) -> Result<Vec<Value>> {
        let mut clauses = Vec::with_capacity(specs.len() + 1);
        for spec in specs {
            clauses.push(self.compile_spec(spec)?);
        }
        if with_snapshot
            && !specs
                .iter()
                .any(|spec| spec.field == SHARD_TIEBREAK_FIELD)
        {
            clauses.push(json!({ SHARD_TIEBREAK_FIELD: { "order": "asc" } }));
        }
        Ok(clauses)
    }

    fn compile_spec(&self, spec: &SortSpec) -> Result<Value> {
        if spec.field == ID_FIELD && !self.config.allow_id_sort {
            return Err(CuttleError::parameter(
                "sorting on '_id' is disallowed; enable allow_id_sort to override".to_string(),
            ));
        }

        if let Some(ref anchor) = spec.geo {
            return Ok(self.compile_geo(spec, anchor));
        }

        let mut body = Map::new();
        body.insert("order".to_string(), json!(spec.order.as_str()));
        if let Some(mode) = spec.mode {
            body.insert("mode".to_string(), json!(mode.as_str()));
        }
        if let Some(ref missing) = spec.missing {
            body.insert("missing".to_string(), missing.to_value());
        }
        if let Some(ref path) = spec.nested_path {
            body.insert("nested".to_string(), json!({ "path": path }));
        }
        Ok(json!({ (spec.field.clone()): body }))
    }

    fn compile_geo(&self, spec: &SortSpec, anchor: &GeoAnchor) -> Value {
        let mut body = Map::new();
        body.insert(spec.field.clone(), anchor.point.clone());
        body.insert("order".to_string(), json!(spec.order.as_str()));
        if let Some(ref unit) = anchor.unit {
            body.insert("unit".to_string(), json!(unit));
        }
        if let Some(ref distance_type) = anchor.distance_type {
            body.insert("distance_type".to_string(), json!(distance_type));
        }
        if let Some(mode) = spec.mode {
            body.insert("mode".to_string(), json!(mode.as_str()));
        }
        json!({ "_geo_distance": body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_field_sort() {
        let config = CompilerConfig::default();
        let clauses = SortCompiler::new(&config)
            .compile(&[SortSpec::desc("price")], false)
            .unwrap();
        assert_eq!(clauses, vec![json!({ "price": { "order": "desc" } })]);
    }

    #[test]
    fn test_missing_and_mode() {
        let config = CompilerConfig::default();
        let spec = SortSpec::asc("ratings")
            .with_mode(SortMode::Avg)
            .with_missing(MissingPolicy::Last);
        let clauses = SortCompiler::new(&config).compile(&[spec], false).unwrap();
        assert_eq!(
            clauses[0],
            json!({ "ratings": { "order": "asc", "mode": "avg", "missing": "_last" } })
        );
    }

    #[test]
    fn test_nested_sort_is_path_scoped() {
        let config = CompilerConfig::default();
        let spec = SortSpec::asc("variants.price")
            .with_mode(SortMode::Min)
            .with_nested_path("variants");
        let clauses = SortCompiler::new(&config).compile(&[spec], false).unwrap();
        assert_eq!(
            clauses[0],
            json!({ "variants.price": {
                "order": "asc",
                "mode": "min",
                "nested": { "path": "variants" }
            } })
        );
    }

    #[test]
    fn test_geo_distance_sort() {
        let config = CompilerConfig::default();
        let anchor = GeoAnchor::new(json!({ "lat": 40.0, "lon": -70.0 }))
            .with_unit("km")
            .with_distance_type("plane");
        let spec = SortSpec::geo_distance("location", anchor, SortOrder::Asc)
            .with_mode(SortMode::Min);
        let clauses = SortCompiler::new(&config).compile(&[spec], false).unwrap();
        assert_eq!(
            clauses[0],
            json!({ "_geo_distance": {
                "location": { "lat": 40.0, "lon": -70.0 },
                "order": "asc",
                "unit": "km",
                "distance_type": "plane",
                "mode": "min"
            } })
        );
    }

    #[test]
    fn test_id_sort_rejected_by_default() {
        let config = CompilerConfig::default();
        let err = SortCompiler::new(&config)
            .compile(&[SortSpec::asc("_id")], false)
            .unwrap_err();
        assert!(err.is_parameter());
    }

    #[test]
    fn test_id_sort_allowed_when_configured() {
        let config = CompilerConfig::default().with_id_sort_allowed();
        let clauses = SortCompiler::new(&config)
            .compile(&[SortSpec::asc("_id")], false)
            .unwrap();
        assert_eq!(clauses.len(), 1);
    }

    #[test]
    fn test_snapshot_appends_shard_tiebreak() {
        let config = CompilerConfig::default();
        let clauses = SortCompiler::new(&config)
            .compile(&[SortSpec::desc("price")], true)
            .unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[1], json!({ "_shard_doc": { "order": "asc" } }));
    }

    #[test]
    fn test_tiebreak_not_duplicated() {
        let config = CompilerConfig::default();
        let clauses = SortCompiler::new(&config)
            .compile(&[SortSpec::asc(SHARD_TIEBREAK_FIELD)], true)
            .unwrap();
        assert_eq!(clauses.len(), 1);
    }
}
