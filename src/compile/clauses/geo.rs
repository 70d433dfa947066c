//! Geo clauses: distance and bounding-box

use crate::condition::{GeoOptions, Operator};
use crate::error::{CuttleError, Result};
use serde_json::{json, Map, Value};

/// Match documents within a distance of an anchor point
///
/// The operand is the anchor point in any representation the engine
/// accepts (`[lon, lat]`, `{"lat": .., "lon": ..}`, geohash string).
pub fn geo_distance_clause(field: &str, point: &Value, opts: &GeoOptions) -> Result<Value> {
    let distance = opts.distance.as_deref().ok_or_else(|| {
        CuttleError::parameter(format!(
            "operator '{}' requires a distance option (e.g. \"10km\")",
            Operator::GeoDistance.name()
        ))
    })?;

    let mut spec = Map::new();
    spec.insert("distance".to_string(), json!(distance));
    if let Some(ref distance_type) = opts.distance_type {
        spec.insert("distance_type".to_string(), json!(distance_type));
    }
    spec.insert(field.to_string(), point.clone());
    if let Some(method) = opts.validation_method {
        spec.insert("validation_method".to_string(), json!(method.as_str()));
    }
    Ok(json!({ "geo_distance": spec }))
}

/// Match documents inside a rectangle
///
/// The operand carries the corner points (`top_left`/`bottom_right` or the
/// engine's other accepted corner spellings), passed through verbatim.
pub fn geo_bounding_box_clause(field: &str, corners: &Value, opts: &GeoOptions) -> Result<Value> {
    if !corners.is_object() {
        return Err(CuttleError::parameter(format!(
            "operator '{}' requires an object operand with corner points",
            Operator::GeoBoundingBox.name()
        )));
    }

    let mut spec = Map::new();
    spec.insert(field.to_string(), corners.clone());
    if let Some(method) = opts.validation_method {
        spec.insert("validation_method".to_string(), json!(method.as_str()));
    }
    Ok(json!({ "geo_bounding_box": spec }))
}
