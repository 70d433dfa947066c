//! Aggregation unpacking
//!
//! Bucket unpacking is recursive and mirrors the exact nesting the planner
//! created: a bucket tree yields one flat row per leaf combination with
//! every ancestor key carried along, while range-style buckets flatten to
//! label-prefixed sibling columns of a single row.

use super::MetricValues;
use crate::aggs::{AggSpec, BucketKind, BucketSpec, MetricKind, MetricSpec};
use crate::error::{CuttleError, Result};
use serde_json::{Map, Value};

/// One flat aggregation row
///
/// Grouping keys and hoisted metric values live in `values`; the document
/// count and the raw bucket echo ride in their own struct fields so they
/// can never collide with a real field name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggRow {
    pub values: Map<String, Value>,
    pub doc_count: Option<u64>,
    pub raw: Option<Value>,
}

impl AggRow {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

/// Result of unpacking the aggregations section
#[derive(Debug, Default)]
pub struct AggOutput {
    pub rows: Vec<AggRow>,
    pub metrics: MetricValues,
    pub after_key: Option<Value>,
}

fn shape_error(reason: String) -> CuttleError {
    CuttleError::Query {
        reason,
        details: Value::Null,
    }
}

/// Unpack the aggregations section against the specs that requested it
pub fn unpack(specs: &[AggSpec], aggregations: Option<&Value>) -> Result<AggOutput> {
    if specs.is_empty() {
        return Ok(AggOutput::default());
    }
    let aggregations = aggregations.ok_or_else(|| {
        shape_error("aggregations were requested but are missing from the response".to_string())
    })?;

    let mut rows = Vec::new();
    let mut metrics = Map::new();
    let mut after_key = None;
    let mut bucket_specs = 0usize;

    for spec in specs {
        let agg = aggregations.get(spec.key()).ok_or_else(|| {
            shape_error(format!(
                "aggregation '{}' is missing from the response",
                spec.key()
            ))
        })?;

        match spec {
            AggSpec::Metric(metric) => {
                metrics.insert(metric.key.clone(), unwrap_metric(metric, agg)?);
            }
            AggSpec::Bucket(bucket) if bucket.flattens_to_columns() => {
                bucket_specs += 1;
                rows.push(range_row(bucket, agg)?);
            }
            AggSpec::Bucket(bucket) => {
                bucket_specs += 1;
                if matches!(bucket.kind, BucketKind::Composite { .. }) {
                    after_key = agg.get("after_key").cloned();
                }
                rows.extend(bucket_rows(bucket, agg)?);
            }
        }
    }

    let metrics = if bucket_specs == 0 && metrics.len() == 1 {
        // A lone bucketless metric unwraps directly
        metrics
            .into_iter()
            .next()
            .map(|(_, value)| MetricValues::Single(value))
            .unwrap_or_default()
    } else if metrics.is_empty() {
        MetricValues::None
    } else {
        MetricValues::Many(metrics)
    };

    Ok(AggOutput {
        rows,
        metrics,
        after_key,
    })
}

/// Recursively flatten a bucket tree into leaf rows
fn bucket_rows(spec: &BucketSpec, agg: &Value) -> Result<Vec<AggRow>> {
    let buckets: Vec<Value> = match &spec.kind {
        // A missing-bucket response is a single object, not a list
        BucketKind::Missing { .. } => vec![agg.clone()],
        _ => agg
            .get("buckets")
            .and_then(|b| b.as_array())
            .ok_or_else(|| {
                shape_error(format!("aggregation '{}' has no bucket list", spec.key))
            })?
            .clone(),
    };

    let mut out = Vec::new();
    for bucket in &buckets {
        let mut base = Map::new();
        match &spec.kind {
            BucketKind::Composite { .. } => {
                let key = bucket.get("key").and_then(|k| k.as_object()).ok_or_else(|| {
                    shape_error(format!(
                        "composite bucket of '{}' has no key object",
                        spec.key
                    ))
                })?;
                for (source, value) in key {
                    base.insert(source.clone(), value.clone());
                }
            }
            BucketKind::Missing { field } => {
                base.insert(field.clone(), Value::Null);
            }
            _ => {
                let field = spec.group_field().unwrap_or(&spec.key);
                let key = bucket
                    .get("key_as_string")
                    .or_else(|| bucket.get("key"))
                    .ok_or_else(|| {
                        shape_error(format!("bucket of '{}' has no key", spec.key))
                    })?;
                base.insert(field.to_string(), key.clone());
            }
        }
        let doc_count = bucket.get("doc_count").and_then(|c| c.as_u64());

        let mut child_rows: Vec<AggRow> = Vec::new();
        for sub in &spec.subs {
            let sub_agg = bucket.get(sub.key()).ok_or_else(|| {
                shape_error(format!(
                    "sub-aggregation '{}' is missing from a bucket of '{}'",
                    sub.key(),
                    spec.key
                ))
            })?;
            match sub {
                AggSpec::Metric(metric) => {
                    base.insert(metric.key.clone(), unwrap_metric(metric, sub_agg)?);
                }
                AggSpec::Bucket(sub_bucket) if sub_bucket.flattens_to_columns() => {
                    let row = range_row(sub_bucket, sub_agg)?;
                    base.extend(row.values);
                }
                AggSpec::Bucket(sub_bucket) => {
                    let rows = bucket_rows(sub_bucket, sub_agg)?;
                    child_rows = if child_rows.is_empty() {
                        rows
                    } else {
                        cartesian(child_rows, rows)
                    };
                }
            }
        }

        if child_rows.is_empty() {
            out.push(AggRow {
                values: base,
                doc_count,
                raw: Some(bucket.clone()),
            });
        } else {
            for child in child_rows {
                let mut values = base.clone();
                values.extend(child.values);
                out.push(AggRow {
                    values,
                    doc_count: child.doc_count,
                    raw: child.raw,
                });
            }
        }
    }
    Ok(out)
}

fn cartesian(left: Vec<AggRow>, right: Vec<AggRow>) -> Vec<AggRow> {
    let mut out = Vec::with_capacity(left.len() * right.len());
    for a in &left {
        for b in &right {
            let mut values = a.values.clone();
            values.extend(b.values.clone());
            out.push(AggRow {
                values,
                doc_count: b.doc_count.or(a.doc_count),
                raw: b.raw.clone().or_else(|| a.raw.clone()),
            });
        }
    }
    out
}

/// Flatten a range-style aggregation into sibling columns of one row
///
/// Column names are `count_{label}` and `{metric}_{label}` where the label
/// is the aggregation key joined with the band key, so callers consume the
/// bands side by side instead of as separate rows.
fn range_row(spec: &BucketSpec, agg: &Value) -> Result<AggRow> {
    let buckets = agg
        .get("buckets")
        .and_then(|b| b.as_array())
        .ok_or_else(|| shape_error(format!("aggregation '{}' has no bucket list", spec.key)))?;

    let mut values = Map::new();
    for bucket in buckets {
        let label = bucket.get("key").and_then(|k| k.as_str()).ok_or_else(|| {
            shape_error(format!("range bucket of '{}' has no key", spec.key))
        })?;
        let full_label = format!("{}_{}", spec.key, label);
        let doc_count = bucket.get("doc_count").cloned().ok_or_else(|| {
            shape_error(format!(
                "range bucket '{label}' of '{}' has no doc_count",
                spec.key
            ))
        })?;
        values.insert(format!("count_{full_label}"), doc_count);

        for sub in &spec.subs {
            let AggSpec::Metric(metric) = sub else {
                return Err(CuttleError::parameter(format!(
                    "range aggregation '{}' supports metric sub-aggregations only",
                    spec.key
                )));
            };
            let sub_agg = bucket.get(&metric.key).ok_or_else(|| {
                shape_error(format!(
                    "sub-aggregation '{}' is missing from range bucket '{label}'",
                    metric.key
                ))
            })?;
            values.insert(
                format!("{}_{full_label}", metric.key),
                unwrap_metric(metric, sub_agg)?,
            );
        }
    }

    Ok(AggRow {
        values,
        doc_count: None,
        raw: Some(agg.clone()),
    })
}

/// Unwrap one metric aggregation value by its kind
fn unwrap_metric(metric: &MetricSpec, agg: &Value) -> Result<Value> {
    match metric.kind {
        MetricKind::MatrixStats => {
            let fields = agg
                .get("fields")
                .and_then(|f| f.as_array())
                .ok_or_else(|| {
                    shape_error(format!(
                        "matrix stats aggregation '{}' has no fields list",
                        metric.key
                    ))
                })?;
            let mut by_field = Map::new();
            for entry in fields {
                let name = entry.get("name").and_then(|n| n.as_str()).ok_or_else(|| {
                    shape_error(format!(
                        "matrix stats entry of '{}' has no field name",
                        metric.key
                    ))
                })?;
                by_field.insert(name.to_string(), entry.clone());
            }
            Ok(Value::Object(by_field))
        }
        MetricKind::Percentiles => agg.get("values").cloned().ok_or_else(|| {
            shape_error(format!(
                "percentiles aggregation '{}' has no values",
                metric.key
            ))
        }),
        MetricKind::Stats | MetricKind::ExtendedStats => Ok(agg.clone()),
        _ => agg.get("value").cloned().ok_or_else(|| {
            shape_error(format!("metric aggregation '{}' has no value", metric.key))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggs::{BucketSpec, CompositeSource};
    use serde_json::json;

    fn terms_under_terms() -> Vec<AggSpec> {
        vec![BucketSpec::terms("category", "category")
            .with_sub(BucketSpec::terms("brand", "brand"))
            .into()]
    }

    #[test]
    fn test_two_level_flattening_yields_cross_product() {
        let specs = terms_under_terms();
        let response = json!({
            "category": {
                "buckets": [
                    {
                        "key": "tools", "doc_count": 10,
                        "brand": { "buckets": [
                            { "key": "acme", "doc_count": 6 },
                            { "key": "zeta", "doc_count": 4 }
                        ] }
                    },
                    {
                        "key": "garden", "doc_count": 5,
                        "brand": { "buckets": [
                            { "key": "acme", "doc_count": 2 },
                            { "key": "beta", "doc_count": 3 }
                        ] }
                    }
                ]
            }
        });
        let output = unpack(&specs, Some(&response)).unwrap();
        // 2 top buckets x 2 sub buckets each
        assert_eq!(output.rows.len(), 4);
        let first = &output.rows[0];
        assert_eq!(first.get("category"), Some(&json!("tools")));
        assert_eq!(first.get("brand"), Some(&json!("acme")));
        assert_eq!(first.doc_count, Some(6));
        let last = &output.rows[3];
        assert_eq!(last.get("category"), Some(&json!("garden")));
        assert_eq!(last.get("brand"), Some(&json!("beta")));
    }

    #[test]
    fn test_metrics_hoist_into_rows() {
        let specs: Vec<AggSpec> = vec![BucketSpec::terms("category", "category")
            .with_sub(MetricSpec::new(MetricKind::Avg, "price"))
            .into()];
        let response = json!({
            "category": {
                "buckets": [
                    { "key": "tools", "doc_count": 3, "avg_price": { "value": 24.5 } }
                ]
            }
        });
        let output = unpack(&specs, Some(&response)).unwrap();
        assert_eq!(output.rows[0].get("avg_price"), Some(&json!(24.5)));
    }

    #[test]
    fn test_range_buckets_flatten_to_one_row() {
        let specs: Vec<AggSpec> = vec![BucketSpec::range("price_range", "price", vec![]).into()];
        let response = json!({
            "price_range": {
                "buckets": [
                    { "key": "a", "doc_count": 2 },
                    { "key": "b", "doc_count": 6 },
                    { "key": "c", "doc_count": 2 }
                ]
            }
        });
        let output = unpack(&specs, Some(&response)).unwrap();
        assert_eq!(output.rows.len(), 1);
        let row = &output.rows[0];
        assert_eq!(row.get("count_price_range_a"), Some(&json!(2)));
        assert_eq!(row.get("count_price_range_b"), Some(&json!(6)));
        assert_eq!(row.get("count_price_range_c"), Some(&json!(2)));
    }

    #[test]
    fn test_range_bucket_metrics_are_label_prefixed() {
        let specs: Vec<AggSpec> = vec![BucketSpec::range("price_range", "price", vec![])
            .with_sub(MetricSpec::new(MetricKind::Avg, "price"))
            .into()];
        let response = json!({
            "price_range": {
                "buckets": [
                    { "key": "low", "doc_count": 2, "avg_price": { "value": 12.0 } }
                ]
            }
        });
        let output = unpack(&specs, Some(&response)).unwrap();
        assert_eq!(
            output.rows[0].get("avg_price_price_range_low"),
            Some(&json!(12.0))
        );
    }

    #[test]
    fn test_single_metric_unwraps_to_scalar() {
        let specs = vec![AggSpec::Metric(MetricSpec::new(MetricKind::Avg, "price"))];
        let response = json!({ "avg_price": { "value": 42.5 } });
        let output = unpack(&specs, Some(&response)).unwrap();
        assert_eq!(output.metrics, MetricValues::Single(json!(42.5)));
    }

    #[test]
    fn test_dual_metrics_yield_keyed_map() {
        let specs = vec![
            AggSpec::Metric(MetricSpec::new(MetricKind::Min, "price")),
            AggSpec::Metric(MetricSpec::new(MetricKind::Max, "price")),
        ];
        let response = json!({
            "min_price": { "value": 4.0 },
            "max_price": { "value": 99.0 }
        });
        let output = unpack(&specs, Some(&response)).unwrap();
        let MetricValues::Many(map) = output.metrics else {
            panic!("expected keyed metric map");
        };
        assert_eq!(map.get("min_price"), Some(&json!(4.0)));
        assert_eq!(map.get("max_price"), Some(&json!(99.0)));
    }

    #[test]
    fn test_matrix_stats_keyed_by_field() {
        let specs = vec![AggSpec::Metric(MetricSpec::matrix(
            "matrix",
            vec!["price".to_string(), "weight".to_string()],
        ))];
        let response = json!({
            "matrix": {
                "fields": [
                    { "name": "price", "count": 10, "mean": 20.0, "variance": 2.5,
                      "skewness": 0.1, "kurtosis": 2.9,
                      "covariance": { "weight": 1.2 }, "correlation": { "weight": 0.8 } },
                    { "name": "weight", "count": 10, "mean": 3.0, "variance": 0.4,
                      "skewness": -0.2, "kurtosis": 3.1,
                      "covariance": { "price": 1.2 }, "correlation": { "price": 0.8 } }
                ]
            }
        });
        let output = unpack(&specs, Some(&response)).unwrap();
        let MetricValues::Single(value) = output.metrics else {
            panic!("expected single matrix value");
        };
        assert_eq!(value["price"]["mean"], json!(20.0));
        assert_eq!(value["weight"]["variance"], json!(0.4));
    }

    #[test]
    fn test_composite_rows_and_after_key() {
        let specs: Vec<AggSpec> = vec![BucketSpec::composite(
            "pairs",
            vec![
                CompositeSource::terms("category", "category"),
                CompositeSource::terms("brand", "brand"),
            ],
        )
        .into()];
        let response = json!({
            "pairs": {
                "after_key": { "category": "tools", "brand": "zeta" },
                "buckets": [
                    { "key": { "category": "tools", "brand": "acme" }, "doc_count": 6 },
                    { "key": { "category": "tools", "brand": "zeta" }, "doc_count": 4 }
                ]
            }
        });
        let output = unpack(&specs, Some(&response)).unwrap();
        assert_eq!(output.rows.len(), 2);
        assert_eq!(output.rows[0].get("brand"), Some(&json!("acme")));
        assert_eq!(
            output.after_key,
            Some(json!({ "category": "tools", "brand": "zeta" }))
        );
    }

    #[test]
    fn test_missing_bucket_key_is_shape_error() {
        let specs: Vec<AggSpec> = vec![BucketSpec::terms("category", "category").into()];
        let response = json!({ "category": { "not_buckets": [] } });
        let err = unpack(&specs, Some(&response)).unwrap_err();
        assert!(err.to_string().contains("bucket list"));
    }

    #[test]
    fn test_missing_sub_aggregation_is_shape_error() {
        let specs: Vec<AggSpec> = vec![BucketSpec::terms("category", "category")
            .with_sub(MetricSpec::new(MetricKind::Avg, "price"))
            .into()];
        let response = json!({
            "category": { "buckets": [{ "key": "tools", "doc_count": 1 }] }
        });
        let err = unpack(&specs, Some(&response)).unwrap_err();
        assert!(err.to_string().contains("avg_price"));
    }

    #[test]
    fn test_empty_bucket_list_is_valid_absence() {
        let specs: Vec<AggSpec> = vec![BucketSpec::terms("category", "category").into()];
        let response = json!({ "category": { "buckets": [] } });
        let output = unpack(&specs, Some(&response)).unwrap();
        assert!(output.rows.is_empty());
    }
}
