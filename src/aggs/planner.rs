//! Aggregation planner
//!
//! Compiles bucket and metric specs into the aggregation portion of the
//! native query document, nesting recursively for sub-aggregations. The
//! response processor relies on the shapes planned here when flattening.

use super::{AggSpec, BucketKind, BucketOrder, BucketSpec, MetricKind, MetricSpec, OrderTarget};
use crate::config::CompilerConfig;
use crate::error::{CuttleError, Result};
use crate::sort::SortOrder;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tracing::debug;

/// Compiles aggregation specs into the engine's aggregation document
pub struct AggregationPlanner<'a> {
    config: &'a CompilerConfig,
}

impl<'a> AggregationPlanner<'a> {
    pub fn new(config: &'a CompilerConfig) -> Self {
        Self { config }
    }

    /// Plan the `aggs` object for a list of specs
    ///
    /// Returns `None` when no aggregations were requested so the select
    /// compiler can omit the key. Duplicate result names are an error:
    /// the engine would silently keep one of them.
    pub fn plan(&self, specs: &[AggSpec]) -> Result<Option<Value>> {
        if specs.is_empty() {
            return Ok(None);
        }

        let mut seen = HashSet::new();
        let mut aggs = Map::new();
        for spec in specs {
            if !seen.insert(spec.key().to_string()) {
                return Err(CuttleError::parameter(format!(
                    "duplicate aggregation key '{}'",
                    spec.key()
                )));
            }
            aggs.insert(spec.key().to_string(), self.plan_spec(spec)?);
        }
        debug!(aggregations = specs.len(), "planned aggregation document");
        Ok(Some(Value::Object(aggs)))
    }

    fn plan_spec(&self, spec: &AggSpec) -> Result<Value> {
        match spec {
            AggSpec::Bucket(bucket) => self.plan_bucket(bucket),
            AggSpec::Metric(metric) => self.plan_metric(metric),
        }
    }

    fn plan_bucket(&self, bucket: &BucketSpec) -> Result<Value> {
        let (agg_name, mut body) = match &bucket.kind {
            BucketKind::Terms { field } => {
                let mut body = Map::new();
                body.insert("field".to_string(), json!(field));
                ("terms", body)
            }
            BucketKind::Range { field, bands } => {
                let mut body = Map::new();
                body.insert("field".to_string(), json!(field));
                body.insert("ranges".to_string(), Self::plan_bands(field, bands)?);
                ("range", body)
            }
            BucketKind::DateRange {
                field,
                bands,
                format,
            } => {
                let mut body = Map::new();
                body.insert("field".to_string(), json!(field));
                body.insert("ranges".to_string(), Self::plan_bands(field, bands)?);
                if let Some(format) = format {
                    body.insert("format".to_string(), json!(format));
                }
                ("date_range", body)
            }
            BucketKind::Histogram { field, interval } => {
                let mut body = Map::new();
                body.insert("field".to_string(), json!(field));
                body.insert("interval".to_string(), json!(interval));
                ("histogram", body)
            }
            BucketKind::DateHistogram { field, interval } => {
                let mut body = Map::new();
                body.insert("field".to_string(), json!(field));
                body.insert("calendar_interval".to_string(), json!(interval));
                ("date_histogram", body)
            }
            BucketKind::Missing { field } => {
                let mut body = Map::new();
                body.insert("field".to_string(), json!(field));
                ("missing", body)
            }
            BucketKind::Composite { sources, after } => {
                if sources.is_empty() {
                    return Err(CuttleError::parameter(format!(
                        "composite aggregation '{}' has no sources",
                        bucket.key
                    )));
                }
                let mut body = Map::new();
                body.insert(
                    "size".to_string(),
                    json!(bucket.size.unwrap_or(self.config.distinct_size_cap)),
                );
                let sources: Vec<Value> = sources
                    .iter()
                    .map(|source| {
                        json!({ (source.name.clone()): { "terms": { "field": source.field } } })
                    })
                    .collect();
                body.insert("sources".to_string(), Value::Array(sources));
                if let Some(after) = after {
                    body.insert("after".to_string(), after.clone());
                }
                ("composite", body)
            }
        };

        // size and order apply to enumerating buckets; composite carries its
        // own size and orders by source definition
        if !matches!(bucket.kind, BucketKind::Composite { .. }) {
            if let Some(size) = bucket.size {
                body.insert("size".to_string(), json!(size));
            }
            if let Some(ref order) = bucket.order {
                body.insert("order".to_string(), Self::plan_order(order));
            }
        }

        let mut agg = Map::new();
        agg.insert(agg_name.to_string(), Value::Object(body));
        if !bucket.subs.is_empty() {
            if let Some(subs) = self.plan(&bucket.subs)? {
                agg.insert("aggs".to_string(), subs);
            }
        }
        Ok(Value::Object(agg))
    }

    /// Bands always emit an explicit `key` so response unpacking is
    /// deterministic regardless of spelling
    fn plan_bands(field: &str, bands: &[super::RangeBand]) -> Result<Value> {
        if bands.is_empty() {
            return Err(CuttleError::parameter(format!(
                "range aggregation on '{field}' has no bands"
            )));
        }
        let planned = bands
            .iter()
            .map(|band| {
                let mut entry = Map::new();
                entry.insert("key".to_string(), json!(band.label(field)));
                if let Some(ref from) = band.from {
                    entry.insert("from".to_string(), from.clone());
                }
                if let Some(ref to) = band.to {
                    entry.insert("to".to_string(), to.clone());
                }
                if band.from.is_none() && band.to.is_none() {
                    return Err(CuttleError::parameter(format!(
                        "range band on '{field}' has no bounds"
                    )));
                }
                Ok(Value::Object(entry))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(planned))
    }

    fn plan_order(order: &BucketOrder) -> Value {
        let direction = order.direction.as_str();
        match &order.target {
            OrderTarget::Key => json!({ "_key": direction }),
            OrderTarget::Count => json!({ "_count": direction }),
            OrderTarget::SubAgg(key) => json!({ (key.clone()): direction }),
        }
    }

    fn plan_metric(&self, metric: &MetricSpec) -> Result<Value> {
        if metric.kind == MetricKind::MatrixStats {
            if metric.fields.len() < 2 {
                return Err(CuttleError::parameter(format!(
                    "matrix stats aggregation '{}' needs at least two fields",
                    metric.key
                )));
            }
            return Ok(json!({ "matrix_stats": { "fields": metric.fields } }));
        }

        let field = match metric.fields.as_slice() {
            [field] => field,
            _ => {
                return Err(CuttleError::parameter(format!(
                    "metric aggregation '{}' requires exactly one field",
                    metric.key
                )))
            }
        };
        Ok(json!({ (metric.kind.agg_name()): { "field": field } }))
    }

    /// Desugar a multi-column group-by into recursively nested term buckets
    ///
    /// Column N+1 becomes a sub-aggregation of column N's bucket, in call
    /// order. Every level carries the explicit enumeration cap.
    pub fn group_by(&self, columns: &[&str]) -> Result<AggSpec> {
        self.group_by_ordered(columns, &[])
    }

    /// Group-by with per-column or count ordering
    ///
    /// A sort on a grouping column becomes that bucket's `_key` order; a
    /// sort on the synthetic `count` pseudo-field becomes `_count` order on
    /// every level, since buckets sort independently.
    pub fn group_by_ordered(
        &self,
        columns: &[&str],
        sorts: &[(String, SortOrder)],
    ) -> Result<AggSpec> {
        let Some((&innermost, outer)) = columns.split_last() else {
            return Err(CuttleError::parameter(
                "group-by requires at least one column".to_string(),
            ));
        };

        let count_order = sorts
            .iter()
            .find(|(field, _)| field == "count" || field == "_count")
            .map(|(_, direction)| *direction);

        let mut spec = self.terms_level(innermost, sorts, count_order);
        for &column in outer.iter().rev() {
            spec = self
                .terms_level(column, sorts, count_order)
                .with_sub(spec);
        }
        Ok(AggSpec::Bucket(spec))
    }

    /// Desugar a distinct request; `with_count` adds an explicit per-value
    /// count readout alongside each bucket's own document count
    pub fn distinct(&self, columns: &[&str], with_count: bool) -> Result<AggSpec> {
        let spec = self.group_by(columns)?;
        if !with_count {
            return Ok(spec);
        }
        Ok(Self::add_count_readouts(spec))
    }

    fn terms_level(
        &self,
        column: &str,
        sorts: &[(String, SortOrder)],
        count_order: Option<SortOrder>,
    ) -> BucketSpec {
        let mut spec =
            BucketSpec::terms(column, column).with_size(self.config.distinct_size_cap);
        if let Some((_, direction)) = sorts.iter().find(|(field, _)| field == column) {
            spec = spec.with_order(BucketOrder::by_key(*direction));
        } else if let Some(direction) = count_order {
            spec = spec.with_order(BucketOrder::by_count(direction));
        }
        spec
    }

    fn add_count_readouts(spec: AggSpec) -> AggSpec {
        match spec {
            AggSpec::Bucket(mut bucket) => {
                if let Some(field) = bucket.group_field().map(str::to_string) {
                    bucket.subs = bucket
                        .subs
                        .into_iter()
                        .map(Self::add_count_readouts)
                        .collect();
                    bucket = bucket.with_sub(MetricSpec::named(
                        format!("{field}_count"),
                        MetricKind::ValueCount,
                        field,
                    ));
                }
                AggSpec::Bucket(bucket)
            }
            metric => metric,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggs::{CompositeSource, RangeBand};

    fn planner(config: &CompilerConfig) -> AggregationPlanner<'_> {
        AggregationPlanner::new(config)
    }

    #[test]
    fn test_empty_plan_is_none() {
        let config = CompilerConfig::default();
        assert!(planner(&config).plan(&[]).unwrap().is_none());
    }

    #[test]
    fn test_terms_bucket_with_metric_sub() {
        let config = CompilerConfig::default();
        let spec: AggSpec = BucketSpec::terms("category", "category")
            .with_size(10)
            .with_sub(MetricSpec::new(MetricKind::Avg, "price"))
            .into();
        let planned = planner(&config).plan(&[spec]).unwrap().unwrap();
        assert_eq!(
            planned,
            json!({
                "category": {
                    "terms": { "field": "category", "size": 10 },
                    "aggs": { "avg_price": { "avg": { "field": "price" } } }
                }
            })
        );
    }

    #[test]
    fn test_group_by_nests_in_call_order() {
        let config = CompilerConfig::default();
        let spec = planner(&config).group_by(&["category", "brand"]).unwrap();
        let planned = planner(&config).plan(&[spec]).unwrap().unwrap();
        let category = &planned["category"];
        assert_eq!(category["terms"]["field"], json!("category"));
        assert_eq!(
            category["aggs"]["brand"]["terms"]["field"],
            json!("brand")
        );
        // The enumeration cap is explicit at every level
        assert_eq!(category["terms"]["size"], json!(1000));
        assert_eq!(category["aggs"]["brand"]["terms"]["size"], json!(1000));
    }

    #[test]
    fn test_group_by_requires_columns() {
        let config = CompilerConfig::default();
        assert!(planner(&config).group_by(&[]).is_err());
    }

    #[test]
    fn test_order_embeds_inside_bucket() {
        let config = CompilerConfig::default();
        let spec = planner(&config)
            .group_by_ordered(
                &["category"],
                &[("count".to_string(), SortOrder::Desc)],
            )
            .unwrap();
        let planned = planner(&config).plan(&[spec]).unwrap().unwrap();
        assert_eq!(
            planned["category"]["terms"]["order"],
            json!({ "_count": "desc" })
        );
    }

    #[test]
    fn test_key_order_on_grouping_column() {
        let config = CompilerConfig::default();
        let spec = planner(&config)
            .group_by_ordered(&["brand"], &[("brand".to_string(), SortOrder::Asc)])
            .unwrap();
        let planned = planner(&config).plan(&[spec]).unwrap().unwrap();
        assert_eq!(
            planned["brand"]["terms"]["order"],
            json!({ "_key": "asc" })
        );
    }

    #[test]
    fn test_distinct_with_count_adds_readout() {
        let config = CompilerConfig::default();
        let spec = planner(&config).distinct(&["category"], true).unwrap();
        let planned = planner(&config).plan(&[spec]).unwrap().unwrap();
        assert_eq!(
            planned["category"]["aggs"]["category_count"],
            json!({ "value_count": { "field": "category" } })
        );
    }

    #[test]
    fn test_range_bands_equivalent_spellings() {
        let config = CompilerConfig::default();
        let positional = RangeBand::from_value(&json!([100, 200])).unwrap();
        let associative =
            RangeBand::from_value(&json!({ "from": 100, "to": 200 })).unwrap();

        let plan = |band: RangeBand| {
            let spec: AggSpec = BucketSpec::range("price_range", "price", vec![band]).into();
            serde_json::to_string(&planner(&config).plan(&[spec]).unwrap()).unwrap()
        };
        assert_eq!(plan(positional), plan(associative));
    }

    #[test]
    fn test_range_bands_carry_labels() {
        let config = CompilerConfig::default();
        let spec: AggSpec = BucketSpec::range(
            "price_range",
            "price",
            vec![RangeBand::below(100), RangeBand::bounded(100, 200).with_key("mid")],
        )
        .into();
        let planned = planner(&config).plan(&[spec]).unwrap().unwrap();
        assert_eq!(
            planned["price_range"]["range"]["ranges"],
            json!([
                { "key": "price_*-100", "to": 100 },
                { "key": "mid", "from": 100, "to": 200 }
            ])
        );
    }

    #[test]
    fn test_composite_threads_after_key() {
        let config = CompilerConfig::default();
        let spec: AggSpec = BucketSpec::composite(
            "pairs",
            vec![
                CompositeSource::terms("category", "category"),
                CompositeSource::terms("brand", "brand"),
            ],
        )
        .with_size(500)
        .with_after(json!({ "category": "tools", "brand": "acme" }))
        .into();
        let planned = planner(&config).plan(&[spec]).unwrap().unwrap();
        let composite = &planned["pairs"]["composite"];
        assert_eq!(composite["size"], json!(500));
        assert_eq!(composite["after"], json!({ "category": "tools", "brand": "acme" }));
        assert_eq!(composite["sources"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let config = CompilerConfig::default();
        let specs: Vec<AggSpec> = vec![
            BucketSpec::terms("dup", "a").into(),
            MetricSpec::named("dup", MetricKind::Avg, "b").into(),
        ];
        assert!(planner(&config).plan(&specs).is_err());
    }

    #[test]
    fn test_matrix_stats_needs_two_fields() {
        let config = CompilerConfig::default();
        let bad: AggSpec = MetricSpec::matrix("m", vec!["price".to_string()]).into();
        assert!(planner(&config).plan(&[bad]).is_err());

        let good: AggSpec =
            MetricSpec::matrix("m", vec!["price".to_string(), "weight".to_string()]).into();
        let planned = planner(&config).plan(&[good]).unwrap().unwrap();
        assert_eq!(
            planned["m"],
            json!({ "matrix_stats": { "fields": ["price", "weight"] } })
        );
    }
}
