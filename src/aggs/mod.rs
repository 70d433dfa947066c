//! Aggregation model - bucket and metric specifications
//!
//! Specs are pure data describing what to aggregate; the
//! [`planner::AggregationPlanner`] compiles them into the engine's
//! aggregation document and the response processor mirrors their shape
//! when unpacking buckets.

pub mod planner;

pub use planner::AggregationPlanner;

use crate::error::{CuttleError, Result};
use crate::sort::SortOrder;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// A bucket or metric aggregation request
#[derive(Clone, Debug, PartialEq)]
pub enum AggSpec {
    Bucket(BucketSpec),
    Metric(MetricSpec),
}

impl AggSpec {
    /// The result name this spec is keyed by in the aggregation document
    pub fn key(&self) -> &str {
        match self {
            AggSpec::Bucket(bucket) => &bucket.key,
            AggSpec::Metric(metric) => &metric.key,
        }
    }
}

impl From<BucketSpec> for AggSpec {
    fn from(bucket: BucketSpec) -> Self {
        AggSpec::Bucket(bucket)
    }
}

impl From<MetricSpec> for AggSpec {
    fn from(metric: MetricSpec) -> Self {
        AggSpec::Metric(metric)
    }
}

/// A grouping aggregation with recursively owned sub-aggregations
#[derive(Clone, Debug, PartialEq)]
pub struct BucketSpec {
    pub key: String,
    pub kind: BucketKind,
    pub order: Option<BucketOrder>,
    pub size: Option<usize>,
    pub subs: Vec<AggSpec>,
}

/// Bucket aggregation variants
#[derive(Clone, Debug, PartialEq)]
pub enum BucketKind {
    Terms {
        field: String,
    },
    Range {
        field: String,
        bands: Vec<RangeBand>,
    },
    DateRange {
        field: String,
        bands: Vec<RangeBand>,
        format: Option<String>,
    },
    Histogram {
        field: String,
        interval: f64,
    },
    DateHistogram {
        field: String,
        interval: String,
    },
    Missing {
        field: String,
    },
    /// Cursor-style grouping for resumable large scans; `after` carries the
    /// previous page's continuation key
    Composite {
        sources: Vec<CompositeSource>,
        after: Option<Value>,
    },
}

impl BucketSpec {
    fn new(key: impl Into<String>, kind: BucketKind) -> Self {
        Self {
            key: key.into(),
            kind,
            order: None,
            size: None,
            subs: Vec::new(),
        }
    }

    /// Group by distinct values of a field
    pub fn terms(key: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(key, BucketKind::Terms { field: field.into() })
    }

    /// Partition by numeric bands
    pub fn range(key: impl Into<String>, field: impl Into<String>, bands: Vec<RangeBand>) -> Self {
        Self::new(
            key,
            BucketKind::Range {
                field: field.into(),
                bands,
            },
        )
    }

    /// Partition by date bands
    pub fn date_range(
        key: impl Into<String>,
        field: impl Into<String>,
        bands: Vec<RangeBand>,
    ) -> Self {
        Self::new(
            key,
            BucketKind::DateRange {
                field: field.into(),
                bands,
                format: None,
            },
        )
    }

    /// Fixed-interval numeric histogram
    pub fn histogram(key: impl Into<String>, field: impl Into<String>, interval: f64) -> Self {
        Self::new(
            key,
            BucketKind::Histogram {
                field: field.into(),
                interval,
            },
        )
    }

    /// Calendar-interval date histogram
    pub fn date_histogram(
        key: impl Into<String>,
        field: impl Into<String>,
        interval: impl Into<String>,
    ) -> Self {
        Self::new(
            key,
            BucketKind::DateHistogram {
                field: field.into(),
                interval: interval.into(),
            },
        )
    }

    /// Bucket of documents missing the field
    pub fn missing(key: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(key, BucketKind::Missing { field: field.into() })
    }

    /// Cursor-style composite grouping over one or more sources
    pub fn composite(key: impl Into<String>, sources: Vec<CompositeSource>) -> Self {
        Self::new(
            key,
            BucketKind::Composite {
                sources,
                after: None,
            },
        )
    }

    /// Thread the previous page's continuation key into a composite bucket
    pub fn with_after(mut self, after: Value) -> Self {
        if let BucketKind::Composite {
            after: ref mut slot,
            ..
        } = self.kind
        {
            *slot = Some(after);
        }
        self
    }

    /// Order buckets by key, document count, or a sub-aggregation value
    pub fn with_order(mut self, order: BucketOrder) -> Self {
        self.order = Some(order);
        self
    }

    /// Cap the number of buckets returned
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    /// Attach a sub-aggregation
    pub fn with_sub(mut self, sub: impl Into<AggSpec>) -> Self {
        self.subs.push(sub.into());
        self
    }

    /// The grouping field whose values become row keys when unpacking
    pub fn group_field(&self) -> Option<&str> {
        match &self.kind {
            BucketKind::Terms { field }
            | BucketKind::Histogram { field, .. }
            | BucketKind::DateHistogram { field, .. }
            | BucketKind::Missing { field } => Some(field),
            BucketKind::Range { .. } | BucketKind::DateRange { .. } => None,
            BucketKind::Composite { .. } => None,
        }
    }

    /// Range-style buckets flatten to label-prefixed sibling columns of one
    /// row instead of one row per bucket
    pub fn flattens_to_columns(&self) -> bool {
        matches!(
            self.kind,
            BucketKind::Range { .. } | BucketKind::DateRange { .. }
        )
    }
}

/// One band of a range or date-range bucket
///
/// Bounds follow the engine's half-open convention: `from` is inclusive,
/// `to` is exclusive. An absent bound leaves that end open.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeBand {
    pub from: Option<Value>,
    pub to: Option<Value>,
    pub key: Option<String>,
}

impl RangeBand {
    pub fn new(from: Option<Value>, to: Option<Value>) -> Self {
        Self {
            from,
            to,
            key: None,
        }
    }

    /// Band with both bounds
    pub fn bounded(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Self::new(Some(from.into()), Some(to.into()))
    }

    /// Open-bottom band
    pub fn below(to: impl Into<Value>) -> Self {
        Self::new(None, Some(to.into()))
    }

    /// Open-top band
    pub fn above(from: impl Into<Value>) -> Self {
        Self::new(Some(from.into()), None)
    }

    /// Date band rendered in the engine's RFC 3339 date format
    pub fn between_dates(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self::new(
            Some(Value::String(from.to_rfc3339_opts(SecondsFormat::Secs, true))),
            Some(Value::String(to.to_rfc3339_opts(SecondsFormat::Secs, true))),
        )
    }

    /// Attach an explicit label
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Parse either the positional `[from, to]` form or the associative
    /// `{from, to, key}` form; both produce equivalent bands
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Array(parts) if parts.len() == 2 => {
                let bound = |v: &Value| {
                    if v.is_null() {
                        None
                    } else {
                        Some(v.clone())
                    }
                };
                Ok(Self::new(bound(&parts[0]), bound(&parts[1])))
            }
            Value::Object(map) => {
                let band = Self::new(map.get("from").cloned(), map.get("to").cloned());
                Ok(match map.get("key").and_then(|k| k.as_str()) {
                    Some(key) => band.with_key(key),
                    None => band,
                })
            }
            _ => Err(CuttleError::parameter(
                "range band must be [from, to] or {from, to, key}".to_string(),
            )),
        }
    }

    /// The band's label: the explicit key, or the deterministic
    /// `field_from-to` form with `*` standing in for an open bound
    pub fn label(&self, field: &str) -> String {
        match &self.key {
            Some(key) => key.clone(),
            None => format!(
                "{field}_{}-{}",
                Self::bound_text(&self.from),
                Self::bound_text(&self.to)
            ),
        }
    }

    fn bound_text(bound: &Option<Value>) -> String {
        match bound {
            None => "*".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// One source column of a composite bucket
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeSource {
    pub name: String,
    pub field: String,
}

impl CompositeSource {
    pub fn terms(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
        }
    }
}

/// Ordering embedded inside a bucket
///
/// Buckets sort independently of document hits, so this compiles into the
/// bucket's own `order` object, never into the top-level sort list.
#[derive(Clone, Debug, PartialEq)]
pub struct BucketOrder {
    pub target: OrderTarget,
    pub direction: SortOrder,
}

impl BucketOrder {
    pub fn by_key(direction: SortOrder) -> Self {
        Self {
            target: OrderTarget::Key,
            direction,
        }
    }

    pub fn by_count(direction: SortOrder) -> Self {
        Self {
            target: OrderTarget::Count,
            direction,
        }
    }

    pub fn by_sub_agg(key: impl Into<String>, direction: SortOrder) -> Self {
        Self {
            target: OrderTarget::SubAgg(key.into()),
            direction,
        }
    }
}

/// What a bucket order sorts on
#[derive(Clone, Debug, PartialEq)]
pub enum OrderTarget {
    /// The bucket's own key value
    Key,
    /// The bucket's document count
    Count,
    /// A sub-aggregation's value, by its key
    SubAgg(String),
}

/// A numeric summary over (a bucket of) matched documents
#[derive(Clone, Debug, PartialEq)]
pub struct MetricSpec {
    pub key: String,
    pub kind: MetricKind,
    pub fields: Vec<String>,
}

impl MetricSpec {
    /// Metric keyed by the collision-safe `{kind}_{field}` convention
    pub fn new(kind: MetricKind, field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            key: format!("{}_{}", kind.agg_name(), field),
            kind,
            fields: vec![field],
        }
    }

    /// Metric with an explicit result key
    pub fn named(key: impl Into<String>, kind: MetricKind, field: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            fields: vec![field.into()],
        }
    }

    /// Cross-field statistics over several numeric fields
    pub fn matrix(key: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            key: key.into(),
            kind: MetricKind::MatrixStats,
            fields,
        }
    }
}

/// Metric aggregation variants
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricKind {
    Min,
    Max,
    Sum,
    Avg,
    Stats,
    ExtendedStats,
    Percentiles,
    Cardinality,
    ValueCount,
    MatrixStats,
}

impl MetricKind {
    /// The engine's aggregation type name
    pub fn agg_name(&self) -> &'static str {
        match self {
            MetricKind::Min => "min",
            MetricKind::Max => "max",
            MetricKind::Sum => "sum",
            MetricKind::Avg => "avg",
            MetricKind::Stats => "stats",
            MetricKind::ExtendedStats => "extended_stats",
            MetricKind::Percentiles => "percentiles",
            MetricKind::Cardinality => "cardinality",
            MetricKind::ValueCount => "value_count",
            MetricKind::MatrixStats => "matrix_stats",
        }
    }

    /// Whether the response carries a bare `value` to unwrap
    pub fn unwraps_scalar(&self) -> bool {
        matches!(
            self,
            MetricKind::Min
                | MetricKind::Max
                | MetricKind::Sum
                | MetricKind::Avg
                | MetricKind::Cardinality
                | MetricKind::ValueCount
        )
    }
}
