//! Response processor
//!
//! Converts the engine's nested hit/aggregation response into flat
//! documents and flat aggregation rows, mirroring the exact shapes the
//! aggregation planner created, and extracts the continuation token for
//! the next page.
//!
//! The processor is lenient about the *absence* of optional sections (no
//! aggregations when none were requested) but strict about *shape*: a
//! requested aggregation key missing from the response is an engine
//! contract violation, not an empty default.

pub mod aggs;
pub mod hits;

pub use aggs::AggRow;
pub use hits::FlatDocument;

use crate::aggs::AggSpec;
use crate::error::{CuttleError, Result};
use serde_json::{Map, Value};
use tracing::debug;

/// Reserved key carrying the identity of a flat document
pub const ID_KEY: &str = "_id";
/// Reserved key carrying the source index name
pub const INDEX_KEY: &str = "_index";
/// Reserved key carrying the relevance score
pub const SCORE_KEY: &str = "_score";
/// Reserved key for highlight payloads, kept out of user fields
pub const HIGHLIGHT_KEY: &str = "_highlight";
/// Reserved key for matched inner documents, grouped by nested path
pub const INNER_HITS_KEY: &str = "_inner_hits";

/// Metric results, shaped by how many metrics were requested
#[derive(Clone, Debug, Default, PartialEq)]
pub enum MetricValues {
    #[default]
    None,
    /// A single bucketless metric unwraps directly to its value
    Single(Value),
    /// Multiple metrics keyed by the `{kind}_{field}` convention
    Many(Map<String, Value>),
}

/// Opaque marker for resuming iteration at the next page
#[derive(Clone, Debug, PartialEq)]
pub enum Continuation {
    /// Sort values of the last hit, for `search_after` paging
    SearchAfter(Vec<Value>),
    /// Composite aggregation continuation key
    AfterKey(Value),
}

/// Fully unpacked engine response
#[derive(Clone, Debug, Default)]
pub struct ProcessedResponse {
    pub docs: Vec<FlatDocument>,
    pub total: Option<u64>,
    pub rows: Vec<AggRow>,
    pub metrics: MetricValues,
    pub continuation: Option<Continuation>,
}

/// Unpacks raw responses against the aggregation specs that produced them
pub struct ResponseProcessor<'a> {
    specs: &'a [AggSpec],
}

impl<'a> ResponseProcessor<'a> {
    pub fn new(specs: &'a [AggSpec]) -> Self {
        Self { specs }
    }

    /// Processor for hit-only responses
    pub fn without_aggregations() -> Self {
        Self { specs: &[] }
    }

    pub fn process(&self, raw: &Value) -> Result<ProcessedResponse> {
        if raw.get("error").is_some() {
            return Err(CuttleError::from_engine_response(raw));
        }

        let unpacked = hits::unpack_hits(raw)?;
        let agg_output = aggs::unpack(self.specs, raw.get("aggregations"))?;

        let continuation = agg_output
            .after_key
            .map(Continuation::AfterKey)
            .or_else(|| unpacked.last_sort.map(Continuation::SearchAfter));

        debug!(
            docs = unpacked.docs.len(),
            rows = agg_output.rows.len(),
            "processed engine response"
        );

        Ok(ProcessedResponse {
            docs: unpacked.docs,
            total: unpacked.total,
            rows: agg_output.rows,
            metrics: agg_output.metrics,
            continuation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggs::{MetricKind, MetricSpec};
    use serde_json::json;

    #[test]
    fn test_engine_error_surfaces_as_query_error() {
        let raw = json!({
            "error": { "type": "search_phase_execution_exception", "reason": "all shards failed" },
            "status": 503
        });
        let err = ResponseProcessor::without_aggregations()
            .process(&raw)
            .unwrap_err();
        assert_eq!(err.to_string(), "Query failed: all shards failed");
    }

    #[test]
    fn test_missing_optional_sections_are_fine() {
        let processed = ResponseProcessor::without_aggregations()
            .process(&json!({ "took": 3 }))
            .unwrap();
        assert!(processed.docs.is_empty());
        assert!(processed.rows.is_empty());
        assert_eq!(processed.metrics, MetricValues::None);
        assert!(processed.continuation.is_none());
    }

    #[test]
    fn test_requested_aggregation_must_be_present() {
        let specs = vec![AggSpec::Metric(MetricSpec::new(MetricKind::Avg, "price"))];
        let err = ResponseProcessor::new(&specs)
            .process(&json!({ "took": 3 }))
            .unwrap_err();
        assert!(matches!(err, CuttleError::Query { .. }));
    }

    #[test]
    fn test_continuation_prefers_after_key() {
        use crate::aggs::{BucketSpec, CompositeSource};
        let specs = vec![AggSpec::Bucket(BucketSpec::composite(
            "pairs",
            vec![CompositeSource::terms("category", "category")],
        ))];
        let raw = json!({
            "hits": { "total": { "value": 1 }, "hits": [
                { "_id": "1", "_index": "products", "_source": {}, "sort": [42] }
            ] },
            "aggregations": {
                "pairs": {
                    "after_key": { "category": "tools" },
                    "buckets": [
                        { "key": { "category": "tools" }, "doc_count": 3 }
                    ]
                }
            }
        });
        let processed = ResponseProcessor::new(&specs).process(&raw).unwrap();
        assert_eq!(
            processed.continuation,
            Some(Continuation::AfterKey(json!({ "category": "tools" })))
        );
    }
}
