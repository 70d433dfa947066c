//! Select compilation
//!
//! Combines the condition tree, aggregation specs, sort specs and
//! pagination state into one outbound query document. Empty sections are
//! omitted entirely rather than emitted as empty objects.

use crate::aggs::{AggSpec, AggregationPlanner};
use crate::compile::QueryCompiler;
use crate::condition::ConditionTree;
use crate::config::CompilerConfig;
use crate::error::Result;
use crate::fields::FieldCaps;
use crate::paginate::PageState;
use crate::sort::{SortCompiler, SortSpec};
use serde_json::{json, Map, Value};

/// Highlight request for matched text fragments
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HighlightSpec {
    pub fields: Vec<String>,
    pub pre_tags: Vec<String>,
    pub post_tags: Vec<String>,
}

impl HighlightSpec {
    pub fn fields(fields: Vec<String>) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    pub fn with_tags(mut self, pre: impl Into<String>, post: impl Into<String>) -> Self {
        self.pre_tags = vec![pre.into()];
        self.post_tags = vec![post.into()];
        self
    }
}

/// Accumulated query intent for one select
#[derive(Clone, Debug, Default)]
pub struct SearchRequest {
    /// Target collection; pinned by the snapshot handle when paging
    pub index: String,
    pub tree: ConditionTree,
    pub aggs: Vec<AggSpec>,
    pub sorts: Vec<SortSpec>,
    /// Stored-field selection; `None` returns the whole source
    pub source_fields: Option<Vec<String>>,
    pub highlight: Option<HighlightSpec>,
    pub from: Option<u64>,
    pub size: Option<u64>,
    pub page: Option<PageState>,
    pub min_score: Option<f64>,
    pub routing: Option<String>,
    /// Drop document hits and return aggregation results only
    pub aggregations_only: bool,
}

impl SearchRequest {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            ..Default::default()
        }
    }

    pub fn with_tree(mut self, tree: ConditionTree) -> Self {
        self.tree = tree;
        self
    }

    pub fn with_agg(mut self, agg: impl Into<AggSpec>) -> Self {
        self.aggs.push(agg.into());
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sorts.push(sort);
        self
    }

    pub fn with_source_fields(mut self, fields: Vec<String>) -> Self {
        self.source_fields = Some(fields);
        self
    }

    pub fn with_highlight(mut self, highlight: HighlightSpec) -> Self {
        self.highlight = Some(highlight);
        self
    }

    pub fn with_from(mut self, from: u64) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_page(mut self, page: PageState) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn with_routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    /// Request aggregation results only; the compiled document carries
    /// `size: 0` so the engine skips fetching hits
    pub fn aggregations_only(mut self) -> Self {
        self.aggregations_only = true;
        self
    }
}

/// Compiles a [`SearchRequest`] into the outbound query document
pub struct SelectCompiler<'a> {
    config: &'a CompilerConfig,
    caps: &'a dyn FieldCaps,
}

impl<'a> SelectCompiler<'a> {
    pub fn new(config: &'a CompilerConfig, caps: &'a dyn FieldCaps) -> Self {
        Self { config, caps }
    }

    pub fn compile(&self, request: &SearchRequest) -> Result<Value> {
        let mut body = Map::new();

        // With a snapshot open the handle pins the collection; the index
        // key would conflict with it
        if request.page.is_none() {
            body.insert("index".to_string(), json!(request.index));
        }

        if let Some(ref fields) = request.source_fields {
            body.insert("_source".to_string(), json!(fields));
        }

        let compiler = QueryCompiler::new(self.config, self.caps);
        if let Some(query) = compiler.compile(&request.tree)? {
            body.insert("query".to_string(), query);
        }

        let planner = AggregationPlanner::new(self.config);
        if let Some(aggs) = planner.plan(&request.aggs)? {
            body.insert("aggs".to_string(), aggs);
        }

        let sort_compiler = SortCompiler::new(self.config);
        let sorts = sort_compiler.compile(&request.sorts, request.page.is_some())?;
        if !sorts.is_empty() {
            body.insert("sort".to_string(), Value::Array(sorts));
        }

        if request.aggregations_only {
            body.insert("size".to_string(), json!(0));
        } else if let Some(size) = request.size {
            body.insert("size".to_string(), json!(size));
        }

        match request.page {
            Some(ref page) => {
                body.insert(
                    "pit".to_string(),
                    json!({ "id": page.snapshot_id, "keep_alive": page.keep_alive }),
                );
                if let Some(ref after) = page.after {
                    body.insert("search_after".to_string(), json!(after));
                }
            }
            None => {
                if let Some(from) = request.from {
                    body.insert("from".to_string(), json!(from));
                }
            }
        }

        if let Some(ref highlight) = request.highlight {
            body.insert("highlight".to_string(), Self::compile_highlight(highlight));
        }

        if let Some(min_score) = request.min_score {
            body.insert("min_score".to_string(), json!(min_score));
        }

        if self.config.track_total_hits {
            body.insert("track_total_hits".to_string(), json!(true));
        }

        if let Some(ref routing) = request.routing {
            body.insert("routing".to_string(), json!(routing));
        }

        Ok(Value::Object(body))
    }

    fn compile_highlight(highlight: &HighlightSpec) -> Value {
        let mut fields = Map::new();
        for field in &highlight.fields {
            fields.insert(field.clone(), json!({}));
        }
        let mut body = Map::new();
        body.insert("fields".to_string(), Value::Object(fields));
        if !highlight.pre_tags.is_empty() {
            body.insert("pre_tags".to_string(), json!(highlight.pre_tags));
        }
        if !highlight.post_tags.is_empty() {
            body.insert("post_tags".to_string(), json!(highlight.post_tags));
        }
        Value::Object(body)
    }
}
