//! Cuttle - query compiler and response processor for document search engines
//!
//! Cuttle turns an abstract condition/aggregation/sort model into the JSON
//! query DSL of an Elasticsearch-compatible search engine, and turns the
//! engine's nested response back into flat documents and flat aggregation
//! rows. It performs no I/O of its own: the [`paginate::Transport`] trait is
//! the only boundary to the network, and both directions of the
//! transformation are stateless and referentially transparent.

pub mod aggs;
pub mod compile;
pub mod condition;
pub mod config;
pub mod error;
pub mod fields;
pub mod paginate;
pub mod request;
pub mod response;
pub mod sort;

pub use aggs::{
    AggSpec, AggregationPlanner, BucketOrder, BucketSpec, CompositeSource, MetricKind, MetricSpec,
    RangeBand,
};
pub use compile::QueryCompiler;
pub use condition::{Condition, ConditionTree, Connective, Operand, Operator};
pub use config::CompilerConfig;
pub use error::{CuttleError, Result};
pub use fields::{ExactCapability, FieldCaps, NativeFieldCaps, StaticFieldCaps};
pub use paginate::{each_page, PageState, Transport};
pub use request::{HighlightSpec, SearchRequest, SelectCompiler};
pub use response::{
    AggRow, Continuation, FlatDocument, MetricValues, ProcessedResponse, ResponseProcessor,
};
pub use sort::{GeoAnchor, MissingPolicy, SortCompiler, SortMode, SortOrder, SortSpec};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
