//! Snapshot pagination
//!
//! Deep pagination replaces offset paging with an engine-issued snapshot
//! handle plus the prior page's last-row sort values. The snapshot state
//! is an immutable value threaded through every page call, and the driver
//! always releases the snapshot on loop exit - normal completion, early
//! stop, and error alike. Leaked snapshots hold engine resources until
//! their lifetime expires.

use crate::config::CompilerConfig;
use crate::error::{CuttleError, Result};
use crate::fields::FieldCaps;
use crate::request::{SearchRequest, SelectCompiler};
use crate::response::{Continuation, FlatDocument, ResponseProcessor};
use serde_json::Value;
use std::ops::ControlFlow;
use tracing::debug;

/// Boundary to the engine; implementations live outside this crate
///
/// The compiler never retries: transport failures propagate unchanged and
/// retry policy belongs to the implementation behind this trait.
pub trait Transport {
    /// Execute a compiled query document and return the raw response
    fn execute(&self, body: &Value) -> Result<Value>;

    /// Open a consistent snapshot over an index, returning its handle
    fn open_snapshot(&self, index: &str, keep_alive: &str) -> Result<String>;

    /// Release a snapshot; returns whether the engine still knew the handle
    fn close_snapshot(&self, snapshot_id: &str) -> Result<bool>;
}

/// Immutable snapshot-pagination state
///
/// Created when the snapshot opens, advanced by value after every page,
/// never mutated in place on a shared builder.
#[derive(Clone, Debug, PartialEq)]
pub struct PageState {
    /// Engine-issued opaque snapshot handle
    pub snapshot_id: String,
    /// Snapshot lifetime, refreshed on every page request
    pub keep_alive: String,
    /// Sort values of the previous page's last row
    pub after: Option<Vec<Value>>,
}

impl PageState {
    pub fn new(snapshot_id: impl Into<String>, keep_alive: impl Into<String>) -> Self {
        Self {
            snapshot_id: snapshot_id.into(),
            keep_alive: keep_alive.into(),
            after: None,
        }
    }

    /// The state for the next page, resuming after the given sort values
    pub fn advanced(&self, after: Vec<Value>) -> Self {
        Self {
            snapshot_id: self.snapshot_id.clone(),
            keep_alive: self.keep_alive.clone(),
            after: Some(after),
        }
    }

    /// The same position under a rotated snapshot handle
    ///
    /// Engines may return a fresh handle with every page; subsequent
    /// requests must carry the latest one.
    pub fn with_snapshot_id(&self, snapshot_id: impl Into<String>) -> Self {
        Self {
            snapshot_id: snapshot_id.into(),
            keep_alive: self.keep_alive.clone(),
            after: self.after.clone(),
        }
    }
}

/// Iterate a request in fixed-size pages through one snapshot
///
/// Opens a snapshot, feeds each page of flat documents to the callback,
/// and stops when a page comes back short or the callback breaks. The
/// snapshot is closed on every exit path. Returns the number of documents
/// fetched.
pub fn each_page<T, F>(
    transport: &T,
    config: &CompilerConfig,
    caps: &dyn FieldCaps,
    request: &SearchRequest,
    page_size: usize,
    mut on_page: F,
) -> Result<u64>
where
    T: Transport + ?Sized,
    F: FnMut(&[FlatDocument]) -> ControlFlow<()>,
{
    let keep_alive = config.default_keep_alive.clone();
    let snapshot_id = transport.open_snapshot(&request.index, &keep_alive)?;
    let mut state = PageState::new(snapshot_id, keep_alive);

    let outcome = drive_pages(
        transport,
        config,
        caps,
        request,
        page_size,
        &mut state,
        &mut on_page,
    );

    // Release the snapshot whatever happened inside the loop
    let closed = transport.close_snapshot(&state.snapshot_id);
    let fetched = outcome?;
    closed?;
    Ok(fetched)
}

fn drive_pages<T, F>(
    transport: &T,
    config: &CompilerConfig,
    caps: &dyn FieldCaps,
    request: &SearchRequest,
    page_size: usize,
    state: &mut PageState,
    on_page: &mut F,
) -> Result<u64>
where
    T: Transport + ?Sized,
    F: FnMut(&[FlatDocument]) -> ControlFlow<()>,
{
    let compiler = SelectCompiler::new(config, caps);
    let mut fetched = 0u64;

    loop {
        let page_request = request
            .clone()
            .with_size(page_size as u64)
            .with_page(state.clone());
        let body = compiler.compile(&page_request)?;
        let raw = transport.execute(&body)?;

        if let Some(rotated) = raw.get("pit_id").and_then(|id| id.as_str()) {
            *state = state.with_snapshot_id(rotated);
        }

        let processed = ResponseProcessor::without_aggregations().process(&raw)?;
        let count = processed.docs.len();
        fetched += count as u64;
        debug!(page_docs = count, fetched, "fetched snapshot page");

        let stopped = matches!(on_page(&processed.docs), ControlFlow::Break(()));
        if stopped || count < page_size {
            return Ok(fetched);
        }

        match processed.continuation {
            Some(Continuation::SearchAfter(after)) => *state = state.advanced(after),
            _ => {
                return Err(CuttleError::Query {
                    reason: "page response carried no sort values to resume from".to_string(),
                    details: Value::Null,
                })
            }
        }
    }
}
