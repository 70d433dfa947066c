use serde::{Deserialize, Serialize};

/// Compiler configuration
///
/// Controls policy decisions that are deliberately not hardcoded: guards
/// against expensive sorts, enumeration caps, and snapshot lifetimes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Allow sorting on the internal identity field (`_id`)
    ///
    /// Sorting on `_id` forces the engine to materialize a fielddata view of
    /// the identity field, which is expensive and rarely meaningful. Off by
    /// default; callers who genuinely need it opt in.
    pub allow_id_sort: bool,

    /// Bucket size cap applied when a distinct/group-by request is
    /// desugared into a terms bucket. The cap is always written into the
    /// compiled document so truncation is visible, never implicit.
    pub distinct_size_cap: usize,

    /// Default snapshot lifetime for point-in-time pagination
    pub default_keep_alive: String,

    /// Default page size for chunked iteration
    pub default_page_size: usize,

    /// Ask the engine for an exact total hit count instead of the default
    /// lower-bound estimate
    pub track_total_hits: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            allow_id_sort: false,
            distinct_size_cap: 1000,
            default_keep_alive: "1m".to_string(),
            default_page_size: 1000,
            track_total_hits: false,
        }
    }
}

impl CompilerConfig {
    /// Allow `_id` sorting
    pub fn with_id_sort_allowed(mut self) -> Self {
        self.allow_id_sort = true;
        self
    }

    /// Set the distinct enumeration cap
    pub fn with_distinct_size_cap(mut self, cap: usize) -> Self {
        self.distinct_size_cap = cap;
        self
    }

    /// Set the default snapshot lifetime
    pub fn with_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.default_keep_alive = keep_alive.into();
        self
    }
}
