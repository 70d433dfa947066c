//! Operator catalog
//!
//! The closed set of supported predicate operators and their per-family
//! option structs. Operator names arriving from the intent-accumulation
//! layer are resolved through [`Operator::from_str`]; an unknown name is a
//! parameter error, never silently ignored.

use crate::error::{CuttleError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// A predicate operator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Between,
    NotBetween,
    In,
    NotIn,
    Exists,
    NotExists,
    Like,
    NotLike,
    Regex,
    Phrase,
    Exact,
    Fuzzy,
    Nested,
    NotNested,
    InnerNested,
    Group,
    Script,
    GeoDistance,
    GeoBoundingBox,
    MultiMatch,
    QueryString,
}

impl Operator {
    /// Whether this operator carries built-in negation
    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            Operator::Ne
                | Operator::NotBetween
                | Operator::NotIn
                | Operator::NotExists
                | Operator::NotLike
                | Operator::NotNested
        )
    }

    /// The positive core this operator compiles through
    ///
    /// Negative operators compile their positive counterpart and are then
    /// wrapped in a `must_not` clause by the compiler.
    pub fn positive_form(&self) -> Operator {
        match self {
            Operator::Ne => Operator::Eq,
            Operator::NotBetween => Operator::Between,
            Operator::NotIn => Operator::In,
            Operator::NotExists => Operator::Exists,
            Operator::NotLike => Operator::Like,
            Operator::NotNested => Operator::Nested,
            other => *other,
        }
    }

    /// Canonical operator name, used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Between => "between",
            Operator::NotBetween => "not between",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::Exists => "exists",
            Operator::NotExists => "not exists",
            Operator::Like => "like",
            Operator::NotLike => "not like",
            Operator::Regex => "regex",
            Operator::Phrase => "phrase",
            Operator::Exact => "exact",
            Operator::Fuzzy => "fuzzy",
            Operator::Nested => "nested",
            Operator::NotNested => "not nested",
            Operator::InnerNested => "inner nested",
            Operator::Group => "group",
            Operator::Script => "script",
            Operator::GeoDistance => "geo distance",
            Operator::GeoBoundingBox => "geo box",
            Operator::MultiMatch => "multi match",
            Operator::QueryString => "query string",
        }
    }
}

impl FromStr for Operator {
    type Err = CuttleError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "=" | "==" | "eq" => Ok(Operator::Eq),
            "!=" | "<>" | "ne" => Ok(Operator::Ne),
            "<" | "lt" => Ok(Operator::Lt),
            "<=" | "lte" => Ok(Operator::Lte),
            ">" | "gt" => Ok(Operator::Gt),
            ">=" | "gte" => Ok(Operator::Gte),
            "between" => Ok(Operator::Between),
            "not between" | "not_between" => Ok(Operator::NotBetween),
            "in" => Ok(Operator::In),
            "not in" | "not_in" | "nin" => Ok(Operator::NotIn),
            "exists" => Ok(Operator::Exists),
            "not exists" | "not_exists" => Ok(Operator::NotExists),
            "like" => Ok(Operator::Like),
            "not like" | "not_like" => Ok(Operator::NotLike),
            "regex" | "regexp" => Ok(Operator::Regex),
            "phrase" | "match_phrase" => Ok(Operator::Phrase),
            "exact" | "term" => Ok(Operator::Exact),
            "fuzzy" => Ok(Operator::Fuzzy),
            "nested" => Ok(Operator::Nested),
            "not nested" | "not_nested" => Ok(Operator::NotNested),
            "inner nested" | "inner_nested" => Ok(Operator::InnerNested),
            "group" => Ok(Operator::Group),
            "script" => Ok(Operator::Script),
            "geo_distance" | "geo distance" => Ok(Operator::GeoDistance),
            "geo_box" | "geo_bounding_box" => Ok(Operator::GeoBoundingBox),
            "multi_match" | "multi match" => Ok(Operator::MultiMatch),
            "query_string" | "query string" => Ok(Operator::QueryString),
            _ => Err(CuttleError::parameter(format!("unknown operator: {s}"))),
        }
    }
}

/// Operator for combining analyzed terms in full-text matching
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOperator {
    And,
    #[default]
    Or,
}

impl MatchOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOperator::And => "and",
            MatchOperator::Or => "or",
        }
    }
}

/// Edit-distance budget for fuzzy matching
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fuzziness {
    /// Engine-chosen distance based on term length
    Auto,
    /// Fixed edit distance
    Distance(u32),
}

impl Fuzziness {
    pub fn to_value(self) -> Value {
        match self {
            Fuzziness::Auto => Value::String("AUTO".to_string()),
            Fuzziness::Distance(d) => Value::from(d),
        }
    }
}

/// How a nested query folds inner-document scores into the parent score
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScoreMode {
    #[default]
    Avg,
    Max,
    Min,
    Sum,
    None,
}

impl ScoreMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreMode::Avg => "avg",
            ScoreMode::Max => "max",
            ScoreMode::Min => "min",
            ScoreMode::Sum => "sum",
            ScoreMode::None => "none",
        }
    }
}

/// How malformed geo coordinates are treated
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValidationMethod {
    #[default]
    Strict,
    Coerce,
    IgnoreMalformed,
}

impl ValidationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMethod::Strict => "STRICT",
            ValidationMethod::Coerce => "COERCE",
            ValidationMethod::IgnoreMalformed => "IGNORE_MALFORMED",
        }
    }
}

/// Multi-field matching variant
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MultiMatchKind {
    #[default]
    BestFields,
    MostFields,
    CrossFields,
    Phrase,
    PhrasePrefix,
    BoolPrefix,
}

impl MultiMatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MultiMatchKind::BestFields => "best_fields",
            MultiMatchKind::MostFields => "most_fields",
            MultiMatchKind::CrossFields => "cross_fields",
            MultiMatchKind::Phrase => "phrase",
            MultiMatchKind::PhrasePrefix => "phrase_prefix",
            MultiMatchKind::BoolPrefix => "bool_prefix",
        }
    }
}

/// Options for `match` and `phrase` operators
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchOptions {
    pub operator: Option<MatchOperator>,
    pub minimum_should_match: Option<String>,
    /// Token-position tolerance for phrase matching
    pub slop: Option<u32>,
    pub boost: Option<f32>,
}

impl MatchOptions {
    pub fn with_operator(mut self, operator: MatchOperator) -> Self {
        self.operator = Some(operator);
        self
    }

    pub fn with_slop(mut self, slop: u32) -> Self {
        self.slop = Some(slop);
        self
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = Some(boost);
        self
    }
}

/// Options for the `fuzzy` operator
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FuzzyOptions {
    pub fuzziness: Option<Fuzziness>,
    pub prefix_length: Option<u32>,
    pub max_expansions: Option<u32>,
    pub boost: Option<f32>,
}

impl FuzzyOptions {
    pub fn with_fuzziness(mut self, fuzziness: Fuzziness) -> Self {
        self.fuzziness = Some(fuzziness);
        self
    }

    pub fn with_prefix_length(mut self, prefix_length: u32) -> Self {
        self.prefix_length = Some(prefix_length);
        self
    }

    pub fn with_max_expansions(mut self, max_expansions: u32) -> Self {
        self.max_expansions = Some(max_expansions);
        self
    }
}

/// Options for `nested` and `inner nested` operators
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NestedOptions {
    pub score_mode: Option<ScoreMode>,
    pub ignore_unmapped: bool,
    /// Name for the returned inner-hit section; defaults to the path
    pub inner_hits_name: Option<String>,
    pub inner_hits_size: Option<u32>,
}

impl NestedOptions {
    pub fn with_score_mode(mut self, score_mode: ScoreMode) -> Self {
        self.score_mode = Some(score_mode);
        self
    }

    pub fn with_inner_hits_size(mut self, size: u32) -> Self {
        self.inner_hits_size = Some(size);
        self
    }
}

/// Options for geo operators
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeoOptions {
    /// Distance with unit (e.g. `"10km"`); required for geo-distance
    pub distance: Option<String>,
    pub validation_method: Option<ValidationMethod>,
    pub distance_type: Option<String>,
}

impl GeoOptions {
    pub fn distance(distance: impl Into<String>) -> Self {
        Self {
            distance: Some(distance.into()),
            ..Default::default()
        }
    }

    pub fn with_validation_method(mut self, method: ValidationMethod) -> Self {
        self.validation_method = Some(method);
        self
    }
}

/// Options for the `script` operator
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScriptOptions {
    pub lang: Option<String>,
    /// Bound parameters, passed to the engine opaquely
    pub params: Option<Value>,
}

impl ScriptOptions {
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }
}

/// Options for the `multi match` operator
///
/// Field names support a per-field boost suffix (`"title^3"`), passed to
/// the engine verbatim.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiMatchOptions {
    pub fields: Vec<String>,
    pub kind: MultiMatchKind,
    pub operator: Option<MatchOperator>,
    pub tie_breaker: Option<f32>,
    pub boost: Option<f32>,
}

impl MultiMatchOptions {
    pub fn fields(fields: Vec<String>) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: MultiMatchKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Options for the `query string` operator
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryStringOptions {
    pub fields: Vec<String>,
    pub default_operator: Option<MatchOperator>,
    pub fuzziness: Option<Fuzziness>,
    pub minimum_should_match: Option<String>,
    pub phrase_slop: Option<u32>,
    pub allow_leading_wildcard: Option<bool>,
    pub lenient: Option<bool>,
    pub boost: Option<f32>,
}

impl QueryStringOptions {
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_default_operator(mut self, operator: MatchOperator) -> Self {
        self.default_operator = Some(operator);
        self
    }
}

/// Operator-specific options, tagged by operator family
///
/// Attaching options of the wrong family to a condition is a parameter
/// error at compile time, not a silent ignore.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum OperatorOptions {
    #[default]
    None,
    Match(MatchOptions),
    Fuzzy(FuzzyOptions),
    Nested(NestedOptions),
    Geo(GeoOptions),
    Script(ScriptOptions),
    MultiMatch(MultiMatchOptions),
    QueryString(QueryStringOptions),
}

impl OperatorOptions {
    /// Options for match/phrase compilation; defaults when absent
    pub fn expect_match(&self, operator: Operator) -> Result<MatchOptions> {
        match self {
            OperatorOptions::None => Ok(MatchOptions::default()),
            OperatorOptions::Match(opts) => Ok(opts.clone()),
            _ => Err(Self::mismatch(operator, "match")),
        }
    }

    pub fn expect_fuzzy(&self, operator: Operator) -> Result<FuzzyOptions> {
        match self {
            OperatorOptions::None => Ok(FuzzyOptions::default()),
            OperatorOptions::Fuzzy(opts) => Ok(opts.clone()),
            _ => Err(Self::mismatch(operator, "fuzzy")),
        }
    }

    pub fn expect_nested(&self, operator: Operator) -> Result<NestedOptions> {
        match self {
            OperatorOptions::None => Ok(NestedOptions::default()),
            OperatorOptions::Nested(opts) => Ok(opts.clone()),
            _ => Err(Self::mismatch(operator, "nested")),
        }
    }

    pub fn expect_geo(&self, operator: Operator) -> Result<GeoOptions> {
        match self {
            OperatorOptions::None => Ok(GeoOptions::default()),
            OperatorOptions::Geo(opts) => Ok(opts.clone()),
            _ => Err(Self::mismatch(operator, "geo")),
        }
    }

    pub fn expect_script(&self, operator: Operator) -> Result<ScriptOptions> {
        match self {
            OperatorOptions::None => Ok(ScriptOptions::default()),
            OperatorOptions::Script(opts) => Ok(opts.clone()),
            _ => Err(Self::mismatch(operator, "script")),
        }
    }

    pub fn expect_multi_match(&self, operator: Operator) -> Result<MultiMatchOptions> {
        match self {
            OperatorOptions::MultiMatch(opts) => Ok(opts.clone()),
            OperatorOptions::None => Err(CuttleError::parameter(format!(
                "operator '{}' requires multi-match options with a field list",
                operator.name()
            ))),
            _ => Err(Self::mismatch(operator, "multi-match")),
        }
    }

    pub fn expect_query_string(&self, operator: Operator) -> Result<QueryStringOptions> {
        match self {
            OperatorOptions::None => Ok(QueryStringOptions::default()),
            OperatorOptions::QueryString(opts) => Ok(opts.clone()),
            _ => Err(Self::mismatch(operator, "query-string")),
        }
    }

    fn mismatch(operator: Operator, family: &str) -> CuttleError {
        CuttleError::parameter(format!(
            "operator '{}' accepts {family} options only",
            operator.name()
        ))
    }
}
