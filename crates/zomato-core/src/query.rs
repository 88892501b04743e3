//! Store-agnostic query representation.
//!
//! The builder only ever produces these values; each gateway translates them
//! into its own calls.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Key under which `Distinct` values and the `Count` total come back as rows.
pub const VALUE_KEY: &str = "value";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CmpOp {
    Gt,
    Gte,
    Lte,
}

impl CmpOp {
    pub fn eval(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Gt => lhs > rhs,
            CmpOp::Gte => lhs >= rhs,
            CmpOp::Lte => lhs <= rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    All,
    /// Path holds an array with at least one element.
    NonEmptyArray(String),
    /// Path holds a value that coerces to a number.
    Coercible(String),
    /// Numeric comparison after coercion; non-coercible values never match.
    Compare { path: String, op: CmpOp, value: f64 },
    /// Value (or any element of an array value) is one of `values`.
    In { path: String, values: Vec<JsonValue> },
    /// Value (or any element of an array value) equals `value`.
    Eq { path: String, value: JsonValue },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Field(String),
    Literal(JsonValue),
    /// Array length; 0 for anything that is not an array.
    Size(Box<Expr>),
    /// Numeric coercion; null when the value does not coerce.
    ToDouble(Box<Expr>),
    /// Null when either side is null or the divisor is zero.
    Divide(Box<Expr>, Box<Expr>),
    Round(Box<Expr>, u32),
    /// Picks `path` out of every element of an array.
    MapField { input: Box<Expr>, path: String },
    /// Calendar month (1-12) of a date-like value; null when unparseable.
    Month(Box<Expr>),
}

impl Expr {
    pub fn field(path: impl Into<String>) -> Self {
        Expr::Field(path.into())
    }

    pub fn size(self) -> Self {
        Expr::Size(Box::new(self))
    }

    pub fn to_double(self) -> Self {
        Expr::ToDouble(Box::new(self))
    }

    pub fn round(self, places: u32) -> Self {
        Expr::Round(Box::new(self), places)
    }

    pub fn divide(self, by: Expr) -> Self {
        Expr::Divide(Box::new(self), Box::new(by))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accumulator {
    Count,
    Sum(Expr),
    /// Mean of numeric values; non-numeric and null inputs are skipped.
    Avg(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Match(Filter),
    /// Output holds exactly the listed keys; `_id` only when listed.
    Project(Vec<(String, Expr)>),
    Group {
        key: Expr,
        fields: Vec<(String, Accumulator)>,
    },
    AddFields(Vec<(String, Expr)>),
    Sort(Vec<(String, SortOrder)>),
    Skip(u64),
    Limit(u64),
    Unwind(String),
    /// Lower-inclusive, upper-exclusive buckets; `_id` is the lower bound or
    /// `default` for values outside every bucket.
    Bucket {
        group_by: Expr,
        boundaries: Vec<f64>,
        default: String,
        output: Vec<(String, Accumulator)>,
    },
    /// Independent sub-pipelines over the same input; yields one document.
    Facet(Vec<(String, Vec<Stage>)>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindSpec {
    pub filter: Filter,
    /// Dotted paths to keep; `_id` is always dropped. Empty keeps everything.
    pub projection: Vec<String>,
    pub sort: Vec<(String, SortOrder)>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindSpec {
    pub fn new(filter: Filter, projection: Vec<String>) -> Self {
        Self {
            filter,
            projection,
            sort: Vec::new(),
            skip: 0,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QuerySpec {
    Find(FindSpec),
    FindOne,
    Distinct { path: String },
    Count { filter: Filter },
    Aggregate { pipeline: Vec<Stage> },
}
