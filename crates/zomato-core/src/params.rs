use crate::catalog::QueryDescriptor;
use crate::{ExplorerError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamName {
    MinRating,
    MaxCost,
    Skip,
    Limit,
}

impl ParamName {
    pub fn parse(s: &str) -> Option<ParamName> {
        match s {
            "min_rating" => Some(ParamName::MinRating),
            "max_cost" => Some(ParamName::MaxCost),
            "skip" => Some(ParamName::Skip),
            "limit" => Some(ParamName::Limit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamName::MinRating => "min_rating",
            ParamName::MaxCost => "max_cost",
            ParamName::Skip => "skip",
            ParamName::Limit => "limit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamKind {
    Float { min: f64, max: f64 },
    Integer { min: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: ParamName,
    pub label: &'static str,
    #[serde(flatten)]
    pub kind: ParamKind,
}

impl ParamSpec {
    fn expected(&self) -> String {
        match self.kind {
            ParamKind::Float { min, max } => format!("a number between {min} and {max}"),
            ParamKind::Integer { min } => format!("an integer >= {min}"),
        }
    }

    fn out_of_range(&self, value: impl ToString) -> ExplorerError {
        ExplorerError::ParameterOutOfRange {
            param: self.name.as_str().to_string(),
            value: value.to_string(),
            expected: self.expected(),
        }
    }

    fn check_float(&self, value: f64) -> Result<f64> {
        match self.kind {
            ParamKind::Float { min, max } if value.is_finite() && value >= min && value <= max => {
                Ok(value)
            }
            _ => Err(self.out_of_range(value)),
        }
    }

    fn check_int(&self, value: i64) -> Result<i64> {
        match self.kind {
            ParamKind::Integer { min } if value >= min => Ok(value),
            _ => Err(self.out_of_range(value)),
        }
    }
}

/// Unvalidated user input; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawParams {
    #[serde(default)]
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub max_cost: Option<i64>,
    #[serde(default)]
    pub skip: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl RawParams {
    pub fn is_empty(&self) -> bool {
        self == &RawParams::default()
    }

    /// Strict reading of a JSON request body. Unknown keys and values of the
    /// wrong type are rejected naming the parameter; `null` leaves it unset.
    pub fn from_json(body: &serde_json::Value) -> Result<RawParams> {
        let Some(fields) = body.as_object() else {
            return Err(ExplorerError::ParameterOutOfRange {
                param: "body".into(),
                value: body.to_string(),
                expected: "a JSON object of parameters".into(),
            });
        };
        let mut raw = RawParams::default();
        for (key, value) in fields {
            let name = ParamName::parse(key).ok_or_else(|| ExplorerError::ParameterOutOfRange {
                param: key.clone(),
                value: value.to_string(),
                expected: "one of min_rating, max_cost, skip, limit".into(),
            })?;
            if value.is_null() {
                continue;
            }
            let wrong_type = |expected: &str| ExplorerError::ParameterOutOfRange {
                param: key.clone(),
                value: value.to_string(),
                expected: expected.into(),
            };
            match name {
                ParamName::MinRating => {
                    raw.min_rating = Some(value.as_f64().ok_or_else(|| wrong_type("a number"))?)
                }
                ParamName::MaxCost => {
                    raw.max_cost = Some(value.as_i64().ok_or_else(|| wrong_type("an integer"))?)
                }
                ParamName::Skip => {
                    raw.skip = Some(value.as_i64().ok_or_else(|| wrong_type("an integer"))?)
                }
                ParamName::Limit => {
                    raw.limit = Some(value.as_i64().ok_or_else(|| wrong_type("an integer"))?)
                }
            }
        }
        Ok(raw)
    }
}

/// Validated parameter values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Params {
    pub min_rating: f64,
    pub max_cost: i64,
    pub skip: u64,
    pub limit: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            min_rating: 4.0,
            max_cost: 1500,
            skip: 10,
            limit: 5,
        }
    }
}

impl Params {
    /// Returns a copy with the descriptor's declared parameters overridden by
    /// `raw`. Values for undeclared parameters are ignored. On error `self`
    /// is untouched, so callers keep the last valid values.
    pub fn apply(&self, descriptor: &QueryDescriptor, raw: &RawParams) -> Result<Params> {
        let mut next = self.clone();
        for spec in descriptor.params {
            match spec.name {
                ParamName::MinRating => {
                    if let Some(v) = raw.min_rating {
                        next.min_rating = spec.check_float(v)?;
                    }
                }
                ParamName::MaxCost => {
                    if let Some(v) = raw.max_cost {
                        next.max_cost = spec.check_int(v)?;
                    }
                }
                ParamName::Skip => {
                    if let Some(v) = raw.skip {
                        next.skip = spec.check_int(v)? as u64;
                    }
                }
                ParamName::Limit => {
                    if let Some(v) = raw.limit {
                        next.limit = spec.check_int(v)? as u64;
                    }
                }
            }
        }
        Ok(next)
    }

    /// Current values of the parameters `descriptor` declares.
    pub fn declared(&self, descriptor: &QueryDescriptor) -> serde_json::Map<String, serde_json::Value> {
        let mut out = serde_json::Map::new();
        for spec in descriptor.params {
            let v = match spec.name {
                ParamName::MinRating => serde_json::json!(self.min_rating),
                ParamName::MaxCost => serde_json::json!(self.max_cost),
                ParamName::Skip => serde_json::json!(self.skip),
                ParamName::Limit => serde_json::json!(self.limit),
            };
            out.insert(spec.name.as_str().to_string(), v);
        }
        out
    }

    /// Stable key over the declared parameters, for result memoization.
    pub fn cache_key(&self, descriptor: &QueryDescriptor) -> String {
        serde_json::Value::Object(self.declared(descriptor)).to_string()
    }
}
