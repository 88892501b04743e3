use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExplorerError {
    #[error("connection failed: {0}")]
    ConnectionFailure(String),
    #[error("collection `{collection}` is empty; nothing to detect fields from")]
    EmptyCollection { collection: String },
    #[error("field `{field}` could not be detected in the sample document; `{query}` is unavailable")]
    FieldUnavailable { field: String, query: String },
    #[error("parameter `{param}` = {value} is out of range (expected {expected})")]
    ParameterOutOfRange {
        param: String,
        value: String,
        expected: String,
    },
    #[error("value {value} at `{path}` is not numeric")]
    CoercionFailure { path: String, value: String },
    #[error("unknown query `{0}` (use a number 1-10 or a slug)")]
    UnknownQuery(String),
    #[error("unknown analytics panel `{0}`")]
    UnknownPanel(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("data file error: {0}")]
    Data(String),
}

impl ExplorerError {
    /// Short machine-readable tag, used in API bodies and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ExplorerError::ConnectionFailure(_) => "connection_failure",
            ExplorerError::EmptyCollection { .. } => "empty_collection",
            ExplorerError::FieldUnavailable { .. } => "field_unavailable",
            ExplorerError::ParameterOutOfRange { .. } => "parameter_out_of_range",
            ExplorerError::CoercionFailure { .. } => "coercion_failure",
            ExplorerError::UnknownQuery(_) => "unknown_query",
            ExplorerError::UnknownPanel(_) => "unknown_panel",
            ExplorerError::Store(_) => "store",
            ExplorerError::Data(_) => "data",
        }
    }
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
