use serde_json::json;
use zomato_core::{Document, Filter, FindSpec, QuerySpec, Result, Stage, Target, VALUE_KEY};

/// Read-only access to one document store. Every call is a single round trip
/// against the current target collection.
#[async_trait::async_trait]
pub trait Gateway: Send + Sync + 'static {
    /// Number of documents matching `filter`.
    async fn count(&self, filter: &Filter) -> Result<u64>;
    /// First document in natural order, if any.
    async fn find_one(&self) -> Result<Option<Document>>;
    async fn find(&self, spec: &FindSpec) -> Result<Vec<Document>>;
    /// Distinct values at `path`, array values flattened.
    async fn distinct(&self, path: &str) -> Result<Vec<serde_json::Value>>;
    async fn aggregate(&self, pipeline: &[Stage]) -> Result<Vec<Document>>;

    fn target(&self) -> &Target;
    /// Same backend and connection, pointed at another collection.
    fn with_target(&self, target: Target) -> Box<dyn Gateway>;
    /// Short backend name for logs and metrics ("mongo", "memory").
    fn backend(&self) -> &'static str;

    /// Store-native rendering of `spec`, for explain output.
    fn describe(&self, spec: &QuerySpec) -> serde_json::Value {
        serde_json::to_value(spec).unwrap_or(serde_json::Value::Null)
    }

    /// Runs a built query and returns its raw rows. `Distinct` and `Count`
    /// results are wrapped as `{"value": ..}` rows.
    async fn execute(&self, spec: &QuerySpec) -> Result<Vec<Document>> {
        match spec {
            QuerySpec::Find(find) => self.find(find).await,
            QuerySpec::FindOne => Ok(self.find_one().await?.into_iter().collect()),
            QuerySpec::Distinct { path } => Ok(self
                .distinct(path)
                .await?
                .into_iter()
                .map(value_row)
                .collect()),
            QuerySpec::Count { filter } => Ok(vec![value_row(json!(self.count(filter).await?))]),
            QuerySpec::Aggregate { pipeline } => self.aggregate(pipeline).await,
        }
    }
}

pub(crate) fn value_row(v: serde_json::Value) -> Document {
    let mut row = Document::new();
    row.insert(VALUE_KEY.to_string(), v);
    row
}
