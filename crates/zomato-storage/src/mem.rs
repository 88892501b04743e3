use crate::eval;
use crate::traits::Gateway;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use zomato_core::{Document, Filter, FindSpec, Result, Stage, Target};

/// Collections held in process, evaluated with the same semantics as the
/// document store. Clones share the underlying data.
#[derive(Clone)]
pub struct InMemoryGateway {
    inner: Arc<RwLock<Inner>>,
    target: Target,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<Target, Vec<Document>>,
}

impl InMemoryGateway {
    pub fn new(target: Target) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            target,
        }
    }

    /// Gateway over `docs` loaded into `target`.
    pub fn with_documents(target: Target, docs: Vec<Document>) -> Self {
        let gw = Self::new(target.clone());
        gw.load(target, docs);
        gw
    }

    /// Replaces the contents of one collection.
    pub fn load(&self, target: Target, docs: Vec<Document>) {
        tracing::debug!(%target, documents = docs.len(), "loading collection");
        self.inner.write().collections.insert(target, docs);
    }

    fn snapshot(&self) -> Vec<Document> {
        self.inner
            .read()
            .collections
            .get(&self.target)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Gateway for InMemoryGateway {
    async fn count(&self, filter: &Filter) -> Result<u64> {
        let inner = self.inner.read();
        let n = inner
            .collections
            .get(&self.target)
            .map(|docs| docs.iter().filter(|d| eval::matches(d, filter)).count())
            .unwrap_or(0);
        Ok(n as u64)
    }

    async fn find_one(&self) -> Result<Option<Document>> {
        let inner = self.inner.read();
        Ok(inner
            .collections
            .get(&self.target)
            .and_then(|docs| docs.first())
            .cloned())
    }

    async fn find(&self, spec: &FindSpec) -> Result<Vec<Document>> {
        let inner = self.inner.read();
        Ok(inner
            .collections
            .get(&self.target)
            .map(|docs| eval::run_find(docs, spec))
            .unwrap_or_default())
    }

    async fn distinct(&self, path: &str) -> Result<Vec<serde_json::Value>> {
        let inner = self.inner.read();
        Ok(inner
            .collections
            .get(&self.target)
            .map(|docs| eval::distinct(docs, path))
            .unwrap_or_default())
    }

    async fn aggregate(&self, pipeline: &[Stage]) -> Result<Vec<Document>> {
        Ok(eval::run_pipeline(self.snapshot(), pipeline))
    }

    fn target(&self) -> &Target {
        &self.target
    }

    fn with_target(&self, target: Target) -> Box<dyn Gateway> {
        Box::new(Self {
            inner: self.inner.clone(),
            target,
        })
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use zomato_core::{QuerySpec, VALUE_KEY};

    fn doc(v: serde_json::Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn unknown_collection_reads_as_empty() {
        let gw = InMemoryGateway::new(Target::new("zomato", "nothing"));
        assert_eq!(gw.count(&Filter::All).await.unwrap(), 0);
        assert!(gw.find_one().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn retarget_shares_loaded_data() {
        let gw = InMemoryGateway::with_documents(
            Target::new("zomato", "a"),
            vec![doc(json!({"name": "A"}))],
        );
        gw.load(Target::new("zomato", "b"), vec![doc(json!({"name": "B"})), doc(json!({}))]);
        let other = gw.with_target(Target::new("zomato", "b"));
        assert_eq!(other.count(&Filter::All).await.unwrap(), 2);
        assert_eq!(other.target().collection, "b");
        assert_eq!(gw.count(&Filter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn count_and_distinct_come_back_as_value_rows() {
        let gw = InMemoryGateway::with_documents(
            Target::new("zomato", "r"),
            vec![doc(json!({"l": "x"})), doc(json!({"l": "y"})), doc(json!({"l": "x"}))],
        );
        let rows = gw.execute(&QuerySpec::Count { filter: Filter::All }).await.unwrap();
        assert_eq!(rows[0][VALUE_KEY], json!(3));
        let rows = gw
            .execute(&QuerySpec::Distinct { path: "l".into() })
            .await
            .unwrap();
        let values: Vec<_> = rows.iter().map(|r| r[VALUE_KEY].clone()).collect();
        assert_eq!(values, vec![json!("x"), json!("y")]);
    }
}
