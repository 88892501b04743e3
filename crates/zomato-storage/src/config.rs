use crate::mem::InMemoryGateway;
use crate::mongo::MongoGateway;
use crate::session::DEFAULT_CACHE_ENTRIES;
use crate::snapshot::read_documents;
use crate::traits::Gateway;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use zomato_core::{Result, Target};

pub const DEFAULT_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_DB: &str = "zomato";
pub const DEFAULT_COLLECTION: &str = "zomatoo";

#[derive(Debug, Clone, PartialEq)]
pub struct ExplorerConfig {
    pub uri: String,
    pub target: Target,
    /// When set, documents come from this file instead of the store.
    pub data_file: Option<PathBuf>,
    pub connect_timeout: Duration,
    pub result_cache: bool,
    /// Upper bound on memoized query outputs.
    pub cache_entries: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            target: Target::new(DEFAULT_DB, DEFAULT_COLLECTION),
            data_file: None,
            connect_timeout: Duration::from_millis(5000),
            result_cache: false,
            cache_entries: DEFAULT_CACHE_ENTRIES,
        }
    }
}

fn env_flag(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl ExplorerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(uri) = get("MONGO_URI") {
            cfg.uri = uri;
        }
        if let Some(db) = get("DB_NAME") {
            cfg.target.database = db;
        }
        if let Some(coll) = get("COLLECTION_NAME") {
            cfg.target.collection = coll;
        }
        cfg.data_file = get("DATA_FILE").filter(|s| !s.is_empty()).map(PathBuf::from);
        if let Some(ms) = get("CONNECT_TIMEOUT_MS").and_then(|s| s.parse::<u64>().ok()) {
            cfg.connect_timeout = Duration::from_millis(ms);
        }
        cfg.result_cache = get("RESULT_CACHE").is_some_and(|v| env_flag(&v));
        if let Some(n) = get("RESULT_CACHE_ENTRIES").and_then(|s| s.parse::<usize>().ok()) {
            cfg.cache_entries = n;
        }
        cfg
    }
}

/// Builds the gateway the config asks for: in-memory over a data file, or
/// the document store at `uri`.
pub async fn connect(cfg: &ExplorerConfig) -> Result<Arc<dyn Gateway>> {
    match &cfg.data_file {
        Some(path) => {
            let docs = read_documents(path)?;
            Ok(Arc::new(InMemoryGateway::with_documents(cfg.target.clone(), docs)))
        }
        None => {
            let gw = MongoGateway::connect(&cfg.uri, cfg.target.clone(), cfg.connect_timeout).await?;
            Ok(Arc::new(gw))
        }
    }
}
