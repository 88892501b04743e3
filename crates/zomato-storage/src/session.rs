//! One explorer session: a gateway, the sample it was resolved from, the
//! detected field map and the current parameter values.

use crate::traits::Gateway;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use prometheus::{register_histogram_vec, HistogramVec};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use zomato_core::analytics::{build_panel, panels, shape_panel, Panel, PanelDescriptor};
use zomato_core::catalog::{descriptor, menu, unavailable, QueryDescriptor, QueryId};
use zomato_core::params::{Params, RawParams};
use zomato_core::{
    build, resolve, shape, Diagnostic, Document, ExplorerError, FieldMap, Filter, QueryOutput,
    QuerySpec, Resolution, Result, SemanticField, Target,
};

static GATEWAY_OP_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "explorer_gateway_op_seconds",
        "Gateway round-trip latency",
        &["backend", "op"]
    )
    .unwrap()
});

fn op_name(spec: &QuerySpec) -> &'static str {
    match spec {
        QuerySpec::Find(_) => "find",
        QuerySpec::FindOne => "find_one",
        QuerySpec::Distinct { .. } => "distinct",
        QuerySpec::Count { .. } => "count",
        QuerySpec::Aggregate { .. } => "aggregate",
    }
}

pub const DEFAULT_CACHE_ENTRIES: usize = 64;

/// Memoized outputs keyed by query and parameter values. Once `capacity`
/// entries are held the oldest one is evicted.
struct ResultCache {
    capacity: usize,
    entries: HashMap<String, QueryOutput>,
    order: VecDeque<String>,
}

impl ResultCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, key: &str) -> Option<QueryOutput> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: String, out: QueryOutput) {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = out;
            return;
        }
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else { break };
            self.entries.remove(&oldest);
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, out);
    }
}

/// Built query plus the form the store actually runs.
#[derive(Debug, Clone, Serialize)]
pub struct Explain {
    pub query: QueryId,
    pub spec: QuerySpec,
    pub native: serde_json::Value,
}

pub struct Session {
    gateway: Arc<dyn Gateway>,
    sample: Document,
    resolution: Resolution,
    total: u64,
    params: Params,
    cache: Option<Mutex<ResultCache>>,
}

impl Session {
    /// Probes the store, fetches one sample document and resolves the field
    /// map from it. Any failure of the probe is a connection failure.
    pub async fn open(gateway: Arc<dyn Gateway>, result_cache: bool) -> Result<Session> {
        let target = gateway.target().clone();
        let total = gateway.count(&Filter::All).await.map_err(|e| match e {
            ExplorerError::ConnectionFailure(_) => e,
            other => ExplorerError::ConnectionFailure(other.to_string()),
        })?;
        let sample = gateway
            .find_one()
            .await?
            .ok_or_else(|| ExplorerError::EmptyCollection {
                collection: target.collection.clone(),
            })?;
        let resolution = resolve(&target.collection, &sample)?;
        for d in &resolution.diagnostics {
            tracing::warn!(
                field = %d.field,
                chosen = ?d.chosen,
                reason = %d.reason,
                "field resolution"
            );
        }
        tracing::info!(
            %target,
            backend = gateway.backend(),
            documents = total,
            fields = ?resolution.fields,
            "session opened"
        );
        Ok(Session {
            gateway,
            sample,
            resolution,
            total,
            params: Params::default(),
            cache: result_cache.then(|| Mutex::new(ResultCache::new(DEFAULT_CACHE_ENTRIES))),
        })
    }

    /// New session over another collection on the same backend. Parameter
    /// values start from their defaults again.
    pub async fn retarget(&self, target: Target) -> Result<Session> {
        let gw: Arc<dyn Gateway> = Arc::from(self.gateway.with_target(target));
        let next = Session::open(gw, self.cache.is_some()).await?;
        Ok(match &self.cache {
            Some(cache) => next.with_cache_capacity(cache.lock().capacity),
            None => next,
        })
    }

    /// Bounds the result cache to `entries` outputs. No effect when the
    /// session was opened without a cache.
    pub fn with_cache_capacity(mut self, entries: usize) -> Self {
        if let Some(cache) = self.cache.as_mut() {
            *cache = Mutex::new(ResultCache::new(entries));
        }
        self
    }

    /// Number of outputs currently memoized.
    pub fn cached_results(&self) -> usize {
        self.cache.as_ref().map_or(0, |c| c.lock().entries.len())
    }

    pub fn target(&self) -> &Target {
        self.gateway.target()
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn sample(&self) -> &Document {
        &self.sample
    }

    pub fn fields(&self) -> &FieldMap {
        &self.resolution.fields
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.resolution.diagnostics
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn menu(&self) -> Vec<&'static QueryDescriptor> {
        menu(self.fields())
    }

    pub fn unavailable(&self) -> Vec<(&'static QueryDescriptor, Vec<SemanticField>)> {
        unavailable(self.fields())
    }

    pub fn panels(&self) -> Vec<&'static PanelDescriptor> {
        panels(self.fields())
    }

    /// Validates `raw` against the parameters `id` declares. On error the
    /// previous values stay in place.
    pub fn update_params(&mut self, id: QueryId, raw: &RawParams) -> Result<&Params> {
        self.params = self.validate_params(id, raw)?;
        Ok(&self.params)
    }

    /// The current values with `raw` applied for the parameters `id`
    /// declares. The session itself is left unchanged.
    pub fn validate_params(&self, id: QueryId, raw: &RawParams) -> Result<Params> {
        self.params.apply(descriptor(id), raw)
    }

    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub fn build(&self, id: QueryId) -> Result<QuerySpec> {
        build(descriptor(id), self.fields(), &self.params)
    }

    pub fn explain(&self, id: QueryId) -> Result<Explain> {
        let spec = self.build(id)?;
        let native = self.gateway.describe(&spec);
        Ok(Explain {
            query: id,
            spec,
            native,
        })
    }

    async fn execute(&self, label: &str, spec: &QuerySpec) -> Result<Vec<Document>> {
        tracing::debug!(query = label, spec = ?spec, "built query");
        let started = Instant::now();
        let timer = GATEWAY_OP_SECONDS
            .with_label_values(&[self.gateway.backend(), op_name(spec)])
            .start_timer();
        let rows = self.gateway.execute(spec).await;
        timer.observe_duration();
        let rows = rows?;
        tracing::info!(
            query = label,
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query executed"
        );
        Ok(rows)
    }

    /// Builds, executes and shapes query `id` with the current parameters.
    pub async fn run(&self, id: QueryId) -> Result<QueryOutput> {
        self.run_params(id, &self.params).await
    }

    /// Like [`Session::run`] but with explicit parameter values, so
    /// concurrent callers never see each other's parameters.
    pub async fn run_params(&self, id: QueryId, params: &Params) -> Result<QueryOutput> {
        let d = descriptor(id);
        let key = format!("{}|{}", id.slug(), params.cache_key(d));
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.lock().get(&key)) {
            tracing::debug!(query = %id, "result cache hit");
            return Ok(hit);
        }
        let spec = build(d, self.fields(), params)?;
        let rows = self.execute(id.slug(), &spec).await?;
        let out = shape(d, self.fields(), rows);
        if let Some(cache) = &self.cache {
            cache.lock().insert(key, out.clone());
        }
        Ok(out)
    }

    /// [`Session::update_params`] followed by [`Session::run`].
    pub async fn run_with(&mut self, id: QueryId, raw: &RawParams) -> Result<QueryOutput> {
        self.update_params(id, raw)?;
        self.run(id).await
    }

    pub async fn panel(&self, panel: Panel) -> Result<QueryOutput> {
        let spec = build_panel(panel, self.fields())?;
        let rows = self.execute(panel.slug(), &spec).await?;
        Ok(shape_panel(panel, self.fields(), rows))
    }
}
