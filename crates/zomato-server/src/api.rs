use crate::metrics::{QUERIES_TOTAL, QUERY_DURATION_SEC, RETARGETS_TOTAL, SESSION_DOCUMENTS};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use zomato_core::analytics::{Panel, PANELS};
use zomato_core::catalog::{descriptor, PipelineShape, QueryDescriptor};
use zomato_core::params::{ParamSpec, RawParams};
use zomato_core::{ExplorerError, QueryId, QueryOutput, SemanticField, Target, EMPTY_NOTICE};
use zomato_storage::Session;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<Session>>,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        SESSION_DOCUMENTS.set(session.total() as f64);
        Self {
            session: Arc::new(RwLock::new(session)),
        }
    }
}

pub struct ApiError(ExplorerError);

impl From<ExplorerError> for ApiError {
    fn from(e: ExplorerError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ExplorerError::ConnectionFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            ExplorerError::EmptyCollection { .. } | ExplorerError::FieldUnavailable { .. } => {
                StatusCode::CONFLICT
            }
            ExplorerError::ParameterOutOfRange { .. } | ExplorerError::CoercionFailure { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ExplorerError::UnknownQuery(_) | ExplorerError::UnknownPanel(_) => StatusCode::NOT_FOUND,
            ExplorerError::Store(_) | ExplorerError::Data(_) => StatusCode::BAD_GATEWAY,
        };
        (
            status,
            Json(json!({"error": self.0.to_string(), "kind": self.0.kind()})),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/session", get(session_info))
        .route("/v1/sample", get(sample))
        .route("/v1/queries", get(list_queries))
        .route("/v1/queries/:id", post(run_query))
        .route("/v1/queries/:id/explain", get(explain_query))
        .route("/v1/analytics", get(analytics))
        .route("/v1/analytics/:panel", get(analytics_panel))
        .route("/admin/target", post(admin_target))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Times one query or panel run and counts it by outcome.
async fn observed(
    label: &str,
    run: impl Future<Output = zomato_core::Result<QueryOutput>>,
) -> zomato_core::Result<QueryOutput> {
    let timer = QUERY_DURATION_SEC.with_label_values(&[label]).start_timer();
    let out = run.await;
    timer.observe_duration();
    let outcome = match &out {
        Ok(o) if o.is_empty() => "empty",
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    QUERIES_TOTAL.with_label_values(&[label, outcome]).inc();
    out
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn session_info(State(app): State<AppState>) -> Json<JsonValue> {
    let s = app.session.read().await;
    Json(json!({
        "target": s.target(),
        "backend": s.gateway().backend(),
        "documents": s.total(),
        "fields": s.fields(),
        "diagnostics": s.diagnostics(),
    }))
}

async fn sample(State(app): State<AppState>) -> Json<JsonValue> {
    let s = app.session.read().await;
    Json(JsonValue::Object(s.sample().clone()))
}

#[derive(Serialize)]
struct ParamView {
    #[serde(flatten)]
    spec: ParamSpec,
    value: JsonValue,
}

#[derive(Serialize)]
struct MenuEntry {
    number: u8,
    slug: &'static str,
    label: String,
    shape: PipelineShape,
    params: Vec<ParamView>,
}

#[derive(Serialize)]
struct UnavailableEntry {
    number: u8,
    slug: &'static str,
    label: String,
    missing: Vec<SemanticField>,
}

fn menu_entry(s: &Session, d: &QueryDescriptor) -> MenuEntry {
    let values = s.params().declared(d);
    MenuEntry {
        number: d.id.number(),
        slug: d.id.slug(),
        label: d.label(s.fields()),
        shape: d.shape,
        params: d
            .params
            .iter()
            .map(|p| ParamView {
                spec: *p,
                value: values.get(p.name.as_str()).cloned().unwrap_or(JsonValue::Null),
            })
            .collect(),
    }
}

async fn list_queries(State(app): State<AppState>) -> Json<JsonValue> {
    let s = app.session.read().await;
    let available: Vec<MenuEntry> = s.menu().into_iter().map(|d| menu_entry(&s, d)).collect();
    let unavailable: Vec<UnavailableEntry> = s
        .unavailable()
        .into_iter()
        .map(|(d, missing)| UnavailableEntry {
            number: d.id.number(),
            slug: d.id.slug(),
            label: d.label(s.fields()),
            missing,
        })
        .collect();
    Json(json!({"available": available, "unavailable": unavailable}))
}

async fn explain_query(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<zomato_storage::Explain> {
    let id: QueryId = id.parse()?;
    let s = app.session.read().await;
    Ok(Json(s.explain(id)?))
}

/// An empty body means "no changes"; anything else must be a JSON object of
/// known parameters.
fn parse_params(body: &[u8]) -> Result<RawParams, ExplorerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RawParams::default());
    }
    let value: JsonValue =
        serde_json::from_slice(body).map_err(|e| ExplorerError::ParameterOutOfRange {
            param: "body".into(),
            value: String::from_utf8_lossy(body).into_owned(),
            expected: format!("a JSON object of parameters ({e})"),
        })?;
    RawParams::from_json(&value)
}

async fn run_query(
    State(app): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<JsonValue> {
    let id: QueryId = id.parse()?;
    let d = descriptor(id);
    // validated values travel with this request; the stored copy is only
    // what the menu shows next
    let (params, output, label, target) = {
        let s = app.session.read().await;
        let params = match parse_params(&body).and_then(|raw| s.validate_params(id, &raw)) {
            Ok(p) => p,
            Err(e) => {
                QUERIES_TOTAL.with_label_values(&[id.slug(), e.kind()]).inc();
                return Err(e.into());
            }
        };
        let output = observed(id.slug(), s.run_params(id, &params)).await?;
        (params, output, d.label(s.fields()), s.target().clone())
    };
    {
        let mut s = app.session.write().await;
        if s.target() == &target {
            s.set_params(params.clone());
        }
    }
    let mut body = json!({
        "query": id,
        "label": label,
        "params": params.declared(d),
        "output": output,
    });
    if output.is_empty() {
        body["notice"] = json!(EMPTY_NOTICE);
    }
    Ok(Json(body))
}

async fn analytics(State(app): State<AppState>) -> ApiResult<JsonValue> {
    let s = app.session.read().await;
    let mut panels = Vec::new();
    for p in s.panels() {
        let output = observed(p.id.slug(), s.panel(p.id)).await?;
        panels.push(json!({"panel": p.id, "title": p.title, "output": output}));
    }
    let unavailable: Vec<JsonValue> = PANELS
        .iter()
        .filter_map(|p| {
            let missing = s.fields().missing(p.requires);
            (!missing.is_empty()).then(|| json!({"panel": p.id, "missing": missing}))
        })
        .collect();
    Ok(Json(json!({"panels": panels, "unavailable": unavailable})))
}

async fn analytics_panel(
    State(app): State<AppState>,
    Path(panel): Path<String>,
) -> ApiResult<QueryOutput> {
    let panel: Panel = panel.parse()?;
    let s = app.session.read().await;
    Ok(Json(observed(panel.slug(), s.panel(panel)).await?))
}

#[derive(Debug, Deserialize)]
struct TargetReq {
    database: Option<String>,
    collection: String,
}

async fn admin_target(
    State(app): State<AppState>,
    Json(req): Json<TargetReq>,
) -> ApiResult<JsonValue> {
    let next = {
        let s = app.session.read().await;
        let target = Target::new(
            req.database.unwrap_or_else(|| s.target().database.clone()),
            req.collection,
        );
        s.retarget(target).await
    };
    let next = match next {
        Ok(n) => n,
        Err(e) => {
            RETARGETS_TOTAL.with_label_values(&["error"]).inc();
            tracing::warn!(error = %e, "retarget failed; keeping current session");
            return Err(e.into());
        }
    };
    RETARGETS_TOTAL.with_label_values(&["ok"]).inc();
    SESSION_DOCUMENTS.set(next.total() as f64);
    let body = json!({
        "target": next.target(),
        "documents": next.total(),
        "fields": next.fields(),
        "diagnostics": next.diagnostics(),
    });
    *app.session.write().await = next;
    Ok(Json(body))
}

async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buf = Vec::new();
    let _ = encoder.encode(&metric_families, &mut buf);
    (StatusCode::OK, String::from_utf8(buf).unwrap_or_default())
}
