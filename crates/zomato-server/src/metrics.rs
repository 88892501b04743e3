use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Gauge, HistogramVec,
};

pub static QUERIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "explorer_queries_total",
        "Catalog queries and panels by outcome",
        &["query", "outcome"]
    )
    .unwrap()
});

pub static QUERY_DURATION_SEC: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "explorer_query_duration_seconds",
        "Build + execute + shape time",
        &["query"]
    )
    .unwrap()
});

pub static SESSION_DOCUMENTS: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("explorer_session_documents", "Documents in the current collection").unwrap()
});

pub static RETARGETS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!("explorer_retargets_total", "Collection switches by result", &["result"])
        .unwrap()
});
