use crate::builder::{COST_BOUNDARIES, COST_OVERFLOW};
use crate::catalog::{QueryDescriptor, QueryId};
use crate::model::{lookup, Document, FieldMap, SemanticField};
use crate::query::VALUE_KEY;
use crate::util::to_f64;
use serde::Serialize;
use serde_json::Value as JsonValue;

pub const EMPTY_NOTICE: &str = "No results — check your field names or filters.";

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub type Row = serde_json::Map<String, JsonValue>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultTable {
    pub fn empty(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one display column, in row order.
    pub fn column(&self, name: &str) -> Vec<&JsonValue> {
        self.rows.iter().filter_map(|r| r.get(name)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum QueryOutput {
    Table(ResultTable),
    Document(Option<Document>),
    Facet {
        top_neighborhoods: ResultTable,
        cost_buckets: ResultTable,
    },
    Metric(Metric),
}

impl QueryOutput {
    /// True when nothing would be drawn; callers show [`EMPTY_NOTICE`].
    pub fn is_empty(&self) -> bool {
        match self {
            QueryOutput::Table(t) => t.is_empty(),
            QueryOutput::Document(d) => d.is_none(),
            QueryOutput::Facet {
                top_neighborhoods,
                cost_buckets,
            } => top_neighborhoods.is_empty() && cost_buckets.is_empty(),
            QueryOutput::Metric(m) => m.value.is_null(),
        }
    }
}

/// Rename rule: source path in the raw row → display column.
pub(crate) struct Column {
    pub source: String,
    pub display: &'static str,
}

pub(crate) fn col(source: impl Into<String>, display: &'static str) -> Column {
    Column {
        source: source.into(),
        display,
    }
}

fn path(fields: &FieldMap, field: SemanticField) -> String {
    fields.get(field).unwrap_or(field.as_str()).to_string()
}

/// Copies `columns` out of every raw row, reading sources by dotted path so
/// nested projections come back flat. Missing values become null.
pub(crate) fn table(columns: &[Column], rows: &[Document]) -> ResultTable {
    let out = rows
        .iter()
        .map(|raw| {
            columns
                .iter()
                .map(|c| {
                    let v = lookup(raw, &c.source).cloned().unwrap_or(JsonValue::Null);
                    (c.display.to_string(), v)
                })
                .collect::<Row>()
        })
        .collect();
    ResultTable {
        columns: columns.iter().map(|c| c.display.to_string()).collect(),
        rows: out,
    }
}

pub fn month_abbrev(value: &JsonValue) -> &'static str {
    value
        .as_u64()
        .filter(|m| (1..=12).contains(m))
        .map(|m| MONTHS[m as usize - 1])
        .unwrap_or("")
}

/// `"0-500"` for a bucket's lower bound, the overflow label as-is.
pub fn bucket_label(value: &JsonValue) -> String {
    match to_f64(value).filter(|_| !value.is_string()) {
        Some(lower) => match COST_BOUNDARIES.iter().position(|b| *b == lower) {
            Some(i) if i + 1 < COST_BOUNDARIES.len() => {
                format!("{}-{}", lower, COST_BOUNDARIES[i + 1])
            }
            _ => lower.to_string(),
        },
        None => value.as_str().unwrap_or(COST_OVERFLOW).to_string(),
    }
}

pub fn shape(descriptor: &QueryDescriptor, fields: &FieldMap, rows: Vec<Document>) -> QueryOutput {
    use SemanticField::*;
    let name = || col(path(fields, Name), "Restaurant");
    let cost = || col(path(fields, Cost), "Cost for 2");

    let columns = match descriptor.id {
        QueryId::SampleDocument => return QueryOutput::Document(rows.into_iter().next()),
        QueryId::NeighborhoodFacet => return shape_facet(rows),
        QueryId::ListNames => vec![name()],
        QueryId::UniqueLocalities => vec![col(VALUE_KEY, "Locality")],
        QueryId::EventTitles => vec![col("name", "Restaurant"), col("event_titles", "Event Titles")],
        QueryId::EventsByLocality => vec![col("_id", "Locality"), col("total_events", "Total Events")],
        QueryId::TopLocalities => vec![
            col("locality", "Locality"),
            col("restaurants", "Restaurants"),
            col("total_events", "Total Events"),
            col("events_per_restaurant", "Events/Restaurant"),
            col("avg_cost", "Avg Cost for 2"),
            col("avg_rating", "Avg Rating"),
        ],
        QueryId::BudgetSearch => vec![name(), col(path(fields, Rating), "Rating"), cost()],
        QueryId::CostPagination => vec![name(), cost()],
        QueryId::CuisineOrDelivery => vec![
            name(),
            col(path(fields, Cuisines), "Cuisines"),
            col(path(fields, Delivery), "Delivery?"),
        ],
    };
    QueryOutput::Table(table(&columns, &rows))
}

fn sub_rows(facet: Option<&Document>, key: &str) -> Vec<Document> {
    facet
        .and_then(|d| d.get(key))
        .and_then(JsonValue::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
        .unwrap_or_default()
}

fn shape_facet(rows: Vec<Document>) -> QueryOutput {
    let facet = rows.first();
    let top_neighborhoods = table(
        &[
            col("locality", "Locality"),
            col("avg_rating", "Avg Rating"),
            col("count", "Restaurants"),
        ],
        &sub_rows(facet, "top_neighborhoods"),
    );
    let mut cost_buckets = table(
        &[
            col("range", "Range"),
            col("count", "Restaurants"),
            col("avg_rating", "Avg Rating"),
        ],
        &sub_rows(facet, "cost_buckets"),
    );
    for row in cost_buckets.rows.iter_mut() {
        if let Some(range) = row.get_mut("Range") {
            *range = JsonValue::String(bucket_label(range));
        }
    }
    QueryOutput::Facet {
        top_neighborhoods,
        cost_buckets,
    }
}
