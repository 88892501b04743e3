//! Overview metrics and charts, resolved against the same field map as the
//! query catalog.

use crate::builder::{Paths, EVENT_START_DATE};
use crate::model::{Document, FieldMap, SemanticField};
use crate::query::{Accumulator, Expr, Filter, FindSpec, QuerySpec, SortOrder, Stage, VALUE_KEY};
use crate::shaper::{col, month_abbrev, table, Metric, QueryOutput, ResultTable, Row};
use crate::util::{coerce_f64, json_f64};
use crate::{ExplorerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

const TOP_N: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Panel {
    TotalRestaurants,
    TotalEvents,
    AverageRating,
    AverageCost,
    EventsByArea,
    TopCuisines,
    RestaurantsByArea,
    MonthlyEventTrend,
    RestaurantMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelDescriptor {
    pub id: Panel,
    pub title: &'static str,
    pub requires: &'static [SemanticField],
}

use SemanticField::*;

pub static PANELS: [PanelDescriptor; 9] = [
    PanelDescriptor {
        id: Panel::TotalRestaurants,
        title: "Total Restaurants",
        requires: &[],
    },
    PanelDescriptor {
        id: Panel::TotalEvents,
        title: "Active Events",
        requires: &[Events],
    },
    PanelDescriptor {
        id: Panel::AverageRating,
        title: "Average Rating",
        requires: &[Rating],
    },
    PanelDescriptor {
        id: Panel::AverageCost,
        title: "Average Cost for Two",
        requires: &[Cost],
    },
    PanelDescriptor {
        id: Panel::EventsByArea,
        title: "Events by Top Areas",
        requires: &[Locality, Events],
    },
    PanelDescriptor {
        id: Panel::TopCuisines,
        title: "Top 10 Cuisines",
        requires: &[Cuisines],
    },
    PanelDescriptor {
        id: Panel::RestaurantsByArea,
        title: "Restaurants by Area",
        requires: &[Locality],
    },
    PanelDescriptor {
        id: Panel::MonthlyEventTrend,
        title: "Monthly Event Trends",
        requires: &[Events],
    },
    PanelDescriptor {
        id: Panel::RestaurantMap,
        title: "Restaurant Map",
        requires: &[Latitude, Longitude],
    },
];

impl Panel {
    pub fn descriptor(&self) -> &'static PanelDescriptor {
        &PANELS[*self as usize]
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Panel::TotalRestaurants => "total-restaurants",
            Panel::TotalEvents => "total-events",
            Panel::AverageRating => "average-rating",
            Panel::AverageCost => "average-cost",
            Panel::EventsByArea => "events-by-area",
            Panel::TopCuisines => "top-cuisines",
            Panel::RestaurantsByArea => "restaurants-by-area",
            Panel::MonthlyEventTrend => "monthly-event-trend",
            Panel::RestaurantMap => "restaurant-map",
        }
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Panel {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self> {
        PANELS
            .iter()
            .map(|p| p.id)
            .find(|p| p.slug() == s.trim())
            .ok_or_else(|| ExplorerError::UnknownPanel(s.to_string()))
    }
}

/// Panels whose required fields are all resolved.
pub fn panels(fields: &FieldMap) -> Vec<&'static PanelDescriptor> {
    PANELS
        .iter()
        .filter(|p| fields.missing(p.requires).is_empty())
        .collect()
}

fn s(v: &str) -> String {
    v.to_string()
}

fn overall_avg(path: String) -> QuerySpec {
    QuerySpec::Aggregate {
        pipeline: vec![
            Stage::Group {
                key: Expr::Literal(JsonValue::Null),
                fields: vec![(s("avg"), Accumulator::Avg(Expr::field(path).to_double()))],
            },
            Stage::Project(vec![(s(VALUE_KEY), Expr::field("avg").round(2))]),
        ],
    }
}

fn top_groups(key: String, prefix: Vec<Stage>) -> QuerySpec {
    let mut pipeline = prefix;
    pipeline.extend([
        Stage::Group {
            key: Expr::field(key),
            fields: vec![(s("count"), Accumulator::Count)],
        },
        Stage::Sort(vec![(s("count"), SortOrder::Desc)]),
        Stage::Limit(TOP_N),
    ]);
    QuerySpec::Aggregate { pipeline }
}

pub fn build_panel(panel: Panel, fields: &FieldMap) -> Result<QuerySpec> {
    let p = Paths::new(fields, panel.slug());
    p.check(panel.descriptor().requires)?;

    let spec = match panel {
        Panel::TotalRestaurants => QuerySpec::Count {
            filter: Filter::All,
        },
        Panel::TotalEvents => QuerySpec::Aggregate {
            pipeline: vec![
                Stage::Group {
                    key: Expr::Literal(JsonValue::Null),
                    fields: vec![(
                        s("total"),
                        Accumulator::Sum(Expr::field(p.get(Events)?).size()),
                    )],
                },
                Stage::Project(vec![(s(VALUE_KEY), Expr::field("total"))]),
            ],
        },
        Panel::AverageRating => overall_avg(p.get(Rating)?),
        Panel::AverageCost => overall_avg(p.get(Cost)?),
        Panel::EventsByArea => {
            let events = p.get(Events)?;
            QuerySpec::Aggregate {
                pipeline: vec![
                    Stage::Match(Filter::NonEmptyArray(events.clone())),
                    Stage::Project(vec![
                        (s("area"), Expr::field(p.get(Locality)?)),
                        (s("num_events"), Expr::field(events).size()),
                    ]),
                    Stage::Group {
                        key: Expr::field("area"),
                        fields: vec![(s("total_events"), Accumulator::Sum(Expr::field("num_events")))],
                    },
                    Stage::Sort(vec![(s("total_events"), SortOrder::Desc)]),
                    Stage::Limit(TOP_N),
                ],
            }
        }
        Panel::TopCuisines => {
            let cuisines = p.get(Cuisines)?;
            top_groups(cuisines.clone(), vec![Stage::Unwind(cuisines)])
        }
        Panel::RestaurantsByArea => top_groups(p.get(Locality)?, Vec::new()),
        Panel::MonthlyEventTrend => {
            let events = p.get(Events)?;
            QuerySpec::Aggregate {
                pipeline: vec![
                    Stage::Unwind(events.clone()),
                    Stage::Project(vec![(
                        s("month"),
                        Expr::Month(Box::new(Expr::field(format!("{events}.{EVENT_START_DATE}")))),
                    )]),
                    Stage::Group {
                        key: Expr::field("month"),
                        fields: vec![(s("events"), Accumulator::Count)],
                    },
                    Stage::Sort(vec![(s("_id"), SortOrder::Asc)]),
                ],
            }
        }
        Panel::RestaurantMap => {
            let (lat, lon) = (p.get(Latitude)?, p.get(Longitude)?);
            QuerySpec::Find(FindSpec::new(
                Filter::And(vec![Filter::Coercible(lat.clone()), Filter::Coercible(lon.clone())]),
                vec![lat, lon],
            ))
        }
    };
    Ok(spec)
}

fn scalar(panel: Panel, rows: &[Document], default: JsonValue) -> QueryOutput {
    let value = rows
        .first()
        .and_then(|r| r.get(VALUE_KEY))
        .filter(|v| !v.is_null())
        .cloned()
        .unwrap_or(default);
    QueryOutput::Metric(Metric {
        label: panel.descriptor().title.to_string(),
        value,
    })
}

fn restaurant_map(fields: &FieldMap, rows: &[Document]) -> ResultTable {
    let lat_path = fields.get(Latitude).unwrap_or("latitude");
    let lon_path = fields.get(Longitude).unwrap_or("longitude");
    let coords = table(&[col(lat_path, "lat"), col(lon_path, "lon")], rows);
    let mut out = ResultTable::empty(&["lat", "lon"]);
    for row in coords.rows {
        let lat = coerce_f64(lat_path, &row["lat"]);
        let lon = coerce_f64(lon_path, &row["lon"]);
        match (lat, lon) {
            (Ok(lat), Ok(lon)) => {
                let mut r = Row::new();
                r.insert(s("lat"), json_f64(lat));
                r.insert(s("lon"), json_f64(lon));
                out.rows.push(r);
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::debug!(error = %e, "dropping restaurant from map");
            }
        }
    }
    out
}

/// Shapes raw rows for `panel`. A count panel receives one row `{"value": n}`.
pub fn shape_panel(panel: Panel, fields: &FieldMap, rows: Vec<Document>) -> QueryOutput {
    match panel {
        Panel::TotalRestaurants | Panel::TotalEvents => scalar(panel, &rows, json!(0)),
        Panel::AverageRating | Panel::AverageCost => scalar(panel, &rows, JsonValue::Null),
        Panel::EventsByArea => QueryOutput::Table(table(
            &[col("_id", "Area"), col("total_events", "Events")],
            &rows,
        )),
        Panel::TopCuisines => QueryOutput::Table(table(
            &[col("_id", "Cuisine"), col("count", "Restaurants")],
            &rows,
        )),
        Panel::RestaurantsByArea => QueryOutput::Table(table(
            &[col("_id", "Area"), col("count", "Restaurants")],
            &rows,
        )),
        Panel::MonthlyEventTrend => {
            let mut t = table(&[col("_id", "Month"), col("events", "Event Count")], &rows);
            for row in t.rows.iter_mut() {
                if let Some(month) = row.get_mut("Month") {
                    *month = JsonValue::String(month_abbrev(month).to_string());
                }
            }
            QueryOutput::Table(t)
        }
        Panel::RestaurantMap => QueryOutput::Table(restaurant_map(fields, &rows)),
    }
}
