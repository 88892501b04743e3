//! Maps (descriptor, field map, params) to a concrete [`QuerySpec`].

use crate::catalog::{QueryDescriptor, QueryId};
use crate::model::{FieldMap, SemanticField};
use crate::params::Params;
use crate::query::{Accumulator, CmpOp, Expr, Filter, FindSpec, QuerySpec, SortOrder, Stage};
use crate::{ExplorerError, Result};
use serde_json::json;

/// Path of the title inside one event element.
pub const EVENT_TITLE: &str = "event.title";
/// Path of the start date inside one event element.
pub const EVENT_START_DATE: &str = "event.start_date";

pub const COST_BOUNDARIES: [f64; 6] = [0.0, 500.0, 1000.0, 1500.0, 2000.0, 3000.0];
pub const COST_OVERFLOW: &str = "3000+";
pub const MIN_NEIGHBORHOOD_SIZE: f64 = 5.0;

/// Resolved paths for one build, failing on the first absent field.
pub(crate) struct Paths<'a> {
    fields: &'a FieldMap,
    query: &'a str,
}

impl<'a> Paths<'a> {
    pub(crate) fn new(fields: &'a FieldMap, query: &'a str) -> Self {
        Self { fields, query }
    }

    pub(crate) fn get(&self, field: SemanticField) -> Result<String> {
        self.fields
            .get(field)
            .map(str::to_string)
            .ok_or_else(|| ExplorerError::FieldUnavailable {
                field: field.to_string(),
                query: self.query.to_string(),
            })
    }

    pub(crate) fn check(&self, required: &[SemanticField]) -> Result<()> {
        for field in required {
            self.get(*field)?;
        }
        Ok(())
    }
}

fn s(v: &str) -> String {
    v.to_string()
}

pub fn build(descriptor: &QueryDescriptor, fields: &FieldMap, params: &Params) -> Result<QuerySpec> {
    let p = Paths::new(fields, descriptor.id.slug());
    p.check(descriptor.requires)?;

    let spec = match descriptor.id {
        QueryId::ListNames => {
            QuerySpec::Find(FindSpec::new(Filter::All, vec![p.get(SemanticField::Name)?]))
        }
        QueryId::UniqueLocalities => QuerySpec::Distinct {
            path: p.get(SemanticField::Locality)?,
        },
        QueryId::EventTitles => {
            let events = p.get(SemanticField::Events)?;
            QuerySpec::Aggregate {
                pipeline: vec![
                    Stage::Match(Filter::NonEmptyArray(events.clone())),
                    Stage::Project(vec![
                        (s("name"), Expr::field(p.get(SemanticField::Name)?)),
                        (
                            s("event_titles"),
                            Expr::MapField {
                                input: Box::new(Expr::field(events)),
                                path: s(EVENT_TITLE),
                            },
                        ),
                    ]),
                ],
            }
        }
        QueryId::EventsByLocality => {
            let events = p.get(SemanticField::Events)?;
            QuerySpec::Aggregate {
                pipeline: vec![
                    Stage::Match(Filter::NonEmptyArray(events.clone())),
                    Stage::Project(vec![
                        (s("locality"), Expr::field(p.get(SemanticField::Locality)?)),
                        (s("num_events"), Expr::field(events).size()),
                    ]),
                    Stage::Group {
                        key: Expr::field("locality"),
                        fields: vec![(s("total_events"), Accumulator::Sum(Expr::field("num_events")))],
                    },
                    Stage::Sort(vec![(s("total_events"), SortOrder::Desc)]),
                ],
            }
        }
        QueryId::TopLocalities => top_localities(&p)?,
        QueryId::SampleDocument => QuerySpec::FindOne,
        QueryId::BudgetSearch => {
            let (name, rating, cost) = (
                p.get(SemanticField::Name)?,
                p.get(SemanticField::Rating)?,
                p.get(SemanticField::Cost)?,
            );
            let filter = Filter::And(vec![
                Filter::Compare {
                    path: rating.clone(),
                    op: CmpOp::Gt,
                    value: params.min_rating,
                },
                Filter::Compare {
                    path: cost.clone(),
                    op: CmpOp::Lte,
                    value: params.max_cost as f64,
                },
            ]);
            QuerySpec::Find(FindSpec::new(filter, vec![name, rating, cost]))
        }
        QueryId::CostPagination => {
            let cost = p.get(SemanticField::Cost)?;
            let mut find = FindSpec::new(Filter::All, vec![p.get(SemanticField::Name)?, cost.clone()]);
            // `_id` breaks cost ties so skip/limit pages are stable
            find.sort = vec![(cost, SortOrder::Asc), (s("_id"), SortOrder::Asc)];
            find.skip = params.skip;
            find.limit = Some(params.limit);
            QuerySpec::Find(find)
        }
        QueryId::CuisineOrDelivery => {
            let (name, cuisines, delivery) = (
                p.get(SemanticField::Name)?,
                p.get(SemanticField::Cuisines)?,
                p.get(SemanticField::Delivery)?,
            );
            let filter = Filter::Or(vec![
                Filter::In {
                    path: cuisines.clone(),
                    values: vec![json!("Continental"), json!("Asian")],
                },
                Filter::Eq {
                    path: delivery.clone(),
                    value: json!(1),
                },
            ]);
            QuerySpec::Find(FindSpec::new(filter, vec![name, cuisines, delivery]))
        }
        QueryId::NeighborhoodFacet => neighborhood_facet(&p)?,
    };
    Ok(spec)
}

fn top_localities(p: &Paths<'_>) -> Result<QuerySpec> {
    let events = p.get(SemanticField::Events)?;
    let cost = p.get(SemanticField::Cost)?;
    let rating = p.get(SemanticField::Rating)?;
    Ok(QuerySpec::Aggregate {
        pipeline: vec![
            Stage::Match(Filter::NonEmptyArray(events.clone())),
            Stage::Group {
                key: Expr::field(p.get(SemanticField::Locality)?),
                fields: vec![
                    (s("restaurants"), Accumulator::Count),
                    (s("total_events"), Accumulator::Sum(Expr::field(events).size())),
                    (s("avg_cost"), Accumulator::Avg(Expr::field(cost).to_double())),
                    (s("avg_rating"), Accumulator::Avg(Expr::field(rating).to_double())),
                ],
            },
            // count >= 1 for every group, the match above guarantees membership
            Stage::AddFields(vec![(
                s("events_per_restaurant"),
                Expr::field("total_events").divide(Expr::field("restaurants")),
            )]),
            Stage::Sort(vec![(s("events_per_restaurant"), SortOrder::Desc)]),
            Stage::Limit(3),
            Stage::Project(vec![
                (s("locality"), Expr::field("_id")),
                (s("restaurants"), Expr::field("restaurants")),
                (s("total_events"), Expr::field("total_events")),
                (
                    s("events_per_restaurant"),
                    Expr::field("events_per_restaurant").round(2),
                ),
                (s("avg_cost"), Expr::field("avg_cost").round(2)),
                (s("avg_rating"), Expr::field("avg_rating").round(2)),
            ]),
        ],
    })
}

fn neighborhood_facet(p: &Paths<'_>) -> Result<QuerySpec> {
    let locality = p.get(SemanticField::Locality)?;
    let rating = p.get(SemanticField::Rating)?;
    let cost = p.get(SemanticField::Cost)?;

    let top_neighborhoods = vec![
        Stage::Group {
            key: Expr::field(locality),
            fields: vec![
                (s("avg_rating"), Accumulator::Avg(Expr::field(&rating).to_double())),
                (s("count"), Accumulator::Count),
            ],
        },
        Stage::Match(Filter::Compare {
            path: s("count"),
            op: CmpOp::Gte,
            value: MIN_NEIGHBORHOOD_SIZE,
        }),
        Stage::Sort(vec![
            (s("avg_rating"), SortOrder::Desc),
            (s("_id"), SortOrder::Asc),
        ]),
        Stage::Limit(5),
        Stage::Project(vec![
            (s("locality"), Expr::field("_id")),
            (s("avg_rating"), Expr::field("avg_rating").round(2)),
            (s("count"), Expr::field("count")),
        ]),
    ];

    let cost_buckets = vec![
        Stage::Match(Filter::Coercible(cost.clone())),
        Stage::Bucket {
            group_by: Expr::field(cost).to_double(),
            boundaries: COST_BOUNDARIES.to_vec(),
            default: s(COST_OVERFLOW),
            output: vec![
                (s("count"), Accumulator::Count),
                (s("avg_rating"), Accumulator::Avg(Expr::field(&rating).to_double())),
            ],
        },
        Stage::Project(vec![
            (s("range"), Expr::field("_id")),
            (s("count"), Expr::field("count")),
            (s("avg_rating"), Expr::field("avg_rating").round(2)),
        ]),
    ];

    Ok(QuerySpec::Aggregate {
        pipeline: vec![Stage::Facet(vec![
            (s("top_neighborhoods"), top_neighborhoods),
            (s("cost_buckets"), cost_buckets),
        ])],
    })
}
