//! MongoDB gateway: translates store-agnostic queries into filter documents
//! and aggregation stages, and results back into JSON documents.

use crate::eval::sort_values;
use crate::traits::Gateway;
use bson::{doc, Bson};
use futures::stream::TryStreamExt;
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client, Collection};
use serde_json::Value as JsonValue;
use std::time::Duration;
use zomato_core::{
    Accumulator, CmpOp, Document, Expr, ExplorerError, Filter, FindSpec, QuerySpec, Result,
    SortOrder, Stage, Target,
};

const APP_NAME: &str = "zomato-explorer";

#[derive(Clone)]
pub struct MongoGateway {
    client: Client,
    collection: Collection<bson::Document>,
    target: Target,
}

impl MongoGateway {
    pub fn new(client: Client, target: Target) -> Self {
        let collection = client
            .database(&target.database)
            .collection::<bson::Document>(&target.collection);
        Self {
            client,
            collection,
            target,
        }
    }

    /// Parses `uri` and builds a client. No round trip happens here; the
    /// first query surfaces an unreachable server.
    pub async fn connect(uri: &str, target: Target, timeout: Duration) -> Result<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| ExplorerError::ConnectionFailure(e.to_string()))?;
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);
        options.app_name = Some(APP_NAME.to_string());
        let client = Client::with_options(options)
            .map_err(|e| ExplorerError::ConnectionFailure(e.to_string()))?;
        tracing::info!(%target, "mongo client ready");
        Ok(Self::new(client, target))
    }
}

fn store_error(e: mongodb::error::Error) -> ExplorerError {
    match e.kind.as_ref() {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. } => {
            ExplorerError::ConnectionFailure(e.to_string())
        }
        _ => ExplorerError::Store(e.to_string()),
    }
}

pub fn to_bson(value: &JsonValue) -> Bson {
    match value {
        JsonValue::Null => Bson::Null,
        JsonValue::Bool(b) => Bson::Boolean(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                match i32::try_from(i) {
                    Ok(small) => Bson::Int32(small),
                    Err(_) => Bson::Int64(i),
                }
            } else {
                Bson::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => Bson::String(s.clone()),
        JsonValue::Array(items) => Bson::Array(items.iter().map(to_bson).collect()),
        JsonValue::Object(map) => Bson::Document(
            map.iter()
                .map(|(k, v)| (k.clone(), to_bson(v)))
                .collect(),
        ),
    }
}

/// Relaxed extended JSON: plain numbers stay numbers, dates and ids become
/// `{"$date": ..}` / `{"$oid": ..}` wrappers.
pub fn from_bson(doc: bson::Document) -> Document {
    match Bson::Document(doc).into_relaxed_extjson() {
        JsonValue::Object(map) => map,
        _ => Document::new(),
    }
}

fn path_ref(path: &str) -> Bson {
    Bson::String(format!("${path}"))
}

fn to_double(input: Bson) -> Bson {
    Bson::Document(doc! {
        "$convert": { "input": input, "to": "double", "onError": Bson::Null, "onNull": Bson::Null }
    })
}

fn cmp_operator(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Gt => "$gt",
        CmpOp::Gte => "$gte",
        CmpOp::Lte => "$lte",
    }
}

pub fn filter_doc(filter: &Filter) -> bson::Document {
    match filter {
        Filter::All => doc! {},
        Filter::NonEmptyArray(path) => doc! {
            path.as_str(): { "$exists": true, "$type": "array", "$ne": Bson::Array(Vec::new()) }
        },
        Filter::Coercible(path) => doc! {
            "$expr": { "$ne": [to_double(path_ref(path)), Bson::Null] }
        },
        // null compares below every number in $expr, so coerced nulls are
        // excluded explicitly
        Filter::Compare { path, op, value } => {
            let converted = to_double(path_ref(path));
            doc! {
                "$expr": {
                    "$and": [
                        { "$ne": [converted.clone(), Bson::Null] },
                        { cmp_operator(*op): [converted, *value] },
                    ]
                }
            }
        }
        Filter::In { path, values } => doc! {
            path.as_str(): { "$in": values.iter().map(to_bson).collect::<Vec<_>>() }
        },
        Filter::Eq { path, value } => doc! { path.as_str(): to_bson(value) },
        Filter::And(all) => combine("$and", all),
        Filter::Or(any) => combine("$or", any),
    }
}

fn combine(op: &str, filters: &[Filter]) -> bson::Document {
    if filters.is_empty() {
        return doc! {};
    }
    doc! { op: filters.iter().map(filter_doc).collect::<Vec<_>>() }
}

pub fn expr_bson(expr: &Expr) -> Bson {
    match expr {
        Expr::Field(path) => path_ref(path),
        Expr::Literal(v) => Bson::Document(doc! { "$literal": to_bson(v) }),
        Expr::Size(inner) => {
            let e = expr_bson(inner);
            Bson::Document(doc! {
                "$size": { "$cond": [{ "$isArray": [e.clone()] }, e, Bson::Array(Vec::new())] }
            })
        }
        Expr::ToDouble(inner) => to_double(expr_bson(inner)),
        Expr::Divide(lhs, rhs) => {
            let by = expr_bson(rhs);
            Bson::Document(doc! {
                "$cond": [
                    { "$eq": [by.clone(), 0] },
                    Bson::Null,
                    { "$divide": [expr_bson(lhs), by] },
                ]
            })
        }
        Expr::Round(inner, places) => Bson::Document(doc! {
            "$round": [expr_bson(inner), *places as i32]
        }),
        Expr::MapField { input, path } => {
            let e = expr_bson(input);
            Bson::Document(doc! {
                "$cond": [
                    { "$isArray": [e.clone()] },
                    { "$map": { "input": e, "as": "item", "in": format!("$$item.{path}") } },
                    Bson::Null,
                ]
            })
        }
        Expr::Month(inner) => Bson::Document(doc! {
            "$month": {
                "$convert": {
                    "input": expr_bson(inner),
                    "to": "date",
                    "onError": Bson::Null,
                    "onNull": Bson::Null,
                }
            }
        }),
    }
}

fn accumulator(acc: &Accumulator) -> bson::Document {
    match acc {
        Accumulator::Count => doc! { "$sum": 1 },
        Accumulator::Sum(e) => doc! { "$sum": expr_bson(e) },
        Accumulator::Avg(e) => doc! { "$avg": expr_bson(e) },
    }
}

fn accumulators(fields: &[(String, Accumulator)], into: &mut bson::Document) {
    for (name, acc) in fields {
        into.insert(name.clone(), accumulator(acc));
    }
}

fn sort_doc(keys: &[(String, SortOrder)]) -> bson::Document {
    keys.iter()
        .map(|(path, order)| {
            let dir = match order {
                SortOrder::Asc => 1,
                SortOrder::Desc => -1,
            };
            (path.clone(), Bson::Int32(dir))
        })
        .collect()
}

fn expr_fields(fields: &[(String, Expr)]) -> bson::Document {
    fields
        .iter()
        .map(|(name, e)| (name.clone(), expr_bson(e)))
        .collect()
}

pub fn stage_doc(stage: &Stage) -> bson::Document {
    match stage {
        Stage::Match(filter) => doc! { "$match": filter_doc(filter) },
        Stage::Project(fields) => {
            let mut spec = bson::Document::new();
            if !fields.iter().any(|(name, _)| name == "_id") {
                spec.insert("_id", 0);
            }
            for (name, value) in expr_fields(fields) {
                spec.insert(name, value);
            }
            doc! { "$project": spec }
        }
        Stage::Group { key, fields } => {
            let mut spec = doc! { "_id": expr_bson(key) };
            accumulators(fields, &mut spec);
            doc! { "$group": spec }
        }
        Stage::AddFields(fields) => doc! { "$addFields": expr_fields(fields) },
        Stage::Sort(keys) => doc! { "$sort": sort_doc(keys) },
        Stage::Skip(n) => doc! { "$skip": *n as i64 },
        Stage::Limit(n) => doc! { "$limit": *n as i64 },
        Stage::Unwind(path) => doc! { "$unwind": path_ref(path) },
        Stage::Bucket {
            group_by,
            boundaries,
            default,
            output,
        } => {
            let mut out = bson::Document::new();
            accumulators(output, &mut out);
            doc! {
                "$bucket": {
                    "groupBy": expr_bson(group_by),
                    "boundaries": boundaries.clone(),
                    "default": default.as_str(),
                    "output": out,
                }
            }
        }
        Stage::Facet(branches) => {
            let spec: bson::Document = branches
                .iter()
                .map(|(name, pipeline)| {
                    let stages: Vec<Bson> = pipeline
                        .iter()
                        .map(|s| Bson::Document(stage_doc(s)))
                        .collect();
                    (name.clone(), Bson::Array(stages))
                })
                .collect();
            doc! { "$facet": spec }
        }
    }
}

pub fn find_options(spec: &FindSpec) -> FindOptions {
    let mut projection = doc! { "_id": 0 };
    for path in spec.projection.iter().filter(|p| p.as_str() != "_id") {
        projection.insert(path.clone(), 1);
    }
    let mut options = FindOptions::default();
    options.projection = Some(projection);
    if !spec.sort.is_empty() {
        options.sort = Some(sort_doc(&spec.sort));
    }
    if spec.skip > 0 {
        options.skip = Some(spec.skip);
    }
    options.limit = spec.limit.map(|l| l as i64);
    options
}

/// The database command a query runs as, for explain output.
pub fn native_command(coll: &str, spec: &QuerySpec) -> bson::Document {
    match spec {
        QuerySpec::Find(find) => {
            let o = find_options(find);
            doc! {
                "find": coll,
                "filter": filter_doc(&find.filter),
                "projection": o.projection,
                "sort": o.sort,
                "skip": find.skip as i64,
                "limit": o.limit,
            }
        }
        QuerySpec::FindOne => doc! { "find": coll, "filter": {}, "limit": 1 },
        QuerySpec::Distinct { path } => doc! { "distinct": coll, "key": path.as_str() },
        QuerySpec::Count { filter } => doc! { "count": coll, "query": filter_doc(filter) },
        QuerySpec::Aggregate { pipeline } => doc! {
            "aggregate": coll,
            "pipeline": pipeline.iter().map(stage_doc).collect::<Vec<_>>(),
        },
    }
}

#[async_trait::async_trait]
impl Gateway for MongoGateway {
    async fn count(&self, filter: &Filter) -> Result<u64> {
        self.collection
            .count_documents(filter_doc(filter))
            .await
            .map_err(store_error)
    }

    async fn find_one(&self) -> Result<Option<Document>> {
        let doc = self.collection.find_one(doc! {}).await.map_err(store_error)?;
        Ok(doc.map(from_bson))
    }

    async fn find(&self, spec: &FindSpec) -> Result<Vec<Document>> {
        let cursor = self
            .collection
            .find(filter_doc(&spec.filter))
            .with_options(find_options(spec))
            .await
            .map_err(store_error)?;
        let docs: Vec<bson::Document> = cursor.try_collect().await.map_err(store_error)?;
        Ok(docs.into_iter().map(from_bson).collect())
    }

    async fn distinct(&self, path: &str) -> Result<Vec<JsonValue>> {
        let raw = self
            .collection
            .distinct(path, doc! {})
            .await
            .map_err(store_error)?;
        let mut values: Vec<JsonValue> = raw.into_iter().map(Bson::into_relaxed_extjson).collect();
        sort_values(&mut values);
        Ok(values)
    }

    async fn aggregate(&self, pipeline: &[Stage]) -> Result<Vec<Document>> {
        let stages: Vec<bson::Document> = pipeline.iter().map(stage_doc).collect();
        tracing::trace!(pipeline = ?stages, "aggregate");
        let cursor = self
            .collection
            .aggregate(stages)
            .await
            .map_err(store_error)?;
        let docs: Vec<bson::Document> = cursor.try_collect().await.map_err(store_error)?;
        Ok(docs.into_iter().map(from_bson).collect())
    }

    fn target(&self) -> &Target {
        &self.target
    }

    fn with_target(&self, target: Target) -> Box<dyn Gateway> {
        Box::new(Self::new(self.client.clone(), target))
    }

    fn backend(&self) -> &'static str {
        "mongo"
    }

    fn describe(&self, spec: &QuerySpec) -> JsonValue {
        Bson::Document(native_command(&self.target.collection, spec)).into_relaxed_extjson()
    }
}
