//! In-process evaluation of [`QuerySpec`] values over plain documents.
//!
//! Semantics follow the document store's own: missing and null are distinct,
//! sorts use the cross-type value order, accumulators skip non-numeric input
//! and group output keeps first-seen order.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde_json::{json, Value as JsonValue};
use std::cmp::Ordering;
use std::collections::HashMap;
use zomato_core::util::{json_f64, round_to, to_f64};
use zomato_core::{
    lookup, lookup_value, set_path, Accumulator, Document, Expr, Filter, FindSpec, SortOrder, Stage,
};

/// Position of a value's type in the cross-type sort order.
fn type_rank(v: &JsonValue) -> u8 {
    match v {
        JsonValue::Null => 0,
        JsonValue::Number(_) => 1,
        JsonValue::String(_) => 2,
        JsonValue::Object(_) => 3,
        JsonValue::Array(_) => 4,
        JsonValue::Bool(_) => 5,
    }
}

/// Total order over values; missing sorts as null.
pub fn compare_values(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    let null = JsonValue::Null;
    let (a, b) = (a.unwrap_or(&null), b.unwrap_or(&null));
    match type_rank(a).cmp(&type_rank(b)) {
        Ordering::Equal => {}
        other => return other,
    }
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        (JsonValue::Array(x), JsonValue::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(l, r)| compare_values(Some(l), Some(r)))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (JsonValue::Object(x), JsonValue::Object(y)) => x
            .iter()
            .zip(y.iter())
            .map(|((lk, lv), (rk, rv))| lk.cmp(rk).then_with(|| compare_values(Some(lv), Some(rv))))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => Ordering::Equal,
    }
}

fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
    compare_values(Some(a), Some(b)) == Ordering::Equal
}

/// Grouping key: numerically equal numbers share a key.
fn canonical(v: &JsonValue) -> String {
    match v {
        JsonValue::Number(n) => format!("n:{}", n.as_f64().unwrap_or(0.0)),
        other => other.to_string(),
    }
}

/// Values a query predicate sees at `path`: arrays are traversed and their
/// elements offered individually as well as whole.
fn query_values<'a>(value: &'a JsonValue, parts: &[&str], out: &mut Vec<&'a JsonValue>) {
    match parts.split_first() {
        None => {
            out.push(value);
            if let JsonValue::Array(items) = value {
                out.extend(items.iter());
            }
        }
        Some((head, rest)) => match value {
            JsonValue::Object(map) => {
                if let Some(next) = map.get(*head) {
                    query_values(next, rest, out);
                }
            }
            JsonValue::Array(items) => {
                for item in items.iter().filter(|i| i.is_object()) {
                    query_values(item, parts, out);
                }
            }
            _ => {}
        },
    }
}

fn values_at<'a>(doc: &'a Document, path: &str) -> Vec<&'a JsonValue> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if let Some((head, rest)) = parts.split_first() {
        if let Some(v) = doc.get(*head) {
            query_values(v, rest, &mut out);
        }
    }
    out
}

pub fn matches(doc: &Document, filter: &Filter) -> bool {
    match filter {
        Filter::All => true,
        Filter::NonEmptyArray(path) => lookup(doc, path)
            .and_then(JsonValue::as_array)
            .is_some_and(|a| !a.is_empty()),
        Filter::Coercible(path) => lookup(doc, path).and_then(to_f64).is_some(),
        Filter::Compare { path, op, value } => lookup(doc, path)
            .and_then(to_f64)
            .is_some_and(|x| op.eval(x, *value)),
        Filter::In { path, values } => values_at(doc, path)
            .into_iter()
            .any(|v| values.iter().any(|w| values_equal(v, w))),
        Filter::Eq { path, value } => values_at(doc, path)
            .into_iter()
            .any(|v| values_equal(v, value)),
        Filter::And(all) => all.iter().all(|f| matches(doc, f)),
        Filter::Or(any) => any.iter().any(|f| matches(doc, f)),
    }
}

/// Expression paths map through arrays of objects, like `$a.b` does.
fn field_value(doc: &Document, path: &str) -> Option<JsonValue> {
    fn walk(value: &JsonValue, parts: &[&str]) -> Option<JsonValue> {
        let Some((head, rest)) = parts.split_first() else {
            return Some(value.clone());
        };
        match value {
            JsonValue::Object(map) => walk(map.get(*head)?, rest),
            JsonValue::Array(items) => Some(JsonValue::Array(
                items.iter().filter_map(|i| walk(i, parts)).collect(),
            )),
            _ => None,
        }
    }
    let parts: Vec<&str> = path.split('.').collect();
    let (head, rest) = parts.split_first()?;
    walk(doc.get(*head)?, rest)
}

fn number(v: Option<&JsonValue>) -> Option<f64> {
    v.and_then(JsonValue::as_f64)
}

/// Evaluates `expr` against `doc`; `None` means the result is missing.
pub fn eval_expr(doc: &Document, expr: &Expr) -> Option<JsonValue> {
    match expr {
        Expr::Field(path) => field_value(doc, path),
        Expr::Literal(v) => Some(v.clone()),
        Expr::Size(inner) => {
            let n = match eval_expr(doc, inner) {
                Some(JsonValue::Array(a)) => a.len(),
                _ => 0,
            };
            Some(json!(n))
        }
        Expr::ToDouble(inner) => Some(
            eval_expr(doc, inner)
                .as_ref()
                .and_then(to_f64)
                .map(json_f64)
                .unwrap_or(JsonValue::Null),
        ),
        Expr::Divide(lhs, rhs) => {
            let (l, r) = (eval_expr(doc, lhs), eval_expr(doc, rhs));
            Some(match (number(l.as_ref()), number(r.as_ref())) {
                (Some(l), Some(r)) if r != 0.0 => json_f64(l / r),
                _ => JsonValue::Null,
            })
        }
        Expr::Round(inner, places) => Some(
            number(eval_expr(doc, inner).as_ref())
                .map(|x| json_f64(round_to(x, *places)))
                .unwrap_or(JsonValue::Null),
        ),
        Expr::MapField { input, path } => Some(match eval_expr(doc, input) {
            Some(JsonValue::Array(items)) => JsonValue::Array(
                items
                    .iter()
                    .map(|i| lookup_value(i, path).cloned().unwrap_or(JsonValue::Null))
                    .collect(),
            ),
            _ => JsonValue::Null,
        }),
        Expr::Month(inner) => Some(
            eval_expr(doc, inner)
                .as_ref()
                .and_then(month_of)
                .map(|m| json!(m))
                .unwrap_or(JsonValue::Null),
        ),
    }
}

/// Calendar month of a date-like value: RFC 3339, `YYYY-MM-DD[ HH:MM:SS]`,
/// epoch milliseconds, or an extended-JSON `{"$date": ..}` wrapper.
pub fn month_of(value: &JsonValue) -> Option<u32> {
    match value {
        JsonValue::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc).month());
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt.month());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(|d| d.month())
        }
        JsonValue::Number(n) => DateTime::<Utc>::from_timestamp_millis(n.as_i64()?).map(|d| d.month()),
        JsonValue::Object(map) => match map.get("$date")? {
            JsonValue::Object(inner) => inner
                .get("$numberLong")
                .and_then(JsonValue::as_str)
                .and_then(|s| s.parse::<i64>().ok())
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|d| d.month()),
            other => month_of(other),
        },
        _ => None,
    }
}

enum AccState {
    Count(u64),
    Sum { int: i64, float: f64, all_int: bool },
    Avg { total: f64, n: u64 },
}

impl AccState {
    fn new(acc: &Accumulator) -> Self {
        match acc {
            Accumulator::Count => AccState::Count(0),
            Accumulator::Sum(_) => AccState::Sum {
                int: 0,
                float: 0.0,
                all_int: true,
            },
            Accumulator::Avg(_) => AccState::Avg { total: 0.0, n: 0 },
        }
    }

    fn push(&mut self, acc: &Accumulator, doc: &Document) {
        match (self, acc) {
            (AccState::Count(n), _) => *n += 1,
            (AccState::Sum { int, float, all_int }, Accumulator::Sum(e)) => {
                if let Some(JsonValue::Number(n)) = eval_expr(doc, e) {
                    match n.as_i64().filter(|_| *all_int).and_then(|i| int.checked_add(i)) {
                        Some(total) => *int = total,
                        None => {
                            if *all_int {
                                *float = *int as f64;
                                *all_int = false;
                            }
                            *float += n.as_f64().unwrap_or(0.0);
                        }
                    }
                }
            }
            (AccState::Avg { total, n }, Accumulator::Avg(e)) => {
                if let Some(x) = number(eval_expr(doc, e).as_ref()) {
                    *total += x;
                    *n += 1;
                }
            }
            _ => {}
        }
    }

    fn finish(&self) -> JsonValue {
        match self {
            AccState::Count(n) => json!(n),
            AccState::Sum { int, float, all_int } => {
                if *all_int {
                    json!(int)
                } else {
                    json_f64(*float)
                }
            }
            AccState::Avg { total, n } => {
                if *n == 0 {
                    JsonValue::Null
                } else {
                    json_f64(total / *n as f64)
                }
            }
        }
    }
}

/// One output group: key, accumulator states in declaration order.
struct GroupAcc {
    key: JsonValue,
    states: Vec<AccState>,
}

fn accumulate<'a>(
    docs: impl Iterator<Item = (JsonValue, &'a Document)>,
    fields: &[(String, Accumulator)],
) -> Vec<GroupAcc> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<GroupAcc> = Vec::new();
    for (key, doc) in docs {
        let slot = *index.entry(canonical(&key)).or_insert_with(|| {
            groups.push(GroupAcc {
                key,
                states: fields.iter().map(|(_, a)| AccState::new(a)).collect(),
            });
            groups.len() - 1
        });
        for (state, (_, acc)) in groups[slot].states.iter_mut().zip(fields) {
            state.push(acc, doc);
        }
    }
    groups
}

fn group_doc(group: GroupAcc, fields: &[(String, Accumulator)]) -> Document {
    let mut out = Document::new();
    out.insert("_id".to_string(), group.key);
    for (state, (name, _)) in group.states.iter().zip(fields) {
        out.insert(name.clone(), state.finish());
    }
    out
}

fn sort_docs(docs: &mut [Document], keys: &[(String, SortOrder)]) {
    docs.sort_by(|a, b| {
        keys.iter()
            .map(|(path, order)| {
                let o = compare_values(lookup(a, path), lookup(b, path));
                match order {
                    SortOrder::Asc => o,
                    SortOrder::Desc => o.reverse(),
                }
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

fn unwind(docs: Vec<Document>, path: &str) -> Vec<Document> {
    let mut out = Vec::new();
    for doc in docs {
        match lookup(&doc, path).cloned() {
            None | Some(JsonValue::Null) => {}
            Some(JsonValue::Array(items)) => {
                for item in items {
                    let mut copy = doc.clone();
                    set_path(&mut copy, path, item);
                    out.push(copy);
                }
            }
            Some(_) => out.push(doc),
        }
    }
    out
}

fn bucket(
    docs: &[Document],
    group_by: &Expr,
    boundaries: &[f64],
    default: &str,
    output: &[(String, Accumulator)],
) -> Vec<Document> {
    let slot = |doc: &Document| -> usize {
        number(eval_expr(doc, group_by).as_ref())
            .and_then(|x| boundaries.windows(2).position(|w| w[0] <= x && x < w[1]))
            .unwrap_or(boundaries.len().saturating_sub(1))
    };
    let mut keyed: Vec<(usize, &Document)> = docs.iter().map(|d| (slot(d), d)).collect();
    keyed.sort_by_key(|(i, _)| *i);
    let groups = accumulate(
        keyed.into_iter().map(|(i, d)| {
            let key = if i + 1 < boundaries.len() {
                json_f64(boundaries[i])
            } else {
                json!(default)
            };
            (key, d)
        }),
        output,
    );
    groups.into_iter().map(|g| group_doc(g, output)).collect()
}

fn apply_stage(docs: Vec<Document>, stage: &Stage) -> Vec<Document> {
    match stage {
        Stage::Match(filter) => docs.into_iter().filter(|d| matches(d, filter)).collect(),
        Stage::Project(fields) => docs
            .iter()
            .map(|d| {
                let mut out = Document::new();
                for (name, expr) in fields {
                    if let Some(v) = eval_expr(d, expr) {
                        set_path(&mut out, name, v);
                    }
                }
                out
            })
            .collect(),
        Stage::AddFields(fields) => docs
            .into_iter()
            .map(|mut d| {
                for (name, expr) in fields {
                    if let Some(v) = eval_expr(&d, expr) {
                        set_path(&mut d, name, v);
                    }
                }
                d
            })
            .collect(),
        Stage::Group { key, fields } => {
            let keyed = docs
                .iter()
                .map(|d| (eval_expr(d, key).unwrap_or(JsonValue::Null), d));
            accumulate(keyed, fields)
                .into_iter()
                .map(|g| group_doc(g, fields))
                .collect()
        }
        Stage::Sort(keys) => {
            let mut docs = docs;
            sort_docs(&mut docs, keys);
            docs
        }
        Stage::Skip(n) => docs.into_iter().skip(*n as usize).collect(),
        Stage::Limit(n) => docs.into_iter().take(*n as usize).collect(),
        Stage::Unwind(path) => unwind(docs, path),
        Stage::Bucket {
            group_by,
            boundaries,
            default,
            output,
        } => bucket(&docs, group_by, boundaries, default, output),
        Stage::Facet(branches) => {
            let mut out = Document::new();
            for (name, pipeline) in branches {
                let rows = run_pipeline(docs.clone(), pipeline);
                out.insert(
                    name.clone(),
                    JsonValue::Array(rows.into_iter().map(JsonValue::Object).collect()),
                );
            }
            vec![out]
        }
    }
}

pub fn run_pipeline(docs: Vec<Document>, pipeline: &[Stage]) -> Vec<Document> {
    pipeline.iter().fold(docs, apply_stage)
}

pub fn run_find(docs: &[Document], spec: &FindSpec) -> Vec<Document> {
    let mut hits: Vec<Document> = docs
        .iter()
        .filter(|d| matches(d, &spec.filter))
        .cloned()
        .collect();
    sort_docs(&mut hits, &spec.sort);
    let limit = spec.limit.map(|l| l as usize).unwrap_or(usize::MAX);
    hits.into_iter()
        .skip(spec.skip as usize)
        .take(limit)
        .map(|d| project(d, &spec.projection))
        .collect()
}

fn project(mut doc: Document, paths: &[String]) -> Document {
    if paths.is_empty() {
        doc.remove("_id");
        return doc;
    }
    let mut out = Document::new();
    for path in paths.iter().filter(|p| p.as_str() != "_id") {
        if let Some(v) = lookup(&doc, path) {
            set_path(&mut out, path, v.clone());
        }
    }
    out
}

/// Distinct values at `path` with arrays flattened, in value order.
pub fn distinct(docs: &[Document], path: &str) -> Vec<JsonValue> {
    let mut seen: HashMap<String, ()> = HashMap::new();
    let mut out = Vec::new();
    for doc in docs {
        let Some(v) = lookup(doc, path) else { continue };
        let items: Vec<&JsonValue> = match v {
            JsonValue::Array(a) => a.iter().collect(),
            other => vec![other],
        };
        for item in items {
            if seen.insert(canonical(item), ()).is_none() {
                out.push(item.clone());
            }
        }
    }
    sort_values(&mut out);
    out
}

pub fn sort_values(values: &mut [JsonValue]) {
    values.sort_by(|a, b| compare_values(Some(a), Some(b)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use zomato_core::builder::COST_OVERFLOW;
    use zomato_core::CmpOp;

    fn docs(v: JsonValue) -> Vec<Document> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|d| d.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn cross_type_order_puts_null_first_and_strings_after_numbers() {
        let mut v = vec![json!("a"), json!(3), JsonValue::Null, json!(1.5)];
        sort_values(&mut v);
        assert_eq!(v, vec![JsonValue::Null, json!(1.5), json!(3), json!("a")]);
    }

    #[test]
    fn compare_coerces_strings_and_skips_garbage() {
        let rows = docs(json!([
            {"r": "4.2"}, {"r": "NA"}, {"r": 3.9}, {"x": 1}, {"r": null}
        ]));
        let f = Filter::Compare {
            path: "r".into(),
            op: CmpOp::Gt,
            value: 4.0,
        };
        let hits: Vec<_> = rows.iter().filter(|d| matches(d, &f)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["r"], json!("4.2"));
    }

    #[test]
    fn in_and_eq_look_inside_arrays() {
        let d = docs(json!([{"c": ["Asian", "Thai"], "d": 0}]));
        assert!(matches(
            &d[0],
            &Filter::In {
                path: "c".into(),
                values: vec![json!("Continental"), json!("Asian")]
            }
        ));
        assert!(!matches(
            &d[0],
            &Filter::Eq {
                path: "d".into(),
                value: json!(1)
            }
        ));
        assert!(matches(
            &d[0],
            &Filter::Eq {
                path: "d".into(),
                value: json!(0.0)
            }
        ));
    }

    #[test]
    fn sum_stays_integral_and_avg_skips_non_numbers() {
        let rows = docs(json!([
            {"k": "a", "n": 2, "r": "4"},
            {"k": "a", "n": 3, "r": "NA"},
            {"k": "b", "n": 1.5, "r": 3}
        ]));
        let out = run_pipeline(
            rows,
            &[Stage::Group {
                key: Expr::field("k"),
                fields: vec![
                    ("n".into(), Accumulator::Sum(Expr::field("n"))),
                    ("r".into(), Accumulator::Avg(Expr::field("r").to_double())),
                ],
            }],
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["_id"], json!("a"));
        assert_eq!(out[0]["n"], json!(5));
        assert_eq!(out[0]["r"], json!(4.0));
        assert_eq!(out[1]["n"], json!(1.5));
    }

    #[test]
    fn integer_sum_overflow_promotes_to_double() {
        let rows = docs(json!([{"n": i64::MAX}, {"n": 1}, {"n": 1}]));
        let out = run_pipeline(
            rows,
            &[Stage::Group {
                key: Expr::Literal(JsonValue::Null),
                fields: vec![("n".into(), Accumulator::Sum(Expr::field("n")))],
            }],
        );
        assert!(out[0]["n"].is_f64());
        assert_eq!(out[0]["n"].as_f64(), Some(i64::MAX as f64));
    }

    #[test]
    fn size_of_non_array_is_zero_and_divide_by_zero_is_null() {
        let d = docs(json!([{"e": "x", "a": 3, "z": 0}]));
        assert_eq!(eval_expr(&d[0], &Expr::field("e").size()), Some(json!(0)));
        assert_eq!(
            eval_expr(&d[0], &Expr::field("a").divide(Expr::field("z"))),
            Some(JsonValue::Null)
        );
        assert_eq!(
            eval_expr(&d[0], &Expr::field("a").divide(Expr::field("missing"))),
            Some(JsonValue::Null)
        );
    }

    #[test]
    fn seven_over_three_rounds_to_two_places() {
        let d = docs(json!([{"a": 7, "b": 3}]));
        let e = Expr::field("a").divide(Expr::field("b")).round(2);
        assert_eq!(eval_expr(&d[0], &e), Some(json!(2.33)));
    }

    #[test]
    fn map_field_picks_nested_values() {
        let d = docs(json!([{"ev": [{"event": {"title": "Jazz"}}, {"event": {}}]}]));
        let e = Expr::MapField {
            input: Box::new(Expr::field("ev")),
            path: "event.title".into(),
        };
        assert_eq!(eval_expr(&d[0], &e), Some(json!(["Jazz", null])));
    }

    #[test]
    fn unwind_drops_missing_and_empty() {
        let rows = docs(json!([
            {"id": 1, "c": ["a", "b"]},
            {"id": 2, "c": []},
            {"id": 3},
            {"id": 4, "c": "solo"}
        ]));
        let out = run_pipeline(rows, &[Stage::Unwind("c".into())]);
        let ids: Vec<_> = out.iter().map(|d| d["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(1), json!(4)]);
        assert_eq!(out[1]["c"], json!("b"));
    }

    #[test]
    fn buckets_are_lower_inclusive_with_overflow_last() {
        let rows = docs(json!([{"c": 500}, {"c": 3100}, {"c": 499}, {"c": -5}]));
        let out = run_pipeline(
            rows,
            &[Stage::Bucket {
                group_by: Expr::field("c").to_double(),
                boundaries: vec![0.0, 500.0, 1000.0],
                default: COST_OVERFLOW.into(),
                output: vec![("count".into(), Accumulator::Count)],
            }],
        );
        let ids: Vec<_> = out.iter().map(|d| d["_id"].clone()).collect();
        assert_eq!(ids, vec![json!(0.0), json!(500.0), json!("3000+")]);
        assert_eq!(out[2]["count"], json!(2));
    }

    #[test]
    fn find_projects_nested_paths_and_drops_id() {
        let rows = docs(json!([
            {"_id": 1, "name": "B", "cost": 300, "r": {"agg": "4.1", "votes": 9}},
            {"_id": 2, "name": "A", "cost": 100, "r": {"agg": "3.0"}}
        ]));
        let mut spec = FindSpec::new(Filter::All, vec!["name".into(), "r.agg".into()]);
        spec.sort = vec![("cost".into(), SortOrder::Asc)];
        spec.limit = Some(1);
        let out = run_find(&rows, &spec);
        assert_eq!(out, docs(json!([{"name": "A", "r": {"agg": "3.0"}}])));
    }

    #[test]
    fn distinct_flattens_and_skips_missing() {
        let rows = docs(json!([{"l": "b"}, {"l": ["a", "b"]}, {}, {"l": "c"}]));
        assert_eq!(distinct(&rows, "l"), vec![json!("a"), json!("b"), json!("c")]);
    }

    #[test]
    fn month_parsing_accepts_common_shapes() {
        assert_eq!(month_of(&json!("2017-10-24")), Some(10));
        assert_eq!(month_of(&json!("2017-03-01 18:00:00")), Some(3));
        assert_eq!(month_of(&json!("2017-07-04T10:00:00Z")), Some(7));
        assert_eq!(month_of(&json!({"$date": "2018-02-01T00:00:00Z"})), Some(2));
        assert_eq!(month_of(&json!(0)), Some(1));
        assert_eq!(month_of(&json!("soon")), None);
    }

    #[test]
    fn facet_runs_each_branch_over_the_same_input() {
        let rows = docs(json!([{"k": 1}, {"k": 2}]));
        let out = run_pipeline(
            rows,
            &[Stage::Facet(vec![
                ("all".into(), vec![]),
                ("one".into(), vec![Stage::Limit(1)]),
            ])],
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["all"].as_array().unwrap().len(), 2);
        assert_eq!(out[0]["one"].as_array().unwrap().len(), 1);
    }
}
