//! Schema auto-detection.
//!
//! Each semantic field has an ordered list of candidates. Candidates are
//! checked against one sample document and the first that resolves wins.
//! Adding a fallback is a one-line edit to [`RULES`].

use crate::model::{lookup, Document, FieldMap, SemanticField};
use crate::{ExplorerError, Result};
use serde::Serialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    String,
    List,
}

impl Kind {
    fn matches(&self, value: &JsonValue) -> bool {
        match self {
            Kind::String => value.is_string(),
            Kind::List => value.is_array(),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::List => "list",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Candidate {
    /// Dotted path, matched by presence (null counts as present).
    Path(&'static str),
    /// First top-level field whose value has the given kind.
    FirstOfKind(Kind),
    /// First top-level object holding the key; resolves to `<parent>.<key>`.
    NestedKey(&'static str),
}

impl Candidate {
    fn probe(&self, sample: &Document) -> Option<String> {
        match self {
            Candidate::Path(path) => lookup(sample, path).map(|_| path.to_string()),
            Candidate::FirstOfKind(kind) => sample
                .iter()
                .find(|(_, v)| kind.matches(v))
                .map(|(k, _)| k.clone()),
            Candidate::NestedKey(key) => sample
                .iter()
                .find(|(_, v)| v.as_object().is_some_and(|o| o.contains_key(*key)))
                .map(|(k, _)| format!("{k}.{key}")),
        }
    }

    fn describe(&self) -> String {
        match self {
            Candidate::Path(path) => format!("`{path}`"),
            Candidate::FirstOfKind(kind) => format!("first {} field", kind.describe()),
            Candidate::NestedKey(key) => format!("first nested object with `{key}`"),
        }
    }
}

use Candidate::{FirstOfKind, NestedKey, Path};

const RULES: &[(SemanticField, &[Candidate])] = &[
    (
        SemanticField::Name,
        &[Path("name"), Path("restaurant_name"), FirstOfKind(Kind::String)],
    ),
    (
        SemanticField::Locality,
        &[Path("location.locality"), NestedKey("locality")],
    ),
    (
        SemanticField::Events,
        &[Path("zomato_events"), FirstOfKind(Kind::List)],
    ),
    (SemanticField::Cost, &[Path("average_cost_for_two")]),
    (SemanticField::Rating, &[Path("user_rating.aggregate_rating")]),
    (SemanticField::Cuisines, &[Path("cuisines")]),
    (SemanticField::Delivery, &[Path("has_online_delivery")]),
    (
        SemanticField::Latitude,
        &[Path("location.latitude"), NestedKey("latitude")],
    ),
    (
        SemanticField::Longitude,
        &[Path("location.longitude"), NestedKey("longitude")],
    ),
];

/// Emitted whenever a field falls back or ends up absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub field: SemanticField,
    pub chosen: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub fields: FieldMap,
    pub diagnostics: Vec<Diagnostic>,
}

/// Detects every semantic field in `sample`. Fails only when the sample is
/// empty; undetectable fields are reported through diagnostics.
pub fn resolve(collection: &str, sample: &Document) -> Result<Resolution> {
    if sample.is_empty() {
        return Err(ExplorerError::EmptyCollection {
            collection: collection.to_string(),
        });
    }
    let mut fields = FieldMap::new();
    let mut diagnostics = Vec::new();
    for (field, candidates) in RULES {
        let hit = candidates
            .iter()
            .enumerate()
            .find_map(|(i, c)| c.probe(sample).map(|path| (i, path)));
        match hit {
            Some((0, path)) => fields.insert(*field, path),
            Some((i, path)) => {
                diagnostics.push(Diagnostic {
                    field: *field,
                    chosen: Some(path.clone()),
                    reason: format!(
                        "{} not found; using {} `{}`",
                        candidates[0].describe(),
                        candidates[i].describe(),
                        path
                    ),
                });
                fields.insert(*field, path);
            }
            None => {
                let tried: Vec<String> = candidates.iter().map(Candidate::describe).collect();
                diagnostics.push(Diagnostic {
                    field: *field,
                    chosen: None,
                    reason: format!(
                        "none of {} present; {} features disabled",
                        tried.join(", "),
                        field
                    ),
                });
            }
        }
    }
    Ok(Resolution {
        fields,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: JsonValue) -> Document {
        v.as_object().cloned().unwrap()
    }

    fn zomato_sample() -> Document {
        doc(json!({
            "_id": {"$oid": "64b7f0c2a1b2c3d4e5f60718"},
            "name": "Barbeque Nation",
            "cuisines": "North Indian, Chinese",
            "has_online_delivery": 1,
            "average_cost_for_two": 1600,
            "location": {
                "locality": "Connaught Place",
                "latitude": "28.6331",
                "longitude": "77.2201"
            },
            "user_rating": {"aggregate_rating": "4.4", "votes": "2349"},
            "zomato_events": [{"event": {"title": "Happy Hour"}}]
        }))
    }

    #[test]
    fn canonical_fields_resolve_without_diagnostics() {
        let r = resolve("zomatoo", &zomato_sample()).unwrap();
        assert!(r.diagnostics.is_empty());
        assert_eq!(r.fields.get(SemanticField::Name), Some("name"));
        assert_eq!(
            r.fields.get(SemanticField::Locality),
            Some("location.locality")
        );
        assert_eq!(r.fields.get(SemanticField::Events), Some("zomato_events"));
        assert_eq!(
            r.fields.get(SemanticField::Cost),
            Some("average_cost_for_two")
        );
        assert_eq!(
            r.fields.get(SemanticField::Rating),
            Some("user_rating.aggregate_rating")
        );
        assert_eq!(
            r.fields.get(SemanticField::Latitude),
            Some("location.latitude")
        );
    }

    #[test]
    fn name_wins_over_other_string_fields() {
        let r = resolve(
            "c",
            &doc(json!({"title": "x", "name": "Cafe", "restaurant_name": "y"})),
        )
        .unwrap();
        assert_eq!(r.fields.get(SemanticField::Name), Some("name"));
        assert!(r
            .diagnostics
            .iter()
            .all(|d| d.field != SemanticField::Name));
    }

    #[test]
    fn structural_fallbacks_follow_declaration_order() {
        let sample = doc(json!({
            "rank": 3,
            "title": "Cafe Lota",
            "brand": "Lota",
            "menus": ["a"],
            "deals": [{"event": {"title": "x"}}],
            "address": {"city": "Delhi"},
            "geo": {"locality": "Pragati Maidan", "latitude": 28.6}
        }));
        let r = resolve("c", &sample).unwrap();
        assert_eq!(r.fields.get(SemanticField::Name), Some("title"));
        assert_eq!(r.fields.get(SemanticField::Events), Some("menus"));
        assert_eq!(r.fields.get(SemanticField::Locality), Some("geo.locality"));
        assert_eq!(r.fields.get(SemanticField::Latitude), Some("geo.latitude"));
        assert_eq!(r.fields.get(SemanticField::Longitude), None);

        let name_diag = r
            .diagnostics
            .iter()
            .find(|d| d.field == SemanticField::Name)
            .unwrap();
        assert_eq!(name_diag.chosen.as_deref(), Some("title"));
    }

    #[test]
    fn restaurant_name_is_second_choice() {
        let r = resolve("c", &doc(json!({"city": "Delhi", "restaurant_name": "Cafe"}))).unwrap();
        assert_eq!(r.fields.get(SemanticField::Name), Some("restaurant_name"));
    }

    #[test]
    fn no_string_field_leaves_name_absent() {
        let r = resolve("c", &doc(json!({"votes": 10, "tags": ["a"]}))).unwrap();
        assert_eq!(r.fields.get(SemanticField::Name), None);
        let d = r
            .diagnostics
            .iter()
            .find(|d| d.field == SemanticField::Name)
            .unwrap();
        assert_eq!(d.chosen, None);
    }

    #[test]
    fn cost_and_rating_have_no_structural_fallback() {
        let r = resolve(
            "c",
            &doc(json!({"name": "x", "price": 500, "rating": {"score": 4.1}})),
        )
        .unwrap();
        assert!(!r.fields.contains(SemanticField::Cost));
        assert!(!r.fields.contains(SemanticField::Rating));
    }

    #[test]
    fn null_at_canonical_path_counts_as_present() {
        let r = resolve(
            "c",
            &doc(json!({"name": "x", "user_rating": {"aggregate_rating": null}})),
        )
        .unwrap();
        assert_eq!(
            r.fields.get(SemanticField::Rating),
            Some("user_rating.aggregate_rating")
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let sample = zomato_sample();
        assert_eq!(resolve("c", &sample).unwrap(), resolve("c", &sample).unwrap());
    }

    #[test]
    fn empty_sample_is_rejected() {
        let err = resolve("zomatoo", &Document::new()).unwrap_err();
        assert_eq!(
            err,
            ExplorerError::EmptyCollection {
                collection: "zomatoo".into()
            }
        );
    }
}
