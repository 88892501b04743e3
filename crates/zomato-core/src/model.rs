use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;

/// A schema-less document as returned by the store. Key order is the
/// document's own declaration order.
pub type Document = Map<String, JsonValue>;

/// Database + collection pair a session points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub database: String,
    pub collection: String,
}

impl Target {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Resolves a dotted path. A key holding `null` is present and yields
/// `Some(&Null)`; a missing key yields `None`.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a JsonValue> {
    let mut parts = path.split('.');
    let mut cur = doc.get(parts.next()?)?;
    for part in parts {
        cur = cur.as_object()?.get(part)?;
    }
    Some(cur)
}

/// Like [`lookup`] but starting from an arbitrary value (array elements).
pub fn lookup_value<'a>(value: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    let mut cur = value;
    for part in path.split('.') {
        cur = cur.as_object()?.get(part)?;
    }
    Some(cur)
}

/// Writes `value` at a dotted path, creating intermediate objects.
pub fn set_path(doc: &mut Document, path: &str, value: JsonValue) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = doc
                .entry(head.to_string())
                .or_insert_with(|| JsonValue::Object(Map::new()));
            if !slot.is_object() {
                *slot = JsonValue::Object(Map::new());
            }
            if let JsonValue::Object(inner) = slot {
                set_path(inner, rest, value);
            }
        }
    }
}

/// The semantic roles the explorer needs to find in a restaurant document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticField {
    Name,
    Locality,
    Events,
    Cost,
    Rating,
    Cuisines,
    Delivery,
    Latitude,
    Longitude,
}

impl SemanticField {
    pub const ALL: [SemanticField; 9] = [
        SemanticField::Name,
        SemanticField::Locality,
        SemanticField::Events,
        SemanticField::Cost,
        SemanticField::Rating,
        SemanticField::Cuisines,
        SemanticField::Delivery,
        SemanticField::Latitude,
        SemanticField::Longitude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticField::Name => "name",
            SemanticField::Locality => "locality",
            SemanticField::Events => "events",
            SemanticField::Cost => "cost",
            SemanticField::Rating => "rating",
            SemanticField::Cuisines => "cuisines",
            SemanticField::Delivery => "delivery",
            SemanticField::Latitude => "latitude",
            SemanticField::Longitude => "longitude",
        }
    }
}

impl fmt::Display for SemanticField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved semantic schema for one session. Absent fields have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    paths: BTreeMap<SemanticField, String>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: SemanticField, path: impl Into<String>) {
        self.paths.insert(field, path.into());
    }

    pub fn get(&self, field: SemanticField) -> Option<&str> {
        self.paths.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: SemanticField) -> bool {
        self.paths.contains_key(&field)
    }

    /// Fields from `required` that are not resolved, in the given order.
    pub fn missing(&self, required: &[SemanticField]) -> Vec<SemanticField> {
        required
            .iter()
            .copied()
            .filter(|f| !self.contains(*f))
            .collect()
    }
}

// Absent fields serialize as null so API consumers see the whole schema.
impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SemanticField::ALL.len()))?;
        for field in SemanticField::ALL {
            map.serialize_entry(field.as_str(), &self.get(field))?;
        }
        map.end()
    }
}
