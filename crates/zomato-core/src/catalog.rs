use crate::model::{FieldMap, SemanticField};
use crate::params::{ParamKind, ParamName, ParamSpec};
use crate::ExplorerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryId {
    ListNames,
    UniqueLocalities,
    EventTitles,
    EventsByLocality,
    TopLocalities,
    SampleDocument,
    BudgetSearch,
    CostPagination,
    CuisineOrDelivery,
    NeighborhoodFacet,
}

impl QueryId {
    pub fn number(&self) -> u8 {
        *self as u8 + 1
    }

    pub fn slug(&self) -> &'static str {
        match self {
            QueryId::ListNames => "list-names",
            QueryId::UniqueLocalities => "unique-localities",
            QueryId::EventTitles => "event-titles",
            QueryId::EventsByLocality => "events-by-locality",
            QueryId::TopLocalities => "top-localities",
            QueryId::SampleDocument => "sample-document",
            QueryId::BudgetSearch => "budget-search",
            QueryId::CostPagination => "cost-pagination",
            QueryId::CuisineOrDelivery => "cuisine-or-delivery",
            QueryId::NeighborhoodFacet => "neighborhood-facet",
        }
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for QueryId {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        CATALOG
            .iter()
            .map(|d| d.id)
            .find(|id| id.slug() == s || id.number().to_string() == s)
            .ok_or_else(|| ExplorerError::UnknownQuery(s.to_string()))
    }
}

/// How the built query is executed; mirrors the `QuerySpec` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineShape {
    Find,
    FindOne,
    Distinct,
    Aggregate,
    Facet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryDescriptor {
    pub id: QueryId,
    /// Display label; `{name}` and `{locality}` are replaced by resolved paths.
    pub title: &'static str,
    pub requires: &'static [SemanticField],
    pub params: &'static [ParamSpec],
    pub shape: PipelineShape,
}

impl QueryDescriptor {
    pub fn label(&self, fields: &FieldMap) -> String {
        let mut label = format!("{}. {}", self.id.number(), self.title);
        for field in [SemanticField::Name, SemanticField::Locality] {
            let placeholder = format!("{{{}}}", field.as_str());
            if label.contains(&placeholder) {
                label = label.replace(&placeholder, fields.get(field).unwrap_or("?"));
            }
        }
        label
    }

    pub fn is_available(&self, fields: &FieldMap) -> bool {
        fields.missing(self.requires).is_empty()
    }
}

const MIN_RATING: ParamSpec = ParamSpec {
    name: ParamName::MinRating,
    label: "Minimum rating",
    kind: ParamKind::Float { min: 0.0, max: 5.0 },
};
const MAX_COST: ParamSpec = ParamSpec {
    name: ParamName::MaxCost,
    label: "Max cost for 2",
    kind: ParamKind::Integer { min: 0 },
};
const SKIP: ParamSpec = ParamSpec {
    name: ParamName::Skip,
    label: "Skip N docs",
    kind: ParamKind::Integer { min: 0 },
};
const LIMIT: ParamSpec = ParamSpec {
    name: ParamName::Limit,
    label: "Limit",
    kind: ParamKind::Integer { min: 1 },
};

use SemanticField::*;

pub static CATALOG: [QueryDescriptor; 10] = [
    QueryDescriptor {
        id: QueryId::ListNames,
        title: "Show only “{name}”",
        requires: &[Name],
        params: &[],
        shape: PipelineShape::Find,
    },
    QueryDescriptor {
        id: QueryId::UniqueLocalities,
        title: "List unique “{locality}”",
        requires: &[Locality],
        params: &[],
        shape: PipelineShape::Distinct,
    },
    QueryDescriptor {
        id: QueryId::EventTitles,
        title: "Show “{name}” & event titles",
        requires: &[Name, Events],
        params: &[],
        shape: PipelineShape::Aggregate,
    },
    QueryDescriptor {
        id: QueryId::EventsByLocality,
        title: "Count events by locality",
        requires: &[Locality, Events],
        params: &[],
        shape: PipelineShape::Aggregate,
    },
    QueryDescriptor {
        id: QueryId::TopLocalities,
        title: "Top 3 localities: events/rest + avg cost + avg rating",
        requires: &[Locality, Events, Cost, Rating],
        params: &[],
        shape: PipelineShape::Aggregate,
    },
    QueryDescriptor {
        id: QueryId::SampleDocument,
        title: "Show one sample document",
        requires: &[],
        params: &[],
        shape: PipelineShape::FindOne,
    },
    QueryDescriptor {
        id: QueryId::BudgetSearch,
        title: "High-rated, budget-friendly spots",
        requires: &[Name, Rating, Cost],
        params: &[MIN_RATING, MAX_COST],
        shape: PipelineShape::Find,
    },
    QueryDescriptor {
        id: QueryId::CostPagination,
        title: "Page through restaurants by cost",
        requires: &[Name, Cost],
        params: &[SKIP, LIMIT],
        shape: PipelineShape::Find,
    },
    QueryDescriptor {
        id: QueryId::CuisineOrDelivery,
        title: "Continental / Asian OR online-delivery",
        requires: &[Name, Cuisines, Delivery],
        params: &[],
        shape: PipelineShape::Find,
    },
    QueryDescriptor {
        id: QueryId::NeighborhoodFacet,
        title: "Facet: top neighborhoods & cost buckets",
        requires: &[Locality, Rating, Cost],
        params: &[],
        shape: PipelineShape::Facet,
    },
];

pub fn catalog() -> &'static [QueryDescriptor] {
    &CATALOG
}

pub fn descriptor(id: QueryId) -> &'static QueryDescriptor {
    &CATALOG[id as usize]
}

/// Descriptors whose required fields are all resolved, in catalog order.
pub fn menu(fields: &FieldMap) -> Vec<&'static QueryDescriptor> {
    CATALOG.iter().filter(|d| d.is_available(fields)).collect()
}

/// Descriptors left out of the menu, with the fields each one is missing.
pub fn unavailable(fields: &FieldMap) -> Vec<(&'static QueryDescriptor, Vec<SemanticField>)> {
    CATALOG
        .iter()
        .filter_map(|d| {
            let missing = fields.missing(d.requires);
            (!missing.is_empty()).then_some((d, missing))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_fields() -> FieldMap {
        let mut f = FieldMap::new();
        for field in SemanticField::ALL {
            f.insert(field, field.as_str());
        }
        f
    }

    #[test]
    fn catalog_is_ordered_and_indexed_by_id() {
        assert_eq!(catalog().len(), 10);
        for (i, d) in catalog().iter().enumerate() {
            assert_eq!(d.id.number() as usize, i + 1);
            assert_eq!(descriptor(d.id).id, d.id);
        }
    }

    #[test]
    fn parses_numbers_and_slugs() {
        assert_eq!("7".parse::<QueryId>().unwrap(), QueryId::BudgetSearch);
        assert_eq!(
            "neighborhood-facet".parse::<QueryId>().unwrap(),
            QueryId::NeighborhoodFacet
        );
        assert!(matches!(
            "11".parse::<QueryId>(),
            Err(ExplorerError::UnknownQuery(_))
        ));
    }

    #[test]
    fn full_schema_enables_everything() {
        let f = full_fields();
        assert_eq!(menu(&f).len(), 10);
        assert!(unavailable(&f).is_empty());
    }

    #[test]
    fn missing_name_disables_dependent_queries() {
        let mut f = FieldMap::new();
        for field in SemanticField::ALL {
            if field != SemanticField::Name {
                f.insert(field, field.as_str());
            }
        }
        let ids: Vec<QueryId> = menu(&f).iter().map(|d| d.id).collect();
        assert_eq!(
            ids,
            vec![
                QueryId::UniqueLocalities,
                QueryId::EventsByLocality,
                QueryId::TopLocalities,
                QueryId::SampleDocument,
                QueryId::NeighborhoodFacet,
            ]
        );
        let off = unavailable(&f);
        assert_eq!(off.len(), 5);
        assert!(off.iter().all(|(_, m)| m == &vec![SemanticField::Name]));
    }

    #[test]
    fn labels_embed_resolved_paths() {
        let mut f = FieldMap::new();
        f.insert(SemanticField::Name, "restaurant_name");
        f.insert(SemanticField::Locality, "geo.locality");
        assert_eq!(
            descriptor(QueryId::ListNames).label(&f),
            "1. Show only “restaurant_name”"
        );
        assert_eq!(
            descriptor(QueryId::UniqueLocalities).label(&f),
            "2. List unique “geo.locality”"
        );
    }
}
