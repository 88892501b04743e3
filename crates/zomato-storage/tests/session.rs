use serde_json::{json, Value};
use std::sync::Arc;
use zomato_core::analytics::Panel;
use zomato_core::params::{Params, RawParams};
use zomato_core::{Document, ExplorerError, QueryId, QueryOutput, ResultTable, SemanticField, Target};
use zomato_storage::{Gateway, InMemoryGateway, Session};

fn restaurant(
    name: &str,
    locality: &str,
    events: usize,
    cost: Value,
    rating: Value,
    cuisines: &str,
    delivery: i64,
) -> Document {
    let events: Vec<Value> = (0..events)
        .map(|i| json!({"event": {"title": format!("{name} night {i}"), "start_date": "2017-10-24"}}))
        .collect();
    json!({
        "name": name,
        "cuisines": cuisines,
        "has_online_delivery": delivery,
        "average_cost_for_two": cost,
        "location": {"locality": locality, "latitude": "28.52", "longitude": "77.21"},
        "user_rating": {"aggregate_rating": rating},
        "zomato_events": events,
    })
    .as_object()
    .cloned()
    .unwrap()
}

fn restaurants() -> Vec<Document> {
    vec![
        restaurant("Barbeque Nation", "Saket", 2, json!(1500), json!("4.2"), "North Indian", 1),
        restaurant("Cafe Lota", "Saket", 2, json!(500), json!("4.0"), "Asian", 0),
        restaurant("Dhaba", "Saket", 3, json!(800), json!("NA"), "Continental", 0),
        restaurant("Kebab Corner", "Connaught Place", 1, json!(3100), json!("4.6"), "Mughlai", 0),
        restaurant("Chaat Stop", "Connaught Place", 0, json!(200), json!("3.5"), "Street Food", 0),
        restaurant("Momo Hut", "Hauz Khas", 0, json!("NA"), json!("4.8"), "Tibetan", 0),
        restaurant("Thali House", "Hauz Khas", 0, json!(1600), json!(4.1), "North Indian", 0),
    ]
}

fn target() -> Target {
    Target::new("zomato", "zomatoo")
}

async fn open(docs: Vec<Document>) -> Session {
    let gw: Arc<dyn Gateway> = Arc::new(InMemoryGateway::with_documents(target(), docs));
    Session::open(gw, false).await.unwrap()
}

fn table(out: QueryOutput) -> ResultTable {
    match out {
        QueryOutput::Table(t) => t,
        other => panic!("expected table, got {other:?}"),
    }
}

fn names(t: &ResultTable) -> Vec<String> {
    t.column("Restaurant")
        .into_iter()
        .map(|v| v.as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn canonical_dataset_enables_the_full_menu() {
    let s = open(restaurants()).await;
    assert_eq!(s.total(), 7);
    assert!(s.diagnostics().is_empty());
    assert_eq!(s.fields().get(SemanticField::Name), Some("name"));
    assert_eq!(s.menu().len(), 10);
    assert_eq!(s.panels().len(), 9);
}

#[tokio::test]
async fn empty_collection_fails_to_open() {
    let gw: Arc<dyn Gateway> = Arc::new(InMemoryGateway::new(target()));
    let err = Session::open(gw, false).await.err().unwrap();
    assert_eq!(
        err,
        ExplorerError::EmptyCollection {
            collection: "zomatoo".into()
        }
    );
}

#[tokio::test]
async fn missing_name_hides_dependent_queries() {
    let s = open(vec![json!({"location": {"locality": "Saket"}, "average_cost_for_two": 300})
        .as_object()
        .cloned()
        .unwrap()])
    .await;
    assert!(!s.fields().contains(SemanticField::Name));
    let ids: Vec<QueryId> = s.menu().iter().map(|d| d.id).collect();
    assert!(!ids.contains(&QueryId::ListNames));
    assert!(!ids.contains(&QueryId::CostPagination));
    assert!(ids.contains(&QueryId::UniqueLocalities));
    assert!(ids.contains(&QueryId::SampleDocument));
    assert!(s
        .unavailable()
        .iter()
        .any(|(d, missing)| d.id == QueryId::ListNames && missing == &vec![SemanticField::Name]));
}

#[tokio::test]
async fn unique_localities_are_sorted() {
    let s = open(restaurants()).await;
    let t = table(s.run(QueryId::UniqueLocalities).await.unwrap());
    assert_eq!(
        t.column("Locality"),
        vec![&json!("Connaught Place"), &json!("Hauz Khas"), &json!("Saket")]
    );
}

#[tokio::test]
async fn pagination_is_a_stable_prefix() {
    let mut s = open(restaurants()).await;
    let short = RawParams {
        skip: Some(0),
        limit: Some(3),
        ..RawParams::default()
    };
    let long = RawParams {
        limit: Some(6),
        ..short.clone()
    };
    let a = table(s.run_with(QueryId::CostPagination, &short).await.unwrap());
    let b = table(s.run_with(QueryId::CostPagination, &long).await.unwrap());
    assert_eq!(names(&a), vec!["Chaat Stop", "Cafe Lota", "Dhaba"]);
    assert_eq!(names(&b)[..3], names(&a)[..]);
    assert_eq!(b.rows.len(), 6);
}

#[tokio::test]
async fn events_per_restaurant_is_rounded() {
    let s = open(restaurants()).await;
    let t = table(s.run(QueryId::TopLocalities).await.unwrap());
    assert_eq!(t.rows.len(), 2);
    let top = &t.rows[0];
    assert_eq!(top["Locality"], json!("Saket"));
    assert_eq!(top["Restaurants"], json!(3));
    assert_eq!(top["Total Events"], json!(7));
    assert_eq!(top["Events/Restaurant"], json!(2.33));
    assert_eq!(top["Avg Cost for 2"], json!(933.33));
    assert_eq!(top["Avg Rating"], json!(4.1));
}

#[tokio::test]
async fn events_by_locality_counts_only_restaurants_with_events() {
    let s = open(restaurants()).await;
    let t = table(s.run(QueryId::EventsByLocality).await.unwrap());
    assert_eq!(
        t.column("Locality"),
        vec![&json!("Saket"), &json!("Connaught Place")]
    );
    assert_eq!(t.column("Total Events"), vec![&json!(7), &json!(1)]);
}

#[tokio::test]
async fn budget_filter_bounds_and_coercion() {
    let s = open(restaurants()).await;
    let t = table(s.run(QueryId::BudgetSearch).await.unwrap());
    // 4.0 is not above the default minimum, 1500 is within the default budget
    assert_eq!(names(&t), vec!["Barbeque Nation"]);
    assert_eq!(t.rows[0]["Rating"], json!("4.2"));
}

#[tokio::test]
async fn rejected_params_keep_previous_values() {
    let mut s = open(restaurants()).await;
    let ok = RawParams {
        min_rating: Some(3.0),
        ..RawParams::default()
    };
    s.update_params(QueryId::BudgetSearch, &ok).unwrap();
    let bad = RawParams {
        min_rating: Some(7.5),
        ..RawParams::default()
    };
    let err = s.run_with(QueryId::BudgetSearch, &bad).await.unwrap_err();
    assert!(matches!(err, ExplorerError::ParameterOutOfRange { .. }));
    assert_eq!(s.params().min_rating, 3.0);
    let t = table(s.run(QueryId::BudgetSearch).await.unwrap());
    assert_eq!(names(&t), vec!["Barbeque Nation", "Cafe Lota", "Chaat Stop"]);
}

#[tokio::test]
async fn cuisine_or_delivery() {
    let s = open(restaurants()).await;
    let t = table(s.run(QueryId::CuisineOrDelivery).await.unwrap());
    assert_eq!(names(&t), vec!["Barbeque Nation", "Cafe Lota", "Dhaba"]);
}

#[tokio::test]
async fn event_titles_only_for_restaurants_with_events() {
    let s = open(restaurants()).await;
    let t = table(s.run(QueryId::EventTitles).await.unwrap());
    assert_eq!(t.rows.len(), 4);
    assert_eq!(
        t.rows[0]["Event Titles"],
        json!(["Barbeque Nation night 0", "Barbeque Nation night 1"])
    );
}

#[tokio::test]
async fn facet_buckets_costs_and_skips_unconvertible() {
    let s = open(restaurants()).await;
    let QueryOutput::Facet {
        top_neighborhoods,
        cost_buckets,
    } = s.run(QueryId::NeighborhoodFacet).await.unwrap()
    else {
        panic!("expected facet");
    };
    // no locality reaches the minimum group size
    assert!(top_neighborhoods.is_empty());
    assert_eq!(
        cost_buckets.column("Range"),
        vec![&json!("0-500"), &json!("500-1000"), &json!("1500-2000"), &json!("3000+")]
    );
    assert_eq!(
        cost_buckets.column("Restaurants"),
        vec![&json!(1), &json!(2), &json!(2), &json!(1)]
    );
}

#[tokio::test]
async fn sample_document_is_the_first_one() {
    let s = open(restaurants()).await;
    match s.run(QueryId::SampleDocument).await.unwrap() {
        QueryOutput::Document(Some(doc)) => assert_eq!(doc["name"], json!("Barbeque Nation")),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn analytics_panels() {
    let s = open(restaurants()).await;
    let QueryOutput::Metric(total) = s.panel(Panel::TotalRestaurants).await.unwrap() else {
        panic!("expected metric");
    };
    assert_eq!(total.value, json!(7));
    let QueryOutput::Metric(events) = s.panel(Panel::TotalEvents).await.unwrap() else {
        panic!("expected metric");
    };
    assert_eq!(events.value, json!(8));

    let trend = table(s.panel(Panel::MonthlyEventTrend).await.unwrap());
    assert_eq!(trend.column("Month"), vec![&json!("Oct")]);
    assert_eq!(trend.column("Event Count"), vec![&json!(8)]);

    let cuisines = table(s.panel(Panel::TopCuisines).await.unwrap());
    assert_eq!(cuisines.rows[0]["Cuisine"], json!("North Indian"));
    assert_eq!(cuisines.rows[0]["Restaurants"], json!(2));

    let map = table(s.panel(Panel::RestaurantMap).await.unwrap());
    assert_eq!(map.rows.len(), 7);
    assert_eq!(map.rows[0]["lat"], json!(28.52));
}

#[tokio::test]
async fn empty_result_is_an_empty_table() {
    let mut s = open(restaurants()).await;
    let raw = RawParams {
        max_cost: Some(0),
        ..RawParams::default()
    };
    let out = s.run_with(QueryId::BudgetSearch, &raw).await.unwrap();
    assert!(out.is_empty());
    assert_eq!(table(out).columns, vec!["Restaurant", "Rating", "Cost for 2"]);
}

#[tokio::test]
async fn retarget_recomputes_the_field_map() {
    let gw = InMemoryGateway::with_documents(target(), restaurants());
    let other = Target::new("zomato", "cafes");
    gw.load(
        other.clone(),
        vec![json!({"restaurant_name": "Blue Tokai", "area": {"locality": "Saket"}})
            .as_object()
            .cloned()
            .unwrap()],
    );
    let s = Session::open(Arc::new(gw), false).await.unwrap();
    let next = s.retarget(other.clone()).await.unwrap();
    assert_eq!(next.target(), &other);
    assert_eq!(next.total(), 1);
    assert_eq!(next.fields().get(SemanticField::Name), Some("restaurant_name"));
    assert_eq!(next.fields().get(SemanticField::Locality), Some("area.locality"));
    // two fallbacks plus seven absent fields
    assert_eq!(next.diagnostics().len(), 9);
}

#[tokio::test]
async fn result_cache_serves_repeat_runs() {
    let gw = InMemoryGateway::with_documents(target(), restaurants());
    let s = Session::open(Arc::new(gw.clone()), true).await.unwrap();
    let first = s.run(QueryId::ListNames).await.unwrap();
    gw.load(target(), restaurants().into_iter().take(1).collect());
    assert_eq!(s.run(QueryId::ListNames).await.unwrap(), first);
}

#[tokio::test]
async fn result_cache_evicts_oldest_outputs() {
    let gw = InMemoryGateway::with_documents(target(), restaurants());
    let s = Session::open(Arc::new(gw.clone()), true)
        .await
        .unwrap()
        .with_cache_capacity(2);
    let page = |limit| Params {
        skip: 0,
        limit,
        ..Params::default()
    };
    for limit in 2..=5 {
        s.run_params(QueryId::CostPagination, &page(limit)).await.unwrap();
    }
    assert_eq!(s.cached_results(), 2);

    gw.load(target(), restaurants().into_iter().take(1).collect());
    let newest = table(s.run_params(QueryId::CostPagination, &page(5)).await.unwrap());
    assert_eq!(newest.rows.len(), 5);
    let evicted = table(s.run_params(QueryId::CostPagination, &page(2)).await.unwrap());
    assert_eq!(names(&evicted), vec!["Barbeque Nation"]);
    assert_eq!(s.cached_results(), 2);
}

#[tokio::test]
async fn explicit_params_leave_session_values_alone() {
    let s = open(restaurants()).await;
    let raw = RawParams {
        skip: Some(0),
        limit: Some(2),
        ..RawParams::default()
    };
    let params = s.validate_params(QueryId::CostPagination, &raw).unwrap();
    let t = table(s.run_params(QueryId::CostPagination, &params).await.unwrap());
    assert_eq!(names(&t), vec!["Chaat Stop", "Cafe Lota"]);
    assert_eq!(s.params(), &Params::default());
}

fn neighborhoods_of(out: QueryOutput) -> ResultTable {
    match out {
        QueryOutput::Facet {
            top_neighborhoods, ..
        } => top_neighborhoods,
        other => panic!("expected facet, got {other:?}"),
    }
}

#[tokio::test]
async fn facet_keeps_localities_with_at_least_five_restaurants() {
    let mut docs = Vec::new();
    for i in 0..5 {
        docs.push(restaurant(&format!("Saket {i}"), "Saket", 0, json!(500), json!("4.0"), "Cafe", 0));
    }
    for i in 0..4 {
        docs.push(restaurant(&format!("Hauz Khas {i}"), "Hauz Khas", 0, json!(500), json!("4.9"), "Cafe", 0));
    }
    let s = open(docs).await;
    let top = neighborhoods_of(s.run(QueryId::NeighborhoodFacet).await.unwrap());
    assert_eq!(top.rows.len(), 1);
    assert_eq!(top.rows[0]["Locality"], json!("Saket"));
    assert_eq!(top.rows[0]["Avg Rating"], json!(4.0));
    assert_eq!(top.rows[0]["Restaurants"], json!(5));
}

#[tokio::test]
async fn facet_ranks_top_five_localities_by_rating() {
    let areas = [
        ("Saket", "4.1"),
        ("Hauz Khas", "4.5"),
        ("Connaught Place", "3.9"),
        ("Vasant Kunj", "4.3"),
        ("Lajpat Nagar", "4.4"),
        ("Defence Colony", "4.2"),
    ];
    let mut docs = Vec::new();
    for (area, rating) in areas {
        for i in 0..5 {
            docs.push(restaurant(&format!("{area} {i}"), area, 0, json!(700), json!(rating), "Cafe", 0));
        }
    }
    let s = open(docs).await;
    let top = neighborhoods_of(s.run(QueryId::NeighborhoodFacet).await.unwrap());
    assert_eq!(
        top.column("Locality"),
        vec![
            &json!("Hauz Khas"),
            &json!("Lajpat Nagar"),
            &json!("Vasant Kunj"),
            &json!("Defence Colony"),
            &json!("Saket"),
        ]
    );
    assert_eq!(top.rows[0]["Avg Rating"], json!(4.5));
    assert_eq!(top.column("Restaurants"), vec![&json!(5); 5]);
}
