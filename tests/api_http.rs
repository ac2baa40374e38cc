//! HTTP surface tests: real router, in-memory store, scripted source.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{memory_store, FakeSource, FAKE_RATES_ENDPOINT};
use country_data_service::models::{CountryData, ListFilter, SortOrder};
use country_data_service::routes::{create_router, AppState};
use country_data_service::store::{CountryStore, SqliteCountryStore};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Arc<SqliteCountryStore>,
    // Keeps the cache directory alive for image tests.
    _cache: tempfile::TempDir,
}

async fn test_app(source: FakeSource) -> TestApp {
    let store = Arc::new(memory_store().await);
    let cache = tempfile::tempdir().unwrap();
    let state = AppState {
        store: store.clone(),
        source: Arc::new(source),
        summary_path: cache.path().join("summary.png"),
    };
    TestApp {
        router: create_router(state),
        store,
        _cache: cache,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn seed(name: &str, gdp: Option<f64>) -> CountryData {
    CountryData {
        name: name.to_string(),
        capital: None,
        region: Some("Testregion".to_string()),
        population: 10,
        currency_code: Some("TST".to_string()),
        exchange_rate: None,
        estimated_gdp: gdp,
        flag_url: None,
        last_refreshed_at: Utc::now(),
    }
}

#[tokio::test]
async fn liveness_endpoint_responds() {
    let app = test_app(FakeSource::default()).await;
    let (status, body) = send(&app.router, get("/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "API is running...");
}

#[tokio::test]
async fn create_then_fetch_is_case_insensitive() {
    let app = test_app(FakeSource::default()).await;

    let (status, _) = send(
        &app.router,
        json_request(
            "POST",
            "/countries",
            json!({ "name": "Iceland", "population": 370000, "currency_code": "ISK" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app.router, get("/countries/ICELAND")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Iceland");
    assert_eq!(body["population"], 370000);
    // Manual create without an explicit estimate defaults to zero.
    assert_eq!(body["estimated_gdp"], 0.0);
}

#[tokio::test]
async fn create_rejects_missing_fields_with_details() {
    let app = test_app(FakeSource::default()).await;
    let (status, body) = send(
        &app.router,
        json_request("POST", "/countries", json!({ "name": "Iceland" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(body["details"]["population"], "is required");
    assert_eq!(body["details"]["currency_code"], "is required");
}

#[tokio::test]
async fn create_rejects_case_insensitive_duplicates() {
    let app = test_app(FakeSource::default()).await;
    app.store.insert(&seed("Iceland", None)).await.unwrap();

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/countries",
            json!({ "name": "ICELAND", "population": 1, "currency_code": "ISK" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Country already exists");
}

#[tokio::test]
async fn unknown_country_is_404() {
    let app = test_app(FakeSource::default()).await;
    let (status, body) = send(&app.router, get("/countries/Atlantis")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Country not found");
}

#[tokio::test]
async fn update_requires_a_non_empty_body() {
    let app = test_app(FakeSource::default()).await;
    app.store.insert(&seed("Iceland", None)).await.unwrap();

    let (status, body) = send(
        &app.router,
        json_request("PUT", "/countries/Iceland", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No update data provided");
}

#[tokio::test]
async fn update_applies_changes_and_returns_the_record() {
    let app = test_app(FakeSource::default()).await;
    app.store.insert(&seed("Iceland", None)).await.unwrap();

    let (status, body) = send(
        &app.router,
        json_request(
            "PUT",
            "/countries/iceland",
            json!({ "capital": "Reykjavik", "population": 380000 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Country updated successfully");
    assert_eq!(body["country"]["capital"], "Reykjavik");
    assert_eq!(body["country"]["population"], 380000);
    // Untouched fields survive.
    assert_eq!(body["country"]["region"], "Testregion");
}

#[tokio::test]
async fn update_of_unknown_country_is_404() {
    let app = test_app(FakeSource::default()).await;
    let (status, _) = send(
        &app.router,
        json_request("PUT", "/countries/Atlantis", json!({ "population": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_exactly_once() {
    let app = test_app(FakeSource::default()).await;
    app.store.insert(&seed("Iceland", None)).await.unwrap();

    let (status, body) = send(
        &app.router,
        Request::builder()
            .method("DELETE")
            .uri("/countries/iceland")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Country deleted successfully");

    let (status, _) = send(
        &app.router,
        Request::builder()
            .method("DELETE")
            .uri("/countries/iceland")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_supports_filters_and_gdp_sort() {
    let app = test_app(FakeSource::default()).await;
    app.store.insert(&seed("Poorland", Some(10.0))).await.unwrap();
    app.store.insert(&seed("Richland", Some(500.0))).await.unwrap();
    app.store.insert(&seed("Unknownia", None)).await.unwrap();

    let (status, body) = send(&app.router, get("/countries?sort=gdp_desc")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Richland", "Poorland", "Unknownia"]);

    let (status, body) = send(&app.router, get("/countries?region=testregion")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, body) = send(&app.router, get("/countries?currency=xxx")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn unknown_sort_value_is_ignored() {
    let app = test_app(FakeSource::default()).await;
    app.store.insert(&seed("Poorland", Some(10.0))).await.unwrap();
    app.store.insert(&seed("Richland", Some(500.0))).await.unwrap();

    let (status, body) = send(&app.router, get("/countries?sort=name")).await;
    assert_eq!(status, StatusCode::OK);
    // Unsorted default order, not a rejection.
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Poorland", "Richland"]);
}

#[tokio::test]
async fn status_reports_zero_and_null_when_empty() {
    let app = test_app(FakeSource::default()).await;
    let (status, body) = send(&app.router, get("/countries/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_countries"], 0);
    assert_eq!(body["last_refreshed_at"], Value::Null);
}

#[tokio::test]
async fn status_reflects_stored_records() {
    let app = test_app(FakeSource::default()).await;
    app.store.insert(&seed("Iceland", None)).await.unwrap();

    let (status, body) = send(&app.router, get("/countries/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_countries"], 1);
    assert!(body["last_refreshed_at"].is_string());
}

#[tokio::test]
async fn image_is_404_until_rendered_then_served_as_png() {
    let source = FakeSource::new(
        vec![json!({ "name": "Alpha", "population": 100, "currencies": [{ "code": "ALX" }] })],
        &[("ALX", 2.0)],
    );
    let app = test_app(source).await;

    let (status, body) = send(&app.router, get("/countries/image")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Summary image not found");

    let (status, body) = send(
        &app.router,
        Request::builder()
            .method("POST")
            .uri("/countries/refresh")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert!(body["last_refreshed_at"].is_string());

    let response = app
        .router
        .clone()
        .oneshot(get("/countries/image"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..8], &b"\x89PNG\r\n\x1a\n"[..]);
}

#[tokio::test]
async fn refresh_with_unavailable_source_is_503() {
    let app = test_app(FakeSource::default().failing_rates()).await;
    let (status, body) = send(
        &app.router,
        Request::builder()
            .method("POST")
            .uri("/countries/refresh")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "External data source unavailable");
    assert!(body["details"]
        .as_str()
        .unwrap()
        .contains(FAKE_RATES_ENDPOINT));
    // No partial writes.
    let stats = app.store.stats().await.unwrap();
    assert_eq!(stats.total, 0);
}

#[tokio::test]
async fn stored_names_stay_unique_under_lowercase_normalisation() {
    let app = test_app(FakeSource::default()).await;
    app.store.upsert(&seed("Iceland", None)).await.unwrap();
    app.store.upsert(&seed("ICELAND", None)).await.unwrap();
    app.store.upsert(&seed("iceland", None)).await.unwrap();

    let filter = ListFilter {
        sort: Some(SortOrder::GdpDesc),
        ..Default::default()
    };
    let rows = app.store.list(&filter).await.unwrap();
    let mut lowered: Vec<String> = rows.iter().map(|c| c.name.to_lowercase()).collect();
    lowered.dedup();
    assert_eq!(lowered.len(), rows.len());
    assert_eq!(rows.len(), 1);
}
