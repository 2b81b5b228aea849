mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use common::{at, entity, group, post};
use news_dashboard::api::{build_router, ApiState};
use news_dashboard::config::DisplayConfig;
use news_dashboard::models::EntityType;
use news_dashboard::snapshot::{snapshot_channel, Snapshot, SnapshotPublisher};

fn sample_snapshot() -> Snapshot {
    Snapshot::new(
        vec![
            post(1, "news", at(1, 9), "Morning briefing", ""),
            post(2, "news", at(2, 9), "Evening briefing", ""),
        ],
        vec![group(77, "news", "News Daily")],
        vec![
            entity(1, EntityType::Location, at(1, 9), "Moscow"),
            entity(2, EntityType::Location, at(2, 9), "Moscow"),
            entity(2, EntityType::Person, at(2, 9), "Ivan Petrov"),
            entity(2, EntityType::Organization, at(2, 9), "РИА Новости"),
        ],
    )
}

fn app() -> (Router, SnapshotPublisher) {
    let (publisher, reader) = snapshot_channel(sample_snapshot());
    let router = build_router(ApiState::new(reader, DisplayConfig::default()));
    (router, publisher)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let (router, _publisher) = app();
    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_groups_and_info() {
    let (router, _publisher) = app();

    let (status, body) = get(&router, "/api/groups").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["screen_name"], "news");

    let (status, body) = get(&router, "/api/groups/News%20Daily").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post_count"], 2);
    assert_eq!(body["avg_views"], 100);

    let (status, _) = get(&router, "/api/groups/Nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_series_status_codes() {
    let (router, _publisher) = app();

    let (status, body) = get(&router, "/api/groups/News%20Daily/series/views").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["y"].as_array().map(Vec::len), Some(2));

    let (status, body) = get(&router, "/api/groups/News%20Daily/series/shares").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some_and(|e| e.contains("shares")));

    let (status, _) = get(&router, "/api/groups/Nobody/series/views").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_entities_word_cloud() {
    let (router, _publisher) = app();

    let (status, body) = get(&router, "/api/groups/News%20Daily/entities?type=ALL").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entity_count"], 4);
    // Stop words from the default display config are dropped
    let words: Vec<&str> = body["cloud"]["words"]
        .as_array()
        .expect("words")
        .iter()
        .filter_map(|w| w["text"].as_str())
        .collect();
    assert_eq!(words, vec!["Moscow", "Petrov"]);

    let (status, body) = get(&router, "/api/groups/News%20Daily/entities?type=PER").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entity_count"], 1);
}

#[tokio::test]
async fn test_entities_rejects_bad_filters() {
    let (router, _publisher) = app();

    let (status, _) = get(&router, "/api/groups/News%20Daily/entities?type=PERSON").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&router, "/api/groups/News%20Daily/entities?start=200&end=100").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_entities_epoch_range() {
    let (router, _publisher) = app();
    // Display range covering only day two (stored 09:00 is shown as 12:00)
    let start = at(2, 0).and_utc().timestamp();
    let end = at(2, 23).and_utc().timestamp();

    let uri = format!("/api/groups/News%20Daily/entities?start={start}&end={end}");
    let (status, body) = get(&router, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entity_count"], 3);
}

#[tokio::test]
async fn test_slider_and_news() {
    let (router, _publisher) = app();

    let (status, body) = get(&router, "/api/groups/News%20Daily/slider").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marks"].as_object().map(serde_json::Map::len), Some(6));

    let (status, body) = get(&router, "/api/news").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"][0]["href"], "https://vk.com/news?w=wall-77_2");
}

#[tokio::test]
async fn test_status_follows_published_snapshot() {
    let (router, publisher) = app();

    let (_, body) = get(&router, "/api/status").await;
    assert_eq!(body["posts"], 2);

    publisher.publish(Snapshot::empty());
    let (_, body) = get(&router, "/api/status").await;
    assert_eq!(body["posts"], 0);
    assert_eq!(body["entities"], 0);
}
