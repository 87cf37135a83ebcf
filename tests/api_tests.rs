// HTTP API tests for Lume Discovery

use actix_web::{test, web, App};
use chrono::Utc;
use lume_discovery::models::{Gender, GeoPoint, Mode, Profile};
use lume_discovery::routes::{self, handle_json_payload_error, handle_query_payload_error, AppState};
use lume_discovery::services::{DiscoveryOptions, DiscoveryService, LogNotifier, MemoryStore, Stores};
use serde_json::{json, Value};
use std::sync::Arc;

fn create_test_profile(id: &str) -> Profile {
    Profile {
        user_id: id.to_string(),
        display_name: Some(id.to_uppercase()),
        age: Some(30),
        gender: Some(Gender::Male),
        mode: Mode::Dating,
        interests: vec!["surfing".to_string()],
        location: Some(GeoPoint::new(106.0, 10.0)),
        bio: None,
        updated_at: Utc::now(),
    }
}

async fn state_with(users: &[&str]) -> AppState {
    let store = Arc::new(MemoryStore::new());
    for user in users {
        store.upsert_profile(create_test_profile(user)).await;
    }
    let stores = Stores::from_store(store, Arc::new(LogNotifier));
    AppState {
        service: Arc::new(DiscoveryService::new(stores, DiscoveryOptions::default())),
        database: None,
    }
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
                .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
                .configure(routes::configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn test_health_without_database() {
    let app = init_app!(state_with(&[]).await);

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[actix_web::test]
async fn test_like_flow_over_http() {
    let app = init_app!(state_with(&["alice", "bob"]).await);

    let req = test::TestRequest::post()
        .uri("/api/v1/swipes/like")
        .set_json(json!({ "userId": "alice", "targetUserId": "bob" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["action"], "like");
    assert_eq!(body["outcome"]["status"], "no_match");

    let req = test::TestRequest::post()
        .uri("/api/v1/swipes/like")
        .set_json(json!({ "userId": "bob", "targetUserId": "alice" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["outcome"]["status"], "matched");
    let match_id = body["outcome"]["matchId"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/v1/matches/status?userId=alice&targetUserId=bob")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["matched"], true);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/matches/{}?userId=alice", match_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/matches/{}/unmatch", match_id))
        .set_json(json!({ "userId": "bob" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);

    let req = test::TestRequest::get().uri("/api/v1/matches?userId=alice").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 0);
}

#[actix_web::test]
async fn test_error_responses() {
    let app = init_app!(state_with(&["alice"]).await);

    let req = test::TestRequest::post()
        .uri("/api/v1/swipes/like")
        .set_json(json!({ "userId": "alice", "targetUserId": "alice" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "self_action");

    let req = test::TestRequest::post()
        .uri("/api/v1/swipes/pass")
        .set_json(json!({ "userId": "alice", "targetUserId": "ghost" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::post()
        .uri("/api/v1/swipes/superlike")
        .set_json(json!({ "userId": "alice", "targetUserId": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation_failed");

    let req = test::TestRequest::post()
        .uri("/api/v1/swipes/like")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = test::TestRequest::get()
        .uri("/api/v1/matches/not-a-uuid?userId=alice")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::get().uri("/api/v1/swipes/quota").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_cards_and_quota_over_http() {
    let app = init_app!(state_with(&["alice", "bob", "carol"]).await);

    let req = test::TestRequest::get()
        .uri("/api/v1/discovery/cards?userId=alice&limit=5&excludeUserIds=carol")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let cards = body["cards"].as_array().unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0]["profile"]["userId"], "bob");
    assert_eq!(cards[0]["distanceKm"], 0.0);
    assert!(cards[0]["profile"].get("location").is_none());

    let req = test::TestRequest::get()
        .uri("/api/v1/swipes/quota?userId=alice")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["likes"]["remaining"], 30);
    assert_eq!(body["superLikes"]["dailyLimit"], 0);

    let req = test::TestRequest::get()
        .uri("/api/v1/discovery/next?userId=alice")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["card"].is_object());
}
