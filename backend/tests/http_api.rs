mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::*;
use rideshare::handlers;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

async fn call(app: &Router, method: &str, uri: &str, user: Option<Uuid>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

fn id_of(value: &Value, pointer: &str) -> Uuid {
    value.pointer(pointer).and_then(Value::as_str).unwrap().parse().unwrap()
}

#[tokio::test]
async fn health_check_responds() {
    let world = world().await;
    let app = handlers::router(world.service.clone());
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".into()));
}

#[tokio::test]
async fn session_header_is_required() {
    let world = world().await;
    let app = handlers::router(world.service.clone());

    let (status, body) = call(&app, "GET", "/api/me", None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = call(&app, "GET", "/api/me", Some(Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, "GET", "/api/me", Some(world.driver.user.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "driver");
}

#[tokio::test]
async fn register_then_request_and_accept_over_http() {
    let world = world().await;
    mg_road_intent(&world, 3).await;
    let app = handlers::router(world.service.clone());
    let driver = world.driver.user.id;

    let (status, account) = call(
        &app,
        "POST",
        "/api/users",
        None,
        Some(json!({
            "name": "Alice Johnson",
            "email": "alice@example.com",
            "phone": "+919876543214"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let alice = id_of(&account, "/user/id");

    let (status, body) = call(
        &app,
        "POST",
        "/api/rides/request",
        Some(alice),
        Some(json!({
            "pickup": { "label": "Indiranagar, Bangalore", "lat": 12.9784, "lng": 77.6408 },
            "drop": { "label": "Whitefield, Bangalore", "lat": 12.9698, "lng": 77.7499 },
            "requested_time": "2025-08-20T10:15:00Z",
            "passenger_count": 0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    let (status, candidates) = call(
        &app,
        "POST",
        "/api/rides/request",
        Some(alice),
        Some(json!({
            "pickup": { "label": "Indiranagar, Bangalore", "lat": 12.9784, "lng": 77.6408 },
            "drop": { "label": "Whitefield, Bangalore", "lat": 12.9698, "lng": 77.7499 },
            "requested_time": "2025-08-20T10:15:00Z",
            "passenger_count": 2
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(candidates.as_array().unwrap().len(), 1);
    assert_eq!(candidates[0]["status"], "pending");
    assert_eq!(candidates[0]["driver_name"], "John Doe");
    let match_id = id_of(&candidates, "/0/id");

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/matches/{}/decision", match_id),
        Some(Uuid::new_v4()),
        Some(json!({ "decision": "accept" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let decision_uri = format!("/api/matches/{}/decision", match_id);
    let (status, decided) = call(&app, "POST", &decision_uri, Some(driver), Some(json!({ "decision": "accept" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["status"], "accepted");

    let (status, body) = call(&app, "POST", &decision_uri, Some(alice), Some(json!({ "decision": "reject" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_state");

    let (status, intents) = call(&app, "GET", "/api/intents", Some(driver), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(intents[0]["available_seats"], 1);

    let (_, notes) = call(&app, "GET", "/api/notifications", Some(driver), None).await;
    let kinds: Vec<&str> = notes["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["type"].as_str())
        .collect();
    assert!(kinds.contains(&"ride_request"));
    assert!(kinds.contains(&"ride_match"));
}

#[tokio::test]
async fn trip_lifecycle_over_http() {
    let world = world().await;
    mg_road_intent(&world, 3).await;
    let alice = passenger(&world, "Alice Johnson", "alice@example.com", "+919876543214", Some(rust_decimal_macros::dec!(1250.75))).await;
    let candidate = world
        .service
        .request_ride(&alice.session(), indiranagar_request(1))
        .await
        .unwrap()[0]
        .clone();
    let app = handlers::router(world.service.clone());
    let (driver, rider) = (world.driver.user.id, alice.user.id);

    let (status, body) = call(&app, "POST", "/api/trips", Some(driver), Some(json!({ "match_id": candidate.id }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_state");

    call(
        &app,
        "POST",
        &format!("/api/matches/{}/decision", candidate.id),
        Some(driver),
        Some(json!({ "decision": "accept" })),
    )
    .await;
    let (status, trip) = call(&app, "POST", "/api/trips", Some(driver), Some(json!({ "match_id": candidate.id }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(trip["status"], "started");
    let trip_id = id_of(&trip, "/id");
    let advance = format!("/api/trips/{}/advance", trip_id);

    let (status, _) = call(&app, "POST", &advance, Some(rider), Some(json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, trip) = call(&app, "POST", &advance, Some(driver), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trip["status"], "in_progress");

    let (status, body) = call(&app, "POST", &advance, Some(driver), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    let (status, trip) = call(&app, "POST", &advance, Some(driver), Some(json!({ "distance_km": 15.0 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trip["status"], "completed");
    assert_eq!(trip["payment_status"], "paid");

    let rating = format!("/api/trips/{}/rating", trip_id);
    let (status, _) = call(&app, "POST", &rating, Some(rider), Some(json!({ "stars": 6 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, trip) = call(&app, "POST", &rating, Some(rider), Some(json!({ "stars": 4 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trip["rating"], 4);

    let (status, wallet) = call(&app, "GET", &format!("/api/wallets/{}", alice.wallet_id), Some(rider), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(wallet["balance"], "1030.75");
    assert_eq!(wallet["transactions"].as_array().unwrap().len(), 2);

    let (status, _) = call(&app, "GET", &format!("/api/wallets/{}", alice.wallet_id), Some(driver), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, stats) = call(&app, "GET", "/api/stats", Some(driver), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["role"], "driver");
    assert_eq!(stats["completed_trips"], 1);
    assert_eq!(stats["total_earnings"], "220.00");
}

#[tokio::test]
async fn wallet_amounts_are_validated() {
    let world = world().await;
    let app = handlers::router(world.service.clone());
    let driver = world.driver.user.id;
    let uri = format!("/api/wallets/{}/transactions", world.driver.wallet_id);

    for amount in ["0", "-5.00", "10.005"] {
        let (status, body) = call(
            &app,
            "POST",
            &uri,
            Some(driver),
            Some(json!({ "type": "credit", "amount": amount, "description": "Money added via UPI" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "amount {}", amount);
        assert_eq!(body["error"], "invalid_amount");
    }

    let (status, tx) = call(
        &app,
        "POST",
        &uri,
        Some(driver),
        Some(json!({ "type": "credit", "amount": "500.00", "description": "Money added via UPI" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tx["status"], "completed");

    let (status, body) = call(
        &app,
        "POST",
        &uri,
        Some(driver),
        Some(json!({ "type": "debit", "amount": "600.00", "description": "Withdraw to bank" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "failed");
}

#[tokio::test]
async fn notifications_can_be_read_and_archived() {
    let world = world().await;
    let app = handlers::router(world.service.clone());
    let driver = world.driver.user.id;

    let (_, listed) = call(&app, "GET", "/api/notifications", Some(driver), None).await;
    assert_eq!(listed["unread_count"], 1);
    let welcome = id_of(&listed, "/notifications/0/id");

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/notifications/{}/read", welcome),
        Some(Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, note) = call(&app, "POST", &format!("/api/notifications/{}/read", welcome), Some(driver), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(note["status"], "read");

    let (status, note) = call(&app, "POST", &format!("/api/notifications/{}/archive", welcome), Some(driver), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(note["status"], "archived");

    let (_, listed) = call(&app, "GET", "/api/notifications", Some(driver), None).await;
    assert_eq!(listed["notifications"].as_array().unwrap().len(), 0);
    let (_, listed) = call(&app, "GET", "/api/notifications?include_archived=true", Some(driver), None).await;
    assert_eq!(listed["notifications"].as_array().unwrap().len(), 1);

    let (status, body) = call(&app, "POST", "/api/notifications/read-all", Some(driver), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 0);
}
