mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use notification_cell::InMemoryNotificationLog;
use scheduling_cell::handlers::SchedulingState;
use scheduling_cell::router::scheduling_routes;
use scheduling_cell::services::{
    BookingService, InMemoryStore, NoopNotifier, ReminderService, SchedulingStore, StaffLocks,
};
use shared_utils::test_utils::TestConfig;

use common::*;

const ADMIN_SECRET: &str = "reminder-secret";

fn app(store: Arc<InMemoryStore>) -> Router {
    app_over(store)
}

fn app_over(store: Arc<dyn SchedulingStore>) -> Router {
    let config = TestConfig::with_admin_secret(ADMIN_SECRET).to_arc();
    let bookings = Arc::new(BookingService::new(
        store.clone(),
        Arc::new(NoopNotifier),
        &config.scheduling,
        Arc::new(StaffLocks::new()),
    ));
    let reminders = Arc::new(ReminderService::new(
        store,
        Arc::new(NoopNotifier),
        Arc::new(InMemoryNotificationLog::new()),
        config.scheduling.timezone,
    ));
    scheduling_routes(SchedulingState { bookings, reminders, config })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn admin_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {}", ADMIN_SECRET))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn lists_slots_for_a_day() {
    let store = open_store().await;
    add_staff(&store, "Aoki", 8).await;

    let (status, body) = send(app(store), get("/slots?date=2030-03-04&duration_minutes=60")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_slots"], 17);
    assert_eq!(body["slots"][0]["staff_name"], "Aoki");
    assert_eq!(body["slots"][0]["available"], true);
}

#[tokio::test]
async fn slots_without_duration_is_bad_request() {
    let store = open_store().await;

    let (status, body) = send(app(store), get("/slots?date=2030-03-04")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("duration_minutes"));
}

#[tokio::test]
async fn creates_booking_with_legacy_start_field() {
    let store = open_store().await;
    let aoki = add_staff(&store, "Aoki", 8).await;
    let menu = add_menu(&store, "Treatment", 60).await;

    let request = post_json(
        "/bookings",
        json!({
            "name": "Yamada Hanako",
            "email": "hanako@example.com",
            "menu_id": menu.id,
            "startISO": local(monday(), 10, 0),
            "contact_channels": ["email"]
        }),
    );
    let (status, body) = send(app(store.clone()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["assigned_staff_id"], json!(aoki.id));
    assert_eq!(body["reassigned"], false);
    assert_eq!(store.bookings().await.len(), 1);
}

#[tokio::test]
async fn rejection_returns_reason_code() {
    let store = open_store().await;
    add_staff(&store, "Aoki", 8).await;
    let menu = add_menu(&store, "Treatment", 60).await;

    let request = post_json(
        "/bookings",
        json!({
            "name": "Yamada Hanako",
            "email": "hanako@example.com",
            "menu_id": menu.id,
            "start": local(monday(), 20, 0),
            "contact_channels": ["email"]
        }),
    );
    let (status, body) = send(app(store), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "outside_business_hours");
}

#[tokio::test]
async fn cancel_unknown_booking_is_404() {
    let store = open_store().await;

    let uri = format!("/bookings/{}/cancel", uuid::Uuid::new_v4());
    let (status, _) = send(app(store), post_json(&uri, json!({}))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reschedule_then_cancel() {
    let store = open_store().await;
    let aoki = add_staff(&store, "Aoki", 8).await;
    let menu = add_menu(&store, "Treatment", 60).await;
    let existing = booking(aoki.id, menu.id, local(monday(), 10, 0), 60);
    store.put_booking(existing.clone()).await;
    let app = app(store);

    let uri = format!("/bookings/{}/reschedule", existing.id);
    let (status, body) = send(app.clone(), post_json(&uri, json!({ "start": local(monday(), 12, 0) }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed_staff"], false);

    let (status, again) = send(app.clone(), post_json(&uri, json!({ "start": local(monday(), 12, 0) }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(again["code"], "no_change");

    let uri = format!("/bookings/{}/cancel", existing.id);
    let (status, body) = send(app, post_json(&uri, json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "canceled");
}

#[tokio::test]
async fn previews_assignment() {
    let store = open_store().await;
    let aoki = add_staff(&store, "Aoki", 8).await;

    let uri = format!(
        "/staff/assign?start={}&duration_minutes=30",
        local(monday(), 11, 0).format("%Y-%m-%dT%H:%M:%SZ")
    );
    let (status, body) = send(app(store), get(&uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], true);
    assert_eq!(body["staff"]["staff_id"], json!(aoki.id));
}

#[tokio::test]
async fn reminder_run_requires_admin_secret() {
    let store = open_store().await;
    let app = app(store);

    let (status, _) = send(app.clone(), post_json("/admin/reminders/run", json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .method("POST")
        .uri("/admin/reminders/run")
        .header("Authorization", "Bearer nope")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(app.clone(), wrong).await.0, StatusCode::UNAUTHORIZED);

    let authorized = Request::builder()
        .method("POST")
        .uri("/admin/reminders/run")
        .header("Authorization", format!("Bearer {}", ADMIN_SECRET))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, authorized).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["summary"]["sent"], 0);
}

#[tokio::test]
async fn absurd_duration_is_bad_request() {
    let store = open_store().await;
    add_staff(&store, "Aoki", 8).await;

    let (status, _) = send(app(store), get("/slots?date=2030-03-04&duration_minutes=10000000000000")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn storage_outage_is_503() {
    let store = open_store().await;
    add_staff(&store, "Aoki", 8).await;
    let down: Arc<dyn SchedulingStore> = Arc::new(ScriptedStore::unavailable(store));

    let (status, body) = send(app_over(down), get("/slots?date=2030-03-04&duration_minutes=60")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn catalog_is_public() {
    let store = open_store().await;
    add_staff(&store, "Aoki", 8).await;
    let menu = add_menu(&store, "Treatment", 60).await;

    let (status, body) = send(app(store), get("/catalog")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["menus"][0]["id"], json!(menu.id));
    assert_eq!(body["staff"][0]["name"], "Aoki");
    assert_eq!(body["business_hours"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn booking_list_requires_admin_secret() {
    let store = open_store().await;
    let aoki = add_staff(&store, "Aoki", 8).await;
    let existing = add_booking(&store, aoki.id, local(monday(), 10, 0), 60).await;
    let app = app(store);

    let (status, _) = send(app.clone(), get("/admin/bookings")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(app.clone(), admin_get("/admin/bookings?date=2030-03-04&status=confirmed")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["bookings"][0]["id"], json!(existing.id));
    assert_eq!(body["limit"], 50);

    let (status, _) = send(app, admin_get("/admin/bookings?limit=500")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
