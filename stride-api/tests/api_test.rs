use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{NaiveDate, NaiveTime};
use serde_json::{json, Value};
use stride_api::{app, AppState};
use stride_booking::BookingManager;
use stride_core::{ClassSession, DocumentStore};
use stride_store::MemoryStore;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

async fn setup(classes: Vec<ClassSession>) -> (MemoryStore, Router) {
    let store = MemoryStore::new();
    for class in classes {
        store.put_class(class).await;
    }
    let manager = BookingManager::new(Arc::new(store.clone()));
    let router = app(AppState::new(manager, chrono::Duration::minutes(30)));
    (store, router)
}

fn class(max_spots: u32, price: Option<i64>) -> ClassSession {
    let mut class = ClassSession::new(
        "Kettlebells",
        NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
        NaiveTime::from_hms_opt(17, 30, 0).unwrap(),
        max_spots,
    );
    class.price_cents = price;
    class
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn reservation(class_id: Uuid, spots: i64) -> Value {
    json!({
        "class_id": class_id,
        "spots": spots,
        "name": "Morgan Diaz",
        "email": "morgan@example.com",
    })
}

#[tokio::test]
async fn test_health() {
    let (_store, router) = setup(vec![]).await;
    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_free_booking_flow() {
    let c = class(2, None);
    let class_id = c.id;
    let (store, router) = setup(vec![c]).await;

    let (status, body) = send(&router, "POST", "/v1/bookings", Some(reservation(class_id, 2))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "confirmed");

    let (status, body) = send(&router, "POST", "/v1/bookings", Some(reservation(class_id, 1))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Only 0 spots remaining"));

    let (status, body) = send(&router, "GET", "/v1/members/morgan@example.com/bookings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["class"]["id"], json!(class_id));

    let stored = store.get_class(class_id).await.unwrap().unwrap();
    assert_eq!(stored.record.booked_spots, 2);
}

#[tokio::test]
async fn test_paid_booking_settled_by_webhook() {
    let c = class(5, Some(2000));
    let class_id = c.id;
    let (store, router) = setup(vec![c]).await;

    let mut req = reservation(class_id, 2);
    req["membership_id"] = json!("MEM-7");
    let (status, body) = send(&router, "POST", "/v1/bookings", Some(req)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    let booking_id = body["booking_id"].as_str().unwrap().to_string();

    let (status, quote) = send(&router, "GET", &format!("/v1/bookings/{}/quote", booking_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["total_cents"], 3500);

    // Pending bookings are not listed for the member yet
    let (_, listed) = send(&router, "GET", "/v1/members/morgan@example.com/bookings", None).await;
    assert!(listed.as_array().unwrap().is_empty());

    let event = json!({
        "id": "evt_1",
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": "pi_1", "metadata": { "booking_id": booking_id } } }
    });
    let (status, _) = send(&router, "POST", "/v1/webhooks/payments", Some(event.clone())).await;
    assert_eq!(status, StatusCode::OK);
    // Duplicate delivery
    let (status, _) = send(&router, "POST", "/v1/webhooks/payments", Some(event)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&router, "GET", &format!("/v1/bookings/{}", booking_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "confirmed");
    assert_eq!(store.get_class(class_id).await.unwrap().unwrap().record.booked_spots, 2);
}

#[tokio::test]
async fn test_failed_payment_cancels() {
    let c = class(5, Some(1200));
    let class_id = c.id;
    let (_store, router) = setup(vec![c]).await;

    let (_, body) = send(&router, "POST", "/v1/bookings", Some(reservation(class_id, 1))).await;
    let booking_id = body["booking_id"].as_str().unwrap().to_string();

    let event = json!({
        "id": "evt_2",
        "type": "payment_intent.payment_failed",
        "data": { "object": { "id": "pi_2", "metadata": { "booking_id": booking_id } } }
    });
    let (status, _) = send(&router, "POST", "/v1/webhooks/payments", Some(event)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&router, "POST", &format!("/v1/bookings/{}/confirm", booking_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("cancelled"));

    let (status, roster) = send(&router, "GET", &format!("/v1/classes/{}/bookings", class_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roster[0]["status"], "cancelled");
}

#[tokio::test]
async fn test_rejections() {
    let c = class(5, None);
    let class_id = c.id;
    let (_store, router) = setup(vec![c]).await;

    let bad = json!({ "class_id": class_id, "spots": 0, "name": "M", "email": "nope" });
    let (status, body) = send(&router, "POST", "/v1/bookings", Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"].as_array().unwrap().len(), 3);

    let (status, _) = send(&router, "POST", "/v1/bookings", Some(reservation(Uuid::new_v4(), 1))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&router, "GET", &format!("/v1/bookings/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let event = json!({
        "id": "evt_3",
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": "pi_3" } }
    });
    let (status, _) = send(&router, "POST", "/v1/webhooks/payments", Some(event)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_expire_endpoint() {
    let c = class(5, Some(900));
    let class_id = c.id;
    let (_store, router) = setup(vec![c]).await;

    send(&router, "POST", "/v1/bookings", Some(reservation(class_id, 1))).await;

    // Fresh pending bookings are within the 30 minute window
    let (status, body) = send(&router, "POST", "/v1/bookings/expire", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expired"], 0);
}

fn succeeded_event(event_id: &str, booking_id: &str) -> Value {
    json!({
        "id": event_id,
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": format!("pi_{}", event_id), "metadata": { "booking_id": booking_id } } }
    })
}

#[tokio::test]
async fn test_webhook_acknowledges_payment_that_lost_the_last_spot() {
    let c = class(1, Some(1500));
    let class_id = c.id;
    let (store, router) = setup(vec![c]).await;

    let (_, first) = send(&router, "POST", "/v1/bookings", Some(reservation(class_id, 1))).await;
    let (_, second) = send(&router, "POST", "/v1/bookings", Some(reservation(class_id, 1))).await;
    let first_id = first["booking_id"].as_str().unwrap().to_string();
    let second_id = second["booking_id"].as_str().unwrap().to_string();

    let (status, _) = send(&router, "POST", "/v1/webhooks/payments", Some(succeeded_event("evt_a", &first_id))).await;
    assert_eq!(status, StatusCode::OK);

    // Class is full now; the provider must not keep redelivering
    let (status, _) = send(&router, "POST", "/v1/webhooks/payments", Some(succeeded_event("evt_b", &second_id))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&router, "GET", &format!("/v1/bookings/{}", second_id), None).await;
    assert_eq!(body["booking"]["status"], "pending");
    assert_eq!(store.get_class(class_id).await.unwrap().unwrap().record.booked_spots, 1);

    // Unknown bookings are acknowledged too
    let unknown = Uuid::new_v4().to_string();
    let (status, _) = send(&router, "POST", "/v1/webhooks/payments", Some(succeeded_event("evt_c", &unknown))).await;
    assert_eq!(status, StatusCode::OK);
}
