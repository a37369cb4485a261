use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use photobooking::config::AppConfig;
use photobooking::db;
use photobooking::services::mailer::Mailer;
use photobooking::services::payments::{
    CheckoutRequest, CheckoutSession, PaymentProvider, SessionStatus,
};
use photobooking::state::AppState;

// ── Mock providers ──

struct MockMailer {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

struct MockPayments {
    /// session id -> paid flag
    sessions: Arc<Mutex<HashMap<String, bool>>>,
}

#[async_trait]
impl PaymentProvider for MockPayments {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> anyhow::Result<CheckoutSession> {
        let session_id = format!("cs_test_{}", request.booking_id);
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.clone(), false);
        Ok(CheckoutSession {
            url: format!("https://checkout.example/{session_id}"),
            session_id,
        })
    }

    async fn fetch_session(&self, session_id: &str) -> anyhow::Result<SessionStatus> {
        let paid = *self
            .sessions
            .lock()
            .unwrap()
            .get(session_id)
            .unwrap_or(&false);
        Ok(SessionStatus {
            paid,
            payment_ref: paid.then(|| format!("pi_{session_id}")),
        })
    }
}

// ── Helpers ──

struct TestApp {
    app: Router,
    state: Arc<AppState>,
    sent_emails: Arc<Mutex<Vec<(String, String)>>>,
    sessions: Arc<Mutex<HashMap<String, bool>>>,
}

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        client_url: "http://localhost:3000".to_string(),
        stripe_secret_key: "sk_test".to_string(),
        mailgun_domain: "example.com".to_string(),
        mailgun_api_key: "key".to_string(),
        email_from: "bookings@example.com".to_string(),
    }
}

fn test_app() -> TestApp {
    let conn = db::init_db(":memory:").unwrap();
    let sent_emails = Arc::new(Mutex::new(vec![]));
    let sessions = Arc::new(Mutex::new(HashMap::new()));

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: test_config(),
        mailer: Box::new(MockMailer {
            sent: Arc::clone(&sent_emails),
        }),
        payments: Box::new(MockPayments {
            sessions: Arc::clone(&sessions),
        }),
    });

    TestApp {
        app: photobooking::app(Arc::clone(&state)),
        state,
        sent_emails,
        sessions,
    }
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "first_name": "Test",
                "last_name": "Client",
                "email": email,
                "password": "secret123",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

/// Registers a user and promotes them to admin directly in the database.
async fn register_admin(test: &TestApp, email: &str) -> String {
    let token = register(&test.app, email).await;
    let db = test.state.db.lock().unwrap();
    db.execute(
        "UPDATE users SET role = 'admin' WHERE email = ?1",
        [email],
    )
    .unwrap();
    token
}

async fn create_service(app: &Router, admin_token: &str) -> String {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/api/admin/services",
            Some(admin_token),
            Some(json!({
                "name": "Portrait Session",
                "description": "One hour portrait shoot",
                "price": 150.0,
                "duration_minutes": 60,
                "category": "photo",
                "service_type": "portrait",
                "max_participants": 5,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["id"].as_str().unwrap().to_string()
}

const DAY: &str = "2030-06-10";

fn booking_payload(service_id: &str, start: &str, end: &str) -> Value {
    json!({
        "service_id": service_id,
        "booking_date": DAY,
        "start_time": start,
        "end_time": end,
    })
}

async fn create_booking(app: &Router, token: &str, service_id: &str, start: &str, end: &str) -> Value {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/api/bookings",
            Some(token),
            Some(booking_payload(service_id, start, end)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

// ── Auth ──

#[tokio::test]
async fn test_register_login_me() {
    let test = test_app();

    let token = register(&test.app, "claire@example.com").await;
    let (status, body) = send(&test.app, request("GET", "/api/auth/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "claire@example.com");
    assert_eq!(body["role"], "client");

    // duplicate email
    let (status, _) = send(
        &test.app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "first_name": "Other",
                "last_name": "Person",
                "email": "claire@example.com",
                "password": "secret123",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // login rotates the token
    let (status, body) = send(
        &test.app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "claire@example.com", "password": "secret123" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new_token = body["token"].as_str().unwrap();
    assert_ne!(new_token, token);

    let (status, _) = send(&test.app, request("GET", "/api/auth/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) =
        send(&test.app, request("GET", "/api/auth/me", Some(new_token), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_password_rejected() {
    let test = test_app();
    register(&test.app, "claire@example.com").await;

    let (status, _) = send(
        &test.app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "claire@example.com", "password": "wrong" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let test = test_app();
    let (status, _) = send(&test.app, request("GET", "/api/bookings/my", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &test.app,
        request("GET", "/api/bookings/my", Some("bogus"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_forbidden_for_clients() {
    let test = test_app();
    let token = register(&test.app, "claire@example.com").await;

    let (status, _) = send(
        &test.app,
        request("GET", "/api/admin/bookings", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &test.app,
        request("GET", "/api/admin/stats", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ── Services ──

#[tokio::test]
async fn test_public_service_listing_hides_inactive() {
    let test = test_app();
    let admin = register_admin(&test, "admin@example.com").await;
    let service_id = create_service(&test.app, &admin).await;

    let (status, body) = send(
        &test.app,
        request(
            "PUT",
            &format!("/api/admin/services/{service_id}"),
            Some(&admin),
            Some(json!({
                "name": "Portrait Session",
                "price": 150.0,
                "duration_minutes": 60,
                "category": "photo",
                "service_type": "portrait",
                "is_active": false,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, body) = send(&test.app, request("GET", "/api/services", None, None)).await;
    assert_eq!(body.as_array().unwrap().len(), 0);

    let (_, body) = send(
        &test.app,
        request("GET", "/api/admin/services", Some(&admin), None),
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

// ── Availability ──

#[tokio::test]
async fn test_available_slots_exclude_booked_interval() {
    let test = test_app();
    let admin = register_admin(&test, "admin@example.com").await;
    let service_id = create_service(&test.app, &admin).await;
    let client = register(&test.app, "claire@example.com").await;

    create_booking(&test.app, &client, &service_id, "10:00", "11:00").await;

    let (status, body) = send(
        &test.app,
        request(
            "GET",
            &format!("/api/bookings/available-slots?date={DAY}&duration=60"),
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let starts: Vec<&str> = body["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["start_time"].as_str().unwrap())
        .collect();
    assert!(starts.contains(&"09:00"));
    assert!(starts.contains(&"11:00"));
    assert!(!starts.contains(&"09:30"));
    assert!(!starts.contains(&"10:00"));
    assert!(!starts.contains(&"10:30"));
}

#[tokio::test]
async fn test_check_availability_endpoint() {
    let test = test_app();
    let admin = register_admin(&test, "admin@example.com").await;
    let service_id = create_service(&test.app, &admin).await;
    let client = register(&test.app, "claire@example.com").await;

    create_booking(&test.app, &client, &service_id, "10:00", "11:00").await;

    let (_, body) = send(
        &test.app,
        request(
            "GET",
            &format!("/api/bookings/check-availability?date={DAY}&start_time=10:30&end_time=11:30"),
            None,
            None,
        ),
    )
    .await;
    assert_eq!(body["available"], false);

    let (_, body) = send(
        &test.app,
        request(
            "GET",
            &format!("/api/bookings/check-availability?date={DAY}&start_time=11:00&end_time=12:00"),
            None,
            None,
        ),
    )
    .await;
    assert_eq!(body["available"], true);
}

// ── Booking lifecycle ──

#[tokio::test]
async fn test_double_booking_conflicts() {
    let test = test_app();
    let admin = register_admin(&test, "admin@example.com").await;
    let service_id = create_service(&test.app, &admin).await;
    let client = register(&test.app, "claire@example.com").await;

    create_booking(&test.app, &client, &service_id, "14:00", "15:00").await;

    let (status, body) = send(
        &test.app,
        request(
            "POST",
            "/api/bookings",
            Some(&client),
            Some(booking_payload(&service_id, "14:30", "15:30")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_cancel_frees_slot_for_rebooking() {
    let test = test_app();
    let admin = register_admin(&test, "admin@example.com").await;
    let service_id = create_service(&test.app, &admin).await;
    let client = register(&test.app, "claire@example.com").await;

    let booking = create_booking(&test.app, &client, &service_id, "14:00", "15:00").await;
    let booking_id = booking["id"].as_str().unwrap();

    let (status, _) = send(
        &test.app,
        request(
            "PATCH",
            &format!("/api/bookings/{booking_id}/cancel"),
            Some(&client),
            Some(json!({ "reason": "changed plans" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // same slot again
    create_booking(&test.app, &client, &service_id, "14:00", "15:00").await;
}

#[tokio::test]
async fn test_cancel_requires_reason() {
    let test = test_app();
    let admin = register_admin(&test, "admin@example.com").await;
    let service_id = create_service(&test.app, &admin).await;
    let client = register(&test.app, "claire@example.com").await;

    let booking = create_booking(&test.app, &client, &service_id, "14:00", "15:00").await;
    let booking_id = booking["id"].as_str().unwrap();

    let (status, _) = send(
        &test.app,
        request(
            "PATCH",
            &format!("/api/bookings/{booking_id}/cancel"),
            Some(&client),
            Some(json!({ "reason": "  " })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_accept_flow_with_email_and_notification() {
    let test = test_app();
    let admin = register_admin(&test, "admin@example.com").await;
    let service_id = create_service(&test.app, &admin).await;
    let client = register(&test.app, "claire@example.com").await;

    let booking = create_booking(&test.app, &client, &service_id, "14:00", "15:00").await;
    let booking_id = booking["id"].as_str().unwrap();

    let (status, body) = send(
        &test.app,
        request(
            "PATCH",
            &format!("/api/admin/bookings/{booking_id}/accept"),
            Some(&admin),
            Some(json!({ "admin_notes": "vip client" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "confirmed");
    assert!(!body["confirmed_at"].is_null());

    // confirmation email went to the client
    let emails = test.sent_emails.lock().unwrap().clone();
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].0, "claire@example.com");

    // in-app notification recorded
    let (_, notifications) = send(
        &test.app,
        request("GET", "/api/notifications", Some(&client), None),
    )
    .await;
    let notifications = notifications.as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["kind"], "booking_confirmed");

    // accepting twice is an invalid transition
    let (status, _) = send(
        &test.app,
        request(
            "PATCH",
            &format!("/api/admin/bookings/{booking_id}/accept"),
            Some(&admin),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_detail_includes_history() {
    let test = test_app();
    let admin = register_admin(&test, "admin@example.com").await;
    let service_id = create_service(&test.app, &admin).await;
    let client = register(&test.app, "claire@example.com").await;

    let booking = create_booking(&test.app, &client, &service_id, "14:00", "15:00").await;
    let booking_id = booking["id"].as_str().unwrap();

    // creation writes no history
    let (_, body) = send(
        &test.app,
        request("GET", &format!("/api/bookings/{booking_id}"), Some(&client), None),
    )
    .await;
    assert_eq!(body["status_history"].as_array().unwrap().len(), 0);
    assert_eq!(body["is_editable"], true);
    assert_eq!(body["duration_minutes"], 60);

    send(
        &test.app,
        request(
            "PATCH",
            &format!("/api/admin/bookings/{booking_id}/accept"),
            Some(&admin),
            None,
        ),
    )
    .await;
    send(
        &test.app,
        request(
            "PATCH",
            &format!("/api/admin/bookings/{booking_id}/start"),
            Some(&admin),
            None,
        ),
    )
    .await;
    send(
        &test.app,
        request(
            "PATCH",
            &format!("/api/admin/bookings/{booking_id}/complete"),
            Some(&admin),
            None,
        ),
    )
    .await;

    let (_, body) = send(
        &test.app,
        request("GET", &format!("/api/bookings/{booking_id}"), Some(&client), None),
    )
    .await;
    let history = body["status_history"].as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0]["status"], "confirmed");
    assert_eq!(history[1]["status"], "in-progress");
    assert_eq!(history[2]["status"], "completed");
    assert_eq!(body["is_editable"], false);
}

#[tokio::test]
async fn test_clients_cannot_see_others_bookings() {
    let test = test_app();
    let admin = register_admin(&test, "admin@example.com").await;
    let service_id = create_service(&test.app, &admin).await;
    let claire = register(&test.app, "claire@example.com").await;
    let omar = register(&test.app, "omar@example.com").await;

    let booking = create_booking(&test.app, &claire, &service_id, "14:00", "15:00").await;
    let booking_id = booking["id"].as_str().unwrap();

    let (status, _) = send(
        &test.app,
        request("GET", &format!("/api/bookings/{booking_id}"), Some(&omar), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // admin can
    let (status, _) = send(
        &test.app,
        request("GET", &format!("/api/bookings/{booking_id}"), Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_my_bookings_pagination() {
    let test = test_app();
    let admin = register_admin(&test, "admin@example.com").await;
    let service_id = create_service(&test.app, &admin).await;
    let client = register(&test.app, "claire@example.com").await;

    for start in ["09:00", "10:00", "11:00"] {
        let end = format!("{}:30", &start[..2]);
        create_booking(&test.app, &client, &service_id, start, &end).await;
    }

    let (_, body) = send(
        &test.app,
        request("GET", "/api/bookings/my?page=1&limit=2", Some(&client), None),
    )
    .await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["bookings"].as_array().unwrap().len(), 2);

    let (_, body) = send(
        &test.app,
        request("GET", "/api/bookings/my?page=2&limit=2", Some(&client), None),
    )
    .await;
    assert_eq!(body["bookings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_rejected_when_slot_taken() {
    let test = test_app();
    let admin = register_admin(&test, "admin@example.com").await;
    let service_id = create_service(&test.app, &admin).await;
    let client = register(&test.app, "claire@example.com").await;

    create_booking(&test.app, &client, &service_id, "10:00", "11:00").await;
    let booking = create_booking(&test.app, &client, &service_id, "14:00", "15:00").await;
    let booking_id = booking["id"].as_str().unwrap();

    let (status, _) = send(
        &test.app,
        request(
            "PUT",
            &format!("/api/bookings/{booking_id}"),
            Some(&client),
            Some(json!({ "start_time": "10:30", "end_time": "11:30" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // a free window works
    let (status, body) = send(
        &test.app,
        request(
            "PUT",
            &format!("/api/bookings/{booking_id}"),
            Some(&client),
            Some(json!({ "start_time": "16:00", "end_time": "17:00" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["start_time"], "16:00");
}

#[tokio::test]
async fn test_delete_booking_and_cascade() {
    let test = test_app();
    let admin = register_admin(&test, "admin@example.com").await;
    let service_id = create_service(&test.app, &admin).await;
    let client = register(&test.app, "claire@example.com").await;

    let booking = create_booking(&test.app, &client, &service_id, "14:00", "15:00").await;
    let booking_id = booking["id"].as_str().unwrap();

    send(
        &test.app,
        request(
            "PATCH",
            &format!("/api/admin/bookings/{booking_id}/accept"),
            Some(&admin),
            None,
        ),
    )
    .await;

    let (status, _) = send(
        &test.app,
        request("DELETE", &format!("/api/bookings/{booking_id}"), Some(&client), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &test.app,
        request("GET", &format!("/api/bookings/{booking_id}"), Some(&client), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // dependent notifications are gone with the booking
    let (_, notifications) = send(
        &test.app,
        request("GET", "/api/notifications", Some(&client), None),
    )
    .await;
    assert_eq!(notifications.as_array().unwrap().len(), 0);
}

// ── Payments ──

#[tokio::test]
async fn test_payment_checkout_and_verification() {
    let test = test_app();
    let admin = register_admin(&test, "admin@example.com").await;
    let service_id = create_service(&test.app, &admin).await;
    let client = register(&test.app, "claire@example.com").await;

    let booking = create_booking(&test.app, &client, &service_id, "14:00", "15:00").await;
    let booking_id = booking["id"].as_str().unwrap();

    let (status, body) = send(
        &test.app,
        request(
            "POST",
            "/api/payments/create-checkout-session",
            Some(&client),
            Some(json!({ "booking_id": booking_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let session_id = body["session_id"].as_str().unwrap().to_string();
    assert!(body["url"].as_str().unwrap().contains(&session_id));

    // not paid yet
    let (_, body) = send(
        &test.app,
        request(
            "GET",
            &format!("/api/payments/verify/{session_id}"),
            Some(&client),
            None,
        ),
    )
    .await;
    assert_eq!(body["paid"], false);

    // provider settles the session
    test.sessions
        .lock()
        .unwrap()
        .insert(session_id.clone(), true);

    let (status, body) = send(
        &test.app,
        request(
            "GET",
            &format!("/api/payments/verify/{session_id}"),
            Some(&client),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["paid"], true);
    assert_eq!(body["needs_confirmation"], true);
    // payment does not confirm the booking by itself
    assert_eq!(body["booking"]["status"], "pending");
    assert_eq!(body["booking"]["pricing"]["payment_status"], "paid");

    // verification is idempotent: one history entry, one email
    let (_, body) = send(
        &test.app,
        request(
            "GET",
            &format!("/api/payments/verify/{session_id}"),
            Some(&client),
            None,
        ),
    )
    .await;
    assert_eq!(body["paid"], true);

    let (_, detail) = send(
        &test.app,
        request("GET", &format!("/api/bookings/{booking_id}"), Some(&client), None),
    )
    .await;
    assert_eq!(detail["status_history"].as_array().unwrap().len(), 1);
    assert_eq!(test.sent_emails.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_checkout_rejected_for_non_payable_booking() {
    let test = test_app();
    let admin = register_admin(&test, "admin@example.com").await;
    let service_id = create_service(&test.app, &admin).await;
    let client = register(&test.app, "claire@example.com").await;

    let booking = create_booking(&test.app, &client, &service_id, "14:00", "15:00").await;
    let booking_id = booking["id"].as_str().unwrap();

    send(
        &test.app,
        request(
            "PATCH",
            &format!("/api/bookings/{booking_id}/cancel"),
            Some(&client),
            Some(json!({ "reason": "changed plans" })),
        ),
    )
    .await;

    let (status, _) = send(
        &test.app,
        request(
            "POST",
            "/api/payments/create-checkout-session",
            Some(&client),
            Some(json!({ "booking_id": booking_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Stats ──

#[tokio::test]
async fn test_admin_stats() {
    let test = test_app();
    let admin = register_admin(&test, "admin@example.com").await;
    let service_id = create_service(&test.app, &admin).await;
    let client = register(&test.app, "claire@example.com").await;

    let b1 = create_booking(&test.app, &client, &service_id, "09:00", "10:00").await;
    create_booking(&test.app, &client, &service_id, "11:00", "12:00").await;
    let b3 = create_booking(&test.app, &client, &service_id, "14:00", "15:00").await;

    send(
        &test.app,
        request(
            "PATCH",
            &format!("/api/admin/bookings/{}/accept", b1["id"].as_str().unwrap()),
            Some(&admin),
            None,
        ),
    )
    .await;
    send(
        &test.app,
        request(
            "PATCH",
            &format!("/api/admin/bookings/{}/reject", b3["id"].as_str().unwrap()),
            Some(&admin),
            Some(json!({ "reason": "photographer unavailable" })),
        ),
    )
    .await;

    let (status, body) = send(
        &test.app,
        request("GET", "/api/admin/stats", Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["total_bookings"], 3);
    assert_eq!(body["by_status"]["pending"], 1);
    assert_eq!(body["by_status"]["confirmed"], 1);
    assert_eq!(body["by_status"]["cancelled"], 1);
    assert_eq!(body["by_status"]["no-show"], 0);
    // only the confirmed booking counts toward revenue
    assert_eq!(body["total_revenue"], 150.0);
    assert_eq!(body["average_booking_value"], 150.0);
    assert_eq!(body["top_services"][0]["count"], 3);
}

#[tokio::test]
async fn test_stats_range_validation() {
    let test = test_app();
    let admin = register_admin(&test, "admin@example.com").await;

    let (status, _) = send(
        &test.app,
        request(
            "GET",
            "/api/admin/stats?from=2030-02-01&to=2030-01-01",
            Some(&admin),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &test.app,
        request("GET", "/api/admin/stats?from=2030-01-01", Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Notifications ──

#[tokio::test]
async fn test_mark_notification_read_scoped_to_owner() {
    let test = test_app();
    let admin = register_admin(&test, "admin@example.com").await;
    let service_id = create_service(&test.app, &admin).await;
    let claire = register(&test.app, "claire@example.com").await;
    let omar = register(&test.app, "omar@example.com").await;

    let booking = create_booking(&test.app, &claire, &service_id, "14:00", "15:00").await;
    send(
        &test.app,
        request(
            "PATCH",
            &format!("/api/admin/bookings/{}/accept", booking["id"].as_str().unwrap()),
            Some(&admin),
            None,
        ),
    )
    .await;

    let (_, notifications) = send(
        &test.app,
        request("GET", "/api/notifications", Some(&claire), None),
    )
    .await;
    let notification_id = notifications[0]["id"].as_str().unwrap().to_string();

    // another user cannot mark it read
    let (status, _) = send(
        &test.app,
        request(
            "PATCH",
            &format!("/api/notifications/{notification_id}/read"),
            Some(&omar),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &test.app,
        request(
            "PATCH",
            &format!("/api/notifications/{notification_id}/read"),
            Some(&claire),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, notifications) = send(
        &test.app,
        request("GET", "/api/notifications", Some(&claire), None),
    )
    .await;
    assert_eq!(notifications[0]["is_read"], true);
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let test = test_app();
    let (status, body) = send(&test.app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
