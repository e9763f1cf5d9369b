use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, patch, post};
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

use servigo::config::AppConfig;
use servigo::db;
use servigo::handlers;
use servigo::state::AppState;

const PASSWORD: &str = "supersecret";

// ── Helpers ──

fn test_state() -> Arc<AppState> {
    let config = AppConfig {
        port: 5000,
        database_url: ":memory:".to_string(),
        jwt_secret: "test-secret".to_string(),
    };
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config,
    })
}

fn test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api", get(handlers::health::health))
        .route("/api/auth/signup", post(handlers::auth::signup))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/me", get(handlers::auth::me))
        .route(
            "/api/bookings",
            post(handlers::bookings::create).get(handlers::bookings::list_all),
        )
        .route(
            "/api/bookings/my-bookings",
            get(handlers::bookings::my_bookings),
        )
        .route(
            "/api/bookings/:id/status",
            patch(handlers::bookings::update_status),
        )
        .route("/api/providers/register", post(handlers::providers::register))
        .route("/api/providers", get(handlers::providers::list))
        .route("/api/providers/:id", get(handlers::providers::get_one))
        .route(
            "/api/contact",
            post(handlers::contact::submit).get(handlers::contact::list_all),
        )
        .route("/api/dashboard/stats", get(handlers::dashboard::stats))
        .with_state(state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Signs up a customer account, returning (token, user id).
async fn signup(app: &Router, name: &str, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "fullName": name,
            "email": email,
            "phone": "+911234567890",
            "gender": "other",
            "password": PASSWORD,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

async fn login(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

async fn register_provider(app: &Router, token: &str, location: &str, services: &[&str]) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/providers/register",
        Some(token),
        Some(json!({
            "services": services,
            "experience": 4,
            "location": location,
            "availability": "weekdays 9-6",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    body["provider"]["id"].as_str().unwrap().to_string()
}

async fn create_booking(
    app: &Router,
    token: &str,
    provider_id: &str,
    amount: f64,
) -> serde_json::Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/bookings",
        Some(token),
        Some(json!({
            "providerId": provider_id,
            "service": "plumbing",
            "date": "2025-07-01",
            "time": "10:00",
            "location": "Andheri West",
            "amount": amount,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "booking failed: {body}");
    body["booking"].clone()
}

fn verify_all_providers(state: &Arc<AppState>) {
    state
        .db
        .lock()
        .unwrap()
        .execute("UPDATE providers SET verified = 1", [])
        .unwrap();
}

// ── Health ──

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app(test_state());
    let (status, body) = send(&app, "GET", "/api", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().is_some());
}

// ── Auth ──

#[tokio::test]
async fn test_signup_short_password_is_rejected_and_nothing_persists() {
    let app = test_app(test_state());

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "fullName": "Short Pass",
            "email": "short@example.com",
            "phone": "+911234567890",
            "gender": "male",
            "password": "2short",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // same email signs up cleanly, so the failed attempt stored nothing
    signup(&app, "Short Pass", "short@example.com").await;
}

#[tokio::test]
async fn test_signup_missing_field_is_rejected() {
    let app = test_app(test_state());
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "fullName": "No Email",
            "phone": "+911234567890",
            "gender": "female",
            "password": PASSWORD,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signup_duplicate_email_is_case_insensitive() {
    let app = test_app(test_state());
    signup(&app, "First", "dup@example.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "fullName": "Second",
            "email": "DUP@Example.COM",
            "phone": "+911234567890",
            "gender": "other",
            "password": PASSWORD,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = test_app(test_state());
    signup(&app, "Casey", "casey@example.com").await;

    let (wrong_pw_status, wrong_pw_body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "casey@example.com", "password": "not-the-password" })),
    )
    .await;
    let (unknown_status, unknown_body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "not-the-password" })),
    )
    .await;

    assert_eq!(wrong_pw_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw_body, unknown_body);
}

#[tokio::test]
async fn test_me_resolves_the_token_owner() {
    let app = test_app(test_state());
    let (token, user_id) = signup(&app, "Morgan", "morgan@example.com").await;

    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], json!(user_id));
    assert_eq!(body["user"]["email"], json!("morgan@example.com"));
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_protected_routes_reject_missing_and_bad_tokens() {
    let app = test_app(test_state());

    let (status, _) = send(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some("garbage.token.here"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Bookings ──

#[tokio::test]
async fn test_booking_starts_pending_with_a_bk_reference() {
    let state = test_state();
    let app = test_app(state);
    let (customer_token, customer_id) = signup(&app, "Cust", "cust@example.com").await;
    let (owner_token, _) = signup(&app, "Owner", "owner@example.com").await;
    let provider_id = register_provider(&app, &owner_token, "Mumbai", &["plumbing"]).await;

    let booking = create_booking(&app, &customer_token, &provider_id, 250.0).await;

    assert_eq!(booking["status"], json!("pending"));
    assert_eq!(booking["customerId"], json!(customer_id));
    let reference = booking["bookingId"].as_str().unwrap();
    assert!(reference.starts_with("BK"));
    assert!(reference[2..].chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn test_booking_against_unknown_provider_is_404() {
    let app = test_app(test_state());
    let (token, _) = signup(&app, "Cust", "cust@example.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/bookings",
        Some(&token),
        Some(json!({
            "providerId": "no-such-provider",
            "service": "plumbing",
            "date": "2025-07-01",
            "time": "10:00",
            "location": "Andheri West",
            "amount": 100.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_booking_list_scope_asymmetry() {
    let state = test_state();
    let app = test_app(state);
    let (customer_token, _) = signup(&app, "Cust", "cust@example.com").await;
    let (owner_a_token, _) = signup(&app, "Owner A", "a@example.com").await;
    let (owner_b_token, _) = signup(&app, "Owner B", "b@example.com").await;
    let provider_a = register_provider(&app, &owner_a_token, "Mumbai", &["plumbing"]).await;
    let provider_b = register_provider(&app, &owner_b_token, "Delhi", &["cleaning"]).await;

    create_booking(&app, &customer_token, &provider_a, 100.0).await;
    create_booking(&app, &customer_token, &provider_b, 200.0).await;

    // provider-role tokens are issued at login, after the role flip
    let provider_a_token = login(&app, "a@example.com").await;
    let (status, body) = send(&app, "GET", "/api/bookings", Some(&provider_a_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let bookings = body["bookings"].as_array().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0]["providerId"], json!(provider_a));

    // a customer-role caller sees the full unfiltered set
    let (status, body) = send(&app, "GET", "/api/bookings", Some(&customer_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bookings"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_my_bookings_resolves_provider_details() {
    let app = test_app(test_state());
    let (customer_token, _) = signup(&app, "Cust", "cust@example.com").await;
    let (owner_token, _) = signup(&app, "Pat Provider", "owner@example.com").await;
    let provider_id = register_provider(&app, &owner_token, "Mumbai", &["plumbing"]).await;

    create_booking(&app, &customer_token, &provider_id, 100.0).await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/bookings/my-bookings",
        Some(&customer_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let bookings = body["bookings"].as_array().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0]["provider"]["name"], json!("Pat Provider"));
    assert_eq!(bookings[0]["provider"]["location"], json!("Mumbai"));
}

#[tokio::test]
async fn test_status_updates_follow_the_transition_table() {
    let app = test_app(test_state());
    let (customer_token, _) = signup(&app, "Cust", "cust@example.com").await;
    let (owner_token, _) = signup(&app, "Owner", "owner@example.com").await;
    let provider_id = register_provider(&app, &owner_token, "Mumbai", &["plumbing"]).await;

    let booking = create_booking(&app, &customer_token, &provider_id, 100.0).await;
    let reference = booking["bookingId"].as_str().unwrap();
    let uri = format!("/api/bookings/{reference}/status");

    // pending cannot jump straight to completed
    let (status, _) = send(
        &app,
        "PATCH",
        &uri,
        Some(&owner_token),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "PATCH",
        &uri,
        Some(&owner_token),
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], json!("confirmed"));

    let (status, _) = send(
        &app,
        "PATCH",
        &uri,
        Some(&owner_token),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // completed is terminal
    let (status, _) = send(
        &app,
        "PATCH",
        &uri,
        Some(&owner_token),
        Some(json!({ "status": "pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_update_requires_ownership() {
    let app = test_app(test_state());
    let (customer_token, _) = signup(&app, "Cust", "cust@example.com").await;
    let (owner_token, _) = signup(&app, "Owner", "owner@example.com").await;
    let (stranger_token, _) = signup(&app, "Stranger", "stranger@example.com").await;
    let provider_id = register_provider(&app, &owner_token, "Mumbai", &["plumbing"]).await;

    let booking = create_booking(&app, &customer_token, &provider_id, 100.0).await;
    let uri = format!("/api/bookings/{}/status", booking["bookingId"].as_str().unwrap());

    let (status, _) = send(
        &app,
        "PATCH",
        &uri,
        Some(&stranger_token),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // the booking's customer may cancel
    let (status, _) = send(
        &app,
        "PATCH",
        &uri,
        Some(&customer_token),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_status_update_unknown_reference_is_404() {
    let app = test_app(test_state());
    let (token, _) = signup(&app, "Cust", "cust@example.com").await;

    let (status, _) = send(
        &app,
        "PATCH",
        "/api/bookings/BK0/status",
        Some(&token),
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Provider directory ──

#[tokio::test]
async fn test_provider_registration_is_rejected_on_second_attempt() {
    let app = test_app(test_state());
    let (token, _) = signup(&app, "Owner", "owner@example.com").await;
    register_provider(&app, &token, "Mumbai", &["plumbing"]).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/providers/register",
        Some(&token),
        Some(json!({
            "services": ["cleaning"],
            "experience": 2,
            "location": "Delhi",
            "availability": "weekends",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_registration_flips_the_account_role() {
    let app = test_app(test_state());
    let (token, _) = signup(&app, "Owner", "owner@example.com").await;
    assert_eq!(
        send(&app, "GET", "/api/auth/me", Some(&token), None).await.1["user"]["role"],
        json!("customer")
    );

    register_provider(&app, &token, "Mumbai", &["plumbing"]).await;

    assert_eq!(
        send(&app, "GET", "/api/auth/me", Some(&token), None).await.1["user"]["role"],
        json!("provider")
    );
}

#[tokio::test]
async fn test_directory_lists_verified_providers_with_filters() {
    let state = test_state();
    let app = test_app(Arc::clone(&state));
    let (mumbai_token, _) = signup(&app, "Mumbai Pro", "mumbai@example.com").await;
    let (delhi_token, _) = signup(&app, "Delhi Pro", "delhi@example.com").await;
    register_provider(&app, &mumbai_token, "Mumbai", &["plumbing"]).await;
    register_provider(&app, &delhi_token, "Delhi", &["cleaning"]).await;

    // nothing is listed until verification
    let (_, body) = send(&app, "GET", "/api/providers", None, None).await;
    assert!(body["providers"].as_array().unwrap().is_empty());

    verify_all_providers(&state);

    let (_, body) = send(&app, "GET", "/api/providers", None, None).await;
    assert_eq!(body["providers"].as_array().unwrap().len(), 2);

    // location: case-insensitive substring
    let (_, body) = send(&app, "GET", "/api/providers?location=mum", None, None).await;
    let providers = body["providers"].as_array().unwrap();
    assert_eq!(providers.len(), 1);
    assert_eq!(providers[0]["location"], json!("Mumbai"));

    // service: exact match only
    let (_, body) = send(&app, "GET", "/api/providers?service=cleaning", None, None).await;
    assert_eq!(body["providers"].as_array().unwrap().len(), 1);
    let (_, body) = send(&app, "GET", "/api/providers?service=clean", None, None).await;
    assert!(body["providers"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_provider_lookup_by_id() {
    let state = test_state();
    let app = test_app(Arc::clone(&state));
    let (token, _) = signup(&app, "Owner", "owner@example.com").await;
    let provider_id = register_provider(&app, &token, "Mumbai", &["plumbing"]).await;

    let (status, body) = send(&app, "GET", &format!("/api/providers/{provider_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider"]["id"], json!(provider_id));
    assert_eq!(body["provider"]["user"]["fullName"], json!("Owner"));

    let (status, _) = send(&app, "GET", "/api/providers/unknown", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Contact intake ──

#[tokio::test]
async fn test_contact_submission_and_listing() {
    let app = test_app(test_state());

    let (status, body) = send(
        &app,
        "POST",
        "/api/contact",
        None,
        Some(json!({
            "name": "Visitor",
            "email": "visitor@example.com",
            "subject": "Pricing",
            "message": "How much for a deep clean?",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["contact"]["status"], json!("new"));

    // missing subject
    let (status, _) = send(
        &app,
        "POST",
        "/api/contact",
        None,
        Some(json!({
            "name": "Visitor",
            "email": "visitor@example.com",
            "message": "hello",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // listing requires a token, any authenticated role works
    let (status, _) = send(&app, "GET", "/api/contact", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (token, _) = signup(&app, "Reader", "reader@example.com").await;
    let (status, body) = send(&app, "GET", "/api/contact", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let contacts = body["contacts"].as_array().unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0]["subject"], json!("Pricing"));
}

// ── Dashboard ──

#[tokio::test]
async fn test_provider_stats_aggregate_the_ledger() {
    let app = test_app(test_state());
    let (customer_token, _) = signup(&app, "Cust", "cust@example.com").await;
    let (owner_token, _) = signup(&app, "Owner", "owner@example.com").await;
    let provider_id = register_provider(&app, &owner_token, "Mumbai", &["plumbing"]).await;

    let completed = create_booking(&app, &customer_token, &provider_id, 500.0).await;
    create_booking(&app, &customer_token, &provider_id, 300.0).await;

    let uri = format!(
        "/api/bookings/{}/status",
        completed["bookingId"].as_str().unwrap()
    );
    send(&app, "PATCH", &uri, Some(&owner_token), Some(json!({ "status": "confirmed" }))).await;
    send(&app, "PATCH", &uri, Some(&owner_token), Some(json!({ "status": "completed" }))).await;

    let provider_token = login(&app, "owner@example.com").await;
    let (status, body) = send(&app, "GET", "/api/dashboard/stats", Some(&provider_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let stats = &body["stats"];
    assert_eq!(stats["totalBookings"], json!(2));
    assert_eq!(stats["pendingBookings"], json!(1));
    assert_eq!(stats["completedBookings"], json!(1));
    assert_eq!(stats["totalRevenue"].as_f64().unwrap(), 500.0);
    assert_eq!(stats["averageRating"].as_f64().unwrap(), 0.0);
}

#[tokio::test]
async fn test_customer_stats_are_scoped_to_the_caller() {
    let app = test_app(test_state());
    let (customer_token, _) = signup(&app, "Cust", "cust@example.com").await;
    let (other_token, _) = signup(&app, "Other", "other@example.com").await;
    let (owner_token, _) = signup(&app, "Owner", "owner@example.com").await;
    let provider_id = register_provider(&app, &owner_token, "Mumbai", &["plumbing"]).await;

    create_booking(&app, &customer_token, &provider_id, 100.0).await;
    create_booking(&app, &customer_token, &provider_id, 200.0).await;
    create_booking(&app, &other_token, &provider_id, 300.0).await;

    let (status, body) = send(&app, "GET", "/api/dashboard/stats", Some(&customer_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["totalBookings"], json!(2));
    assert_eq!(body["stats"]["pendingBookings"], json!(2));
    assert!(body["stats"].get("totalRevenue").is_none());
}

#[tokio::test]
async fn test_provider_stats_without_profile_is_404() {
    let state = test_state();
    let app = test_app(Arc::clone(&state));
    let (_, user_id) = signup(&app, "Ghost", "ghost@example.com").await;

    // a provider-role token whose provider record is gone
    state
        .db
        .lock()
        .unwrap()
        .execute("UPDATE users SET role = 'provider' WHERE id = ?1", [&user_id])
        .unwrap();
    let provider_token = login(&app, "ghost@example.com").await;

    let (status, _) = send(&app, "GET", "/api/dashboard/stats", Some(&provider_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
