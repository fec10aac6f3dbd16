// ==============================================================================
// tests/pipeline.rs - End-to-End Pipeline Tests
// ==============================================================================
// Description: Drives the assembled router with in-memory collaborators
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use platform_gateway::{
    build_router,
    config::AppConfig,
    error::ErrorEnvelope,
    mailer::{MailError, MailTransport, OutgoingMail},
    payments::{Charge, LedgerGateway, NewCharge, PaymentError, PaymentGateway},
    users::MemoryUserStore,
    AppState,
};

const ORIGIN: &str = "https://app.example.com";

// ==============================================================================
// HARNESS
// ==============================================================================

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
}

impl RecordingMailer {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if self.fail {
            let address = "smtp.internal".to_string();
            let source = address.parse::<lettre::Address>().unwrap_err();
            return Err(MailError::Address { address, source });
        }
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

/// Ledger that counts every call reaching it
#[derive(Default)]
struct RecordingGateway {
    ledger: LedgerGateway,
    calls: AtomicUsize,
}

impl RecordingGateway {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_charge(&self, user_id: Uuid, charge: NewCharge) -> Result<Charge, PaymentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ledger.create_charge(user_id, charge).await
    }

    async fn list_charges(&self, user_id: Uuid) -> Vec<Charge> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ledger.list_charges(user_id).await
    }

    async fn find_charge(&self, user_id: Uuid, charge_id: Uuid) -> Result<Charge, PaymentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ledger.find_charge(user_id, charge_id).await
    }
}

fn config(static_dir: &Path, docs: bool) -> AppConfig {
    let mut config = AppConfig::default();
    config.environment = "test".to_string();
    config.server.static_dir = static_dir.to_path_buf();
    config.server.docs = docs;
    config.server.body_limit_bytes = 2048;
    config.cors.allowed_origin = ORIGIN.to_string();
    config.mailer.contact_inbox = "support@example.com".to_string();
    config
}

struct TestApp {
    router: Router,
    mailer: Arc<RecordingMailer>,
    payments: Arc<RecordingGateway>,
    _static_dir: tempfile::TempDir,
}

fn spawn_app_with(docs: bool, mailer: RecordingMailer) -> TestApp {
    let static_dir = tempfile::tempdir().unwrap();
    std::fs::write(static_dir.path().join("hello.txt"), "hello from disk").unwrap();

    let mailer = Arc::new(mailer);
    let payments = Arc::new(RecordingGateway::default());
    let state = AppState::with_collaborators(
        config(static_dir.path(), docs),
        Arc::new(MemoryUserStore::new()),
        mailer.clone(),
        payments.clone(),
    )
    .unwrap();

    TestApp {
        router: build_router(state).unwrap(),
        mailer,
        payments,
        _static_dir: static_dir,
    }
}

fn spawn_app() -> TestApp {
    spawn_app_with(false, RecordingMailer::default())
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
    text: String,
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8_lossy(&bytes).to_string();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            text,
        }
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, uri, token, Body::empty(), None))
            .await
    }

    async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(request(
            Method::POST,
            uri,
            token,
            Body::from(body.to_string()),
            Some("application/json"),
        ))
        .await
    }

    /// Register a user and return its bearer token
    async fn register(&self, email: &str) -> String {
        let response = self
            .post_json(
                "/api/auth/register",
                None,
                json!({"email": email, "password": "correct horse", "name": "Ada"}),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        response.body["token"].as_str().unwrap().to_string()
    }
}

fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Body,
    content_type: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(body).unwrap()
}

fn envelope(response: &TestResponse) -> ErrorEnvelope {
    serde_json::from_value(response.body.clone())
        .unwrap_or_else(|e| panic!("not an error envelope ({}): {}", e, response.text))
}

fn first_code(response: &TestResponse) -> String {
    envelope(response).errors[0].code.clone()
}

// ==============================================================================
// TERMINALS & HEADERS
// ==============================================================================

#[tokio::test]
async fn unknown_route_returns_exact_envelope() {
    let app = spawn_app();
    let response = app.get("/does-not-exist", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(
        response.body,
        json!({
            "errors": [{
                "statusCode": "404",
                "message": "Unknown route requested",
                "code": "UNKNOWN_ROUTE",
                "meta": { "route": "/does-not-exist" }
            }]
        })
    );
}

#[tokio::test]
async fn wrong_method_is_an_unknown_route() {
    let app = spawn_app();
    let response = app.post_json("/health-check", None, json!({})).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(first_code(&response), "UNKNOWN_ROUTE");
}

#[tokio::test]
async fn health_check_reports_ok() {
    let app = spawn_app();
    let response = app.get("/health-check", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert!(response.body["timestamp"].is_string());
}

#[tokio::test]
async fn security_headers_on_success_and_error() {
    let app = spawn_app();

    for uri in ["/health-check", "/nope"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(response.headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(response.headers[header::REFERRER_POLICY], "no-referrer");
        assert!(response.headers.contains_key(header::CONTENT_SECURITY_POLICY));
        assert!(response.headers.contains_key(header::STRICT_TRANSPORT_SECURITY));
    }
}

// ==============================================================================
// CORS
// ==============================================================================

#[tokio::test]
async fn cors_allows_only_configured_origin() {
    let app = spawn_app();

    let allowed = app
        .send(
            Request::builder()
                .uri("/health-check")
                .header(header::ORIGIN, ORIGIN)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(allowed.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);

    let foreign = app
        .send(
            Request::builder()
                .uri("/health-check")
                .header(header::ORIGIN, "https://evil.example.net")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(foreign.status, StatusCode::OK);
    assert!(!foreign.headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn preflight_bypasses_auth_gate() {
    let app = spawn_app();

    let response = app
        .send(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/payments/charges")
                .header(header::ORIGIN, ORIGIN)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text.is_empty());
    assert_eq!(response.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
    assert_eq!(response.headers[header::X_FRAME_OPTIONS], "DENY");
}

// ==============================================================================
// STATIC FILES
// ==============================================================================

#[tokio::test]
async fn static_files_served_under_public() {
    let app = spawn_app();

    let found = app.get("/public/hello.txt", None).await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.text, "hello from disk");
    assert_eq!(found.headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");

    let missing = app.get("/public/missing.txt", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    let envelope = envelope(&missing);
    assert_eq!(envelope.errors[0].code, "UNKNOWN_ROUTE");
    assert_eq!(envelope.errors[0].meta["route"], "/public/missing.txt");
}

// ==============================================================================
// BODY DECODING
// ==============================================================================

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = spawn_app();

    let response = app
        .send(request(
            Method::POST,
            "/api/mailer/contact",
            None,
            Body::from(r#"{"name": "#),
            Some("application/json"),
        ))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let envelope = envelope(&response);
    assert_eq!(envelope.errors[0].code, "INVALID_BODY");
    assert_eq!(envelope.errors[0].status_code, "400");
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = spawn_app();
    let message = "x".repeat(4096);

    let response = app
        .post_json(
            "/api/mailer/contact",
            None,
            json!({"name": "Ada", "email": "ada@example.com", "subject": "Hi", "message": message}),
        )
        .await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(first_code(&response), "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn form_encoded_contact_is_accepted() {
    let app = spawn_app();

    let response = app
        .send(request(
            Method::POST,
            "/api/mailer/contact",
            None,
            Body::from("name=Grace&email=grace%40example.com&subject=Billing&message=Hello+there"),
            Some("application/x-www-form-urlencoded"),
        ))
        .await;

    assert_eq!(response.status, StatusCode::ACCEPTED, "{}", response.text);
    assert_eq!(response.body, json!({"status": "accepted"}));

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "support@example.com");
    assert_eq!(sent[0].reply_to.as_deref(), Some("grace@example.com"));
}

// ==============================================================================
// MAILER
// ==============================================================================

#[tokio::test]
async fn contact_validation_lists_every_field() {
    let app = spawn_app();
    let response = app
        .post_json("/api/mailer/contact", None, json!({"name": "", "email": "nope", "subject": "s", "message": "m"}))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let envelope = envelope(&response);
    let fields: Vec<&str> = envelope
        .errors
        .iter()
        .map(|e| e.meta["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "name"]);
}

#[tokio::test]
async fn mail_failure_is_an_upstream_error() {
    let app = spawn_app_with(false, RecordingMailer::failing());
    let response = app
        .post_json(
            "/api/mailer/contact",
            None,
            json!({"name": "Ada", "email": "ada@example.com", "subject": "Hi", "message": "Hello"}),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(first_code(&response), "MAIL_DELIVERY_FAILED");
    assert!(!response.text.contains("smtp.internal"));
}

// ==============================================================================
// AUTH
// ==============================================================================

#[tokio::test]
async fn register_login_and_me() {
    let app = spawn_app();

    let registered = app
        .post_json(
            "/api/auth/register",
            None,
            json!({"email": "Ada@Example.com", "password": "correct horse", "name": "Ada"}),
        )
        .await;
    assert_eq!(registered.status, StatusCode::CREATED);
    assert_eq!(registered.body["user"]["email"], "ada@example.com");
    assert_eq!(registered.body["token_type"], "Bearer");
    let cookie = registered.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("access_token="));
    assert!(cookie.contains("HttpOnly"));

    // welcome email went out
    assert_eq!(app.mailer.sent()[0].to, "ada@example.com");

    let login = app
        .post_json(
            "/api/auth/login",
            None,
            json!({"email": "ada@example.com", "password": "correct horse"}),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let token = login.body["token"].as_str().unwrap();

    let me = app.get("/api/auth/me", Some(token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["name"], "Ada");
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = spawn_app();
    app.register("ada@example.com").await;

    let again = app
        .post_json(
            "/api/auth/register",
            None,
            json!({"email": "ADA@example.com", "password": "another pass", "name": "Ada"}),
        )
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(first_code(&again), "EMAIL_TAKEN");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = spawn_app();
    app.register("ada@example.com").await;

    let login = app
        .post_json(
            "/api/auth/login",
            None,
            json!({"email": "ada@example.com", "password": "wrong horse"}),
        )
        .await;
    assert_eq!(login.status, StatusCode::UNAUTHORIZED);
    assert_eq!(first_code(&login), "INVALID_CREDENTIALS");
    assert!(!login.headers.contains_key(header::SET_COOKIE));
}

#[tokio::test]
async fn logout_clears_cookie() {
    let app = spawn_app();
    let response = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/logout")
                .header(header::COOKIE, "access_token=stale")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let cookie = response.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("access_token="));
    assert!(cookie.contains("Max-Age=0"));
}

// ==============================================================================
// GUARDED MOUNTS
// ==============================================================================

#[tokio::test]
async fn payments_require_token_and_have_no_side_effect() {
    let app = spawn_app();

    let rejected = app
        .post_json("/api/payments/charges", None, json!({"amount_cents": 500, "currency": "usd"}))
        .await;
    assert_eq!(rejected.status, StatusCode::UNAUTHORIZED);
    let envelope = envelope(&rejected);
    assert_eq!(envelope.errors[0].code, "MISSING_TOKEN");
    assert_eq!(envelope.errors[0].status_code, "401");

    let forged = app
        .post_json("/api/payments/charges", Some("not.a.jwt"), json!({"amount_cents": 500, "currency": "usd"}))
        .await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
    assert_eq!(first_code(&forged), "INVALID_TOKEN");

    let listed_anonymously = app.get("/api/payments/charges", None).await;
    assert_eq!(listed_anonymously.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.payments.calls(), 0);

    let token = app.register("ada@example.com").await;
    let listed = app.get("/api/payments/charges", Some(&token)).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body, json!({"charges": []}));
    assert_eq!(app.payments.calls(), 1);
}

#[tokio::test]
async fn form_encoded_charge_is_accepted() {
    let app = spawn_app();
    let token = app.register("ada@example.com").await;

    let created = app
        .send(request(
            Method::POST,
            "/api/payments/charges",
            Some(&token),
            Body::from("amount_cents=500&currency=usd&description=Starter"),
            Some("application/x-www-form-urlencoded"),
        ))
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.text);
    assert_eq!(created.body["amount_cents"], 500);
    assert_eq!(created.body["description"], "Starter");

    let rejected = app
        .send(request(
            Method::POST,
            "/api/payments/charges",
            Some(&token),
            Body::from("amount_cents=five&currency=usd"),
            Some("application/x-www-form-urlencoded"),
        ))
        .await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
    assert_eq!(first_code(&rejected), "INVALID_BODY");
}

#[tokio::test]
async fn unknown_path_under_guarded_mount_needs_token() {
    let app = spawn_app();

    let anonymous = app.get("/api/payments/refunds", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let token = app.register("ada@example.com").await;
    let authenticated = app.get("/api/payments/refunds", Some(&token)).await;
    assert_eq!(authenticated.status, StatusCode::NOT_FOUND);
    assert_eq!(first_code(&authenticated), "UNKNOWN_ROUTE");
}

#[tokio::test]
async fn charges_are_created_and_scoped() {
    let app = spawn_app();
    let ada = app.register("ada@example.com").await;
    let bob = app.register("bob@example.com").await;

    let created = app
        .post_json(
            "/api/payments/charges",
            Some(&ada),
            json!({"amount_cents": 1999, "currency": "GBP", "description": "Pro plan"}),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.text);
    assert_eq!(created.body["currency"], "gbp");
    assert_eq!(created.body["status"], "succeeded");

    let id = created.body["id"].as_str().unwrap();
    let uri = format!("/api/payments/charges/{}", id);

    assert_eq!(app.get(&uri, Some(&ada)).await.status, StatusCode::OK);

    let stranger = app.get(&uri, Some(&bob)).await;
    assert_eq!(stranger.status, StatusCode::NOT_FOUND);
    assert_eq!(first_code(&stranger), "NOT_FOUND");

    let unsupported = app
        .post_json("/api/payments/charges", Some(&ada), json!({"amount_cents": 10, "currency": "doge"}))
        .await;
    assert_eq!(unsupported.status, StatusCode::BAD_REQUEST);
    assert_eq!(first_code(&unsupported), "UNSUPPORTED_CURRENCY");
}

#[tokio::test]
async fn graphql_requires_token() {
    let app = spawn_app();
    let response = app
        .post_json("/api/graphql", None, json!({"query": "{ viewer { email } }"}))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(first_code(&response), "MISSING_TOKEN");
}

#[tokio::test]
async fn anonymous_graphql_mutation_never_reaches_payments() {
    let app = spawn_app();
    let mutation = json!({"query": "mutation { createCharge(input: {amountCents: 700, currency: \"usd\"}) { id } }"});

    let anonymous = app.post_json("/api/graphql", None, mutation.clone()).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(first_code(&anonymous), "MISSING_TOKEN");

    let forged = app.post_json("/api/graphql", Some("not.a.jwt"), mutation.clone()).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
    assert_eq!(first_code(&forged), "INVALID_TOKEN");
    assert_eq!(app.payments.calls(), 0);

    let token = app.register("ada@example.com").await;
    let accepted = app.post_json("/api/graphql", Some(&token), mutation).await;
    assert_eq!(accepted.status, StatusCode::OK, "{}", accepted.text);
    assert_eq!(app.payments.calls(), 1);
}

#[tokio::test]
async fn graphql_executes_with_user_context() {
    let app = spawn_app();
    let token = app.register("ada@example.com").await;

    let response = app
        .post_json(
            "/api/graphql",
            Some(&token),
            json!({"query": "mutation { createCharge(input: {amountCents: 700, currency: \"usd\"}) { amountCents } }"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    assert_eq!(response.body["data"]["createCharge"]["amountCents"], 700);

    let response = app
        .post_json(
            "/api/graphql",
            Some(&token),
            json!({"query": "{ viewer { email } charges { amountCents } }"}),
        )
        .await;
    assert_eq!(response.body["data"]["viewer"]["email"], "ada@example.com");
    assert_eq!(response.body["data"]["charges"][0]["amountCents"], 700);
}

#[tokio::test]
async fn graphql_rejects_malformed_body_with_envelope() {
    let app = spawn_app();
    let token = app.register("ada@example.com").await;

    let response = app
        .send(request(
            Method::POST,
            "/api/graphql",
            Some(&token),
            Body::from("{ viewer"),
            Some("application/json"),
        ))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(first_code(&response), "INVALID_BODY");
}

// ==============================================================================
// DOCS
// ==============================================================================

#[tokio::test]
async fn docs_mounted_only_when_enabled() {
    let disabled = spawn_app();
    let response = disabled.get("/api/docs", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(first_code(&response), "UNKNOWN_ROUTE");

    let enabled = spawn_app_with(true, RecordingMailer::default());
    let response = enabled.get("/api/docs", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text.contains("/api/graphql"));
}
