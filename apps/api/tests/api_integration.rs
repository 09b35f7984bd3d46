//! End-to-end API integration tests
//!
//! These tests drive the complete router over the in-memory store:
//! - Signup, login, password flows and session cookies
//! - Tour, review and booking resources with role checks
//! - Checkout and the booking recorded on return
//! - Error envelopes, HTML pages and HTTP hardening

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use chrono::Utc;
use natours_api::api::build_router;
use natours_api::auth::{create_token, hash_password};
use natours_api::config::Config;
use natours_api::domain::entity::FromDraft;
use natours_api::domain::tour::{Tour, TourDraft};
use natours_api::domain::user::{NewUser, Role, User};
use natours_api::infrastructure::email::{EmailMessage, MailError, Mailer};
use natours_api::infrastructure::payments::{
    CheckoutRequest, CheckoutSession, PaymentError, PaymentGateway,
};
use natours_api::state::{AppState, Repositories};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for oneshot

/// Keeps every sent message; can be switched to fail
#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<(String, String, String)>>,
    fail: bool,
}

impl RecordingMailer {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Rejected {
                status: 503,
                body: "mail provider down".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((message.to, message.subject, message.text));
        Ok(())
    }
}

#[derive(Default)]
struct FakePayments {
    requests: Mutex<Vec<CheckoutRequest>>,
}

#[async_trait]
impl PaymentGateway for FakePayments {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(CheckoutSession {
            id: "cs_test_123".to_string(),
            url: Some("https://checkout.stripe.com/pay/cs_test_123".to_string()),
        })
    }
}

struct TestApp {
    router: Router,
    state: AppState,
    mailer: Arc<RecordingMailer>,
    payments: Arc<FakePayments>,
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    text: String,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap_or(Value::Null)
    }
}

/// Setup test application over a fresh in-memory store
fn setup_app_with(config: Config, mailer: RecordingMailer) -> TestApp {
    let mailer = Arc::new(mailer);
    let payments = Arc::new(FakePayments::default());
    let state = AppState::new(config, Repositories::in_memory())
        .with_mailer(mailer.clone())
        .with_payments(payments.clone());

    TestApp {
        router: build_router(state.clone()),
        state,
        mailer,
        payments,
    }
}

fn setup_app() -> TestApp {
    setup_app_with(Config::for_tests(), RecordingMailer::default())
}

impl TestApp {
    async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            text: String::from_utf8_lossy(&bytes).to_string(),
        }
    }

    /// Stores a user with the given role and returns it with a session token
    async fn create_user(&self, name: &str, email: &str, role: Role) -> (User, String) {
        let registration = NewUser {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            password: Some("test1234".to_string()),
            password_confirm: Some("test1234".to_string()),
        }
        .validate()
        .unwrap();
        let hash = hash_password(&registration.password, 4).unwrap();
        let mut user = User::register(&registration, hash, Utc::now());
        user.role = role;
        self.state.users.as_crud().insert(&user).await.unwrap();

        let token = create_token(
            user.id,
            &self.state.config.jwt_secret,
            self.state.config.jwt_expires_in,
        )
        .unwrap();
        (user, token)
    }

    async fn create_tour(&self, admin_token: &str, body: Value) -> Value {
        let response = self
            .call("POST", "/api/v1/tours", Some(admin_token), Some(body))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        response.json()["data"]["data"].clone()
    }
}

fn forest_hiker() -> Value {
    json!({
        "name": "The Forest Hiker",
        "duration": 5,
        "maxGroupSize": 25,
        "difficulty": "easy",
        "price": 397,
        "summary": "Breathtaking hike through the Canadian Banff National Park",
        "imageCover": "tour-1-cover.jpg",
        "startDates": ["2021-04-25T09:00:00Z", "2021-07-20T09:00:00Z"],
        "startLocation": {
            "type": "Point",
            "coordinates": [-118.113491, 34.111745],
            "description": "Los Angeles, USA"
        }
    })
}

const BOUNDARY: &str = "natours-form-boundary";

/// Multipart body from `(name, filename + content type, bytes)` parts
fn multipart_body(parts: &[(&str, Option<(&str, &str)>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file {
            Some((filename, content_type)) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    name, filename, content_type
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn update_me_upload(token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri("/api/v1/users/updateMe")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn stored_photos(public_dir: &std::path::Path) -> Vec<String> {
    std::fs::read_dir(public_dir.join("img").join("users"))
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn signup_payload() -> Value {
    json!({
        "name": "Laura Wilson",
        "email": "laura@example.com",
        "password": "pass1234",
        "passwordConfirm": "pass1234"
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = setup_app();

    let response = app.call("GET", "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text, "OK");
}

#[tokio::test]
async fn test_signup_sets_cookie_and_sends_welcome() {
    let app = setup_app();

    let response = app
        .call("POST", "/api/v1/users/signup", None, Some(signup_payload()))
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let body = response.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Signed up successfully");
    assert_eq!(body["data"]["email"], "laura@example.com");
    assert_eq!(body["data"]["role"], "user");
    assert!(body["data"].get("passwordHash").is_none());
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    let cookie = response.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("natoursJWTToken="));
    assert!(cookie.contains("HttpOnly"));

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "laura@example.com");
    assert_eq!(sent[0].1, "Welcome to the Natours Family!");
}

#[tokio::test]
async fn test_signup_validation_and_duplicates() {
    let app = setup_app();

    let response = app
        .call(
            "POST",
            "/api/v1/users/signup",
            None,
            Some(json!({"name": "Laura", "email": "laura@example.com", "password": "pass1234", "passwordConfirm": "pass9999"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["status"], "fail");
    assert_eq!(response.json()["message"], "Password does not match");

    app.call("POST", "/api/v1/users/signup", None, Some(signup_payload()))
        .await;
    let duplicate = app
        .call("POST", "/api/v1/users/signup", None, Some(signup_payload()))
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.json()["message"], "Duplicate field value: email");
}

#[tokio::test]
async fn test_login_flow() {
    let app = setup_app();
    app.create_user("Laura Wilson", "laura@example.com", Role::User)
        .await;

    let missing = app
        .call("POST", "/api/v1/users/login", None, Some(json!({"email": "laura@example.com"})))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.json()["message"], "Please provide email and password");

    let wrong = app
        .call(
            "POST",
            "/api/v1/users/login",
            None,
            Some(json!({"email": "laura@example.com", "password": "wrongpass"})),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json()["message"], "Incorrect email or password");

    let ok = app
        .call(
            "POST",
            "/api/v1/users/login",
            None,
            Some(json!({"email": "LAURA@example.com", "password": "test1234"})),
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK);
    let token = ok.json()["token"].as_str().unwrap().to_string();

    let me = app.call("GET", "/api/v1/users/me", Some(&token), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json()["data"]["data"]["name"], "Laura Wilson");

    let logout = app.call("GET", "/api/v1/users/logout", None, None).await;
    assert_eq!(logout.status, StatusCode::OK);
    let cookie = logout.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("natoursJWTToken=loggedout"));
}

#[tokio::test]
async fn test_protected_routes_require_login() {
    let app = setup_app();

    let response = app.call("GET", "/api/v1/users/me", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.json(),
        json!({"status": "fail", "message": "Access denied! Please log in", "error": "Access denied! Please log in"})
    );

    let forged = app
        .call("GET", "/api/v1/users/me", Some("not-a-jwt"), None)
        .await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
    assert_eq!(forged.json()["message"], "Access denied! Please log in");
}

#[tokio::test]
async fn test_cookie_session_is_accepted() {
    let app = setup_app();
    let (_, token) = app
        .create_user("Laura Wilson", "laura@example.com", Role::User)
        .await;

    let request = Request::builder()
        .uri("/api/v1/users/me")
        .header(header::COOKIE, format!("natoursJWTToken={}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_tour_writes_are_restricted() {
    let app = setup_app();
    let (_, user_token) = app
        .create_user("Laura Wilson", "laura@example.com", Role::User)
        .await;
    let (_, admin_token) = app
        .create_user("Jonas Admin", "admin@natours.io", Role::Admin)
        .await;

    let anonymous = app
        .call("POST", "/api/v1/tours", None, Some(forest_hiker()))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let forbidden = app
        .call("POST", "/api/v1/tours", Some(&user_token), Some(forest_hiker()))
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    assert_eq!(forbidden.json()["message"], "Access denied!");

    let tour = app.create_tour(&admin_token, forest_hiker()).await;
    assert_eq!(tour["slug"], "the-forest-hiker");
    assert_eq!(tour["durationWeeks"].as_f64().unwrap(), 5.0 / 7.0);

    let list = app.call("GET", "/api/v1/tours", None, None).await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.json()["results"], 1);
}

#[tokio::test]
async fn test_tour_validation_and_lookup_errors() {
    let app = setup_app();
    let (_, admin_token) = app
        .create_user("Jonas Admin", "admin@natours.io", Role::Admin)
        .await;

    let invalid = app
        .call(
            "POST",
            "/api/v1/tours",
            Some(&admin_token),
            Some(json!({"name": "Short", "duration": 5, "maxGroupSize": 10, "difficulty": "easy",
                        "price": 100, "summary": "A tour", "imageCover": "cover.jpg"})),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        invalid.json()["message"],
        "A tour name must have more or equal then 10 characters"
    );

    let bad_id = app.call("GET", "/api/v1/tours/abc", None, None).await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_id.json()["message"], "Invalid id: abc");

    let missing = app
        .call(
            "GET",
            &format!("/api/v1/tours/{}", uuid::Uuid::new_v4()),
            None,
            None,
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json()["message"], "No tour found with that ID");

    let unknown_field = app
        .call("GET", "/api/v1/tours?colour=red", None, None)
        .await;
    assert_eq!(unknown_field.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown_field.json()["message"], "Invalid query field: colour");
}

#[tokio::test]
async fn test_tour_list_query_features() {
    let app = setup_app();
    let (_, admin_token) = app
        .create_user("Jonas Admin", "admin@natours.io", Role::Admin)
        .await;
    app.create_tour(&admin_token, forest_hiker()).await;
    let mut expensive = forest_hiker();
    expensive["name"] = json!("The Snow Adventurer");
    expensive["difficulty"] = json!("difficult");
    expensive["price"] = json!(997);
    app.create_tour(&admin_token, expensive).await;

    let filtered = app
        .call("GET", "/api/v1/tours?price%5Bgte%5D=500&fields=name,price", None, None)
        .await;
    let body = filtered.json();
    assert_eq!(body["results"], 1);
    assert_eq!(body["data"]["data"][0]["name"], "The Snow Adventurer");
    assert!(body["data"]["data"][0].get("summary").is_none());

    let top = app.call("GET", "/api/v1/tours/top/1", None, None).await;
    assert_eq!(top.status, StatusCode::OK);
    assert_eq!(top.json()["results"], 1);
    assert!(top.json()["data"]["data"][0].get("difficulty").is_some());
    assert!(top.json()["data"]["data"][0].get("imageCover").is_none());

    let stats = app.call("GET", "/api/v1/tours/tour-stats", None, None).await;
    let stats = stats.json();
    assert_eq!(stats["data"]["stats"][0]["difficulty"], "EASY");
    assert_eq!(stats["data"]["stats"][1]["difficulty"], "DIFFICULT");
}

#[tokio::test]
async fn test_monthly_plan_requires_guide_roles() {
    let app = setup_app();
    let (_, admin_token) = app
        .create_user("Jonas Admin", "admin@natours.io", Role::Admin)
        .await;
    let (_, user_token) = app
        .create_user("Laura Wilson", "laura@example.com", Role::User)
        .await;
    let (_, guide_token) = app
        .create_user("Kate Morrison", "kate@example.com", Role::Guide)
        .await;
    app.create_tour(&admin_token, forest_hiker()).await;

    let forbidden = app
        .call("GET", "/api/v1/tours/monthly-plan/2021", Some(&user_token), None)
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let plan = app
        .call("GET", "/api/v1/tours/monthly-plan/2021", Some(&guide_token), None)
        .await;
    assert_eq!(plan.status, StatusCode::OK);
    let plan = plan.json();
    assert_eq!(plan["data"]["plan"].as_array().unwrap().len(), 2);
    assert_eq!(plan["data"]["plan"][0]["tours"][0], "The Forest Hiker");
}

#[tokio::test]
async fn test_geo_search() {
    let app = setup_app();
    let (_, admin_token) = app
        .create_user("Jonas Admin", "admin@natours.io", Role::Admin)
        .await;
    app.create_tour(&admin_token, forest_hiker()).await;

    let near = app
        .call(
            "GET",
            "/api/v1/tours/tours-within/200/center/32.715736,-117.161087/unit/mi",
            None,
            None,
        )
        .await;
    assert_eq!(near.status, StatusCode::OK);
    assert_eq!(near.json()["results"], 1);

    let too_far = app
        .call(
            "GET",
            "/api/v1/tours/tours-within/10/center/32.715736,-117.161087/unit/km",
            None,
            None,
        )
        .await;
    assert_eq!(too_far.json()["results"], 0);

    let distances = app
        .call("GET", "/api/v1/tours/distances/32.715736,-117.161087/unit/km", None, None)
        .await;
    let distance = distances.json()["data"][0]["distance"].as_f64().unwrap();
    assert!((distance - 180.0).abs() < 10.0, "got {distance}");

    let bad = app
        .call("GET", "/api/v1/tours/distances/somewhere/unit/km", None, None)
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        bad.json()["message"],
        "Please provide latitude & longitude in form of lat,lng"
    );
}

#[tokio::test]
async fn test_reviews_update_tour_ratings() {
    let app = setup_app();
    let (_, admin_token) = app
        .create_user("Jonas Admin", "admin@natours.io", Role::Admin)
        .await;
    let (_, user_token) = app
        .create_user("Laura Wilson", "laura@example.com", Role::User)
        .await;
    let tour = app.create_tour(&admin_token, forest_hiker()).await;
    let tour_id = tour["id"].as_str().unwrap();
    let reviews_uri = format!("/api/v1/tours/{}/reviews", tour_id);

    let by_admin = app
        .call("POST", &reviews_uri, Some(&admin_token), Some(json!({"review": "Fine", "rating": 3})))
        .await;
    assert_eq!(by_admin.status, StatusCode::FORBIDDEN);

    let created = app
        .call("POST", &reviews_uri, Some(&user_token), Some(json!({"review": "Amazing!", "rating": 4})))
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.text);

    let duplicate = app
        .call("POST", &reviews_uri, Some(&user_token), Some(json!({"review": "Again", "rating": 5})))
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.json()["message"], "Duplicate field value: tour, user");

    let detail = app
        .call("GET", &format!("/api/v1/tours/{}", tour_id), None, None)
        .await
        .json();
    assert_eq!(detail["data"]["data"]["ratingsQuantity"], 1);
    assert_eq!(detail["data"]["data"]["ratingsAverage"].as_f64().unwrap(), 4.0);
    assert_eq!(detail["data"]["data"]["reviews"][0]["user"]["name"], "Laura Wilson");

    let listed = app
        .call("GET", &reviews_uri, Some(&user_token), None)
        .await
        .json();
    assert_eq!(listed["results"], 1);

    let review_id = listed["data"]["data"][0]["id"].as_str().unwrap().to_string();
    let deleted = app
        .call("DELETE", &format!("/api/v1/reviews/{}", review_id), Some(&user_token), None)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let detail = app
        .call("GET", &format!("/api/v1/tours/{}", tour_id), None, None)
        .await
        .json();
    assert_eq!(detail["data"]["data"]["ratingsQuantity"], 0);
    assert_eq!(detail["data"]["data"]["ratingsAverage"].as_f64().unwrap(), 4.5);
}

#[tokio::test]
async fn test_review_requires_existing_tour() {
    let app = setup_app();
    let (_, user_token) = app
        .create_user("Laura Wilson", "laura@example.com", Role::User)
        .await;

    let response = app
        .call(
            "POST",
            "/api/v1/reviews",
            Some(&user_token),
            Some(json!({"review": "Ghost tour", "rating": 5, "tour": uuid::Uuid::new_v4()})),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["message"], "No tour found with that ID");
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = setup_app();
    app.create_user("Laura Wilson", "laura@example.com", Role::User)
        .await;

    let unknown = app
        .call(
            "POST",
            "/api/v1/users/forgetPassword",
            None,
            Some(json!({"email": "nobody@example.com"})),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.json()["message"], "User not found!");

    let requested = app
        .call(
            "POST",
            "/api/v1/users/forgetPassword",
            None,
            Some(json!({"email": "laura@example.com"})),
        )
        .await;
    assert_eq!(requested.status, StatusCode::OK);
    assert_eq!(requested.json()["message"], "Reset email sent successfully");

    let sent = app.mailer.sent();
    assert_eq!(sent[0].1, "Your password reset token (valid for only 10 minutes)");
    let text = &sent[0].2;
    let start = text.find("/resetPassword/").unwrap() + "/resetPassword/".len();
    let token: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect();
    assert!(!token.is_empty());

    let invalid = app
        .call(
            "PATCH",
            "/api/v1/users/resetPassword/deadbeef",
            None,
            Some(json!({"password": "newpass123", "passwordConfirm": "newpass123"})),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.json()["message"], "Token is invalid or expired");

    let reset = app
        .call(
            "PATCH",
            &format!("/api/v1/users/resetPassword/{}", token),
            None,
            Some(json!({"password": "newpass123", "passwordConfirm": "newpass123"})),
        )
        .await;
    assert_eq!(reset.status, StatusCode::OK, "{}", reset.text);
    assert_eq!(reset.json()["message"], "Password changed successfully");

    let reused = app
        .call(
            "PATCH",
            &format!("/api/v1/users/resetPassword/{}", token),
            None,
            Some(json!({"password": "other1234", "passwordConfirm": "other1234"})),
        )
        .await;
    assert_eq!(reused.status, StatusCode::BAD_REQUEST);

    let login = app
        .call(
            "POST",
            "/api/v1/users/login",
            None,
            Some(json!({"email": "laura@example.com", "password": "newpass123"})),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn test_password_reset_mail_failure() {
    let app = setup_app_with(Config::for_tests(), RecordingMailer::failing());
    app.create_user("Laura Wilson", "laura@example.com", Role::User)
        .await;

    let response = app
        .call(
            "POST",
            "/api/v1/users/forgetPassword",
            None,
            Some(json!({"email": "laura@example.com"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["status"], "error");
    assert_eq!(
        response.json()["message"],
        "Error sending and email! try again later"
    );
}

#[tokio::test]
async fn test_update_password() {
    let app = setup_app();
    let (_, token) = app
        .create_user("Laura Wilson", "laura@example.com", Role::User)
        .await;

    let incomplete = app
        .call(
            "PATCH",
            "/api/v1/users/updatePassword",
            Some(&token),
            Some(json!({"currentPassword": "test1234"})),
        )
        .await;
    assert_eq!(incomplete.status, StatusCode::BAD_REQUEST);
    assert_eq!(incomplete.json()["message"], "Enter required fields");

    let wrong = app
        .call(
            "PATCH",
            "/api/v1/users/updatePassword",
            Some(&token),
            Some(json!({"currentPassword": "nope12345", "newPassword": "newpass123", "newPasswordConfirm": "newpass123"})),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json()["message"], "Current password is wrong");

    let changed = app
        .call(
            "PATCH",
            "/api/v1/users/updatePassword",
            Some(&token),
            Some(json!({"currentPassword": "test1234", "newPassword": "newpass123", "newPasswordConfirm": "newpass123"})),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK);
    assert_eq!(changed.json()["message"], "password changed successfully");
    assert!(changed.json()["token"].is_string());
}

#[tokio::test]
async fn test_update_me_and_delete_me() {
    let app = setup_app();
    let (_, token) = app
        .create_user("Laura Wilson", "laura@example.com", Role::User)
        .await;

    let password = app
        .call(
            "PATCH",
            "/api/v1/users/updateMe",
            Some(&token),
            Some(json!({"password": "newpass123"})),
        )
        .await;
    assert_eq!(password.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        password.json()["message"],
        "This route is not for password updates. Please use /updatePassword"
    );

    let updated = app
        .call(
            "PATCH",
            "/api/v1/users/updateMe",
            Some(&token),
            Some(json!({"name": "Laura W.", "role": "admin"})),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.json()["data"]["user"]["name"], "Laura W.");
    assert_eq!(updated.json()["data"]["user"]["role"], "user");

    let deleted = app
        .call("DELETE", "/api/v1/users/deleteMe", Some(&token), None)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let login = app
        .call(
            "POST",
            "/api/v1/users/login",
            None,
            Some(json!({"email": "laura@example.com", "password": "test1234"})),
        )
        .await;
    assert_eq!(login.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_user_management() {
    let app = setup_app();
    let (_, admin_token) = app
        .create_user("Jonas Admin", "admin@natours.io", Role::Admin)
        .await;
    let (user, user_token) = app
        .create_user("Laura Wilson", "laura@example.com", Role::User)
        .await;

    let forbidden = app
        .call("GET", "/api/v1/users", Some(&user_token), None)
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let listed = app.call("GET", "/api/v1/users", Some(&admin_token), None).await;
    assert_eq!(listed.json()["results"], 2);

    let create = app
        .call("POST", "/api/v1/users", Some(&admin_token), Some(signup_payload()))
        .await;
    assert_eq!(create.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        create.json()["message"],
        "This route is not defined! Please use /signup instead"
    );

    let promoted = app
        .call(
            "PATCH",
            &format!("/api/v1/users/{}", user.id),
            Some(&admin_token),
            Some(json!({"role": "guide"})),
        )
        .await;
    assert_eq!(promoted.status, StatusCode::OK);
    assert_eq!(promoted.json()["data"]["data"]["role"], "guide");
}

#[tokio::test]
async fn test_checkout_and_booking_return() {
    let app = setup_app();
    let (_, admin_token) = app
        .create_user("Jonas Admin", "admin@natours.io", Role::Admin)
        .await;
    let (user, user_token) = app
        .create_user("Laura Wilson", "laura@example.com", Role::User)
        .await;
    let tour = app.create_tour(&admin_token, forest_hiker()).await;
    let tour_id = tour["id"].as_str().unwrap();

    let session = app
        .call(
            "GET",
            &format!("/api/v1/bookings/checkout-session/{}", tour_id),
            Some(&user_token),
            None,
        )
        .await;
    assert_eq!(session.status, StatusCode::OK);
    assert_eq!(session.json()["session"]["id"], "cs_test_123");

    let requests = app.payments.requests.lock().unwrap().clone();
    assert_eq!(requests[0].unit_amount, 39_700);
    assert_eq!(requests[0].currency, "usd");
    assert_eq!(requests[0].customer_email, "laura@example.com");
    assert!(requests[0].success_url.contains(&format!("tour={}", tour_id)));

    let returned = app
        .call(
            "GET",
            &format!("/?tour={}&user={}&price=397", tour_id, user.id),
            None,
            None,
        )
        .await;
    assert_eq!(returned.status, StatusCode::SEE_OTHER);
    assert_eq!(returned.headers[header::LOCATION], "/");

    let bookings = app
        .call("GET", "/api/v1/bookings", Some(&admin_token), None)
        .await
        .json();
    assert_eq!(bookings["results"], 1);
    assert_eq!(bookings["data"]["data"][0]["tour"]["name"], "The Forest Hiker");
    assert_eq!(bookings["data"]["data"][0]["user"]["email"], "laura@example.com");

    let forbidden = app
        .call("GET", "/api/v1/bookings", Some(&user_token), None)
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_pages_render() {
    let app = setup_app();
    let (_, admin_token) = app
        .create_user("Jonas Admin", "admin@natours.io", Role::Admin)
        .await;
    app.create_tour(&admin_token, forest_hiker()).await;

    let overview = app.call("GET", "/", None, None).await;
    assert_eq!(overview.status, StatusCode::OK);
    assert!(overview.text.contains("The Forest Hiker"));

    let tour = app.call("GET", "/tour/the-forest-hiker", None, None).await;
    assert_eq!(tour.status, StatusCode::OK);
    let csp = tour.headers[header::CONTENT_SECURITY_POLICY].to_str().unwrap();
    assert!(csp.contains("api.mapbox.com"));

    let missing = app.call("GET", "/tour/nowhere", None, None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert!(missing.text.contains("No tour found!!"));
    assert!(missing.text.contains("Something went wrong"));

    let account = app.call("GET", "/me", None, None).await;
    assert_eq!(account.status, StatusCode::UNAUTHORIZED);
    assert!(account.text.contains("Access denied! Please log in"));
}

#[tokio::test]
async fn test_unknown_routes() {
    let app = setup_app();

    let api = app.call("GET", "/api/v1/nothing-here", None, None).await;
    assert_eq!(api.status, StatusCode::NOT_FOUND);
    assert_eq!(api.json()["message"], "Page not found");

    let page = app.call("GET", "/nothing-here", None, None).await;
    assert_eq!(page.status, StatusCode::NOT_FOUND);
    assert!(page.text.contains("Page not found"));
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = setup_app();

    let response = app.call("GET", "/health", None, None).await;

    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert_eq!(response.headers["x-frame-options"], "SAMEORIGIN");
    assert!(response.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_api_rate_limit() {
    let mut config = Config::for_tests();
    config.rate_limit_max = 2;
    let app = setup_app_with(config, RecordingMailer::default());

    for _ in 0..2 {
        let response = app.call("GET", "/api/v1/tours", None, None).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let limited = app.call("GET", "/api/v1/tours", None, None).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        limited.json()["message"],
        "Too many requests from this ip, please try again after some time"
    );

    // Pages are not rate limited
    let page = app.call("GET", "/login", None, None).await;
    assert_eq!(page.status, StatusCode::OK);
}

#[tokio::test]
async fn test_production_hides_error_detail() {
    let mut config = Config::for_tests();
    config.environment = natours_api::config::Environment::Production;
    let app = setup_app_with(config, RecordingMailer::default());

    let response = app.call("GET", "/api/v1/tours/abc", None, None).await;
    assert_eq!(
        response.json(),
        json!({"status": "fail", "message": "Invalid id: abc"})
    );
}

#[tokio::test]
async fn test_mistyped_json_fields_are_bad_requests() {
    let app = setup_app();
    let (_, admin_token) = app
        .create_user("Jonas Admin", "admin@natours.io", Role::Admin)
        .await;
    let (_, user_token) = app
        .create_user("Laura Wilson", "laura@example.com", Role::User)
        .await;

    let mut tour = forest_hiker();
    tour["duration"] = json!("abc");
    let response = app
        .call("POST", "/api/v1/tours", Some(&admin_token), Some(tour))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["message"], "Invalid duration: abc");

    let review = app
        .call(
            "POST",
            "/api/v1/reviews",
            Some(&user_token),
            Some(json!({"review": "Loved it", "rating": 5, "tour": "abc"})),
        )
        .await;
    assert_eq!(review.status, StatusCode::BAD_REQUEST);
    assert_eq!(review.json()["message"], "Invalid tour: abc");

    let broken = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/v1/tours")
                .header(header::AUTHORIZATION, format!("Bearer {}", admin_token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"name\": "))
                .unwrap(),
        )
        .await;
    assert_eq!(broken.status, StatusCode::BAD_REQUEST);
    assert_eq!(broken.json()["status"], "fail");
}

#[tokio::test]
async fn test_monthly_plan_rejects_out_of_range_year() {
    let app = setup_app();
    let (_, guide_token) = app
        .create_user("Kate Morrison", "kate@example.com", Role::Guide)
        .await;

    let response = app
        .call("GET", "/api/v1/tours/monthly-plan/2147483647", Some(&guide_token), None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["message"], "Invalid year: 2147483647");
}

#[tokio::test]
async fn test_checkout_return_rejects_negative_price() {
    let app = setup_app();
    let (_, admin_token) = app
        .create_user("Jonas Admin", "admin@natours.io", Role::Admin)
        .await;
    let (user, _) = app
        .create_user("Laura Wilson", "laura@example.com", Role::User)
        .await;
    let tour = app.create_tour(&admin_token, forest_hiker()).await;

    let returned = app
        .call(
            "GET",
            &format!("/?tour={}&user={}&price=-1", tour["id"].as_str().unwrap(), user.id),
            None,
            None,
        )
        .await;
    assert_eq!(returned.status, StatusCode::BAD_REQUEST);
    assert!(returned.text.contains("Booking price must not be negative"));

    let bookings = app
        .call("GET", "/api/v1/bookings", Some(&admin_token), None)
        .await
        .json();
    assert_eq!(bookings["results"], 0);
}

#[tokio::test]
async fn test_rate_limit_ignores_forwarded_for_by_default() {
    let mut config = Config::for_tests();
    config.rate_limit_max = 2;
    let app = setup_app_with(config, RecordingMailer::default());

    let from = |ip: &str| {
        Request::builder()
            .uri("/api/v1/tours")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    assert_eq!(app.send(from("198.51.100.1")).await.status, StatusCode::OK);
    assert_eq!(app.send(from("198.51.100.2")).await.status, StatusCode::OK);
    let limited = app.send(from("198.51.100.3")).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_rate_limit_keys_on_forwarded_for_behind_trusted_proxy() {
    let mut config = Config::for_tests();
    config.rate_limit_max = 1;
    config.trust_proxy = true;
    let app = setup_app_with(config, RecordingMailer::default());

    let from = |ip: &str| {
        Request::builder()
            .uri("/api/v1/tours")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    assert_eq!(app.send(from("198.51.100.1")).await.status, StatusCode::OK);
    assert_eq!(app.send(from("198.51.100.2")).await.status, StatusCode::OK);
    let repeat = app.send(from("198.51.100.1")).await;
    assert_eq!(repeat.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_overview_lists_every_tour() {
    let app = setup_app();
    for n in 0..105 {
        let mut body = forest_hiker();
        body["name"] = json!(format!("Tour Number {:03}", n));
        let draft: TourDraft = serde_json::from_value(body).unwrap();
        let tour = Tour::from_draft(draft).unwrap();
        app.state.tours.as_crud().insert(&tour).await.unwrap();
    }

    let overview = app.call("GET", "/", None, None).await;
    assert_eq!(overview.status, StatusCode::OK);
    assert_eq!(overview.text.matches("href=\"/tour/tour-number-").count(), 105);

    let api = app.call("GET", "/api/v1/tours", None, None).await;
    assert_eq!(api.json()["results"], 100);
}

#[tokio::test]
async fn test_update_me_photo_upload() {
    let public_dir = std::env::temp_dir().join(format!("natours-public-{}", uuid::Uuid::new_v4()));
    let mut config = Config::for_tests();
    config.public_dir = public_dir.to_string_lossy().to_string();
    let app = setup_app_with(config, RecordingMailer::default());
    let (user, token) = app
        .create_user("Laura Wilson", "laura@example.com", Role::User)
        .await;
    let png: &[u8] = b"\x89PNG\r\n\x1a\nfake";

    let svg = app
        .send(update_me_upload(
            &token,
            multipart_body(&[(
                "photo",
                Some(("me.svg", "image/svg+xml")),
                b"<svg onload=\"alert(1)\"/>",
            )]),
        ))
        .await;
    assert_eq!(svg.status, StatusCode::BAD_REQUEST);
    assert_eq!(svg.json()["message"], "Not an image! Please upload only images.");

    let invalid = app
        .send(update_me_upload(
            &token,
            multipart_body(&[
                ("email", None, b"not-an-email"),
                ("photo", Some(("me.png", "image/png")), png),
            ]),
        ))
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.json()["message"], "Please enter a valid email address");
    assert!(stored_photos(&public_dir).is_empty());

    let updated = app
        .send(update_me_upload(
            &token,
            multipart_body(&[
                ("name", None, b"Laura W."),
                ("photo", Some(("me.png", "image/png")), png),
            ]),
        ))
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.text);
    let photo = updated.json()["data"]["user"]["photo"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(photo.starts_with(&format!("user-{}-", user.id)));
    assert!(photo.ends_with(".png"));
    assert_eq!(stored_photos(&public_dir), vec![photo.clone()]);
    assert_eq!(
        std::fs::read(public_dir.join("img").join("users").join(&photo)).unwrap(),
        png
    );

    std::fs::remove_dir_all(&public_dir).ok();
}

#[tokio::test]
async fn test_client_script_is_served() {
    let mut config = Config::for_tests();
    config.public_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/public").to_string();
    let app = setup_app_with(config, RecordingMailer::default());

    let script = app.call("GET", "/js/bundle.js", None, None).await;
    assert_eq!(script.status, StatusCode::OK);
    for endpoint in [
        "/api/v1/users/login",
        "/api/v1/users/logout",
        "/api/v1/users/updateMe",
        "/api/v1/users/updatePassword",
        "/api/v1/bookings/checkout-session/",
    ] {
        assert!(script.text.contains(endpoint), "missing {endpoint}");
    }
}
