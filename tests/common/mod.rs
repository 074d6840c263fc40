#![allow(dead_code)]

use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::middleware::Logger;
use actix_web::{http::StatusCode, test, web, App};
use chrono::Duration;
use serde_json::{json, Value};
use std::sync::Arc;

use todolist::auth::{AuthMiddleware, AuthResponse, CredentialVerifier, TokenService};
use todolist::config::JwtConfig;
use todolist::routes::{self, health};
use todolist::store::MemoryStore;
use todolist::AppState;

pub const TEST_SECRET: &str = "integration-test-secret";

pub struct TestUser {
    pub id: i64,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.token))
    }
}

/// Application state over a fresh in-memory store, with a cheap bcrypt cost.
pub fn test_state() -> web::Data<AppState> {
    let _ = env_logger::builder().is_test(true).try_init();

    let store = Arc::new(MemoryStore::new());
    let tokens = TokenService::new(&JwtConfig {
        secret: TEST_SECRET.to_string(),
        issuer: "todolist".to_string(),
        lifetime: Duration::hours(1),
    });
    web::Data::new(AppState::new(
        store.clone(),
        store,
        CredentialVerifier::new(4),
        tokens,
    ))
}

/// Builds the application the same way `main` does.
pub async fn init_app(
    state: web::Data<AppState>,
) -> impl Service<
    actix_http::Request,
    Response = ServiceResponse<impl MessageBody>,
    Error = actix_web::Error,
> {
    test::init_service(
        App::new()
            .app_data(state)
            .app_data(routes::json_config())
            .app_data(routes::query_config())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            ),
    )
    .await
}

/// Sends a request and returns the status with the JSON body (`Null` when empty).
///
/// Middleware rejections surface as `Err` from the service, so they are turned
/// into responses here the way the server would.
pub async fn send(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    req: test::TestRequest,
) -> (StatusCode, Value) {
    match test::try_call_service(app, req.to_request()).await {
        Ok(resp) => {
            let status = resp.status();
            let body = test::read_body(resp).await;
            let json = if body.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&body).unwrap_or_else(|_| {
                    panic!("non-JSON body: {}", String::from_utf8_lossy(&body))
                })
            };
            (status, json)
        }
        Err(err) => {
            let resp = err.error_response();
            let status = resp.status();
            let body = actix_web::body::to_bytes(resp.into_body())
                .await
                .unwrap_or_default();
            (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
        }
    }
}

pub async fn register_and_login(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    username: &str,
    password: &str,
) -> TestUser {
    let credentials = json!({ "username": username, "password": password });

    let (status, body) = send(
        app,
        test::TestRequest::post()
            .uri("/api/users/register")
            .set_json(&credentials),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

    let (status, body) = send(
        app,
        test::TestRequest::post()
            .uri("/api/users/login")
            .set_json(&credentials),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);

    let auth: AuthResponse = serde_json::from_value(body).unwrap();
    TestUser {
        id: auth.user_id,
        token: auth.token,
    }
}
