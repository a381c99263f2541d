//! Test helpers for ethereal-service integration tests.
//!
//! Everything runs against an in-memory SQLite pool and the real router, so
//! the tests exercise the same code paths as production without any external
//! service.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use ethereal_service::{
    build_router,
    config::{
        DatabaseConfig, Environment, EtherealConfig, MediaConfig, PinConfig, RateLimitConfig,
        RoomConfig, TokenConfig,
    },
    db, AppState,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const TEST_PIN: &str = "4321";

pub fn test_config() -> EtherealConfig {
    EtherealConfig {
        common: ethereal_core::config::Config {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        environment: Environment::Dev,
        service_name: "ethereal-service-test".to_string(),
        log_level: "error".to_string(),
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        token: TokenConfig {
            secret: "test-signing-secret".to_string(),
            session_ttl_days: 7,
            diary_token_ttl_minutes: 60,
        },
        room: RoomConfig {
            capacity: 4,
            secret_min_length: 4,
            lock_lease_seconds: 120,
        },
        pin: PinConfig {
            diary_pin: TEST_PIN.to_string(),
        },
        rate_limit: RateLimitConfig {
            max_failures: 5,
            block_seconds: 900,
            global_ip_limit: 10_000,
            global_ip_window_seconds: 60,
        },
        media: MediaConfig {
            root: std::env::temp_dir()
                .join(format!("ethereal-test-{}", Uuid::new_v4()))
                .to_string_lossy()
                .into_owned(),
        },
    }
}

/// Test application: real router, in-memory store.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn spawn() -> TestApp {
        Self::spawn_with(test_config()).await
    }

    pub async fn spawn_with(config: EtherealConfig) -> TestApp {
        // A single connection with no idle reaping keeps the in-memory
        // database alive for the whole test.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(&config.database.url)
            .await
            .expect("failed to open in-memory sqlite");

        db::init_schema(&pool).await.expect("failed to init schema");

        let state = AppState::new(config, pool)
            .await
            .expect("failed to build app state");

        TestApp {
            router: build_router(state.clone()),
            state,
        }
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: Value,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        self.send(request).await
    }

    pub async fn put_json(
        &self,
        path: &str,
        body: Value,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("PUT")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        self.send(request).await
    }

    /// POST JSON with a spoofed client address (`x-forwarded-for`).
    pub async fn post_json_from(&self, path: &str, body: Value, ip: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("DELETE").uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Join a room and return the whole join response body.
    pub async fn join(&self, secret: &str, device_id: &str, display_name: &str) -> Value {
        let (status, body) = self
            .post_json(
                "/rooms/join",
                json!({
                    "secret": secret,
                    "deviceId": device_id,
                    "displayName": display_name,
                }),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "join failed: {}", body);
        body
    }

    /// Join and return just the bearer token.
    pub async fn join_token(&self, secret: &str, device_id: &str, display_name: &str) -> String {
        self.join(secret, device_id, display_name).await["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Create a document and return its id.
    pub async fn create_document(&self, token: &str, content: &str) -> String {
        let (status, body) = self
            .post_json("/rooms/documents", json!({ "content": content }), Some(token))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
        body["documentId"].as_str().unwrap().to_string()
    }
}
