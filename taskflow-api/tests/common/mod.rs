/// Common test utilities for integration tests
///
/// Builds the full router over an in-memory store, registers users directly
/// through the store and mints access tokens for them.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use taskflow_api::app::{build_router, AppState};
use taskflow_api::config::{ActivityConfig, ApiConfig, Config, DatabaseConfig, JwtConfig};
use taskflow_shared::auth::jwt::{create_token, Claims, TokenType};
use taskflow_shared::models::user::{CreateUser, User};
use taskflow_shared::services::activity::DEFAULT_FEED_LIMIT;
use taskflow_shared::services::users;
use taskflow_shared::store::memory::MemoryStore;
use taskflow_shared::store::Store;
use tower::Service as _;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: MemoryStore,
    pub app: axum::Router,
    pub config: Config,
}

/// A registered user and a valid access token
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> String {
        self.user.id.to_string()
    }
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        activity: ActivityConfig {
            default_limit: DEFAULT_FEED_LIMIT,
        },
    }
}

impl TestContext {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let config = test_config();
        let app = build_router(AppState::new(Arc::new(store.clone()), config.clone()));

        Self { store, app, config }
    }

    /// Registers `name@example.com` and returns it with an access token
    pub async fn user(&self, name: &str) -> TestUser {
        let mut tx = self.store.begin().await.unwrap();
        let user = users::register_user(
            tx.as_mut(),
            CreateUser::new(format!("{}@example.com", name), name),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let token = create_token(&Claims::new(user.id, TokenType::Access), JWT_SECRET).unwrap();
        TestUser { user, token }
    }

    /// Sends a request and returns the status and the JSON body (`Null` when empty)
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("Non-JSON body ({}): {}", status, String::from_utf8_lossy(&bytes))
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send("GET", uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(&user.token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send("PATCH", uri, Some(&user.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send("DELETE", uri, Some(&user.token), None).await
    }

    /// Creates a project owned by `owner` and returns its id
    pub async fn project(&self, owner: &TestUser, name: &str) -> String {
        let (status, body) = self
            .post("/v1/projects", owner, serde_json::json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }

    /// Invites `member` into `project` with `role`
    pub async fn invite(&self, project: &str, owner: &TestUser, member: &TestUser, role: &str) {
        let (status, body) = self
            .post(
                &format!("/v1/projects/{}/invite", project),
                owner,
                serde_json::json!({ "email": member.user.email, "role": role }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
    }

    /// Creates a task in the `todo` column and returns its id
    pub async fn task(&self, project: &str, user: &TestUser, title: &str) -> String {
        let (status, body) = self
            .post(
                &format!("/v1/projects/{}/tasks", project),
                user,
                serde_json::json!({ "title": title }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }
}
