#![allow(dead_code)]

/// Common test utilities for HTTP tests
///
/// This module provides shared infrastructure for the router tests:
/// - An in-memory store behind the real router
/// - Test user creation with ready-made bearer tokens
/// - A JSON request helper over `tower::ServiceExt::oneshot`

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::Config;
use taskboard_shared::auth::jwt::issue_token;
use taskboard_shared::models::user::{CreateUser, User};
use taskboard_shared::store::{MemoryStore, Store};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: axum::Router,
    pub config: Config,
}

/// A stored user with a valid token
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> String {
        self.user.id.to_string()
    }
}

impl TestContext {
    /// Creates a context over an empty in-memory store
    pub fn new() -> Self {
        let vars: HashMap<&str, &str> = [("STORE_BACKEND", "memory"), ("JWT_SECRET", JWT_SECRET)]
            .into_iter()
            .collect();
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
            .expect("test configuration");

        let store = Arc::new(MemoryStore::new());
        let app = build_router(AppState::new(store.clone(), config.clone()));

        TestContext { store, app, config }
    }

    /// Inserts a user directly (skipping Argon2) and issues a token
    pub async fn create_user(&self, username: &str) -> TestUser {
        let user = self
            .store
            .create_user(CreateUser {
                username: username.to_string(),
                first_name: username.to_string(),
                last_name: "Tester".to_string(),
                email: format!("{}@example.com", username),
                password_hash: "not-a-real-hash".to_string(),
                photo: None,
            })
            .await
            .expect("create test user");

        let token = issue_token(user.id, &user.email, JWT_SECRET, 60).expect("issue token");
        TestUser { user, token }
    }

    /// Sends a request and returns the status with the JSON body
    /// (`Value::Null` for an empty or non-JSON body)
    pub async fn request(
        &self,
        method: Method,
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
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, json)
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(&user.token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, user: &TestUser, body: Option<Value>) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(&user.token), body).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(&user.token), None).await
    }

    /// Creates a group owned by `owner` and returns its id
    pub async fn create_group(&self, owner: &TestUser, name: &str) -> String {
        let (status, body) = self
            .post("/api/groups/", owner, serde_json::json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }

    /// Adds `member` to the group as `owner`
    pub async fn add_member(&self, owner: &TestUser, group_id: &str, member: &TestUser) {
        let uri = format!("/api/groups/{}/add_user/{}", group_id, member.id());
        let (status, body) = self.patch(&uri, owner, None).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }

    /// Creates a task from a JSON body and returns it
    pub async fn create_task(&self, user: &TestUser, body: Value) -> Value {
        let (status, task) = self.post("/api/tasks/", user, body).await;
        assert_eq!(status, StatusCode::CREATED, "{}", task);
        task
    }
}
