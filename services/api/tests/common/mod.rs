#![allow(dead_code)]

use api_lib::adapters::DbAdapter;
use api_lib::config::Config;
use api_lib::web::{self, state::AppState};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use task_tracker_core::domain::{User, UserCredentials};
use task_tracker_core::ports::{PortError, PortResult, TaskStore, UserStore};
use task_tracker_core::MemoryTaskStore;
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::{postgres, testcontainers};
use tower::ServiceExt;
use uuid::Uuid;

/// Users and sessions kept in memory for endpoint tests.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, UserCredentials>>,
    sessions: Mutex<HashMap<String, (Uuid, DateTime<Utc>)>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(email) {
            return Err(PortError::Conflict(format!("{} is taken", email)));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        users.insert(
            email.to_string(),
            UserCredentials {
                user: user.clone(),
                hashed_password: hashed_password.to_string(),
            },
        );
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.users
            .lock()
            .unwrap()
            .get(email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("No user {}", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        match self.sessions.lock().unwrap().get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.sessions.lock().unwrap().remove(session_id);
        Ok(())
    }
}

pub fn test_config(local_mode_enabled: bool) -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        db_max_connections: 1,
        log_level: tracing::Level::DEBUG,
        local_store_path: PathBuf::from("unused.json"),
        local_mode_enabled,
        day_offset: FixedOffset::east_opt(0).unwrap(),
        allowed_origin: "http://localhost:3000".to_string(),
    }
}

/// A running app over in-memory stores, with handles to inspect them.
pub struct TestApp {
    pub router: Router,
    pub server_tasks: Arc<MemoryTaskStore>,
    pub local_tasks: Arc<MemoryTaskStore>,
}

pub fn setup(local_mode_enabled: bool) -> TestApp {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let server_tasks = Arc::new(MemoryTaskStore::default());
    let local_tasks = Arc::new(MemoryTaskStore::default());
    let tasks: Arc<dyn TaskStore> = server_tasks.clone();
    let local: Arc<dyn TaskStore> = local_tasks.clone();
    let state = Arc::new(AppState {
        tasks,
        local_tasks: local,
        users: Arc::new(MemoryUserStore::default()),
        config: Arc::new(test_config(local_mode_enabled)),
    });
    TestApp {
        router: web::router(state),
        server_tasks,
        local_tasks,
    }
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sends a request and returns the status and the parsed JSON body
    /// (`Value::Null` when the body is not JSON).
    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self.send(method, uri, body, cookie).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// Registers a user and returns the `session=...` cookie pair.
    pub async fn register(&self, email: &str) -> String {
        let response = self
            .send(
                Method::POST,
                "/auth/register",
                Some(serde_json::json!({
                    "name": "Test User",
                    "email": email,
                    "password": "secret123",
                })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        session_pair(&response)
    }
}

/// Extracts `session=<id>` from a response's `Set-Cookie` header.
pub fn session_pair(response: &Response<Body>) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

//=========================================================================================
// Postgres Containers
//=========================================================================================

pub async fn setup_container() -> anyhow::Result<testcontainers::ContainerAsync<postgres::Postgres>>
{
    let container = postgres::Postgres::default().start().await?;
    Ok(container)
}

/// Connects to the container and applies the service migrations.
pub async fn setup_db(
    container: &testcontainers::ContainerAsync<postgres::Postgres>,
) -> anyhow::Result<(PgPool, DbAdapter)> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    let db_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&db_url)
        .await?;
    let db = DbAdapter::new(pool.clone());
    db.run_migrations().await?;
    Ok((pool, db))
}
