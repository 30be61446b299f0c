#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{Value, json};
use std::sync::Arc;
use taskkeeper_server::config::Config;
use taskkeeper_server::user::UserStore;
use tower::ServiceExt;

pub const ADMIN_SECRET: &str = "admin_secret";

/// Opens a fresh in-memory database and applies every migration.
///
/// The pool is pinned to one connection so the whole test sees the same
/// in-memory database.
pub async fn setup_db() -> anyhow::Result<DatabaseConnection> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub fn test_config() -> Config {
    Config {
        database_url: Some("sqlite::memory:".to_string()),
        db_auth: String::new(),
        db_host: String::new(),
        db_name: String::new(),
        port: 8888,
        www_host: "http://localhost:8889".to_string(),
        admin_secret: ADMIN_SECRET.to_string(),
        jwt_secret: "some_secret".to_string(),
    }
}

pub struct TestContext {
    pub app: Router,
    pub db: Arc<DatabaseConnection>,
}

/// Builds the full application over a fresh database with the admin
/// account in place.
pub async fn setup_app() -> anyhow::Result<TestContext> {
    let db = setup_db().await?;
    UserStore::open(&db)
        .await?
        .admin_exists_or_create(ADMIN_SECRET)
        .await?;
    let db = Arc::new(db);
    let app = taskkeeper_server::web::create_app(db.clone(), &test_config())?;
    Ok(TestContext { app, db })
}

/// Sends one request and returns the status and the body, parsed as JSON
/// when possible and as a JSON string otherwise.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    session: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(session) = session {
        request = request.header("authorization", format!("Bearer {session}"));
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

/// Logs in and returns the session token.
pub async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login as {username}: {body}");
    body["session"].as_str().unwrap().to_string()
}

/// Registers a user, optionally with a role, and returns its id.
pub async fn create_user(
    app: &Router,
    session: Option<&str>,
    username: &str,
    role: Option<i32>,
) -> String {
    let mut document = json!({
        "username": username,
        "email": format!("{username}@bar.com"),
        "password": format!("{username}_password"),
    });
    if let Some(role) = role {
        document["role"] = json!(role);
    }
    let (status, body) = send(app, "POST", "/api/v1/users", session, Some(document)).await;
    assert_eq!(status, StatusCode::CREATED, "create {username}: {body}");
    body["id"].as_str().unwrap().to_string()
}

/// Registers a user with the given role and returns its id and session.
pub async fn user_with_session(app: &Router, username: &str, role: i32) -> (String, String) {
    let admin = login(app, "boss", ADMIN_SECRET).await;
    let id = create_user(app, Some(&admin), username, Some(role)).await;
    let session = login(app, username, &format!("{username}_password")).await;
    (id, session)
}
