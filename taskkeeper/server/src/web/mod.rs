use axum::Router;
use axum::http::HeaderValue;
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::AuthState;
use crate::config::Config;
use crate::task::TaskState;
use crate::user::{UserState, UserStore};

pub mod api;
pub mod error;

/// Builds the whole HTTP application on top of an already migrated database.
pub fn create_app(db: Arc<DatabaseConnection>, config: &Config) -> anyhow::Result<Router> {
    let auth_state = Arc::new(AuthState {
        jwt_secret: config.jwt_secret.clone(),
        db: db.clone(),
    });
    let user_state = Arc::new(UserState { db: db.clone() });
    let task_state = Arc::new(TaskState { db });

    let origin = HeaderValue::from_str(&config.www_host)?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    let app = api::create_api_router(auth_state, user_state, task_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );
    Ok(app)
}

/// Connects to the database, applies migrations and makes sure the admin
/// account exists.
#[tracing::instrument(skip(config))]
pub async fn connect_and_bootstrap(config: &Config) -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.database_url());
    options.sqlx_logging(false);
    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let created = UserStore::open(&db)
        .await?
        .admin_exists_or_create(&config.admin_secret)
        .await?;
    if created {
        tracing::info!("Admin account created");
    }
    Ok(db)
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let db = connect_and_bootstrap(&config).await?;
    let app = create_app(Arc::new(db), &config)?;

    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tracing::instrument]
pub async fn ping_handler() -> &'static str {
    "pong"
}
