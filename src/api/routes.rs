//! HTTP router and server bootstrap.

use std::sync::Arc;

use axum::middleware;
use axum::{
    extract::DefaultBodyLimit,
    response::Json,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::store::{SqliteStore, TaskStore, UserDirectory};
use crate::task::TaskService;

use super::auth;
use super::reports;
use super::tasks;
use super::uploads;
use super::users as users_api;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Task lifecycle coordinator.
    pub service: TaskService,
    /// User directory, shared with the coordinator.
    pub users: Arc<dyn UserDirectory>,
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let sqlite = Arc::new(SqliteStore::open(&config.database_path)?);
    tracing::info!(path = %config.database_path.display(), "opened store");

    let store: Arc<dyn TaskStore> = sqlite.clone();
    let users: Arc<dyn UserDirectory> = sqlite;
    let service = TaskService::new(store, Arc::clone(&users), config.store_timeout);

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let state = Arc::new(AppState {
        config: config.clone(),
        service,
        users,
    });

    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login));

    // Upload route with an increased body limit (10MB).
    let upload_route = Router::new()
        .route("/api/auth/upload-image", post(uploads::upload_image))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024));

    let protected_routes = Router::new()
        .route(
            "/api/auth/profile",
            get(auth::profile).put(auth::update_profile),
        )
        // User management endpoints
        .route("/api/users", get(users_api::list_users))
        .route("/api/users/:id", get(users_api::get_user))
        // Task endpoints
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/api/tasks/dashboard-data", get(tasks::dashboard_data))
        .route(
            "/api/tasks/user-dashboard-data",
            get(tasks::user_dashboard_data),
        )
        .route(
            "/api/tasks/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/api/tasks/:id/status", put(tasks::update_task_status))
        .route("/api/tasks/:id/todo", put(tasks::update_task_checklist))
        // Report export endpoints
        .route("/api/reports/export/tasks", get(reports::export_tasks))
        .route("/api/reports/export/users", get(reports::export_users))
        .merge(upload_route)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_auth,
        ));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::clone(&state));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
