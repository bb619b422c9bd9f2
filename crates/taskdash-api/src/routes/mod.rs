use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;

use taskdash_export::Exporter;

use crate::{handlers, state::ApiState};

pub fn create_router(state: ApiState) -> Router {
    let s3_routes = export_router(state.s3_exporter.clone());
    let drive_routes = export_router(state.drive_exporter.clone());

    Router::new()
        // Health check
        .route("/health", get(handlers::health::health_check))

        // Task endpoints
        .route("/api/tasks", get(handlers::task::list_tasks))
        .route("/api/tasks", post(handlers::task::create_task))
        .route("/api/tasks/bulk", post(handlers::task::bulk_create_tasks))
        .route("/api/tasks/:task_id", get(handlers::task::get_task))
        .route("/api/tasks/:task_id", put(handlers::task::update_task))
        .route("/api/tasks/:task_id", axum::routing::delete(handlers::task::delete_task))

        // Auth endpoints
        .route("/api/auth/login", post(handlers::users::login))
        .route("/api/auth/users", get(handlers::users::list_users))
        .route("/api/auth/users", post(handlers::users::create_user))
        .route("/api/auth/users/:user_id", put(handlers::users::update_user))
        .route("/api/auth/users/:user_id", axum::routing::delete(handlers::users::delete_user))

        // Add state
        .with_state(state)

        // Export control, one sub-router per destination
        .nest("/api/export/s3", s3_routes)
        .nest("/api/export/drive", drive_routes)

        // Add CORS
        .layer(CorsLayer::permissive())
}

/// Control routes for one exporter; the same handlers serve both
/// destinations.
fn export_router(exporter: Exporter) -> Router {
    Router::new()
        .route("/status", get(handlers::export::get_status))
        .route("/manual", post(handlers::export::manual_export))
        .route("/start", post(handlers::export::start_auto_export))
        .route("/stop", post(handlers::export::stop_auto_export))
        .route("/config", post(handlers::export::update_config))
        .route("/test", post(handlers::export::test_connection))
        .route("/list", get(handlers::export::list_exports))
        .route("/formats/:format", get(handlers::export::export_format))
        .with_state(exporter)
}
