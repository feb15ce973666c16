pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::jobs::handlers;
use crate::state::AppState;
use crate::ui;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        // Page
        .route("/", get(ui::handle_page))
        .route("/jobs", post(ui::handle_add_job).layer(upload_limit.clone()))
        .route("/admin/delete", post(ui::handle_admin_delete))
        // Jobs API
        .route(
            "/api/v1/jobs",
            get(handlers::handle_list_jobs)
                .post(handlers::handle_create_job)
                .layer(upload_limit),
        )
        .route(
            "/api/v1/jobs/:stored_filename",
            delete(handlers::handle_delete_job),
        )
        .route(
            "/api/v1/jobs/:stored_filename/download",
            get(handlers::handle_download),
        )
        .route("/api/v1/admin/options", get(handlers::handle_admin_options))
        .with_state(state)
}
