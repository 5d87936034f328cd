pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};

use crate::state::AppState;
use crate::themes::{catalog, ThemeEntry};
use crate::workflow::handlers;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// GET /api/v1/themes
async fn list_themes() -> Json<Vec<ThemeEntry>> {
    Json(catalog())
}

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/themes", get(list_themes))
        // Workflow API
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_end_session),
        )
        .route(
            "/api/v1/sessions/:id/upload",
            post(handlers::handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/sessions/:id/preview", get(handlers::handle_preview))
        .route(
            "/api/v1/sessions/:id/preview.txt",
            get(handlers::handle_preview_text),
        )
        .route(
            "/api/v1/sessions/:id/theme",
            post(handlers::handle_select_theme),
        )
        .route("/api/v1/sessions/:id/back", post(handlers::handle_back))
        .with_state(state)
}
