//! Upload front-end: an index page plus two JSON endpoints backed by
//! [`ApiClient`].

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::client::ApiClient;

mod handlers;
mod views;

pub use handlers::{CreateUrlForm, CreateUrlResponse, ErrorResponse, UploadFileItem, UploadFileList};

/// Shared by every handler.
pub struct AppState {
    /// `None` while the `kollus` settings are incomplete.
    pub client: Option<ApiClient>,
    /// `false` when the `kollus` settings section is missing or empty.
    pub exists_config: bool,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/upload/create_url", post(handlers::create_upload_url))
        .route("/api/upload_file", get(handlers::list_upload_files))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
