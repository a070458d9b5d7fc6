use std::path::Path;

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::state::AppState;

/// Registration form at `/`, user list at `/users`, other assets as-is.
pub fn page_routes(static_dir: &Path) -> Router<AppState> {
    Router::new()
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route_service("/users", ServeFile::new(static_dir.join("users.html")))
        .fallback_service(ServeDir::new(static_dir))
}
