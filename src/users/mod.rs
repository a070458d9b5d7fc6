use crate::state::AppState;
use axum::Router;

mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod repo;
mod repo_types;
pub mod validation;

pub use repo::UserStore;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::user_routes())
}
