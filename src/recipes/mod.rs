pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, Router};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes().layer(DefaultBodyLimit::max(20 * 1024 * 1024)))
}
