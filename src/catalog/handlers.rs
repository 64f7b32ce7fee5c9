use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{
    repo::{Ingredient, Tag},
    services,
};
use crate::{error::AppError, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", get(list_ingredients))
        .route("/ingredients/:id", get(get_ingredient))
        .route("/tags", get(list_tags))
        .route("/tags/:slug", get(get_tag))
}

#[instrument(skip(state))]
pub async fn list_ingredients(State(state): State<AppState>) -> Result<Json<Vec<Ingredient>>, AppError> {
    Ok(Json(state.store.list_ingredients().await?))
}

#[instrument(skip(state))]
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Ingredient>, AppError> {
    Ok(Json(services::get_ingredient(&state, id).await?))
}

#[instrument(skip(state))]
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, AppError> {
    Ok(Json(state.store.list_tags().await?))
}

#[instrument(skip(state))]
pub async fn get_tag(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Tag>, AppError> {
    Ok(Json(services::get_tag(&state, &slug).await?))
}
