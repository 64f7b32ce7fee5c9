use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use axum_extra::extract::{Query, WithRejection};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{RecipeListQuery, RecipePayload, RecipeView};
use super::services;
use crate::auth::{AuthUser, MaybeAuthUser};
use crate::error::AppError;
use crate::state::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes))
        .route("/recipes/:id", get(get_recipe))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", post(create_recipe))
        .route(
            "/recipes/:id",
            patch(update_recipe).delete(delete_recipe),
        )
}

/// GET /recipes?author=&tags=&tags=&is_favorited=1&is_in_shopping_cart=1
#[instrument(skip(state, viewer))]
pub async fn list_recipes(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    WithRejection(Query(query), _): WithRejection<Query<RecipeListQuery>, AppError>,
) -> Result<Json<Vec<RecipeView>>, AppError> {
    let views = services::list_recipe_views(&state, &query, viewer.as_ref()).await?;
    Ok(Json(views))
}

#[instrument(skip(state, viewer))]
pub async fn get_recipe(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeView>, AppError> {
    let view = services::get_recipe_view(&state, id, viewer.as_ref()).await?;
    Ok(Json(view))
}

/// POST /recipes
#[instrument(skip(state, actor, body))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    WithRejection(Json(body), _): WithRejection<Json<RecipePayload>, AppError>,
) -> Result<(StatusCode, HeaderMap, Json<RecipeView>), AppError> {
    let recipe = services::compose(&state, &actor, &body).await?;

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/api/recipes/{}", recipe.header.id))
        .map_err(anyhow::Error::from)?;
    headers.insert(header::LOCATION, location);

    let view = services::recipe_view(&state, recipe, Some(&actor)).await?;
    Ok((StatusCode::CREATED, headers, Json(view)))
}

/// PATCH /recipes/:id replaces the whole composition.
#[instrument(skip(state, actor, body))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    WithRejection(Json(body), _): WithRejection<Json<RecipePayload>, AppError>,
) -> Result<Json<RecipeView>, AppError> {
    let recipe = services::recompose(&state, id, &actor, &body).await?;
    Ok(Json(services::recipe_view(&state, recipe, Some(&actor)).await?))
}

#[instrument(skip(state, actor))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_recipe(&state, id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
