use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::repo::MembershipKind;
use super::services::{self, MembershipEntry};
use crate::auth::{Actor, AuthUser};
use crate::error::AppError;
use crate::state::AppState;

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/recipes/:id/shopping_cart",
            post(add_to_cart).delete(remove_from_cart),
        )
        .route(
            "/recipes/:id/favorite",
            post(add_to_favorites).delete(remove_from_favorites),
        )
}

async fn add(
    state: AppState,
    kind: MembershipKind,
    actor: Actor,
    recipe_id: Uuid,
) -> Result<(StatusCode, Json<MembershipEntry>), AppError> {
    let entry = services::add_membership(&state, kind, &actor, recipe_id).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[instrument(skip(state, actor))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<MembershipEntry>), AppError> {
    add(state, MembershipKind::Cart, actor, id).await
}

#[instrument(skip(state, actor))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::remove_membership(&state, MembershipKind::Cart, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, actor))]
pub async fn add_to_favorites(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<MembershipEntry>), AppError> {
    add(state, MembershipKind::Favorite, actor, id).await
}

#[instrument(skip(state, actor))]
pub async fn remove_from_favorites(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::remove_membership(&state, MembershipKind::Favorite, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
