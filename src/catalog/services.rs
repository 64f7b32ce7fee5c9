use std::collections::HashSet;

use super::repo::{Ingredient, Tag};
use crate::error::{AppError, Entity};
use crate::state::AppState;

/// Resolves every requested ingredient id, failing on the first one (in
/// request order) that does not exist.
pub async fn resolve_ingredients(st: &AppState, ids: &[i64]) -> Result<Vec<Ingredient>, AppError> {
    let found = st.store.ingredients_by_ids(ids).await?;
    first_missing(ids, found.iter().map(|i| i.id), Entity::Ingredient)?;
    Ok(found)
}

pub async fn resolve_tags(st: &AppState, ids: &[i64]) -> Result<Vec<Tag>, AppError> {
    let found = st.store.tags_by_ids(ids).await?;
    first_missing(ids, found.iter().map(|t| t.id), Entity::Tag)?;
    Ok(found)
}

pub async fn get_ingredient(st: &AppState, id: i64) -> Result<Ingredient, AppError> {
    resolve_ingredients(st, &[id])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found(Entity::Ingredient, id))
}

/// Tags are addressed by slug on the read side.
pub async fn get_tag(st: &AppState, slug: &str) -> Result<Tag, AppError> {
    st.store
        .tag_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::not_found(Entity::Tag, slug))
}

fn first_missing(
    requested: &[i64],
    found: impl Iterator<Item = i64>,
    entity: Entity,
) -> Result<(), AppError> {
    let found: HashSet<i64> = found.collect();
    match requested.iter().find(|id| !found.contains(id)) {
        Some(id) => Err(AppError::not_found(entity, id)),
        None => Ok(()),
    }
}
