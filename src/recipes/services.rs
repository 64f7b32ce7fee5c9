use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::dto::{IngredientAmount, RecipeListQuery, RecipePayload, RecipeSummary, RecipeView};
use super::repo_types::{NewLine, Recipe, RecipeDraft, RecipeFilter, RecipeRow};
use crate::auth::permissions::{ensure_can_edit, Actor};
use crate::catalog::services::{resolve_ingredients, resolve_tags};
use crate::error::{AppError, Entity, ValidationKind};
use crate::images::decode::{decode_data_uri, DecodedImage};
use crate::images::services::{discard_image, presign_image, upload_recipe_image};
use crate::memberships::repo::MembershipKind;
use crate::state::AppState;

/// Matches the `recipes.name` column width, counted in characters.
pub const MAX_NAME_LEN: usize = 200;

fn check_name(name: &str) -> Result<&str, ValidationKind> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationKind::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationKind::NameTooLong);
    }
    Ok(name)
}

/// Whole numbers arrive as JSON integers, integral floats (`30.0`) or numeric
/// strings (`"30"`). Anything else yields `None`.
fn whole_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 1e15)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn check_text(text: &str) -> Result<&str, ValidationKind> {
    if text.trim().is_empty() {
        return Err(ValidationKind::EmptyText);
    }
    Ok(text)
}

fn check_cooking_time(cooking_time: Option<&Value>) -> Result<i32, ValidationKind> {
    cooking_time
        .and_then(whole_number)
        .filter(|t| *t >= 1)
        .and_then(|t| i32::try_from(t).ok())
        .ok_or(ValidationKind::InvalidCookingTime)
}

/// Amounts are checked on every line before duplicates are looked for.
fn check_lines(ingredients: &[IngredientAmount]) -> Result<Vec<NewLine>, ValidationKind> {
    if ingredients.is_empty() {
        return Err(ValidationKind::EmptyIngredients);
    }

    let lines = ingredients
        .iter()
        .map(|item| {
            whole_number(&item.amount)
                .and_then(|amount| i32::try_from(amount).ok())
                .filter(|amount| *amount >= 1)
                .map(|amount| NewLine {
                    ingredient_id: item.id,
                    amount,
                })
                .ok_or(ValidationKind::InvalidAmount)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = HashSet::with_capacity(lines.len());
    if !lines.iter().all(|line| seen.insert(line.ingredient_id)) {
        return Err(ValidationKind::DuplicateIngredient);
    }
    Ok(lines)
}

fn check_tags(tags: &[i64]) -> Result<Vec<i64>, ValidationKind> {
    if tags.is_empty() {
        return Err(ValidationKind::EmptyTags);
    }
    let mut seen = HashSet::with_capacity(tags.len());
    if !tags.iter().all(|id| seen.insert(*id)) {
        return Err(ValidationKind::DuplicateTag);
    }
    Ok(tags.to_vec())
}

/// Runs every check against the whole payload, first failure wins. Nothing is
/// written here. `unique_for` enables the per-author name check used on create.
pub async fn validate_payload(
    st: &AppState,
    payload: &RecipePayload,
    unique_for: Option<Uuid>,
) -> Result<(RecipeDraft, DecodedImage), AppError> {
    let name = check_name(&payload.name)?;
    if let Some(author_id) = unique_for {
        if st.store.recipe_name_taken(author_id, name).await? {
            return Err(ValidationKind::DuplicateName.into());
        }
    }
    let text = check_text(&payload.text)?;
    let cooking_time = check_cooking_time(payload.cooking_time.as_ref())?;
    let lines = check_lines(&payload.ingredients)?;
    let tag_ids = check_tags(&payload.tags)?;

    let ingredient_ids: Vec<i64> = lines.iter().map(|l| l.ingredient_id).collect();
    resolve_ingredients(st, &ingredient_ids).await?;
    resolve_tags(st, &tag_ids).await?;

    let image = decode_data_uri(payload.image.as_deref())?;

    let draft = RecipeDraft {
        name: name.to_string(),
        text: text.to_string(),
        cooking_time,
        lines,
        tag_ids,
    };
    Ok((draft, image))
}

#[instrument(skip(st, payload), fields(author_id = %author.id))]
pub async fn compose(st: &AppState, author: &Actor, payload: &RecipePayload) -> Result<Recipe, AppError> {
    let (draft, image) = validate_payload(st, payload, Some(author.id))
        .await
        .inspect_err(|e| warn!(error = %e, "recipe rejected"))?;

    let recipe_id = Uuid::new_v4();
    let image_key = upload_recipe_image(st, recipe_id, image).await?;
    let composition = draft.into_composition(image_key);

    match st.store.insert_recipe(recipe_id, author.id, &composition).await {
        Ok(recipe) => {
            info!(%recipe_id, lines = recipe.lines.len(), tags = recipe.tags.len(), "recipe created");
            Ok(recipe)
        }
        Err(e) => {
            discard_image(st, &composition.image_key).await;
            Err(e)
        }
    }
}

#[instrument(skip(st, payload), fields(actor_id = %actor.id))]
pub async fn recompose(
    st: &AppState,
    recipe_id: Uuid,
    actor: &Actor,
    payload: &RecipePayload,
) -> Result<Recipe, AppError> {
    let current = existing_header(st, recipe_id).await?;
    ensure_can_edit(actor, current.author_id)?;

    let (draft, image) = validate_payload(st, payload, None)
        .await
        .inspect_err(|e| warn!(error = %e, "recipe update rejected"))?;

    let image_key = upload_recipe_image(st, recipe_id, image).await?;
    let composition = draft.into_composition(image_key);

    match st.store.replace_recipe(recipe_id, &composition).await {
        Ok(Some(recipe)) => {
            if current.image_key != recipe.header.image_key {
                discard_image(st, &current.image_key).await;
            }
            info!(%recipe_id, lines = recipe.lines.len(), tags = recipe.tags.len(), "recipe recomposed");
            Ok(recipe)
        }
        Ok(None) => {
            discard_image(st, &composition.image_key).await;
            Err(AppError::not_found(Entity::Recipe, recipe_id))
        }
        Err(e) => {
            discard_image(st, &composition.image_key).await;
            Err(e)
        }
    }
}

#[instrument(skip(st), fields(actor_id = %actor.id))]
pub async fn delete_recipe(st: &AppState, recipe_id: Uuid, actor: &Actor) -> Result<(), AppError> {
    let current = existing_header(st, recipe_id).await?;
    ensure_can_edit(actor, current.author_id)?;

    let deleted = st
        .store
        .delete_recipe(recipe_id)
        .await?
        .ok_or_else(|| AppError::not_found(Entity::Recipe, recipe_id))?;
    discard_image(st, &deleted.image_key).await;
    info!(%recipe_id, "recipe deleted");
    Ok(())
}

pub async fn existing_header(st: &AppState, recipe_id: Uuid) -> Result<RecipeRow, AppError> {
    st.store
        .recipe_header(recipe_id)
        .await?
        .ok_or_else(|| AppError::not_found(Entity::Recipe, recipe_id))
}

/// Builds the read projection. Membership flags are explicit existence checks
/// for the viewer; anonymous viewers get `false` for both.
pub async fn recipe_view(
    st: &AppState,
    recipe: Recipe,
    viewer: Option<&Actor>,
) -> Result<RecipeView, AppError> {
    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(viewer) => (
            st.store
                .has_membership(MembershipKind::Favorite, viewer.id, recipe.header.id)
                .await?,
            st.store
                .has_membership(MembershipKind::Cart, viewer.id, recipe.header.id)
                .await?,
        ),
        None => (false, false),
    };
    let image = presign_image(st, &recipe.header.image_key).await?;

    let Recipe { header, lines, tags } = recipe;
    Ok(RecipeView {
        id: header.id,
        author: header.author_id,
        name: header.name,
        text: header.text,
        cooking_time: header.cooking_time,
        image,
        tags,
        ingredients: lines,
        is_favorited,
        is_in_shopping_cart,
        created_at: header.created_at,
    })
}

pub async fn get_recipe_view(
    st: &AppState,
    recipe_id: Uuid,
    viewer: Option<&Actor>,
) -> Result<RecipeView, AppError> {
    let recipe = st
        .store
        .get_recipe(recipe_id)
        .await?
        .ok_or_else(|| AppError::not_found(Entity::Recipe, recipe_id))?;
    recipe_view(st, recipe, viewer).await
}

/// Builds the store filter. Membership flags are honoured only for an
/// authenticated viewer and are ignored for anonymous ones.
pub fn list_filter(query: &RecipeListQuery, viewer: Option<&Actor>) -> RecipeFilter {
    let viewer_when = |flag: Option<u8>| flag.filter(|f| *f != 0).and(viewer).map(|v| v.id);
    RecipeFilter {
        author_id: query.author,
        tag_slugs: query.tags.clone(),
        favorited_by: viewer_when(query.is_favorited),
        in_cart_of: viewer_when(query.is_in_shopping_cart),
    }
}

#[instrument(skip(st, viewer))]
pub async fn list_recipe_views(
    st: &AppState,
    query: &RecipeListQuery,
    viewer: Option<&Actor>,
) -> Result<Vec<RecipeView>, AppError> {
    let recipes = st.store.list_recipes(&list_filter(query, viewer)).await?;
    debug!(count = recipes.len(), "recipes listed");

    let mut views = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        views.push(recipe_view(st, recipe, viewer).await?);
    }
    Ok(views)
}

pub async fn recipe_summary(st: &AppState, header: &RecipeRow) -> Result<RecipeSummary, AppError> {
    Ok(RecipeSummary {
        id: header.id,
        name: header.name.clone(),
        image: presign_image(st, &header.image_key).await?,
        cooking_time: header.cooking_time,
    })
}
