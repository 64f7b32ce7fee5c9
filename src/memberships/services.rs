use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::repo::MembershipKind;
use crate::auth::Actor;
use crate::error::{AppError, ConflictKind, Entity};
use crate::recipes::dto::RecipeSummary;
use crate::recipes::services::{existing_header, recipe_summary};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct MembershipEntry {
    pub kind: MembershipKind,
    pub user_id: Uuid,
    pub recipe: RecipeSummary,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[instrument(skip(st), fields(user_id = %actor.id))]
pub async fn add_membership(
    st: &AppState,
    kind: MembershipKind,
    actor: &Actor,
    recipe_id: Uuid,
) -> Result<MembershipEntry, AppError> {
    let header = existing_header(st, recipe_id).await?;

    let created_at = st
        .store
        .insert_membership(kind, actor.id, recipe_id)
        .await?
        .ok_or(AppError::Conflict(ConflictKind::AlreadyMember(kind)))?;
    info!(%recipe_id, %kind, "recipe added");

    Ok(MembershipEntry {
        kind,
        user_id: actor.id,
        recipe: recipe_summary(st, &header).await?,
        created_at,
    })
}

#[instrument(skip(st), fields(user_id = %actor.id))]
pub async fn remove_membership(
    st: &AppState,
    kind: MembershipKind,
    actor: &Actor,
    recipe_id: Uuid,
) -> Result<(), AppError> {
    if !st.store.delete_membership(kind, actor.id, recipe_id).await? {
        return Err(AppError::NotFound {
            entity: Entity::Membership,
            id: Some(recipe_id.to_string()),
        });
    }
    info!(%recipe_id, %kind, "recipe removed");
    Ok(())
}
