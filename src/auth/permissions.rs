use uuid::Uuid;

use super::claims::UserRole;
use crate::error::AppError;

/// The authenticated user on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn is_staff(&self) -> bool {
        matches!(self.role, UserRole::Moderator | UserRole::Admin)
    }
}

/// Recipes may be changed by their author, moderators and admins.
pub fn ensure_can_edit(actor: &Actor, author_id: Uuid) -> Result<(), AppError> {
    if actor.id == author_id || actor.is_staff() {
        Ok(())
    } else {
        Err(AppError::Permission)
    }
}
