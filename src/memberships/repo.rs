use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;

/// Which per-user recipe set a membership lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipKind {
    Cart,
    Favorite,
}

impl MembershipKind {
    pub fn table(&self) -> &'static str {
        match self {
            MembershipKind::Cart => "cart_entries",
            MembershipKind::Favorite => "favorite_entries",
        }
    }
}

impl fmt::Display for MembershipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MembershipKind::Cart => f.write_str("shopping cart"),
            MembershipKind::Favorite => f.write_str("favorites"),
        }
    }
}

#[async_trait]
pub trait MembershipRepo: Send + Sync {
    /// Inserts the pair; `None` means it already existed.
    async fn insert_membership(
        &self,
        kind: MembershipKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<Option<OffsetDateTime>, AppError>;

    /// Deletes the pair; `false` means there was nothing to delete.
    async fn delete_membership(
        &self,
        kind: MembershipKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, AppError>;

    async fn has_membership(
        &self,
        kind: MembershipKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, AppError>;
}
