use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::catalog::repo::Tag;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct RecipeRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image_key: String,
    pub created_at: OffsetDateTime,
}

/// An ingredient line resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct RecipeLine {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// A recipe header with its full composition. Lines are ordered by
/// ingredient name then id, tags by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub header: RecipeRow,
    pub lines: Vec<RecipeLine>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewLine {
    pub ingredient_id: i64,
    pub amount: i32,
}

/// Validated recipe input, before its image has been stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub lines: Vec<NewLine>,
    pub tag_ids: Vec<i64>,
}

impl RecipeDraft {
    pub fn into_composition(self, image_key: String) -> Composition {
        Composition {
            name: self.name,
            text: self.text,
            cooking_time: self.cooking_time,
            lines: self.lines,
            tag_ids: self.tag_ids,
            image_key,
        }
    }
}

/// Everything the store writes for one recipe in a single transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub lines: Vec<NewLine>,
    pub tag_ids: Vec<i64>,
    pub image_key: String,
}

/// Narrowing applied by the recipe listing. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author_id: Option<Uuid>,
    pub tag_slugs: Vec<String>,
    pub favorited_by: Option<Uuid>,
    pub in_cart_of: Option<Uuid>,
}
