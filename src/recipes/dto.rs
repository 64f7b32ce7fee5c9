use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::RecipeLine;
use crate::catalog::repo::Tag;

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmount {
    pub id: i64,
    /// Kept raw; the composer decides whether it is a usable whole number.
    #[serde(default)]
    pub amount: Value,
}

/// Request body for creating or updating a recipe. Every field is optional on
/// the wire so that omissions surface as validation errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub cooking_time: Option<Value>,
    #[serde(default)]
    pub ingredients: Vec<IngredientAmount>,
    #[serde(default)]
    pub tags: Vec<i64>,
    /// `data:image/<type>;base64,<payload>`
    #[serde(default)]
    pub image: Option<String>,
}

/// `GET /recipes` filters. `tags` may repeat and matches any of the slugs.
/// The membership flags only narrow the list for an authenticated viewer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeListQuery {
    pub author: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_favorited: Option<u8>,
    pub is_in_shopping_cart: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct RecipeView {
    pub id: Uuid,
    pub author: Uuid,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: String,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeLine>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Short form returned when a recipe is added to the cart or favorites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}
