use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{Composition, Recipe, RecipeFilter, RecipeRow};
use crate::error::AppError;

/// Recipe persistence. Implementations must apply `insert_recipe` and
/// `replace_recipe` atomically: readers see the old composition or the new
/// one, never a cleared recipe.
#[async_trait]
pub trait RecipeRepo: Send + Sync {
    async fn recipe_name_taken(&self, author_id: Uuid, name: &str) -> Result<bool, AppError>;

    async fn recipe_header(&self, id: Uuid) -> Result<Option<RecipeRow>, AppError>;

    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>, AppError>;

    /// Newest first. Tag slugs match if the recipe carries any of them.
    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, AppError>;

    async fn insert_recipe(
        &self,
        id: Uuid,
        author_id: Uuid,
        composition: &Composition,
    ) -> Result<Recipe, AppError>;

    /// Overwrites the header and clears then re-inserts lines and tag links.
    /// Returns `None` if the recipe no longer exists.
    async fn replace_recipe(
        &self,
        id: Uuid,
        composition: &Composition,
    ) -> Result<Option<Recipe>, AppError>;

    /// Deletes the recipe together with its lines, tag links and memberships.
    async fn delete_recipe(&self, id: Uuid) -> Result<Option<RecipeRow>, AppError>;
}
