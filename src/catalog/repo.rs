use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// Read-only reference data. Lookups by id return only the rows that exist;
/// callers decide which missing id to report.
#[async_trait]
pub trait CatalogRepo: Send + Sync {
    async fn list_ingredients(&self) -> Result<Vec<Ingredient>, AppError>;
    async fn ingredients_by_ids(&self, ids: &[i64]) -> Result<Vec<Ingredient>, AppError>;
    async fn list_tags(&self) -> Result<Vec<Tag>, AppError>;
    async fn tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, AppError>;
    async fn tags_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>, AppError>;
}
