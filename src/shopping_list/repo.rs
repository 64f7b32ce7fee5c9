use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

/// One recipe line from one cart recipe, already joined to its ingredient.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CartLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[async_trait]
pub trait ShoppingListRepo: Send + Sync {
    /// Every line of every recipe in the user's cart, read in one statement.
    async fn cart_lines(&self, user_id: Uuid) -> Result<Vec<CartLine>, AppError>;
}
