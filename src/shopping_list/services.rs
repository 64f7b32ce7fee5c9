use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::repo::CartLine;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

/// Groups lines by `(name, unit)` and sums their amounts. Distinct catalog
/// entries sharing both merge. Output is ordered by name, then unit.
pub fn aggregate(lines: impl IntoIterator<Item = CartLine>) -> impl Iterator<Item = ShoppingItem> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for line in lines {
        *totals.entry((line.name, line.measurement_unit)).or_default() += i64::from(line.amount);
    }
    totals
        .into_iter()
        .map(|((name, measurement_unit), total_amount)| ShoppingItem {
            name,
            measurement_unit,
            total_amount,
        })
}

pub fn render<'a>(items: impl IntoIterator<Item = &'a ShoppingItem>) -> String {
    items.into_iter().fold(String::new(), |mut out, item| {
        let _ = writeln!(
            out,
            "{} ({}) - {}",
            item.name, item.measurement_unit, item.total_amount
        );
        out
    })
}

#[instrument(skip(st))]
pub async fn shopping_list(st: &AppState, user_id: Uuid) -> Result<Vec<ShoppingItem>, AppError> {
    let lines = st.store.cart_lines(user_id).await?;
    let line_count = lines.len();
    let items: Vec<ShoppingItem> = aggregate(lines).collect();
    debug!(line_count, items = items.len(), "shopping list aggregated");
    Ok(items)
}
