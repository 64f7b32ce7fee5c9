use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::catalog::repo::{CatalogRepo, Ingredient, Tag};
use crate::error::AppError;
use crate::memberships::repo::{MembershipKind, MembershipRepo};
use crate::recipes::repo::RecipeRepo;
use crate::recipes::repo_types::{Composition, Recipe, RecipeFilter, RecipeLine, RecipeRow};
use crate::shopping_list::repo::{CartLine, ShoppingListRepo};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const RECIPE_COLUMNS: &str = "id, author_id, name, text, cooking_time, image_key, created_at";

async fn read_lines(conn: &mut PgConnection, recipe_id: Uuid) -> Result<Vec<RecipeLine>, AppError> {
    let lines = sqlx::query_as::<_, RecipeLine>(
        r#"
        SELECT i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY i.name, i.id
        "#,
    )
    .bind(recipe_id)
    .fetch_all(conn)
    .await?;
    Ok(lines)
}

async fn read_tags(conn: &mut PgConnection, recipe_id: Uuid) -> Result<Vec<Tag>, AppError> {
    let tags = sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.id
        "#,
    )
    .bind(recipe_id)
    .fetch_all(conn)
    .await?;
    Ok(tags)
}

async fn read_composition(conn: &mut PgConnection, header: RecipeRow) -> Result<Recipe, AppError> {
    let lines = read_lines(&mut *conn, header.id).await?;
    let tags = read_tags(&mut *conn, header.id).await?;
    Ok(Recipe { header, lines, tags })
}

/// Clear-then-set of the recipe's lines and tag links. Callers run this
/// inside the transaction that also writes the header.
async fn write_composition(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    composition: &Composition,
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    if !composition.lines.is_empty() {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
        qb.push_values(&composition.lines, |mut b, line| {
            b.push_bind(recipe_id)
                .push_bind(line.ingredient_id)
                .push_bind(line.amount);
        });
        qb.build().execute(&mut *conn).await?;
    }

    if !composition.tag_ids.is_empty() {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        qb.push_values(&composition.tag_ids, |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });
        qb.build().execute(&mut *conn).await?;
    }
    Ok(())
}

#[async_trait]
impl CatalogRepo for PgStore {
    async fn list_ingredients(&self) -> Result<Vec<Ingredient>, AppError> {
        let rows = sqlx::query_as::<_, Ingredient>(
            "SELECT id, name, measurement_unit FROM ingredients ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn ingredients_by_ids(&self, ids: &[i64]) -> Result<Vec<Ingredient>, AppError> {
        let rows = sqlx::query_as::<_, Ingredient>(
            "SELECT id, name, measurement_unit FROM ingredients WHERE id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, AppError> {
        let rows = sqlx::query_as::<_, Tag>("SELECT id, name, color, slug FROM tags ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, AppError> {
        let row = sqlx::query_as::<_, Tag>("SELECT id, name, color, slug FROM tags WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn tags_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>, AppError> {
        let rows = sqlx::query_as::<_, Tag>(
            "SELECT id, name, color, slug FROM tags WHERE id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl RecipeRepo for PgStore {
    async fn recipe_name_taken(&self, author_id: Uuid, name: &str) -> Result<bool, AppError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM recipes WHERE author_id = $1 AND name = $2)",
        )
        .bind(author_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn recipe_header(&self, id: Uuid) -> Result<Option<RecipeRow>, AppError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>, AppError> {
        // one snapshot for header, lines and tags
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;
        let header = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let recipe = match header {
            Some(header) => Some(read_composition(&mut *tx, header).await?),
            None => None,
        };
        tx.commit().await?;
        Ok(recipe)
    }

    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {RECIPE_COLUMNS} FROM recipes r WHERE TRUE"));
        if let Some(author_id) = filter.author_id {
            qb.push(" AND r.author_id = ").push_bind(author_id);
        }
        if !filter.tag_slugs.is_empty() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tag_slugs.clone())
            .push("))");
        }
        let memberships = [
            (MembershipKind::Favorite, filter.favorited_by),
            (MembershipKind::Cart, filter.in_cart_of),
        ];
        for (kind, user_id) in memberships {
            if let Some(user_id) = user_id {
                qb.push(format!(
                    " AND EXISTS (SELECT 1 FROM {} m WHERE m.recipe_id = r.id AND m.user_id = ",
                    kind.table()
                ))
                .push_bind(user_id)
                .push(")");
            }
        }
        qb.push(" ORDER BY r.created_at DESC, r.id");
        let headers: Vec<RecipeRow> = qb.build_query_as().fetch_all(&mut *tx).await?;

        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let line_rows: Vec<(Uuid, i64, String, String, i32)> = sqlx::query_as(
            r#"
            SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
            FROM recipe_ingredients ri
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ANY($1)
            ORDER BY i.name, i.id
            "#,
        )
        .bind(&ids[..])
        .fetch_all(&mut *tx)
        .await?;
        let tag_rows: Vec<(Uuid, i64, String, String, String)> = sqlx::query_as(
            r#"
            SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
            FROM recipe_tags rt
            JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = ANY($1)
            ORDER BY t.id
            "#,
        )
        .bind(&ids[..])
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let mut lines: HashMap<Uuid, Vec<RecipeLine>> = HashMap::new();
        for (recipe_id, id, name, measurement_unit, amount) in line_rows {
            lines.entry(recipe_id).or_default().push(RecipeLine {
                id,
                name,
                measurement_unit,
                amount,
            });
        }
        let mut tags: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for (recipe_id, id, name, color, slug) in tag_rows {
            tags.entry(recipe_id).or_default().push(Tag {
                id,
                name,
                color,
                slug,
            });
        }

        Ok(headers
            .into_iter()
            .map(|header| Recipe {
                lines: lines.remove(&header.id).unwrap_or_default(),
                tags: tags.remove(&header.id).unwrap_or_default(),
                header,
            })
            .collect())
    }

    async fn insert_recipe(
        &self,
        id: Uuid,
        author_id: Uuid,
        composition: &Composition,
    ) -> Result<Recipe, AppError> {
        let mut tx = self.pool.begin().await?;
        let header = sqlx::query_as::<_, RecipeRow>(&format!(
            r#"
            INSERT INTO recipes (id, author_id, name, text, cooking_time, image_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(author_id)
        .bind(&composition.name)
        .bind(&composition.text)
        .bind(composition.cooking_time)
        .bind(&composition.image_key)
        .fetch_one(&mut *tx)
        .await?;

        write_composition(&mut *tx, id, composition).await?;
        let recipe = read_composition(&mut *tx, header).await?;
        tx.commit().await?;
        Ok(recipe)
    }

    async fn replace_recipe(
        &self,
        id: Uuid,
        composition: &Composition,
    ) -> Result<Option<Recipe>, AppError> {
        let mut tx = self.pool.begin().await?;
        // the UPDATE holds the row lock until commit, serialising concurrent recomposes
        let header = sqlx::query_as::<_, RecipeRow>(&format!(
            r#"
            UPDATE recipes
            SET name = $2, text = $3, cooking_time = $4, image_key = $5
            WHERE id = $1
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&composition.name)
        .bind(&composition.text)
        .bind(composition.cooking_time)
        .bind(&composition.image_key)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(header) = header else {
            return Ok(None);
        };
        write_composition(&mut *tx, id, composition).await?;
        let recipe = read_composition(&mut *tx, header).await?;
        tx.commit().await?;
        Ok(Some(recipe))
    }

    async fn delete_recipe(&self, id: Uuid) -> Result<Option<RecipeRow>, AppError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "DELETE FROM recipes WHERE id = $1 RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl MembershipRepo for PgStore {
    async fn insert_membership(
        &self,
        kind: MembershipKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<Option<OffsetDateTime>, AppError> {
        let created_at: Option<OffsetDateTime> = sqlx::query_scalar(&format!(
            r#"
            INSERT INTO {} (user_id, recipe_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, recipe_id) DO NOTHING
            RETURNING created_at
            "#,
            kind.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(created_at)
    }

    async fn delete_membership(
        &self,
        kind: MembershipKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
            kind.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn has_membership(
        &self,
        kind: MembershipKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = $1 AND recipe_id = $2)",
            kind.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl ShoppingListRepo for PgStore {
    async fn cart_lines(&self, user_id: Uuid) -> Result<Vec<CartLine>, AppError> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT i.name, i.measurement_unit, ri.amount
            FROM cart_entries c
            JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE c.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }
}
