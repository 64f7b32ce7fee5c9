use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::catalog::repo::{CatalogRepo, Ingredient, Tag};
use crate::error::{AppError, Entity, ValidationKind};
use crate::memberships::repo::{MembershipKind, MembershipRepo};
use crate::recipes::repo::RecipeRepo;
use crate::recipes::repo_types::{Composition, NewLine, Recipe, RecipeFilter, RecipeLine, RecipeRow};
use crate::shopping_list::repo::{CartLine, ShoppingListRepo};

struct StoredRecipe {
    header: RecipeRow,
    lines: Vec<NewLine>,
    tag_ids: Vec<i64>,
}

#[derive(Default)]
struct Inner {
    ingredients: BTreeMap<i64, Ingredient>,
    tags: BTreeMap<i64, Tag>,
    recipes: HashMap<Uuid, StoredRecipe>,
    memberships: BTreeMap<(MembershipKind, Uuid, Uuid), OffsetDateTime>,
    fail_writes: bool,
}

impl Inner {
    fn resolve(&self, stored: &StoredRecipe) -> Recipe {
        let mut lines: Vec<RecipeLine> = stored
            .lines
            .iter()
            .filter_map(|line| {
                self.ingredients.get(&line.ingredient_id).map(|i| RecipeLine {
                    id: i.id,
                    name: i.name.clone(),
                    measurement_unit: i.measurement_unit.clone(),
                    amount: line.amount,
                })
            })
            .collect();
        lines.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let mut tags: Vec<Tag> = stored
            .tag_ids
            .iter()
            .filter_map(|id| self.tags.get(id).cloned())
            .collect();
        tags.sort_by_key(|t| t.id);

        Recipe {
            header: stored.header.clone(),
            lines,
            tags,
        }
    }

    fn check_writable(&self) -> Result<(), AppError> {
        if self.fail_writes {
            return Err(AppError::Internal(anyhow::anyhow!("store unavailable")));
        }
        Ok(())
    }

    fn check_references(&self, composition: &Composition) -> Result<(), AppError> {
        if let Some(line) = composition
            .lines
            .iter()
            .find(|l| !self.ingredients.contains_key(&l.ingredient_id))
        {
            return Err(AppError::not_found(
                Entity::Ingredient,
                line.ingredient_id,
            ));
        }
        if let Some(id) = composition.tag_ids.iter().find(|id| !self.tags.contains_key(id)) {
            return Err(AppError::not_found(Entity::Tag, id));
        }
        Ok(())
    }
}

/// In-process [`crate::db::Store`] used by tests. One mutex guards all
/// state, so every call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_ingredient(&self, name: &str, measurement_unit: &str) -> Ingredient {
        let mut inner = self.lock();
        let id = inner.ingredients.keys().next_back().map_or(1, |id| id + 1);
        let ingredient = Ingredient {
            id,
            name: name.to_string(),
            measurement_unit: measurement_unit.to_string(),
        };
        inner.ingredients.insert(id, ingredient.clone());
        ingredient
    }

    pub fn add_tag(&self, name: &str, color: &str, slug: &str) -> Tag {
        let mut inner = self.lock();
        let id = inner.tags.keys().next_back().map_or(1, |id| id + 1);
        let tag = Tag {
            id,
            name: name.to_string(),
            color: color.to_string(),
            slug: slug.to_string(),
        };
        inner.tags.insert(id, tag.clone());
        tag
    }

    /// Makes every subsequent write fail with an internal error.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    pub fn recipe_count(&self) -> usize {
        self.lock().recipes.len()
    }

    pub fn membership_count(&self, kind: MembershipKind) -> usize {
        self.lock()
            .memberships
            .keys()
            .filter(|(k, _, _)| *k == kind)
            .count()
    }
}

#[async_trait]
impl CatalogRepo for MemoryStore {
    async fn list_ingredients(&self) -> Result<Vec<Ingredient>, AppError> {
        let mut all: Vec<Ingredient> = self.lock().ingredients.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn ingredients_by_ids(&self, ids: &[i64]) -> Result<Vec<Ingredient>, AppError> {
        let inner = self.lock();
        Ok(inner
            .ingredients
            .values()
            .filter(|i| ids.contains(&i.id))
            .cloned()
            .collect())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, AppError> {
        Ok(self.lock().tags.values().cloned().collect())
    }

    async fn tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, AppError> {
        Ok(self.lock().tags.values().find(|t| t.slug == slug).cloned())
    }

    async fn tags_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>, AppError> {
        let inner = self.lock();
        Ok(inner
            .tags
            .values()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RecipeRepo for MemoryStore {
    async fn recipe_name_taken(&self, author_id: Uuid, name: &str) -> Result<bool, AppError> {
        Ok(self
            .lock()
            .recipes
            .values()
            .any(|r| r.header.author_id == author_id && r.header.name == name))
    }

    async fn recipe_header(&self, id: Uuid) -> Result<Option<RecipeRow>, AppError> {
        Ok(self.lock().recipes.get(&id).map(|r| r.header.clone()))
    }

    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>, AppError> {
        let inner = self.lock();
        Ok(inner.recipes.get(&id).map(|r| inner.resolve(r)))
    }

    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, AppError> {
        let inner = self.lock();
        let member = |kind: MembershipKind, user: Option<Uuid>, recipe_id: Uuid| {
            user.map_or(true, |user| inner.memberships.contains_key(&(kind, user, recipe_id)))
        };
        let mut recipes: Vec<Recipe> = inner
            .recipes
            .values()
            .filter(|r| filter.author_id.map_or(true, |a| r.header.author_id == a))
            .filter(|r| {
                filter.tag_slugs.is_empty()
                    || r.tag_ids
                        .iter()
                        .filter_map(|id| inner.tags.get(id))
                        .any(|t| filter.tag_slugs.contains(&t.slug))
            })
            .filter(|r| member(MembershipKind::Favorite, filter.favorited_by, r.header.id))
            .filter(|r| member(MembershipKind::Cart, filter.in_cart_of, r.header.id))
            .map(|r| inner.resolve(r))
            .collect();
        recipes.sort_by(|a, b| {
            b.header
                .created_at
                .cmp(&a.header.created_at)
                .then(a.header.id.cmp(&b.header.id))
        });
        Ok(recipes)
    }

    async fn insert_recipe(
        &self,
        id: Uuid,
        author_id: Uuid,
        composition: &Composition,
    ) -> Result<Recipe, AppError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        inner.check_references(composition)?;
        if inner
            .recipes
            .values()
            .any(|r| r.header.author_id == author_id && r.header.name == composition.name)
        {
            return Err(ValidationKind::DuplicateName.into());
        }

        let stored = StoredRecipe {
            header: RecipeRow {
                id,
                author_id,
                name: composition.name.clone(),
                text: composition.text.clone(),
                cooking_time: composition.cooking_time,
                image_key: composition.image_key.clone(),
                created_at: OffsetDateTime::now_utc(),
            },
            lines: composition.lines.clone(),
            tag_ids: composition.tag_ids.clone(),
        };
        let recipe = inner.resolve(&stored);
        inner.recipes.insert(id, stored);
        Ok(recipe)
    }

    async fn replace_recipe(
        &self,
        id: Uuid,
        composition: &Composition,
    ) -> Result<Option<Recipe>, AppError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        inner.check_references(composition)?;
        let Some(author_id) = inner.recipes.get(&id).map(|r| r.header.author_id) else {
            return Ok(None);
        };
        if inner.recipes.values().any(|r| {
            r.header.id != id && r.header.author_id == author_id && r.header.name == composition.name
        }) {
            return Err(ValidationKind::DuplicateName.into());
        }

        let Some(stored) = inner.recipes.get_mut(&id) else {
            return Ok(None);
        };
        stored.header.name = composition.name.clone();
        stored.header.text = composition.text.clone();
        stored.header.cooking_time = composition.cooking_time;
        stored.header.image_key = composition.image_key.clone();
        stored.lines = composition.lines.clone();
        stored.tag_ids = composition.tag_ids.clone();

        Ok(inner.recipes.get(&id).map(|r| inner.resolve(r)))
    }

    async fn delete_recipe(&self, id: Uuid) -> Result<Option<RecipeRow>, AppError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        let removed = inner.recipes.remove(&id);
        if removed.is_some() {
            inner.memberships.retain(|(_, _, recipe_id), _| *recipe_id != id);
        }
        Ok(removed.map(|r| r.header))
    }
}

#[async_trait]
impl MembershipRepo for MemoryStore {
    async fn insert_membership(
        &self,
        kind: MembershipKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<Option<OffsetDateTime>, AppError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        if !inner.recipes.contains_key(&recipe_id) {
            return Err(AppError::not_found(Entity::Recipe, recipe_id));
        }
        let key = (kind, user_id, recipe_id);
        if inner.memberships.contains_key(&key) {
            return Ok(None);
        }
        let created_at = OffsetDateTime::now_utc();
        inner.memberships.insert(key, created_at);
        Ok(Some(created_at))
    }

    async fn delete_membership(
        &self,
        kind: MembershipKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, AppError> {
        let mut inner = self.lock();
        inner.check_writable()?;
        Ok(inner.memberships.remove(&(kind, user_id, recipe_id)).is_some())
    }

    async fn has_membership(
        &self,
        kind: MembershipKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, AppError> {
        Ok(self
            .lock()
            .memberships
            .contains_key(&(kind, user_id, recipe_id)))
    }
}

#[async_trait]
impl ShoppingListRepo for MemoryStore {
    async fn cart_lines(&self, user_id: Uuid) -> Result<Vec<CartLine>, AppError> {
        let inner = self.lock();
        let lines = inner
            .memberships
            .keys()
            .filter(|(kind, user, _)| *kind == MembershipKind::Cart && *user == user_id)
            .filter_map(|(_, _, recipe_id)| inner.recipes.get(recipe_id))
            .flat_map(|recipe| inner.resolve(recipe).lines)
            .map(|line| CartLine {
                name: line.name,
                measurement_unit: line.measurement_unit,
                amount: line.amount,
            })
            .collect();
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composition(name: &str, lines: &[(i64, i32)], tag_ids: &[i64]) -> Composition {
        Composition {
            name: name.into(),
            text: "text".into(),
            cooking_time: 10,
            lines: lines
                .iter()
                .map(|(ingredient_id, amount)| NewLine {
                    ingredient_id: *ingredient_id,
                    amount: *amount,
                })
                .collect(),
            tag_ids: tag_ids.to_vec(),
            image_key: "recipes/images/x.png".into(),
        }
    }

    #[tokio::test]
    async fn lines_are_read_back_in_name_order() {
        let store = MemoryStore::default();
        let salt = store.add_ingredient("Salt", "tsp");
        let flour = store.add_ingredient("Flour", "g");
        let tag = store.add_tag("Dinner", "#49B64E", "dinner");

        let recipe = store
            .insert_recipe(
                Uuid::new_v4(),
                Uuid::new_v4(),
                &composition("Bread", &[(salt.id, 1), (flour.id, 500)], &[tag.id]),
            )
            .await
            .unwrap();

        let names: Vec<&str> = recipe.lines.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Flour", "Salt"]);
    }

    #[tokio::test]
    async fn replace_of_missing_recipe_returns_none() {
        let store = MemoryStore::default();
        let flour = store.add_ingredient("Flour", "g");
        let tag = store.add_tag("Dinner", "#49B64E", "dinner");

        let replaced = store
            .replace_recipe(Uuid::new_v4(), &composition("Bread", &[(flour.id, 1)], &[tag.id]))
            .await
            .unwrap();
        assert!(replaced.is_none());
    }

    #[tokio::test]
    async fn unknown_references_are_rejected_without_writing() {
        let store = MemoryStore::default();
        let tag = store.add_tag("Dinner", "#49B64E", "dinner");

        let err = store
            .insert_recipe(Uuid::new_v4(), Uuid::new_v4(), &composition("Bread", &[(42, 1)], &[tag.id]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
        assert_eq!(store.recipe_count(), 0);
    }
}
