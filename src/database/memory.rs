use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;

use super::{
    schema::{
        Ingredient, NewIngredient, NewUser, Recipe, RecipeDraft, RecipeFilter, RecipeIngredient,
        RelationKind, Tag, User, Uuid,
    },
    store::Store,
};
use crate::{Error, HtmlError};

#[derive(Debug, Clone, Copy)]
struct Line {
    id: Uuid,
    recipe_id: Uuid,
    ingredient_id: Uuid,
    amount: i32,
}

#[derive(Default)]
struct Tables {
    sequence: Uuid,
    users: BTreeMap<Uuid, User>,
    tags: BTreeMap<Uuid, Tag>,
    ingredients: BTreeMap<Uuid, Ingredient>,
    recipes: BTreeMap<Uuid, Recipe>,
    recipe_tags: Vec<(Uuid, Uuid)>,
    recipe_ingredients: Vec<Line>,
    favorites: Vec<(Uuid, Uuid)>,
    shopping_cart: Vec<(Uuid, Uuid)>,
    subscriptions: Vec<(Uuid, Uuid)>,
}

impl Tables {
    fn next_id(&mut self) -> Uuid {
        self.sequence += 1;
        self.sequence
    }

    fn relation(&self, kind: RelationKind) -> &Vec<(Uuid, Uuid)> {
        match kind {
            RelationKind::Favorite => &self.favorites,
            RelationKind::ShoppingCart => &self.shopping_cart,
        }
    }

    fn relation_mut(&mut self, kind: RelationKind) -> &mut Vec<(Uuid, Uuid)> {
        match kind {
            RelationKind::Favorite => &mut self.favorites,
            RelationKind::ShoppingCart => &mut self.shopping_cart,
        }
    }

    fn write_parts(&mut self, recipe_id: Uuid, draft: &RecipeDraft) {
        for tag_id in draft.tags.iter() {
            if !self.recipe_tags.contains(&(recipe_id, *tag_id)) {
                self.recipe_tags.push((recipe_id, *tag_id));
            }
        }

        for part in draft.ingredients.iter() {
            let id = self.next_id();
            self.recipe_ingredients.push(Line {
                id,
                recipe_id,
                ingredient_id: part.id,
                amount: part.amount,
            });
        }
    }

    fn lines_of(&self, recipe_id: Uuid) -> Vec<RecipeIngredient> {
        let mut lines: Vec<&Line> = self
            .recipe_ingredients
            .iter()
            .filter(|line| line.recipe_id == recipe_id)
            .collect();
        lines.sort_by_key(|line| line.id);

        lines
            .into_iter()
            .filter_map(|line| {
                self.ingredients
                    .get(&line.ingredient_id)
                    .map(|ingredient| RecipeIngredient {
                        recipe_id: line.recipe_id,
                        ingredient_id: ingredient.id,
                        name: ingredient.name.to_owned(),
                        measurement_unit: ingredient.measurement_unit.to_owned(),
                        amount: line.amount,
                    })
            })
            .collect()
    }

    fn matches(&self, recipe: &Recipe, filter: &RecipeFilter) -> bool {
        if let Some(author) = filter.author {
            if recipe.author_id != author {
                return false;
            }
        }

        if !filter.tags.is_empty() {
            let tagged = self
                .recipe_tags
                .iter()
                .filter(|(recipe_id, _)| *recipe_id == recipe.id)
                .filter_map(|(_, tag_id)| self.tags.get(tag_id))
                .any(|tag| filter.tags.contains(&tag.slug));
            if !tagged {
                return false;
            }
        }

        if let Some(user_id) = filter.favorited_by {
            if !self.favorites.contains(&(user_id, recipe.id)) {
                return false;
            }
        }

        if let Some(user_id) = filter.in_cart_of {
            if !self.shopping_cart.contains(&(user_id, recipe.id)) {
                return false;
            }
        }

        true
    }
}

/// In-process [`Store`] with the same uniqueness and cascade rules as the
/// PostgreSQL schema. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, Error> {
        self.tables
            .lock()
            .map_err(|_e| HtmlError::InternalServerError.new("Memory store poisoned"))
    }
}

fn page<T: Clone>(rows: &[T], limit: i64, offset: i64) -> Vec<T> {
    rows.iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .cloned()
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<Option<User>, Error> {
        let mut tables = self.lock()?;

        let taken = tables.users.values().any(|existing| {
            existing.email.to_lowercase() == user.email.to_lowercase()
                || existing.username == user.username
        });
        if taken {
            return Ok(None);
        }

        let id = tables.next_id();
        let row = User {
            id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            password: user.password,
            avatar: None,
            token_generation: 0,
        };
        tables.users.insert(id, row.clone());

        Ok(Some(row))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, Error> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let email = email.to_lowercase();
        Ok(self
            .lock()?
            .users
            .values()
            .find(|user| user.email.to_lowercase() == email)
            .cloned())
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), Error> {
        let tables = self.lock()?;
        let rows: Vec<User> = tables.users.values().cloned().collect();

        Ok((page(&rows, limit, offset), rows.len() as i64))
    }

    async fn set_password(&self, id: Uuid, password: &str) -> Result<(), Error> {
        if let Some(user) = self.lock()?.users.get_mut(&id) {
            user.password = password.to_string();
        }
        Ok(())
    }

    async fn set_avatar(&self, id: Uuid, avatar: Option<String>) -> Result<(), Error> {
        if let Some(user) = self.lock()?.users.get_mut(&id) {
            user.avatar = avatar;
        }
        Ok(())
    }

    async fn bump_token_generation(&self, id: Uuid) -> Result<(), Error> {
        if let Some(user) = self.lock()?.users.get_mut(&id) {
            user.token_generation += 1;
        }
        Ok(())
    }

    async fn is_subscribed(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, Error> {
        Ok(self.lock()?.subscriptions.contains(&(user_id, author_id)))
    }

    async fn subscribe(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, Error> {
        let mut tables = self.lock()?;
        if user_id == author_id || tables.subscriptions.contains(&(user_id, author_id)) {
            return Ok(false);
        }
        tables.subscriptions.push((user_id, author_id));
        Ok(true)
    }

    async fn unsubscribe(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, Error> {
        let mut tables = self.lock()?;
        let before = tables.subscriptions.len();
        tables
            .subscriptions
            .retain(|pair| *pair != (user_id, author_id));
        Ok(tables.subscriptions.len() < before)
    }

    async fn list_subscriptions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), Error> {
        let tables = self.lock()?;
        let mut rows: Vec<User> = tables
            .subscriptions
            .iter()
            .filter(|(follower, _)| *follower == user_id)
            .filter_map(|(_, author)| tables.users.get(author).cloned())
            .collect();
        rows.sort_by_key(|user| user.id);

        Ok((page(&rows, limit, offset), rows.len() as i64))
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, Error> {
        Ok(self.lock()?.tags.values().cloned().collect())
    }

    async fn get_tag(&self, id: Uuid) -> Result<Option<Tag>, Error> {
        Ok(self.lock()?.tags.get(&id).cloned())
    }

    async fn create_tag(&self, name: &str, slug: &str) -> Result<Option<Tag>, Error> {
        let mut tables = self.lock()?;
        if tables
            .tags
            .values()
            .any(|tag| tag.name == name || tag.slug == slug)
        {
            return Ok(None);
        }

        let id = tables.next_id();
        let tag = Tag {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
        };
        tables.tags.insert(id, tag.clone());

        Ok(Some(tag))
    }

    async fn list_ingredients(&self, name: Option<&str>) -> Result<Vec<Ingredient>, Error> {
        let tables = self.lock()?;
        let query = name.map(|name| name.to_lowercase());

        let mut rows: Vec<(u8, Ingredient)> = tables
            .ingredients
            .values()
            .filter_map(|ingredient| {
                let lowered = ingredient.name.to_lowercase();
                match &query {
                    Some(query) if lowered.starts_with(query.as_str()) => {
                        Some((0, ingredient.clone()))
                    }
                    Some(query) if lowered.contains(query.as_str()) => {
                        Some((1, ingredient.clone()))
                    }
                    Some(_) => None,
                    None => Some((0, ingredient.clone())),
                }
            })
            .collect();
        rows.sort_by(|(a_rank, a), (b_rank, b)| a_rank.cmp(b_rank).then(a.name.cmp(&b.name)));

        Ok(rows.into_iter().map(|(_, ingredient)| ingredient).collect())
    }

    async fn get_ingredient(&self, id: Uuid) -> Result<Option<Ingredient>, Error> {
        Ok(self.lock()?.ingredients.get(&id).cloned())
    }

    async fn insert_ingredients(&self, items: &[NewIngredient]) -> Result<u64, Error> {
        let mut tables = self.lock()?;
        let mut inserted = 0;

        for item in items {
            let exists = tables.ingredients.values().any(|ingredient| {
                ingredient.name == item.name && ingredient.measurement_unit == item.measurement_unit
            });
            if exists {
                continue;
            }

            let id = tables.next_id();
            tables.ingredients.insert(
                id,
                Ingredient {
                    id,
                    name: item.name.to_owned(),
                    measurement_unit: item.measurement_unit.to_owned(),
                },
            );
            inserted += 1;
        }

        Ok(inserted)
    }

    async fn create_recipe(&self, author_id: Uuid, draft: &RecipeDraft) -> Result<Uuid, Error> {
        let image = draft
            .image
            .to_owned()
            .ok_or_else(|| HtmlError::InvalidRequest.fields(["Image is required"]))?;

        let mut tables = self.lock()?;
        let id = tables.next_id();
        tables.recipes.insert(
            id,
            Recipe {
                id,
                author_id,
                name: draft.name.to_owned(),
                text: draft.text.to_owned(),
                image,
                cooking_time: draft.cooking_time,
                created_at: Utc::now(),
            },
        );
        tables.write_parts(id, draft);

        Ok(id)
    }

    async fn update_recipe(&self, id: Uuid, draft: &RecipeDraft) -> Result<(), Error> {
        let mut tables = self.lock()?;

        match tables.recipes.get_mut(&id) {
            Some(recipe) => {
                recipe.name = draft.name.to_owned();
                recipe.text = draft.text.to_owned();
                recipe.cooking_time = draft.cooking_time;
                if let Some(image) = &draft.image {
                    recipe.image = image.to_owned();
                }
            }
            None => return Ok(()),
        }

        tables.recipe_tags.retain(|(recipe_id, _)| *recipe_id != id);
        tables.recipe_ingredients.retain(|line| line.recipe_id != id);
        tables.write_parts(id, draft);

        Ok(())
    }

    async fn delete_recipe(&self, id: Uuid) -> Result<(), Error> {
        let mut tables = self.lock()?;

        tables.recipes.remove(&id);
        tables.recipe_tags.retain(|(recipe_id, _)| *recipe_id != id);
        tables.recipe_ingredients.retain(|line| line.recipe_id != id);
        tables.favorites.retain(|(_, recipe_id)| *recipe_id != id);
        tables.shopping_cart.retain(|(_, recipe_id)| *recipe_id != id);

        Ok(())
    }

    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>, Error> {
        Ok(self.lock()?.recipes.get(&id).cloned())
    }

    async fn fetch_recipes(
        &self,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Recipe>, i64), Error> {
        let tables = self.lock()?;
        let rows: Vec<Recipe> = tables
            .recipes
            .values()
            .rev()
            .filter(|recipe| tables.matches(recipe, filter))
            .cloned()
            .collect();

        Ok((page(&rows, limit, offset), rows.len() as i64))
    }

    async fn list_author_recipes(
        &self,
        author_id: Uuid,
        limit: Option<i64>,
    ) -> Result<(Vec<Recipe>, i64), Error> {
        let tables = self.lock()?;
        let rows: Vec<Recipe> = tables
            .recipes
            .values()
            .rev()
            .filter(|recipe| recipe.author_id == author_id)
            .cloned()
            .collect();
        let total = rows.len() as i64;

        Ok((page(&rows, limit.unwrap_or(total), 0), total))
    }

    async fn list_recipe_tags(&self, recipe_id: Uuid) -> Result<Vec<Tag>, Error> {
        let tables = self.lock()?;
        let mut tags: Vec<Tag> = tables
            .recipe_tags
            .iter()
            .filter(|(id, _)| *id == recipe_id)
            .filter_map(|(_, tag_id)| tables.tags.get(tag_id).cloned())
            .collect();
        tags.sort_by_key(|tag| tag.id);

        Ok(tags)
    }

    async fn list_recipe_ingredients(
        &self,
        recipe_id: Uuid,
    ) -> Result<Vec<RecipeIngredient>, Error> {
        Ok(self.lock()?.lines_of(recipe_id))
    }

    async fn add_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, Error> {
        let mut tables = self.lock()?;
        let relation = tables.relation_mut(kind);
        if relation.contains(&(user_id, recipe_id)) {
            return Ok(false);
        }
        relation.push((user_id, recipe_id));
        Ok(true)
    }

    async fn remove_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, Error> {
        let mut tables = self.lock()?;
        let relation = tables.relation_mut(kind);
        let before = relation.len();
        relation.retain(|pair| *pair != (user_id, recipe_id));
        Ok(relation.len() < before)
    }

    async fn has_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, Error> {
        Ok(self.lock()?.relation(kind).contains(&(user_id, recipe_id)))
    }

    async fn list_cart_ingredients(&self, user_id: Uuid) -> Result<Vec<RecipeIngredient>, Error> {
        let tables = self.lock()?;
        let mut recipes: Vec<Uuid> = tables
            .shopping_cart
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, recipe_id)| *recipe_id)
            .collect();
        recipes.sort();

        Ok(recipes
            .into_iter()
            .flat_map(|recipe_id| tables.lines_of(recipe_id))
            .collect())
    }
}
