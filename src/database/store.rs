use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use super::{
    actions,
    error::query_error,
    schema::{
        Ingredient, NewIngredient, NewUser, Recipe, RecipeDraft, RecipeFilter, RecipeIngredient,
        RelationKind, Tag, User, Uuid,
    },
};
use crate::error::Error;

/// Everything the HTTP layer needs from persistence. Implemented over
/// PostgreSQL by [`PgStore`] and in process by
/// [`MemoryStore`](super::memory::MemoryStore).
#[async_trait]
pub trait Store: Send + Sync {
    // Users

    /// `None` when the email or username is already taken.
    async fn create_user(&self, user: NewUser) -> Result<Option<User>, Error>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, Error>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;
    async fn list_users(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), Error>;
    async fn set_password(&self, id: Uuid, password: &str) -> Result<(), Error>;
    async fn set_avatar(&self, id: Uuid, avatar: Option<String>) -> Result<(), Error>;
    async fn bump_token_generation(&self, id: Uuid) -> Result<(), Error>;

    // Subscriptions

    async fn is_subscribed(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, Error>;
    /// `false` when the subscription already exists.
    async fn subscribe(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, Error>;
    /// `false` when there was nothing to delete.
    async fn unsubscribe(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, Error>;
    async fn list_subscriptions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), Error>;

    // Tags

    async fn list_tags(&self) -> Result<Vec<Tag>, Error>;
    async fn get_tag(&self, id: Uuid) -> Result<Option<Tag>, Error>;
    /// `None` when the name or slug is already taken.
    async fn create_tag(&self, name: &str, slug: &str) -> Result<Option<Tag>, Error>;

    // Ingredients

    async fn list_ingredients(&self, name: Option<&str>) -> Result<Vec<Ingredient>, Error>;
    async fn get_ingredient(&self, id: Uuid) -> Result<Option<Ingredient>, Error>;
    /// Returns how many rows were actually inserted.
    async fn insert_ingredients(&self, items: &[NewIngredient]) -> Result<u64, Error>;

    // Recipes

    async fn create_recipe(&self, author_id: Uuid, draft: &RecipeDraft) -> Result<Uuid, Error>;
    async fn update_recipe(&self, id: Uuid, draft: &RecipeDraft) -> Result<(), Error>;
    async fn delete_recipe(&self, id: Uuid) -> Result<(), Error>;
    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>, Error>;
    /// Newest first, with the total count ignoring `limit`/`offset`.
    async fn fetch_recipes(
        &self,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Recipe>, i64), Error>;
    async fn list_author_recipes(
        &self,
        author_id: Uuid,
        limit: Option<i64>,
    ) -> Result<(Vec<Recipe>, i64), Error>;
    async fn list_recipe_tags(&self, recipe_id: Uuid) -> Result<Vec<Tag>, Error>;
    async fn list_recipe_ingredients(&self, recipe_id: Uuid)
        -> Result<Vec<RecipeIngredient>, Error>;

    // Favorites and shopping cart

    /// `false` when the relation already exists.
    async fn add_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, Error>;
    /// `false` when there was nothing to delete.
    async fn remove_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, Error>;
    async fn has_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, Error>;
    /// Every ingredient line of every recipe in the user's cart, ordered by
    /// recipe and then by line.
    async fn list_cart_ingredients(&self, user_id: Uuid) -> Result<Vec<RecipeIngredient>, Error>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(query_error)?;

        Ok(Self::new(pool))
    }

    /// Applies the embedded `migrations/` directory.
    pub async fn migrate(&self) -> Result<(), Error> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| query_error(e.into()))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<Option<User>, Error> {
        actions::users::create_user(&user, &self.pool).await
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, Error> {
        actions::users::get_user_by_id(&self.pool, id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        actions::users::get_user_by_email(&self.pool, email).await
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), Error> {
        actions::users::list_users(limit, offset, &self.pool).await
    }

    async fn set_password(&self, id: Uuid, password: &str) -> Result<(), Error> {
        actions::users::set_password(id, password, &self.pool).await
    }

    async fn set_avatar(&self, id: Uuid, avatar: Option<String>) -> Result<(), Error> {
        actions::users::set_avatar(id, avatar, &self.pool).await
    }

    async fn bump_token_generation(&self, id: Uuid) -> Result<(), Error> {
        actions::users::bump_token_generation(id, &self.pool).await
    }

    async fn is_subscribed(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, Error> {
        actions::subscriptions::is_subscribed(user_id, author_id, &self.pool).await
    }

    async fn subscribe(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, Error> {
        actions::subscriptions::subscribe(user_id, author_id, &self.pool).await
    }

    async fn unsubscribe(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, Error> {
        actions::subscriptions::unsubscribe(user_id, author_id, &self.pool).await
    }

    async fn list_subscriptions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), Error> {
        actions::subscriptions::list_subscriptions(user_id, limit, offset, &self.pool).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, Error> {
        actions::tags::list_tags(&self.pool).await
    }

    async fn get_tag(&self, id: Uuid) -> Result<Option<Tag>, Error> {
        actions::tags::get_tag(id, &self.pool).await
    }

    async fn create_tag(&self, name: &str, slug: &str) -> Result<Option<Tag>, Error> {
        actions::tags::create_tag(name, slug, &self.pool).await
    }

    async fn list_ingredients(&self, name: Option<&str>) -> Result<Vec<Ingredient>, Error> {
        actions::ingredients::list_ingredients(name, &self.pool).await
    }

    async fn get_ingredient(&self, id: Uuid) -> Result<Option<Ingredient>, Error> {
        actions::ingredients::get_ingredient(id, &self.pool).await
    }

    async fn insert_ingredients(&self, items: &[NewIngredient]) -> Result<u64, Error> {
        actions::ingredients::insert_ingredients(items, &self.pool).await
    }

    async fn create_recipe(&self, author_id: Uuid, draft: &RecipeDraft) -> Result<Uuid, Error> {
        actions::recipes::create_recipe(author_id, draft, &self.pool).await
    }

    async fn update_recipe(&self, id: Uuid, draft: &RecipeDraft) -> Result<(), Error> {
        actions::recipes::update_recipe(id, draft, &self.pool).await
    }

    async fn delete_recipe(&self, id: Uuid) -> Result<(), Error> {
        actions::recipes::delete_recipe(id, &self.pool).await
    }

    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>, Error> {
        actions::recipes::get_recipe(id, &self.pool).await
    }

    async fn fetch_recipes(
        &self,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Recipe>, i64), Error> {
        actions::recipes::fetch_recipes(filter, limit, offset, &self.pool).await
    }

    async fn list_author_recipes(
        &self,
        author_id: Uuid,
        limit: Option<i64>,
    ) -> Result<(Vec<Recipe>, i64), Error> {
        actions::recipes::list_author_recipes(author_id, limit, &self.pool).await
    }

    async fn list_recipe_tags(&self, recipe_id: Uuid) -> Result<Vec<Tag>, Error> {
        actions::tags::list_recipe_tags(&self.pool, recipe_id).await
    }

    async fn list_recipe_ingredients(
        &self,
        recipe_id: Uuid,
    ) -> Result<Vec<RecipeIngredient>, Error> {
        actions::recipes::list_recipe_ingredients(&self.pool, recipe_id).await
    }

    async fn add_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, Error> {
        actions::relations::add_relation(kind, user_id, recipe_id, &self.pool).await
    }

    async fn remove_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, Error> {
        actions::relations::remove_relation(kind, user_id, recipe_id, &self.pool).await
    }

    async fn has_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, Error> {
        actions::relations::has_relation(kind, user_id, recipe_id, &self.pool).await
    }

    async fn list_cart_ingredients(&self, user_id: Uuid) -> Result<Vec<RecipeIngredient>, Error> {
        actions::relations::list_cart_ingredients(user_id, &self.pool).await
    }
}
