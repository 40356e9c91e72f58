use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    database::{
        schema::{IngredientAmount, Recipe, RelationKind, Tag, User, Uuid},
        store::Store,
    },
    validators::{not_blank, password_strength, unique_ingredients, USERNAME},
    Error, HtmlError,
};

// Requests

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        email(message = "enter a valid email address"),
        length(max = 254, message = "at most 254 characters")
    )]
    pub email: String,
    #[validate(
        length(min = 1, max = 150, message = "between 1 and 150 characters"),
        regex(path = *USERNAME, message = "only letters, digits and @/./+/-/_ are allowed")
    )]
    pub username: String,
    #[validate(
        custom(function = "not_blank"),
        length(max = 150, message = "at most 150 characters")
    )]
    pub first_name: String,
    #[validate(
        custom(function = "not_blank"),
        length(max = 150, message = "at most 150 characters")
    )]
    pub last_name: String,
    #[validate(
        length(min = 8, max = 128, message = "between 8 and 128 characters"),
        custom(function = "password_strength")
    )]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetPasswordRequest {
    #[validate(
        length(min = 8, max = 128, message = "between 8 and 128 characters"),
        custom(function = "password_strength")
    )]
    pub new_password: String,
    pub current_password: String,
}

#[derive(Debug, Deserialize)]
pub struct AvatarRequest {
    pub avatar: Option<String>,
}

/// Whether the referenced tags and ingredients exist is checked against the
/// store by the handler.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "unique_ingredients", skip_on_field_errors = false))]
pub struct RecipeRequest {
    #[validate(
        length(min = 1, message = "at least one ingredient is required"),
        nested
    )]
    pub ingredients: Vec<IngredientAmount>,
    #[validate(length(min = 1, message = "at least one tag is required"))]
    pub tags: Vec<Uuid>,
    pub image: Option<String>,
    #[validate(
        custom(function = "not_blank"),
        length(max = 256, message = "at most 256 characters")
    )]
    pub name: String,
    #[validate(custom(function = "not_blank"))]
    pub text: String,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub cooking_time: i32,
}

// Responses

#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for RegisteredUser {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthorView {
    #[serde(flatten)]
    pub user: UserView,
    pub recipes: Vec<ShortRecipe>,
    pub recipes_count: i64,
}

#[derive(Debug, Serialize)]
pub struct TokenView {
    pub auth_token: String,
}

#[derive(Debug, Serialize)]
pub struct AvatarView {
    pub avatar: String,
}

#[derive(Debug, Serialize)]
pub struct IngredientLine {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Serialize)]
pub struct RecipeView {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<IngredientLine>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShortRecipe {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<Recipe> for ShortRecipe {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name,
            image: recipe.image,
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShortLinkView {
    #[serde(rename = "short-link")]
    pub short_link: String,
}

// Builders

pub async fn user_view(store: &dyn Store, viewer: Option<&User>, user: User) -> Result<UserView, Error> {
    let is_subscribed = match viewer {
        Some(viewer) => store.is_subscribed(viewer.id, user.id).await?,
        None => false,
    };

    Ok(UserView {
        email: user.email,
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        is_subscribed,
        avatar: user.avatar,
    })
}

/// An author with up to `recipes_limit` of their newest recipes.
pub async fn author_view(
    store: &dyn Store,
    viewer: Option<&User>,
    author: User,
    recipes_limit: Option<i64>,
) -> Result<AuthorView, Error> {
    let (recipes, recipes_count) = store.list_author_recipes(author.id, recipes_limit).await?;

    Ok(AuthorView {
        user: user_view(store, viewer, author).await?,
        recipes: recipes.into_iter().map(ShortRecipe::from).collect(),
        recipes_count,
    })
}

pub async fn recipe_view(store: &dyn Store, viewer: Option<&User>, recipe: Recipe) -> Result<RecipeView, Error> {
    let author = store
        .get_user(recipe.author_id)
        .await?
        .ok_or_else(|| HtmlError::InternalServerError.new("Recipe author is missing"))?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(viewer) => (
            store.has_relation(RelationKind::Favorite, viewer.id, recipe.id).await?,
            store.has_relation(RelationKind::ShoppingCart, viewer.id, recipe.id).await?,
        ),
        None => (false, false),
    };

    let ingredients = store
        .list_recipe_ingredients(recipe.id)
        .await?
        .into_iter()
        .map(|line| IngredientLine {
            id: line.ingredient_id,
            name: line.name,
            measurement_unit: line.measurement_unit,
            amount: line.amount,
        })
        .collect();

    Ok(RecipeView {
        id: recipe.id,
        tags: store.list_recipe_tags(recipe.id).await?,
        author: user_view(store, viewer, author).await?,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}
