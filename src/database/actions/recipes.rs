use crate::{
    database::{
        error::query_error,
        schema::{Recipe, RecipeDraft, RecipeFilter, RecipeIngredient, Uuid},
    },
    Error, HtmlError,
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &RecipeFilter) {
    query.push(" WHERE TRUE");

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }

    if let Some(user_id) = filter.favorited_by {
        query
            .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
            .push_bind(user_id)
            .push(")");
    }

    if let Some(user_id) = filter.in_cart_of {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ",
            )
            .push_bind(user_id)
            .push(")");
    }
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    limit: i64,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<(Vec<Recipe>, i64), Error> {
    let mut query = QueryBuilder::<Postgres>::new("SELECT r.* FROM recipes r");
    push_filters(&mut query, filter);
    query
        .push(" ORDER BY r.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows: Vec<Recipe> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(query_error)?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM recipes r");
    push_filters(&mut count, filter);

    let total: (i64,) = count
        .build_query_as()
        .fetch_one(pool)
        .await
        .map_err(query_error)?;

    Ok((rows, total.0))
}

pub async fn list_author_recipes(
    author_id: Uuid,
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<(Vec<Recipe>, i64), Error> {
    // LIMIT NULL is no limit
    let rows: Vec<Recipe> =
        sqlx::query_as("SELECT * FROM recipes WHERE author_id = $1 ORDER BY id DESC LIMIT $2")
            .bind(author_id)
            .bind(limit)
            .fetch_all(pool)
            .await
            .map_err(query_error)?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .map_err(query_error)?;

    Ok((rows, total.0))
}

pub async fn list_recipe_ingredients(
    pool: &Pool<Postgres>,
    recipe_id: Uuid,
) -> Result<Vec<RecipeIngredient>, Error> {
    let rows: Vec<RecipeIngredient> = sqlx::query_as("
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY ri.id
    ")
    .bind(recipe_id)
    .fetch_all(pool).await.map_err(query_error)?;

    Ok(rows)
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(&*pool)
        .await
        .map_err(query_error)?;

    Ok(row)
}

/// Writes the tag links and ingredient lines of a recipe. Callers clear the
/// previous ones first when updating.
async fn insert_recipe_parts(
    recipe_id: Uuid,
    draft: &RecipeDraft,
    conn: &mut PgConnection,
) -> Result<(), Error> {
    for tag_id in draft.tags.iter() {
        sqlx::query(
            "INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(recipe_id)
        .bind(tag_id)
        .execute(&mut *conn)
        .await
        .map_err(query_error)?;
    }

    for part in draft.ingredients.iter() {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES ($1, $2, $3)",
        )
        .bind(recipe_id)
        .bind(part.id)
        .bind(part.amount)
        .execute(&mut *conn)
        .await
        .map_err(query_error)?;
    }

    Ok(())
}

pub async fn create_recipe(
    author_id: Uuid,
    draft: &RecipeDraft,
    pool: &Pool<Postgres>,
) -> Result<Uuid, Error> {
    let image = draft
        .image
        .as_deref()
        .ok_or_else(|| HtmlError::InvalidRequest.fields(["Image is required"]))?;

    let mut tx = pool.begin().await.map_err(query_error)?;

    let id: (i32,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&draft.name)
    .bind(&draft.text)
    .bind(image)
    .bind(draft.cooking_time)
    .fetch_one(&mut *tx)
    .await
    .map_err(query_error)?;

    insert_recipe_parts(id.0, draft, &mut *tx).await?;

    tx.commit().await.map_err(query_error)?;

    Ok(id.0)
}

/// Overwrites the recipe fields and replaces its tags and ingredient lines.
pub async fn update_recipe(
    id: Uuid,
    draft: &RecipeDraft,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let mut tx = pool.begin().await.map_err(query_error)?;

    sqlx::query(
        "
        UPDATE recipes
        SET name = $2, text = $3, cooking_time = $4, image = COALESCE($5, image)
        WHERE id = $1
    ",
    )
    .bind(id)
    .bind(&draft.name)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .bind(draft.image.as_deref())
    .execute(&mut *tx)
    .await
    .map_err(query_error)?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

    insert_recipe_parts(id, draft, &mut *tx).await?;

    tx.commit().await.map_err(query_error)?;

    Ok(())
}

pub async fn delete_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(query_error)?;

    Ok(())
}
