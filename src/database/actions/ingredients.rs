use crate::{
    database::{
        error::query_error,
        schema::{Ingredient, NewIngredient, Uuid},
    },
    Error,
};

use sqlx::{Pool, Postgres};

/// Case-insensitive substring search. Names starting with the query come
/// first, the rest follow alphabetically.
pub async fn list_ingredients(
    name: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let rows: Vec<Ingredient> = match name {
        Some(name) => {
            let name = escape_like(name);
            sqlx::query_as(
                "
                SELECT * FROM ingredients
                WHERE name ILIKE $1
                ORDER BY (CASE WHEN name ILIKE $2 THEN 0 ELSE 1 END), name
            ",
            )
            .bind(format!("%{name}%"))
            .bind(format!("{name}%"))
            .fetch_all(pool)
            .await
            .map_err(query_error)?
        }
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name")
            .fetch_all(pool)
            .await
            .map_err(query_error)?,
    };

    Ok(rows)
}

pub async fn get_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(query_error)?;

    Ok(row)
}

/// Inserts the catalog in one transaction, skipping `(name, unit)` pairs that
/// already exist.
pub async fn insert_ingredients(
    items: &[NewIngredient],
    pool: &Pool<Postgres>,
) -> Result<u64, Error> {
    let mut tx = pool.begin().await.map_err(query_error)?;
    let mut inserted = 0;

    for item in items {
        let result = sqlx::query(
            "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(&item.name)
        .bind(&item.measurement_unit)
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

        inserted += result.rows_affected();
    }

    tx.commit().await.map_err(query_error)?;

    Ok(inserted)
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
