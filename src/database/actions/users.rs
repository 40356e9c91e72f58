use crate::{
    database::{
        error::query_error,
        schema::{NewUser, User, Uuid},
    },
    Error,
};

use sqlx::{Pool, Postgres};

pub async fn get_user_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(&*pool)
        .await
        .map_err(query_error)?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&*pool)
        .await
        .map_err(query_error)?;

    Ok(row)
}

/// Creates a user whose `password` is already hashed. Returns `None` when the
/// email or username is taken.
pub async fn create_user(user: &NewUser, pool: &Pool<Postgres>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING *;
    ",
    )
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password)
    .fetch_optional(&*pool)
    .await
    .map_err(query_error)?;

    Ok(row)
}

pub async fn list_users(
    limit: i64,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<(Vec<User>, i64), Error> {
    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY id LIMIT $1 OFFSET $2")
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(query_error)?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .map_err(query_error)?;

    Ok((rows, total.0))
}

pub async fn set_password(
    user_id: Uuid,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    sqlx::query("UPDATE users SET password = $2 WHERE id = $1")
        .bind(user_id)
        .bind(password)
        .execute(pool)
        .await
        .map_err(query_error)?;

    Ok(())
}

pub async fn set_avatar(
    user_id: Uuid,
    avatar: Option<String>,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    sqlx::query("UPDATE users SET avatar = $2 WHERE id = $1")
        .bind(user_id)
        .bind(avatar)
        .execute(pool)
        .await
        .map_err(query_error)?;

    Ok(())
}

/// Invalidates every token issued to the user so far.
pub async fn bump_token_generation(user_id: Uuid, pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::query("UPDATE users SET token_generation = token_generation + 1 WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(query_error)?;

    Ok(())
}
