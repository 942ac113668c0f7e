use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::SessionKeys,
    },
    error::{Error, ErrorKind, QueryError},
    form::{SetPasswordForm, UserForm},
    pagination::{Page, PageRequest},
    schema::{Id, User, UserRow},
};

use sqlx::{Pool, Postgres};

use super::recipes;

pub async fn find_by_id(id: Id, pool: &Pool<Postgres>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn find_by_ids(ids: &[Id], pool: &Pool<Postgres>) -> Result<Vec<User>, Error> {
    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn find_by_email(email: &str, pool: &Pool<Postgres>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user(id: Id, pool: &Pool<Postgres>) -> Result<User, Error> {
    find_by_id(id, pool)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("No user exists with specified id"))
}

pub async fn find_matching(
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<Page<User>, Error> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "SELECT u.*, COUNT(*) OVER() AS count FROM users u ORDER BY u.username LIMIT $1 OFFSET $2",
    )
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    // An empty page carries no window count.
    let total_count = match rows.first() {
        Some(row) => row.count,
        None => count_users(pool).await?,
    };

    Ok(Page::from_rows(
        rows.into_iter().map(User::from).collect(),
        total_count,
        page,
    ))
}

async fn count_users(pool: &Pool<Postgres>) -> Result<i64, Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}

/// Creates a user from a validated form, storing only the password hash.
pub async fn register(form: UserForm, pool: &Pool<Postgres>) -> Result<User, Error> {
    let password = hash_password(&form.password).map_err(|e| {
        log::error!("> Failed to hash password: {e}");
        ErrorKind::InternalServerError.new("Could not store password")
    })?;

    let user: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING *;
    ",
    )
    .bind(&form.email)
    .bind(&form.username)
    .bind(&form.first_name)
    .bind(&form.last_name)
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match user {
        Some(user) => {
            log::info!("Registered user {} ({})", user.username, user.id);
            Ok(user)
        }
        None => Err(ErrorKind::Conflict.new("A user with that username or email already exists")),
    }
}

pub async fn login(
    email: &str,
    password: &str,
    keys: &SessionKeys,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let user = find_by_email(email, pool)
        .await?
        .ok_or_else(|| ErrorKind::InvalidRequest.new("Invalid credentials"))?;

    let authenticated = verify_password(password, &user.password).map_err(|e| {
        log::error!("> Stored password hash for user {} is unreadable: {e}", user.id);
        ErrorKind::InternalServerError.default()
    })?;
    if !authenticated {
        return Err(ErrorKind::InvalidRequest.new("Invalid credentials"));
    }

    keys.generate_jwt_session(&user)
}

/// Replaces the password hash once the current password checks out.
pub async fn set_password(
    user_id: Id,
    form: SetPasswordForm,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let user = get_user(user_id, pool).await?;

    let authenticated = verify_password(&form.current_password, &user.password).map_err(|e| {
        log::error!("> Stored password hash for user {} is unreadable: {e}", user.id);
        ErrorKind::InternalServerError.default()
    })?;
    if !authenticated {
        return Err(ErrorKind::InvalidRequest
            .new("Invalid password")
            .on("current_password"));
    }

    let password = hash_password(&form.new_password).map_err(|e| {
        log::error!("> Failed to hash password: {e}");
        ErrorKind::InternalServerError.new("Could not store password")
    })?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    log::info!("Changed password for user {}", user.id);
    Ok(())
}

/// Deletes a user and everything that hangs off them.
pub async fn delete(id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let recipe_ids: Vec<(Id,)> = sqlx::query_as("SELECT id FROM recipes WHERE author_id = $1")
        .bind(id)
        .fetch_all(&mut *tr)
        .await
        .map_err(QueryError::from)?;
    for (recipe_id,) in recipe_ids {
        recipes::delete_in(recipe_id, &mut *tr).await?;
    }

    sqlx::query("DELETE FROM favorites WHERE user_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM shopping_cart WHERE user_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM follows WHERE user_id = $1 OR following_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;
    if result.rows_affected() == 0 {
        return Err(ErrorKind::NotFound.new("No user exists with specified id"));
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;
    log::info!("Deleted user {id}");
    Ok(())
}
