use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, ErrorKind, QueryError},
    pagination::{Page, PageRequest},
    schema::{Id, Recipe, User, UserRow},
};

use super::{recipes, users};

/// A followed author with (possibly truncated) recipes and their full count.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub author: User,
    pub recipes: Vec<Recipe>,
    pub recipes_count: i64,
}

pub async fn follow(user_id: Id, following_id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    if user_id == following_id {
        return Err(ErrorKind::Conflict.new("You cannot follow yourself"));
    }
    users::get_user(following_id, pool).await?;

    let result = sqlx::query(
        "INSERT INTO follows (user_id, following_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(following_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;
    if result.rows_affected() == 0 {
        return Err(ErrorKind::Conflict.new("You already follow this user"));
    }

    log::debug!("User {user_id} now follows {following_id}");
    Ok(())
}

pub async fn unfollow(user_id: Id, following_id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND following_id = $2")
        .bind(user_id)
        .bind(following_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;
    if result.rows_affected() == 0 {
        return Err(ErrorKind::NotFound.new("You do not follow this user"));
    }

    Ok(())
}

pub async fn is_following(
    user_id: Id,
    following_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let found: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND following_id = $2)",
    )
    .bind(user_id)
    .bind(following_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(found.0)
}

pub async fn find_matching(
    user_id: Id,
    page: PageRequest,
    recipes_limit: Option<usize>,
    pool: &Pool<Postgres>,
) -> Result<Page<Subscription>, Error> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.*, COUNT(*) OVER() AS count
        FROM follows f
        INNER JOIN users u ON u.id = f.following_id
        WHERE f.user_id = $1
        ORDER BY u.username
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None => count_following(user_id, pool).await?,
    };

    let authors: Vec<User> = rows.into_iter().map(User::from).collect();
    let author_ids: Vec<Id> = authors.iter().map(|a| a.id).collect();
    let subscriptions = with_recipes(authors, &author_ids, recipes_limit, pool).await?;

    Ok(Page::from_rows(subscriptions, total_count, page))
}

/// The subscription view of a single author.
pub async fn get_subscription(
    author: User,
    recipes_limit: Option<usize>,
    pool: &Pool<Postgres>,
) -> Result<Subscription, Error> {
    let ids = [author.id];
    let mut list = with_recipes(vec![author], &ids, recipes_limit, pool).await?;
    list.pop()
        .ok_or_else(|| ErrorKind::InternalServerError.default())
}

async fn with_recipes(
    authors: Vec<User>,
    author_ids: &[Id],
    recipes_limit: Option<usize>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Subscription>, Error> {
    let mut by_author: HashMap<Id, Vec<Recipe>> = HashMap::new();
    if !author_ids.is_empty() {
        for recipe in recipes::find_by_authors(author_ids, pool).await? {
            by_author.entry(recipe.author_id).or_default().push(recipe);
        }
    }

    Ok(authors
        .into_iter()
        .map(|author| {
            let mut recipes = by_author.remove(&author.id).unwrap_or_default();
            let recipes_count = recipes.len() as i64;
            if let Some(limit) = recipes_limit {
                recipes.truncate(limit);
            }
            Subscription {
                author,
                recipes,
                recipes_count,
            }
        })
        .collect())
}

async fn count_following(user_id: Id, pool: &Pool<Postgres>) -> Result<i64, Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}
