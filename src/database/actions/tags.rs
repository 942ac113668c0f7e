use crate::{
    error::{Error, ErrorKind, QueryError},
    form::TagForm,
    schema::{Id, Tag},
};

use sqlx::{Pool, Postgres};

pub async fn find_by_id(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn find_matching(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

/// Stores a validated tag. Name, color and slug are each unique.
pub async fn save(form: TagForm, pool: &Pool<Postgres>) -> Result<Tag, Error> {
    let tag: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(&form.name)
    .bind(&form.color)
    .bind(&form.slug)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match tag {
        Some(tag) => {
            log::info!("Created tag {} ({})", tag.slug, tag.id);
            Ok(tag)
        }
        None => Err(ErrorKind::Conflict.new("A tag with that name, color or slug already exists")),
    }
}

pub async fn delete(id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    sqlx::query("DELETE FROM recipe_tags WHERE tag_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    let result = sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;
    if result.rows_affected() == 0 {
        return Err(ErrorKind::NotFound.new("No tag exists with specified id"));
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;
    Ok(())
}
