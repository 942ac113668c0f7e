use std::collections::BTreeSet;

use crate::{
    authentication::permissions::ActionType,
    criteria::RecipeCriteria,
    error::{Error, ErrorKind, QueryError},
    form::{IngredientEntry, RecipeDraft},
    jwt::SessionData,
    pagination::{Page, PageRequest},
    schema::{Composition, Id, LinkedRecipeTag, Recipe, RecipeRow},
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

pub async fn find_by_id(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Recipe, Error> {
    find_by_id(id, pool)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("No recipe exists with specified id"))
}

/// Loads a recipe the session is allowed to modify: its own, or any for admins.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let recipe = get_recipe(id, pool).await?;

    match session.authenticate(ActionType::ManageAllRecipes) {
        Ok(_) => Ok(recipe),
        Err(_) => {
            if recipe.author_id != session.user_id {
                Err(ErrorKind::Forbidden.default())
            } else {
                Ok(recipe)
            }
        }
    }
}

pub async fn find_matching(
    criteria: &RecipeCriteria,
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<Page<Recipe>, Error> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r");
    criteria.push_where(&mut query);
    query
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows: Vec<RecipeRow> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None => count_matching(criteria, pool).await?,
    };

    Ok(Page::from_rows(
        rows.into_iter().map(Recipe::from).collect(),
        total_count,
        page,
    ))
}

async fn count_matching(criteria: &RecipeCriteria, pool: &Pool<Postgres>) -> Result<i64, Error> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
    criteria.push_where(&mut query);

    let count: (i64,) = query
        .build_query_as()
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}

/// Newest first.
pub async fn find_by_authors(
    author_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<Recipe>, Error> {
    let rows: Vec<Recipe> = sqlx::query_as(
        "SELECT * FROM recipes WHERE author_id = ANY($1) ORDER BY pub_date DESC, id DESC",
    )
    .bind(author_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn list_compositions(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<Composition>, Error> {
    let rows: Vec<Composition> = sqlx::query_as("
        SELECT c.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name, i.measurement_unit AS measurement_unit, c.amount AS amount
        FROM compositions c
        INNER JOIN ingredients i ON i.id = c.ingredient_id
        WHERE c.recipe_id = ANY($1)
        ORDER BY c.id
    ")
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn list_recipe_tags(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<LinkedRecipeTag>, Error> {
    let rows: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id AS recipe_id, t.id AS id, t.name AS name, t.color AS color, t.slug AS slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.name
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Persists a new recipe with its tags and compositions in one transaction.
pub async fn create(
    author_id: Id,
    draft: RecipeDraft,
    pool: &Pool<Postgres>,
) -> Result<Id, Error> {
    let image = draft
        .image
        .ok_or_else(|| ErrorKind::InvalidRequest.new("This field is required").on("image"))?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let exists: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM recipes WHERE name = $1 AND text = $2 AND cooking_time = $3)",
    )
    .bind(&draft.name)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;
    if exists.0 {
        return Err(ErrorKind::InvalidRequest.new("This recipe already exists"));
    }

    ensure_tags_exist(&draft.tags, &mut *tr).await?;
    ensure_ingredients_exist(&draft.ingredients, &mut *tr).await?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, image_format, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&draft.name)
    .bind(image.bytes)
    .bind(image.format)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    insert_tags(id.0, &draft.tags, &mut *tr).await?;
    insert_compositions(id.0, &draft.ingredients, &mut *tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;
    log::info!("User {author_id} created recipe {}", id.0);

    Ok(id.0)
}

/// Replaces fields, tags and compositions wholesale. A draft without an
/// image keeps the stored one.
pub async fn update(id: Id, draft: RecipeDraft, pool: &Pool<Postgres>) -> Result<(), Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    ensure_tags_exist(&draft.tags, &mut *tr).await?;
    ensure_ingredients_exist(&draft.ingredients, &mut *tr).await?;

    let (image, image_format) = match draft.image {
        Some(image) => (Some(image.bytes), Some(image.format)),
        None => (None, None),
    };

    let result = sqlx::query(
        "
        UPDATE recipes SET
        name = $1,
        text = $2,
        cooking_time = $3,
        image = COALESCE($4, image),
        image_format = COALESCE($5, image_format)
        WHERE id = $6
    ",
    )
    .bind(&draft.name)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .bind(image)
    .bind(image_format)
    .bind(id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;
    if result.rows_affected() == 0 {
        return Err(ErrorKind::NotFound.new("No recipe exists with specified id"));
    }

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM compositions WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    insert_tags(id, &draft.tags, &mut *tr).await?;
    insert_compositions(id, &draft.ingredients, &mut *tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;
    log::info!("Updated recipe {id}");

    Ok(())
}

pub async fn delete(id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    delete_in(id, &mut *tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;
    log::info!("Deleted recipe {id}");

    Ok(())
}

/// Removes a recipe with its compositions, tag links, favorites and cart rows.
/// The caller owns the transaction.
pub async fn delete_in(id: Id, conn: &mut PgConnection) -> Result<(), Error> {
    for statement in [
        "DELETE FROM compositions WHERE recipe_id = $1",
        "DELETE FROM recipe_tags WHERE recipe_id = $1",
        "DELETE FROM favorites WHERE recipe_id = $1",
        "DELETE FROM shopping_cart WHERE recipe_id = $1",
    ] {
        sqlx::query(statement)
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;
    if result.rows_affected() == 0 {
        return Err(ErrorKind::NotFound.new("No recipe exists with specified id"));
    }

    Ok(())
}

async fn ensure_tags_exist(tags: &[Id], conn: &mut PgConnection) -> Result<(), Error> {
    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(tags)
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let found: BTreeSet<Id> = found.into_iter().map(|row| row.0).collect();
    match tags.iter().find(|id| !found.contains(*id)) {
        Some(missing) => Err(ErrorKind::InvalidRequest
            .new(&format!("Tag {missing} does not exist"))
            .on("tags")),
        None => Ok(()),
    }
}

async fn ensure_ingredients_exist(
    entries: &[IngredientEntry],
    conn: &mut PgConnection,
) -> Result<(), Error> {
    let ids: Vec<Id> = entries.iter().map(|entry| entry.id).collect();
    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let found: BTreeSet<Id> = found.into_iter().map(|row| row.0).collect();
    match ids.iter().find(|id| !found.contains(*id)) {
        Some(missing) => Err(ErrorKind::InvalidRequest
            .new(&format!("Ingredient {missing} does not exist"))
            .on("ingredients")),
        None => Ok(()),
    }
}

async fn insert_tags(recipe_id: Id, tags: &[Id], conn: &mut PgConnection) -> Result<(), Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");

    query_builder.push_values(tags.iter(), |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(*tag_id);
    });

    query_builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

async fn insert_compositions(
    recipe_id: Id,
    entries: &[IngredientEntry],
    conn: &mut PgConnection,
) -> Result<(), Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO compositions (recipe_id, ingredient_id, amount) ");

    query_builder.push_values(entries.iter(), |mut b, entry| {
        b.push_bind(recipe_id)
            .push_bind(entry.id)
            .push_bind(entry.amount);
    });

    query_builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}
