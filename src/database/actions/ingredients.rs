use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{Error, ErrorKind, QueryError},
    form::IngredientForm,
    import::{ImportReport, ImportedIngredient},
    schema::{Id, Ingredient},
    IMPORT_CHUNK_SIZE,
};

pub async fn find_by_id(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Escapes LIKE wildcards so user input only ever matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive prefix search, ordered by name.
pub async fn find_matching(
    name_prefix: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let pattern = format!("{}%", escape_like(name_prefix.unwrap_or("").trim()));

    let rows: Vec<Ingredient> = sqlx::query_as(
        "SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name, measurement_unit",
    )
    .bind(pattern)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Get-or-create on (name, measurement_unit).
pub async fn save(form: IngredientForm, pool: &Pool<Postgres>) -> Result<Ingredient, Error> {
    let created: Option<Ingredient> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT (name, measurement_unit) DO NOTHING RETURNING *;
    ",
    )
    .bind(&form.name)
    .bind(&form.measurement_unit)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    if let Some(ingredient) = created {
        return Ok(ingredient);
    }

    let existing: Ingredient =
        sqlx::query_as("SELECT * FROM ingredients WHERE name = $1 AND measurement_unit = $2")
            .bind(&form.name)
            .bind(&form.measurement_unit)
            .fetch_one(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(existing)
}

/// Refuses while any recipe still uses the ingredient.
pub async fn delete(id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let used: (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM compositions WHERE ingredient_id = $1)")
            .bind(id)
            .fetch_one(&mut *tr)
            .await
            .map_err(QueryError::from)?;
    if used.0 {
        return Err(ErrorKind::Conflict.new("Ingredient is used by a recipe"));
    }

    let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;
    if result.rows_affected() == 0 {
        return Err(ErrorKind::NotFound.new("No ingredient exists with specified id"));
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;
    Ok(())
}

/// Bulk get-or-create. Rows already present are counted as skipped, so
/// importing the same file twice inserts nothing the second time.
pub async fn import(
    ingredients: &[ImportedIngredient],
    pool: &Pool<Postgres>,
) -> Result<ImportReport, Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let mut report = ImportReport::default();
    for chunk in ingredients.chunks(IMPORT_CHUNK_SIZE) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");

        query_builder.push_values(chunk.iter(), |mut b, ingredient| {
            b.push_bind(ingredient.name.as_str())
                .push_bind(ingredient.measurement_unit.as_str());
        });
        query_builder.push(" ON CONFLICT (name, measurement_unit) DO NOTHING");

        let result = query_builder
            .build()
            .execute(&mut *tr)
            .await
            .map_err(QueryError::from)?;

        report.inserted += result.rows_affected();
        report.skipped += chunk.len() as u64 - result.rows_affected();
        log::trace!("> Imported chunk of {} ingredients", chunk.len());
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;
    log::info!(
        "Ingredient import finished: {} inserted, {} skipped",
        report.inserted,
        report.skipped
    );

    Ok(report)
}
