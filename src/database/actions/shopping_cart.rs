use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    schema::{CartEntry, Id},
    shopping_list::ShoppingList,
};

/// Every composition row of every recipe in the user's cart, unaggregated.
pub async fn list_entries(user_id: Id, pool: &Pool<Postgres>) -> Result<Vec<CartEntry>, Error> {
    let rows: Vec<CartEntry> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, c.amount AS amount
        FROM shopping_cart s
        INNER JOIN compositions c ON c.recipe_id = s.recipe_id
        INNER JOIN ingredients i ON i.id = c.ingredient_id
        WHERE s.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn export(user_id: Id, pool: &Pool<Postgres>) -> Result<ShoppingList, Error> {
    let entries = list_entries(user_id, pool).await?;
    log::debug!("Exporting {} cart rows for user {user_id}", entries.len());
    Ok(ShoppingList::from_entries(entries))
}
