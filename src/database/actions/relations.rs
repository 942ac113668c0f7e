use std::collections::HashSet;

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{Error, ErrorKind, QueryError},
    jwt::SessionData,
    schema::Id,
};

use super::recipes;

/// The two per-user recipe toggles. Both tables share the
/// (user_id, recipe_id) shape and a unique constraint over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Favorite,
    ShoppingCart,
}

impl Relation {
    fn table(self) -> &'static str {
        match self {
            Relation::Favorite => "favorites",
            Relation::ShoppingCart => "shopping_cart",
        }
    }

    fn already_present(self) -> &'static str {
        match self {
            Relation::Favorite => "Recipe is already in favorites",
            Relation::ShoppingCart => "Recipe is already in the shopping cart",
        }
    }

    fn missing(self) -> &'static str {
        match self {
            Relation::Favorite => "Recipe is not in favorites",
            Relation::ShoppingCart => "Recipe is not in the shopping cart",
        }
    }
}

pub async fn add(
    relation: Relation,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    recipes::get_recipe(recipe_id, pool).await?;

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("INSERT INTO ");
    query
        .push(relation.table())
        .push(" (user_id, recipe_id) VALUES (")
        .push_bind(user_id)
        .push(", ")
        .push_bind(recipe_id)
        .push(") ON CONFLICT DO NOTHING");

    let result = query
        .build()
        .execute(pool)
        .await
        .map_err(QueryError::from)?;
    if result.rows_affected() == 0 {
        return Err(ErrorKind::Conflict.new(relation.already_present()));
    }

    Ok(())
}

pub async fn remove(
    relation: Relation,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("DELETE FROM ");
    query
        .push(relation.table())
        .push(" WHERE user_id = ")
        .push_bind(user_id)
        .push(" AND recipe_id = ")
        .push_bind(recipe_id);

    let result = query
        .build()
        .execute(pool)
        .await
        .map_err(QueryError::from)?;
    if result.rows_affected() == 0 {
        return Err(ErrorKind::NotFound.new(relation.missing()));
    }

    Ok(())
}

pub async fn exists(
    relation: Relation,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let found = related_recipes(relation, user_id, &[recipe_id], pool).await?;
    Ok(found.contains(&recipe_id))
}

async fn related_recipes(
    relation: Relation,
    user_id: Id,
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, Error> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT recipe_id FROM ");
    query
        .push(relation.table())
        .push(" WHERE user_id = ")
        .push_bind(user_id)
        .push(" AND recipe_id = ANY(")
        .push_bind(recipe_ids)
        .push(")");

    let rows: Vec<(Id,)> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// What the caller has done with a batch of recipes and authors. Empty for
/// anonymous callers.
#[derive(Debug, Clone, Default)]
pub struct CallerRelations {
    pub favorited: HashSet<Id>,
    pub in_cart: HashSet<Id>,
    pub subscribed: HashSet<Id>,
}

impl CallerRelations {
    pub fn is_favorited(&self, recipe_id: Id) -> bool {
        self.favorited.contains(&recipe_id)
    }

    pub fn is_in_shopping_cart(&self, recipe_id: Id) -> bool {
        self.in_cart.contains(&recipe_id)
    }

    pub fn is_subscribed(&self, author_id: Id) -> bool {
        self.subscribed.contains(&author_id)
    }

    pub async fn for_caller(
        session: Option<&SessionData>,
        recipe_ids: &[Id],
        author_ids: &[Id],
        pool: &Pool<Postgres>,
    ) -> Result<Self, Error> {
        let session = match session {
            Some(s) => s,
            None => return Ok(Self::default()),
        };

        let (favorited, in_cart) = if recipe_ids.is_empty() {
            (HashSet::new(), HashSet::new())
        } else {
            (
                related_recipes(Relation::Favorite, session.user_id, recipe_ids, pool).await?,
                related_recipes(Relation::ShoppingCart, session.user_id, recipe_ids, pool).await?,
            )
        };

        let subscribed = if author_ids.is_empty() {
            HashSet::new()
        } else {
            let rows: Vec<(Id,)> = sqlx::query_as(
                "SELECT following_id FROM follows WHERE user_id = $1 AND following_id = ANY($2)",
            )
            .bind(session.user_id)
            .bind(author_ids)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;
            rows.into_iter().map(|(id,)| id).collect()
        };

        Ok(Self {
            favorited,
            in_cart,
            subscribed,
        })
    }
}
