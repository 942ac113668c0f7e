//! JSON shapes returned by the HTTP layer.
//!
//! Every builder takes the caller's [`CallerRelations`] explicitly, so the
//! `is_favorited`, `is_in_shopping_cart` and `is_subscribed` flags never
//! depend on request-global state. The `load_*` helpers fetch everything a
//! batch of rows needs in a fixed number of queries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Pool, Postgres};

use crate::{
    actions::{
        follows::Subscription,
        recipes,
        relations::CallerRelations,
        users,
    },
    error::{Error, ErrorKind},
    form::RecipeImage,
    jwt::SessionData,
    schema::{Composition, Id, Recipe, Tag, User},
};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CompositionView {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeView {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<CompositionView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

/// Short form used by toggles and subscription listings.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeSummary {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub user: UserView,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: i64,
}

pub fn user_view(user: &User, relations: &CallerRelations) -> UserView {
    UserView {
        email: user.email.clone(),
        id: user.id,
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        is_subscribed: relations.is_subscribed(user.id),
    }
}

pub fn composition_view(composition: Composition) -> CompositionView {
    CompositionView {
        id: composition.ingredient_id,
        name: composition.name,
        measurement_unit: composition.measurement_unit,
        amount: composition.amount,
    }
}

pub fn recipe_summary(recipe: &Recipe) -> RecipeSummary {
    RecipeSummary {
        id: recipe.id,
        name: recipe.name.clone(),
        image: RecipeImage::to_data_uri(&recipe.image_format, &recipe.image),
        cooking_time: recipe.cooking_time,
    }
}

pub fn recipe_view(
    recipe: Recipe,
    author: &User,
    tags: Vec<Tag>,
    compositions: Vec<Composition>,
    relations: &CallerRelations,
) -> RecipeView {
    RecipeView {
        id: recipe.id,
        tags,
        author: user_view(author, relations),
        ingredients: compositions.into_iter().map(composition_view).collect(),
        is_favorited: relations.is_favorited(recipe.id),
        is_in_shopping_cart: relations.is_in_shopping_cart(recipe.id),
        image: RecipeImage::to_data_uri(&recipe.image_format, &recipe.image),
        name: recipe.name,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        pub_date: recipe.pub_date,
    }
}

pub fn subscription_view(subscription: &Subscription, relations: &CallerRelations) -> SubscriptionView {
    SubscriptionView {
        user: user_view(&subscription.author, relations),
        recipes: subscription.recipes.iter().map(recipe_summary).collect(),
        recipes_count: subscription.recipes_count,
    }
}

pub async fn load_user_views(
    users: &[User],
    session: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<Vec<UserView>, Error> {
    let ids: Vec<Id> = users.iter().map(|u| u.id).collect();
    let relations = CallerRelations::for_caller(session, &[], &ids, pool).await?;

    Ok(users.iter().map(|u| user_view(u, &relations)).collect())
}

/// Builds full views for a batch of recipes, preserving their order.
pub async fn load_recipe_views(
    recipes: Vec<Recipe>,
    session: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeView>, Error> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let recipe_ids: Vec<Id> = recipes.iter().map(|r| r.id).collect();
    let mut author_ids: Vec<Id> = recipes.iter().map(|r| r.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors: HashMap<Id, User> = users::find_by_ids(&author_ids, pool)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut tags: HashMap<Id, Vec<Tag>> = HashMap::new();
    for row in recipes::list_recipe_tags(&recipe_ids, pool).await? {
        tags.entry(row.recipe_id).or_default().push(Tag::from(row));
    }

    let mut compositions: HashMap<Id, Vec<Composition>> = HashMap::new();
    for row in recipes::list_compositions(&recipe_ids, pool).await? {
        compositions.entry(row.recipe_id).or_default().push(row);
    }

    let relations = CallerRelations::for_caller(session, &recipe_ids, &author_ids, pool).await?;

    recipes
        .into_iter()
        .map(|recipe| {
            let author = authors.get(&recipe.author_id).ok_or_else(|| {
                log::error!("> Recipe {} has no author row", recipe.id);
                ErrorKind::InternalServerError.default()
            })?;
            let recipe_tags = tags.remove(&recipe.id).unwrap_or_default();
            let recipe_compositions = compositions.remove(&recipe.id).unwrap_or_default();

            Ok(recipe_view(
                recipe,
                author,
                recipe_tags,
                recipe_compositions,
                &relations,
            ))
        })
        .collect()
}

pub async fn load_recipe_view(
    recipe: Recipe,
    session: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, Error> {
    load_recipe_views(vec![recipe], session, pool)
        .await?
        .pop()
        .ok_or_else(|| ErrorKind::InternalServerError.default())
}

pub async fn load_subscription_views(
    subscriptions: &[Subscription],
    session: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<Vec<SubscriptionView>, Error> {
    let author_ids: Vec<Id> = subscriptions.iter().map(|s| s.author.id).collect();
    let relations = CallerRelations::for_caller(session, &[], &author_ids, pool).await?;

    Ok(subscriptions
        .iter()
        .map(|s| subscription_view(s, &relations))
        .collect())
}
