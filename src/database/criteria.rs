use sqlx::{Postgres, QueryBuilder};

use crate::{error::TypeError, form::Form, jwt::SessionData, schema::Id};

/// A single condition a recipe must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipePredicate {
    Author(Id),
    /// Matches when the recipe carries at least one of the slugs.
    AnyTag(Vec<String>),
    FavoritedBy(Id),
    InCartOf(Id),
}

impl RecipePredicate {
    fn push_sql(&self, query: &mut QueryBuilder<'_, Postgres>) {
        match self {
            RecipePredicate::Author(author_id) => {
                query.push("r.author_id = ").push_bind(*author_id);
            }
            RecipePredicate::AnyTag(slugs) => {
                query
                    .push(
                        "EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                         WHERE rt.recipe_id = r.id AND t.slug = ANY(",
                    )
                    .push_bind(slugs.clone())
                    .push("))");
            }
            RecipePredicate::FavoritedBy(user_id) => {
                query
                    .push("EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                    .push_bind(*user_id)
                    .push(")");
            }
            RecipePredicate::InCartOf(user_id) => {
                query
                    .push(
                        "EXISTS (SELECT 1 FROM shopping_cart s WHERE s.recipe_id = r.id AND s.user_id = ",
                    )
                    .push_bind(*user_id)
                    .push(")");
            }
        }
    }
}

/// Recipe listing filters as they arrive from a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    pub tags: Vec<String>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
}

impl RecipeFilter {
    pub fn from_form(form: &Form) -> Result<Self, TypeError> {
        Ok(Self {
            author: form.get_number("author")?,
            tags: form.get_all("tags"),
            is_favorited: form.get_bool("is_favorited")?,
            is_in_shopping_cart: form.get_bool("is_in_shopping_cart")?,
        })
    }
}

/// Conjunction of predicates. An empty set matches every recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeCriteria {
    predicates: Vec<RecipePredicate>,
}

impl RecipeCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, predicate: RecipePredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Caller-relative flags are ignored for anonymous callers, and a `false`
    /// flag never narrows the listing.
    pub fn from_filter(filter: RecipeFilter, caller: Option<&SessionData>) -> Self {
        let mut criteria = Self::new();

        if let Some(author) = filter.author {
            criteria = criteria.and(RecipePredicate::Author(author));
        }
        if !filter.tags.is_empty() {
            criteria = criteria.and(RecipePredicate::AnyTag(filter.tags));
        }
        if let Some(caller) = caller {
            if filter.is_favorited == Some(true) {
                criteria = criteria.and(RecipePredicate::FavoritedBy(caller.user_id));
            }
            if filter.is_in_shopping_cart == Some(true) {
                criteria = criteria.and(RecipePredicate::InCartOf(caller.user_id));
            }
        }

        criteria
    }

    pub fn predicates(&self) -> &[RecipePredicate] {
        &self.predicates
    }

    /// Appends ` WHERE ...` (or nothing) to a query selecting from `recipes r`.
    pub fn push_where(&self, query: &mut QueryBuilder<'_, Postgres>) {
        for (i, predicate) in self.predicates.iter().enumerate() {
            query.push(if i == 0 { " WHERE " } else { " AND " });
            predicate.push_sql(query);
        }
    }
}
