//! Store-backed behaviour. Needs a disposable PostgreSQL database:
//!
//! DATABASE_URL=postgres://localhost/foodgram_test cargo test -- --ignored

use std::{env, future::Future};

use foodgram::{
    actions::{
        follows, ingredients, recipes,
        relations::{self, CallerRelations, Relation},
        shopping_cart, tags, users,
    },
    criteria::{RecipeCriteria, RecipeFilter},
    form::{IngredientEntry, IngredientForm, RecipeForm, SetPasswordForm, TagForm, UserForm},
    import::parse_ingredients,
    jwt::{SessionData, SessionKeys},
    pagination::PageRequest,
    schema::{Id, Ingredient, Tag, User},
    views, ErrorKind,
};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tokio::sync::Mutex;

static DATABASE: Mutex<()> = Mutex::const_new(());

const IMAGE: &str = "data:image/png;base64,iVBORw0KGgo=";

async fn reset_schema(pool: &Pool<Postgres>) {
    sqlx::query("DROP SCHEMA public CASCADE")
        .execute(pool)
        .await
        .expect("Failed to delete schema");
    sqlx::query("CREATE SCHEMA public")
        .execute(pool)
        .await
        .expect("Failed to create schema");
}

async fn database_test<F, Fut>(func: F) -> Fut::Output
where
    F: FnOnce(Pool<Postgres>) -> Fut,
    Fut: Future,
{
    let _guard = DATABASE.lock().await;

    let db_url = env::var("DATABASE_URL").expect("Missing database URL");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .expect("Failed to connect to database");

    reset_schema(&pool).await;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let out = func(pool.clone()).await;

    reset_schema(&pool).await;
    out
}

async fn user(name: &str, pool: &Pool<Postgres>) -> User {
    let form = UserForm {
        email: format!("{name}@example.com"),
        username: name.to_string(),
        first_name: String::from("Test"),
        last_name: String::from("Cook"),
        password: String::from("correct horse battery staple"),
    };
    users::register(form.validate().unwrap(), pool).await.unwrap()
}

fn session(user: &User) -> SessionData {
    SessionData {
        user_id: user.id,
        username: user.username.clone(),
        role: user.role,
    }
}

async fn tag(slug: &str, color: &str, pool: &Pool<Postgres>) -> Tag {
    let form = TagForm {
        name: slug.to_uppercase(),
        color: color.to_string(),
        slug: slug.to_string(),
    };
    tags::save(form.validate().unwrap(), pool).await.unwrap()
}

async fn ingredient(name: &str, unit: &str, pool: &Pool<Postgres>) -> Ingredient {
    let form = IngredientForm {
        name: name.to_string(),
        measurement_unit: unit.to_string(),
    };
    ingredients::save(form.validate().unwrap(), pool).await.unwrap()
}

fn recipe_form(name: &str, tags: &[Id], ingredients: &[(Id, i32)]) -> RecipeForm {
    RecipeForm {
        name: name.to_string(),
        text: format!("How to make {name}"),
        cooking_time: 15,
        image: Some(IMAGE.to_string()),
        tags: tags.to_vec(),
        ingredients: ingredients
            .iter()
            .map(|&(id, amount)| IngredientEntry { id, amount })
            .collect(),
        upload: None,
    }
}

async fn recipe(
    author: &User,
    name: &str,
    tags: &[Id],
    ingredients: &[(Id, i32)],
    pool: &Pool<Postgres>,
) -> Id {
    let draft = recipe_form(name, tags, ingredients).validate(true).unwrap();
    recipes::create(author.id, draft, pool).await.unwrap()
}

async fn count(sql: &str, pool: &Pool<Postgres>) -> i64 {
    let row: (i64,) = sqlx::query_as(sql).fetch_one(pool).await.unwrap();
    row.0
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn favorite_twice_conflicts() {
    database_test(|pool| async move {
        let cook = user("cook", &pool).await;
        let breakfast = tag("breakfast", "#E26C2D", &pool).await;
        let eggs = ingredient("eggs", "pcs", &pool).await;
        let omelette = recipe(&cook, "Omelette", &[breakfast.id], &[(eggs.id, 3)], &pool).await;

        relations::add(Relation::Favorite, cook.id, omelette, &pool)
            .await
            .unwrap();
        let error = relations::add(Relation::Favorite, cook.id, omelette, &pool)
            .await
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::Conflict);
        assert_eq!(count("SELECT COUNT(*) FROM favorites", &pool).await, 1);
    })
    .await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn removing_an_absent_relation_is_not_found() {
    database_test(|pool| async move {
        let cook = user("cook", &pool).await;
        let breakfast = tag("breakfast", "#E26C2D", &pool).await;
        let eggs = ingredient("eggs", "pcs", &pool).await;
        let omelette = recipe(&cook, "Omelette", &[breakfast.id], &[(eggs.id, 3)], &pool).await;

        for relation in [Relation::Favorite, Relation::ShoppingCart] {
            relations::add(relation, cook.id, omelette, &pool).await.unwrap();
            assert!(relations::exists(relation, cook.id, omelette, &pool).await.unwrap());

            relations::remove(relation, cook.id, omelette, &pool).await.unwrap();
            assert!(!relations::exists(relation, cook.id, omelette, &pool).await.unwrap());

            let error = relations::remove(relation, cook.id, omelette, &pool)
                .await
                .unwrap_err();
            assert_eq!(error.kind, ErrorKind::NotFound);
        }

        let error = relations::add(Relation::ShoppingCart, cook.id, omelette + 100, &pool)
            .await
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::NotFound);
    })
    .await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn follow_rules() {
    database_test(|pool| async move {
        let alice = user("alice", &pool).await;
        let bob = user("bob", &pool).await;

        let error = follows::follow(alice.id, alice.id, &pool).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::Conflict);
        assert!(!follows::is_following(alice.id, alice.id, &pool).await.unwrap());

        follows::follow(alice.id, bob.id, &pool).await.unwrap();
        let error = follows::follow(alice.id, bob.id, &pool).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::Conflict);
        assert_eq!(count("SELECT COUNT(*) FROM follows", &pool).await, 1);

        follows::unfollow(alice.id, bob.id, &pool).await.unwrap();
        let error = follows::unfollow(alice.id, bob.id, &pool).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::NotFound);

        let error = follows::follow(alice.id, bob.id + 100, &pool).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::NotFound);
    })
    .await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn subscriptions_truncate_recipes() {
    database_test(|pool| async move {
        let alice = user("alice", &pool).await;
        let bob = user("bob", &pool).await;
        let lunch = tag("lunch", "#49B64E", &pool).await;
        let rice = ingredient("rice", "g", &pool).await;
        for name in ["Pilaf", "Risotto", "Paella"] {
            recipe(&bob, name, &[lunch.id], &[(rice.id, 100)], &pool).await;
        }

        follows::follow(alice.id, bob.id, &pool).await.unwrap();
        let page = follows::find_matching(alice.id, PageRequest::new(1, 6), Some(2), &pool)
            .await
            .unwrap();

        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].author.id, bob.id);
        assert_eq!(page.results[0].recipes.len(), 2);
        assert_eq!(page.results[0].recipes_count, 3);

        let views = views::load_subscription_views(&page.results, Some(&session(&alice)), &pool)
            .await
            .unwrap();
        assert!(views[0].user.is_subscribed);
    })
    .await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn failed_update_keeps_compositions() {
    database_test(|pool| async move {
        let cook = user("cook", &pool).await;
        let breakfast = tag("breakfast", "#E26C2D", &pool).await;
        let eggs = ingredient("eggs", "pcs", &pool).await;
        let milk = ingredient("milk", "ml", &pool).await;
        let id = recipe(
            &cook,
            "Omelette",
            &[breakfast.id],
            &[(eggs.id, 3), (milk.id, 50)],
            &pool,
        )
        .await;

        let mut form = recipe_form("Omelette", &[breakfast.id], &[(eggs.id, 4), (milk.id + 100, 1)]);
        form.image = None;
        let error = recipes::update(id, form.validate(false).unwrap(), &pool)
            .await
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidRequest);

        let compositions = recipes::list_compositions(&[id], &pool).await.unwrap();
        let amounts: Vec<(Id, i32)> = compositions
            .iter()
            .map(|c| (c.ingredient_id, c.amount))
            .collect();
        assert_eq!(amounts, vec![(eggs.id, 3), (milk.id, 50)]);

        let stored = recipes::get_recipe(id, &pool).await.unwrap();
        assert!(!stored.image.is_empty());
    })
    .await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn repeated_ingredient_on_update_keeps_compositions() {
    database_test(|pool| async move {
        let cook = user("cook", &pool).await;
        let breakfast = tag("breakfast", "#E26C2D", &pool).await;
        let eggs = ingredient("eggs", "pcs", &pool).await;
        let milk = ingredient("milk", "ml", &pool).await;
        let id = recipe(
            &cook,
            "Omelette",
            &[breakfast.id],
            &[(eggs.id, 3), (milk.id, 50)],
            &pool,
        )
        .await;

        let mut form = recipe_form("Omelette", &[breakfast.id], &[(eggs.id, 4), (eggs.id, 2)]);
        form.image = None;
        let error = form.validate(false).unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidRequest);
        assert_eq!(error.field.as_deref(), Some("ingredients"));

        let compositions = recipes::list_compositions(&[id], &pool).await.unwrap();
        let amounts: Vec<(Id, i32)> = compositions
            .iter()
            .map(|c| (c.ingredient_id, c.amount))
            .collect();
        assert_eq!(amounts, vec![(eggs.id, 3), (milk.id, 50)]);
    })
    .await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_recipes_are_rejected() {
    database_test(|pool| async move {
        let cook = user("cook", &pool).await;
        let breakfast = tag("breakfast", "#E26C2D", &pool).await;
        let eggs = ingredient("eggs", "pcs", &pool).await;
        recipe(&cook, "Omelette", &[breakfast.id], &[(eggs.id, 3)], &pool).await;

        let draft = recipe_form("Omelette", &[breakfast.id], &[(eggs.id, 3)])
            .validate(true)
            .unwrap();
        let error = recipes::create(cook.id, draft, &pool).await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::InvalidRequest);
        assert_eq!(count("SELECT COUNT(*) FROM recipes", &pool).await, 1);
    })
    .await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn deleting_a_user_cascades() {
    database_test(|pool| async move {
        let alice = user("alice", &pool).await;
        let bob = user("bob", &pool).await;
        let breakfast = tag("breakfast", "#E26C2D", &pool).await;
        let eggs = ingredient("eggs", "pcs", &pool).await;
        let omelette = recipe(&alice, "Omelette", &[breakfast.id], &[(eggs.id, 3)], &pool).await;

        relations::add(Relation::Favorite, bob.id, omelette, &pool).await.unwrap();
        relations::add(Relation::ShoppingCart, bob.id, omelette, &pool).await.unwrap();
        follows::follow(bob.id, alice.id, &pool).await.unwrap();

        users::delete(alice.id, &pool).await.unwrap();

        assert!(recipes::find_by_id(omelette, &pool).await.unwrap().is_none());
        assert_eq!(count("SELECT COUNT(*) FROM favorites", &pool).await, 0);
        assert_eq!(count("SELECT COUNT(*) FROM shopping_cart", &pool).await, 0);
        assert_eq!(count("SELECT COUNT(*) FROM compositions", &pool).await, 0);
        assert_eq!(count("SELECT COUNT(*) FROM recipe_tags", &pool).await, 0);
        assert_eq!(count("SELECT COUNT(*) FROM follows", &pool).await, 0);
        assert!(users::find_by_id(bob.id, &pool).await.unwrap().is_some());

        let error = users::delete(alice.id, &pool).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::NotFound);
    })
    .await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn cart_export_sums_per_ingredient() {
    database_test(|pool| async move {
        let cook = user("cook", &pool).await;
        let baking = tag("baking", "#8775D2", &pool).await;
        let flour = ingredient("flour", "g", &pool).await;
        let sugar = ingredient("sugar", "g", &pool).await;
        let salt = ingredient("salt", "pinch", &pool).await;

        let bread = recipe(&cook, "Bread", &[baking.id], &[(flour.id, 500), (salt.id, 2)], &pool).await;
        let cake = recipe(
            &cook,
            "Cake",
            &[baking.id],
            &[(flour.id, 300), (sugar.id, 200), (salt.id, 1)],
            &pool,
        )
        .await;
        recipe(&cook, "Cookies", &[baking.id], &[(sugar.id, 999)], &pool).await;

        relations::add(Relation::ShoppingCart, cook.id, bread, &pool).await.unwrap();
        relations::add(Relation::ShoppingCart, cook.id, cake, &pool).await.unwrap();

        let list = shopping_cart::export(cook.id, &pool).await.unwrap();
        let totals: Vec<(&str, i64, &str)> = list
            .lines
            .iter()
            .map(|l| (l.name.as_str(), l.total_amount, l.measurement_unit.as_str()))
            .collect();

        assert_eq!(
            totals,
            vec![("flour", 800, "g"), ("salt", 3, "pinch"), ("sugar", 200, "g")]
        );
        assert!(list.render().contains("flour  - 800g\n"));

        let other = user("other", &pool).await;
        assert!(shopping_cart::export(other.id, &pool).await.unwrap().is_empty());
    })
    .await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn import_is_idempotent() {
    database_test(|pool| async move {
        let parsed = parse_ingredients("flour,g\nsugar,g\nsalt,pinch\nflour,g\n").unwrap();

        let first = ingredients::import(&parsed, &pool).await.unwrap();
        assert_eq!(first.inserted, 3);
        assert_eq!(first.skipped, 0);

        let second = ingredients::import(&parsed, &pool).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 3);

        let found = ingredients::find_matching(Some("FL"), &pool).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "flour");
    })
    .await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn referenced_ingredients_cannot_be_deleted() {
    database_test(|pool| async move {
        let cook = user("cook", &pool).await;
        let breakfast = tag("breakfast", "#E26C2D", &pool).await;
        let eggs = ingredient("eggs", "pcs", &pool).await;
        let unused = ingredient("saffron", "g", &pool).await;
        recipe(&cook, "Omelette", &[breakfast.id], &[(eggs.id, 3)], &pool).await;

        let error = ingredients::delete(eggs.id, &pool).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::Conflict);

        ingredients::delete(unused.id, &pool).await.unwrap();
        assert!(ingredients::find_by_id(unused.id, &pool).await.unwrap().is_none());

        tags::delete(breakfast.id, &pool).await.unwrap();
        assert_eq!(count("SELECT COUNT(*) FROM recipe_tags", &pool).await, 0);
    })
    .await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn listing_filters_by_caller() {
    database_test(|pool| async move {
        let alice = user("alice", &pool).await;
        let bob = user("bob", &pool).await;
        let breakfast = tag("breakfast", "#E26C2D", &pool).await;
        let dinner = tag("dinner", "#A752C6", &pool).await;
        let eggs = ingredient("eggs", "pcs", &pool).await;

        let omelette = recipe(&alice, "Omelette", &[breakfast.id], &[(eggs.id, 3)], &pool).await;
        recipe(&bob, "Frittata", &[dinner.id], &[(eggs.id, 6)], &pool).await;
        relations::add(Relation::Favorite, bob.id, omelette, &pool).await.unwrap();

        let filter = RecipeFilter {
            is_favorited: Some(true),
            ..RecipeFilter::default()
        };
        let caller = session(&bob);
        let criteria = RecipeCriteria::from_filter(filter.clone(), Some(&caller));
        let page = recipes::find_matching(&criteria, PageRequest::new(1, 6), &pool)
            .await
            .unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].id, omelette);

        let anonymous = RecipeCriteria::from_filter(filter, None);
        let page = recipes::find_matching(&anonymous, PageRequest::new(1, 6), &pool)
            .await
            .unwrap();
        assert_eq!(page.count, 2);

        let by_tag = RecipeCriteria::from_filter(
            RecipeFilter {
                tags: vec![String::from("dinner")],
                ..RecipeFilter::default()
            },
            None,
        );
        let page = recipes::find_matching(&by_tag, PageRequest::new(1, 6), &pool)
            .await
            .unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].author_id, bob.id);

        let recipe = recipes::get_recipe(omelette, &pool).await.unwrap();
        let view = views::load_recipe_view(recipe, Some(&caller), &pool)
            .await
            .unwrap();
        assert!(view.is_favorited);
        assert!(!view.is_in_shopping_cart);
        assert_eq!(view.tags[0].slug, "breakfast");
        assert_eq!(view.ingredients[0].amount, 3);

        let relations = CallerRelations::for_caller(None, &[omelette], &[alice.id], &pool)
            .await
            .unwrap();
        assert!(!relations.is_favorited(omelette));
    })
    .await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn login_issues_a_verifiable_token() {
    database_test(|pool| async move {
        let cook = user("cook", &pool).await;
        let keys = SessionKeys::new("test-secret", 1).unwrap();

        let token = users::login("COOK@example.com", "correct horse battery staple", &keys, &pool)
            .await
            .unwrap();
        let claims = keys.verify_jwt_session(&token).unwrap();
        assert_eq!(claims.user_id, cook.id);

        let error = users::login("cook@example.com", "wrong", &keys, &pool)
            .await
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidRequest);

        let form = UserForm {
            email: String::from("cook@example.com"),
            username: String::from("another"),
            first_name: String::from("A"),
            last_name: String::from("B"),
            password: String::from("secret"),
        };
        let error = users::register(form.validate().unwrap(), &pool)
            .await
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::Conflict);
    })
    .await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn password_change_needs_the_current_password() {
    database_test(|pool| async move {
        let cook = user("cook", &pool).await;
        let keys = SessionKeys::new("test-secret", 1).unwrap();

        let wrong = SetPasswordForm {
            current_password: String::from("not it"),
            new_password: String::from("new secret"),
        };
        let error = users::set_password(cook.id, wrong.validate().unwrap(), &pool)
            .await
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidRequest);
        assert_eq!(error.field.as_deref(), Some("current_password"));

        let form = SetPasswordForm {
            current_password: String::from("correct horse battery staple"),
            new_password: String::from("new secret"),
        };
        users::set_password(cook.id, form.validate().unwrap(), &pool)
            .await
            .unwrap();

        assert!(users::login("cook@example.com", "new secret", &keys, &pool)
            .await
            .is_ok());
        let error = users::login("cook@example.com", "correct horse battery staple", &keys, &pool)
            .await
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidRequest);
    })
    .await;
}
