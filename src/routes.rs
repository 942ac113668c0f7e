use std::{convert::Infallible, slice};

use futures_util::TryStreamExt;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Pool, Postgres};
use warp::{
    filters::{body::BodyDeserializeError, multipart::FormData, BoxedFilter},
    http::StatusCode,
    hyper::body::Buf,
    reject::{LengthRequired, MethodNotAllowed, PayloadTooLarge, Rejection, UnsupportedMediaType},
    reply::Response,
    Filter, Reply,
};

use crate::{
    actions::{
        follows, ingredients,
        recipes,
        relations::{self, CallerRelations, Relation},
        shopping_cart, tags, users,
    },
    criteria::{RecipeCriteria, RecipeFilter},
    error::{Error, ErrorBody, ErrorKind},
    form::{
        Form, IngredientForm, LoginForm, RecipeForm, RecipeImage, SetPasswordForm, TagForm,
        UserForm,
    },
    jwt::{SessionData, SessionKeys},
    middleware::{with_possible_session, with_session},
    pagination::PageRequest,
    permissions::ActionType,
    schema::Id,
    shopping_list::ShoppingList,
    views, MAX_BODY_SIZE, RECIPE_COUNT_PER_PAGE, SHOPPING_LIST_FILENAME, USER_COUNT_PER_PAGE,
};

/// The whole `/api` tree, with errors rendered as JSON.
pub fn api(
    pool: Pool<Postgres>,
    keys: SessionKeys,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    warp::path("api")
        .and(
            user_routes(pool.clone(), keys.clone())
                .or(auth_routes(pool.clone(), keys.clone()))
                .unify()
                .or(tag_routes(pool.clone(), keys.clone()))
                .unify()
                .or(ingredient_routes(pool.clone(), keys.clone()))
                .unify()
                .or(recipe_routes(pool, keys))
                .unify(),
        )
        .recover(handle_rejection)
        .with(warp::log("foodgram::api"))
}

fn with_pool(
    pool: Pool<Postgres>,
) -> impl Filter<Extract = (Pool<Postgres>,), Error = Infallible> + Clone {
    warp::any().map(move || pool.clone())
}

fn with_keys(keys: SessionKeys) -> impl Filter<Extract = (SessionKeys,), Error = Infallible> + Clone {
    warp::any().map(move || keys.clone())
}

/// The raw query string, or an empty form when there is none.
fn with_form() -> impl Filter<Extract = (Form,), Error = Rejection> + Clone {
    warp::query::raw()
        .or(warp::any().map(String::new))
        .unify()
        .and_then(|raw: String| async move {
            Form::from_query(&raw).map_err(|e| Rejection::from(Error::from(e)))
        })
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

/// A recipe as a JSON object, or as `multipart/form-data` with a `recipe`
/// JSON part and an optional `image` file part.
fn recipe_body() -> impl Filter<Extract = (RecipeForm,), Error = Rejection> + Clone {
    let upload = warp::multipart::form()
        .max_length(MAX_BODY_SIZE)
        .and_then(|form: FormData| async move {
            read_recipe_upload(form).await.map_err(Rejection::from)
        });

    json_body().or(upload).unify()
}

async fn read_recipe_upload(form: FormData) -> Result<RecipeForm, Error> {
    let mut parts = std::pin::pin!(form);
    let mut recipe = None;
    let mut image = None;

    while let Some(part) = parts.try_next().await.map_err(malformed_upload)? {
        let name = part.name().to_string();
        let content_type = part.content_type().map(str::to_string);
        let bytes = part
            .stream()
            .try_fold(Vec::new(), |mut bytes, mut chunk| async move {
                bytes.extend_from_slice(&chunk.copy_to_bytes(chunk.remaining()));
                Ok(bytes)
            })
            .await
            .map_err(malformed_upload)?;

        match name.as_str() {
            "recipe" => recipe = Some(bytes),
            "image" => image = Some(RecipeImage::from_upload(content_type.as_deref(), bytes)?),
            _ => log::debug!("Ignoring upload part '{name}'"),
        }
    }

    RecipeForm::from_upload(recipe.as_deref(), image)
}

fn malformed_upload(e: warp::Error) -> Error {
    ErrorKind::InvalidRequest.new(&format!("Malformed upload: {e}"))
}

fn json<T: Serialize>(value: &T) -> Response {
    warp::reply::json(value).into_response()
}

fn created<T: Serialize>(value: &T) -> Response {
    warp::reply::with_status(warp::reply::json(value), StatusCode::CREATED).into_response()
}

fn no_content() -> Response {
    warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT).into_response()
}

fn user_routes(pool: Pool<Postgres>, keys: SessionKeys) -> BoxedFilter<(Response,)> {
    let register = warp::path!("users")
        .and(warp::post())
        .and(json_body())
        .and(with_pool(pool.clone()))
        .and_then(register_user);

    let list = warp::path!("users")
        .and(warp::get())
        .and(with_form())
        .and(with_possible_session(keys.clone()))
        .and(with_pool(pool.clone()))
        .and_then(list_users);

    let set_password = warp::path!("users" / "set_password")
        .and(warp::post())
        .and(with_session(keys.clone()))
        .and(json_body())
        .and(with_pool(pool.clone()))
        .and_then(set_password);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(keys.clone()))
        .and(with_pool(pool.clone()))
        .and_then(current_user);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(with_form())
        .and(with_session(keys.clone()))
        .and(with_pool(pool.clone()))
        .and_then(list_subscriptions);

    let profile = warp::path!("users" / Id)
        .and(warp::get())
        .and(with_possible_session(keys.clone()))
        .and(with_pool(pool.clone()))
        .and_then(get_profile);

    let subscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::post())
        .and(with_form())
        .and(with_session(keys.clone()))
        .and(with_pool(pool.clone()))
        .and_then(subscribe);

    let unsubscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(keys))
        .and(with_pool(pool))
        .and_then(unsubscribe);

    register
        .or(list)
        .unify()
        .or(set_password)
        .unify()
        .or(me)
        .unify()
        .or(subscriptions)
        .unify()
        .or(profile)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .boxed()
}

fn auth_routes(pool: Pool<Postgres>, keys: SessionKeys) -> BoxedFilter<(Response,)> {
    warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_keys(keys))
        .and(with_pool(pool))
        .and_then(login)
        .boxed()
}

fn tag_routes(pool: Pool<Postgres>, keys: SessionKeys) -> BoxedFilter<(Response,)> {
    let list = warp::path!("tags")
        .and(warp::get())
        .and(with_pool(pool.clone()))
        .and_then(list_tags);

    let detail = warp::path!("tags" / Id)
        .and(warp::get())
        .and(with_pool(pool.clone()))
        .and_then(get_tag);

    let create = warp::path!("tags")
        .and(warp::post())
        .and(with_session(keys.clone()))
        .and(json_body())
        .and(with_pool(pool.clone()))
        .and_then(create_tag);

    let delete = warp::path!("tags" / Id)
        .and(warp::delete())
        .and(with_session(keys))
        .and(with_pool(pool))
        .and_then(delete_tag);

    list.or(detail)
        .unify()
        .or(create)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

fn ingredient_routes(pool: Pool<Postgres>, keys: SessionKeys) -> BoxedFilter<(Response,)> {
    let list = warp::path!("ingredients")
        .and(warp::get())
        .and(with_form())
        .and(with_pool(pool.clone()))
        .and_then(list_ingredients);

    let detail = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(with_pool(pool.clone()))
        .and_then(get_ingredient);

    let create = warp::path!("ingredients")
        .and(warp::post())
        .and(with_session(keys.clone()))
        .and(json_body())
        .and(with_pool(pool.clone()))
        .and_then(create_ingredient);

    let delete = warp::path!("ingredients" / Id)
        .and(warp::delete())
        .and(with_session(keys))
        .and(with_pool(pool))
        .and_then(delete_ingredient);

    list.or(detail)
        .unify()
        .or(create)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

fn recipe_routes(pool: Pool<Postgres>, keys: SessionKeys) -> BoxedFilter<(Response,)> {
    let list = warp::path!("recipes")
        .and(warp::get())
        .and(with_form())
        .and(with_possible_session(keys.clone()))
        .and(with_pool(pool.clone()))
        .and_then(list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(keys.clone()))
        .and(recipe_body())
        .and(with_pool(pool.clone()))
        .and_then(create_recipe);

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(keys.clone()))
        .and(with_pool(pool.clone()))
        .and_then(download_shopping_cart);

    let detail = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(keys.clone()))
        .and(with_pool(pool.clone()))
        .and_then(get_recipe);

    let update = warp::path!("recipes" / Id)
        .and(warp::patch())
        .and(with_session(keys.clone()))
        .and(recipe_body())
        .and(with_pool(pool.clone()))
        .and_then(update_recipe);

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(with_session(keys.clone()))
        .and(with_pool(pool.clone()))
        .and_then(delete_recipe);

    let favorite = warp::path!("recipes" / Id / "favorite").map(|id: Id| (id, Relation::Favorite));
    let cart = warp::path!("recipes" / Id / "shopping_cart").map(|id: Id| (id, Relation::ShoppingCart));
    let relation = favorite.or(cart).unify().untuple_one();

    let add = relation
        .clone()
        .and(warp::post())
        .and(with_session(keys.clone()))
        .and(with_pool(pool.clone()))
        .and_then(add_relation);

    let remove = relation
        .and(warp::delete())
        .and(with_session(keys))
        .and(with_pool(pool))
        .and_then(remove_relation);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(detail)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(add)
        .unify()
        .or(remove)
        .unify()
        .boxed()
}

async fn register_user(form: UserForm, pool: Pool<Postgres>) -> Result<Response, Rejection> {
    let user = users::register(form.validate()?, &pool).await?;
    Ok(created(&views::user_view(&user, &CallerRelations::default())))
}

async fn list_users(
    form: Form,
    session: Option<SessionData>,
    pool: Pool<Postgres>,
) -> Result<Response, Rejection> {
    let request = PageRequest::from_form(&form, USER_COUNT_PER_PAGE).map_err(Error::from)?;
    let page = users::find_matching(request, &pool).await?;
    let results = views::load_user_views(&page.results, session.as_ref(), &pool).await?;

    Ok(json(&page.with_results(results)))
}

async fn current_user(session: SessionData, pool: Pool<Postgres>) -> Result<Response, Rejection> {
    let user = users::get_user(session.user_id, &pool).await?;
    Ok(json(&views::user_view(&user, &CallerRelations::default())))
}

async fn set_password(
    session: SessionData,
    form: SetPasswordForm,
    pool: Pool<Postgres>,
) -> Result<Response, Rejection> {
    users::set_password(session.user_id, form.validate()?, &pool).await?;
    Ok(no_content())
}

async fn get_profile(
    id: Id,
    session: Option<SessionData>,
    pool: Pool<Postgres>,
) -> Result<Response, Rejection> {
    let user = users::get_user(id, &pool).await?;
    let relations = CallerRelations::for_caller(session.as_ref(), &[], &[id], &pool).await?;

    Ok(json(&views::user_view(&user, &relations)))
}

async fn list_subscriptions(
    form: Form,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<Response, Rejection> {
    let request = PageRequest::from_form(&form, USER_COUNT_PER_PAGE).map_err(Error::from)?;
    let recipes_limit = form
        .get_number::<usize>("recipes_limit")
        .map_err(Error::from)?;

    let page = follows::find_matching(session.user_id, request, recipes_limit, &pool).await?;
    let results = views::load_subscription_views(&page.results, Some(&session), &pool).await?;

    Ok(json(&page.with_results(results)))
}

async fn subscribe(
    id: Id,
    form: Form,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRelations)?;
    let recipes_limit = form
        .get_number::<usize>("recipes_limit")
        .map_err(Error::from)?;

    follows::follow(session.user_id, id, &pool).await?;
    let author = users::get_user(id, &pool).await?;
    let subscription = follows::get_subscription(author, recipes_limit, &pool).await?;
    let view = views::load_subscription_views(slice::from_ref(&subscription), Some(&session), &pool)
        .await?
        .pop()
        .ok_or_else(|| ErrorKind::InternalServerError.default())?;

    Ok(created(&view))
}

async fn unsubscribe(id: Id, session: SessionData, pool: Pool<Postgres>) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRelations)?;
    follows::unfollow(session.user_id, id, &pool).await?;
    Ok(no_content())
}

#[derive(Serialize)]
struct TokenView {
    auth_token: String,
}

async fn login(
    form: LoginForm,
    keys: SessionKeys,
    pool: Pool<Postgres>,
) -> Result<Response, Rejection> {
    let auth_token = users::login(&form.email, &form.password, &keys, &pool).await?;
    Ok(json(&TokenView { auth_token }))
}

async fn list_tags(pool: Pool<Postgres>) -> Result<Response, Rejection> {
    Ok(json(&tags::find_matching(&pool).await?))
}

async fn get_tag(id: Id, pool: Pool<Postgres>) -> Result<Response, Rejection> {
    let tag = tags::find_by_id(id, &pool)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("No tag exists with specified id"))?;
    Ok(json(&tag))
}

async fn create_tag(
    session: SessionData,
    form: TagForm,
    pool: Pool<Postgres>,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageTags)?;
    let tag = tags::save(form.validate()?, &pool).await?;
    Ok(created(&tag))
}

async fn delete_tag(id: Id, session: SessionData, pool: Pool<Postgres>) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageTags)?;
    tags::delete(id, &pool).await?;
    Ok(no_content())
}

async fn list_ingredients(form: Form, pool: Pool<Postgres>) -> Result<Response, Rejection> {
    Ok(json(
        &ingredients::find_matching(form.get_str("name"), &pool).await?,
    ))
}

async fn get_ingredient(id: Id, pool: Pool<Postgres>) -> Result<Response, Rejection> {
    let ingredient = ingredients::find_by_id(id, &pool)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("No ingredient exists with specified id"))?;
    Ok(json(&ingredient))
}

async fn create_ingredient(
    session: SessionData,
    form: IngredientForm,
    pool: Pool<Postgres>,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageIngredients)?;
    let ingredient = ingredients::save(form.validate()?, &pool).await?;
    Ok(created(&ingredient))
}

async fn delete_ingredient(
    id: Id,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageIngredients)?;
    ingredients::delete(id, &pool).await?;
    Ok(no_content())
}

async fn list_recipes(
    form: Form,
    session: Option<SessionData>,
    pool: Pool<Postgres>,
) -> Result<Response, Rejection> {
    let filter = RecipeFilter::from_form(&form).map_err(Error::from)?;
    let request = PageRequest::from_form(&form, RECIPE_COUNT_PER_PAGE).map_err(Error::from)?;
    let criteria = RecipeCriteria::from_filter(filter, session.as_ref());

    let mut page = recipes::find_matching(&criteria, request, &pool).await?;
    let rows = std::mem::take(&mut page.results);
    let results = views::load_recipe_views(rows, session.as_ref(), &pool).await?;

    Ok(json(&page.with_results(results)))
}

async fn create_recipe(
    session: SessionData,
    form: RecipeForm,
    pool: Pool<Postgres>,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let draft = form.validate(true)?;

    let id = recipes::create(session.user_id, draft, &pool).await?;
    let recipe = recipes::get_recipe(id, &pool).await?;
    let view = views::load_recipe_view(recipe, Some(&session), &pool).await?;

    Ok(created(&view))
}

async fn get_recipe(
    id: Id,
    session: Option<SessionData>,
    pool: Pool<Postgres>,
) -> Result<Response, Rejection> {
    let recipe = recipes::get_recipe(id, &pool).await?;
    let view = views::load_recipe_view(recipe, session.as_ref(), &pool).await?;
    Ok(json(&view))
}

async fn update_recipe(
    id: Id,
    session: SessionData,
    form: RecipeForm,
    pool: Pool<Postgres>,
) -> Result<Response, Rejection> {
    recipes::get_recipe_mut(id, &session, &pool).await?;
    let draft = form.validate(false)?;

    recipes::update(id, draft, &pool).await?;
    let recipe = recipes::get_recipe(id, &pool).await?;
    let view = views::load_recipe_view(recipe, Some(&session), &pool).await?;

    Ok(json(&view))
}

async fn delete_recipe(id: Id, session: SessionData, pool: Pool<Postgres>) -> Result<Response, Rejection> {
    recipes::get_recipe_mut(id, &session, &pool).await?;
    recipes::delete(id, &pool).await?;
    Ok(no_content())
}

async fn add_relation(
    id: Id,
    relation: Relation,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRelations)?;
    relations::add(relation, session.user_id, id, &pool).await?;

    let recipe = recipes::get_recipe(id, &pool).await?;
    Ok(created(&views::recipe_summary(&recipe)))
}

async fn remove_relation(
    id: Id,
    relation: Relation,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRelations)?;
    relations::remove(relation, session.user_id, id, &pool).await?;
    Ok(no_content())
}

async fn download_shopping_cart(
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<Response, Rejection> {
    let list = shopping_cart::export(session.user_id, &pool).await?;
    Ok(shopping_list_reply(&list))
}

/// The rendered list as a `text/plain` attachment.
fn shopping_list_reply(list: &ShoppingList) -> Response {
    let reply = warp::reply::with_header(
        list.render(),
        "content-type",
        "text/plain; charset=utf-8",
    );
    let reply = warp::reply::with_header(
        reply,
        "content-disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    );
    reply.into_response()
}

fn message(status: StatusCode, errors: &str) -> (StatusCode, ErrorBody) {
    (
        status,
        ErrorBody {
            field: None,
            errors: errors.to_string(),
        },
    )
}

/// Renders every rejection as `{"errors": ...}` with a matching status.
pub async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(error) = rejection.find::<Error>() {
        (error.kind.status(), error.body())
    } else if rejection.is_not_found() {
        message(StatusCode::NOT_FOUND, "Not found")
    } else if let Some(e) = rejection.find::<BodyDeserializeError>() {
        message(StatusCode::BAD_REQUEST, &e.to_string())
    } else if rejection.find::<MethodNotAllowed>().is_some() {
        message(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else if rejection.find::<PayloadTooLarge>().is_some() {
        message(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large")
    } else if rejection.find::<LengthRequired>().is_some() {
        message(StatusCode::LENGTH_REQUIRED, "Content-Length is required")
    } else if rejection.find::<UnsupportedMediaType>().is_some() {
        message(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Expected a JSON body")
    } else {
        log::error!("Unhandled rejection: {rejection:?}");
        message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SHOPPING_LIST_TITLE;

    fn keys() -> SessionKeys {
        SessionKeys::new("test-secret", 1).unwrap()
    }

    #[tokio::test]
    async fn errors_render_as_json() {
        let reply = handle_rejection(Rejection::from(
            ErrorKind::Conflict.new("Recipe is already in favorites"),
        ))
        .await
        .unwrap()
        .into_response();

        assert_eq!(reply.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_paths_are_not_found() {
        let reply = handle_rejection(warp::reject::not_found())
            .await
            .unwrap()
            .into_response();

        assert_eq!(reply.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn query_string_is_optional() {
        let form = warp::test::request()
            .path("/api/recipes/")
            .filter(&with_form())
            .await
            .unwrap();
        assert_eq!(form.get_str("page"), None);

        let form = warp::test::request()
            .path("/api/recipes/?tags=breakfast&tags=lunch")
            .filter(&with_form())
            .await
            .unwrap();
        assert_eq!(form.get_all("tags"), vec!["breakfast", "lunch"]);
    }

    #[tokio::test]
    async fn shopping_list_downloads_as_text_attachment() {
        let reply = shopping_list_reply(&ShoppingList::default());
        let headers = reply.headers();

        assert_eq!(reply.status(), StatusCode::OK);
        assert!(headers["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(
            headers["content-disposition"],
            "attachment; filename=\"shopping_cart.txt\""
        );

        let body = warp::hyper::body::to_bytes(reply.into_body()).await.unwrap();
        assert_eq!(&body[..], format!("{SHOPPING_LIST_TITLE}\n").as_bytes());
    }

    const RECIPE_JSON: &str = r#"{"name": "Toast", "text": "Toast it.", "cooking_time": 3, "tags": [1], "ingredients": [{"id": 1, "amount": 2}]}"#;

    #[tokio::test]
    async fn recipe_accepts_multipart_upload() {
        let body = format!(
            "--BOUNDARY\r\n\
             Content-Disposition: form-data; name=\"recipe\"\r\n\r\n\
             {RECIPE_JSON}\r\n\
             --BOUNDARY\r\n\
             Content-Disposition: form-data; name=\"image\"; filename=\"toast.png\"\r\n\
             Content-Type: image/png\r\n\r\n\
             not-really-a-png\r\n\
             --BOUNDARY--\r\n"
        );

        let form = warp::test::request()
            .method("POST")
            .header("content-type", "multipart/form-data; boundary=BOUNDARY")
            .body(body)
            .filter(&recipe_body())
            .await
            .unwrap();

        let image = form.validate(true).unwrap().image.unwrap();
        assert_eq!(image.format, "png");
        assert_eq!(image.bytes, b"not-really-a-png".to_vec());
    }

    #[tokio::test]
    async fn recipe_accepts_json() {
        let form = warp::test::request()
            .method("POST")
            .header("content-type", "application/json")
            .body(RECIPE_JSON)
            .filter(&recipe_body())
            .await
            .unwrap();

        assert_eq!(form.name, "Toast");
        assert!(form.upload.is_none());
    }

    #[tokio::test]
    async fn session_is_required() {
        let filter = with_session(keys());
        let result = warp::test::request().filter(&filter).await;
        assert!(result.is_err());
    }
}
