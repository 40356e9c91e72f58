use chrono::Utc;
use log::info;
use validator::Validate;
use warp::{
    hyper::body::Bytes,
    reply::{self, Reply, Response},
    Filter,
};

use super::{
    replies::{created, no_content, ok, parse_json, respond},
    schemas::{recipe_view, RecipeRequest, ShortRecipe},
    with_body, with_form, with_link, with_principal, with_state, AppState, Route,
};
use crate::{
    constants::{RECIPE_COUNT_PER_PAGE, RECIPE_NOT_FOUND},
    database::{
        form::Form,
        pagination::{PageContext, PageRequest},
        schema::{Recipe, RecipeDraft, RecipeFilter, RelationKind, Uuid},
    },
    media::{self, DecodedImage, RECIPE_FOLDER},
    middleware::Principal,
    permissions::ensure_author,
    shopping, Error, HtmlError,
};

async fn find_recipe(state: &AppState, id: Uuid) -> Result<Recipe, Error> {
    state
        .store
        .get_recipe(id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new(RECIPE_NOT_FOUND))
}

fn recipe_filter(form: &Form, principal: &Principal) -> Result<RecipeFilter, Error> {
    let mut filter = RecipeFilter {
        author: form.get_number::<Uuid>("author")?,
        tags: form.get_all("tags"),
        ..Default::default()
    };

    if form.get_flag("is_favorited")? {
        filter.favorited_by = Some(principal.require()?.id);
    }
    if form.get_flag("is_in_shopping_cart")? {
        filter.in_cart_of = Some(principal.require()?.id);
    }

    Ok(filter)
}

async fn list_recipes(
    principal: Principal,
    form: Form,
    link: String,
    state: AppState,
) -> Result<Response, Error> {
    let request = PageRequest::from_form(&form, RECIPE_COUNT_PER_PAGE)?;
    let filter = recipe_filter(&form, &principal)?;
    let store = state.store.as_ref();

    let (recipes, count) = store
        .fetch_recipes(&filter, request.limit(), request.offset())
        .await?;

    let mut results = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        results.push(recipe_view(store, principal.user(), recipe).await?);
    }

    Ok(ok(&PageContext::from_rows(results, count, &request, &link, &form)))
}

/// Validates the request and checks that every tag and ingredient exists.
/// Returns the draft without an image and the decoded image, if any.
async fn prepare_draft(
    request: RecipeRequest,
    state: &AppState,
) -> Result<(RecipeDraft, Option<DecodedImage>), Error> {
    request.validate()?;

    let image = request
        .image
        .as_deref()
        .map(media::decode_data_url)
        .transpose()?;

    let mut tags: Vec<Uuid> = Vec::with_capacity(request.tags.len());
    for tag in request.tags {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    let draft = RecipeDraft {
        name: request.name,
        text: request.text,
        image: None,
        cooking_time: request.cooking_time,
        tags,
        ingredients: request.ingredients,
    };

    let mut missing = Vec::new();
    for tag in draft.tags.iter() {
        if state.store.get_tag(*tag).await?.is_none() {
            missing.push(format!("tags: tag {tag} does not exist"));
        }
    }
    for part in draft.ingredients.iter() {
        if state.store.get_ingredient(part.id).await?.is_none() {
            missing.push(format!("ingredients: ingredient {} does not exist", part.id));
        }
    }
    if !missing.is_empty() {
        return Err(HtmlError::InvalidRequest.fields(missing));
    }

    Ok((draft, image))
}

async fn create_recipe(body: Bytes, principal: Principal, state: AppState) -> Result<Response, Error> {
    let user = principal.require()?;
    let request: RecipeRequest = parse_json(&body)?;

    let (mut draft, image) = prepare_draft(request, &state).await?;
    let image = image.ok_or_else(|| HtmlError::InvalidRequest.fields(["image: this field is required"]))?;

    let root = &state.settings.media_root;
    let url = media::save_image(root, RECIPE_FOLDER, &image).await?;
    draft.image = Some(url.to_owned());

    let id = match state.store.create_recipe(user.id, &draft).await {
        Ok(id) => id,
        Err(e) => {
            media::delete_image(root, &url).await;
            return Err(e);
        }
    };
    info!("User {} created recipe {}", user.id, id);

    let recipe = find_recipe(&state, id).await?;
    Ok(created(&recipe_view(state.store.as_ref(), Some(user), recipe).await?))
}

async fn get_recipe(id: Uuid, principal: Principal, state: AppState) -> Result<Response, Error> {
    let recipe = find_recipe(&state, id).await?;
    Ok(ok(&recipe_view(state.store.as_ref(), principal.user(), recipe).await?))
}

async fn update_recipe(
    id: Uuid,
    body: Bytes,
    principal: Principal,
    state: AppState,
) -> Result<Response, Error> {
    let user = principal.require()?;
    let recipe = find_recipe(&state, id).await?;
    ensure_author(user, &recipe)?;

    let mut request: RecipeRequest = parse_json(&body)?;
    // Clients echo the stored URL back when the image is unchanged.
    let unchanged = request
        .image
        .as_deref()
        .is_some_and(|image| !image.starts_with("data:") && image.ends_with(&recipe.image));
    if unchanged {
        request.image = None;
    }
    let (mut draft, image) = prepare_draft(request, &state).await?;

    let root = &state.settings.media_root;
    if let Some(image) = image {
        draft.image = Some(media::save_image(root, RECIPE_FOLDER, &image).await?);
    }

    state.store.update_recipe(id, &draft).await?;
    if draft.image.is_some() {
        media::delete_image(root, &recipe.image).await;
    }

    let recipe = find_recipe(&state, id).await?;
    Ok(ok(&recipe_view(state.store.as_ref(), Some(user), recipe).await?))
}

async fn delete_recipe(id: Uuid, principal: Principal, state: AppState) -> Result<Response, Error> {
    let user = principal.require()?;
    let recipe = find_recipe(&state, id).await?;
    ensure_author(user, &recipe)?;

    state.store.delete_recipe(id).await?;
    media::delete_image(&state.settings.media_root, &recipe.image).await;
    info!("User {} deleted recipe {}", user.id, id);

    Ok(no_content())
}

async fn add_relation(
    kind: RelationKind,
    id: Uuid,
    principal: Principal,
    state: AppState,
) -> Result<Response, Error> {
    let user = principal.require()?;
    let recipe = find_recipe(&state, id).await?;

    if !state.store.add_relation(kind, user.id, recipe.id).await? {
        return Err(HtmlError::InvalidRequest.fields([kind.already_present()]));
    }

    Ok(created(&ShortRecipe::from(recipe)))
}

async fn remove_relation(
    kind: RelationKind,
    id: Uuid,
    principal: Principal,
    state: AppState,
) -> Result<Response, Error> {
    let user = principal.require()?;
    let recipe = find_recipe(&state, id).await?;

    if !state.store.remove_relation(kind, user.id, recipe.id).await? {
        return Err(HtmlError::InvalidRequest.fields([kind.not_present()]));
    }

    Ok(no_content())
}

async fn download_shopping_cart(principal: Principal, state: AppState) -> Result<Response, Error> {
    let user = principal.require()?;

    let lines = state.store.list_cart_ingredients(user.id).await?;
    let items = shopping::aggregate(&lines);
    let pdf = shopping::render_pdf(
        &shopping::format_lines(&items),
        state.settings.pdf_font.as_deref(),
    )?;

    let filename = shopping::export_filename(Utc::now());
    info!("User {} exported {} shopping list items", user.id, items.len());

    let response = reply::with_header(pdf, "content-type", "application/pdf");
    let response = reply::with_header(
        response,
        "content-disposition",
        format!("attachment; filename=\"{filename}\""),
    );

    Ok(response.into_response())
}

fn relation_routes(kind: RelationKind, segment: &'static str, state: &AppState) -> Route {
    let add = warp::path("recipes")
        .and(warp::path::param::<Uuid>())
        .and(warp::path(segment))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_principal(state))
        .and(with_state(state.clone()))
        .then(move |id, principal, state| async move {
            respond(add_relation(kind, id, principal, state).await)
        });

    let remove = warp::path("recipes")
        .and(warp::path::param::<Uuid>())
        .and(warp::path(segment))
        .and(warp::path::end())
        .and(warp::delete())
        .and(with_principal(state))
        .and(with_state(state.clone()))
        .then(move |id, principal, state| async move {
            respond(remove_relation(kind, id, principal, state).await)
        });

    add.or(remove).unify().boxed()
}

pub fn routes(state: AppState) -> Route {
    let list = warp::path!("recipes")
        .and(warp::get())
        .and(with_principal(&state))
        .and(with_form())
        .and(with_link(&state))
        .and(with_state(state.clone()))
        .then(|principal, form, link, state| async move {
            respond(list_recipes(principal, form, link, state).await)
        });

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_body())
        .and(with_principal(&state))
        .and(with_state(state.clone()))
        .then(|body, principal, state| async move {
            respond(create_recipe(body, principal, state).await)
        });

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_principal(&state))
        .and(with_state(state.clone()))
        .then(|principal, state| async move {
            respond(download_shopping_cart(principal, state).await)
        });

    let detail = warp::path!("recipes" / Uuid)
        .and(warp::get())
        .and(with_principal(&state))
        .and(with_state(state.clone()))
        .then(|id, principal, state| async move { respond(get_recipe(id, principal, state).await) });

    let update = warp::path!("recipes" / Uuid)
        .and(warp::patch())
        .and(with_body())
        .and(with_principal(&state))
        .and(with_state(state.clone()))
        .then(|id, body, principal, state| async move {
            respond(update_recipe(id, body, principal, state).await)
        });

    let delete = warp::path!("recipes" / Uuid)
        .and(warp::delete())
        .and(with_principal(&state))
        .and(with_state(state.clone()))
        .then(|id, principal, state| async move {
            respond(delete_recipe(id, principal, state).await)
        });

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
        .or(relation_routes(RelationKind::Favorite, "favorite", &state))
        .unify()
        .or(relation_routes(RelationKind::ShoppingCart, "shopping_cart", &state))
        .unify()
        .boxed()
}
