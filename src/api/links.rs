use log::trace;
use warp::{
    http::{header::LOCATION, HeaderValue, StatusCode},
    reply::{Reply, Response},
    Filter,
};

use super::{
    replies::{ok, respond},
    schemas::ShortLinkView,
    with_origin, with_state, AppState, Route,
};
use crate::{
    constants::{RECIPE_NOT_FOUND, RECIPE_PAGE_PREFIX},
    database::schema::{Recipe, Uuid},
    short_link, Error, HtmlError,
};

async fn existing_recipe(state: &AppState, id: Uuid) -> Result<Recipe, Error> {
    state
        .store
        .get_recipe(id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new(RECIPE_NOT_FOUND))
}

async fn get_link(id: Uuid, origin: String, state: AppState) -> Result<Response, Error> {
    let recipe = existing_recipe(&state, id).await?;
    let id = u64::try_from(recipe.id).map_err(|_| HtmlError::NotFound.new(RECIPE_NOT_FOUND))?;

    Ok(ok(&ShortLinkView {
        short_link: short_link::short_url(&origin, id),
    }))
}

/// Redirects to the recipe page, but only for recipes that still exist.
async fn redirect(token: String, state: AppState) -> Result<Response, Error> {
    let id = short_link::decode(&token)?;
    trace!("Short link {} -> recipe {}", token, id);

    let id = Uuid::try_from(id).map_err(|_| HtmlError::NotFound.new(RECIPE_NOT_FOUND))?;
    let recipe = existing_recipe(&state, id).await?;

    let location = HeaderValue::from_str(&format!("{RECIPE_PAGE_PREFIX}{}", recipe.id))
        .map_err(|_| HtmlError::InternalServerError.new("Invalid redirect target"))?;

    let mut response = StatusCode::FOUND.into_response();
    response.headers_mut().insert(LOCATION, location);

    Ok(response)
}

pub fn api_routes(state: AppState) -> Route {
    warp::path!("recipes" / Uuid / "get-link")
        .and(warp::get())
        .and(with_origin(&state))
        .and(with_state(state))
        .then(|id, origin, state| async move { respond(get_link(id, origin, state).await) })
        .boxed()
}

pub fn redirect_routes(state: AppState) -> Route {
    warp::path!("s" / String)
        .and(warp::get())
        .and(with_state(state))
        .then(|token, state| async move { respond(redirect(token, state).await) })
        .boxed()
}
