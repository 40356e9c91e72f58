use log::trace;
use warp::{reply::Response, Filter};

use super::{
    replies::{ok, respond},
    with_form, with_state, AppState, Route,
};
use crate::{
    constants::INGREDIENT_NOT_FOUND,
    database::{form::Form, schema::Uuid},
    Error, HtmlError,
};

/// Unpaginated; `?name=` narrows the catalog for the recipe form autocomplete.
async fn list_ingredients(form: Form, state: AppState) -> Result<Response, Error> {
    let name = form.get_str("name").map(str::trim);
    trace!("Ingredient search {:?}", name);

    Ok(ok(&state.store.list_ingredients(name).await?))
}

async fn get_ingredient(id: Uuid, state: AppState) -> Result<Response, Error> {
    let ingredient = state
        .store
        .get_ingredient(id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new(INGREDIENT_NOT_FOUND))?;

    Ok(ok(&ingredient))
}

pub fn routes(state: AppState) -> Route {
    let list = warp::path!("ingredients")
        .and(warp::get())
        .and(with_form())
        .and(with_state(state.clone()))
        .then(|form, state| async move { respond(list_ingredients(form, state).await) });

    let detail = warp::path!("ingredients" / Uuid)
        .and(warp::get())
        .and(with_state(state))
        .then(|id, state| async move { respond(get_ingredient(id, state).await) });

    list.or(detail).unify().boxed()
}
