use warp::{reply::Response, Filter};

use super::{
    replies::{ok, respond},
    with_state, AppState, Route,
};
use crate::{constants::TAG_NOT_FOUND, database::schema::Uuid, Error, HtmlError};

async fn list_tags(state: AppState) -> Result<Response, Error> {
    Ok(ok(&state.store.list_tags().await?))
}

async fn get_tag(id: Uuid, state: AppState) -> Result<Response, Error> {
    let tag = state
        .store
        .get_tag(id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new(TAG_NOT_FOUND))?;

    Ok(ok(&tag))
}

pub fn routes(state: AppState) -> Route {
    let list = warp::path!("tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(|state| async move { respond(list_tags(state).await) });

    let detail = warp::path!("tags" / Uuid)
        .and(warp::get())
        .and(with_state(state))
        .then(|id, state| async move { respond(get_tag(id, state).await) });

    list.or(detail).unify().boxed()
}
