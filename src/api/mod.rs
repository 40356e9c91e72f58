use std::{convert::Infallible, sync::Arc};

use warp::{
    filters::BoxedFilter,
    hyper::body::Bytes,
    path::FullPath,
    reply::{Reply, Response},
    Filter, Rejection,
};

use crate::{
    config::Settings,
    database::{
        form::{Form, FormData},
        store::Store,
    },
    jwt::TokenKey,
    middleware::{self, Principal},
};

pub mod ingredients;
pub mod links;
pub mod recipes;
pub mod replies;
pub mod schemas;
pub mod tags;
pub mod users;

/// Base64 images make recipe bodies large.
const MAX_BODY_SIZE: u64 = 16 * 1024 * 1024;

pub type Route = BoxedFilter<(Response,)>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub key: TokenKey,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, key: TokenKey, settings: Settings) -> Self {
        Self {
            store,
            key,
            settings: Arc::new(settings),
        }
    }
}

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub fn with_principal(
    state: &AppState,
) -> impl Filter<Extract = (Principal,), Error = Rejection> + Clone {
    middleware::with_principal(state.store.clone(), state.key.clone())
}

pub fn with_form() -> impl Filter<Extract = (Form,), Error = Rejection> + Clone {
    warp::query::<FormData>().map(Form::from_data)
}

pub fn with_body() -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::bytes())
}

/// Scheme and host for absolute links, e.g. `http://localhost:8000`.
pub fn with_origin(state: &AppState) -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    let public_url = state.settings.public_url.clone();

    warp::header::optional::<String>("host").map(move |host: Option<String>| match &public_url {
        Some(url) => url.to_owned(),
        None => format!("http://{}", host.as_deref().unwrap_or("localhost")),
    })
}

/// Absolute URL of the current request without its query string.
pub fn with_link(state: &AppState) -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    with_origin(state)
        .and(warp::path::full())
        .map(|origin: String, path: FullPath| format!("{origin}{}", path.as_str()))
}

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let api = warp::path("api").and(
        users::routes(state.clone())
            .or(recipes::routes(state.clone()))
            .unify()
            .or(links::api_routes(state.clone()))
            .unify()
            .or(tags::routes(state.clone()))
            .unify()
            .or(ingredients::routes(state.clone()))
            .unify(),
    );

    let media = warp::path("media")
        .and(warp::get())
        .and(warp::fs::dir(state.settings.media_root.clone()))
        .map(|file: warp::fs::File| file.into_response());

    api.or(links::redirect_routes(state))
        .unify()
        .or(media)
        .unify()
        .recover(replies::handle_rejection)
        .with(warp::log("foodgram::http"))
}
