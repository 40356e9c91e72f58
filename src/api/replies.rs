use std::convert::Infallible;

use log::{error, trace};
use serde::{de::DeserializeOwned, Serialize};
use warp::{
    http::StatusCode,
    hyper::body::Bytes,
    reject,
    reply::{self, Reply, Response},
    Rejection,
};

use crate::{Error, HtmlError};

pub fn json_reply<T: Serialize>(value: &T, status: StatusCode) -> Response {
    reply::with_status(reply::json(value), status).into_response()
}

pub fn ok<T: Serialize>(value: &T) -> Response {
    json_reply(value, StatusCode::OK)
}

pub fn created<T: Serialize>(value: &T) -> Response {
    json_reply(value, StatusCode::CREATED)
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, Error> {
    serde_json::from_slice(body).map_err(|e| HtmlError::InvalidRequest.fields([e.to_string()]))
}

/// Turns a handler result into a reply. Errors never become rejections, so a
/// failed handler does not fall through to another route.
pub fn respond(result: Result<Response, Error>) -> Response {
    match result {
        Ok(response) => response,
        Err(e) => {
            if e.code >= 500 {
                error!("Request failed: {}", e);
            } else {
                trace!("Request rejected: {}", e);
            }
            e.into_response()
        }
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let error = if err.is_not_found() {
        HtmlError::NotFound.new("Not found")
    } else if let Some(e) = err.find::<Error>() {
        e.clone()
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        HtmlError::MethodNotAllowed.new("Method not allowed")
    } else if let Some(e) = err.find::<reject::InvalidQuery>() {
        HtmlError::InvalidRequest.new(&e.to_string())
    } else if err.find::<reject::PayloadTooLarge>().is_some() {
        HtmlError::InvalidRequest.new("Request body is too large")
    } else if err.find::<reject::LengthRequired>().is_some() {
        HtmlError::InvalidRequest.new("Content-Length is required")
    } else {
        error!("Unhandled rejection: {:?}", err);
        HtmlError::InternalServerError.new("Internal server error")
    };

    Ok(error.into_response())
}
