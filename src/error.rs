use std::fmt::{self, Display};

use serde_json::json;
use warp::{
    http::StatusCode,
    reply::{self, Reply, Response},
};

/// Shape of the JSON body sent back for a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorBody {
    /// `{"detail": "..."}`
    Detail(String),
    /// `{"field_name": ["...", ...]}`
    Fields(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: u16,
    pub body: ErrorBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlError {
    InvalidRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

impl HtmlError {
    pub fn code(&self) -> u16 {
        match self {
            HtmlError::InvalidRequest => 400,
            HtmlError::Unauthorized => 401,
            HtmlError::Forbidden => 403,
            HtmlError::NotFound => 404,
            HtmlError::MethodNotAllowed => 405,
            HtmlError::InternalServerError => 500,
        }
    }

    pub fn new(self, info: &str) -> Error {
        Error {
            code: self.code(),
            body: ErrorBody::Detail(info.to_string()),
        }
    }

    pub fn fields<I, S>(self, fields: I) -> Error
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Error {
            code: self.code(),
            body: ErrorBody::Fields(fields.into_iter().map(Into::into).collect()),
        }
    }
}

impl Error {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn info(&self) -> String {
        match &self.body {
            ErrorBody::Detail(detail) => detail.to_owned(),
            ErrorBody::Fields(fields) => fields.join("; "),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.info())
    }
}

impl std::error::Error for Error {}

impl warp::reject::Reject for Error {}

impl Reply for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self.body {
            ErrorBody::Detail(detail) => json!({ "detail": detail }),
            ErrorBody::Fields(fields) => json!({ "field_name": fields }),
        };

        reply::with_status(reply::json(&body), status).into_response()
    }
}
