mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod memory;
    pub mod pagination;
    pub mod schema;
    pub mod store;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
pub mod api;
pub mod config;
mod constants;
mod error;
pub mod media;
pub mod shopping;
pub mod short_link;
pub mod validators;

pub use authentication::*;
pub use constants::*;
pub use database::{actions, form, memory, pagination, schema, store};
pub use error::{Error, ErrorBody, HtmlError};
