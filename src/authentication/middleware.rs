use std::{convert::Infallible, sync::Arc};

use log::debug;
use warp::Filter;

use super::jwt::TokenKey;
use crate::{
    constants::NOT_AUTHENTICATED,
    database::{schema::User, store::Store},
    Error, HtmlError,
};

/// Who is making the request. Bad or stale credentials read as anonymous;
/// handlers that need a user call [`Principal::require`].
#[derive(Debug, Clone)]
pub enum Principal {
    Anonymous,
    User(User),
}

impl Principal {
    pub fn user(&self) -> Option<&User> {
        match self {
            Principal::Anonymous => None,
            Principal::User(user) => Some(user),
        }
    }

    pub fn require(&self) -> Result<&User, Error> {
        self.user()
            .ok_or_else(|| HtmlError::Unauthorized.new(NOT_AUTHENTICATED))
    }
}

/// Pulls the token out of `Token <jwt>` or `Bearer <jwt>`.
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() {
        return None;
    }

    match scheme {
        s if s.eq_ignore_ascii_case("token") || s.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}

pub async fn resolve_principal(
    header: Option<String>,
    store: &dyn Store,
    key: &TokenKey,
) -> Principal {
    let Some(token) = header.as_deref().and_then(parse_authorization) else {
        return Principal::Anonymous;
    };

    let claims = match key.verify(token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Rejected token: {}", e);
            return Principal::Anonymous;
        }
    };

    match store.get_user(claims.user_id).await {
        Ok(Some(user)) if user.token_generation == claims.generation => Principal::User(user),
        Ok(_) => Principal::Anonymous,
        Err(e) => {
            debug!("Failed to load token owner: {}", e);
            Principal::Anonymous
        }
    }
}

pub fn with_principal(
    store: Arc<dyn Store>,
    key: TokenKey,
) -> impl Filter<Extract = (Principal,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let store = store.clone();
        let key = key.clone();
        async move { Ok::<_, Infallible>(resolve_principal(header, store.as_ref(), &key).await) }
    })
}
