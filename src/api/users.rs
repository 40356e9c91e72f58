use log::info;
use validator::Validate;
use warp::{hyper::body::Bytes, reply::Response, Filter};

use super::{
    replies::{created, no_content, ok, parse_json, respond},
    schemas::{
        author_view, user_view, AvatarRequest, AvatarView, LoginRequest, RegisterRequest,
        RegisteredUser, SetPasswordRequest, TokenView,
    },
    with_body, with_form, with_link, with_principal, with_state, AppState, Route,
};
use crate::{
    constants::{USER_COUNT_PER_PAGE, USER_NOT_FOUND},
    cryptography::{hash_password, verify_password},
    database::{
        form::Form,
        pagination::{PageContext, PageRequest},
        schema::{NewUser, User, Uuid},
    },
    jwt::generate_token,
    media::{self, AVATAR_FOLDER},
    middleware::Principal,
    validators, Error, HtmlError,
};

async fn list_users(
    principal: Principal,
    form: Form,
    link: String,
    state: AppState,
) -> Result<Response, Error> {
    let request = PageRequest::from_form(&form, USER_COUNT_PER_PAGE)?;
    let store = state.store.as_ref();

    let (users, count) = store.list_users(request.limit(), request.offset()).await?;

    let mut results = Vec::with_capacity(users.len());
    for user in users {
        results.push(user_view(store, principal.user(), user).await?);
    }

    Ok(ok(&PageContext::from_rows(results, count, &request, &link, &form)))
}

async fn register(body: Bytes, state: AppState) -> Result<Response, Error> {
    let request: RegisterRequest = parse_json(&body)?;
    request.validate()?;

    let store = state.store.as_ref();
    if store.find_user_by_email(&request.email).await?.is_some() {
        return Err(HtmlError::InvalidRequest.fields(["email: a user with this email already exists"]));
    }

    let user = store
        .create_user(NewUser {
            email: request.email,
            username: request.username,
            first_name: request.first_name,
            last_name: request.last_name,
            password: hash_password(&request.password)?,
        })
        .await?
        .ok_or_else(|| {
            HtmlError::InvalidRequest.fields(["username: a user with this username already exists"])
        })?;

    info!("Registered user {}", user.id);
    Ok(created(&RegisteredUser::from(user)))
}

async fn find_user(state: &AppState, id: Uuid) -> Result<User, Error> {
    state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new(USER_NOT_FOUND))
}

async fn get_user(id: Uuid, principal: Principal, state: AppState) -> Result<Response, Error> {
    let user = find_user(&state, id).await?;
    Ok(ok(&user_view(state.store.as_ref(), principal.user(), user).await?))
}

async fn me(principal: Principal, state: AppState) -> Result<Response, Error> {
    let user = principal.require()?;
    Ok(ok(&user_view(state.store.as_ref(), Some(user), user.clone()).await?))
}

async fn put_avatar(body: Bytes, principal: Principal, state: AppState) -> Result<Response, Error> {
    let user = principal.require()?;
    let request: AvatarRequest = parse_json(&body)?;

    let image = request
        .avatar
        .as_deref()
        .ok_or_else(|| HtmlError::InvalidRequest.fields(["avatar: this field is required"]))
        .and_then(media::decode_data_url)?;

    let root = &state.settings.media_root;
    let url = media::save_image(root, AVATAR_FOLDER, &image).await?;
    state.store.set_avatar(user.id, Some(url.to_owned())).await?;

    if let Some(previous) = &user.avatar {
        media::delete_image(root, previous).await;
    }

    Ok(ok(&AvatarView { avatar: url }))
}

async fn delete_avatar(principal: Principal, state: AppState) -> Result<Response, Error> {
    let user = principal.require()?;

    state.store.set_avatar(user.id, None).await?;
    if let Some(previous) = &user.avatar {
        media::delete_image(&state.settings.media_root, previous).await;
    }

    Ok(no_content())
}

async fn set_password(body: Bytes, principal: Principal, state: AppState) -> Result<Response, Error> {
    let user = principal.require()?;
    let request: SetPasswordRequest = parse_json(&body)?;

    let mut problems = request
        .validate()
        .err()
        .map(validators::problems)
        .unwrap_or_default();
    if !verify_password(&request.current_password, &user.password)? {
        problems.push("current_password: the current password is wrong".into());
    }
    if !problems.is_empty() {
        return Err(HtmlError::InvalidRequest.fields(problems));
    }

    state
        .store
        .set_password(user.id, &hash_password(&request.new_password)?)
        .await?;

    Ok(no_content())
}

async fn login(body: Bytes, state: AppState) -> Result<Response, Error> {
    let request: LoginRequest = parse_json(&body)?;
    let invalid =
        || HtmlError::InvalidRequest.fields(["Unable to log in with provided credentials"]);

    let user = state
        .store
        .find_user_by_email(&request.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&request.password, &user.password)? {
        return Err(invalid());
    }

    let auth_token = generate_token(&user, &state.key, state.settings.token_lifetime)?;
    Ok(ok(&TokenView { auth_token }))
}

async fn logout(principal: Principal, state: AppState) -> Result<Response, Error> {
    let user = principal.require()?;
    state.store.bump_token_generation(user.id).await?;
    Ok(no_content())
}

fn recipes_limit(form: &Form) -> Result<Option<i64>, Error> {
    match form.get_number::<i64>("recipes_limit")? {
        Some(limit) if limit < 0 => Err(HtmlError::InvalidRequest.new("Invalid recipes_limit")),
        limit => Ok(limit),
    }
}

async fn subscriptions(
    principal: Principal,
    form: Form,
    link: String,
    state: AppState,
) -> Result<Response, Error> {
    let user = principal.require()?;
    let request = PageRequest::from_form(&form, USER_COUNT_PER_PAGE)?;
    let limit = recipes_limit(&form)?;
    let store = state.store.as_ref();

    let (authors, count) = store
        .list_subscriptions(user.id, request.limit(), request.offset())
        .await?;

    let mut results = Vec::with_capacity(authors.len());
    for author in authors {
        results.push(author_view(store, Some(user), author, limit).await?);
    }

    Ok(ok(&PageContext::from_rows(results, count, &request, &link, &form)))
}

async fn subscribe(
    id: Uuid,
    principal: Principal,
    form: Form,
    state: AppState,
) -> Result<Response, Error> {
    let user = principal.require()?;
    let author = find_user(&state, id).await?;
    let limit = recipes_limit(&form)?;

    if author.id == user.id {
        return Err(HtmlError::InvalidRequest.fields(["You cannot subscribe to yourself"]));
    }
    if !state.store.subscribe(user.id, author.id).await? {
        return Err(HtmlError::InvalidRequest.fields(["You are already subscribed to this user"]));
    }

    Ok(created(
        &author_view(state.store.as_ref(), Some(user), author, limit).await?,
    ))
}

async fn unsubscribe(id: Uuid, principal: Principal, state: AppState) -> Result<Response, Error> {
    let user = principal.require()?;
    let author = find_user(&state, id).await?;

    if !state.store.unsubscribe(user.id, author.id).await? {
        return Err(HtmlError::InvalidRequest.fields(["You are not subscribed to this user"]));
    }

    Ok(no_content())
}

pub fn routes(state: AppState) -> Route {
    let list = warp::path!("users")
        .and(warp::get())
        .and(with_principal(&state))
        .and(with_form())
        .and(with_link(&state))
        .and(with_state(state.clone()))
        .then(|principal, form, link, state| async move {
            respond(list_users(principal, form, link, state).await)
        });

    let create = warp::path!("users")
        .and(warp::post())
        .and(with_body())
        .and(with_state(state.clone()))
        .then(|body, state| async move { respond(register(body, state).await) });

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_principal(&state))
        .and(with_state(state.clone()))
        .then(|principal, state| async move { respond(me(principal, state).await) });

    let avatar_put = warp::path!("users" / "me" / "avatar")
        .and(warp::put())
        .and(with_body())
        .and(with_principal(&state))
        .and(with_state(state.clone()))
        .then(|body, principal, state| async move {
            respond(put_avatar(body, principal, state).await)
        });

    let avatar_delete = warp::path!("users" / "me" / "avatar")
        .and(warp::delete())
        .and(with_principal(&state))
        .and(with_state(state.clone()))
        .then(|principal, state| async move { respond(delete_avatar(principal, state).await) });

    let password = warp::path!("users" / "set_password")
        .and(warp::post())
        .and(with_body())
        .and(with_principal(&state))
        .and(with_state(state.clone()))
        .then(|body, principal, state| async move {
            respond(set_password(body, principal, state).await)
        });

    let subscriptions_list = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(with_principal(&state))
        .and(with_form())
        .and(with_link(&state))
        .and(with_state(state.clone()))
        .then(|principal, form, link, state| async move {
            respond(subscriptions(principal, form, link, state).await)
        });

    let subscribe_post = warp::path!("users" / Uuid / "subscribe")
        .and(warp::post())
        .and(with_principal(&state))
        .and(with_form())
        .and(with_state(state.clone()))
        .then(|id, principal, form, state| async move {
            respond(subscribe(id, principal, form, state).await)
        });

    let subscribe_delete = warp::path!("users" / Uuid / "subscribe")
        .and(warp::delete())
        .and(with_principal(&state))
        .and(with_state(state.clone()))
        .then(|id, principal, state| async move {
            respond(unsubscribe(id, principal, state).await)
        });

    let detail = warp::path!("users" / Uuid)
        .and(warp::get())
        .and(with_principal(&state))
        .and(with_state(state.clone()))
        .then(|id, principal, state| async move { respond(get_user(id, principal, state).await) });

    let login_post = warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(with_body())
        .and(with_state(state.clone()))
        .then(|body, state| async move { respond(login(body, state).await) });

    let logout_post = warp::path!("auth" / "token" / "logout")
        .and(warp::post())
        .and(with_principal(&state))
        .and(with_state(state))
        .then(|principal, state| async move { respond(logout(principal, state).await) });

    list.or(create)
        .unify()
        .or(me)
        .unify()
        .or(avatar_put)
        .unify()
        .or(avatar_delete)
        .unify()
        .or(password)
        .unify()
        .or(subscriptions_list)
        .unify()
        .or(subscribe_post)
        .unify()
        .or(subscribe_delete)
        .unify()
        .or(detail)
        .unify()
        .or(login_post)
        .unify()
        .or(logout_post)
        .unify()
        .boxed()
}
