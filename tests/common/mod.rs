#![allow(dead_code)]

use std::sync::Arc;

use foodgram::{
    api::{self, AppState},
    config::Settings,
    jwt::TokenKey,
    memory::MemoryStore,
    schema::{Ingredient, NewIngredient, Tag},
};
use serde_json::{json, Value};
use tempfile::TempDir;
use warp::{http::Response, hyper::body::Bytes, test::RequestBuilder};

pub const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABAQMAAAAl21bKAAAAA1BMVEUAAACnej3aAAAAAXRSTlMAQObYZgAAAApJREFUCNdjYAAAAAIAAeIhvDMAAAAASUVORK5CYII=";

pub struct TestApp {
    pub state: AppState,
    /// Keeps the media directory alive for the test.
    pub media: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let media = tempfile::tempdir().expect("temp media dir");
        let settings = Settings {
            media_root: media.path().to_path_buf(),
            ..Default::default()
        };
        let key = TokenKey::from_secret(b"test-secret").expect("key");
        let state = AppState::new(Arc::new(MemoryStore::new()), key, settings);

        Self { state, media }
    }

    pub async fn send(&self, request: RequestBuilder) -> Response<Bytes> {
        request
            .header("host", "testserver")
            .reply(&api::routes(self.state.clone()))
            .await
    }

    pub async fn signup(&self, username: &str) -> (String, i64) {
        let response = self
            .send(
                warp::test::request()
                    .method("POST")
                    .path("/api/users/")
                    .json(&json!({
                        "email": format!("{username}@example.com"),
                        "username": username,
                        "first_name": "First",
                        "last_name": "Last",
                        "password": "secret123",
                    })),
            )
            .await;
        assert_eq!(response.status(), 201, "{:?}", response.body());
        let id = body(&response)["id"].as_i64().expect("id");

        let response = self
            .send(
                warp::test::request()
                    .method("POST")
                    .path("/api/auth/token/login/")
                    .json(&json!({
                        "email": format!("{username}@example.com"),
                        "password": "secret123",
                    })),
            )
            .await;
        assert_eq!(response.status(), 200);
        let token = body(&response)["auth_token"]
            .as_str()
            .expect("token")
            .to_string();

        (token, id)
    }

    pub async fn tag(&self, name: &str, slug: &str) -> Tag {
        self.state
            .store
            .create_tag(name, slug)
            .await
            .expect("store")
            .expect("new tag")
    }

    pub async fn ingredients(&self, items: &[(&str, &str)]) -> Vec<Ingredient> {
        let items: Vec<NewIngredient> = items
            .iter()
            .map(|(name, unit)| NewIngredient {
                name: name.to_string(),
                measurement_unit: unit.to_string(),
            })
            .collect();
        self.state
            .store
            .insert_ingredients(&items)
            .await
            .expect("store");

        let mut found = Vec::new();
        for item in items {
            let ingredient = self
                .state
                .store
                .list_ingredients(Some(item.name.as_str()))
                .await
                .expect("store")
                .into_iter()
                .find(|i| i.name == item.name && i.measurement_unit == item.measurement_unit)
                .expect("inserted ingredient");
            found.push(ingredient);
        }
        found
    }

    /// Creates a recipe through the API and returns its id.
    pub async fn recipe(&self, token: &str, name: &str, tag: i32, parts: &[(i32, i32)]) -> i64 {
        let ingredients: Vec<Value> = parts
            .iter()
            .map(|(id, amount)| json!({ "id": id, "amount": amount }))
            .collect();

        let response = self
            .send(
                authorized(token)
                    .method("POST")
                    .path("/api/recipes/")
                    .json(&json!({
                        "ingredients": ingredients,
                        "tags": [tag],
                        "image": PIXEL,
                        "name": name,
                        "text": "Mix and cook",
                        "cooking_time": 10,
                    })),
            )
            .await;
        assert_eq!(response.status(), 201, "{:?}", response.body());
        body(&response)["id"].as_i64().expect("id")
    }
}

pub fn authorized(token: &str) -> RequestBuilder {
    warp::test::request().header("authorization", format!("Token {token}"))
}

pub fn body(response: &Response<Bytes>) -> Value {
    serde_json::from_slice(response.body()).expect("json body")
}
