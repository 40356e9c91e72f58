mod common;

use common::{body, TestApp};
use foodgram::short_link;
use serde_json::json;

#[tokio::test]
async fn get_link_for_missing_recipe_is_not_found() {
    let app = TestApp::new();

    let response = app
        .send(warp::test::request().path("/api/recipes/999/get-link/"))
        .await;

    assert_eq!(response.status(), 404);
    assert_eq!(body(&response), json!({ "detail": "Recipe not found" }));
}

#[tokio::test]
async fn short_link_redirects_to_recipe_page() {
    let app = TestApp::new();
    let (token, _) = app.signup("anna").await;
    let tag = app.tag("Lunch", "lunch").await;
    let salt = &app.ingredients(&[("Salt", "g")]).await[0];
    let id = app.recipe(&token, "Soup", tag.id, &[(salt.id, 5)]).await;

    let response = app
        .send(warp::test::request().path(&format!("/api/recipes/{id}/get-link/")))
        .await;
    assert_eq!(response.status(), 200);
    let link = body(&response)["short-link"].as_str().unwrap().to_string();
    let code = short_link::encode(id as u64);
    assert_eq!(link, format!("http://testserver/s/{code}/"));

    let response = app
        .send(warp::test::request().path(&format!("/s/{code}/")))
        .await;
    assert_eq!(response.status(), 302);
    assert_eq!(response.headers()["location"], format!("/recipes/{id}"));
}

#[tokio::test]
async fn short_link_to_missing_recipe_does_not_redirect() {
    let app = TestApp::new();

    let response = app.send(warp::test::request().path("/s/ff/")).await;
    assert_eq!(response.status(), 404);
    assert!(response.headers().get("location").is_none());

    let response = app.send(warp::test::request().path("/s/zz/")).await;
    assert_eq!(response.status(), 400);

    // larger than any recipe id
    let response = app
        .send(warp::test::request().path("/s/ffffffffff/"))
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .send(warp::test::request().path("/s/1ffffffffffffffff/"))
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn deleted_recipe_link_stops_resolving() {
    let app = TestApp::new();
    let (token, _) = app.signup("anna").await;
    let tag = app.tag("Lunch", "lunch").await;
    let salt = &app.ingredients(&[("Salt", "g")]).await[0];
    let id = app.recipe(&token, "Soup", tag.id, &[(salt.id, 5)]).await;

    let response = app
        .send(
            common::authorized(&token)
                .method("DELETE")
                .path(&format!("/api/recipes/{id}/")),
        )
        .await;
    assert_eq!(response.status(), 204);

    let code = short_link::encode(id as u64);
    let response = app
        .send(warp::test::request().path(&format!("/s/{code}/")))
        .await;
    assert_eq!(response.status(), 404);
}
