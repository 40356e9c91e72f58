mod common;

use common::{authorized, body, TestApp, PIXEL};
use foodgram::{schema::RelationKind, shopping};
use serde_json::json;

#[tokio::test]
async fn created_recipe_has_full_representation() {
    let app = TestApp::new();
    let (token, author_id) = app.signup("anna").await;
    let tag = app.tag("Breakfast", "breakfast").await;
    let parts = app.ingredients(&[("Eggs", "pcs"), ("Milk", "ml")]).await;

    let id = app
        .recipe(&token, "Omelette", tag.id, &[(parts[0].id, 3), (parts[1].id, 100)])
        .await;

    let response = app
        .send(authorized(&token).path(&format!("/api/recipes/{id}/")))
        .await;
    assert_eq!(response.status(), 200);

    let recipe = body(&response);
    assert_eq!(recipe["name"], "Omelette");
    assert_eq!(recipe["author"]["id"], author_id);
    assert_eq!(recipe["tags"][0]["slug"], "breakfast");
    assert_eq!(recipe["ingredients"][0]["name"], "Eggs");
    assert_eq!(recipe["ingredients"][0]["amount"], 3);
    assert_eq!(recipe["ingredients"][1]["measurement_unit"], "ml");
    assert_eq!(recipe["is_favorited"], false);
    assert_eq!(recipe["is_in_shopping_cart"], false);
    assert!(recipe["image"].as_str().unwrap().starts_with("/media/recipes/"));
}

#[tokio::test]
async fn invalid_recipes_are_rejected() {
    let app = TestApp::new();
    let (token, _) = app.signup("anna").await;
    let tag = app.tag("Breakfast", "breakfast").await;
    let eggs = &app.ingredients(&[("Eggs", "pcs")]).await[0];

    let cases = [
        json!({ "ingredients": [], "tags": [tag.id], "image": PIXEL, "name": "A", "text": "B", "cooking_time": 1 }),
        json!({ "ingredients": [{ "id": eggs.id, "amount": 1 }], "tags": [], "image": PIXEL, "name": "A", "text": "B", "cooking_time": 1 }),
        json!({ "ingredients": [{ "id": eggs.id, "amount": 0 }], "tags": [tag.id], "image": PIXEL, "name": "A", "text": "B", "cooking_time": 1 }),
        json!({ "ingredients": [{ "id": eggs.id, "amount": 1 }], "tags": [tag.id], "image": PIXEL, "name": "A", "text": "B", "cooking_time": 0 }),
        json!({ "ingredients": [{ "id": 999, "amount": 1 }], "tags": [tag.id], "image": PIXEL, "name": "A", "text": "B", "cooking_time": 1 }),
        json!({ "ingredients": [{ "id": eggs.id, "amount": 1 }], "tags": [999], "image": PIXEL, "name": "A", "text": "B", "cooking_time": 1 }),
        json!({ "ingredients": [{ "id": eggs.id, "amount": 1 }], "tags": [tag.id], "name": "A", "text": "B", "cooking_time": 1 }),
        json!({ "ingredients": [{ "id": eggs.id, "amount": 1 }], "tags": [tag.id], "image": "nope", "name": "A", "text": "B", "cooking_time": 1 }),
    ];

    for case in cases {
        let response = app
            .send(authorized(&token).method("POST").path("/api/recipes/").json(&case))
            .await;
        assert_eq!(response.status(), 400, "{case}");
    }

    let duplicated = json!({
        "ingredients": [{ "id": eggs.id, "amount": 0 }, { "id": eggs.id, "amount": 2 }],
        "tags": [tag.id], "image": PIXEL, "name": " ", "text": "B", "cooking_time": 1,
    });
    let response = app
        .send(authorized(&token).method("POST").path("/api/recipes/").json(&duplicated))
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(
        body(&response)["field_name"],
        json!([
            "ingredients: each ingredient may appear only once",
            "ingredients[0].amount: must be at least 1",
            "name: this field may not be blank",
        ])
    );

    let response = app
        .send(
            warp::test::request()
                .method("POST")
                .path("/api/recipes/")
                .json(&json!({})),
        )
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn only_the_author_may_change_a_recipe() {
    let app = TestApp::new();
    let (author, _) = app.signup("author").await;
    let (other, _) = app.signup("other").await;
    let tag = app.tag("Lunch", "lunch").await;
    let parts = app.ingredients(&[("Rice", "g"), ("Water", "ml")]).await;
    let id = app.recipe(&author, "Rice", tag.id, &[(parts[0].id, 200)]).await;

    let update = json!({
        "ingredients": [{ "id": parts[1].id, "amount": 400 }],
        "tags": [tag.id],
        "name": "Boiled rice",
        "text": "Boil",
        "cooking_time": 20,
    });

    let response = app
        .send(
            authorized(&other)
                .method("PATCH")
                .path(&format!("/api/recipes/{id}/"))
                .json(&update),
        )
        .await;
    assert_eq!(response.status(), 403);

    let response = app
        .send(authorized(&other).method("DELETE").path(&format!("/api/recipes/{id}/")))
        .await;
    assert_eq!(response.status(), 403);

    let response = app
        .send(
            authorized(&author)
                .method("PATCH")
                .path(&format!("/api/recipes/{id}/"))
                .json(&update),
        )
        .await;
    assert_eq!(response.status(), 200);
    let recipe = body(&response);
    assert_eq!(recipe["name"], "Boiled rice");
    assert_eq!(recipe["cooking_time"], 20);
    assert_eq!(recipe["ingredients"].as_array().unwrap().len(), 1);
    assert_eq!(recipe["ingredients"][0]["name"], "Water");
    assert!(recipe["image"].as_str().unwrap().starts_with("/media/recipes/"));

    let response = app
        .send(authorized(&author).method("DELETE").path(&format!("/api/recipes/{id}/")))
        .await;
    assert_eq!(response.status(), 204);

    let response = app
        .send(warp::test::request().path(&format!("/api/recipes/{id}/")))
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn adding_a_favorite_twice_is_a_conflict() {
    let app = TestApp::new();
    let (token, user_id) = app.signup("anna").await;
    let tag = app.tag("Lunch", "lunch").await;
    let salt = &app.ingredients(&[("Salt", "g")]).await[0];
    let id = app.recipe(&token, "Soup", tag.id, &[(salt.id, 5)]).await;
    let path = format!("/api/recipes/{id}/favorite/");

    let response = app.send(authorized(&token).method("POST").path(&path)).await;
    assert_eq!(response.status(), 201);
    assert_eq!(body(&response)["id"], id);

    let response = app.send(authorized(&token).method("POST").path(&path)).await;
    assert_eq!(response.status(), 400);
    assert!(body(&response)["field_name"].is_array());

    let response = app
        .send(authorized(&token).path("/api/recipes/?is_favorited=1"))
        .await;
    assert_eq!(body(&response)["count"], 1);
    assert!(app
        .state
        .store
        .has_relation(RelationKind::Favorite, user_id as i32, id as i32)
        .await
        .unwrap());

    let response = app.send(authorized(&token).method("DELETE").path(&path)).await;
    assert_eq!(response.status(), 204);
    let response = app.send(authorized(&token).method("DELETE").path(&path)).await;
    assert_eq!(response.status(), 400);

    let response = app
        .send(authorized(&token).method("POST").path("/api/recipes/999/favorite/"))
        .await;
    assert_eq!(response.status(), 404);

    let response = app.send(warp::test::request().method("POST").path(&path)).await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn shopping_cart_export_sums_shared_ingredients() {
    let app = TestApp::new();
    let (token, user_id) = app.signup("anna").await;
    let tag = app.tag("Lunch", "lunch").await;
    let parts = app.ingredients(&[("Salt", "g"), ("Water", "ml")]).await;
    let soup = app
        .recipe(&token, "Soup", tag.id, &[(parts[0].id, 5), (parts[1].id, 500)])
        .await;
    let bread = app.recipe(&token, "Bread", tag.id, &[(parts[0].id, 3)]).await;

    for id in [soup, bread] {
        let response = app
            .send(
                authorized(&token)
                    .method("POST")
                    .path(&format!("/api/recipes/{id}/shopping_cart/")),
            )
            .await;
        assert_eq!(response.status(), 201);
    }

    let lines = app
        .state
        .store
        .list_cart_ingredients(user_id as i32)
        .await
        .unwrap();
    let items = shopping::aggregate(&lines);
    let salt: Vec<_> = items.iter().filter(|item| item.name == "Salt").collect();
    assert_eq!(salt.len(), 1);
    assert_eq!(salt[0].amount, 8);
    assert_eq!(salt[0].measurement_unit, "g");

    let response = app
        .send(authorized(&token).path("/api/recipes/download_shopping_cart/"))
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "application/pdf");
    let disposition = response.headers()["content-disposition"].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"cart-"));
    assert!(disposition.ends_with(".pdf\""));
    assert!(response.body().starts_with(b"%PDF"));

    let response = app
        .send(authorized(&token).path("/api/recipes/?is_in_shopping_cart=1"))
        .await;
    assert_eq!(body(&response)["count"], 2);
}

#[tokio::test]
async fn empty_cart_still_exports_a_document() {
    let app = TestApp::new();
    let (token, _) = app.signup("anna").await;

    let response = app
        .send(authorized(&token).path("/api/recipes/download_shopping_cart/"))
        .await;
    assert_eq!(response.status(), 200);
    assert!(response.body().starts_with(b"%PDF"));

    let response = app
        .send(warp::test::request().path("/api/recipes/download_shopping_cart/"))
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn listing_filters_and_paginates() {
    let app = TestApp::new();
    let (anna, anna_id) = app.signup("anna").await;
    let (bob, _) = app.signup("bob").await;
    let breakfast = app.tag("Breakfast", "breakfast").await;
    let dinner = app.tag("Dinner", "dinner").await;
    let salt = &app.ingredients(&[("Salt", "g")]).await[0];

    let first = app.recipe(&anna, "First", breakfast.id, &[(salt.id, 1)]).await;
    app.recipe(&anna, "Second", dinner.id, &[(salt.id, 1)]).await;
    let third = app.recipe(&bob, "Third", breakfast.id, &[(salt.id, 1)]).await;

    let response = app
        .send(warp::test::request().path("/api/recipes/?limit=2"))
        .await;
    let page = body(&response);
    assert_eq!(page["count"], 3);
    assert_eq!(page["results"][0]["id"], third);
    assert_eq!(page["next"], "http://testserver/api/recipes/?limit=2&page=2");

    let response = app
        .send(warp::test::request().path("/api/recipes/?limit=2&page=2"))
        .await;
    let page = body(&response);
    assert_eq!(page["results"].as_array().unwrap().len(), 1);
    assert_eq!(page["results"][0]["id"], first);
    assert!(page["next"].is_null());
    assert_eq!(page["previous"], "http://testserver/api/recipes/?limit=2");

    let response = app
        .send(warp::test::request().path(&format!("/api/recipes/?author={anna_id}")))
        .await;
    assert_eq!(body(&response)["count"], 2);

    let response = app
        .send(warp::test::request().path("/api/recipes/?tags=breakfast"))
        .await;
    assert_eq!(body(&response)["count"], 2);

    let response = app
        .send(warp::test::request().path("/api/recipes/?tags=breakfast&tags=dinner"))
        .await;
    assert_eq!(body(&response)["count"], 3);

    let response = app
        .send(warp::test::request().path("/api/recipes/?is_favorited=1"))
        .await;
    assert_eq!(response.status(), 401);

    let response = app
        .send(warp::test::request().path("/api/recipes/?page=0"))
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .send(warp::test::request().path("/api/recipes/?page=9223372036854775807"))
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .send(warp::test::request().path("/api/users/?page=9223372036854775807"))
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn tags_and_ingredients_are_readable() {
    let app = TestApp::new();
    let tag = app.tag("Breakfast", "breakfast").await;
    app.ingredients(&[("сахар", "г"), ("соль", "г"), ("морская соль", "г")])
        .await;

    let response = app.send(warp::test::request().path("/api/tags/")).await;
    assert_eq!(body(&response), json!([{ "id": tag.id, "name": "Breakfast", "slug": "breakfast" }]));

    let response = app
        .send(warp::test::request().path(&format!("/api/tags/{}/", tag.id)))
        .await;
    assert_eq!(response.status(), 200);

    let response = app.send(warp::test::request().path("/api/tags/999/")).await;
    assert_eq!(response.status(), 404);

    let response = app
        .send(warp::test::request().path("/api/ingredients/?name=%D1%81%D0%BE%D0%BB"))
        .await;
    let names: Vec<String> = body(&response)
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["соль", "морская соль"]);

    let response = app
        .send(warp::test::request().path("/api/ingredients/999/"))
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .send(warp::test::request().method("PUT").path("/api/tags/"))
        .await;
    assert_eq!(response.status(), 405);
}
