use std::collections::HashSet;

use reqwest::StatusCode;
use serde_json::{Value, json};
use shelf_dal::book::Book;
use shelf_e2e_tests::{
    base_url, extend_url, launch_env, prepare_env,
    rest::{create_author, create_book},
};
use tracing::info;
use tracing_test::traced_test;

async fn toggle(client: &reqwest::Client, base_url: &reqwest::Url, book_id: i64) -> (StatusCode, Value) {
    let response = client
        .post(base_url.join("favorites").unwrap())
        .json(&json!({"book_id": book_id}))
        .send()
        .await
        .unwrap();
    info!("Toggle response: {:#?}", response);
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
#[traced_test]
async fn test_favorites_flow() {
    let (args, _config_guard) = prepare_env("test_favorites").await.unwrap();
    let base_url = base_url(&args);
    let (client, user_id) = launch_env(args, "reader").await.unwrap();

    let author = create_author(&client, &base_url, "Terry Pratchett", "gr-1")
        .await
        .unwrap();
    let mut fantasy = Vec::new();
    for i in 0..23 {
        let book = create_book(
            &client,
            &base_url,
            author.id,
            &format!("Discworld {i}"),
            Some("Fantasy"),
        )
        .await
        .unwrap();
        fantasy.push(book.id);
    }
    let romance = create_book(&client, &base_url, author.id, "Love Story", Some("Romance"))
        .await
        .unwrap();

    let (status, body) = toggle(&client, &base_url, fantasy[0]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book added to favorites");
    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 5);
    for rec in recommendations {
        let id = rec["id"].as_i64().unwrap();
        assert_ne!(id, fantasy[0]);
        assert_ne!(id, romance.id);
    }

    let book: Book = reqwest::get(extend_url(&base_url.join("books").unwrap(), fantasy[0]))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(book.favorite_by, vec![user_id]);

    let (status, body) = toggle(&client, &base_url, fantasy[0]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book removed from favorites");
    assert!(body.get("recommendations").is_none());

    for id in &fantasy[..20] {
        let (status, _) = toggle(&client, &base_url, *id).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = toggle(&client, &base_url, fantasy[20]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You can only have 20 favorite books");

    let favorites: Vec<Book> = client
        .get(base_url.join("favorites").unwrap())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(favorites.len(), 20);
    let favorite_ids: HashSet<i64> = favorites.iter().map(|b| b.id).collect();

    let recommendations: Vec<Book> = client
        .get(base_url.join("favorites/recommendations").unwrap())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let recommended: HashSet<i64> = recommendations.iter().map(|b| b.id).collect();
    assert_eq!(recommended, HashSet::from([fantasy[20], fantasy[21], fantasy[22]]));
    assert!(recommended.is_disjoint(&favorite_ids));

    let (status, body) = toggle(&client, &base_url, 9999).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let response = reqwest::Client::new()
        .post(base_url.join("favorites").unwrap())
        .json(&json!({"book_id": fantasy[0]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
