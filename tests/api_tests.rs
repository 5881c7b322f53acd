//! API integration tests against a running server.
//!
//! Start the server, then run: cargo test --test api_tests -- --ignored

use bookshelf_server::api::TokenClaims;
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Mint a token the way the external identity service would
fn auth_token() -> String {
    let secret =
        std::env::var("JWT_SECRET").unwrap_or_else(|_| "change-this-secret-in-production".to_string());
    let claims = TokenClaims {
        sub: "api-tests".to_string(),
        exp: chrono::Utc::now().timestamp() + 600,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("Failed to encode token")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_check() {
    let response = Client::new()
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_list_books() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books?sort_by=published_year&order=desc&limit=5", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.as_array().map(|books| books.len() <= 5).unwrap_or(false));
}

#[tokio::test]
#[ignore]
async fn test_list_books_rejects_oversized_page() {
    let response = Client::new()
        .get(format!("{}/books?limit=500", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_book_lifecycle() {
    let client = Client::new();
    let token = auth_token();

    // Create
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Dune",
            "genre": "Fiction",
            "published_year": 1965,
            "authors": ["Frank Herbert"]
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    let book_id = body["id"].as_i64().expect("No book ID");
    assert_eq!(body["authors"][0]["name"], "Frank Herbert");

    // Read
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // Partial update
    let response = client
        .patch(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&token)
        .json(&json!({ "title": "Dune Messiah", "published_year": 1969 }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["title"], "Dune Messiah");
    assert_eq!(body["genre"], "Fiction");
    assert_eq!(body["authors"][0]["name"], "Frank Herbert");

    // Delete twice
    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_create_rejects_out_of_range_year() {
    let response = Client::new()
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(auth_token())
        .json(&json!({
            "title": "Too Early",
            "genre": "History",
            "published_year": 1799,
            "authors": ["Someone"]
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_import_rejects_batch_with_bad_record() {
    let response = Client::new()
        .post(format!("{}/books/import", BASE_URL))
        .bearer_auth(auth_token())
        .json(&json!([
            { "title": "Valid", "genre": "Science", "published_year": 2000, "authors": "A, B" },
            { "title": "", "genre": "Science", "published_year": 2000 }
        ]))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "BadImportRecord");
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({
            "title": "Nope",
            "genre": "Fiction",
            "published_year": 2000,
            "authors": ["Nobody"]
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);

    let response = client
        .delete(format!("{}/books/1", BASE_URL))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}
