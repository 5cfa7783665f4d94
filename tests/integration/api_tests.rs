//! API integration tests
//!
//! These expect a server on localhost:8080 backed by a fresh database.
//! Run with: cargo test --test api_tests -- --ignored

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Register a throwaway account and return its token
async fn get_auth_token(client: &Client) -> String {
    get_auth_token_as(client, "tester").await
}

async fn get_auth_token_as(client: &Client, prefix: &str) -> String {
    let username = format!("{}_{}", prefix, std::process::id());
    let credentials = json!({ "username": username, "password": "navneet" });

    // A previous run may already have created the account
    let _ = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&credentials)
        .send()
        .await
        .expect("Failed to send register request");

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&credentials)
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

async fn create_book(client: &Client, token: &str, body: Value) -> Value {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse response")
}

/// Create a publisher or author by name
async fn create_named(client: &Client, token: &str, collection: &str, name: &str) -> Value {
    let response = client
        .post(format!("{}/{}", BASE_URL, collection))
        .bearer_auth(token)
        .json(&json!({ "name": name }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse response")
}

async fn get_book(client: &Client, token: &str, id: &Value) -> Value {
    let response = client
        .get(format!("{}/books/{}", BASE_URL, id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
    response.json().await.expect("Failed to parse response")
}

async fn book_status(client: &Client, token: &str, id: &Value) -> u16 {
    client
        .get(format!("{}/books/{}", BASE_URL, id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request")
        .status()
        .as_u16()
}

/// Name unique to this test run
fn unique(name: &str) -> String {
    format!("{} {}", name, std::process::id())
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
async fn test_login_returns_same_token() {
    let client = Client::new();
    let first = get_auth_token(&client).await;
    let second = get_auth_token(&client).await;

    assert_eq!(first.len(), 40);
    assert_eq!(first, second);
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "wronguser",
            "password": "wrongpassword"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
#[ignore]
async fn test_logout_revokes_token() {
    let client = Client::new();
    // Own account so the revoked token does not break concurrent tests
    let token = get_auth_token_as(&client, "logout").await;

    let response = client
        .post(format!("{}/auth/logout", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_author_crud() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!("{}/authors", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "name": "Test Author" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let created: Value = response.json().await.expect("Failed to parse response");
    let id = created["id"].as_i64().expect("No author ID");

    let response = client
        .put(format!("{}/authors/{}", BASE_URL, id))
        .bearer_auth(&token)
        .json(&json!({ "name": "Updated Test Author" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);

    let response = client
        .get(format!("{}/authors/{}", BASE_URL, id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["name"], "Updated Test Author");

    let response = client
        .delete(format!("{}/authors/{}", BASE_URL, id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/authors/{}", BASE_URL, id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_publisher_rejects_overlong_name() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!("{}/publishers", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "name": "x".repeat(101) }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_create_book_links_by_id_and_inserts_by_name() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let publisher = create_named(&client, &token, "publishers", "Shared Press").await;

    let first = create_book(
        &client,
        &token,
        json!({
            "title": "First Book",
            "author": { "name": "Common Name" },
            "publisher": { "id": publisher["id"] }
        }),
    )
    .await;

    let second = create_book(
        &client,
        &token,
        json!({
            "title": "Second Book",
            "author": { "name": "Common Name" },
            "publisher": { "id": publisher["id"] }
        }),
    )
    .await;

    assert_eq!(first["publisher"]["name"], "Shared Press");
    assert_eq!(first["publisher"]["id"], second["publisher"]["id"]);
    // A bare name always creates a fresh author
    assert_eq!(first["author"]["name"], second["author"]["name"]);
    assert_ne!(first["author"]["id"], second["author"]["id"]);
}

#[tokio::test]
#[ignore]
async fn test_rename_through_one_book_leaves_other_book_alone() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book_a = create_book(
        &client,
        &token,
        json!({
            "title": "Book A",
            "author": { "name": "Anon" },
            "publisher": { "name": "Anon House" }
        }),
    )
    .await;

    let book_b = create_book(
        &client,
        &token,
        json!({
            "title": "Book B",
            "author": { "name": "Anon" },
            "publisher": { "name": "Anon House" }
        }),
    )
    .await;

    let response = client
        .put(format!("{}/books/{}", BASE_URL, book_b["id"]))
        .bearer_auth(&token)
        .json(&json!({ "author": { "name": "Jane" } }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(updated["author"]["name"], "Jane");

    let unchanged = get_book(&client, &token, &book_a["id"]).await;
    assert_eq!(unchanged["author"]["name"], "Anon");
    assert_eq!(unchanged["author"]["id"], book_a["author"]["id"]);
}

#[tokio::test]
#[ignore]
async fn test_create_book_with_unknown_publisher_writes_nothing() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    // The author is resolved first, so its insert must be rolled back
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Orphan",
            "author": { "name": "Rollback Author" },
            "publisher": { "id": 999999 }
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    let response = client
        .get(format!("{}/authors", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    let authors: Value = response.json().await.expect("Failed to parse response");
    assert!(!authors
        .as_array()
        .expect("author list")
        .iter()
        .any(|a| a["name"] == "Rollback Author"));
}

#[tokio::test]
#[ignore]
async fn test_update_book_title_and_author_name() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book = create_book(
        &client,
        &token,
        json!({
            "title": "Test Book",
            "author": { "name": "Renamable Author" },
            "publisher": { "name": "Test Publisher" }
        }),
    )
    .await;

    let response = client
        .put(format!("{}/books/{}", BASE_URL, book["id"]))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Updated Test Book",
            "author": { "id": book["author"]["id"], "name": "Renamed Author" }
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["title"], "Updated Test Book");
    assert_eq!(body["author"]["id"], book["author"]["id"]);
    assert_eq!(body["author"]["name"], "Renamed Author");
    assert_eq!(body["publisher"]["name"], "Test Publisher");
}

#[tokio::test]
#[ignore]
async fn test_filter_books_by_author_name() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    create_book(
        &client,
        &token,
        json!({
            "title": "Filtered Book",
            "author": { "name": "Filter Author" },
            "publisher": { "name": "Filter House" }
        }),
    )
    .await;

    let response = client
        .get(format!("{}/books_filter", BASE_URL))
        .bearer_auth(&token)
        .query(&[("author__name", "Filter Author"), ("per_page", "5")])
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["total"].as_i64().unwrap_or(0) >= 1);
    assert_eq!(body["per_page"], 5);
    for item in body["items"].as_array().expect("items array") {
        assert_eq!(item["author"]["name"], "Filter Author");
    }
}

#[tokio::test]
#[ignore]
async fn test_top_authors() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/top-authors", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let authors = body.as_array().expect("author list");
    assert!(authors.len() <= 10);

    let ranked: Vec<(i64, i64)> = authors
        .iter()
        .map(|a| {
            (
                a["book_count"].as_i64().expect("book_count"),
                a["id"].as_i64().expect("id"),
            )
        })
        .collect();
    // Count descending, then id ascending on ties
    assert!(ranked
        .windows(2)
        .all(|w| w[0].0 > w[1].0 || (w[0].0 == w[1].0 && w[0].1 < w[1].1)));
}

#[tokio::test]
#[ignore]
async fn test_top_authors_includes_authors_without_books() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let idle = create_named(&client, &token, "authors", "Idle Author").await;

    let response = client
        .get(format!("{}/top-authors", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let authors = body.as_array().expect("author list");

    // A short report must list every author, the book-less one included
    if authors.len() < 10 {
        let entry = authors
            .iter()
            .find(|a| a["id"] == idle["id"])
            .expect("author without books is listed");
        assert_eq!(entry["book_count"], 0);
    } else {
        assert_eq!(authors.len(), 10);
    }
}

#[tokio::test]
#[ignore]
async fn test_delete_author_removes_their_books() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book = create_book(
        &client,
        &token,
        json!({
            "title": "Doomed By Author",
            "author": { "name": "Cascade Author" },
            "publisher": { "name": "Surviving Press" }
        }),
    )
    .await;

    let response = client
        .delete(format!("{}/authors/{}", BASE_URL, book["author"]["id"]))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    assert_eq!(book_status(&client, &token, &book["id"]).await, 404);

    // The publisher itself is untouched
    let response = client
        .get(format!("{}/publishers/{}", BASE_URL, book["publisher"]["id"]))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);
}

#[tokio::test]
#[ignore]
async fn test_delete_publisher_removes_its_books() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book = create_book(
        &client,
        &token,
        json!({
            "title": "Doomed By Publisher",
            "author": { "name": "Surviving Author" },
            "publisher": { "name": "Cascade Press" }
        }),
    )
    .await;

    let response = client
        .delete(format!("{}/publishers/{}", BASE_URL, book["publisher"]["id"]))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    assert_eq!(book_status(&client, &token, &book["id"]).await, 404);
}

#[tokio::test]
#[ignore]
async fn test_update_book_relinks_author_by_id() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book = create_book(
        &client,
        &token,
        json!({
            "title": "Relinked Book",
            "author": { "name": "Original Author" },
            "publisher": { "name": "Relink Press" }
        }),
    )
    .await;
    let other = create_named(&client, &token, "authors", "Replacement Author").await;

    let response = client
        .put(format!("{}/books/{}", BASE_URL, book["id"]))
        .bearer_auth(&token)
        .json(&json!({ "author": { "id": other["id"] } }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["author"]["id"], other["id"]);
    assert_eq!(body["author"]["name"], "Replacement Author");
    assert_eq!(body["title"], "Relinked Book");

    // The previous author still exists with its name intact
    let response = client
        .get(format!("{}/authors/{}", BASE_URL, book["author"]["id"]))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    let previous: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(previous["name"], "Original Author");
}

#[tokio::test]
#[ignore]
async fn test_update_book_with_unknown_author_id_is_rejected() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book = create_book(
        &client,
        &token,
        json!({
            "title": "Stable Book",
            "author": { "name": "Stable Author" },
            "publisher": { "name": "Stable Press" }
        }),
    )
    .await;

    let response = client
        .put(format!("{}/books/{}", BASE_URL, book["id"]))
        .bearer_auth(&token)
        .json(&json!({ "title": "Should Not Stick", "author": { "id": 999999 } }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    let unchanged = get_book(&client, &token, &book["id"]).await;
    assert_eq!(unchanged["title"], "Stable Book");
    assert_eq!(unchanged["author"]["id"], book["author"]["id"]);
}

#[tokio::test]
#[ignore]
async fn test_missing_book_update_and_delete() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .put(format!("{}/books/999999", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "title": "Ghost" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);

    let response = client
        .delete(format!("{}/books/999999", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_patch_book_title() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book = create_book(
        &client,
        &token,
        json!({
            "title": "Patchable",
            "author": { "name": "Patch Author" },
            "publisher": { "name": "Patch Press" }
        }),
    )
    .await;

    let response = client
        .patch(format!("{}/books/{}", BASE_URL, book["id"]))
        .bearer_auth(&token)
        .json(&json!({ "title": "Patched" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["title"], "Patched");
    assert_eq!(body["author"], book["author"]);
    assert_eq!(body["publisher"], book["publisher"]);
}

#[tokio::test]
#[ignore]
async fn test_filter_books_by_publisher_name_pages() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let publisher = unique("Paged Press");

    for title in ["Paged One", "Paged Two", "Paged Three"] {
        create_book(
            &client,
            &token,
            json!({
                "title": title,
                "author": { "name": "Paged Author" },
                "publisher": { "name": publisher }
            }),
        )
        .await;
    }

    let fetch_page = |page: &'static str| {
        client
            .get(format!("{}/books_filter", BASE_URL))
            .bearer_auth(&token)
            .query(&[
                ("publisher__name", publisher.as_str()),
                ("per_page", "2"),
                ("page", page),
            ])
            .send()
    };

    let response = fetch_page("1").await.expect("Failed to send request");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["total"], 3);
    assert_eq!(body["page"], 1);
    let items = body["items"].as_array().expect("items array");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["title"], "Paged One");
    assert!(items.iter().all(|b| b["publisher"]["name"] == publisher.as_str()));

    let response = fetch_page("2").await.expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["total"], 3);
    assert_eq!(body["items"].as_array().expect("items array").len(), 1);
    assert_eq!(body["items"][0]["title"], "Paged Three");

    let response = fetch_page("3").await.expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_filter_books_empty_first_page() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/books_filter", BASE_URL))
        .bearer_auth(&token)
        .query(&[("publisher__name", unique("Nobody Publishes Here").as_str())])
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["total"], 0);
    assert_eq!(body["items"].as_array().expect("items array").len(), 0);
}

#[tokio::test]
#[ignore]
async fn test_filter_books_huge_page() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/books_filter", BASE_URL))
        .bearer_auth(&token)
        .query(&[("page", "922337203685477580"), ("per_page", "100")])
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}
