//! API integration tests against a running server

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8088/api/v1";

/// Register a fresh account and return its login and bearer token
async fn register_and_login(client: &Client) -> (String, String) {
    let login = format!("user-{}", uuid::Uuid::new_v4().simple());

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "login": login,
            "firstname": "Test",
            "lastname": "Reader",
            "email": format!("{}@example.com", login),
            "password": "correct horse battery"
        }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "login": login, "password": "correct horse battery" }))
        .send()
        .await
        .expect("Failed to send login request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse login response");
    let token = body["token"].as_str().expect("No token in response").to_string();
    (login, token)
}

async fn create_book(client: &Client, token: &str, shareable: bool) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "title": "The Left Hand of Darkness",
            "author_name": "Ursula K. Le Guin",
            "isbn": "9780441478125",
            "synopsis": "Winter.",
            "shareable": shareable
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    response.json::<i64>().await.expect("Failed to parse book id")
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
async fn test_register_and_login() {
    let client = Client::new();
    let (login, token) = register_and_login(&client).await;

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["login"], login.as_str());
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();
    let (login, _) = register_and_login(&client).await;

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "login": login, "password": "wrong password" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], 304);
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

#[tokio::test]
#[ignore]
async fn test_owner_sees_created_book() {
    let client = Client::new();
    let (login, token) = register_and_login(&client).await;
    let id = create_book(&client, &token, false).await;

    let response = client
        .get(format!("{}/books/owner", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["total_elements"], 1);
    assert_eq!(body["content"][0]["id"], id);
    assert_eq!(body["content"][0]["owner"], login.as_str());
}

#[tokio::test]
#[ignore]
async fn test_borrow_return_approve_flow() {
    let client = Client::new();
    let (_, owner) = register_and_login(&client).await;
    let (_, borrower) = register_and_login(&client).await;
    let book = create_book(&client, &owner, true).await;

    let response = client
        .post(format!("{}/books/borrow/{}", BASE_URL, book))
        .bearer_auth(&borrower)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let loan: i64 = response.json().await.expect("Failed to parse loan id");

    // Second borrow is refused while the loan is open
    let response = client
        .post(format!("{}/books/borrow/{}", BASE_URL, book))
        .bearer_auth(&borrower)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // Owner cannot approve before the book comes back
    let response = client
        .patch(format!("{}/books/borrow/return/approve/{}", BASE_URL, book))
        .bearer_auth(&owner)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    let response = client
        .patch(format!("{}/books/borrow/return/{}", BASE_URL, book))
        .bearer_auth(&borrower)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.json::<i64>().await.expect("Failed to parse"), loan);

    let response = client
        .patch(format!("{}/books/borrow/return/approve/{}", BASE_URL, book))
        .bearer_auth(&owner)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.json::<i64>().await.expect("Failed to parse"), loan);

    // Approved: the book can be borrowed again
    let response = client
        .post(format!("{}/books/borrow/{}", BASE_URL, book))
        .bearer_auth(&borrower)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}
