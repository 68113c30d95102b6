//! API handlers for Book Network REST endpoints

pub mod auth;
pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts},
    http::request::Parts,
    routing::{get, patch, post, put},
    Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Authentication("Missing or invalid bearer token".to_string()))?;

        let claims = UserClaims::from_token(bearer.token(), &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_upload_bytes = state.config.storage.max_upload_bytes;

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/password", put(auth::change_password))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/owner", get(books::list_my_books))
        .route("/books/:id", get(books::get_book))
        .route("/books/shareable/:id", patch(books::toggle_shareable))
        .route("/books/archived/:id", patch(books::toggle_archived))
        .route("/books/cover/:id", post(books::upload_cover))
        // Lending
        .route("/books/borrowed", get(loans::list_borrowed))
        .route("/books/returned", get(loans::list_returned))
        .route("/books/borrow/:id", post(loans::borrow_book))
        .route("/books/borrow/return/:id", patch(loans::return_book))
        .route("/books/borrow/return/approve/:id", patch(loans::approve_return))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use chrono::Utc;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::AppConfig,
        repository::memory::MemoryStore,
        services::{storage::MockFileStorage, users::UsersService, Services},
    };

    fn app(store: &MemoryStore) -> (Router, AppConfig) {
        let config = AppConfig::default();
        let users = UsersService::new(Arc::new(store.clone()), config.auth.clone());
        let services = Services::with_store(
            Arc::new(store.clone()),
            Arc::new(MockFileStorage::new()),
            users,
        );
        let state = AppState {
            config: Arc::new(config.clone()),
            services: Arc::new(services),
        };
        (create_router(state), config)
    }

    fn token(config: &AppConfig, login: &str) -> String {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: login.to_string(),
            user_id: 1,
            exp: now + 3600,
            iat: now,
        }
        .create_token(&config.auth.jwt_secret)
        .unwrap()
    }

    fn request(method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _) = app(&MemoryStore::new());
        let response = app
            .oneshot(request(Method::GET, "/api/v1/health", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn books_require_a_token() {
        let (app, _) = app(&MemoryStore::new());
        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/books", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(request(Method::GET, "/api/v1/books", Some("garbage"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn lending_flow_over_http() {
        let store = MemoryStore::new();
        let (app, config) = app(&store);
        let alice = token(&config, "alice");
        let bob = token(&config, "bob");

        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/v1/books",
                Some(&alice),
                Some(json!({
                    "title": "Solaris",
                    "author_name": "Stanislaw Lem",
                    "isbn": "9780156027601",
                    "shareable": true
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = json_body(response).await.as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/books", Some(&bob), None))
            .await
            .unwrap();
        let page = json_body(response).await;
        assert_eq!(page["total_elements"], 1);
        assert_eq!(page["content"][0]["owner"], "alice");

        let borrow = format!("/api/v1/books/borrow/{}", id);
        let response = app
            .clone()
            .oneshot(request(Method::POST, &borrow, Some(&bob), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request(Method::POST, &borrow, Some(&bob), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(response).await["error"], "AlreadyBorrowed");

        let response = app
            .clone()
            .oneshot(request(
                Method::PATCH,
                &format!("/api/v1/books/borrow/return/approve/{}", id),
                Some(&bob),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(request(
                Method::PATCH,
                &format!("/api/v1/books/borrow/return/{}", id),
                Some(&bob),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/books/returned", Some(&alice), None))
            .await
            .unwrap();
        let page = json_body(response).await;
        assert_eq!(page["total_elements"], 1);
        assert_eq!(page["content"][0]["state"], "return_requested");

        let response = app
            .oneshot(request(
                Method::PATCH,
                &format!("/api/v1/books/borrow/return/approve/{}", id),
                Some(&alice),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(store.snapshot().await.records[0].return_approved);
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty() {
        let store = MemoryStore::new();
        store.seed_book("alice", true, false).await;
        let (app, config) = app(&store);

        let response = app
            .oneshot(request(
                Method::GET,
                "/api/v1/books?page=9223372036854775807&size=10",
                Some(&token(&config, "bob")),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = json_body(response).await;
        assert_eq!(page["total_elements"], 1);
        assert_eq!(page["content"].as_array().map(Vec::len), Some(0));
        assert_eq!(page["last"], true);
    }

    #[tokio::test]
    async fn register_and_login_over_http() {
        let (app, _) = app(&MemoryStore::new());
        let account = json!({
            "login": "carol",
            "password": "correct horse battery",
            "email": "carol@example.com"
        });

        let response = app
            .clone()
            .oneshot(request(Method::POST, "/api/v1/auth/register", None, Some(account.clone())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(request(Method::POST, "/api/v1/auth/register", None, Some(account)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "login": "carol", "password": "correct horse battery" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let token = json_body(response).await["token"].as_str().unwrap().to_string();

        let response = app
            .oneshot(request(Method::GET, "/api/v1/auth/me", Some(&token), None))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["login"], "carol");
    }

    #[tokio::test]
    async fn unknown_book_is_404() {
        let (app, config) = app(&MemoryStore::new());
        let response = app
            .oneshot(request(
                Method::GET,
                "/api/v1/books/404",
                Some(&token(&config, "alice")),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["code"], 4);
    }
}
