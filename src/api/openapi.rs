//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, loans};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Book Network API",
        version = "1.0.0",
        description = "Peer-to-peer book lending REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        auth::change_password,
        // Books
        books::create_book,
        books::get_book,
        books::list_books,
        books::list_my_books,
        books::toggle_shareable,
        books::toggle_archived,
        books::upload_cover,
        // Loans
        loans::list_borrowed,
        loans::list_returned,
        loans::borrow_book,
        loans::return_book,
        loans::approve_return,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            crate::models::user::CreateUser,
            crate::models::user::ChangePassword,
            crate::models::user::UserInfo,
            // Books
            crate::models::book::CreateBook,
            crate::models::book::BookResponse,
            crate::models::page::BookPage,
            books::CoverUpload,
            // Loans
            crate::models::loan::LoanState,
            crate::models::loan::BorrowedBookResponse,
            crate::models::page::BorrowedBookPage,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and authentication"),
        (name = "books", description = "Book catalog and ownership"),
        (name = "loans", description = "Borrowing and returns")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
