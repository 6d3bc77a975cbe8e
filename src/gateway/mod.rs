mod admin;
mod customer_portal;
mod openapi;
mod state;
mod terminal;

pub use openapi::ApiDoc;
pub use state::AppState;

use axum::Router;
use utoipa_swagger_ui::SwaggerUi;

/// Builds the full router: the three HTTP families nested under their own prefixes, plus
/// the Swagger UI mounted at `/docs`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/admin", admin::router())
        .nest("/terminal", terminal::router())
        .nest("/customer-portal", customer_portal::router())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", <ApiDoc as utoipa::OpenApi>::openapi()))
        .with_state(state)
}
