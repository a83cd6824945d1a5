use crate::handlers::{
    admin::{
        delete_user, handle_license_request, provision_enterprise, set_assigned_admin,
        set_card_suspension, set_user_suspension,
    },
    auth::{login, me, register},
    cards::{card_quota, create_card, get_card, list_cards, update_card},
    enterprise::{
        add_member, claim_member, grant_sub_licenses, list_license_requests,
        submit_license_request,
    },
    health::health_check,
    pages::render_page,
    public::get_public_card,
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.settings.server.request_timeout_secs);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Authentication
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/me", get(me))
        // Card management
        .route("/api/v1/cards", get(list_cards).post(create_card))
        .route("/api/v1/cards/quota", get(card_quota))
        .route("/api/v1/cards/:card_id", get(get_card).put(update_card))
        // Anonymous card reads
        .route("/api/v1/public/cards/:slug", get(get_public_card))
        // Enterprise administration
        .route(
            "/api/v1/enterprise/license-requests",
            get(list_license_requests).post(submit_license_request),
        )
        .route("/api/v1/enterprise/members", post(add_member))
        .route(
            "/api/v1/enterprise/members/:user_id/sub-licenses",
            put(grant_sub_licenses),
        )
        .route("/api/v1/enterprise/members/:user_id/claim", post(claim_member))
        // Platform administration
        .route("/api/v1/admin/enterprises", post(provision_enterprise))
        .route(
            "/api/v1/admin/license-requests/:request_id/:action",
            post(handle_license_request),
        )
        .route("/api/v1/admin/users/:user_id", delete(delete_user))
        .route("/api/v1/admin/users/:user_id/suspension", put(set_user_suspension))
        .route("/api/v1/admin/users/:user_id/assigned-admin", put(set_assigned_admin))
        .route("/api/v1/admin/cards/:card_id/suspension", put(set_card_suspension))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public card pages and static files
        .fallback(render_page)
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
