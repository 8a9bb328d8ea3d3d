use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod content;
pub mod enrollment;
pub mod error;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod repository;

// Module for routing segregation (Public, Authenticated, Cohorts).
pub mod routes;
use auth::AuthUser; // The resolved authenticated user identity.
use routes::{authenticated, cohorts, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the application entry point
// and the integration test harness.
pub use config::AppConfig;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the
/// application by aggregating every handler decorated with `#[utoipa::path]`
/// and every schema model. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register, handlers::login, handlers::get_users,
        handlers::get_user_by_id, handlers::patch_user,
        handlers::create_post, handlers::get_all_posts, handlers::update_post,
        handlers::delete_post, handlers::get_posts_by_user,
        handlers::add_comment, handlers::get_comments_for_post,
        handlers::update_comment, handlers::delete_comment,
        handlers::get_comments_by_user,
        handlers::create_cohort, handlers::get_all_cohorts,
        handlers::get_cohort, handlers::get_cohorts_by_user,
        handlers::add_user_to_cohort, handlers::remove_user_from_cohort
    ),
    components(
        schemas(
            models::Role, models::RegisterRequest, models::LoginRequest,
            models::LoginSuccess, models::PatchUserRequest, models::UserSummary,
            models::CreatePostRequest, models::UpdatePostRequest,
            models::CreateCommentRequest, models::PostView, models::CommentView,
            models::CreateCohortRequest, models::CohortView,
            models::CourseInCohort, models::EnrollmentView,
        )
    ),
    tags(
        (name = "cohort-portal", description = "Cohort Collaboration Platform API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding the application
/// services and configuration, shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: abstracts all data-store access.
    pub repo: RepositoryState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These allow extractors (notably AuthUser) to selectively pull components
// from the shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the protected route modules. `AuthUser`
/// implements `FromRequestParts`, so a failed resolution (bad token, deleted
/// user) rejects the request with 401 before any handler runs; on success the
/// request proceeds and the handler re-extracts the identity from the parts.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the application's routing structure, applies global and scoped
/// middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes: no middleware applied.
        .merge(public::public_routes())
        // Authenticated routes: protected by the auth middleware. Role and
        // ownership restrictions are decided per-operation by the policy
        // table inside the engines.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Cohort routes: same authentication layer; the teacher-only
        // operations are gated inside the enrollment engine.
        .merge(
            cohorts::cohort_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Apply the shared state to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID generation: a unique id for every request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request tracing: wraps the request/response lifecycle
                // in a span carrying the generated request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS layer.
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes the tracing span creation so every log line for a single
/// request is correlated by the `x-request-id` header.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
