use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are accessible to any client, anonymous or logged
/// in: the identity gateway (registration, login) and the health probe.
/// Everything else in the application sits behind the authentication layer.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load
        // balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /users
        // New account creation. The password is hashed before storage; the
        // role defaults to 'student'.
        .route("/users", post(handlers::register))
        // POST /login
        // Credential verification and bearer-token issuance.
        .route("/login", post(handlers::login))
}
