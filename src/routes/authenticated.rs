use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any user who has passed the
/// authentication layer: the user directory and the post/comment feed.
///
/// Access Control Strategy:
/// Every handler here relies on the `AuthUser` extractor middleware being
/// present on the router layer above this module, so each handler receives a
/// validated actor (id + role). Ownership and role restrictions on individual
/// mutations are enforced by the policy table inside the content engine, not
/// by this router.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- User Directory ---
        // GET /users?first_name=...
        // Lists all registered users with optional first-name filtering.
        .route("/users", get(handlers::get_users))
        // GET/PATCH /users/{id}
        // Single-profile read and partial profile update.
        .route(
            "/users/{id}",
            get(handlers::get_user_by_id).patch(handlers::patch_user),
        )
        // --- Posts ---
        // POST /posts submits a new post; GET /posts is the full feed.
        .route(
            "/posts",
            post(handlers::create_post).get(handlers::get_all_posts),
        )
        // PATCH/DELETE /posts/{id}
        // Owner-or-teacher mutations. Deleting a post removes its comments.
        .route(
            "/posts/{id}",
            patch(handlers::update_post).delete(handlers::delete_post),
        )
        // GET /posts/user/{userId}
        // All posts authored by one user.
        .route("/posts/user/{userId}", get(handlers::get_posts_by_user))
        // --- Comments ---
        // POST/GET /posts/{id}/comments
        // Comment creation and listing under a post.
        .route(
            "/posts/{id}/comments",
            post(handlers::add_comment).get(handlers::get_comments_for_post),
        )
        // PATCH/DELETE /comments/{id}
        // Owner-or-teacher comment mutations.
        .route(
            "/comments/{id}",
            patch(handlers::update_comment).delete(handlers::delete_comment),
        )
        // GET /comments/user/{userId}
        // All comments authored by one user.
        .route(
            "/comments/user/{userId}",
            get(handlers::get_comments_by_user),
        )
}
