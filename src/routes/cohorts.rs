use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Cohort Router Module
///
/// Defines the cohort and enrollment routes. The whole module sits behind the
/// authentication layer; on top of that, the policy table restricts cohort
/// creation, the full listing, and all membership changes to teacher actors,
/// while the by-id and by-user reads stay open to any authenticated actor.
pub fn cohort_routes() -> Router<AppState> {
    Router::new()
        // POST /cohorts: create a cohort and provision its three standard
        // course associations atomically (teacher-only).
        // GET /cohorts: list every cohort with rosters (teacher-only).
        .route(
            "/cohorts",
            post(handlers::create_cohort).get(handlers::get_all_cohorts),
        )
        // GET /cohorts/{id}
        // One cohort with its per-course student/teacher rosters.
        .route("/cohorts/{id}", get(handlers::get_cohort))
        // GET /cohorts/user/{userId}
        // The cohorts a given user is enrolled in.
        .route("/cohorts/user/{userId}", get(handlers::get_cohorts_by_user))
        // POST/DELETE /cohorts/{cohortId}/{userId}/{courseId}
        // Enrollment membership changes for the exact
        // (cohort, course, user) triple (teacher-only).
        .route(
            "/cohorts/{cohortId}/{userId}/{courseId}",
            post(handlers::add_user_to_cohort).delete(handlers::remove_user_from_cohort),
        )
}
