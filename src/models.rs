use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The RBAC discriminator carried by every `User` row and by the resolved
/// `AuthUser` identity. Stored in Postgres as the `role` enum type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "role", rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Teacher,
    #[default]
    Student,
}

/// User
///
/// The canonical identity record from the `users` table. The password hash is
/// opaque to the application and never serialized; wire responses use
/// [`UserSummary`].
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: i32,
    // Unique when present; registration falls back to the email address.
    pub username: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub photo: String,
    pub specialism: String,
}

impl User {
    /// Projects the row into its wire-safe form (everything but the hash).
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            bio: self.bio.clone(),
            photo: self.photo.clone(),
            specialism: self.specialism.clone(),
        }
    }
}

/// Post
///
/// A feed post owned by `user_id`. Mutable by its owner or by a teacher;
/// deleting it cascades to its comments.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Post {
    pub id: i32,
    pub user_id: i32,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub num_likes: i32,
}

/// Comment
///
/// A comment under a post, owned by `user_id`. Same ownership rules as `Post`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: i32,
    pub post_id: i32,
    pub user_id: i32,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Cohort
///
/// A named group of enrolled users spanning a fixed set of courses. The title
/// is unique across the system.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Cohort {
    pub id: i32,
    pub title: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Course
///
/// A shared, title-identified subject. Course rows are created lazily the
/// first time a cohort needs them and are shared across cohorts by title.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Course {
    pub id: i32,
    pub title: String,
}

/// CohortCourse
///
/// Composite-key association row declaring that `course_id` is offered within
/// `cohort_id`. Must exist before anyone can be enrolled in that pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CohortCourse {
    pub cohort_id: i32,
    pub course_id: i32,
}

/// Enrollment
///
/// The CohortCourseUser row: "this user takes this course within this cohort".
/// Composite primary key (cohort_id, course_id, user_id); at most one row per
/// triple, enforced by the store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, FromRow, Default,
)]
#[ts(export)]
pub struct Enrollment {
    pub cohort_id: i32,
    pub course_id: i32,
    pub user_id: i32,
}

/// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for the public registration endpoint (POST /users).
/// The password is hashed before storage and never persisted in clear text.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: String,
    pub password: String,
    // Defaults to 'student' when omitted.
    pub role: Option<Role>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub photo: Option<String>,
    pub specialism: Option<String>,
}

/// LoginRequest
///
/// Input payload for POST /login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// LoginSuccess
///
/// Output payload for a successful login: the signed bearer token plus the
/// resolved user record.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginSuccess {
    pub token: String,
    pub user: UserSummary,
}

/// PatchUserRequest
///
/// Partial update payload for PATCH /users/{id}. Only fields present in the
/// JSON body are applied.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PatchUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialism: Option<String>,
}

/// CreatePostRequest
///
/// Input payload for submitting a new post. Content must be non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    pub content: String,
}

/// UpdatePostRequest
///
/// Replacement content for PATCH /posts/{id}.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    pub content: String,
}

/// CreateCommentRequest
///
/// Input payload for posting or editing a comment.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub content: String,
}

/// CreateCohortRequest
///
/// Input payload for POST /cohorts. The cohort window dates are optional.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCohortRequest {
    pub title: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// NewUser
///
/// Internal insert payload handed to the repository once registration input
/// has been resolved (password already hashed, role defaulted).
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub photo: String,
    pub specialism: String,
}

/// --- Read Projections (Output Schemas) ---

/// UserSummary
///
/// The wire-safe view of a user: every profile field except the password hash.
/// Used for rosters, post/comment authors, and the user endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserSummary {
    pub id: i32,
    pub username: Option<String>,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub photo: String,
    pub specialism: String,
}

/// CommentView
///
/// A comment enriched with its author.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentView {
    pub id: i32,
    pub post_id: i32,
    pub user: UserSummary,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// PostView
///
/// A post enriched with its author and nested comments.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostView {
    pub id: i32,
    pub user: UserSummary,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub num_likes: i32,
    pub comments: Vec<CommentView>,
}

/// CourseInCohort
///
/// One course as offered within a specific cohort, with the enrolled users
/// partitioned into role buckets for presentation.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CourseInCohort {
    pub id: i32,
    pub title: String,
    pub students: Vec<UserSummary>,
    pub teachers: Vec<UserSummary>,
}

/// CohortView
///
/// The eager projection of a cohort: Cohort → CohortCourse → Course plus the
/// per-course rosters traversed from the enrollment rows.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CohortView {
    pub id: i32,
    pub title: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub courses: Vec<CourseInCohort>,
}

/// EnrollmentView
///
/// Echo of a single enrollment fact with display titles, returned by the
/// enrollment mutation endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct EnrollmentView {
    pub cohort: String,
    pub course: String,
    pub user: UserSummary,
}

/// --- Response Envelope ---

/// ApiResponse
///
/// The uniform `{ message, data }` envelope wrapping every operation result.
/// Error responses carry the denial/violation message with `data: null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }

    /// The common happy-path envelope.
    pub fn success(data: T) -> Self {
        Self::new("Success", data)
    }

    /// An envelope carrying only a message (deletes and other data-less
    /// outcomes).
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}
