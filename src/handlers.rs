use crate::{
    AppState, content, enrollment,
    auth::{AuthUser, issue_token},
    error::{ApiError, RepoError},
    models::{
        ApiResponse, CohortView, CommentView, CreateCohortRequest, CreateCommentRequest,
        CreatePostRequest, EnrollmentView, LoginRequest, LoginSuccess, NewUser, PatchUserRequest,
        PostView, RegisterRequest, UpdatePostRequest, UserSummary,
    },
};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;

// --- Filter Structs ---

/// UserFilter
///
/// Accepted query parameters for the user listing endpoint (GET /users).
#[derive(Deserialize, utoipa::IntoParams)]
pub struct UserFilter {
    /// Optional substring filter on the user's first name.
    pub first_name: Option<String>,
}

// --- Identity Handlers ---

/// register
///
/// [Public Route] Creates a new user account. The password is hashed with
/// argon2 before it touches the store; the role defaults to 'student' unless
/// the payload names one.
#[utoipa::path(
    post,
    path = "/users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = UserSummary),
        (status = 409, description = "Email or username taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserSummary>>), ApiError> {
    if state.repo.get_user_by_email(&payload.email).await.is_some() {
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }

    // Username falls back to the email address when not provided.
    let username = payload
        .username
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| payload.email.clone());
    if state.repo.get_user_by_username(&username).await.is_some() {
        return Err(ApiError::Conflict("Username is already in use".to_string()));
    }

    let password_hash = hash_password(&payload.password)?;

    let new_user = NewUser {
        username: Some(username),
        email: payload.email,
        password_hash,
        role: payload.role.unwrap_or_default(),
        first_name: payload.first_name.unwrap_or_default(),
        last_name: payload.last_name.unwrap_or_default(),
        bio: payload.bio.unwrap_or_default(),
        photo: payload.photo.unwrap_or_default(),
        specialism: payload.specialism.unwrap_or_default(),
    };

    let user = state.repo.create_user(new_user).await.map_err(|err| match err {
        // Lost a race with a concurrent registration for the same email.
        RepoError::UniqueViolation => ApiError::Conflict("Email already exists".to_string()),
        other => other.into(),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(user.summary())),
    ))
}

/// login
///
/// [Public Route] Verifies credentials and issues a signed bearer token. Any
/// failure (unknown email or wrong password) yields the same message, so
/// the endpoint cannot be used to probe which accounts exist.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginSuccess),
        (status = 400, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginSuccess>>, ApiError> {
    let invalid =
        || ApiError::Invariant("Invalid email and/or password provided".to_string());

    let user = state
        .repo
        .get_user_by_email(&payload.email)
        .await
        .ok_or_else(invalid)?;

    let parsed_hash = PasswordHash::new(&user.password_hash).map_err(|_| invalid())?;
    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid())?;

    let token = issue_token(&user, &state.config)
        .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))?;

    Ok(Json(ApiResponse::success(LoginSuccess {
        token,
        user: user.summary(),
    })))
}

/// get_users
///
/// [Authenticated Route] Lists all users, optionally filtered by first name.
#[utoipa::path(
    get,
    path = "/users",
    params(UserFilter),
    responses((status = 200, description = "Users", body = [UserSummary]))
)]
pub async fn get_users(
    _actor: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> Json<ApiResponse<Vec<UserSummary>>> {
    let users = state.repo.get_users().await;
    let users = users
        .iter()
        .filter(|u| match &filter.first_name {
            Some(name) => u.first_name.contains(name.as_str()),
            None => true,
        })
        .map(|u| u.summary())
        .collect();
    Json(ApiResponse::success(users))
}

/// get_user_by_id
///
/// [Authenticated Route] Retrieves a single user's profile.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserSummary),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user_by_id(
    _actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<UserSummary>>, ApiError> {
    let user = state
        .repo
        .get_user(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("User with Id {id} not found.")))?;
    Ok(Json(ApiResponse::success(user.summary())))
}

/// patch_user
///
/// [Authenticated Route] Partial profile update. Only fields present in the
/// body are applied; username and email changes are checked for uniqueness.
#[utoipa::path(
    patch,
    path = "/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    request_body = PatchUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserSummary),
        (status = 400, description = "Identifier already in use"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn patch_user(
    _actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(patch): Json<PatchUserRequest>,
) -> Result<Json<ApiResponse<UserSummary>>, ApiError> {
    let mut user = state
        .repo
        .get_user(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("User with Id {id} not found.")))?;

    if let Some(username) = patch.username {
        let taken = state
            .repo
            .get_user_by_username(&username)
            .await
            .is_some_and(|existing| existing.id != id);
        if taken {
            return Err(ApiError::Invariant("Username is already in use".to_string()));
        }
        user.username = Some(username);
    }
    if let Some(email) = patch.email {
        let taken = state
            .repo
            .get_user_by_email(&email)
            .await
            .is_some_and(|existing| existing.id != id);
        if taken {
            return Err(ApiError::Invariant("Email is already in use".to_string()));
        }
        user.email = email;
    }
    if let Some(password) = patch.password {
        user.password_hash = hash_password(&password)?;
    }
    if let Some(role) = patch.role {
        user.role = role;
    }
    if let Some(first_name) = patch.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = patch.last_name {
        user.last_name = last_name;
    }
    if let Some(bio) = patch.bio {
        user.bio = bio;
    }
    if let Some(photo) = patch.photo {
        user.photo = photo;
    }
    if let Some(specialism) = patch.specialism {
        user.specialism = specialism;
    }

    let updated = state.repo.update_user(user).await?;
    Ok(Json(ApiResponse::success(updated.summary())))
}

// --- Post & Comment Handlers ---

/// create_post
///
/// [Authenticated Route] Submits a new post authored by the requesting user.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = PostView),
        (status = 400, description = "Empty content")
    )
)]
pub async fn create_post(
    actor: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PostView>>), ApiError> {
    let post = content::create_post(state.repo.as_ref(), &actor, &payload.content).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(post))))
}

/// get_all_posts
///
/// [Authenticated Route] Lists every post with author and nested comments.
#[utoipa::path(
    get,
    path = "/posts",
    responses((status = 200, description = "Posts", body = [PostView]))
)]
pub async fn get_all_posts(
    actor: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<PostView>>>, ApiError> {
    let posts = content::get_posts(state.repo.as_ref(), &actor).await?;
    Ok(Json(ApiResponse::success(posts)))
}

/// update_post
///
/// [Authenticated Route] Replaces a post's content. Owner-or-teacher.
#[utoipa::path(
    patch,
    path = "/posts/{id}",
    params(("id" = i32, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = PostView),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_post(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<ApiResponse<PostView>>, ApiError> {
    let post = content::update_post(state.repo.as_ref(), &actor, id, &payload.content).await?;
    Ok(Json(ApiResponse::success(post)))
}

/// delete_post
///
/// [Authenticated Route] Deletes a post and all of its comments.
/// Owner-or-teacher.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    content::delete_post(state.repo.as_ref(), &actor, id).await?;
    Ok(Json(ApiResponse::message("Success")))
}

/// get_posts_by_user
///
/// [Authenticated Route] Lists all posts authored by a specific user.
#[utoipa::path(
    get,
    path = "/posts/user/{userId}",
    params(("userId" = i32, Path, description = "Author's user ID")),
    responses(
        (status = 200, description = "Posts", body = [PostView]),
        (status = 404, description = "No posts for user")
    )
)]
pub async fn get_posts_by_user(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<PostView>>>, ApiError> {
    let posts = content::get_posts_by_user(state.repo.as_ref(), &actor, user_id).await?;
    Ok(Json(ApiResponse::success(posts)))
}

/// add_comment
///
/// [Authenticated Route] Posts a new comment under an existing post.
#[utoipa::path(
    post,
    path = "/posts/{id}/comments",
    params(("id" = i32, Path, description = "Post ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment Added", body = CommentView),
        (status = 400, description = "Empty content"),
        (status = 404, description = "Post Not Found")
    )
)]
pub async fn add_comment(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CommentView>>), ApiError> {
    let comment =
        content::add_comment(state.repo.as_ref(), &actor, post_id, &payload.content).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(comment))))
}

/// get_comments_for_post
///
/// [Authenticated Route] Lists the comments under a specific post.
#[utoipa::path(
    get,
    path = "/posts/{id}/comments",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Comments", body = [CommentView]),
        (status = 404, description = "Post Not Found")
    )
)]
pub async fn get_comments_for_post(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<CommentView>>>, ApiError> {
    let comments = content::get_comments_for_post(state.repo.as_ref(), &actor, post_id).await?;
    Ok(Json(ApiResponse::success(comments)))
}

/// update_comment
///
/// [Authenticated Route] Replaces a comment's content. Owner-or-teacher.
#[utoipa::path(
    patch,
    path = "/comments/{id}",
    params(("id" = i32, Path, description = "Comment ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "Updated", body = CommentView),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_comment(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<Json<ApiResponse<CommentView>>, ApiError> {
    let comment =
        content::update_comment(state.repo.as_ref(), &actor, id, &payload.content).await?;
    Ok(Json(ApiResponse::new(
        "Comment updated successfully.",
        comment,
    )))
}

/// delete_comment
///
/// [Authenticated Route] Deletes a comment. Owner-or-teacher.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = i32, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_comment(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    content::delete_comment(state.repo.as_ref(), &actor, id).await?;
    Ok(Json(ApiResponse::message("Comment deleted successfully.")))
}

/// get_comments_by_user
///
/// [Authenticated Route] Lists all comments authored by a specific user.
#[utoipa::path(
    get,
    path = "/comments/user/{userId}",
    params(("userId" = i32, Path, description = "Author's user ID")),
    responses(
        (status = 200, description = "Comments", body = [CommentView]),
        (status = 404, description = "No comments for user")
    )
)]
pub async fn get_comments_by_user(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<CommentView>>>, ApiError> {
    let comments = content::get_comments_by_user(state.repo.as_ref(), &actor, user_id).await?;
    Ok(Json(ApiResponse::success(comments)))
}

// --- Cohort & Enrollment Handlers ---

/// create_cohort
///
/// [Teacher Route] Creates a cohort and provisions its three standard course
/// associations atomically.
#[utoipa::path(
    post,
    path = "/cohorts",
    request_body = CreateCohortRequest,
    responses(
        (status = 201, description = "Created", body = CohortView),
        (status = 400, description = "Title already exists"),
        (status = 403, description = "Not a teacher")
    )
)]
pub async fn create_cohort(
    actor: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCohortRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CohortView>>), ApiError> {
    let cohort = enrollment::create_cohort(state.repo.as_ref(), &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(cohort))))
}

/// get_all_cohorts
///
/// [Teacher Route] Lists every cohort with full per-course rosters.
#[utoipa::path(
    get,
    path = "/cohorts",
    responses(
        (status = 200, description = "Cohorts", body = [CohortView]),
        (status = 403, description = "Not a teacher")
    )
)]
pub async fn get_all_cohorts(
    actor: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CohortView>>>, ApiError> {
    let cohorts = enrollment::get_all_cohorts(state.repo.as_ref(), &actor).await?;
    Ok(Json(ApiResponse::success(cohorts)))
}

/// get_cohort
///
/// [Authenticated Route] Retrieves one cohort with its per-course rosters.
#[utoipa::path(
    get,
    path = "/cohorts/{id}",
    params(("id" = i32, Path, description = "Cohort ID")),
    responses(
        (status = 200, description = "Cohort", body = CohortView),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_cohort(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<CohortView>>, ApiError> {
    let cohort = enrollment::get_cohort(state.repo.as_ref(), &actor, id).await?;
    Ok(Json(ApiResponse::success(cohort)))
}

/// get_cohorts_by_user
///
/// [Authenticated Route] Lists the cohorts a user is enrolled in.
#[utoipa::path(
    get,
    path = "/cohorts/user/{userId}",
    params(("userId" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Cohorts", body = [CohortView]),
        (status = 404, description = "User Not Found")
    )
)]
pub async fn get_cohorts_by_user(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<CohortView>>>, ApiError> {
    let cohorts = enrollment::get_cohorts_for_user(state.repo.as_ref(), &actor, user_id).await?;
    Ok(Json(ApiResponse::success(cohorts)))
}

/// add_user_to_cohort
///
/// [Teacher Route] Enrolls a user into a course within a cohort.
#[utoipa::path(
    post,
    path = "/cohorts/{cohortId}/{userId}/{courseId}",
    params(
        ("cohortId" = i32, Path, description = "Cohort ID"),
        ("userId" = i32, Path, description = "User ID"),
        ("courseId" = i32, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Enrolled", body = EnrollmentView),
        (status = 400, description = "Invariant violation"),
        (status = 403, description = "Not a teacher"),
        (status = 404, description = "User or cohort not found")
    )
)]
pub async fn add_user_to_cohort(
    actor: AuthUser,
    State(state): State<AppState>,
    Path((cohort_id, user_id, course_id)): Path<(i32, i32, i32)>,
) -> Result<Json<ApiResponse<EnrollmentView>>, ApiError> {
    let enrolled =
        enrollment::add_enrollment(state.repo.as_ref(), &actor, user_id, cohort_id, course_id)
            .await?;
    Ok(Json(ApiResponse::success(enrolled)))
}

/// remove_user_from_cohort
///
/// [Teacher Route] Removes a user's enrollment in a course within a cohort.
#[utoipa::path(
    delete,
    path = "/cohorts/{cohortId}/{userId}/{courseId}",
    params(
        ("cohortId" = i32, Path, description = "Cohort ID"),
        ("userId" = i32, Path, description = "User ID"),
        ("courseId" = i32, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Unenrolled", body = EnrollmentView),
        (status = 400, description = "Invariant violation"),
        (status = 403, description = "Not a teacher"),
        (status = 404, description = "User or cohort not found")
    )
)]
pub async fn remove_user_from_cohort(
    actor: AuthUser,
    State(state): State<AppState>,
    Path((cohort_id, user_id, course_id)): Path<(i32, i32, i32)>,
) -> Result<Json<ApiResponse<EnrollmentView>>, ApiError> {
    let removed =
        enrollment::remove_enrollment(state.repo.as_ref(), &actor, user_id, cohort_id, course_id)
            .await?;
    Ok(Json(ApiResponse::success(removed)))
}

/// hash_password
///
/// argon2 with a fresh random salt; the PHC string is what gets stored.
fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}
