//! Content Mutation Engine: post and comment create/read/update/delete.
//!
//! Every mutation runs the same check order (existence 404, content
//! validity 400, authorization 403) and all authorization goes through
//! the policy table: a student may only touch what they own, a teacher may
//! touch anything.

use chrono::Utc;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{Comment, CommentView, Post, PostView};
use crate::policy::{self, Action, Resource};
use crate::repository::Repository;

fn empty(content: &str) -> bool {
    content.trim().is_empty()
}

/// create_post
///
/// Any authenticated actor. Content must be non-empty; new posts start with
/// zero likes and no comments.
pub async fn create_post(
    repo: &dyn Repository,
    actor: &AuthUser,
    content: &str,
) -> Result<PostView, ApiError> {
    policy::decide(actor, Resource::Post, Action::Create, None)?;

    let user = repo
        .get_user(actor.id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("User with Id {} not found.", actor.id)))?;

    if empty(content) {
        return Err(ApiError::Invariant("Content cannot be empty".to_string()));
    }

    let post = repo.create_post(actor.id, content).await?;
    tracing::info!(post_id = post.id, user_id = actor.id, "post created");

    Ok(PostView {
        id: post.id,
        user: user.summary(),
        content: post.content,
        created_at: post.created_at,
        updated_at: post.updated_at,
        num_likes: post.num_likes,
        comments: Vec::new(),
    })
}

/// get_posts
///
/// All posts with their authors and nested comments, newest first.
pub async fn get_posts(repo: &dyn Repository, actor: &AuthUser) -> Result<Vec<PostView>, ApiError> {
    policy::decide(actor, Resource::Post, Action::List, None)?;

    let mut views = Vec::new();
    for post in repo.get_posts().await {
        views.push(post_view(repo, post).await);
    }
    Ok(views)
}

/// get_posts_by_user
pub async fn get_posts_by_user(
    repo: &dyn Repository,
    actor: &AuthUser,
    user_id: i32,
) -> Result<Vec<PostView>, ApiError> {
    policy::decide(actor, Resource::Post, Action::List, None)?;

    let posts = repo.get_posts_by_user(user_id).await;
    if posts.is_empty() {
        return Err(ApiError::NotFound(
            "No posts found for this user".to_string(),
        ));
    }

    let mut views = Vec::new();
    for post in posts {
        views.push(post_view(repo, post).await);
    }
    Ok(views)
}

/// update_post
///
/// Owner-or-teacher. Replaces the content and stamps `updated_at`.
pub async fn update_post(
    repo: &dyn Repository,
    actor: &AuthUser,
    post_id: i32,
    content: &str,
) -> Result<PostView, ApiError> {
    let mut post = repo
        .get_post(post_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    if empty(content) {
        return Err(ApiError::Invariant("Content cannot be empty".to_string()));
    }

    policy::decide(actor, Resource::Post, Action::Update, Some(post.user_id))?;

    post.content = content.to_string();
    post.updated_at = Some(Utc::now());
    let post = repo.update_post(post).await?;

    Ok(post_view(repo, post).await)
}

/// delete_post
///
/// Owner-or-teacher. Deletes the post and all of its comments.
pub async fn delete_post(
    repo: &dyn Repository,
    actor: &AuthUser,
    post_id: i32,
) -> Result<(), ApiError> {
    let post = repo
        .get_post(post_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    policy::decide(actor, Resource::Post, Action::Delete, Some(post.user_id))?;

    if !repo.delete_post(post_id).await? {
        // Lost a race with another delete.
        return Err(ApiError::NotFound("Post not found".to_string()));
    }
    tracing::info!(post_id, "post deleted");
    Ok(())
}

/// add_comment
///
/// Any authenticated actor may comment on any existing post.
pub async fn add_comment(
    repo: &dyn Repository,
    actor: &AuthUser,
    post_id: i32,
    content: &str,
) -> Result<CommentView, ApiError> {
    policy::decide(actor, Resource::Comment, Action::Create, None)?;

    if repo.get_post(post_id).await.is_none() {
        return Err(ApiError::NotFound("Post not found.".to_string()));
    }

    let user = repo
        .get_user(actor.id)
        .await
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    if empty(content) {
        return Err(ApiError::Invariant(
            "Comment content cannot be empty.".to_string(),
        ));
    }

    let comment = repo.create_comment(post_id, actor.id, content).await?;
    tracing::info!(comment_id = comment.id, post_id, "comment created");

    Ok(CommentView {
        id: comment.id,
        post_id: comment.post_id,
        user: user.summary(),
        content: comment.content,
        created_at: comment.created_at,
        updated_at: comment.updated_at,
    })
}

/// get_comments_for_post
pub async fn get_comments_for_post(
    repo: &dyn Repository,
    actor: &AuthUser,
    post_id: i32,
) -> Result<Vec<CommentView>, ApiError> {
    policy::decide(actor, Resource::Comment, Action::List, None)?;

    if repo.get_post(post_id).await.is_none() {
        return Err(ApiError::NotFound("Post not found".to_string()));
    }

    let mut views = Vec::new();
    for comment in repo.get_comments_for_post(post_id).await {
        views.push(comment_view(repo, comment).await);
    }
    Ok(views)
}

/// get_comments_by_user
pub async fn get_comments_by_user(
    repo: &dyn Repository,
    actor: &AuthUser,
    user_id: i32,
) -> Result<Vec<CommentView>, ApiError> {
    policy::decide(actor, Resource::Comment, Action::List, None)?;

    let comments = repo.get_comments_by_user(user_id).await;
    if comments.is_empty() {
        return Err(ApiError::NotFound(
            "No comments found for this user".to_string(),
        ));
    }

    let mut views = Vec::new();
    for comment in comments {
        views.push(comment_view(repo, comment).await);
    }
    Ok(views)
}

/// update_comment
///
/// Owner-or-teacher. Replaces the content and stamps `updated_at`.
pub async fn update_comment(
    repo: &dyn Repository,
    actor: &AuthUser,
    comment_id: i32,
    content: &str,
) -> Result<CommentView, ApiError> {
    let mut comment = repo
        .get_comment(comment_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Comment not found.".to_string()))?;

    if empty(content) {
        return Err(ApiError::Invariant("Content cannot be empty.".to_string()));
    }

    policy::decide(actor, Resource::Comment, Action::Update, Some(comment.user_id))?;

    comment.content = content.to_string();
    comment.updated_at = Some(Utc::now());
    let comment = repo.update_comment(comment).await?;

    Ok(comment_view(repo, comment).await)
}

/// delete_comment
///
/// Owner-or-teacher.
pub async fn delete_comment(
    repo: &dyn Repository,
    actor: &AuthUser,
    comment_id: i32,
) -> Result<(), ApiError> {
    let comment = repo
        .get_comment(comment_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Comment not found.".to_string()))?;

    policy::decide(actor, Resource::Comment, Action::Delete, Some(comment.user_id))?;

    if !repo.delete_comment(comment_id).await? {
        return Err(ApiError::NotFound("Comment not found.".to_string()));
    }
    tracing::info!(comment_id, "comment deleted");
    Ok(())
}

/// post_view
///
/// Enriches a post row with its author and nested comment views.
async fn post_view(repo: &dyn Repository, post: Post) -> PostView {
    let user = repo
        .get_user(post.user_id)
        .await
        .map(|u| u.summary())
        .unwrap_or_default();

    let mut comments = Vec::new();
    for comment in repo.get_comments_for_post(post.id).await {
        comments.push(comment_view(repo, comment).await);
    }

    PostView {
        id: post.id,
        user,
        content: post.content,
        created_at: post.created_at,
        updated_at: post.updated_at,
        num_likes: post.num_likes,
        comments,
    }
}

async fn comment_view(repo: &dyn Repository, comment: Comment) -> CommentView {
    let user = repo
        .get_user(comment.user_id)
        .await
        .map(|u| u.summary())
        .unwrap_or_default();

    CommentView {
        id: comment.id,
        post_id: comment.post_id,
        user,
        content: comment.content,
        created_at: comment.created_at,
        updated_at: comment.updated_at,
    }
}
