mod common;

use common::{actor, seed_user};

use cohort_portal::content::{
    add_comment, create_post, delete_comment, delete_post, get_comments_by_user,
    get_comments_for_post, get_posts, get_posts_by_user, update_comment, update_post,
};
use cohort_portal::error::ApiError;
use cohort_portal::models::Role;
use cohort_portal::repository::{InMemoryRepository, Repository};

fn invariant<T: std::fmt::Debug>(result: Result<T, ApiError>) -> String {
    match result {
        Err(ApiError::Invariant(message)) => message,
        other => panic!("expected an invariant violation, got {other:?}"),
    }
}

fn not_found<T: std::fmt::Debug>(result: Result<T, ApiError>) -> String {
    match result {
        Err(ApiError::NotFound(message)) => message,
        other => panic!("expected not-found, got {other:?}"),
    }
}

fn forbidden<T: std::fmt::Debug>(result: Result<T, ApiError>) -> String {
    match result {
        Err(ApiError::Forbidden(message)) => message,
        other => panic!("expected forbidden, got {other:?}"),
    }
}

// --- Posts ---

#[tokio::test]
async fn create_post_rejects_empty_and_whitespace_content() {
    let repo = InMemoryRepository::new();
    let author = seed_user(&repo, Role::Student, "author@school.test").await;

    let result = create_post(&repo, &actor(&author), "").await;
    assert_eq!(invariant(result), "Content cannot be empty");

    let result = create_post(&repo, &actor(&author), "   \t\n").await;
    assert_eq!(invariant(result), "Content cannot be empty");
}

#[tokio::test]
async fn a_new_post_starts_with_zero_likes_and_no_comments() {
    let repo = InMemoryRepository::new();
    let author = seed_user(&repo, Role::Student, "author@school.test").await;

    let post = create_post(&repo, &actor(&author), "First!")
        .await
        .expect("post creation should succeed");

    assert_eq!(post.num_likes, 0);
    assert!(post.comments.is_empty());
    assert!(post.updated_at.is_none());
    assert_eq!(post.user.id, author.id);
}

#[tokio::test]
async fn update_post_reports_a_missing_post() {
    let repo = InMemoryRepository::new();
    let author = seed_user(&repo, Role::Student, "author@school.test").await;

    let result = update_post(&repo, &actor(&author), 999, "new content").await;
    assert_eq!(not_found(result), "Post not found");
}

#[tokio::test]
async fn update_post_rejects_empty_content_before_authorization() {
    let repo = InMemoryRepository::new();
    let author = seed_user(&repo, Role::Student, "author@school.test").await;
    let stranger = seed_user(&repo, Role::Student, "stranger@school.test").await;

    let post = create_post(&repo, &actor(&author), "hello")
        .await
        .expect("post creation should succeed");

    // Even a non-owner sees the 400 first: content is checked before the
    // ownership decision.
    let result = update_post(&repo, &actor(&stranger), post.id, "  ").await;
    assert_eq!(invariant(result), "Content cannot be empty");
}

#[tokio::test]
async fn only_the_owner_or_a_teacher_may_edit_a_post() {
    let repo = InMemoryRepository::new();
    let author = seed_user(&repo, Role::Student, "author@school.test").await;
    let stranger = seed_user(&repo, Role::Student, "stranger@school.test").await;
    let teacher = seed_user(&repo, Role::Teacher, "teacher@school.test").await;

    let post = create_post(&repo, &actor(&author), "original")
        .await
        .expect("post creation should succeed");

    let result = update_post(&repo, &actor(&stranger), post.id, "hijacked").await;
    assert_eq!(
        forbidden(result),
        "You are not authorized to edit this post."
    );

    let updated = update_post(&repo, &actor(&author), post.id, "edited by owner")
        .await
        .expect("owner edit should succeed");
    assert_eq!(updated.content, "edited by owner");
    assert!(updated.updated_at.is_some(), "edit stamps updated_at");

    let updated = update_post(&repo, &actor(&teacher), post.id, "edited by teacher")
        .await
        .expect("teacher override should succeed");
    assert_eq!(updated.content, "edited by teacher");
}

#[tokio::test]
async fn deleting_a_post_cascades_to_its_comments() {
    let repo = InMemoryRepository::new();
    let author = seed_user(&repo, Role::Student, "author@school.test").await;
    let commenter = seed_user(&repo, Role::Student, "commenter@school.test").await;

    let post = create_post(&repo, &actor(&author), "soon to be gone")
        .await
        .expect("post creation should succeed");
    let first = add_comment(&repo, &actor(&commenter), post.id, "me first")
        .await
        .expect("comment should succeed");
    let second = add_comment(&repo, &actor(&author), post.id, "replying to myself")
        .await
        .expect("comment should succeed");

    delete_post(&repo, &actor(&author), post.id)
        .await
        .expect("owner delete should succeed");

    // No orphan comments.
    assert!(repo.get_comment(first.id).await.is_none());
    assert!(repo.get_comment(second.id).await.is_none());

    // Deleting again is a clean 404.
    let result = delete_post(&repo, &actor(&author), post.id).await;
    assert_eq!(not_found(result), "Post not found");
}

#[tokio::test]
async fn only_the_owner_or_a_teacher_may_delete_a_post() {
    let repo = InMemoryRepository::new();
    let author = seed_user(&repo, Role::Student, "author@school.test").await;
    let stranger = seed_user(&repo, Role::Student, "stranger@school.test").await;
    let teacher = seed_user(&repo, Role::Teacher, "teacher@school.test").await;

    let post = create_post(&repo, &actor(&author), "contested")
        .await
        .expect("post creation should succeed");

    let result = delete_post(&repo, &actor(&stranger), post.id).await;
    assert_eq!(
        forbidden(result),
        "You are not authorized to delete this post."
    );

    delete_post(&repo, &actor(&teacher), post.id)
        .await
        .expect("teacher override should succeed");
    assert!(repo.get_post(post.id).await.is_none());
}

#[tokio::test]
async fn get_posts_returns_authors_and_nested_comments() {
    let repo = InMemoryRepository::new();
    let author = seed_user(&repo, Role::Student, "author@school.test").await;
    let commenter = seed_user(&repo, Role::Student, "commenter@school.test").await;

    let post = create_post(&repo, &actor(&author), "discuss")
        .await
        .expect("post creation should succeed");
    add_comment(&repo, &actor(&commenter), post.id, "interesting")
        .await
        .expect("comment should succeed");

    let feed = get_posts(&repo, &actor(&author))
        .await
        .expect("feed read should succeed");
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].user.email, "author@school.test");
    assert_eq!(feed[0].comments.len(), 1);
    assert_eq!(feed[0].comments[0].user.email, "commenter@school.test");
}

#[tokio::test]
async fn posts_by_user_reports_an_empty_result_as_not_found() {
    let repo = InMemoryRepository::new();
    let reader = seed_user(&repo, Role::Student, "reader@school.test").await;

    let result = get_posts_by_user(&repo, &actor(&reader), reader.id).await;
    assert_eq!(not_found(result), "No posts found for this user");
}

// --- Comments ---

#[tokio::test]
async fn add_comment_requires_an_existing_post_and_content() {
    let repo = InMemoryRepository::new();
    let commenter = seed_user(&repo, Role::Student, "commenter@school.test").await;

    let result = add_comment(&repo, &actor(&commenter), 999, "into the void").await;
    assert_eq!(not_found(result), "Post not found.");

    let post = create_post(&repo, &actor(&commenter), "a post")
        .await
        .expect("post creation should succeed");
    let result = add_comment(&repo, &actor(&commenter), post.id, "   ").await;
    assert_eq!(invariant(result), "Comment content cannot be empty.");
}

#[tokio::test]
async fn update_comment_checks_existence_content_then_ownership() {
    let repo = InMemoryRepository::new();
    let author = seed_user(&repo, Role::Student, "author@school.test").await;
    let stranger = seed_user(&repo, Role::Student, "stranger@school.test").await;
    let teacher = seed_user(&repo, Role::Teacher, "teacher@school.test").await;

    let result = update_comment(&repo, &actor(&author), 999, "new").await;
    assert_eq!(not_found(result), "Comment not found.");

    let post = create_post(&repo, &actor(&author), "a post")
        .await
        .expect("post creation should succeed");
    let comment = add_comment(&repo, &actor(&author), post.id, "original")
        .await
        .expect("comment should succeed");

    let result = update_comment(&repo, &actor(&author), comment.id, " ").await;
    assert_eq!(invariant(result), "Content cannot be empty.");

    let result = update_comment(&repo, &actor(&stranger), comment.id, "hijacked").await;
    assert_eq!(
        forbidden(result),
        "You are not authorized to edit this comment."
    );

    let updated = update_comment(&repo, &actor(&teacher), comment.id, "moderated")
        .await
        .expect("teacher override should succeed");
    assert_eq!(updated.content, "moderated");
    assert!(updated.updated_at.is_some());
}

#[tokio::test]
async fn delete_comment_enforces_ownership_with_teacher_override() {
    let repo = InMemoryRepository::new();
    let author = seed_user(&repo, Role::Student, "author@school.test").await;
    let stranger = seed_user(&repo, Role::Student, "stranger@school.test").await;
    let teacher = seed_user(&repo, Role::Teacher, "teacher@school.test").await;

    let post = create_post(&repo, &actor(&author), "a post")
        .await
        .expect("post creation should succeed");
    let mine = add_comment(&repo, &actor(&author), post.id, "mine")
        .await
        .expect("comment should succeed");
    let theirs = add_comment(&repo, &actor(&stranger), post.id, "theirs")
        .await
        .expect("comment should succeed");

    let result = delete_comment(&repo, &actor(&stranger), mine.id).await;
    assert_eq!(
        forbidden(result),
        "You are not authorized to delete this comment."
    );

    delete_comment(&repo, &actor(&author), mine.id)
        .await
        .expect("owner delete should succeed");
    delete_comment(&repo, &actor(&teacher), theirs.id)
        .await
        .expect("teacher override should succeed");

    let result = delete_comment(&repo, &actor(&author), mine.id).await;
    assert_eq!(not_found(result), "Comment not found.");
}

#[tokio::test]
async fn comment_listings_report_missing_targets() {
    let repo = InMemoryRepository::new();
    let reader = seed_user(&repo, Role::Student, "reader@school.test").await;

    let result = get_comments_for_post(&repo, &actor(&reader), 999).await;
    assert_eq!(not_found(result), "Post not found");

    let result = get_comments_by_user(&repo, &actor(&reader), reader.id).await;
    assert_eq!(not_found(result), "No comments found for this user");
}
