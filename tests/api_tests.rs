mod common;

use cohort_portal::{
    AppConfig, AppState, InMemoryRepository, create_router, repository::RepositoryState,
};
use common::seed_user;

use cohort_portal::models::Role;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub repo: Arc<InMemoryRepository>,
}

/// Boots the full router on an ephemeral port over the in-memory store, the
/// same assembly as production minus Postgres.
async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let repo_state: RepositoryState = repo.clone();

    let state = AppState {
        repo: repo_state,
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, repo }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_register_login_token_flow() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Register
    let response = client
        .post(format!("{}/users", app.address))
        .json(&json!({
            "email": "nigel@school.test",
            "password": "Sup3r-secret!",
            "first_name": "Nigel",
            "role": "teacher"
        }))
        .send()
        .await
        .expect("register fail");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Success");
    assert_eq!(body["data"]["email"], "nigel@school.test");
    // The hash never leaks.
    assert!(body["data"].get("password_hash").is_none());

    // Duplicate email is a conflict.
    let response = client
        .post(format!("{}/users", app.address))
        .json(&json!({ "email": "nigel@school.test", "password": "Another-0ne!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Email already exists");

    // Wrong password: one undifferentiated message.
    let response = client
        .post(format!("{}/login", app.address))
        .json(&json!({ "email": "nigel@school.test", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Invalid email and/or password provided");

    // Correct credentials yield a usable bearer token.
    let response = client
        .post(format!("{}/login", app.address))
        .json(&json!({ "email": "nigel@school.test", "password": "Sup3r-secret!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let token = body["data"]["token"].as_str().expect("token present");

    let response = client
        .get(format!("{}/users", app.address))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_requests_without_credentials_are_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/posts", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_cohort_creation_shape_and_denial() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let teacher = seed_user(&app.repo, Role::Teacher, "teacher@school.test").await;
    let student = seed_user(&app.repo, Role::Student, "student@school.test").await;

    // Teacher creates a cohort: 201 with exactly three courses, empty rosters.
    let response = client
        .post(format!("{}/cohorts", app.address))
        .header("x-user-id", teacher.id.to_string())
        .json(&json!({ "title": "Cohort X" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let courses = body["data"]["courses"].as_array().unwrap();
    assert_eq!(courses.len(), 3);
    for course in courses {
        assert_eq!(course["students"].as_array().unwrap().len(), 0);
        assert_eq!(course["teachers"].as_array().unwrap().len(), 0);
    }

    // Student is denied with the canonical message.
    let response = client
        .post(format!("{}/cohorts", app.address))
        .header("x-user-id", student.id.to_string())
        .json(&json!({ "title": "Cohort Y" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "You are not authorized to create a new cohort.");
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_enrollment_flow_over_http() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let teacher = seed_user(&app.repo, Role::Teacher, "teacher@school.test").await;
    let student = seed_user(&app.repo, Role::Student, "student@school.test").await;

    let response = client
        .post(format!("{}/cohorts", app.address))
        .header("x-user-id", teacher.id.to_string())
        .json(&json!({ "title": "Cohort 1" }))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    let cohort_id = body["data"]["id"].as_i64().unwrap();
    let course_id = body["data"]["courses"][0]["id"].as_i64().unwrap();

    let enroll_url = format!(
        "{}/cohorts/{}/{}/{}",
        app.address, cohort_id, student.id, course_id
    );

    // Enroll: 200.
    let response = client
        .post(&enroll_url)
        .header("x-user-id", teacher.id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["cohort"], "Cohort 1");
    assert_eq!(body["data"]["user"]["id"], student.id);

    // Same call again: 400 with the canonical message.
    let response = client
        .post(&enroll_url)
        .header("x-user-id", teacher.id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["message"],
        "User is already in the specified course in the cohort."
    );

    // A student cannot change membership.
    let response = client
        .post(&enroll_url)
        .header("x-user-id", student.id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["message"],
        "You are not authorized to add a user to a cohort."
    );

    // Remove: 200, then 400 on repeat.
    let response = client
        .delete(&enroll_url)
        .header("x-user-id", teacher.id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .delete(&enroll_url)
        .header("x-user-id", teacher.id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "The specified user is not part of this cohort.");
}

#[tokio::test]
async fn test_post_lifecycle_over_http() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = seed_user(&app.repo, Role::Student, "owner@school.test").await;
    let stranger = seed_user(&app.repo, Role::Student, "stranger@school.test").await;

    // Empty content is rejected up front.
    let response = client
        .post(format!("{}/posts", app.address))
        .header("x-user-id", owner.id.to_string())
        .json(&json!({ "content": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Content cannot be empty");

    // Create.
    let response = client
        .post(format!("{}/posts", app.address))
        .header("x-user-id", owner.id.to_string())
        .json(&json!({ "content": "hello cohort" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let post_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["num_likes"], 0);

    // A non-owner student cannot edit it.
    let response = client
        .patch(format!("{}/posts/{}", app.address, post_id))
        .header("x-user-id", stranger.id.to_string())
        .json(&json!({ "content": "hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "You are not authorized to edit this post.");

    // Owner deletes; deleting again is a 404.
    let response = client
        .delete(format!("{}/posts/{}", app.address, post_id))
        .header("x-user-id", owner.id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .delete(format!("{}/posts/{}", app.address, post_id))
        .header("x-user-id", owner.id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Post not found");
}
