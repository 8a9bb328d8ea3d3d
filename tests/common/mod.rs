#![allow(dead_code)]

use cohort_portal::auth::AuthUser;
use cohort_portal::models::{CreateCohortRequest, NewUser, Role, User};
use cohort_portal::repository::{InMemoryRepository, Repository};

/// Seeds a user directly through the repository boundary, bypassing the
/// registration handler (these tests exercise the engines, not argon2).
pub async fn seed_user(repo: &InMemoryRepository, role: Role, email: &str) -> User {
    repo.create_user(NewUser {
        username: Some(email.to_string()),
        email: email.to_string(),
        password_hash: "$argon2id$fake-hash-for-tests".to_string(),
        role,
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        ..Default::default()
    })
    .await
    .expect("seeding a user should succeed")
}

/// The actor identity the engines receive once authentication has resolved.
pub fn actor(user: &User) -> AuthUser {
    AuthUser {
        id: user.id,
        role: user.role,
    }
}

/// A plain cohort-creation payload with no window dates.
pub fn cohort_request(title: &str) -> CreateCohortRequest {
    CreateCohortRequest {
        title: title.to_string(),
        start_date: None,
        end_date: None,
    }
}
