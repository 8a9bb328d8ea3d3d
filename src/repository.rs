use crate::error::RepoError;
use crate::models::{
    Cohort, CohortCourse, Comment, Course, CreateCohortRequest, Enrollment, NewUser, Post, User,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};

/// Repository Trait
///
/// The abstract contract for all persistence operations. The enrollment and
/// content engines program against this boundary only, which keeps the
/// multi-step validation chains testable against the in-memory store and
/// swappable over Postgres in production.
///
/// Read methods are lenient (absence and store failure both surface as
/// `None`/empty, with failures logged); mutations return `Result` because the
/// engines must distinguish `RepoError::UniqueViolation` (the composite-key
/// backstop for concurrent duplicate inserts) from ordinary store failures.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: i32) -> Option<User>;
    async fn get_user_by_email(&self, email: &str) -> Option<User>;
    async fn get_user_by_username(&self, username: &str) -> Option<User>;
    async fn get_users(&self) -> Vec<User>;
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError>;
    async fn update_user(&self, user: User) -> Result<User, RepoError>;

    // --- Posts ---
    async fn get_post(&self, id: i32) -> Option<Post>;
    async fn get_posts(&self) -> Vec<Post>;
    async fn get_posts_by_user(&self, user_id: i32) -> Vec<Post>;
    async fn create_post(&self, user_id: i32, content: &str) -> Result<Post, RepoError>;
    async fn update_post(&self, post: Post) -> Result<Post, RepoError>;
    /// Deletes the post and all of its comments atomically. Returns whether a
    /// post row was actually removed.
    async fn delete_post(&self, id: i32) -> Result<bool, RepoError>;

    // --- Comments ---
    async fn get_comment(&self, id: i32) -> Option<Comment>;
    async fn get_comments_for_post(&self, post_id: i32) -> Vec<Comment>;
    async fn get_comments_by_user(&self, user_id: i32) -> Vec<Comment>;
    async fn create_comment(
        &self,
        post_id: i32,
        user_id: i32,
        content: &str,
    ) -> Result<Comment, RepoError>;
    async fn update_comment(&self, comment: Comment) -> Result<Comment, RepoError>;
    async fn delete_comment(&self, id: i32) -> Result<bool, RepoError>;

    // --- Cohorts & Courses ---
    async fn get_cohort(&self, id: i32) -> Option<Cohort>;
    async fn get_cohorts(&self) -> Vec<Cohort>;
    async fn get_cohort_by_title(&self, title: &str) -> Option<Cohort>;
    /// Creates the cohort, find-or-creates the named courses by title
    /// (shared across cohorts, first writer wins), and inserts one
    /// CohortCourse association per course, all-or-nothing.
    async fn create_cohort(
        &self,
        req: CreateCohortRequest,
        course_titles: &[&str],
    ) -> Result<(Cohort, Vec<Course>), RepoError>;
    async fn get_courses_for_cohort(&self, cohort_id: i32) -> Vec<Course>;

    // --- Enrollments (CohortCourseUser) ---
    async fn get_enrollment(&self, key: Enrollment) -> Option<Enrollment>;
    async fn get_enrollments_for_cohort(&self, cohort_id: i32) -> Vec<Enrollment>;
    async fn get_enrollments_for_user(&self, user_id: i32) -> Vec<Enrollment>;
    /// Inserts the composite-keyed row. A duplicate triple surfaces as
    /// `RepoError::UniqueViolation` for the engine to translate.
    async fn create_enrollment(&self, enrollment: Enrollment) -> Result<Enrollment, RepoError>;
    async fn delete_enrollment(&self, key: Enrollment) -> Result<bool, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, first_name, last_name, bio, photo, specialism";

/// PostgresRepository
///
/// The production implementation of the `Repository` trait, backed by the
/// PostgreSQL connection pool. Uses the runtime query API throughout so the
/// crate builds without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: i32) -> Option<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            })
    }

    async fn get_user_by_email(&self, email: &str) -> Option<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user_by_email error: {:?}", e);
                None
            })
    }

    async fn get_user_by_username(&self, username: &str) -> Option<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_user_by_username error: {:?}", e);
            None
        })
    }

    async fn get_users(&self) -> Vec<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_users error: {:?}", e);
                vec![]
            })
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        let row = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash, role, first_name, last_name, bio, photo, specialism) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {USER_COLUMNS}"
        ))
        .bind(user.username)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.role)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.bio)
        .bind(user.photo)
        .bind(user.specialism)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_user(&self, user: User) -> Result<User, RepoError> {
        let row = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET username = $2, email = $3, password_hash = $4, role = $5, \
             first_name = $6, last_name = $7, bio = $8, photo = $9, specialism = $10 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(user.username)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.role)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.bio)
        .bind(user.photo)
        .bind(user.specialism)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_post(&self, id: i32) -> Option<Post> {
        sqlx::query_as::<_, Post>(
            "SELECT id, user_id, content, created_at, updated_at, num_likes FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_post error: {:?}", e);
            None
        })
    }

    async fn get_posts(&self) -> Vec<Post> {
        sqlx::query_as::<_, Post>(
            "SELECT id, user_id, content, created_at, updated_at, num_likes FROM posts \
             ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_posts error: {:?}", e);
            vec![]
        })
    }

    async fn get_posts_by_user(&self, user_id: i32) -> Vec<Post> {
        sqlx::query_as::<_, Post>(
            "SELECT id, user_id, content, created_at, updated_at, num_likes FROM posts \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_posts_by_user error: {:?}", e);
            vec![]
        })
    }

    async fn create_post(&self, user_id: i32, content: &str) -> Result<Post, RepoError> {
        let row = sqlx::query_as::<_, Post>(
            "INSERT INTO posts (user_id, content, created_at, num_likes) VALUES ($1, $2, NOW(), 0) \
             RETURNING id, user_id, content, created_at, updated_at, num_likes",
        )
        .bind(user_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_post(&self, post: Post) -> Result<Post, RepoError> {
        let row = sqlx::query_as::<_, Post>(
            "UPDATE posts SET content = $2, updated_at = $3 WHERE id = $1 \
             RETURNING id, user_id, content, created_at, updated_at, num_likes",
        )
        .bind(post.id)
        .bind(post.content)
        .bind(post.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_post(&self, id: i32) -> Result<bool, RepoError> {
        // Post and its comments go together (no orphan comments).
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_comment(&self, id: i32) -> Option<Comment> {
        sqlx::query_as::<_, Comment>(
            "SELECT id, post_id, user_id, content, created_at, updated_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_comment error: {:?}", e);
            None
        })
    }

    async fn get_comments_for_post(&self, post_id: i32) -> Vec<Comment> {
        sqlx::query_as::<_, Comment>(
            "SELECT id, post_id, user_id, content, created_at, updated_at FROM comments \
             WHERE post_id = $1 ORDER BY created_at ASC",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_comments_for_post error: {:?}", e);
            vec![]
        })
    }

    async fn get_comments_by_user(&self, user_id: i32) -> Vec<Comment> {
        sqlx::query_as::<_, Comment>(
            "SELECT id, post_id, user_id, content, created_at, updated_at FROM comments \
             WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_comments_by_user error: {:?}", e);
            vec![]
        })
    }

    async fn create_comment(
        &self,
        post_id: i32,
        user_id: i32,
        content: &str,
    ) -> Result<Comment, RepoError> {
        let row = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (post_id, user_id, content, created_at) VALUES ($1, $2, $3, NOW()) \
             RETURNING id, post_id, user_id, content, created_at, updated_at",
        )
        .bind(post_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_comment(&self, comment: Comment) -> Result<Comment, RepoError> {
        let row = sqlx::query_as::<_, Comment>(
            "UPDATE comments SET content = $2, updated_at = $3 WHERE id = $1 \
             RETURNING id, post_id, user_id, content, created_at, updated_at",
        )
        .bind(comment.id)
        .bind(comment.content)
        .bind(comment.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_comment(&self, id: i32) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_cohort(&self, id: i32) -> Option<Cohort> {
        sqlx::query_as::<_, Cohort>(
            "SELECT id, title, start_date, end_date FROM cohorts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_cohort error: {:?}", e);
            None
        })
    }

    async fn get_cohorts(&self) -> Vec<Cohort> {
        sqlx::query_as::<_, Cohort>("SELECT id, title, start_date, end_date FROM cohorts ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_cohorts error: {:?}", e);
                vec![]
            })
    }

    async fn get_cohort_by_title(&self, title: &str) -> Option<Cohort> {
        sqlx::query_as::<_, Cohort>(
            "SELECT id, title, start_date, end_date FROM cohorts WHERE title = $1",
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_cohort_by_title error: {:?}", e);
            None
        })
    }

    async fn create_cohort(
        &self,
        req: CreateCohortRequest,
        course_titles: &[&str],
    ) -> Result<(Cohort, Vec<Course>), RepoError> {
        let mut tx = self.pool.begin().await?;

        let cohort = sqlx::query_as::<_, Cohort>(
            "INSERT INTO cohorts (title, start_date, end_date) VALUES ($1, $2, $3) \
             RETURNING id, title, start_date, end_date",
        )
        .bind(req.title)
        .bind(req.start_date)
        .bind(req.end_date)
        .fetch_one(&mut *tx)
        .await?;

        let mut courses = Vec::with_capacity(course_titles.len());
        for &title in course_titles {
            // Insert-or-ignore then re-read: the unique index on courses.title
            // makes the shared find-or-create safe under concurrent cohort
            // creation.
            sqlx::query("INSERT INTO courses (title) VALUES ($1) ON CONFLICT (title) DO NOTHING")
                .bind(title)
                .execute(&mut *tx)
                .await?;
            let course =
                sqlx::query_as::<_, Course>("SELECT id, title FROM courses WHERE title = $1")
                    .bind(title)
                    .fetch_one(&mut *tx)
                    .await?;
            sqlx::query("INSERT INTO cohort_courses (cohort_id, course_id) VALUES ($1, $2)")
                .bind(cohort.id)
                .bind(course.id)
                .execute(&mut *tx)
                .await?;
            courses.push(course);
        }

        tx.commit().await?;
        Ok((cohort, courses))
    }

    async fn get_courses_for_cohort(&self, cohort_id: i32) -> Vec<Course> {
        sqlx::query_as::<_, Course>(
            "SELECT c.id, c.title FROM courses c \
             JOIN cohort_courses cc ON cc.course_id = c.id \
             WHERE cc.cohort_id = $1 ORDER BY c.id",
        )
        .bind(cohort_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_courses_for_cohort error: {:?}", e);
            vec![]
        })
    }

    async fn get_enrollment(&self, key: Enrollment) -> Option<Enrollment> {
        sqlx::query_as::<_, Enrollment>(
            "SELECT cohort_id, course_id, user_id FROM cohort_course_users \
             WHERE cohort_id = $1 AND course_id = $2 AND user_id = $3",
        )
        .bind(key.cohort_id)
        .bind(key.course_id)
        .bind(key.user_id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_enrollment error: {:?}", e);
            None
        })
    }

    async fn get_enrollments_for_cohort(&self, cohort_id: i32) -> Vec<Enrollment> {
        sqlx::query_as::<_, Enrollment>(
            "SELECT cohort_id, course_id, user_id FROM cohort_course_users WHERE cohort_id = $1",
        )
        .bind(cohort_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_enrollments_for_cohort error: {:?}", e);
            vec![]
        })
    }

    async fn get_enrollments_for_user(&self, user_id: i32) -> Vec<Enrollment> {
        sqlx::query_as::<_, Enrollment>(
            "SELECT cohort_id, course_id, user_id FROM cohort_course_users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_enrollments_for_user error: {:?}", e);
            vec![]
        })
    }

    async fn create_enrollment(&self, enrollment: Enrollment) -> Result<Enrollment, RepoError> {
        // The composite primary key is the correctness backstop: a concurrent
        // duplicate insert fails here with a unique violation rather than
        // producing a second row.
        sqlx::query(
            "INSERT INTO cohort_course_users (cohort_id, course_id, user_id) VALUES ($1, $2, $3)",
        )
        .bind(enrollment.cohort_id)
        .bind(enrollment.course_id)
        .bind(enrollment.user_id)
        .execute(&self.pool)
        .await?;
        Ok(enrollment)
    }

    async fn delete_enrollment(&self, key: Enrollment) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "DELETE FROM cohort_course_users \
             WHERE cohort_id = $1 AND course_id = $2 AND user_id = $3",
        )
        .bind(key.cohort_id)
        .bind(key.course_id)
        .bind(key.user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- In-Memory Implementation (For Tests & Local Development) ---

/// InMemoryRepository
///
/// A complete `Repository` implementation over plain vectors behind a mutex.
/// Used by the test suite so the engines' validation chains and error
/// precedence can be exercised without a database; mirrors the store-level
/// constraints that matter to the engines (unique email/username/title, the
/// composite enrollment key, the cohort-course association check).
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<MemState>,
}

#[derive(Default)]
struct MemState {
    users: Vec<User>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    cohorts: Vec<Cohort>,
    courses: Vec<Course>,
    cohort_courses: Vec<CohortCourse>,
    enrollments: Vec<Enrollment>,
    next_user_id: i32,
    next_post_id: i32,
    next_comment_id: i32,
    next_cohort_id: i32,
    next_course_id: i32,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemState> {
        // A poisoned lock only happens after a panic in another test thread;
        // propagating the panic is the right thing there.
        self.state.lock().expect("in-memory repository lock poisoned")
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: i32) -> Option<User> {
        self.lock().users.iter().find(|u| u.id == id).cloned()
    }

    async fn get_user_by_email(&self, email: &str) -> Option<User> {
        self.lock().users.iter().find(|u| u.email == email).cloned()
    }

    async fn get_user_by_username(&self, username: &str) -> Option<User> {
        self.lock()
            .users
            .iter()
            .find(|u| u.username.as_deref() == Some(username))
            .cloned()
    }

    async fn get_users(&self) -> Vec<User> {
        self.lock().users.clone()
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        let mut state = self.lock();
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(RepoError::UniqueViolation);
        }
        if let Some(username) = &user.username {
            if state
                .users
                .iter()
                .any(|u| u.username.as_deref() == Some(username))
            {
                return Err(RepoError::UniqueViolation);
            }
        }
        state.next_user_id += 1;
        let row = User {
            id: state.next_user_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            photo: user.photo,
            specialism: user.specialism,
        };
        state.users.push(row.clone());
        Ok(row)
    }

    async fn update_user(&self, user: User) -> Result<User, RepoError> {
        let mut state = self.lock();
        let slot = state
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| RepoError::Database("user row missing".into()))?;
        *slot = user.clone();
        Ok(user)
    }

    async fn get_post(&self, id: i32) -> Option<Post> {
        self.lock().posts.iter().find(|p| p.id == id).cloned()
    }

    async fn get_posts(&self) -> Vec<Post> {
        let mut posts = self.lock().posts.clone();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts
    }

    async fn get_posts_by_user(&self, user_id: i32) -> Vec<Post> {
        self.lock()
            .posts
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn create_post(&self, user_id: i32, content: &str) -> Result<Post, RepoError> {
        let mut state = self.lock();
        state.next_post_id += 1;
        let row = Post {
            id: state.next_post_id,
            user_id,
            content: content.to_string(),
            created_at: Utc::now(),
            updated_at: None,
            num_likes: 0,
        };
        state.posts.push(row.clone());
        Ok(row)
    }

    async fn update_post(&self, post: Post) -> Result<Post, RepoError> {
        let mut state = self.lock();
        let slot = state
            .posts
            .iter_mut()
            .find(|p| p.id == post.id)
            .ok_or_else(|| RepoError::Database("post row missing".into()))?;
        *slot = post.clone();
        Ok(post)
    }

    async fn delete_post(&self, id: i32) -> Result<bool, RepoError> {
        let mut state = self.lock();
        let before = state.posts.len();
        state.posts.retain(|p| p.id != id);
        state.comments.retain(|c| c.post_id != id);
        Ok(state.posts.len() < before)
    }

    async fn get_comment(&self, id: i32) -> Option<Comment> {
        self.lock().comments.iter().find(|c| c.id == id).cloned()
    }

    async fn get_comments_for_post(&self, post_id: i32) -> Vec<Comment> {
        self.lock()
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect()
    }

    async fn get_comments_by_user(&self, user_id: i32) -> Vec<Comment> {
        self.lock()
            .comments
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn create_comment(
        &self,
        post_id: i32,
        user_id: i32,
        content: &str,
    ) -> Result<Comment, RepoError> {
        let mut state = self.lock();
        state.next_comment_id += 1;
        let row = Comment {
            id: state.next_comment_id,
            post_id,
            user_id,
            content: content.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };
        state.comments.push(row.clone());
        Ok(row)
    }

    async fn update_comment(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut state = self.lock();
        let slot = state
            .comments
            .iter_mut()
            .find(|c| c.id == comment.id)
            .ok_or_else(|| RepoError::Database("comment row missing".into()))?;
        *slot = comment.clone();
        Ok(comment)
    }

    async fn delete_comment(&self, id: i32) -> Result<bool, RepoError> {
        let mut state = self.lock();
        let before = state.comments.len();
        state.comments.retain(|c| c.id != id);
        Ok(state.comments.len() < before)
    }

    async fn get_cohort(&self, id: i32) -> Option<Cohort> {
        self.lock().cohorts.iter().find(|c| c.id == id).cloned()
    }

    async fn get_cohorts(&self) -> Vec<Cohort> {
        self.lock().cohorts.clone()
    }

    async fn get_cohort_by_title(&self, title: &str) -> Option<Cohort> {
        self.lock().cohorts.iter().find(|c| c.title == title).cloned()
    }

    async fn create_cohort(
        &self,
        req: CreateCohortRequest,
        course_titles: &[&str],
    ) -> Result<(Cohort, Vec<Course>), RepoError> {
        let mut state = self.lock();
        if state.cohorts.iter().any(|c| c.title == req.title) {
            return Err(RepoError::UniqueViolation);
        }
        state.next_cohort_id += 1;
        let cohort = Cohort {
            id: state.next_cohort_id,
            title: req.title,
            start_date: req.start_date,
            end_date: req.end_date,
        };
        state.cohorts.push(cohort.clone());

        let mut courses = Vec::with_capacity(course_titles.len());
        for title in course_titles {
            // Find-or-create keeps course rows shared across cohorts.
            let course = match state.courses.iter().find(|c| c.title == *title) {
                Some(existing) => existing.clone(),
                None => {
                    state.next_course_id += 1;
                    let created = Course {
                        id: state.next_course_id,
                        title: title.to_string(),
                    };
                    state.courses.push(created.clone());
                    created
                }
            };
            state.cohort_courses.push(CohortCourse {
                cohort_id: cohort.id,
                course_id: course.id,
            });
            courses.push(course);
        }

        Ok((cohort, courses))
    }

    async fn get_courses_for_cohort(&self, cohort_id: i32) -> Vec<Course> {
        let state = self.lock();
        state
            .cohort_courses
            .iter()
            .filter(|cc| cc.cohort_id == cohort_id)
            .filter_map(|cc| state.courses.iter().find(|c| c.id == cc.course_id))
            .cloned()
            .collect()
    }

    async fn get_enrollment(&self, key: Enrollment) -> Option<Enrollment> {
        self.lock().enrollments.iter().find(|e| **e == key).copied()
    }

    async fn get_enrollments_for_cohort(&self, cohort_id: i32) -> Vec<Enrollment> {
        self.lock()
            .enrollments
            .iter()
            .filter(|e| e.cohort_id == cohort_id)
            .copied()
            .collect()
    }

    async fn get_enrollments_for_user(&self, user_id: i32) -> Vec<Enrollment> {
        self.lock()
            .enrollments
            .iter()
            .filter(|e| e.user_id == user_id)
            .copied()
            .collect()
    }

    async fn create_enrollment(&self, enrollment: Enrollment) -> Result<Enrollment, RepoError> {
        let mut state = self.lock();
        // Composite primary key.
        if state.enrollments.iter().any(|e| *e == enrollment) {
            return Err(RepoError::UniqueViolation);
        }
        // Foreign key to the cohort_courses association.
        let pair_exists = state.cohort_courses.iter().any(|cc| {
            cc.cohort_id == enrollment.cohort_id && cc.course_id == enrollment.course_id
        });
        if !pair_exists {
            return Err(RepoError::Database(
                "cohort_course association missing".into(),
            ));
        }
        state.enrollments.push(enrollment);
        Ok(enrollment)
    }

    async fn delete_enrollment(&self, key: Enrollment) -> Result<bool, RepoError> {
        let mut state = self.lock();
        let before = state.enrollments.len();
        state.enrollments.retain(|e| *e != key);
        Ok(state.enrollments.len() < before)
    }
}
