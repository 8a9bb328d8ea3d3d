//! Enrollment Engine: cohort creation, the (cohort, course, user) membership
//! state machine, and the eager cohort read projections.
//!
//! Each mutation validates the full referential chain step by step against
//! one snapshot of the store, short-circuiting on the first failure so the
//! error precedence is stable and testable.

use std::collections::HashMap;

use crate::auth::AuthUser;
use crate::error::{ApiError, RepoError};
use crate::models::{
    Cohort, CohortView, CourseInCohort, CreateCohortRequest, Enrollment, EnrollmentView, Role,
    UserSummary,
};
use crate::policy::{self, Action, Resource};
use crate::repository::Repository;

/// The course titles every cohort offers. Course rows are shared across
/// cohorts by title: the first cohort to be created materializes them, later
/// cohorts reuse the existing rows.
pub const STANDARD_COURSE_TITLES: [&str; 3] = [
    "Software Development",
    "Front-End Development",
    "Data Analytics",
];

fn already_enrolled() -> ApiError {
    ApiError::Invariant("User is already in the specified course in the cohort.".to_string())
}

/// create_cohort
///
/// Teacher-only. Creates a cohort with a unique title and provisions its
/// CohortCourse associations to the three standard courses in one atomic
/// store operation. Returns the created cohort with its courses and empty
/// rosters.
pub async fn create_cohort(
    repo: &dyn Repository,
    actor: &AuthUser,
    req: CreateCohortRequest,
) -> Result<CohortView, ApiError> {
    policy::decide(actor, Resource::Cohort, Action::Create, None)?;

    if repo.get_cohort_by_title(&req.title).await.is_some() {
        return Err(ApiError::Invariant(format!(
            "Cohort with name '{}' already exists",
            req.title
        )));
    }

    let title = req.title.clone();
    let (cohort, courses) = repo
        .create_cohort(req, &STANDARD_COURSE_TITLES)
        .await
        .map_err(|err| match err {
            // A concurrent creation with the same title loses the race at the
            // unique index; report it the same way as the pre-check.
            RepoError::UniqueViolation => ApiError::Invariant(format!(
                "Cohort with name '{title}' already exists"
            )),
            other => other.into(),
        })?;

    tracing::info!(cohort_id = cohort.id, title = %cohort.title, "cohort created");

    Ok(CohortView {
        id: cohort.id,
        title: cohort.title,
        start_date: cohort.start_date,
        end_date: cohort.end_date,
        courses: courses
            .into_iter()
            .map(|course| CourseInCohort {
                id: course.id,
                title: course.title,
                students: Vec::new(),
                teachers: Vec::new(),
            })
            .collect(),
    })
}

/// add_enrollment
///
/// Teacher-only. Enrolls `user_id` into `course_id` within `cohort_id`,
/// validating the full referential chain in order:
///
/// 1. authorization, 2. user exists, 3. cohort exists, 4. the course is
/// offered within the cohort, 5. the user is not already enrolled in that
/// (cohort, course) pair, 6. insert.
///
/// Re-running the call after a success is an error, not a silent no-op: the
/// duplicate is reported as an invariant violation. A concurrent duplicate
/// that slips past the existence check is caught by the composite key at the
/// store and translated to the same violation.
pub async fn add_enrollment(
    repo: &dyn Repository,
    actor: &AuthUser,
    user_id: i32,
    cohort_id: i32,
    course_id: i32,
) -> Result<EnrollmentView, ApiError> {
    policy::decide(actor, Resource::Enrollment, Action::Create, None)?;

    let user = repo
        .get_user(user_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("User with Id {user_id} not found.")))?;

    let cohort = repo
        .get_cohort(cohort_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Cohort with Id {cohort_id} not found.")))?;

    let course = repo
        .get_courses_for_cohort(cohort_id)
        .await
        .into_iter()
        .find(|c| c.id == course_id)
        .ok_or_else(|| {
            ApiError::Invariant("The specified course is not part of this cohort.".to_string())
        })?;

    let key = Enrollment {
        cohort_id,
        course_id,
        user_id,
    };
    if repo.get_enrollment(key).await.is_some() {
        return Err(already_enrolled());
    }

    repo.create_enrollment(key).await.map_err(|err| match err {
        RepoError::UniqueViolation => already_enrolled(),
        other => other.into(),
    })?;

    tracing::info!(cohort_id, course_id, user_id, "user enrolled");

    Ok(EnrollmentView {
        cohort: cohort.title,
        course: course.title,
        user: user.summary(),
    })
}

/// remove_enrollment
///
/// Teacher-only. Removes the enrollment for the exact (cohort, course, user)
/// triple, with the check order distinguishing "user is not in this cohort at
/// all" from "user is in the cohort but not in this course":
///
/// 1. authorization, 2. user exists, 3. cohort exists, 4. the user holds at
/// least one enrollment in the cohort, 5. the course is offered within the
/// cohort, 6. the exact triple exists, 7. delete.
pub async fn remove_enrollment(
    repo: &dyn Repository,
    actor: &AuthUser,
    user_id: i32,
    cohort_id: i32,
    course_id: i32,
) -> Result<EnrollmentView, ApiError> {
    policy::decide(actor, Resource::Enrollment, Action::Delete, None)?;

    let user = repo
        .get_user(user_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("User with Id {user_id} not found.")))?;

    let cohort = repo
        .get_cohort(cohort_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Cohort with Id {cohort_id} not found.")))?;

    let cohort_enrollments = repo.get_enrollments_for_cohort(cohort_id).await;
    if !cohort_enrollments.iter().any(|e| e.user_id == user_id) {
        return Err(ApiError::Invariant(
            "The specified user is not part of this cohort.".to_string(),
        ));
    }

    let course = repo
        .get_courses_for_cohort(cohort_id)
        .await
        .into_iter()
        .find(|c| c.id == course_id)
        .ok_or_else(|| {
            ApiError::Invariant("The specified course is not part of this cohort.".to_string())
        })?;

    let key = Enrollment {
        cohort_id,
        course_id,
        user_id,
    };
    let not_taking_course = || {
        ApiError::Invariant("User is in cohort, but is not taking the specified course.".to_string())
    };
    if !cohort_enrollments.contains(&key) {
        return Err(not_taking_course());
    }

    // A false here means a concurrent remove won the race after our snapshot.
    if !repo.delete_enrollment(key).await? {
        return Err(not_taking_course());
    }

    tracing::info!(cohort_id, course_id, user_id, "user unenrolled");

    Ok(EnrollmentView {
        cohort: cohort.title,
        course: course.title,
        user: user.summary(),
    })
}

/// get_cohort
///
/// Open to any authenticated actor (reads are deliberately not teacher-gated,
/// unlike the listing below).
pub async fn get_cohort(
    repo: &dyn Repository,
    actor: &AuthUser,
    cohort_id: i32,
) -> Result<CohortView, ApiError> {
    policy::decide(actor, Resource::Cohort, Action::Read, None)?;

    let cohort = repo
        .get_cohort(cohort_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Cohort with Id {cohort_id} not found.")))?;

    Ok(project_cohort(repo, cohort).await)
}

/// get_all_cohorts
///
/// Teacher-only listing of every cohort with full per-course rosters.
pub async fn get_all_cohorts(
    repo: &dyn Repository,
    actor: &AuthUser,
) -> Result<Vec<CohortView>, ApiError> {
    policy::decide(actor, Resource::Cohort, Action::List, None)?;

    let mut views = Vec::new();
    for cohort in repo.get_cohorts().await {
        views.push(project_cohort(repo, cohort).await);
    }
    Ok(views)
}

/// get_cohorts_for_user
///
/// Every cohort in which the given user holds at least one enrollment. Open
/// to any authenticated actor.
pub async fn get_cohorts_for_user(
    repo: &dyn Repository,
    actor: &AuthUser,
    user_id: i32,
) -> Result<Vec<CohortView>, ApiError> {
    policy::decide(actor, Resource::Cohort, Action::Read, None)?;

    if repo.get_user(user_id).await.is_none() {
        return Err(ApiError::NotFound(format!(
            "User with Id {user_id} not found."
        )));
    }

    let mut cohort_ids: Vec<i32> = repo
        .get_enrollments_for_user(user_id)
        .await
        .into_iter()
        .map(|e| e.cohort_id)
        .collect();
    cohort_ids.sort_unstable();
    cohort_ids.dedup();

    let mut views = Vec::new();
    for cohort_id in cohort_ids {
        if let Some(cohort) = repo.get_cohort(cohort_id).await {
            views.push(project_cohort(repo, cohort).await);
        }
    }
    Ok(views)
}

/// project_cohort
///
/// The eager read projection: Cohort → CohortCourse → Course, then the
/// enrollment rows traversed to User and partitioned per course into the
/// student/teacher buckets.
async fn project_cohort(repo: &dyn Repository, cohort: Cohort) -> CohortView {
    let courses = repo.get_courses_for_cohort(cohort.id).await;
    let enrollments = repo.get_enrollments_for_cohort(cohort.id).await;

    let users_by_id: HashMap<i32, UserSummary> = repo
        .get_users()
        .await
        .iter()
        .map(|u| (u.id, u.summary()))
        .collect();

    let courses = courses
        .into_iter()
        .map(|course| {
            let mut students = Vec::new();
            let mut teachers = Vec::new();
            for enrollment in enrollments.iter().filter(|e| e.course_id == course.id) {
                // Enrollments referencing a deleted user are skipped rather
                // than failing the whole projection.
                let Some(user) = users_by_id.get(&enrollment.user_id) else {
                    continue;
                };
                match user.role {
                    Role::Student => students.push(user.clone()),
                    Role::Teacher => teachers.push(user.clone()),
                }
            }
            CourseInCohort {
                id: course.id,
                title: course.title,
                students,
                teachers,
            }
        })
        .collect();

    CohortView {
        id: cohort.id,
        title: cohort.title,
        start_date: cohort.start_date,
        end_date: cohort.end_date,
        courses,
    }
}
