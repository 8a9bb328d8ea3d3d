use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::Role;

/// Resource
///
/// The kinds of resource an action can target. Together with [`Action`] this
/// forms the closed set of decision-table rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Post,
    Comment,
    Cohort,
    Enrollment,
}

/// Action
///
/// What the actor is attempting against the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    List,
    Update,
    Delete,
}

/// decide
///
/// The single authorization decision function. Every mutation path in the
/// enrollment and content engines calls this instead of comparing roles
/// inline, so the role/ownership rules have exactly one source of truth.
///
/// Rules:
/// - Cohort creation, cohort listing, and enrollment membership changes are
///   teacher-only.
/// - Post/Comment update and delete require ownership, with a teacher
///   override.
/// - Everything else is open to any authenticated actor (reaching this
///   function at all implies authentication succeeded).
///
/// `owner` is the owning user id for resources that have one (a post or
/// comment author); `None` for resource kinds with no single owner.
///
/// Pure decision: no side effects, never fails except by returning the
/// denial, and the denial message is surfaced verbatim to the caller.
pub fn decide(
    actor: &AuthUser,
    resource: Resource,
    action: Action,
    owner: Option<i32>,
) -> Result<(), ApiError> {
    use Action::*;
    use Resource::*;

    match (resource, action) {
        // Teacher-only administrative surface.
        (Cohort, List) => teacher_only(actor, "You are not authorized to view all cohorts."),
        (Cohort, Create) => teacher_only(actor, "You are not authorized to create a new cohort."),
        (Enrollment, Create) => {
            teacher_only(actor, "You are not authorized to add a user to a cohort.")
        }
        (Enrollment, Delete) => {
            teacher_only(actor, "You are not authorized to delete a user from a cohort.")
        }

        // Ownership-or-teacher mutations.
        (Post, Update) => {
            owner_or_teacher(actor, owner, "You are not authorized to edit this post.")
        }
        (Post, Delete) => {
            owner_or_teacher(actor, owner, "You are not authorized to delete this post.")
        }
        (Comment, Update) => {
            owner_or_teacher(actor, owner, "You are not authorized to edit this comment.")
        }
        (Comment, Delete) => {
            owner_or_teacher(actor, owner, "You are not authorized to delete this comment.")
        }

        // Open to any authenticated actor.
        (Post, Create | Read | List) => Ok(()),
        (Comment, Create | Read | List) => Ok(()),
        (Cohort, Read) => Ok(()),
        (Enrollment, Read | List) => Ok(()),

        // No such operations exist; denied so a future caller cannot widen
        // the surface by accident.
        (Cohort, Update | Delete) | (Enrollment, Update) => Err(ApiError::Forbidden(
            "You are not authorized to perform this action.".to_string(),
        )),
    }
}

fn teacher_only(actor: &AuthUser, denial: &str) -> Result<(), ApiError> {
    if actor.role == Role::Teacher {
        Ok(())
    } else {
        Err(ApiError::Forbidden(denial.to_string()))
    }
}

fn owner_or_teacher(actor: &AuthUser, owner: Option<i32>, denial: &str) -> Result<(), ApiError> {
    if actor.role == Role::Teacher || owner == Some(actor.id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(denial.to_string()))
    }
}
