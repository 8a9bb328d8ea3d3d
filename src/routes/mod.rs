/// Router Module Index
///
/// Organizes the application's routing logic into access-segregated modules.
/// Authentication is applied explicitly at the module level (via Axum
/// layers); role restrictions on individual operations are decided by the
/// policy table inside the engines, so a denial always carries the canonical
/// per-action message.

/// Routes accessible without a session (registration, login, health).
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware: users, posts,
/// comments.
pub mod authenticated;

/// Cohort and enrollment routes. Also behind the authentication layer;
/// cohort creation, listing, and membership changes are additionally
/// teacher-only via the policy table.
pub mod cohorts;
