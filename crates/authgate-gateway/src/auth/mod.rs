//! Token verification and role-based authorization.
//!
//! Verification runs first and attaches a [`Session`](authgate_core::Session)
//! to the request; the role guard only reads that session. A request never
//! carries a session unless its bearer token verified.

mod guard;
mod middleware;

pub use guard::{ADMIN_ROLE, RoleGuard, require_roles};
pub use middleware::{RequireSession, SharedEngine, authenticate, bearer_token, require_session};
