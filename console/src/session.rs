//! Session gate for operator actions.
//!
//! Login and cookies live elsewhere; the console only asks whether the
//! current session holds a role.

use crate::error::{ConsoleError, Result};

/// Roles known to the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Viewer,
}

/// Answers whether the current user holds a role.
pub trait Session: Send + Sync {
    fn is_authenticated_as(&self, role: Role) -> bool;
}

/// A session with a fixed role, or none at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSession {
    role: Option<Role>,
}

impl StaticSession {
    pub fn admin() -> Self {
        Self {
            role: Some(Role::Admin),
        }
    }

    pub fn viewer() -> Self {
        Self {
            role: Some(Role::Viewer),
        }
    }

    pub fn anonymous() -> Self {
        Self { role: None }
    }
}

impl Session for StaticSession {
    fn is_authenticated_as(&self, role: Role) -> bool {
        match (self.role, role) {
            (Some(Role::Admin), _) => true,
            (Some(held), wanted) => held == wanted,
            (None, _) => false,
        }
    }
}

/// Fail with [`ConsoleError::Unauthorized`] unless the session holds `role`.
pub fn require(session: &dyn Session, role: Role) -> Result<()> {
    if session.is_authenticated_as(role) {
        Ok(())
    } else {
        tracing::warn!(?role, "Rejected action without required role");
        Err(ConsoleError::Unauthorized)
    }
}
