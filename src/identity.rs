use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::auth::RequestContext;

/// Role
///
/// The privilege class of a caller. Stored as lowercase text in the `users.role`
/// column and carried as `"admin"` / `"user"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored or submitted role string is not a known [`Role`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Identity
///
/// The caller of a single request, as seen by the access policy and the handlers.
/// An anonymous identity has neither id nor role; an authenticated one always has both.
/// Identities live for one request and are never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    Authenticated { id: i64, role: Role },
}

impl Identity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated { .. })
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            Identity::Authenticated { id, .. } => Some(*id),
            Identity::Anonymous => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Identity::Authenticated { role, .. } => Some(*role),
            Identity::Anonymous => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }
}

/// resolve
///
/// Shapes the identity from the principal the authentication middleware left in the
/// request context. Credentials are not verified here; the middleware already did that.
pub fn resolve(context: &RequestContext) -> Identity {
    match &context.principal {
        Some(principal) => Identity::Authenticated {
            id: principal.id,
            role: principal.role,
        },
        None => Identity::Anonymous,
    }
}
