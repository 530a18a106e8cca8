use serde::Serialize;
use std::{
    collections::BTreeSet,
    fmt,
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
};

use crate::identity::{Identity, Role};

/// AuthState
///
/// The minimum authentication state a route demands. `Public` routes are also the only
/// routes allowed to run while the system is offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Public,
    Authenticated,
}

/// AccessRequirement
///
/// Declared once per route contract. An empty `allowed_roles` set means no role
/// restriction beyond the authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequirement {
    pub min_auth_state: AuthState,
    pub allowed_roles: BTreeSet<Role>,
}

impl AccessRequirement {
    /// Reachable by anyone, including anonymous callers and while offline.
    pub fn public() -> Self {
        Self {
            min_auth_state: AuthState::Public,
            allowed_roles: BTreeSet::new(),
        }
    }

    pub fn authenticated() -> Self {
        Self {
            min_auth_state: AuthState::Authenticated,
            allowed_roles: BTreeSet::new(),
        }
    }

    /// Authenticated callers holding one of `roles`.
    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            min_auth_state: AuthState::Authenticated,
            allowed_roles: roles.into_iter().collect(),
        }
    }
}

impl Default for AccessRequirement {
    fn default() -> Self {
        Self::authenticated()
    }
}

/// SystemMode
///
/// Process-wide availability switch. `Offline` restricts the API to `Public` routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemMode {
    Normal,
    Offline,
}

impl SystemMode {
    fn as_u8(self) -> u8 {
        match self {
            SystemMode::Normal => 0,
            SystemMode::Offline => 1,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => SystemMode::Normal,
            _ => SystemMode::Offline,
        }
    }
}

impl fmt::Display for SystemMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemMode::Normal => f.write_str("normal"),
            SystemMode::Offline => f.write_str("offline"),
        }
    }
}

impl FromStr for SystemMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" | "online" => Ok(SystemMode::Normal),
            "offline" => Ok(SystemMode::Offline),
            other => Err(format!("unknown system mode '{}'", other)),
        }
    }
}

/// SystemModeSwitch
///
/// Shared handle on the current [`SystemMode`]. Cloning shares the same underlying cell.
/// Readers do a single acquire load; `set` is the only mutation point. Neither side blocks.
#[derive(Debug, Clone)]
pub struct SystemModeSwitch {
    mode: Arc<AtomicU8>,
}

impl SystemModeSwitch {
    pub fn new(initial: SystemMode) -> Self {
        Self {
            mode: Arc::new(AtomicU8::new(initial.as_u8())),
        }
    }

    pub fn current(&self) -> SystemMode {
        SystemMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    /// Flips the mode for every holder of this switch. Returns the previous mode.
    pub fn set(&self, mode: SystemMode) -> SystemMode {
        let previous = SystemMode::from_u8(self.mode.swap(mode.as_u8(), Ordering::AcqRel));
        if previous != mode {
            tracing::warn!(from = %previous, to = %mode, "system mode changed");
        }
        previous
    }
}

impl Default for SystemModeSwitch {
    fn default() -> Self {
        Self::new(SystemMode::Normal)
    }
}

/// Why a request was refused by the access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    Unauthenticated,
    InsufficientRole,
    SystemOffline,
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "unauthenticated",
            DenyReason::InsufficientRole => "insufficient_role",
            DenyReason::SystemOffline => "system_offline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

/// evaluate
///
/// Decides whether `identity` may run a route declaring `requirement` under `mode`.
/// Checks run in a fixed order and the first failing one names the reason:
/// offline gating, then authentication, then role membership.
pub fn evaluate(
    requirement: &AccessRequirement,
    identity: &Identity,
    mode: SystemMode,
) -> AccessDecision {
    if mode == SystemMode::Offline && requirement.min_auth_state != AuthState::Public {
        return AccessDecision::Deny(DenyReason::SystemOffline);
    }

    if requirement.min_auth_state == AuthState::Authenticated && !identity.is_authenticated() {
        return AccessDecision::Deny(DenyReason::Unauthenticated);
    }

    if !requirement.allowed_roles.is_empty() {
        let permitted = identity
            .role()
            .is_some_and(|role| requirement.allowed_roles.contains(&role));
        if !permitted {
            return AccessDecision::Deny(DenyReason::InsufficientRole);
        }
    }

    AccessDecision::Allow
}
