//! Back-office access gate.
//!
//! Session and role lookups resolve independently and in either order. The
//! gate only reaches [`GateState::Authorized`] once both have resolved, so
//! nothing gated is rendered while still checking.
//!
//! ```text
//!            session=None                 role error
//! Checking ───────────────▶ Unauthenticated  Checking ──────────▶ Error
//!    │   role=admin + session=user                                 │
//!    ├──────────────────────────────▶ Authorized                   │ retry
//!    │   role≠admin + session=user                                 ▼
//!    └──────────────────────────────▶ Forbidden                 Checking
//! ```

use serde::Serialize;

use crate::types::{UserId, UserRole};

/// Where the gate currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Checking,
    Unauthenticated,
    Error,
    Forbidden,
    Authorized,
}

impl GateState {
    /// Unauthenticated and Forbidden stay put until the user navigates away.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Unauthenticated | Self::Forbidden)
    }
}

/// Role gate for `/admin/*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGate {
    state: GateState,
    session: Option<Option<UserId>>,
    role: Option<Result<UserRole, String>>,
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessGate {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: GateState::Checking,
            session: None,
            role: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> GateState {
        self.state
    }

    /// The signed-in user, once the session has resolved to one.
    #[must_use]
    pub fn user(&self) -> Option<UserId> {
        self.session.flatten()
    }

    /// The error message of a failed role lookup, while in [`GateState::Error`].
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match (&self.state, &self.role) {
            (GateState::Error, Some(Err(message))) => Some(message),
            _ => None,
        }
    }

    /// Session lookup finished; `None` means nobody is signed in.
    pub fn on_session(&mut self, user: Option<UserId>) -> GateState {
        if self.state == GateState::Checking {
            self.session = Some(user);
            self.advance();
        }
        self.state
    }

    /// Role lookup finished.
    pub fn on_role(&mut self, role: Result<UserRole, String>) -> GateState {
        if self.state == GateState::Checking {
            self.role = Some(role);
            self.advance();
        }
        self.state
    }

    /// Leave [`GateState::Error`] and look everything up again.
    pub fn retry(&mut self) -> GateState {
        if self.state == GateState::Error {
            self.state = GateState::Checking;
            self.session = None;
            self.role = None;
        }
        self.state
    }

    fn advance(&mut self) {
        self.state = match (&self.session, &self.role) {
            (Some(None), _) => GateState::Unauthenticated,
            (Some(Some(_)), Some(Err(_))) => GateState::Error,
            (Some(Some(_)), Some(Ok(role))) if role.is_admin() => GateState::Authorized,
            (Some(Some(_)), Some(Ok(_))) => GateState::Forbidden,
            _ => GateState::Checking,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_checking() {
        assert_eq!(AccessGate::new().state(), GateState::Checking);
    }

    #[test]
    fn test_no_session_is_unauthenticated_and_terminal() {
        let mut gate = AccessGate::new();
        assert_eq!(gate.on_session(None), GateState::Unauthenticated);
        assert_eq!(gate.on_role(Ok(UserRole::Admin)), GateState::Unauthenticated);
        assert_eq!(gate.retry(), GateState::Unauthenticated);
    }

    #[test]
    fn test_admin_authorized_in_either_order() {
        let user = UserId::random();

        let mut gate = AccessGate::new();
        assert_eq!(gate.on_session(Some(user)), GateState::Checking);
        assert_eq!(gate.on_role(Ok(UserRole::Admin)), GateState::Authorized);

        let mut gate = AccessGate::new();
        assert_eq!(gate.on_role(Ok(UserRole::Admin)), GateState::Checking);
        assert_eq!(gate.on_session(Some(user)), GateState::Authorized);
        assert_eq!(gate.user(), Some(user));
    }

    #[test]
    fn test_customer_forbidden_and_terminal() {
        let mut gate = AccessGate::new();
        gate.on_role(Ok(UserRole::Customer));
        assert_eq!(gate.on_session(Some(UserId::random())), GateState::Forbidden);
        assert_eq!(gate.on_role(Ok(UserRole::Admin)), GateState::Forbidden);
        assert_eq!(gate.retry(), GateState::Forbidden);
    }

    #[test]
    fn test_role_error_offers_retry() {
        let mut gate = AccessGate::new();
        gate.on_session(Some(UserId::random()));
        assert_eq!(
            gate.on_role(Err("connection reset".to_string())),
            GateState::Error
        );
        assert_eq!(gate.error(), Some("connection reset"));

        assert_eq!(gate.retry(), GateState::Checking);
        assert_eq!(gate.user(), None);
        assert_eq!(gate.on_session(Some(UserId::random())), GateState::Checking);
        assert_eq!(gate.on_role(Ok(UserRole::Admin)), GateState::Authorized);
    }

    #[test]
    fn test_never_authorized_before_both_resolve() {
        let mut gate = AccessGate::new();
        assert_ne!(gate.on_role(Ok(UserRole::Admin)), GateState::Authorized);
        let mut gate = AccessGate::new();
        assert_ne!(gate.on_session(Some(UserId::random())), GateState::Authorized);
    }
}
