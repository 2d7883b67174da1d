//! Role lookups for the back-office gate.

use std::future::Future;

use mytechgear_core::access::AccessGate;
use mytechgear_core::{UserId, UserRole};

/// Where the gate reads a user's role from.
pub trait RoleSource: Clone + Send + Sync + 'static {
    /// Current role of `user`. The error string is shown on the retry page.
    fn role_of(&self, user: UserId) -> impl Future<Output = Result<UserRole, String>> + Send;
}

/// Run the gate for one request.
///
/// The role is only looked up when somebody is signed in.
pub async fn check_access<R: RoleSource>(roles: &R, user: Option<UserId>) -> AccessGate {
    let mut gate = AccessGate::new();
    gate.on_session(user);
    if let Some(user) = user {
        gate.on_role(roles.role_of(user).await);
    }
    gate
}

#[cfg(test)]
mod tests {
    use mytechgear_core::access::GateState;

    use super::*;

    #[derive(Clone)]
    struct Fixed(Result<UserRole, String>);

    impl RoleSource for Fixed {
        async fn role_of(&self, _user: UserId) -> Result<UserRole, String> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_check_access_states() {
        let user = Some(UserId::random());

        let admin = check_access(&Fixed(Ok(UserRole::Admin)), user).await;
        assert_eq!(admin.state(), GateState::Authorized);
        assert_eq!(admin.user(), user);

        let customer = check_access(&Fixed(Ok(UserRole::Customer)), user).await;
        assert_eq!(customer.state(), GateState::Forbidden);

        let broken = check_access(&Fixed(Err("pool timed out".to_string())), user).await;
        assert_eq!(broken.state(), GateState::Error);
        assert_eq!(broken.error(), Some("pool timed out"));

        let anonymous = check_access(&Fixed(Ok(UserRole::Admin)), None).await;
        assert_eq!(anonymous.state(), GateState::Unauthenticated);
    }
}
