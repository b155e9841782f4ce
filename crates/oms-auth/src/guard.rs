//! Who may act on which customer's data.
//!
//! Admins may act on anyone. Everyone else only on the customer named by
//! their token subject. No principal means unauthenticated.

use uuid::Uuid;

use oms_domain::OmsError;

use crate::principal::Principal;

pub const UNAUTHENTICATED_MESSAGE: &str = "Full authentication is required to access this resource";
pub const ACCESS_DENIED_MESSAGE: &str = "Access denied";

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationGuard;

impl AuthorizationGuard {
    pub fn is_admin(&self, principal: Option<&Principal>) -> bool {
        principal.is_some_and(Principal::is_admin)
    }

    pub fn can_access_customer(&self, principal: Option<&Principal>, customer_id: Uuid) -> bool {
        match principal {
            None => false,
            Some(p) if p.is_admin() => true,
            Some(p) => p.subject == Some(customer_id),
        }
    }

    pub fn check_customer_access(
        &self,
        principal: Option<&Principal>,
        customer_id: Uuid,
    ) -> Result<(), OmsError> {
        let Some(p) = principal else {
            return Err(OmsError::Unauthenticated(UNAUTHENTICATED_MESSAGE.to_string()));
        };
        if self.can_access_customer(Some(p), customer_id) {
            Ok(())
        } else {
            tracing::warn!(principal = %p.name, %customer_id, "customer access denied");
            Err(OmsError::Forbidden(ACCESS_DENIED_MESSAGE.to_string()))
        }
    }

    pub fn require_admin(&self, principal: Option<&Principal>) -> Result<(), OmsError> {
        match principal {
            None => Err(OmsError::Unauthenticated(UNAUTHENTICATED_MESSAGE.to_string())),
            Some(p) if p.is_admin() => Ok(()),
            Some(p) => {
                tracing::warn!(principal = %p.name, "admin operation denied");
                Err(OmsError::Forbidden(ACCESS_DENIED_MESSAGE.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_domain::Role;

    fn customer(id: Uuid) -> Principal {
        Principal {
            subject: Some(id),
            name: "user@example.com".into(),
            role: Role::Customer,
        }
    }

    #[test]
    fn unauthenticated_is_refused() {
        let guard = AuthorizationGuard;
        assert!(!guard.can_access_customer(None, Uuid::new_v4()));
        let err = guard.check_customer_access(None, Uuid::new_v4()).unwrap_err();
        assert_eq!(err.status_code(), 401);
        assert_eq!(guard.require_admin(None).unwrap_err().status_code(), 401);
    }

    #[test]
    fn admin_reaches_every_customer() {
        let guard = AuthorizationGuard;
        let admin = Principal::admin("test");
        let requested = Uuid::new_v4();
        assert!(guard.can_access_customer(Some(&admin), requested));
        assert!(guard.check_customer_access(Some(&admin), requested).is_ok());
        assert!(guard.require_admin(Some(&admin)).is_ok());
    }

    #[test]
    fn customer_reaches_only_itself() {
        let guard = AuthorizationGuard;
        let sub = Uuid::new_v4();
        let me = customer(sub);
        assert!(guard.can_access_customer(Some(&me), sub));
        assert!(guard.check_customer_access(Some(&me), sub).is_ok());

        let other = Uuid::new_v4();
        assert!(!guard.can_access_customer(Some(&me), other));
        let err = guard.check_customer_access(Some(&me), other).unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.message(), ACCESS_DENIED_MESSAGE);

        assert_eq!(guard.require_admin(Some(&me)).unwrap_err().status_code(), 403);
    }

    #[test]
    fn token_without_subject_reaches_nobody() {
        let guard = AuthorizationGuard;
        let p = Principal {
            subject: None,
            name: "ghost".into(),
            role: Role::Customer,
        };
        assert!(!guard.can_access_customer(Some(&p), Uuid::new_v4()));
    }
}
