//! Authenticated callers and the credentials they arrive with.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use uuid::Uuid;

use oms_domain::Role;

use crate::token::Claims;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Customer id for token callers. `None` for the Basic admin account.
    pub subject: Option<Uuid>,
    pub name: String,
    pub role: Role,
}

impl Principal {
    /// Unknown role strings map to the customer role.
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            subject: claims.subject(),
            name: claims.email.clone(),
            role: Role::parse(&claims.role).unwrap_or(Role::Customer),
        }
    }

    pub fn admin(name: impl Into<String>) -> Self {
        Self {
            subject: None,
            name: name.into(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Decoded `Authorization: Basic ...` header.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("user", &self.user)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

impl BasicCredentials {
    /// `None` unless the value is `Basic <base64(user:password)>`.
    pub fn parse(header_value: &str) -> Option<Self> {
        let (scheme, encoded) = header_value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let text = String::from_utf8(decoded).ok()?;
        let (user, password) = text.split_once(':')?;
        Some(Self {
            user: user.to_string(),
            password: password.to_string(),
        })
    }

    pub fn encode(user: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
    }
}

/// The single Basic-auth account, granted the admin role. Without a
/// configured password every Basic attempt fails.
#[derive(Clone)]
pub struct AdminAccount {
    user: String,
    password: Option<String>,
}

impl std::fmt::Debug for AdminAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAccount")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl AdminAccount {
    pub fn new(user: impl Into<String>, password: Option<String>) -> Self {
        Self {
            user: user.into(),
            password,
        }
    }

    pub fn disabled() -> Self {
        Self::new("admin", None)
    }

    pub fn is_enabled(&self) -> bool {
        self.password.is_some()
    }

    pub fn authenticate(&self, creds: &BasicCredentials) -> Option<Principal> {
        let expected = self.password.as_deref()?;
        if creds.user == self.user && constant_time_eq(creds.password.as_bytes(), expected.as_bytes())
        {
            Some(Principal::admin(&self.user))
        } else {
            None
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_header_parses() {
        let header = BasicCredentials::encode("test", "p:w");
        let creds = BasicCredentials::parse(&header).unwrap();
        assert_eq!(creds.user, "test");
        assert_eq!(creds.password, "p:w");
        assert!(BasicCredentials::parse("basic dGVzdDp0ZXN0").is_some());
    }

    #[test]
    fn non_basic_or_malformed_headers_ignored() {
        assert!(BasicCredentials::parse("Bearer abc").is_none());
        assert!(BasicCredentials::parse("Basic !!!").is_none());
        assert!(BasicCredentials::parse("Basic").is_none());
        // "nocolon"
        assert!(BasicCredentials::parse("Basic bm9jb2xvbg==").is_none());
    }

    #[test]
    fn admin_account_checks_user_and_password() {
        let admin = AdminAccount::new("test", Some("test".to_string()));
        let ok = BasicCredentials::parse(&BasicCredentials::encode("test", "test")).unwrap();
        let principal = admin.authenticate(&ok).unwrap();
        assert!(principal.is_admin());
        assert_eq!(principal.subject, None);

        let bad = BasicCredentials::parse(&BasicCredentials::encode("test", "nope")).unwrap();
        assert!(admin.authenticate(&bad).is_none());
        let other = BasicCredentials::parse(&BasicCredentials::encode("root", "test")).unwrap();
        assert!(admin.authenticate(&other).is_none());
    }

    #[test]
    fn disabled_admin_refuses_everyone() {
        let creds = BasicCredentials::parse(&BasicCredentials::encode("admin", "")).unwrap();
        assert!(AdminAccount::disabled().authenticate(&creds).is_none());
    }

    #[test]
    fn unknown_role_claim_is_not_admin() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "a@b.c".into(),
            role: "ROLE_USER".into(),
            iat: 0,
            exp: 1,
        };
        assert!(!Principal::from_claims(&claims).is_admin());
    }
}
