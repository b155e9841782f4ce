//! HS256 bearer tokens.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use oms_domain::{Customer, OmsError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Customer id.
    pub sub: String,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn subject(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub claims: Claims,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("key", &"<REDACTED>")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl TokenService {
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    pub fn issue(&self, customer: &Customer) -> Result<IssuedToken, OmsError> {
        self.issue_at(customer, Utc::now())
    }

    /// Issue with an explicit clock; `exp = now + ttl`.
    pub fn issue_at(&self, customer: &Customer, now: DateTime<Utc>) -> Result<IssuedToken, OmsError> {
        let iat = now.timestamp();
        let exp = iat + self.ttl_seconds;
        let claims = Claims {
            sub: customer.id.to_string(),
            email: customer.email.clone(),
            role: customer.role.as_str().to_string(),
            iat,
            exp,
        };

        let value = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| OmsError::Internal(format!("token encode failed: {e}")))?;
        let expires_at = Utc
            .timestamp_opt(exp, 0)
            .single()
            .ok_or_else(|| OmsError::Internal("token expiry out of range".to_string()))?;

        Ok(IssuedToken {
            value,
            expires_at,
            claims,
        })
    }

    /// Checks signature, algorithm and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, OmsError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "bearer token rejected");
                OmsError::Unauthenticated("Invalid or expired bearer token".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use oms_domain::Role;

    fn customer() -> Customer {
        Customer::new("user@example.com", Role::Customer, "hash")
    }

    #[test]
    fn issued_token_round_trips_claims() {
        let svc = TokenService::new("unit-test-secret", 3600);
        let c = customer();
        let issued = svc.issue(&c).unwrap();

        assert_eq!(issued.claims.exp - issued.claims.iat, 3600);
        assert!(issued.expires_at > Utc::now());

        let claims = svc.verify(&issued.value).unwrap();
        assert_eq!(claims.subject(), Some(c.id));
        assert_eq!(claims.email, "user@example.com");
        assert_eq!(claims.role, "ROLE_CUSTOMER");
    }

    #[test]
    fn wrong_key_is_rejected() {
        let issued = TokenService::new("key-one", 60).issue(&customer()).unwrap();
        let err = TokenService::new("key-two", 60)
            .verify(&issued.value)
            .unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = TokenService::new("unit-test-secret", 60);
        let issued = svc
            .issue_at(&customer(), Utc::now() - Duration::hours(2))
            .unwrap();
        assert!(svc.verify(&issued.value).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let svc = TokenService::new("unit-test-secret", 60);
        assert!(svc.verify("not.a.jwt").is_err());
        assert!(svc.verify("").is_err());
    }

    #[test]
    fn debug_hides_key() {
        let dbg = format!("{:?}", TokenService::new("super-secret-value", 60));
        assert!(!dbg.contains("super-secret-value"));
    }
}
