//! bcrypt password hashing. Verification accepts `$2a$`, `$2b$` and `$2y$`.

use oms_domain::OmsError;

pub use bcrypt::DEFAULT_COST;

pub fn hash_password(plain: &str) -> Result<String, OmsError> {
    hash_password_with_cost(plain, DEFAULT_COST)
}

pub fn hash_password_with_cost(plain: &str, cost: u32) -> Result<String, OmsError> {
    if plain.is_empty() {
        return Err(OmsError::Validation("password must not be blank".to_string()));
    }
    bcrypt::hash(plain, cost).map_err(|e| OmsError::Internal(format!("password hash failed: {e}")))
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    match bcrypt::verify(plain, hash) {
        Ok(ok) => ok,
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is not valid bcrypt");
            false
        }
    }
}
