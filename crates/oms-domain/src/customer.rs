use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::Role;

/// A login-capable account. `password_hash` is a bcrypt hash, never plaintext.
#[derive(Clone, PartialEq, Eq)]
pub struct Customer {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(email: impl Into<String>, role: Role, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: password_hash.into(),
            role,
            created_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for Customer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Customer")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<REDACTED>")
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .finish()
    }
}
