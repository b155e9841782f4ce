//! Error taxonomy shared by every layer above the store.
//!
//! Each variant carries the client-facing message and maps to exactly one
//! HTTP status. The HTTP layer never inspects message text.

use std::fmt;

use crate::store::StoreError;

/// Message surfaced when optimistic-lock retries are exhausted.
pub const CONCURRENT_UPDATE_MESSAGE: &str = "Concurrent update, please retry";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OmsError {
    /// Malformed or out-of-range input. 400.
    Validation(String),
    /// Usable balance too small to reserve for a new order. 400.
    InsufficientFunds(String),
    /// Reserved balance smaller than the order being released or settled. 400.
    InconsistentReservation(String),
    /// No (valid) credentials presented. 401.
    Unauthenticated(String),
    /// Credentials valid but not allowed, or a bad password. 403.
    Forbidden(String),
    /// 404.
    NotFound(String),
    /// Cancel requested for an order that is no longer PENDING. 409.
    NotCancellable(String),
    /// Optimistic lock lost after all retries. 409.
    Conflict(String),
    /// Unique key already taken. 409.
    Duplicate(String),
    /// Backend failure. 500.
    Internal(String),
}

impl OmsError {
    pub fn status_code(&self) -> u16 {
        match self {
            OmsError::Validation(_)
            | OmsError::InsufficientFunds(_)
            | OmsError::InconsistentReservation(_) => 400,
            OmsError::Unauthenticated(_) => 401,
            OmsError::Forbidden(_) => 403,
            OmsError::NotFound(_) => 404,
            OmsError::NotCancellable(_) | OmsError::Conflict(_) | OmsError::Duplicate(_) => 409,
            OmsError::Internal(_) => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            OmsError::Validation(m)
            | OmsError::InsufficientFunds(m)
            | OmsError::InconsistentReservation(m)
            | OmsError::Unauthenticated(m)
            | OmsError::Forbidden(m)
            | OmsError::NotFound(m)
            | OmsError::NotCancellable(m)
            | OmsError::Conflict(m)
            | OmsError::Duplicate(m)
            | OmsError::Internal(m) => m,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, OmsError::Conflict(_))
    }
}

impl fmt::Display for OmsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for OmsError {}

impl From<StoreError> for OmsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => OmsError::Conflict(CONCURRENT_UPDATE_MESSAGE.to_string()),
            StoreError::Duplicate { entity, key } => {
                OmsError::Duplicate(format!("{entity} {key} already exists"))
            }
            StoreError::Backend(e) => OmsError::Internal(format!("{e:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_variant() {
        assert_eq!(OmsError::Validation("x".into()).status_code(), 400);
        assert_eq!(OmsError::InsufficientFunds("x".into()).status_code(), 400);
        assert_eq!(OmsError::Unauthenticated("x".into()).status_code(), 401);
        assert_eq!(OmsError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(OmsError::NotFound("x".into()).status_code(), 404);
        assert_eq!(OmsError::NotCancellable("x".into()).status_code(), 409);
        assert_eq!(OmsError::Conflict("x".into()).status_code(), 409);
        assert_eq!(OmsError::Internal("x".into()).status_code(), 500);
    }

    #[test]
    fn store_conflict_maps_to_retry_message() {
        let err: OmsError = StoreError::Conflict {
            entity: "asset",
            key: "TRY".into(),
        }
        .into();
        assert!(err.is_conflict());
        assert_eq!(err.message(), CONCURRENT_UPDATE_MESSAGE);
    }

    #[test]
    fn backend_error_keeps_context_chain() {
        let inner = anyhow::anyhow!("connection reset").context("commit failed");
        let err: OmsError = StoreError::Backend(inner).into();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.message(), "commit failed: connection reset");
    }
}
