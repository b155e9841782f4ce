//! Caller authentication for `/api/**`.
//!
//! `Authorization: Bearer <jwt>` resolves to the token's customer.
//! `Authorization: Basic ...` resolves to the configured admin account.
//! Anything else is unauthenticated and the request stops here with 401.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use oms_auth::{BasicCredentials, Principal, UNAUTHENTICATED_MESSAGE};
use oms_domain::OmsError;

use crate::{error::ApiFailure, state::AppState};

const BAD_CREDENTIALS: &str = "Bad credentials";

/// `Ok(None)` when no usable `Authorization` header is present.
pub fn resolve_principal(st: &AppState, headers: &HeaderMap) -> Result<Option<Principal>, OmsError> {
    let Some(raw) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = raw
        .to_str()
        .map_err(|_| OmsError::Unauthenticated(BAD_CREDENTIALS.to_string()))?
        .trim();

    if let Some(token) = strip_scheme(value, "bearer") {
        let claims = st.tokens.verify(token)?;
        return Ok(Some(Principal::from_claims(&claims)));
    }
    if strip_scheme(value, "basic").is_some() {
        let creds = BasicCredentials::parse(value)
            .ok_or_else(|| OmsError::Unauthenticated(BAD_CREDENTIALS.to_string()))?;
        return match st.admin.authenticate(&creds) {
            Some(p) => Ok(Some(p)),
            None => {
                tracing::warn!(user = %creds.user, "basic authentication failed");
                Err(OmsError::Unauthenticated(BAD_CREDENTIALS.to_string()))
            }
        };
    }
    Ok(None)
}

fn strip_scheme<'a>(value: &'a str, scheme: &str) -> Option<&'a str> {
    let (head, rest) = value.split_once(' ')?;
    head.eq_ignore_ascii_case(scheme).then(|| rest.trim())
}

/// Route layer: resolve the caller and store it in request extensions, or
/// answer 401.
pub async fn require_principal(
    State(st): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    match resolve_principal(&st, req.headers()) {
        Ok(Some(principal)) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Ok(None) => ApiFailure::new(
            OmsError::Unauthenticated(UNAUTHENTICATED_MESSAGE.to_string()),
            path,
        )
        .into_response(),
        Err(e) => ApiFailure::new(e, path).into_response(),
    }
}
