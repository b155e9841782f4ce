//! Runtime secret resolution.
//!
//! Config YAML stores only env var NAMES. Callers resolve once at startup
//! and pass the [`ResolvedSecrets`] into constructors instead of scattering
//! `std::env::var` calls. Errors and `Debug` output never contain values.

use crate::settings::OmsConfig;

/// Signing key used when no JWT secret is configured. Development only.
pub const DEV_FALLBACK_JWT_SECRET: &str = "local-dev-test-secret-change-me";

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// `None` when the named env var is unset or blank.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// `true` when `jwt_secret` is [`DEV_FALLBACK_JWT_SECRET`].
    pub jwt_secret_is_fallback: bool,
    /// `None` disables Basic authentication.
    pub admin_password: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "<REDACTED>"),
            )
            .field("jwt_secret", &"<REDACTED>")
            .field("jwt_secret_is_fallback", &self.jwt_secret_is_fallback)
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Unset or blank env vars resolve to `None`.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Never fails: a missing JWT secret falls back to the development key
/// (flagged so the daemon can warn) and a missing admin password disables
/// Basic authentication.
pub fn resolve_secrets(config: &OmsConfig) -> ResolvedSecrets {
    let database_url = resolve_env(&config.database.url_env);
    let admin_password = resolve_env(&config.security.admin_password_env);

    let (jwt_secret, jwt_secret_is_fallback) = match resolve_env(&config.security.jwt_secret_env)
    {
        Some(s) => (s, false),
        None => (DEV_FALLBACK_JWT_SECRET.to_string(), true),
    };

    ResolvedSecrets {
        database_url,
        jwt_secret,
        jwt_secret_is_fallback,
        admin_password,
    }
}
