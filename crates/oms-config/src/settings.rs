//! Typed view over the merged config JSON.
//!
//! Every section and key has a default, so an empty document yields a
//! runnable local setup. Unknown keys are not rejected here; the unused-key
//! report covers them.

use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OmsConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub security: SecuritySettings,
    pub order_service: OrderServiceSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Name of the env var holding the connection URL.
    pub url_env: String,
    pub max_connections: u32,
    pub migrate_on_boot: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url_env: "OMS_DATABASE_URL".to_string(),
            max_connections: 10,
            migrate_on_boot: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    pub jwt_secret_env: String,
    pub jwt_ttl_seconds: i64,
    /// Basic-auth user granted the admin role.
    pub admin_user: String,
    pub admin_password_env: String,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            jwt_secret_env: "OMS_JWT_SECRET".to_string(),
            jwt_ttl_seconds: 3600,
            admin_user: "admin".to_string(),
            admin_password_env: "OMS_ADMIN_PASSWORD".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderServiceSettings {
    /// Attempts per balance-changing operation. Values <= 0 mean one attempt.
    pub optimistic_lock_max_retries: i32,
}

impl Default for OrderServiceSettings {
    fn default() -> Self {
        Self {
            optimistic_lock_max_retries: 3,
        }
    }
}

impl OrderServiceSettings {
    pub fn attempts(&self) -> u32 {
        self.optimistic_lock_max_retries.max(1) as u32
    }
}

impl OmsConfig {
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let cfg: OmsConfig = serde_json::from_value(config_json.clone())
            .context("CONFIG_INVALID: config does not match the expected shape")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;
        if self.database.max_connections == 0 {
            bail!("CONFIG_INVALID: database.max_connections must be >= 1");
        }
        if self.security.jwt_ttl_seconds <= 0 {
            bail!("CONFIG_INVALID: security.jwt_ttl_seconds must be > 0");
        }
        for (key, name) in [
            ("database.url_env", &self.database.url_env),
            ("security.jwt_secret_env", &self.security.jwt_secret_env),
            ("security.admin_password_env", &self.security.admin_password_env),
        ] {
            if name.trim().is_empty() {
                bail!("CONFIG_INVALID: {key} must name an environment variable");
            }
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server.bind_addr.parse().with_context(|| {
            format!(
                "CONFIG_INVALID: server.bind_addr '{}' is not host:port",
                self.server.bind_addr
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let cfg = OmsConfig::from_json(&serde_json::json!({})).unwrap();
        assert_eq!(cfg, OmsConfig::default());
        assert_eq!(cfg.bind_addr().unwrap().port(), 8080);
        assert_eq!(cfg.order_service.attempts(), 3);
    }

    #[test]
    fn non_positive_retries_mean_single_attempt() {
        let cfg = OmsConfig::from_json(&serde_json::json!({
            "order_service": {"optimistic_lock_max_retries": -2}
        }))
        .unwrap();
        assert_eq!(cfg.order_service.attempts(), 1);
    }

    #[test]
    fn bad_values_rejected() {
        let err = OmsConfig::from_json(&serde_json::json!({"server": {"bind_addr": "nope"}}))
            .unwrap_err();
        assert!(format!("{err:#}").contains("server.bind_addr"));

        let err = OmsConfig::from_json(&serde_json::json!({"security": {"jwt_ttl_seconds": 0}}))
            .unwrap_err();
        assert!(err.to_string().contains("jwt_ttl_seconds"));

        assert!(OmsConfig::from_json(&serde_json::json!({"database": {"max_connections": "x"}}))
            .is_err());
    }
}
