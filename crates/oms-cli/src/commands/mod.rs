//! Command handler modules for the `oms` CLI.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod book;

use std::sync::Arc;

use anyhow::{Context, Result};
use oms_domain::{OmsError, OmsStore, Role};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Connect using `OMS_DATABASE_URL` and wrap the pool as a store.
pub async fn connect_store() -> Result<Arc<dyn OmsStore>> {
    let pool = oms_db::connect_from_env().await?;
    Ok(Arc::new(oms_db::PgStore::new(pool)))
}

/// Read a secret from the named env var. Values never travel on argv.
pub fn secret_from_env(var_name: &str) -> Result<String> {
    let value = std::env::var(var_name).with_context(|| format!("{var_name} is not set"))?;
    if value.trim().is_empty() {
        anyhow::bail!("{var_name} is blank");
    }
    Ok(value)
}

/// Accepts `ROLE_ADMIN` / `ROLE_CUSTOMER` or the bare `admin` / `customer`.
pub fn parse_role(s: &str) -> Result<Role> {
    let upper = s.trim().to_uppercase();
    let full = if upper.starts_with("ROLE_") {
        upper
    } else {
        format!("ROLE_{upper}")
    };
    Role::parse(&full).map_err(|_| {
        anyhow::anyhow!("invalid --role '{s}'. expected one of: ROLE_ADMIN | ROLE_CUSTOMER")
    })
}

/// Domain errors carry their own client-facing text; keep it as the message.
pub fn domain(err: OmsError) -> anyhow::Error {
    anyhow::anyhow!("{} (status={})", err.message(), err.status_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_accepts_short_and_full_forms() {
        assert_eq!(parse_role("admin").unwrap(), Role::Admin);
        assert_eq!(parse_role("ROLE_CUSTOMER").unwrap(), Role::Customer);
        assert_eq!(parse_role(" Customer ").unwrap(), Role::Customer);
        assert!(parse_role("root").is_err());
    }

    #[test]
    fn domain_error_keeps_message_and_status() {
        let e = domain(OmsError::NotFound("Order x not found".into()));
        assert_eq!(e.to_string(), "Order x not found (status=404)");
    }
}
