//! Layered YAML configuration.
//!
//! Documents are deep-merged in order (later wins), converted to JSON and
//! hashed over their canonical form. Leaf strings that look like credentials
//! abort the load: the YAML holds env-var *names*, values come from
//! [`secrets::resolve_secrets`] at startup.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;

pub mod secrets;
pub mod settings;

pub use secrets::{resolve_secrets, ResolvedSecrets, DEV_FALLBACK_JWT_SECRET};
pub use settings::{
    DatabaseSettings, OmsConfig, OrderServiceSettings, SecuritySettings, ServerSettings,
};

/// Leaf strings starting with any of these abort with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // Stripe / OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "glpat-",     // GitLab PAT
    "eyJ",        // serialized JWT
    "$2a$",       // bcrypt hash
    "$2b$",
    "$2y$",
    "postgres://", // connection strings carry passwords
    "postgresql://",
];

/// JSON-pointer prefixes the daemon actually reads. A leaf under any of
/// these is consumed; everything else is reported as unused.
pub const CONSUMED_POINTERS: &[&str] = &[
    "/server/bind_addr",
    "/database/url_env",
    "/database/max_connections",
    "/database/migrate_on_boot",
    "/security/jwt_secret_env",
    "/security/jwt_ttl_seconds",
    "/security/admin_user",
    "/security/admin_password_env",
    "/order_service/optimistic_lock_max_retries",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Sorted, unique.
    pub consumed_prefixes: Vec<String>,
    /// Sorted leaf pointers not covered by any consumed prefix.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// With `Fail`, unused keys are an error; with `Warn` the report is returned
/// for the caller to log.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let consumed: BTreeSet<String> = CONSUMED_POINTERS
        .iter()
        .map(|p| normalize_pointer(p))
        .collect();
    let consumed_prefixes: Vec<String> = consumed.into_iter().collect();

    let mut unused: Vec<String> = leaf_pointers(config_json)
        .into_iter()
        .filter(|leaf| !consumed_prefixes.iter().any(|cp| is_prefix_pointer(cp, leaf)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        consumed_prefixes,
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} key(s) not read by oms: {:?}",
            report.unused_leaf_pointers.len(),
            report.unused_leaf_pointers.iter().take(12).collect::<Vec<_>>()
        );
    }

    Ok(report)
}

fn normalize_pointer(p: &str) -> String {
    let trimmed = p.trim().trim_end_matches('/');
    match trimmed.strip_prefix('/') {
        Some(rest) => format!("/{rest}"),
        None if trimmed.is_empty() => "/".to_string(),
        None => format!("/{trimmed}"),
    }
}

/// "/a/b" consumes "/a/b" and "/a/b/c" but not "/a/bc". "/" consumes all.
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match leaf.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Every scalar leaf with its JSON pointer, in map-key order.
fn leaves<'a>(v: &'a Value, pointer: String, out: &mut Vec<(String, &'a Value)>) {
    match v {
        Value::Object(map) => {
            for (key, child) in map {
                let token = key.replace('~', "~0").replace('/', "~1");
                leaves(child, format!("{pointer}/{token}"), out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                leaves(child, format!("{pointer}/{i}"), out);
            }
        }
        scalar => {
            let at = if pointer.is_empty() { "/".to_string() } else { pointer };
            out.push((at, scalar));
        }
    }
}

fn leaf_pointers(v: &Value) -> Vec<String> {
    let mut out = Vec::new();
    leaves(v, String::new(), &mut out);
    out.into_iter().map(|(ptr, _)| ptr).collect()
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed view with defaults for every absent key.
    pub fn settings(&self) -> Result<OmsConfig> {
        OmsConfig::from_json(&self.config_json)
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());
    for (layer, raw) in yaml_docs.iter().enumerate() {
        let doc: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("layer {layer}: invalid yaml"))?;
        // An empty document parses as null; treat it as an empty overlay.
        if doc.is_null() {
            continue;
        }
        let overlay = serde_json::to_value(doc)
            .with_context(|| format!("layer {layer}: yaml->json conversion failed"))?;
        merge_into(&mut merged, overlay);
    }

    reject_secret_literals(&merged)?;

    // serde_json's default Map is a BTreeMap, so compact output has sorted keys.
    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Maps merge key by key; any other overlay value replaces the base.
fn merge_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                merge_into(base_map.entry(key).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

fn reject_secret_literals(v: &Value) -> Result<()> {
    let mut found = Vec::new();
    leaves(v, String::new(), &mut found);
    match found
        .into_iter()
        .find(|(_, leaf)| leaf.as_str().is_some_and(looks_like_secret))
    {
        Some((ptr, _)) => bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr),
        None => Ok(()),
    }
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    t.len() >= 8 && SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}
