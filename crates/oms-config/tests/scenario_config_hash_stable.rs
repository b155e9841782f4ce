//! Layering and hashing determinism.
//!
//! - Same inputs hash identically.
//! - Key order inside a document does not change the hash.
//! - Later layers override earlier ones and change the hash.

use oms_config::{load_layered_yaml, load_layered_yaml_from_strings};

const BASE_YAML: &str = r#"
server:
  bind_addr: "127.0.0.1:8080"
security:
  jwt_secret_env: "OMS_JWT_SECRET"
  jwt_ttl_seconds: 3600
order_service:
  optimistic_lock_max_retries: 3
"#;

const BASE_YAML_REORDERED: &str = r#"
order_service:
  optimistic_lock_max_retries: 3
security:
  jwt_ttl_seconds: 3600
  jwt_secret_env: "OMS_JWT_SECRET"
server:
  bind_addr: "127.0.0.1:8080"
"#;

const OVERLAY_YAML: &str = r#"
security:
  jwt_ttl_seconds: 600
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash.len(), 64, "sha256 hex digest");
}

#[test]
fn reordered_keys_produce_same_hash() {
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(original.config_hash, reordered.config_hash);
}

#[test]
fn overlay_overrides_leaf_and_keeps_siblings() {
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let settings = merged.settings().unwrap();
    assert_eq!(settings.security.jwt_ttl_seconds, 600);
    assert_eq!(settings.security.jwt_secret_env, "OMS_JWT_SECRET");
    assert_eq!(settings.order_service.optimistic_lock_max_retries, 3);

    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_ne!(base.config_hash, merged.config_hash);
}

#[test]
fn empty_overlay_is_a_no_op() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let with_empty = load_layered_yaml_from_strings(&[BASE_YAML, ""]).unwrap();
    assert_eq!(base.config_hash, with_empty.config_hash);
}

#[test]
fn shipped_config_files_load() {
    let base = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/base.yaml");
    let local = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/local.yaml");

    let loaded = load_layered_yaml(&[base, local]).expect("shipped config must load");
    let settings = loaded.settings().unwrap();
    assert_eq!(settings.server.bind_addr, "0.0.0.0:8080");
    assert_eq!(settings.order_service.optimistic_lock_max_retries, 5);
    assert_eq!(settings.security.admin_user, "admin");
}

#[test]
fn missing_file_names_the_path() {
    let err = load_layered_yaml(&["/definitely/not/here.yaml"]).unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here.yaml"));
}
