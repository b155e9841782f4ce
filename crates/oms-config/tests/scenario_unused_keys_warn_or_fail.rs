use oms_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

const YAML: &str = r#"
server:
  bind_addr: "127.0.0.1:9090"
security:
  jwt_ttl_seconds: 60
  legacy_realm: "oms"
metrics:
  enabled: true
"#;

#[test]
fn warn_reports_unused_keys_without_error() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)
        .expect("warn policy must not error");

    assert!(!report.is_clean());
    assert_eq!(
        report.unused_leaf_pointers,
        vec![
            "/metrics/enabled".to_string(),
            "/security/legacy_realm".to_string(),
        ]
    );
}

#[test]
fn fail_errors_on_unused_keys() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("CONFIG_UNUSED_KEYS"), "got: {msg}");
    assert!(msg.contains("/metrics/enabled"), "got: {msg}");
}

#[test]
fn shipped_base_config_is_clean() {
    let raw = include_str!("../../../config/base.yaml");
    let loaded = load_layered_yaml_from_strings(&[raw]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail)
        .expect("base.yaml must only contain consumed keys");
    assert!(report.is_clean());
}
