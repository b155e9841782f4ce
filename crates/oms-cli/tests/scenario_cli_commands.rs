use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn repo_root() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// `oms config-hash` prints a stable hash line followed by canonical JSON.
#[test]
fn config_hash_prints_hash_and_canonical_json() -> anyhow::Result<()> {
    let base = repo_root().join("config/base.yaml");
    let base_s = base.to_string_lossy().to_string();

    let first = Command::cargo_bin("oms")?
        .args(["config-hash", base_s.as_str()])
        .output()?;
    assert!(first.status.success());
    let stdout = String::from_utf8(first.stdout)?;
    let mut lines = stdout.lines();
    let hash_line = lines.next().unwrap_or_default();
    assert!(hash_line.starts_with("config_hash="));
    assert_eq!(hash_line.len(), "config_hash=".len() + 64);
    assert!(lines.next().unwrap_or_default().starts_with('{'));

    Command::cargo_bin("oms")?
        .args(["config-hash", base_s.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains(hash_line));
    Ok(())
}

#[test]
fn config_hash_requires_a_path() -> anyhow::Result<()> {
    Command::cargo_bin("oms")?
        .arg("config-hash")
        .assert()
        .failure();
    Ok(())
}

/// Input errors are reported before any DB connection is attempted.
#[test]
fn bad_arguments_fail_without_a_database() -> anyhow::Result<()> {
    Command::cargo_bin("oms")?
        .env_remove(oms_db::ENV_DB_URL)
        .args(["order", "match", "--order-id", "not-a-uuid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid order_id uuid"));

    Command::cargo_bin("oms")?
        .env_remove(oms_db::ENV_DB_URL)
        .args(["customer", "add", "--email", "a@b.c", "--role", "root"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --role"));

    Command::cargo_bin("oms")?
        .env_remove("OMS_DEMO_PASSWORD_UNSET_FOR_TEST")
        .args(["seed-demo", "--password-env", "OMS_DEMO_PASSWORD_UNSET_FOR_TEST"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OMS_DEMO_PASSWORD_UNSET_FOR_TEST is not set"));
    Ok(())
}

/// DB-backed: seeding twice creates rows once. Skipped if OMS_DATABASE_URL is not set.
#[test]
fn seed_demo_is_idempotent() -> anyhow::Result<()> {
    let url = match std::env::var(oms_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: OMS_DATABASE_URL not set");
            return Ok(());
        }
    };

    Command::cargo_bin("oms")?
        .env(oms_db::ENV_DB_URL, &url)
        .args(["db", "migrate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("migrations_applied=true"));

    for _ in 0..2 {
        Command::cargo_bin("oms")?
            .env(oms_db::ENV_DB_URL, &url)
            .env("OMS_DEMO_PASSWORD", "demo-password")
            .arg("seed-demo")
            .assert()
            .success()
            .stdout(predicate::str::contains("demo_customer_id=00000000-0000-0000-0000-000000000001"));
    }

    Command::cargo_bin("oms")?
        .env(oms_db::ENV_DB_URL, &url)
        .env("OMS_DEMO_PASSWORD", "demo-password")
        .arg("seed-demo")
        .assert()
        .success()
        .stdout(predicate::str::contains("customers_created=0"))
        .stdout(predicate::str::contains("assets_created=0"));
    Ok(())
}
