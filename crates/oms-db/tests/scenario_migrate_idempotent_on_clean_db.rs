/// Migrating twice must be idempotent and leave the OMS schema in place.
///
/// DB-backed test, skipped if OMS_DATABASE_URL is not set.
#[tokio::test]
async fn migrate_idempotent_on_clean_db() -> anyhow::Result<()> {
    let url = match std::env::var(oms_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: OMS_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = oms_db::connect(&url, 2).await?;

    oms_db::migrate(&pool).await?;
    oms_db::migrate(&pool).await?;

    let st = oms_db::status(&pool).await?;
    assert!(st.ok);
    assert!(st.has_oms_schema);

    Ok(())
}
