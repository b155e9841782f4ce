//! oms-daemon entry point.
//!
//! Thin on purpose: load config and secrets, connect the store, wire
//! middleware and serve. Handlers live in `routes.rs`, shared state in
//! `state.rs`.

use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use oms_config::{resolve_secrets, UnusedKeyPolicy};
use oms_daemon::{routes, state};
use oms_db::PgStore;
use oms_domain::OmsStore;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

/// Comma-separated YAML paths, merged left to right.
const ENV_CONFIG_PATHS: &str = "OMS_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/base.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let paths = config_paths();
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let loaded = oms_config::load_layered_yaml(&path_refs).context("config load failed")?;
    let unused = oms_config::report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !unused.is_clean() {
        warn!(keys = ?unused.unused_leaf_pointers, "config has unused keys");
    }
    let cfg = loaded.settings()?;
    let secrets = resolve_secrets(&cfg);
    if secrets.jwt_secret_is_fallback {
        warn!(
            env = %cfg.security.jwt_secret_env,
            "JWT secret not set; signing with the development fallback key"
        );
    }
    if secrets.admin_password.is_none() {
        info!(env = %cfg.security.admin_password_env, "admin password not set; Basic auth disabled");
    }

    let db_url = secrets
        .database_url
        .clone()
        .with_context(|| format!("{} is not set", cfg.database.url_env))?;
    let pool = oms_db::connect(&db_url, cfg.database.max_connections).await?;
    if cfg.database.migrate_on_boot {
        oms_db::migrate(&pool).await?;
    }
    let store: Arc<dyn OmsStore> = Arc::new(PgStore::new(pool));

    let shared = Arc::new(state::AppState::from_config(store, &cfg, &secrets));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = cfg.bind_addr()?;
    info!(
        config_hash = %loaded.config_hash,
        version = shared.build.version,
        "oms-daemon listening on http://{}",
        addr
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    info!("oms-daemon stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn config_paths() -> Vec<String> {
    match std::env::var(ENV_CONFIG_PATHS) {
        Ok(v) if !v.trim().is_empty() => v
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
        _ => vec![DEFAULT_CONFIG_PATH.to_string()],
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler failed; shutting down");
    }
    info!("shutdown requested");
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:8080",
        "http://127.0.0.1:8080",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
