//! tabmark API server.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tabmark_api::{build_router, parse_allowed_origins, AppState, AuthConfig, RateLimitConfig};
use tabmark_core::defaults;
use tabmark_db::{Database, PoolConfig, Store};
use tabmark_jobs::{
    processor_for, spawn_sweeper, CaptureConfig, CaptureSubmitter, InMemoryJobStore, JobStore,
    LinkChecker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "tabmark_api=debug,tabmark_jobs=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tabmark_api=debug,tabmark_jobs=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("tabmark-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::SERVER_PORT);

    let rate_limit = RateLimitConfig::from_env();
    info!(
        "Rate limiting: {} ({} requests per {} seconds)",
        if rate_limit.enabled {
            "enabled"
        } else {
            "disabled"
        },
        rate_limit.requests,
        rate_limit.period.as_secs()
    );

    let auth = AuthConfig::from_env()?;
    if auth.bypass {
        tracing::warn!(user_id = %auth.dev_user_id, "AUTH_BYPASS enabled, all requests use the dev user");
    }

    // Storage: PostgreSQL when DATABASE_URL is set, JSON files otherwise
    let store = match std::env::var("DATABASE_URL") {
        Ok(database_url) if !database_url.trim().is_empty() => {
            info!("Connecting to database...");
            let db = Database::connect_with_config(&database_url, PoolConfig::from_env()).await?;
            info!("Database connected");

            info!("Running database migrations...");
            db.migrate().await?;
            info!("Database migrations complete");
            Store::postgres(&db)
        }
        _ => {
            let data_dir =
                std::env::var("DATA_DIR").unwrap_or_else(|_| defaults::DATA_DIR.to_string());
            info!(data_dir = %data_dir, "DATABASE_URL not set, using file store");
            Store::open_file(&data_dir).await?
        }
    };

    // Capture pipeline
    let capture_config = CaptureConfig::from_env()?;
    let link_checker = LinkChecker::from_env()?;
    let jobs: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let processor = processor_for(
        capture_config.mode,
        store.bookmarks.clone(),
        Some(link_checker.clone()),
    );
    info!(
        mode = capture_config.mode.as_str(),
        tab_concurrency = capture_config.tab_concurrency,
        job_timeout_secs = capture_config.job_timeout.as_secs(),
        "Capture pipeline configured"
    );

    let _sweeper = spawn_sweeper(
        jobs.clone(),
        capture_config.job_ttl,
        capture_config.sweep_interval,
    );
    let capture = CaptureSubmitter::new(jobs, processor, capture_config);

    let allowed_origins =
        parse_allowed_origins(&std::env::var("ALLOWED_ORIGINS").unwrap_or_default());

    let state = AppState::new(store, capture, link_checker)
        .with_auth(auth)
        .with_rate_limiter(rate_limit.build()?)
        .with_allowed_origins(allowed_origins);

    let app = build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
