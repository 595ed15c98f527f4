//! scripto-api - HTTP server for the ScriptO AI pipeline

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scripto_api::{router, AppState, ServerConfig};
use scripto_core::{defaults, AiProvider, InteractionRepository};
use scripto_db::{Database, InMemoryInteractionRepository, PoolConfig};
use scripto_inference::{AiConfig, AnthropicBackend};
use scripto_jobs::{queue, InteractionOrchestrator, InteractionWorker, WorkerConfig};
use scripto_processing::SubjectClassifier;

/// Initialize tracing with configurable output.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables daily-rotated file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter (default: "scripto_api=debug,tower_http=debug")
fn init_tracing() -> Option<WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "scripto_api=debug,scripto_jobs=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let path = std::path::Path::new(path);
        let file_dir = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("scripto-api.log");
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
            // No ANSI in files unless asked for.
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
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
    guard
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let server_config = ServerConfig::from_env();
    let ai_config = AiConfig::from_env();
    let worker_config = WorkerConfig::from_env();

    // Missing or invalid provider configuration is fatal.
    let classify_temperature = ai_config.classify_temperature;
    let backend = AnthropicBackend::new(ai_config)?;
    info!(
        model = backend.config().default_model.as_str(),
        fallback_model = backend.config().fallback_model.as_deref().unwrap_or("(none)"),
        "AI provider configured"
    );
    let provider: Arc<dyn AiProvider> = Arc::new(backend);

    let database = match &server_config.database_url {
        Some(url) => {
            let db = Database::connect_with_config(url, PoolConfig::from_env()).await?;
            db.migrate().await?;
            info!("Connected to database, migrations applied");
            Some(db)
        }
        None => {
            warn!("DATABASE_URL not set, interaction history is kept in memory only");
            None
        }
    };
    let repo: Arc<dyn InteractionRepository> = match &database {
        Some(db) => Arc::new(db.interactions.clone()),
        None => Arc::new(InMemoryInteractionRepository::new()),
    };

    let classifier = Arc::new(
        SubjectClassifier::new(provider.clone()).with_temperature(classify_temperature),
    );
    let (queue, receiver) = queue::channel(worker_config.queue_capacity);
    let orchestrator = Arc::new(
        InteractionOrchestrator::new(repo, queue)
            .with_default_handlers(provider.clone(), classifier),
    );
    let worker = InteractionWorker::new(orchestrator.clone(), receiver, worker_config).start();

    let rate_limiter = server_config.rate_limiter()?;
    if let Some(limiter) = rate_limiter.clone() {
        // Forget users whose buckets have refilled.
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(defaults::RATE_LIMIT_PRUNE_SECS));
            loop {
                interval.tick().await;
                limiter.retain_recent();
            }
        });
    }

    let state = AppState {
        orchestrator,
        provider,
        database,
        rate_limiter,
    };
    let app = router(state, &server_config);

    let addr: SocketAddr = format!("{}:{}", server_config.host, server_config.port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Draining interaction worker");
    worker.shutdown().await;

    Ok(())
}
