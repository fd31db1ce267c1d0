//! Gateway Core - saldo service binary
//!
//! Serves the saldo API on top of the cache store, the observability session
//! and the error templates.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use gateway_core::api::create_router;
use gateway_core::cache::{CacheBackend, MemoryBackend};
use gateway_core::observability::{init_tracing, TracingTracer};
use gateway_core::{spawn_cleanup_task, AppState, Config};

/// Main entry point for the saldo service.
///
/// # Startup Sequence
/// 1. Load configuration from environment variables
/// 2. Initialize the tracing subscriber
/// 3. Connect the cache backend (Redis when `REDIS_URL` is set, in-memory otherwise)
/// 4. Wire metrics, telemetry and the saldo service
/// 5. Start the HTTP server with graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_tracing(config.log_format);

    info!("Starting {} service", config.service_name);
    info!(
        "Configuration loaded: cache_ttl={}s, cache_timeout={}ms, port={}, redis={}",
        config.cache_ttl,
        config.cache_timeout_ms,
        config.server_port,
        config.redis_url.is_some()
    );

    let (backend, cleanup_handle) = connect_backend(&config)?;
    let state = AppState::from_config(&config, backend, Arc::new(TracingTracer))
        .context("failed to register operation metrics")?;
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Picks the cache backend. The in-memory backend gets an expiry sweep.
fn connect_backend(
    config: &Config,
) -> anyhow::Result<(Arc<dyn CacheBackend>, Option<JoinHandle<()>>)> {
    #[cfg(feature = "redis")]
    {
        if let Some(url) = &config.redis_url {
            let backend =
                gateway_core::cache::RedisBackend::connect_lazy(url, config.cache_timeout())
                    .context("invalid REDIS_URL")?;
            info!("Using Redis cache backend");
            let shared: Arc<dyn CacheBackend> = Arc::new(backend);
            return Ok((shared, None));
        }
    }

    #[cfg(not(feature = "redis"))]
    {
        if config.redis_url.is_some() {
            warn!("REDIS_URL is set but the redis feature is disabled; using in-memory cache");
        }
    }

    let backend = Arc::new(MemoryBackend::new(config.max_entries));
    let cleanup_handle = spawn_cleanup_task(backend.clone(), config.cleanup_interval);
    info!("Using in-memory cache backend");
    let shared: Arc<dyn CacheBackend> = backend;
    Ok((shared, Some(cleanup_handle)))
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the expiry sweep.
async fn shutdown_signal(cleanup_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = cleanup_handle {
        handle.abort();
        warn!("Cleanup task aborted");
    }
}
