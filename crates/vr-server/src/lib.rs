//! vr-server: HTTP front end, job coordinator, and retention sweeper.
//!
//! This crate ties vr-core and vr-av together into a running server:
//!
//! - Axum HTTP API (`/video`, `/subtitle`, `/health`, `/admin/tools`) with
//!   request IDs, CORS, and request tracing
//! - Static serving of job outputs from the public directory
//! - Background retention sweeper for expired outputs
//! - Graceful shutdown via signal handling

pub mod context;
pub mod coordinator;
pub mod error;
pub mod fetch;
pub mod middleware;
pub mod retention;
pub mod router;
pub mod routes;

use std::path::Path;

use tokio_util::sync::CancellationToken;

use vr_core::config::Config;

use crate::context::AppContext;

/// Start the vidrelay server.
///
/// Creates the storage directories, discovers external tools, builds the
/// [`AppContext`], spawns the retention sweeper, and serves HTTP until a
/// shutdown signal is received.
pub async fn start(config: Config) -> vr_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    for dir in [&config.storage.temp_dir, &config.storage.public_dir] {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            tracing::info!("Created directory {}", dir.display());
        }
    }

    let tools = vr_av::ToolRegistry::discover(&config.tools);
    log_tools(&tools);

    let ctx = AppContext::new(config, tools)?;
    let cancel = CancellationToken::new();

    let sweeper = if ctx.config.retention.enabled {
        let sweeper_ctx = ctx.clone();
        let sweeper_cancel = cancel.clone();
        Some(tokio::spawn(async move {
            retention::run_sweeper(sweeper_ctx, sweeper_cancel).await;
        }))
    } else {
        tracing::info!("Retention sweeper disabled");
        None
    };

    let host = ctx.config.server.host.clone();
    let port = ctx.config.server.port;
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .map_err(|e| vr_core::Error::Internal(format!("Failed to bind to {host}:{port}: {e}")))?;

    tracing::info!(
        "Listening on http://{}",
        listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| format!("{host}:{port}"))
    );

    let app = router::build_router(ctx);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await;

    // Stop background tasks whether the server exited cleanly or not.
    cancel.cancel();
    if let Some(handle) = sweeper {
        let _ = handle.await;
    }

    served.map_err(|e| vr_core::Error::Internal(format!("Server error: {e}")))?;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Serve `dir` over HTTP on all interfaces until Ctrl-C.
pub async fn serve_directory(port: u16, dir: &Path) -> vr_core::Result<()> {
    if !dir.is_dir() {
        return Err(vr_core::Error::not_found("directory", dir.display()));
    }

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| vr_core::Error::Internal(format!("Failed to bind to port {port}: {e}")))?;

    tracing::info!(
        "Serving {} at http://localhost:{port}/",
        dir.display()
    );

    axum::serve(listener, router::build_static_router(dir))
        .with_graceful_shutdown(shutdown_signal(CancellationToken::new()))
        .await
        .map_err(|e| vr_core::Error::Internal(format!("Server error: {e}")))?;

    tracing::info!("Static server stopped");
    Ok(())
}

fn log_tools(tools: &vr_av::ToolRegistry) {
    for info in tools.check_all() {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else if info.name == "ffmpeg" {
            tracing::warn!("Tool not found: ffmpeg; /video requests will fail");
        } else {
            tracing::debug!("Tool not found: {}", info.name);
        }
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM) or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
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
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
