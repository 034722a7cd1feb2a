use super::Metrics;
use crate::error::{Error, Result};
use axum::{extract::State, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};

pub fn router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .route("/exit", get(exit_process))
        .with_state(metrics)
}

async fn render_metrics(State(metrics): State<Arc<Metrics>>) -> String {
    metrics.prometheus_format()
}

/// Administrative shutdown. Unauthenticated; only expose on trusted networks.
async fn exit_process() {
    warn!("Exit requested over HTTP, terminating");
    std::process::exit(0);
}

/// Serve `/metrics` and `/exit` on `port` from a dedicated thread with its own
/// single-threaded runtime, leaving the worker threads untouched.
pub fn spawn_metrics_server(metrics: Arc<Metrics>, port: u16) -> Result<thread::JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .map_err(|e| Error::Metrics(format!("failed to build runtime: {}", e)))?;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let handle = thread::Builder::new()
        .name("metrics".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                let listener = match tokio::net::TcpListener::bind(addr).await {
                    Ok(listener) => listener,
                    Err(e) => {
                        error!(%addr, error = %e, "Failed to bind metrics endpoint");
                        return;
                    }
                };
                info!(%addr, "Serving metrics");
                if let Err(e) = axum::serve(listener, router(metrics)).await {
                    error!(error = %e, "Metrics endpoint stopped");
                }
            });
        })?;
    Ok(handle)
}
