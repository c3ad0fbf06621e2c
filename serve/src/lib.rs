//! HTTP + SSE server for the chat backend (axum).
//!
//! **Public API**: [`run_serve`], [`run_serve_on_listener`].

mod api_error;
mod app;
mod conversation_lock;
mod routes;
mod sse;
mod state;
mod user;

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use chatcore::SqliteStore;
use config::AppConfig;

pub use state::AppState;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Runs the server on an existing listener until `shutdown` resolves. Used by
/// tests (bind to `127.0.0.1:0`, then pass the listener and a signal future).
pub async fn run_serve_on_listener(
    listener: TcpListener,
    config: AppConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = listener.local_addr()?;
    info!(%addr, "chat backend listening");

    let store = Arc::new(SqliteStore::new(&config.db_path)?);
    let state = Arc::new(AppState::new(&config, store));
    let router = app::router(state, &config);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("chat backend shut down");
    Ok(())
}

/// Runs the server, listening on `config.listen_addr` (`":8080"` binds all
/// interfaces by convention, matching how the variable is documented).
pub async fn run_serve(
    config: AppConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = normalize_addr(&config.listen_addr);
    let listener = TcpListener::bind(&addr).await?;
    run_serve_on_listener(listener, config, shutdown).await
}

fn normalize_addr(addr: &str) -> String {
    if let Some(port) = addr.strip_prefix(':') {
        format!("0.0.0.0:{port}")
    } else if addr.is_empty() {
        DEFAULT_ADDR.to_string()
    } else {
        addr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_addr_fills_in_a_bare_port() {
        assert_eq!(normalize_addr(":9090"), "0.0.0.0:9090");
        assert_eq!(normalize_addr("127.0.0.1:9090"), "127.0.0.1:9090");
        assert_eq!(normalize_addr(""), DEFAULT_ADDR);
    }
}
