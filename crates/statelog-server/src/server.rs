use std::future::Future;
use std::sync::Arc;

use statelog_store::{ObjectStore, SqliteObjectStore};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// statelog HTTP server.
pub struct StatelogServer {
    config: ServerConfig,
    store: Arc<dyn ObjectStore>,
}

impl StatelogServer {
    /// Open the configured SQLite store, initializing its schema.
    ///
    /// Runs before the listener is bound, so no request is accepted until
    /// the schema exists.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let store = SqliteObjectStore::open(&config.store)?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Serve an existing store (useful for testing and embedding).
    pub fn with_store(config: ServerConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState::new(Arc::clone(&self.store)))
    }

    /// Start serving requests until the process is interrupted.
    pub async fn serve(self) -> ServerResult<()> {
        self.serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "cannot listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Start serving requests until `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            "statelog server listening on {} (store: {})",
            self.config.bind_addr,
            self.config.store.path.display()
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        tracing::info!("statelog server stopped");
        Ok(())
    }
}
