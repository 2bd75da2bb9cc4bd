use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::context::ServiceContext;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;

/// Icon repository HTTP server.
pub struct IconServer {
    bind_addr: SocketAddr,
    ctx: ServiceContext,
}

impl IconServer {
    pub fn new(bind_addr: SocketAddr, ctx: ServiceContext) -> Self {
        Self { bind_addr, ctx }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.ctx.clone())
    }

    /// Serve until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        let local = listener.local_addr()?;
        tracing::info!("icon repository listening on http://{local}");
        axum::serve(listener, build_router(self.ctx))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
