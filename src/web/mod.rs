//! HTTP boundary
//!
//! Thin axum handlers over [`LogoResolutionService`]: they parse the request,
//! call the service, and translate the outcome into status codes and headers.
//!
//! - `GET /health`
//! - `GET /logo/{domain}` and `GET /logo?name=...`
//! - `DELETE /logo/{domain}`

use anyhow::Result;
use axum::{
    Router,
    routing::get,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::WebConfig;
use crate::services::LogoResolutionService;

pub mod handlers;
pub mod responses;

pub use responses::{ErrorResponse, handle_error};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LogoResolutionService>,
}

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/logo", get(handlers::get_logo_by_name))
        .route(
            "/logo/{domain}",
            get(handlers::get_logo_by_domain).delete(handlers::delete_logo),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: &WebConfig, service: Arc<LogoResolutionService>) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
        Ok(Self {
            app: create_router(AppState { service }),
            addr,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until Ctrl-C
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        info!("Listening on http://{}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
