//! Web server module.

mod handlers;

pub use handlers::*;

use crate::config::Config;
use crate::probe::Prober;
use crate::store::Store;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub prober: Arc<Prober>,
    pub persist_path: Option<String>,
}

/// Query and registration API for the monitoring engine.
pub struct Server {
    port: u16,
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(config: &Config, store: Arc<Store>, prober: Arc<Prober>) -> Self {
        Self {
            port: config.http_port,
            state: AppState {
                store,
                prober,
                persist_path: config.persist_path(),
            },
        }
    }

    /// Build the router with all routes.
    pub fn routes(state: AppState) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/check", get(handlers::handle_check))
            .route("/monitor/list", get(handlers::handle_list))
            .route("/monitor/add", post(handlers::handle_add))
            .route("/monitor/remove", delete(handlers::handle_remove))
            .route("/monitor/history", get(handlers::handle_history))
            .route("/health", get(handlers::handle_health))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let router = Self::routes(self.state.clone());

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
