//! UpWatch - Website Uptime Monitoring Engine
//!
//! Periodically probes registered URLs (HTTP, TLS, DNS), keeps a bounded
//! per-target history, and posts webhook alerts on UP/DOWN transitions.

mod alert;
mod config;
mod probe;
mod scheduler;
mod store;
mod validation;
mod web;

use alert::AlertDispatcher;
use config::Config;
use probe::Prober;
use scheduler::Scheduler;
use store::Store;
use web::Server;

use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("upwatch=info".parse()?))
        .init();

    // Load configuration
    let cfg = Config::load();
    tracing::info!("Starting UpWatch on port {}...", cfg.http_port);

    // Load persisted state, or start empty in-memory
    let store = Arc::new(match cfg.persist_path() {
        Some(path) => store::load_store(&path).await,
        None => {
            tracing::info!("Persistence disabled, running in-memory");
            Store::new()
        }
    });

    // Shared probe executor
    let prober = Arc::new(Prober::new(Duration::from_secs(cfg.probe_timeout_secs))?);

    // Alert dispatcher
    let alerts = Arc::new(AlertDispatcher::new(cfg.alert_webhook_url.clone())?);
    if alerts.enabled() {
        tracing::info!("Alert webhook configured");
    } else {
        tracing::info!("No alert webhook configured, alerting disabled");
    }

    // Start scheduler
    let scheduler = Arc::new(Scheduler::new(
        store.clone(),
        prober.clone(),
        alerts,
        &cfg,
    ));
    scheduler.start();

    // Start web server
    let server = Server::new(&cfg, store, prober);
    server.start().await?;

    Ok(())
}
