//! Configuration module.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP port for the web server (default: 8080)
    pub http_port: u16,
    /// Path of the JSON snapshot file; empty disables persistence
    /// (default: "monitoring_data.json")
    pub data_path: String,
    /// Seconds between scheduling cycles (default: 60)
    pub check_interval_secs: u64,
    /// Upper bound on probes in flight within one cycle (default: 16)
    pub max_concurrent_probes: usize,
    /// Overall per-check HTTP budget in seconds (default: 10)
    pub probe_timeout_secs: u64,
    /// Alert webhook destination; unset disables alerting
    pub alert_webhook_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8080,
            data_path: "monitoring_data.json".to_string(),
            check_interval_secs: 60,
            max_concurrent_probes: 16,
            probe_timeout_secs: 10,
            alert_webhook_url: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `UPWATCH_HTTP_PORT`: HTTP port (default: 8080)
    /// - `UPWATCH_DATA_PATH`: snapshot file path, empty to disable
    /// - `UPWATCH_CHECK_INTERVAL_SECS`: scheduling interval
    /// - `UPWATCH_MAX_CONCURRENT_PROBES`: probe pool size
    /// - `UPWATCH_PROBE_TIMEOUT_SECS`: per-check HTTP budget
    /// - `ALERT_WEBHOOK_URL`: transition webhook, unset to disable
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(port_str) = env::var("UPWATCH_HTTP_PORT") {
            if let Ok(port) = port_str.parse() {
                cfg.http_port = port;
            }
        }

        if let Ok(path) = env::var("UPWATCH_DATA_PATH") {
            cfg.data_path = path;
        }

        if let Ok(interval_str) = env::var("UPWATCH_CHECK_INTERVAL_SECS") {
            if let Ok(interval) = interval_str.parse() {
                cfg.check_interval_secs = interval;
            }
        }

        if let Ok(max_str) = env::var("UPWATCH_MAX_CONCURRENT_PROBES") {
            if let Ok(max) = max_str.parse() {
                cfg.max_concurrent_probes = max;
            }
        }

        if let Ok(timeout_str) = env::var("UPWATCH_PROBE_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout_str.parse() {
                cfg.probe_timeout_secs = timeout;
            }
        }

        if let Ok(webhook) = env::var("ALERT_WEBHOOK_URL") {
            if !webhook.is_empty() {
                cfg.alert_webhook_url = Some(webhook);
            }
        }

        cfg
    }

    /// Snapshot path, or None when persistence is disabled.
    pub fn persist_path(&self) -> Option<String> {
        if self.data_path.is_empty() {
            None
        } else {
            Some(self.data_path.clone())
        }
    }
}
