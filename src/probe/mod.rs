//! Probe execution.
//!
//! One probe gathers HTTP reachability, TLS certificate state and DNS
//! records for a target. Every phase is failure-isolated: a refused
//! connection or an expired certificate is the signal being monitored, so
//! the probe always produces a `CheckResult` and never fails outright.

mod dns;
mod http;
mod tls;

use std::time::Duration;

use chrono::Utc;
use hickory_resolver::TokioAsyncResolver;
use url::Url;

use crate::store::CheckResult;

/// Executes complete health checks. Cheap to share: holds one HTTP client
/// and one resolver for all probes.
pub struct Prober {
    client: reqwest::Client,
    resolver: TokioAsyncResolver,
}

impl Prober {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: http::build_client(timeout)?,
            resolver: dns::build_resolver(),
        })
    }

    /// Run one complete check against `url`.
    ///
    /// The three phases run concurrently against the registered URL's host;
    /// the TLS phase only applies to https targets, and the DNS phase only
    /// when the URL has a hostname (an IP-literal target simply resolves to
    /// empty record sets). Wall clock is bounded by the slowest phase
    /// budget.
    pub async fn check(&self, url: &str) -> CheckResult {
        let parsed = Url::parse(url).ok();
        let host = parsed
            .as_ref()
            .and_then(|u| u.host_str())
            .map(str::to_string);
        let tls_target = parsed.as_ref().filter(|u| u.scheme() == "https").and_then(|u| {
            Some((host.clone()?, u.port_or_known_default().unwrap_or(443)))
        });

        let http_phase = http::run_http_phase(&self.client, url);
        let tls_phase = async {
            match &tls_target {
                Some((h, port)) => Some(tls::run_tls_phase(h, *port).await),
                None => None,
            }
        };
        let dns_phase = async {
            match &host {
                Some(h) => Some(dns::run_dns_phase(&self.resolver, h).await),
                None => None,
            }
        };

        let (http, ssl, dns) = tokio::join!(http_phase, tls_phase, dns_phase);

        CheckResult {
            status_code: http.status_code,
            status_text: http.status_text,
            response_time_ms: http.response_time_ms,
            final_url: http.final_url,
            redirect_chain: http.redirect_chain,
            ssl,
            dns,
            timestamp: Utc::now(),
        }
    }
}
