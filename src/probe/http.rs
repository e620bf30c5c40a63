//! HTTP probe phase.

use std::time::Instant;

use reqwest::header::LOCATION;
use reqwest::Client;

use crate::store::StatusText;

/// Redirect hop cap; a longer chain classifies as ERROR.
pub const MAX_REDIRECTS: usize = 10;

/// Outcome of the HTTP phase, merged into the final `CheckResult`.
#[derive(Debug, Clone)]
pub struct HttpPhase {
    pub status_code: Option<u16>,
    pub status_text: StatusText,
    pub response_time_ms: Option<u64>,
    pub final_url: Option<String>,
    pub redirect_chain: Vec<String>,
}

impl HttpPhase {
    /// A network-level failure: no status code, no timing, no chain.
    fn failed(status_text: StatusText) -> Self {
        Self {
            status_code: None,
            status_text,
            response_time_ms: None,
            final_url: None,
            redirect_chain: Vec::new(),
        }
    }
}

/// Issue a GET against `url`, following redirects manually so every hop
/// lands in the chain. Never fails: network errors are classified into
/// `status_text` and returned as data.
pub async fn run_http_phase(client: &Client, url: &str) -> HttpPhase {
    let start = Instant::now();
    let mut chain: Vec<String> = Vec::new();
    let mut current = url.to_string();

    loop {
        let response = match client.get(&current).send().await {
            Ok(r) => r,
            Err(e) => return HttpPhase::failed(classify_error(&e)),
        };

        chain.push(response.url().to_string());
        let status = response.status().as_u16();

        if (300..400).contains(&status) {
            let next = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|loc| response.url().join(loc).ok());
            if let Some(next) = next {
                if chain.len() > MAX_REDIRECTS {
                    return HttpPhase::failed(StatusText::Error);
                }
                current = next.to_string();
                continue;
            }
            // Terminal 3xx without a usable Location header.
        }

        // Read the full body so the elapsed time covers the whole transfer.
        if let Err(e) = response.bytes().await {
            return HttpPhase::failed(classify_error(&e));
        }

        let elapsed = start.elapsed().as_millis() as u64;
        return HttpPhase {
            status_code: Some(status),
            status_text: classify_status(status),
            response_time_ms: Some(elapsed),
            final_url: chain.last().cloned(),
            redirect_chain: chain,
        };
    }
}

/// Build the probe client. Redirects are disabled so the phase loop above
/// observes every hop itself.
pub fn build_client(timeout: std::time::Duration) -> reqwest::Result<Client> {
    Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout)
        .build()
}

fn classify_status(status: u16) -> StatusText {
    match status {
        200..=299 => StatusText::Up,
        300..=399 => StatusText::Redirect,
        400.. => StatusText::Down,
        _ => StatusText::Error,
    }
}

fn classify_error(e: &reqwest::Error) -> StatusText {
    if e.is_timeout() {
        return StatusText::Timeout;
    }
    let text = error_text(e).to_ascii_lowercase();
    if text.contains("ssl") || text.contains("tls") || text.contains("certificate") {
        return StatusText::SslError;
    }
    if e.is_connect() {
        return StatusText::Down;
    }
    StatusText::Error
}

/// Full error description including the source chain; reqwest buries the
/// interesting part (e.g. certificate failures) a few causes deep.
fn error_text(e: &reqwest::Error) -> String {
    let mut text = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(inner) = source {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    text
}
