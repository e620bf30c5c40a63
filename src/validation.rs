//! Input URL validation and normalization.

use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid url: {0}")]
pub struct InvalidUrl(String);

/// Normalize a caller-supplied URL for use as a registry key.
///
/// A missing scheme defaults to `http://`; only http and https targets are
/// accepted. The parser canonicalizes scheme/host case and the trailing
/// slash, so equal targets normalize to the same key.
pub fn normalize_url(input: &str) -> Result<String, InvalidUrl> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(InvalidUrl("empty".to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let parsed = Url::parse(&candidate).map_err(|e| InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(InvalidUrl(format!("unsupported scheme: {}", other))),
    }
    if parsed.host_str().is_none() {
        return Err(InvalidUrl("missing host".to_string()));
    }

    Ok(parsed.to_string())
}
