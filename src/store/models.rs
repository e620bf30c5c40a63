//! Core model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classified outcome of a probe.
///
/// Serialized spellings are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusText {
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    Down,
    #[serde(rename = "REDIRECT")]
    Redirect,
    #[serde(rename = "TIMEOUT")]
    Timeout,
    #[serde(rename = "SSL ERROR")]
    SslError,
    #[serde(rename = "ERROR")]
    Error,
}

impl std::fmt::Display for StatusText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StatusText::Up => "UP",
            StatusText::Down => "DOWN",
            StatusText::Redirect => "REDIRECT",
            StatusText::Timeout => "TIMEOUT",
            StatusText::SslError => "SSL ERROR",
            StatusText::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// TLS certificate details for an https target.
///
/// A failed handshake is reported as `valid: false` with every other field
/// absent, never as a partially stale record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SslInfo {
    pub valid: bool,
    pub issuer: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    /// Days until expiry, negative once the certificate has expired.
    pub days_remaining: Option<i64>,
    pub hostname_matches: Option<bool>,
}

impl SslInfo {
    /// The record for a handshake that could not be completed.
    pub fn invalid() -> Self {
        Self {
            valid: false,
            issuer: None,
            expires: None,
            days_remaining: None,
            hostname_matches: None,
        }
    }
}

/// Resolved DNS records, one ordered list per record type.
///
/// A record type that fails to resolve (NXDOMAIN, no records) is an empty
/// list, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsRecords {
    #[serde(rename = "A", default)]
    pub a: Vec<String>,
    #[serde(rename = "AAAA", default)]
    pub aaaa: Vec<String>,
    #[serde(rename = "CNAME", default)]
    pub cname: Vec<String>,
    #[serde(rename = "MX", default)]
    pub mx: Vec<String>,
    #[serde(rename = "NS", default)]
    pub ns: Vec<String>,
}

/// Immutable record of one complete probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub status_code: Option<u16>,
    pub status_text: StatusText,
    pub response_time_ms: Option<u64>,
    pub final_url: Option<String>,
    /// Every URL requested, in order; `final_url` is its last element when
    /// non-empty.
    #[serde(default)]
    pub redirect_chain: Vec<String>,
    pub ssl: Option<SslInfo>,
    pub dns: Option<DnsRecords>,
    pub timestamp: DateTime<Utc>,
}

/// One row of the monitored-target listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredUrl {
    pub url: String,
    pub last_status: Option<StatusText>,
    pub last_response_time: Option<u64>,
    pub uptime_percentage: Option<f64>,
}

/// Response body for the history endpoint, chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub url: String,
    pub checks: Vec<CheckResult>,
}
