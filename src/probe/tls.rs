//! TLS certificate inspection phase.
//!
//! The handshake uses an accept-all verifier so the certificate of an
//! expired or mismatched endpoint can still be inspected and reported as
//! data; validity is judged here, from the parsed certificate, not by the
//! TLS stack.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::net::TcpStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::crypto::aws_lc_rs;
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{self, DigitallySignedStruct, SignatureScheme};
use tokio_rustls::TlsConnector;
use x509_parser::prelude::{FromDer, GeneralName, X509Certificate};

use crate::store::SslInfo;

const TLS_TIMEOUT: Duration = Duration::from_secs(5);

/// Inspect the certificate presented at `host:port`.
///
/// Any failure (connect, handshake, parse, timeout) yields
/// `SslInfo::invalid()`; the phase never aborts the surrounding check.
pub async fn run_tls_phase(host: &str, port: u16) -> SslInfo {
    match tokio::time::timeout(TLS_TIMEOUT, fetch_leaf_cert(host, port)).await {
        Ok(Some(der)) => inspect_certificate(&der, host, Utc::now()),
        _ => SslInfo::invalid(),
    }
}

async fn fetch_leaf_cert(host: &str, port: u16) -> Option<Vec<u8>> {
    let connector = TlsConnector::from(Arc::new(inspect_config()?));
    let server_name = ServerName::try_from(host.to_string()).ok()?;
    let tcp = TcpStream::connect((host, port)).await.ok()?;
    let stream = connector.connect(server_name, tcp).await.ok()?;
    let (_, conn) = stream.get_ref();
    conn.peer_certificates()?.first().map(|c| c.to_vec())
}

fn inspect_config() -> Option<rustls::ClientConfig> {
    let provider = aws_lc_rs::default_provider();
    let verifier = AcceptAnyServerCert {
        schemes: provider.signature_verification_algorithms.supported_schemes(),
    };
    let config = rustls::ClientConfig::builder_with_provider(Arc::new(provider))
        .with_safe_default_protocol_versions()
        .ok()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();
    Some(config)
}

fn inspect_certificate(der: &[u8], host: &str, now: DateTime<Utc>) -> SslInfo {
    let Ok((_, cert)) = X509Certificate::from_der(der) else {
        return SslInfo::invalid();
    };

    let not_before = Utc
        .timestamp_opt(cert.validity().not_before.timestamp(), 0)
        .single();
    let expires = Utc
        .timestamp_opt(cert.validity().not_after.timestamp(), 0)
        .single();
    let in_window = match (not_before, expires) {
        (Some(nb), Some(exp)) => nb <= now && now < exp,
        _ => false,
    };
    let hostname_matches = matches_hostname(&cert, host);

    SslInfo {
        valid: in_window && hostname_matches,
        issuer: Some(cert.issuer().to_string()),
        expires,
        days_remaining: expires.map(|exp| days_remaining(exp, now)),
        hostname_matches: Some(hostname_matches),
    }
}

/// Floor of the distance to expiry in days; negative once expired.
fn days_remaining(expires: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expires - now).num_seconds().div_euclid(86_400)
}

/// Match against SAN dNSName entries, falling back to the subject CN only
/// when the certificate carries no SAN extension.
fn matches_hostname(cert: &X509Certificate<'_>, host: &str) -> bool {
    if let Ok(Some(san)) = cert.subject_alternative_name() {
        return san.value.general_names.iter().any(|name| match name {
            GeneralName::DNSName(pattern) => dns_name_matches(pattern, host),
            _ => false,
        });
    }
    cert.subject()
        .iter_common_name()
        .filter_map(|cn| cn.as_str().ok())
        .any(|cn| dns_name_matches(cn, host))
}

/// DNS name comparison with single-label wildcard semantics.
fn dns_name_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let host = host.to_ascii_lowercase();
    let host = host.trim_end_matches('.');
    if let Some(suffix) = pattern.strip_prefix("*.") {
        return host
            .split_once('.')
            .is_some_and(|(label, rest)| !label.is_empty() && rest == suffix);
    }
    pattern == host
}

#[derive(Debug)]
struct AcceptAnyServerCert {
    schemes: Vec<SignatureScheme>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.schemes.clone()
    }
}
