//! DNS record resolution phase.

use std::time::Duration;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::TokioAsyncResolver;

use crate::store::DnsRecords;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the shared resolver, preferring the system configuration and
/// falling back to the library defaults (Google public DNS) when none can
/// be read.
pub fn build_resolver() -> TokioAsyncResolver {
    TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
        tracing::warn!("System resolver config unavailable ({}), using defaults", e);
        TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
    })
}

/// Resolve A, AAAA, CNAME, MX and NS records for `host`.
///
/// Record types are queried independently; a type that fails (NXDOMAIN, no
/// records, timeout) contributes an empty list rather than failing the
/// phase.
pub async fn run_dns_phase(resolver: &TokioAsyncResolver, host: &str) -> DnsRecords {
    let (a, aaaa, cname, mx, ns) = tokio::join!(
        lookup_strings(resolver, host, RecordType::A),
        lookup_strings(resolver, host, RecordType::AAAA),
        lookup_strings(resolver, host, RecordType::CNAME),
        lookup_strings(resolver, host, RecordType::MX),
        lookup_strings(resolver, host, RecordType::NS),
    );
    DnsRecords { a, aaaa, cname, mx, ns }
}

async fn lookup_strings(
    resolver: &TokioAsyncResolver,
    host: &str,
    record_type: RecordType,
) -> Vec<String> {
    let lookup = tokio::time::timeout(LOOKUP_TIMEOUT, resolver.lookup(host, record_type)).await;
    match lookup {
        Ok(Ok(lookup)) => lookup
            .record_iter()
            // An A query may carry CNAME records in its answer section.
            .filter(|r| r.record_type() == record_type)
            .filter_map(|r| r.data().map(|data| data.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}
