//! # DNS Resolution
//!
//! The resolver seam used by the domain-footprint probe.
//!
//! An authoritative "no such record" answer (NXDOMAIN or an empty NOERROR
//! response) is an empty list. Anything else that stops a lookup from
//! answering, such as SERVFAIL, a refused query or a resolver timeout, is a
//! [`LookupFailure`] and is never cached.

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::{RData, RecordType};
use std::time::Duration;

/// A lookup that produced no authoritative answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct LookupFailure(pub String);

/// Looks up the DNS records the footprint probe needs.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// Alias targets of `name`, lowercased without the trailing dot.
    async fn cname(&self, name: &str) -> Result<Vec<String>, LookupFailure>;

    /// Mail exchanges of `domain`, lowercased without the trailing dot.
    async fn mx(&self, domain: &str) -> Result<Vec<String>, LookupFailure>;
}

/// Strip the root dot and lowercase a host name.
fn host(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// Split resolver errors into "no record" and real failures.
fn no_record(e: &ResolveError) -> bool {
    match e.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => {
            matches!(*response_code, ResponseCode::NXDomain | ResponseCode::NoError)
        }
        _ => false,
    }
}

/// Resolver backed by hickory with the default upstream configuration.
pub struct HickoryResolver {
    inner: TokioAsyncResolver,
}

impl std::fmt::Debug for HickoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryResolver").finish_non_exhaustive()
    }
}

impl HickoryResolver {
    /// Create a resolver whose single attempt per query is bounded by `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        Self {
            inner: TokioAsyncResolver::tokio(ResolverConfig::default(), opts),
        }
    }
}

#[async_trait]
impl DnsResolver for HickoryResolver {
    async fn cname(&self, name: &str) -> Result<Vec<String>, LookupFailure> {
        match self.inner.lookup(name, RecordType::CNAME).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .filter_map(|rdata| match rdata {
                    RData::CNAME(alias) => Some(host(&alias.0.to_utf8())),
                    _ => None,
                })
                .collect()),
            Err(e) if no_record(&e) => {
                tracing::debug!(name, %e, "no CNAME record");
                Ok(Vec::new())
            }
            Err(e) => Err(LookupFailure(format!("CNAME {name}: {e}"))),
        }
    }

    async fn mx(&self, domain: &str) -> Result<Vec<String>, LookupFailure> {
        match self.inner.mx_lookup(domain).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .map(|mx| host(&mx.exchange().to_utf8()))
                .collect()),
            Err(e) if no_record(&e) => {
                tracing::debug!(domain, %e, "no MX record");
                Ok(Vec::new())
            }
            Err(e) => Err(LookupFailure(format!("MX {domain}: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_normalization() {
        assert_eq!(host("ASPMX.L.Google.COM."), "aspmx.l.google.com");
        assert_eq!(host("acme.zoom.us"), "acme.zoom.us");
    }

    #[test]
    fn transport_errors_are_failures() {
        assert!(!no_record(&ResolveError::from("connection refused")));
    }
}
