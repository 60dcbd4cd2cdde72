//! # auditgate-discovery
//!
//! Concurrent, time-bounded discovery of a client's technology footprint.
//!
//! ## Probe families
//!
//! - **Domain footprint**: CNAME lookups of common subdomain labels plus an
//!   MX lookup, matched against known SaaS hosting domains.
//! - **API status**: one HTTP GET per tool with a known health-check
//!   endpoint.
//!
//! ## Guarantees
//!
//! - At most `max_concurrency` probes in flight per engine
//! - Every probe bounded by `probe_timeout`; a timeout is recorded, never
//!   fatal to the batch
//! - Repeated probes within the cache TTL are served from memory
//!
//! The engine only produces [`ToolPatch`](auditgate_core::ToolPatch) values.
//! Merging them into a session is the caller's job.

pub mod api;
pub mod cache;
pub mod dns;
pub mod engine;
pub mod error;
pub mod registry;

pub use api::{ApiObservation, probe_endpoint};
pub use cache::{CacheKey, ProbeCache, ProbeKind};
pub use dns::{DnsResolver, HickoryResolver, LookupFailure};
pub use engine::{
    DEFAULT_CACHE_TTL, DEFAULT_MAX_CONCURRENCY, DEFAULT_PROBE_TIMEOUT, DiscoveryConfig,
    DiscoveryEngine, DiscoveryReport, DiscoveryStats, normalize_domain,
};
pub use error::DiscoveryError;
pub use registry::{DEFAULT_DNS_LABELS, MxPattern, ProbeRegistry, ServiceSpec};
