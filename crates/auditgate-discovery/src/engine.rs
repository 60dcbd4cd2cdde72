//! # Discovery Engine
//!
//! Runs probe batches with bounded parallelism and per-call timeouts.
//!
//! Every probe takes a permit from one shared semaphore, so at most
//! `max_concurrency` calls are in flight per engine. Each call carries its
//! own timeout; a slow target costs the batch at most that timeout. Results
//! are collected with a `JoinSet` and only returned once every task is done.
//!
//! Only answers are cached. Timeouts, resolver failures and API transport
//! errors are reported for the run and retried on the next one.

use crate::api::{ApiObservation, probe_endpoint};
use crate::cache::{CacheKey, ProbeCache, ProbeKind};
use crate::dns::{DnsResolver, HickoryResolver, LookupFailure};
use crate::error::DiscoveryError;
use crate::registry::ProbeRegistry;
use auditgate_core::primitives::{AUTO_DETECTED_USERS, UNKNOWN_CRITICALITY, UNKNOWN_VERSION};
use auditgate_core::{ApiStatus, DiscoveryMethod, ToolPatch, normalize_tool_name};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Default number of probes in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;
/// Default per-probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Default freshness window for cached probe results.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// =============================================================================
// CONFIG AND REPORT
// =============================================================================

/// Engine limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub max_concurrency: usize,
    pub probe_timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// Counters describing one discovery run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryStats {
    pub dns_queries: usize,
    pub aliases_matched: usize,
    pub mx_matched: usize,
    pub dns_timeouts: usize,
    /// Lookups the resolver could not answer (SERVFAIL, refused, ...).
    pub dns_failures: usize,
    pub api_probed: usize,
    pub api_active: usize,
    pub api_unreachable: usize,
    pub api_errors: usize,
    pub elapsed_ms: u64,
}

impl DiscoveryStats {
    fn add(&mut self, other: &DiscoveryStats) {
        self.dns_queries += other.dns_queries;
        self.aliases_matched += other.aliases_matched;
        self.mx_matched += other.mx_matched;
        self.dns_timeouts += other.dns_timeouts;
        self.dns_failures += other.dns_failures;
        self.api_probed += other.api_probed;
        self.api_active += other.api_active;
        self.api_unreachable += other.api_unreachable;
        self.api_errors += other.api_errors;
    }

    fn count_api(&mut self, status: ApiStatus) {
        self.api_probed += 1;
        match status {
            ApiStatus::Active => self.api_active += 1,
            ApiStatus::Unreachable => self.api_unreachable += 1,
            ApiStatus::Error => self.api_errors += 1,
        }
    }
}

/// Tool name -> patch, plus run counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub patches: BTreeMap<String, ToolPatch>,
    pub stats: DiscoveryStats,
}

/// Outcome of one DNS task.
enum DnsAnswer {
    Records(Vec<String>),
    Failed(LookupFailure),
    TimedOut,
}

/// Patch for a tool found in the domain footprint.
///
/// Placeholders stand in for the fields DNS cannot tell; they only fill
/// empty fields, so inventory data always wins.
fn footprint_patch(method: DiscoveryMethod) -> ToolPatch {
    ToolPatch::discovered_by(method)
        .with_version(UNKNOWN_VERSION)
        .with_users([AUTO_DETECTED_USERS])
        .with_criticality(UNKNOWN_CRITICALITY)
}

impl DiscoveryReport {
    /// Add a patch, folding it into an existing entry for the same tool.
    ///
    /// Tools are matched by normalized name; the first spelling is kept.
    pub fn insert(&mut self, name: impl Into<String>, patch: ToolPatch) {
        let name = name.into();
        let key = normalize_tool_name(&name);
        match self
            .patches
            .iter_mut()
            .find(|(existing, _)| normalize_tool_name(existing) == key)
        {
            Some((_, existing)) => existing.absorb(patch),
            None => {
                self.patches.insert(name, patch);
            }
        }
    }

    /// Fold another report into this one. Patches already here take
    /// precedence for descriptive fields.
    pub fn absorb(&mut self, other: DiscoveryReport) {
        self.stats.add(&other.stats);
        for (name, patch) in other.patches {
            self.insert(name, patch);
        }
    }
}

// =============================================================================
// DISCOVERY ENGINE
// =============================================================================

/// Concurrent, time-bounded DNS and API probing.
pub struct DiscoveryEngine {
    config: DiscoveryConfig,
    registry: Arc<ProbeRegistry>,
    resolver: Arc<dyn DnsResolver>,
    http: reqwest::Client,
    permits: Arc<Semaphore>,
    dns_cache: Arc<ProbeCache<Vec<String>>>,
    api_cache: Arc<ProbeCache<ApiObservation>>,
}

impl std::fmt::Debug for DiscoveryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryEngine")
            .field("config", &self.config)
            .field("cached_results", &self.cached_results())
            .finish_non_exhaustive()
    }
}

impl DiscoveryEngine {
    /// Create an engine using the system-independent hickory resolver.
    pub fn new(config: DiscoveryConfig, registry: ProbeRegistry) -> Result<Self, DiscoveryError> {
        let resolver = Arc::new(HickoryResolver::new(config.probe_timeout));
        Self::with_resolver(config, registry, resolver)
    }

    /// Create an engine with a custom DNS resolver.
    pub fn with_resolver(
        config: DiscoveryConfig,
        registry: ProbeRegistry,
        resolver: Arc<dyn DnsResolver>,
    ) -> Result<Self, DiscoveryError> {
        registry.validate()?;
        let config = DiscoveryConfig {
            max_concurrency: config.max_concurrency.max(1),
            ..config
        };
        let http = reqwest::Client::builder()
            .timeout(config.probe_timeout)
            .user_agent(concat!("auditgate/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            config,
            registry: Arc::new(registry),
            resolver,
            http,
            permits: Arc::new(Semaphore::new(config.max_concurrency)),
            dns_cache: Arc::new(ProbeCache::new(config.cache_ttl)),
            api_cache: Arc::new(ProbeCache::new(config.cache_ttl)),
        })
    }

    #[must_use]
    pub fn config(&self) -> DiscoveryConfig {
        self.config
    }

    #[must_use]
    pub fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    /// Drop expired entries from both probe caches.
    ///
    /// Runs at the start of every [`Self::enrich`].
    pub fn purge_expired(&self) {
        self.dns_cache.purge_expired();
        self.api_cache.purge_expired();
    }

    /// Number of DNS and API results held in the caches.
    #[must_use]
    pub fn cached_results(&self) -> usize {
        self.dns_cache.len() + self.api_cache.len()
    }

    // =========================================================================
    // DOMAIN FOOTPRINT
    // =========================================================================

    /// Find SaaS services behind the domain's CNAME and MX records.
    ///
    /// Unresolvable or unmatched labels contribute nothing; only a malformed
    /// domain is an error.
    pub async fn discover_domain_footprint(
        &self,
        domain: &str,
    ) -> Result<DiscoveryReport, DiscoveryError> {
        let domain = normalize_domain(domain)?;
        let started = Instant::now();
        let mut report = self.footprint(&domain).await;
        report.stats.elapsed_ms = elapsed_ms(started);
        Ok(report)
    }

    async fn footprint(&self, domain: &str) -> DiscoveryReport {
        let labels = &self.registry.dns_labels;
        let mut set = JoinSet::new();

        for (index, label) in labels.iter().enumerate() {
            let fqdn = format!("{label}.{domain}");
            set.spawn(self.dns_task(index, ProbeKind::DnsAlias, fqdn));
        }
        set.spawn(self.dns_task(labels.len(), ProbeKind::DnsMx, domain.to_string()));

        let mut answers: Vec<(usize, ProbeKind, String, DnsAnswer)> =
            Vec::with_capacity(labels.len() + 1);
        while let Some(res) = set.join_next().await {
            match res {
                Ok(answer) => answers.push(answer),
                Err(e) => tracing::warn!(%e, "dns probe task failed"),
            }
        }
        answers.sort_by_key(|(index, ..)| *index);

        let mut report = DiscoveryReport::default();
        for (_, kind, name, answer) in answers {
            report.stats.dns_queries += 1;
            let records = match answer {
                DnsAnswer::Records(records) => records,
                DnsAnswer::Failed(e) => {
                    tracing::warn!(host = %name, probe = ?kind, %e, "dns lookup failed");
                    report.stats.dns_failures += 1;
                    continue;
                }
                DnsAnswer::TimedOut => {
                    report.stats.dns_timeouts += 1;
                    continue;
                }
            };
            for record in records {
                match kind {
                    ProbeKind::DnsAlias => {
                        if let Some((spec, pattern)) = self.registry.match_alias(&record) {
                            report.stats.aliases_matched += 1;
                            tracing::debug!(host = %name, alias = %record, tool = %spec.display_name, "alias matched");
                            report.insert(
                                spec.display_name.clone(),
                                footprint_patch(DiscoveryMethod::DnsAlias)
                                    .with_category(spec.category.clone())
                                    .with_provider(pattern)
                                    .with_evidence(format!("{name} -> {record}")),
                            );
                        }
                    }
                    ProbeKind::DnsMx => {
                        if let Some(pattern) = self.registry.match_mx(&record) {
                            report.stats.mx_matched += 1;
                            report.insert(
                                pattern.display_name.clone(),
                                footprint_patch(DiscoveryMethod::MxRecord)
                                    .with_category(pattern.category.clone())
                                    .with_provider(pattern.provider.clone())
                                    .with_evidence(format!("{name} MX {record}")),
                            );
                        }
                    }
                    ProbeKind::Api => {}
                }
            }
        }

        tracing::info!(
            domain,
            tools = report.patches.len(),
            queries = report.stats.dns_queries,
            timeouts = report.stats.dns_timeouts,
            failures = report.stats.dns_failures,
            "domain footprint complete"
        );
        report
    }

    /// One permit-bounded, timed, cached DNS lookup.
    fn dns_task(
        &self,
        index: usize,
        kind: ProbeKind,
        name: String,
    ) -> impl std::future::Future<Output = (usize, ProbeKind, String, DnsAnswer)> + Send + 'static
    {
        let sem = Arc::clone(&self.permits);
        let cache = Arc::clone(&self.dns_cache);
        let resolver = Arc::clone(&self.resolver);
        let timeout = self.config.probe_timeout;

        async move {
            let Ok(_permit) = sem.acquire().await else {
                return (index, kind, name, DnsAnswer::Records(Vec::new()));
            };
            let started = Instant::now();
            let lookup_name = name.clone();
            let lookup = cache.get_or_probe(CacheKey::new(kind, name.clone()), move || async move {
                match kind {
                    ProbeKind::DnsMx => resolver.mx(&lookup_name).await,
                    _ => resolver.cname(&lookup_name).await,
                }
            });
            let answer = match tokio::time::timeout(timeout, lookup).await {
                Ok(Ok(records)) => DnsAnswer::Records(records),
                Ok(Err(e)) => DnsAnswer::Failed(e),
                Err(_) => {
                    tracing::warn!(host = %name, probe = ?kind, elapsed_ms = elapsed_ms(started), "dns probe timed out");
                    DnsAnswer::TimedOut
                }
            };
            (index, kind, name, answer)
        }
    }

    // =========================================================================
    // API STATUS
    // =========================================================================

    /// Health-check every tool with a known endpoint.
    ///
    /// Tools without an endpoint are skipped. Spellings of the same tool are
    /// probed once, under the first spelling.
    pub async fn check_api_endpoints(&self, tool_names: &[String]) -> DiscoveryReport {
        let started = Instant::now();
        let mut seen = BTreeSet::new();
        let mut set = JoinSet::new();

        for name in tool_names {
            if !seen.insert(normalize_tool_name(name)) {
                continue;
            }
            let Some(endpoint) = self.registry.api_endpoint_for(name) else {
                continue;
            };
            let sem = Arc::clone(&self.permits);
            let cache = Arc::clone(&self.api_cache);
            let client = self.http.clone();
            let endpoint = endpoint.to_string();
            let timeout = self.config.probe_timeout;
            let name = name.clone();

            set.spawn(async move {
                let Ok(_permit) = sem.acquire().await else {
                    return None;
                };
                let key = CacheKey::new(ProbeKind::Api, endpoint.clone());
                let outcome = cache
                    .get_or_probe(key, move || async move {
                        let observation = probe_endpoint(&client, &endpoint, timeout).await;
                        // Transport errors are not an answer from the endpoint.
                        if observation.status == ApiStatus::Error {
                            Err(observation)
                        } else {
                            Ok(observation)
                        }
                    })
                    .await;
                let (Ok(observation) | Err(observation)) = outcome;
                Some((name, observation))
            });
        }

        let mut report = DiscoveryReport::default();
        while let Some(res) = set.join_next().await {
            match res {
                Ok(Some((name, observation))) => {
                    if observation.status != ApiStatus::Active {
                        tracing::debug!(
                            tool = %name,
                            endpoint = %observation.endpoint,
                            diagnostic = observation.diagnostic.as_deref().unwrap_or(""),
                            "api probe not active"
                        );
                    }
                    report.stats.count_api(observation.status);
                    report.insert(name, observation.to_patch());
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(%e, "api probe task failed"),
            }
        }
        report.stats.elapsed_ms = elapsed_ms(started);
        tracing::info!(
            probed = report.stats.api_probed,
            active = report.stats.api_active,
            elapsed_ms = report.stats.elapsed_ms,
            "api checks complete"
        );
        report
    }

    // =========================================================================
    // ENRICHMENT
    // =========================================================================

    /// Run the domain footprint and API checks concurrently and combine them.
    ///
    /// Tools first found by the footprint probe get an API check afterwards
    /// when an endpoint is known for them.
    pub async fn enrich(
        &self,
        tool_names: &[String],
        domain: Option<&str>,
    ) -> Result<DiscoveryReport, DiscoveryError> {
        let domain = domain.map(normalize_domain).transpose()?;
        let started = Instant::now();
        self.purge_expired();

        let footprint = async {
            match &domain {
                Some(domain) => self.footprint(domain).await,
                None => DiscoveryReport::default(),
            }
        };
        let (mut report, api) = tokio::join!(footprint, self.check_api_endpoints(tool_names));
        report.absorb(api);

        let known: BTreeSet<String> = tool_names.iter().map(|n| normalize_tool_name(n)).collect();
        let discovered: Vec<String> = report
            .patches
            .keys()
            .filter(|name| !known.contains(&normalize_tool_name(name)))
            .cloned()
            .collect();
        if !discovered.is_empty() {
            let follow_up = self.check_api_endpoints(&discovered).await;
            report.absorb(follow_up);
        }

        report.stats.elapsed_ms = elapsed_ms(started);
        Ok(report)
    }
}

/// Validate and normalize a client domain.
pub fn normalize_domain(domain: &str) -> Result<String, DiscoveryError> {
    let normalized = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    let valid = !normalized.is_empty()
        && normalized.len() <= 253
        && normalized.contains('.')
        && normalized.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
    if valid {
        Ok(normalized)
    } else {
        Err(DiscoveryError::InvalidDomain(domain.to_string()))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_validation() {
        assert_eq!(normalize_domain(" Acme.COM. ").expect("valid"), "acme.com");
        assert!(normalize_domain("localhost").is_err());
        assert!(normalize_domain("acme..com").is_err());
        assert!(normalize_domain("-acme.com").is_err());
        assert!(normalize_domain("acme.com/evil").is_err());
        assert!(normalize_domain("").is_err());
    }

    #[test]
    fn footprint_patch_fills_required_placeholders() {
        let patch = footprint_patch(DiscoveryMethod::MxRecord);
        assert_eq!(patch.version.as_deref(), Some("unknown"));
        assert_eq!(patch.criticality.as_deref(), Some("Unknown"));
        assert!(
            patch
                .users
                .as_ref()
                .is_some_and(|users| users.contains("auto-detected"))
        );
    }

    #[test]
    fn report_insert_folds_spellings() {
        let mut report = DiscoveryReport::default();
        report.insert(
            "Zoom",
            ToolPatch::discovered_by(DiscoveryMethod::DnsAlias).with_category("Video Conferencing"),
        );
        report.insert(
            "zoom",
            ToolPatch::discovered_by(DiscoveryMethod::ApiProbe).with_category("Other"),
        );
        assert_eq!(report.patches.len(), 1);
        let patch = &report.patches["Zoom"];
        assert_eq!(patch.discovery_method, Some(DiscoveryMethod::DnsAlias));
        assert_eq!(patch.category.as_deref(), Some("Video Conferencing"));
    }

    #[test]
    fn stats_count_api_outcomes() {
        let mut stats = DiscoveryStats::default();
        stats.count_api(ApiStatus::Active);
        stats.count_api(ApiStatus::Error);
        stats.count_api(ApiStatus::Unreachable);
        assert_eq!(
            (stats.api_probed, stats.api_active, stats.api_errors, stats.api_unreachable),
            (3, 1, 1, 1)
        );
    }
}
