/*!
Fan-out over every source for every target, merged into one deduplicated result
*/

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use subwatch_sources::{ClientSettings, DEFAULT_TIMEOUT, SourceProvider, build_providers};
use tracing::{debug, info, warn};

use super::BoxError;
use super::config::SourcesConfig;
use super::normalizer::{Candidate, Normalizer};
use super::subdomain::{SubdomainSet, TargetDomain};

/// A source that failed for one domain. The run carries on without its names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub domain: String,
    pub error: String,
}

/// Everything one aggregation produced
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    pub subdomains: SubdomainSet,
    pub wildcards: SubdomainSet,
    pub failures: Vec<SourceFailure>,
    /// Accepted names per source, summed over domains
    pub source_counts: BTreeMap<String, usize>,
}

impl RunResult {
    fn merge(&mut self, other: RunResult) {
        self.subdomains.merge(other.subdomains);
        self.wildcards.merge(other.wildcards);
        self.failures.extend(other.failures);
        for (source, count) in other.source_counts {
            *self.source_counts.entry(source).or_default() += count;
        }
    }
}

/// Runs every provider against every target domain
pub struct Aggregator {
    providers: Vec<Arc<dyn SourceProvider>>,
    normalizer: Normalizer,
    max_concurrency: usize,
    fetch_timeout: Duration,
    restrict_to_scope: bool,
}

impl Aggregator {
    pub fn new(providers: Vec<Arc<dyn SourceProvider>>, normalizer: Normalizer) -> Self {
        info!("Initialized aggregator with {} sources", providers.len());
        Self {
            providers,
            normalizer,
            max_concurrency: 8,
            fetch_timeout: DEFAULT_TIMEOUT,
            restrict_to_scope: true,
        }
    }

    pub fn from_config(config: &SourcesConfig) -> Result<Self, BoxError> {
        let settings = ClientSettings {
            timeout: config.timeout_secs.map(Duration::from_secs),
        };
        let providers = build_providers(&config.enabled, &settings)?;
        // Outer deadline; the per-source client timeouts normally fire first
        let fetch_timeout = config
            .enabled
            .iter()
            .map(|&kind| settings.timeout_for(kind))
            .max()
            .unwrap_or(DEFAULT_TIMEOUT);

        Ok(Self::new(providers, Normalizer::default())
            .with_max_concurrency(config.max_concurrency)
            .with_fetch_timeout(fetch_timeout)
            .with_scope_restriction(config.restrict_to_scope))
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn with_scope_restriction(mut self, restrict_to_scope: bool) -> Self {
        self.restrict_to_scope = restrict_to_scope;
        self
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Query all `(domain, source)` pairs with bounded concurrency. Each request produces its
    /// own partial result and a single fold merges them, so completion order never matters.
    pub async fn run(&self, domains: &[TargetDomain]) -> RunResult {
        let jobs: Vec<(TargetDomain, Arc<dyn SourceProvider>)> = domains
            .iter()
            .flat_map(|domain| {
                self.providers
                    .iter()
                    .map(move |provider| (domain.clone(), Arc::clone(provider)))
            })
            .collect();

        // Boxed so the fan-out stays Send inside the scheduler's job future
        let result = stream::iter(jobs)
            .map(|(domain, provider)| {
                async move { self.fetch_one(&domain, provider.as_ref()).await }.boxed()
            })
            .buffer_unordered(self.max_concurrency)
            .fold(RunResult::default(), |mut acc, partial| async move {
                acc.merge(partial);
                acc
            })
            .boxed()
            .await;

        info!(
            "📊 Aggregated {} subdomains and {} wildcards from {} domains ({} source failures)",
            result.subdomains.len(),
            result.wildcards.len(),
            domains.len(),
            result.failures.len()
        );
        result
    }

    async fn fetch_one(&self, domain: &TargetDomain, provider: &dyn SourceProvider) -> RunResult {
        let mut partial = RunResult::default();
        let source = provider.name();

        let error = match tokio::time::timeout(self.fetch_timeout, provider.fetch(domain.as_str()))
            .await
        {
            Ok(Ok(raw)) => {
                let accepted = self.absorb(domain, raw, &mut partial);
                debug!("{} gave {} names for {}", source, accepted, domain);
                partial.source_counts.insert(source.to_string(), accepted);
                return partial;
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {:?}", self.fetch_timeout),
        };

        warn!("Source {} failed for {}: {}", source, domain, error);
        partial.source_counts.insert(source.to_string(), 0);
        partial.failures.push(SourceFailure {
            source: source.to_string(),
            domain: domain.to_string(),
            error,
        });
        partial
    }

    fn absorb(&self, domain: &TargetDomain, raw: Vec<String>, partial: &mut RunResult) -> usize {
        let mut accepted = 0;
        for candidate in raw.iter().filter_map(|r| self.normalizer.normalize(r)) {
            if self.restrict_to_scope && !candidate.in_scope(domain) {
                continue;
            }
            accepted += 1;
            match candidate {
                Candidate::Concrete(s) => partial.subdomains.insert(s),
                Candidate::Wildcard(s) => partial.wildcards.insert(s),
            };
        }
        accepted
    }
}
