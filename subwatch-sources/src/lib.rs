/*!
Passive subdomain sources.

Every public data source is wrapped in a [`SourceProvider`] that turns one target domain into a
list of raw candidate names. Providers never normalize or deduplicate; that is left to the caller.
*/

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod error;
pub mod providers;

pub use error::SourceError;
pub use providers::{
    alienvault::AlienVault, anubis::Anubis, crtsh::CrtSh, hackertarget::HackerTarget,
    rapiddns::RapidDns, urlscan::UrlScan,
};

/// User agent sent with every source request
pub const USER_AGENT: &str = concat!("subwatch/", env!("CARGO_PKG_VERSION"));

/// Default request timeout for sources without a specific one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A single external data source of subdomain candidates
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Name of the source, used in logs and failure reports
    fn name(&self) -> &'static str;

    /// Fetch raw candidate names for one target domain
    async fn fetch(&self, domain: &str) -> Result<Vec<String>, SourceError>;
}

/// The sources this crate knows how to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    CrtSh,
    AlienVault,
    UrlScan,
    Anubis,
    HackerTarget,
    RapidDns,
}

impl SourceKind {
    pub const ALL: [SourceKind; 6] = [
        SourceKind::CrtSh,
        SourceKind::AlienVault,
        SourceKind::UrlScan,
        SourceKind::Anubis,
        SourceKind::HackerTarget,
        SourceKind::RapidDns,
    ];

    /// crt.sh is slow on large domains and gets a tighter deadline so it cannot stall a run
    pub fn default_timeout(self) -> Duration {
        match self {
            SourceKind::CrtSh => Duration::from_secs(25),
            _ => DEFAULT_TIMEOUT,
        }
    }
}

/// Settings shared by all providers built through [`build_providers`]
#[derive(Debug, Clone, Default)]
pub struct ClientSettings {
    /// Overrides every provider's default timeout when set
    pub timeout: Option<Duration>,
}

impl ClientSettings {
    pub fn timeout_for(&self, kind: SourceKind) -> Duration {
        self.timeout.unwrap_or_else(|| kind.default_timeout())
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, SourceError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Build one provider per requested kind, each with its own bounded client
pub fn build_providers(
    kinds: &[SourceKind],
    settings: &ClientSettings,
) -> Result<Vec<Arc<dyn SourceProvider>>, SourceError> {
    let mut providers: Vec<Arc<dyn SourceProvider>> = Vec::with_capacity(kinds.len());

    for &kind in kinds {
        let client = build_client(settings.timeout_for(kind))?;
        let provider: Arc<dyn SourceProvider> = match kind {
            SourceKind::CrtSh => Arc::new(CrtSh::new(client)),
            SourceKind::AlienVault => Arc::new(AlienVault::new(client)),
            SourceKind::UrlScan => Arc::new(UrlScan::new(client)),
            SourceKind::Anubis => Arc::new(Anubis::new(client)),
            SourceKind::HackerTarget => Arc::new(HackerTarget::new(client)),
            SourceKind::RapidDns => Arc::new(RapidDns::new(client)),
        };
        tracing::debug!("Built source provider {}", provider.name());
        providers.push(provider);
    }

    Ok(providers)
}

/// Send a GET and fail on non-success statuses
pub(crate) async fn get_checked(
    source_name: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, SourceError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            source_name,
            status: status.as_u16(),
        });
    }
    Ok(response)
}
