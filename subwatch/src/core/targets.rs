/*!
Target domain input
*/

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::debug;

use super::BoxError;
use super::config::TargetsConfig;
use super::subdomain::TargetDomain;

/// Where target domains come from. The list file is re-read on every run so edits are
/// picked up without a restart.
#[derive(Debug, Clone, Default)]
pub struct TargetSource {
    domain_list: Option<PathBuf>,
    domain: Option<TargetDomain>,
}

impl TargetSource {
    pub fn new(domain_list: Option<PathBuf>, domain: Option<&str>) -> Self {
        Self {
            domain_list,
            domain: domain.and_then(TargetDomain::parse),
        }
    }

    pub fn from_config(config: &TargetsConfig) -> Self {
        Self::new(config.domain_list.clone(), config.domain.as_deref())
    }

    /// Read the current targets. An unreadable list is an error; an empty one is not.
    pub async fn load(&self) -> Result<Vec<TargetDomain>, BoxError> {
        let mut targets = Vec::new();

        if let Some(path) = &self.domain_list {
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| format!("cannot read domain list {}: {}", path.display(), e))?;
            targets.extend(parse_domain_list(&content));
        }
        if let Some(domain) = &self.domain {
            targets.push(domain.clone());
        }

        let mut seen = HashSet::new();
        targets.retain(|t| seen.insert(t.clone()));
        debug!("Loaded {} target domains", targets.len());
        Ok(targets)
    }
}

/// One domain per line; blank lines and `#` comments are skipped
pub fn parse_domain_list(content: &str) -> Vec<TargetDomain> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(TargetDomain::parse)
        .collect()
}
