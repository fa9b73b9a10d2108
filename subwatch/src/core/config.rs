/*!
Configuration management for the subdomain monitor
*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use subwatch_sources::SourceKind;

use super::BoxError;

/// Default pause between runs in monitor mode
pub const DEFAULT_INTERVAL_SECS: u64 = 5 * 60 * 60;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Which domains to enumerate
    pub targets: TargetsConfig,
    /// Source selection and fan-out limits
    pub sources: SourcesConfig,
    /// Where the known-subdomain baseline lives
    pub baseline: BaselineConfig,
    /// Result files written every run
    pub output: OutputConfig,
    /// Notification channels for new findings
    pub notifications: Vec<NotifierConfig>,
    /// One-shot or perpetual execution
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetsConfig {
    /// Newline-separated list of apex domains
    pub domain_list: Option<PathBuf>,
    /// A single extra domain given on the command line
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub enabled: Vec<SourceKind>,
    /// Overrides every source's own request timeout
    pub timeout_secs: Option<u64>,
    /// Upper bound on in-flight source requests across all domains
    pub max_concurrency: usize,
    /// Drop names that are not under the queried target
    pub restrict_to_scope: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enabled: SourceKind::ALL.to_vec(),
            timeout_secs: None,
            max_concurrency: 8,
            restrict_to_scope: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineBackend {
    Text,
    Sqlite,
}

impl BaselineBackend {
    fn default_path(self) -> &'static str {
        match self {
            BaselineBackend::Text => "subdomains_database.txt",
            BaselineBackend::Sqlite => "subdomains_database.db",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BaselineConfig {
    pub backend: BaselineBackend,
    /// Defaults to a file named after the backend so a text baseline is never opened as SQLite
    pub path: Option<PathBuf>,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            backend: BaselineBackend::Text,
            path: None,
        }
    }
}

impl BaselineConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.backend.default_path()))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Full current result set, concrete names only, rewritten each run
    pub results_path: PathBuf,
    /// Wildcard names are only written when this is set
    pub wildcards_path: Option<PathBuf>,
    /// JSON lines run reports
    pub report_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_path: PathBuf::from("subwatch_results.txt"),
            wildcards_path: None,
            report_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifierConfig {
    /// Notifier plugin type
    pub plugin: NotifierPlugin,
    /// Whether this notifier is enabled
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierPlugin {
    Webhook { url: String },
    Terminal { format: TerminalFormat },
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalFormat {
    Plain,
    Colored,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Keep running and re-enumerate every `interval_secs`
    pub monitor: bool,
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            monitor: false,
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl MonitorConfig {
    /// Parse a TOML config file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, BoxError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("cannot read config {}: {}", path.as_ref().display(), e))?;
        let config: MonitorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// `<config dir>/subwatch/config.toml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("subwatch").join("config.toml"))
    }

    /// Replace or add the webhook notifier
    pub fn set_webhook(&mut self, url: String) {
        self.notifications
            .retain(|n| !matches!(n.plugin, NotifierPlugin::Webhook { .. }));
        self.notifications.push(NotifierConfig {
            plugin: NotifierPlugin::Webhook { url },
            enabled: true,
        });
    }

    pub fn validate(&self) -> Result<(), BoxError> {
        if self.targets.domain_list.is_none() && self.targets.domain.is_none() {
            return Err("missing domain list or single domain".into());
        }
        if self.sources.enabled.is_empty() {
            return Err("no sources enabled".into());
        }
        if self.sources.max_concurrency == 0 {
            return Err("sources.max_concurrency must be at least 1".into());
        }
        if self.sources.timeout_secs == Some(0) {
            return Err("sources.timeout_secs must be at least 1".into());
        }
        if self.schedule.monitor && self.schedule.interval_secs == 0 {
            return Err("schedule.interval_secs must be at least 1".into());
        }
        for notifier in &self.notifications {
            if let NotifierPlugin::Webhook { url } = &notifier.plugin {
                if notifier.enabled
                    && !(url.starts_with("https://") || url.starts_with("http://"))
                {
                    return Err(format!("webhook url must be http(s): {url}").into());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_all_sources() {
        let config = MonitorConfig::default();
        assert_eq!(config.sources.enabled.len(), SourceKind::ALL.len());
        assert_eq!(config.schedule.interval(), Duration::from_secs(5 * 60 * 60));
        assert!(config.notifications.is_empty());
        assert_eq!(config.baseline.backend, BaselineBackend::Text);
    }

    #[test]
    fn parses_toml_sections() {
        let config: MonitorConfig = toml::from_str(
            r#"
            [targets]
            domain_list = "domains.txt"

            [sources]
            enabled = ["crtsh", "anubis"]
            max_concurrency = 2

            [baseline]
            backend = "sqlite"
            path = "known.db"

            [schedule]
            monitor = true
            interval_secs = 36000

            [[notifications]]
            plugin = { webhook = { url = "https://discord.com/api/webhooks/1/x" } }

            [[notifications]]
            plugin = { terminal = { format = "plain" } }
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.targets.domain_list, Some(PathBuf::from("domains.txt")));
        assert_eq!(config.sources.enabled, vec![SourceKind::CrtSh, SourceKind::Anubis]);
        assert!(config.sources.restrict_to_scope);
        assert_eq!(config.baseline.backend, BaselineBackend::Sqlite);
        assert_eq!(config.schedule.interval(), Duration::from_secs(36000));
        assert_eq!(config.notifications.len(), 2);
        assert!(config.notifications[0].enabled);
        assert!(!config.notifications[1].enabled);
        config.validate().unwrap();
    }

    #[test]
    fn baseline_path_follows_backend() {
        let mut baseline = BaselineConfig::default();
        assert_eq!(baseline.resolved_path(), PathBuf::from("subdomains_database.txt"));

        baseline.backend = BaselineBackend::Sqlite;
        assert_eq!(baseline.resolved_path(), PathBuf::from("subdomains_database.db"));

        baseline.path = Some(PathBuf::from("known.db"));
        assert_eq!(baseline.resolved_path(), PathBuf::from("known.db"));
    }

    #[test]
    fn requires_some_target() {
        let err = MonitorConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("domain"));
    }

    #[test]
    fn rejects_non_http_webhook() {
        let mut config = MonitorConfig::default();
        config.targets.domain = Some("example.com".into());
        config.set_webhook("ftp://nope".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn set_webhook_replaces_previous() {
        let mut config = MonitorConfig::default();
        config.set_webhook("https://a.example/hook".into());
        config.set_webhook("https://b.example/hook".into());
        assert_eq!(config.notifications.len(), 1);
    }
}
