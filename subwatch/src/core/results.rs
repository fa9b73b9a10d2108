/*!
Result files written at the end of every run
*/

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::BoxError;
use super::aggregator::{RunResult, SourceFailure};
use super::baseline_store::write_atomically;
use super::config::OutputConfig;
use super::subdomain::SubdomainSet;

/// What one pipeline run did, appended to the JSON lines report when configured
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub targets: usize,
    pub total_subdomains: usize,
    pub wildcards: usize,
    pub new_subdomains: SubdomainSet,
    pub failures: Vec<SourceFailure>,
    /// False when the baseline could not be saved; the same names will be reported as new again
    pub baseline_saved: bool,
    pub notified: bool,
}

pub struct ResultsWriter {
    results_path: PathBuf,
    wildcards_path: Option<PathBuf>,
    report_path: Option<PathBuf>,
}

impl ResultsWriter {
    pub fn new(results_path: PathBuf) -> Self {
        Self {
            results_path,
            wildcards_path: None,
            report_path: None,
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self {
            results_path: config.results_path.clone(),
            wildcards_path: config.wildcards_path.clone(),
            report_path: config.report_path.clone(),
        }
    }

    /// Overwrite the results file with the complete concrete set, and the wildcard file if
    /// one is configured
    pub async fn write(&self, result: &RunResult) -> Result<(), BoxError> {
        let mut files = vec![(self.results_path.clone(), result.subdomains.to_lines())];
        if let Some(path) = &self.wildcards_path {
            files.push((path.clone(), result.wildcards.to_lines()));
        }

        tokio::task::spawn_blocking(move || -> Result<(), BoxError> {
            for (path, content) in files {
                write_atomically(&path, content.as_bytes())
                    .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
            }
            Ok(())
        })
        .await??;

        info!(
            "💾 Results saved in {} ({} subdomains)",
            self.results_path.display(),
            result.subdomains.len()
        );
        Ok(())
    }

    pub async fn append_report(&self, summary: &RunSummary) -> Result<(), BoxError> {
        let Some(path) = self.report_path.clone() else {
            return Ok(());
        };

        let line = serde_json::to_string(summary)?;
        tokio::task::spawn_blocking(move || -> Result<(), BoxError> {
            let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
            writeln!(file, "{line}")?;
            file.flush()?;
            Ok(())
        })
        .await?
    }
}
