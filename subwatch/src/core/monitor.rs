/*!
Main coordinator: targets -> sources -> baseline diff -> results and notifications
*/

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use super::BoxError;
use super::aggregator::Aggregator;
use super::baseline_store::{BaselineStore, open_store};
use super::config::MonitorConfig;
use super::notifiers::{NotificationManager, format_new_subdomains};
use super::results::{ResultsWriter, RunSummary};
use super::scheduler::{RunMode, ScheduleEvent, ScheduledJob, Scheduler};
use super::subdomain::SubdomainSet;
use super::targets::TargetSource;

/// One full enumeration pass and everything that follows from it
pub struct MonitorPipeline {
    targets: TargetSource,
    aggregator: Aggregator,
    baseline: Box<dyn BaselineStore>,
    notifications: NotificationManager,
    results: ResultsWriter,
}

impl MonitorPipeline {
    pub fn new(
        targets: TargetSource,
        aggregator: Aggregator,
        baseline: Box<dyn BaselineStore>,
        notifications: NotificationManager,
        results: ResultsWriter,
    ) -> Self {
        Self {
            targets,
            aggregator,
            baseline,
            notifications,
            results,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self, BoxError> {
        Ok(Self::new(
            TargetSource::from_config(&config.targets),
            Aggregator::from_config(&config.sources)?,
            open_store(&config.baseline)?,
            NotificationManager::from_config(&config.notifications)?,
            ResultsWriter::from_config(&config.output),
        ))
    }

    /// Only an unreadable target list fails a run. Source, baseline, output and notification
    /// problems are logged and the run still completes.
    pub async fn execute(&self) -> Result<RunSummary, BoxError> {
        let started_at = Utc::now();
        let targets = self.targets.load().await?;
        if targets.is_empty() {
            warn!("No target domains to enumerate");
        }

        info!(
            "🔭 Enumerating {} domains with sources: {}",
            targets.len(),
            self.aggregator.source_names().join(", ")
        );
        let result = self.aggregator.run(&targets).await;

        let baseline = match self.baseline.load().await {
            Ok(known) => known,
            Err(e) => {
                error!("Could not load baseline, treating every subdomain as new: {}", e);
                SubdomainSet::new()
            }
        };
        let delta = result.subdomains.difference(&baseline);

        if let Err(e) = self.results.write(&result).await {
            error!("Failed to write results: {}", e);
        }

        let mut baseline_saved = true;
        let mut notified = false;
        if delta.is_empty() {
            info!("No new subdomains");
        } else {
            info!("🚨 {} new subdomains discovered", delta.len());
            for subdomain in &delta {
                info!("  {}", subdomain);
            }

            if let Err(e) = self.baseline.persist(&delta).await {
                error!(
                    "Failed to save baseline, these subdomains will be reported again next run: {}",
                    e
                );
                baseline_saved = false;
            }
            if self.notifications.is_empty() {
                debug!("No notifiers configured");
            } else {
                notified = self.notifications.notify(&format_new_subdomains(&delta)).await > 0;
            }
        }

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            targets: targets.len(),
            total_subdomains: result.subdomains.len(),
            wildcards: result.wildcards.len(),
            new_subdomains: delta,
            failures: result.failures,
            baseline_saved,
            notified,
        };
        if let Err(e) = self.results.append_report(&summary).await {
            error!("Failed to append run report: {}", e);
        }

        info!(
            "✅ Run finished in {}s",
            (summary.finished_at - summary.started_at).num_seconds()
        );
        Ok(summary)
    }
}

#[async_trait]
impl ScheduledJob for MonitorPipeline {
    type Output = RunSummary;

    async fn run_once(&mut self) -> Result<RunSummary, BoxError> {
        self.execute().await
    }
}

/// Statistics about the monitor's operation
#[derive(Debug, Clone, Default)]
pub struct MonitorStats {
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub total_new_subdomains: usize,
    pub last_run: Option<DateTime<Utc>>,
}

/// Drives a pipeline with the scheduler until it stops
pub struct SubdomainMonitor {
    pipeline: MonitorPipeline,
    mode: RunMode,
}

impl SubdomainMonitor {
    pub fn new(config: &MonitorConfig) -> Result<Self, BoxError> {
        config.validate()?;
        info!("Initializing subdomain monitor...");

        let mode = if config.schedule.monitor {
            RunMode::Perpetual {
                interval: config.schedule.interval(),
            }
        } else {
            RunMode::OneShot
        };
        Ok(Self::with_pipeline(MonitorPipeline::from_config(config)?, mode))
    }

    pub fn with_pipeline(pipeline: MonitorPipeline, mode: RunMode) -> Self {
        Self { pipeline, mode }
    }

    /// Run until the schedule ends. A failed one-shot run is returned as an error; in
    /// perpetual mode failures are only logged and counted.
    pub async fn start(self, shutdown: watch::Receiver<bool>) -> Result<MonitorStats, BoxError> {
        info!("🚀 Starting subdomain monitor ({:?})", self.mode);

        let mode = self.mode;
        let mut events = Box::pin(Scheduler::new(self.pipeline, mode, shutdown).into_events());
        let mut stats = MonitorStats::default();
        let mut last_error = None;

        while let Some(event) = events.next().await {
            match event {
                ScheduleEvent::RunCompleted { iteration, output } => {
                    info!(
                        "Run {}: {} subdomains, {} new, {} source failures",
                        iteration,
                        output.total_subdomains,
                        output.new_subdomains.len(),
                        output.failures.len()
                    );
                    stats.runs_completed += 1;
                    stats.total_new_subdomains += output.new_subdomains.len();
                    stats.last_run = Some(output.finished_at);
                    last_error = None;
                }
                ScheduleEvent::RunFailed { iteration, error } => {
                    warn!("Run {} skipped: {}", iteration, error);
                    stats.runs_failed += 1;
                    last_error = Some(error);
                }
            }
        }

        info!("🏁 Subdomain monitor stopped");
        match (mode, last_error) {
            (RunMode::OneShot, Some(error)) => Err(error.into()),
            _ => Ok(stats),
        }
    }
}
