/*!
Subdomain monitor command line
*/

use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use subwatch::core::config::{BaselineBackend, MonitorConfig};
use subwatch::{BoxError, SubdomainMonitor};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// One year
const MAX_INTERVAL_HOURS: u64 = 24 * 365;

fn cli() -> Command {
    Command::new("subwatch")
        .version(clap::crate_version!())
        .about("Subdomain enumeration with monitoring and webhook notifications")
        .arg(
            Arg::new("domain-list")
                .short('l')
                .long("domain-list")
                .help("File containing a list of domains, one per line")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("domain")
                .short('d')
                .long("domain")
                .help("A single domain to enumerate")
                .value_name("DOMAIN"),
        )
        .arg(
            Arg::new("monitor")
                .short('m')
                .long("monitor")
                .help("Keep running and report new subdomains every interval")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("webhook")
                .short('w')
                .long("webhook")
                .help("Discord webhook URL for new subdomain notifications")
                .value_name("URL"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("TOML config file")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Results file, rewritten every run")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("wildcards")
                .long("wildcards")
                .help("Also write wildcard names to this file")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("report")
                .long("report")
                .help("Append a JSON line per run to this file")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("baseline")
                .long("baseline")
                .help("Baseline of already known subdomains")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("baseline-backend")
                .long("baseline-backend")
                .help("Baseline storage format")
                .value_parser(["text", "sqlite"]),
        )
        .arg(
            Arg::new("interval-hours")
                .long("interval-hours")
                .help("Hours between runs in monitor mode")
                .value_name("HOURS")
                .value_parser(value_parser!(u64).range(1..=MAX_INTERVAL_HOURS)),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Per-source request timeout in seconds")
                .value_name("SECS")
                .value_parser(value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("concurrency")
                .long("concurrency")
                .help("Maximum concurrent source requests")
                .value_name("N")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Debug logging")
                .action(ArgAction::SetTrue),
        )
}

fn load_config(matches: &ArgMatches) -> Result<MonitorConfig, BoxError> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => MonitorConfig::from_toml_file(path)?,
        None => match MonitorConfig::default_path().filter(|p| p.exists()) {
            Some(path) => {
                info!("Using config file {}", path.display());
                MonitorConfig::from_toml_file(path)?
            }
            None => MonitorConfig::default(),
        },
    };

    if let Some(path) = matches.get_one::<String>("domain-list") {
        config.targets.domain_list = Some(PathBuf::from(path));
    }
    if let Some(domain) = matches.get_one::<String>("domain") {
        config.targets.domain = Some(domain.clone());
    }
    if matches.get_flag("monitor") {
        config.schedule.monitor = true;
    }
    if let Some(url) = matches.get_one::<String>("webhook") {
        config.set_webhook(url.clone());
    }
    if let Some(path) = matches.get_one::<String>("output") {
        config.output.results_path = PathBuf::from(path);
    }
    if let Some(path) = matches.get_one::<String>("wildcards") {
        config.output.wildcards_path = Some(PathBuf::from(path));
    }
    if let Some(path) = matches.get_one::<String>("report") {
        config.output.report_path = Some(PathBuf::from(path));
    }
    if let Some(path) = matches.get_one::<String>("baseline") {
        config.baseline.path = Some(PathBuf::from(path));
    }
    if let Some(backend) = matches.get_one::<String>("baseline-backend") {
        config.baseline.backend = match backend.as_str() {
            "sqlite" => BaselineBackend::Sqlite,
            _ => BaselineBackend::Text,
        };
    }
    if let Some(hours) = matches.get_one::<u64>("interval-hours") {
        config.schedule.interval_secs = hours.saturating_mul(60 * 60);
    }
    if let Some(secs) = matches.get_one::<u64>("timeout") {
        config.sources.timeout_secs = Some(*secs);
    }
    if let Some(n) = matches.get_one::<usize>("concurrency") {
        config.sources.max_concurrency = *n;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let matches = cli().get_matches();

    let default_level = if matches.get_flag("verbose") { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = load_config(&matches)?;

    // The list is re-read every run; a list missing at startup is fatal in every mode
    if let Some(path) = &config.targets.domain_list {
        tokio::fs::metadata(path)
            .await
            .map_err(|e| format!("cannot read domain list {}: {}", path.display(), e))?;
    }
    let monitor = SubdomainMonitor::new(&config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("🛑 Shutdown");
            let _ = shutdown_tx.send(true);
        }
    });

    let stats = monitor.start(shutdown_rx).await?;
    info!(
        "Completed {} runs ({} failed), {} new subdomains",
        stats.runs_completed, stats.runs_failed, stats.total_new_subdomains
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn absurd_interval_is_rejected() {
        for hours in ["0", "8761", "18446744073709551615"] {
            let parsed = cli().try_get_matches_from(["subwatch", "-m", "--interval-hours", hours]);
            assert!(parsed.is_err(), "--interval-hours {hours} should be rejected");
        }

        let matches = cli()
            .try_get_matches_from(["subwatch", "-d", "example.com", "--interval-hours", "8760"])
            .unwrap();
        let config = load_config(&matches).unwrap();
        assert_eq!(config.schedule.interval_secs, 8760 * 60 * 60);
    }

    #[test]
    fn flags_override_defaults() {
        let matches = cli()
            .try_get_matches_from([
                "subwatch",
                "-l",
                "domains.txt",
                "-m",
                "-w",
                "https://discord.com/api/webhooks/1/x",
                "--baseline-backend",
                "sqlite",
                "--interval-hours",
                "10",
                "--concurrency",
                "3",
                "-c",
                "/nonexistent/config.toml",
            ])
            .unwrap();

        // An explicit config path that cannot be read is an error
        assert!(load_config(&matches).is_err());

        let matches = cli()
            .try_get_matches_from([
                "subwatch",
                "-l",
                "domains.txt",
                "-m",
                "-w",
                "https://discord.com/api/webhooks/1/x",
                "--baseline-backend",
                "sqlite",
                "--interval-hours",
                "10",
                "--concurrency",
                "3",
            ])
            .unwrap();
        let config = load_config(&matches).unwrap();

        assert_eq!(config.targets.domain_list, Some(PathBuf::from("domains.txt")));
        assert!(config.schedule.monitor);
        assert_eq!(config.schedule.interval_secs, 36000);
        assert_eq!(config.baseline.backend, BaselineBackend::Sqlite);
        assert_eq!(
            config.baseline.resolved_path(),
            PathBuf::from("subdomains_database.db")
        );
        assert_eq!(config.sources.max_concurrency, 3);
        assert_eq!(config.notifications.len(), 1);
        config.validate().unwrap();
    }
}
