use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use checkup::{NotificationDedupCache, SystemClock};
use clap::{Parser, Subcommand};
use logger::init_tracing;
use tokio::sync::mpsc;
use tracing::{error, info};

mod config;
mod notifier;
mod runner;
mod state;

use config::Config;
use runner::{CheckOutcome, Runner};
use state::StateFile;

#[derive(Debug, Parser)]
#[command(version, about = "HTTP, keyword and certificate health checks")]
struct Cli {
    /// Config file, defaults to $XDG_CONFIG_HOME/checkup/config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check every configured monitor once and print one JSON line per monitor
    Check {
        /// Only check the monitor with this name or id
        #[arg(short, long)]
        monitor: Option<String>,
    },
    /// Keep checking every monitor on its own interval, sending daily certificate reminders
    Watch {
        /// Seconds between checks of each monitor
        #[arg(short, long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,

        #[arg(short, long)]
        monitor: Option<String>,
    },
    /// Print the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = config::config_path(cli.config.as_deref())?;
    let config = Config::from_path(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    match cli.command {
        Command::ShowConfig => {
            println!("{config}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { monitor } => {
            let state = Arc::new(StateFile::load(config.state_path(&config_path)).await?);
            let runner = Runner::from_config(&config, state, None)?;

            let outcomes = runner.run_pass(&selected(&config, monitor.as_deref())?).await?;
            print_outcomes(&outcomes)?;

            if outcomes.iter().any(|outcome| outcome.result.is_down()) {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Command::Watch { interval, monitor } => {
            let state = Arc::new(StateFile::load(config.state_path(&config_path)).await?);
            let cache = Arc::new(NotificationDedupCache::new());
            let reset = cache.spawn_daily_reset(Arc::new(SystemClock));
            let runner = Arc::new(Runner::from_config(&config, state, Some(cache))?);
            let monitors = selected(&config, monitor.as_deref())?;

            info!(monitors = monitors.len(), interval, "Watching monitors");
            let (outcomes_tx, mut outcomes) = mpsc::unbounded_channel();
            let mut watchers =
                runner.spawn_watchers(&monitors, Duration::from_secs(interval), outcomes_tx);

            let shutdown = tokio::signal::ctrl_c();
            tokio::pin!(shutdown);
            loop {
                tokio::select! {
                    Some(outcome) = outcomes.recv() => print_outcomes(std::slice::from_ref(&outcome))?,
                    result = &mut shutdown => {
                        result.context("Failed to listen for ctrl-c")?;
                        info!("Shutting down");
                        break;
                    }
                }
            }

            watchers.abort_all();
            reset.abort();
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn selected<'a>(
    config: &'a Config,
    monitor: Option<&str>,
) -> Result<Vec<&'a checkup::MonitorCheckConfig>> {
    let monitors = config.select_monitors(monitor);
    if monitors.is_empty() {
        match monitor {
            Some(wanted) => bail!("No monitor named {wanted:?}"),
            None => bail!("No monitors configured"),
        }
    }
    Ok(monitors)
}

fn print_outcomes(outcomes: &[CheckOutcome]) -> Result<()> {
    for outcome in outcomes {
        println!("{}", serde_json::to_string(outcome)?);
    }
    Ok(())
}
