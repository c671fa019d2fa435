//! Tracing subscriber setup shared by the checkup binaries.
//!
//! `RUST_LOG` selects what is logged (INFO by default) and `RUST_LOG_FORMAT`
//! selects how: `json` for one JSON object per event, anything else for the
//! compact human-readable layout. Events go to stderr so stdout stays free for
//! command output.

use std::env;
use std::str::FromStr;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

const FORMAT_VAR: &str = "RUST_LOG_FORMAT";

/// Output layout of log events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        })
    }
}

impl LogFormat {
    /// Read the format from `RUST_LOG_FORMAT`, compact when unset
    pub fn from_env() -> Self {
        env::var(FORMAT_VAR).map(|value| value.parse().unwrap_or_default()).unwrap_or_default()
    }
}

/// Install the global subscriber at INFO unless `RUST_LOG` says otherwise
pub fn init_tracing() {
    init_tracing_with_level(LevelFilter::INFO);
}

/// Install the global subscriber with `level` as the default directive
///
/// Does nothing when a subscriber is already installed.
pub fn init_tracing_with_level(level: LevelFilter) {
    let filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();
    let layer = log_layer(LogFormat::from_env(), filter);

    if tracing_subscriber::registry().with(layer).try_init().is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

fn log_layer(format: LogFormat, filter: EnvFilter) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
    }
}
