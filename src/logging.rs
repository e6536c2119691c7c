/*!
 * Tracing setup
 *
 * Events go to stderr so the run summary printed on stdout stays clean. With
 * a log file configured, each event is written as one flattened JSON object
 * instead. `STAMP_LOG` takes a full `EnvFilter` directive and overrides the
 * configured level.
 */

use std::fs::File;
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::StampConfig;
use crate::error::{Result, StampError};

/// Environment variable holding filter directives
pub const LOG_ENV: &str = "STAMP_LOG";

/// Install the global subscriber for a run
pub fn init_logging(config: &StampConfig) -> Result<()> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) => parse_filter(&directives)?,
        Err(_) => parse_filter(&default_directives(effective_level(config)))?,
    };

    match &config.log_file {
        Some(path) => init_json_logging(path, filter),
        None => init_stderr_logging(filter),
    }
}

/// Level after `verbose` is taken into account
pub fn effective_level(config: &StampConfig) -> Level {
    if config.verbose {
        Level::DEBUG
    } else {
        config.log_level.to_tracing_level()
    }
}

/// Filter directives for a level
///
/// Per-asset events (skips with their `reason`, confirmations, copies) are
/// debug events of the reconciler. Below trace the filesystem layer is held
/// at info so a debug run reads as one line per asset.
pub fn default_directives(level: Level) -> String {
    if level == Level::TRACE {
        format!("stamp={}", level)
    } else {
        let system = if level == Level::DEBUG {
            Level::INFO
        } else {
            level
        };
        format!("stamp={},stamp::system={}", level, system)
    }
}

fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| StampError::Config(format!("Invalid log filter '{}': {}", directives, e)))
}

fn init_stderr_logging(filter: EnvFilter) -> Result<()> {
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| StampError::Config(format!("Failed to install subscriber: {}", e)))
}

fn init_json_logging(log_path: &Path, filter: EnvFilter) -> Result<()> {
    let file = File::create(log_path).map_err(|e| {
        StampError::Config(format!(
            "Failed to create log file {}: {}",
            log_path.display(),
            e
        ))
    })?;

    let layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| StampError::Config(format!("Failed to install subscriber: {}", e)))
}

/// Route events to the test harness output, once per test binary
#[cfg(test)]
pub(crate) fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(default_directives(Level::DEBUG)));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_test_writer().without_time().compact())
            .try_init()
            .ok();
    });
}
