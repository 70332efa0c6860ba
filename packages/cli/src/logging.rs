//! Tracing setup. Events go to stderr because stdout carries the JSON report;
//! a daily log file is added when a log directory is configured.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "warn";

const LOG_FILE_PREFIX: &str = "katsuyo";

/// Filter directive for a run. Each `-v` lifts the katsuyo crates one level
/// above whatever `base` allows.
pub fn filter_directive(base: &str, verbose: u8) -> String {
    let base = match base.trim() {
        "" => DEFAULT_FILTER,
        trimmed => trimmed,
    };
    let level = match verbose {
        0 => return base.to_string(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("{base},katsuyo_algo={level},katsuyo_cli={level}")
}

fn daily_appender(log_dir: &Path) -> Option<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(log_dir)
        .map_err(|err| eprintln!("file logging disabled, cannot open {}: {err}", log_dir.display()))
        .ok()
}

/// Install the global subscriber. Keep the returned guard alive until exit so
/// buffered file lines are flushed.
pub fn init_tracing(directive: &str, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let (file_layer, guard) = match log_dir.and_then(daily_appender) {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
    guard
}
