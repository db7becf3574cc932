use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::scripting::SCRIPT_LOG_TARGET;

/// File that receives the `script` channel when a log directory is set.
pub const SCRIPT_LOG_FILE: &str = "script.log";

/// Console logging filtered by `RUST_LOG` (default `info`). With `log_dir`,
/// script output and fatal script traces are also appended to
/// `<log_dir>/script.log`.
///
/// The returned guard must live as long as file logging is wanted.
pub fn init_logging(log_dir: Option<&Path>) -> io::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let Some(log_dir) = log_dir else {
        tracing_subscriber::fmt().with_env_filter(env_filter).try_init().map_err(io::Error::other)?;
        return Ok(None);
    };

    let log_path = script_log_path(log_dir)?;
    let file = OpenOptions::new().create(true).append(true).open(&log_path)?;
    let (non_blocking_file, guard) = tracing_appender::non_blocking(BufWriter::new(file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(
            fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_target(true)
                .with_filter(filter_fn(|meta| meta.target() == SCRIPT_LOG_TARGET)),
        )
        .try_init()
        .map_err(io::Error::other)?;

    tracing::info!("Script log: {}", log_path.display());
    Ok(Some(guard))
}

fn script_log_path(log_dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(log_dir)?;
    Ok(log_dir.join(SCRIPT_LOG_FILE))
}
