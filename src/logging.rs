//! Diagnostic logging.
//!
//! Log records go to `<data-dir>/nexus.log` so the chat transcript on the
//! terminal stays readable. The filter comes from `NEXUS_LOG` and defaults to
//! `nexus=info`.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "NEXUS_LOG";
pub const DEFAULT_FILTER: &str = "nexus=info";
pub const LOG_FILE_NAME: &str = "nexus.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Returns the log file path.
///
/// Calling this more than once keeps the first subscriber.
pub fn init(data_dir: &Path) -> Result<PathBuf, LoggingError> {
    let path = data_dir.join(LOG_FILE_NAME);
    let open_error = |source| LoggingError::Open {
        path: path.clone(),
        source,
    };

    fs::create_dir_all(data_dir).map_err(open_error)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(open_error)?;

    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file));

    // a subscriber may already be installed (tests, repeated init)
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(layer)
        .try_init();

    Ok(path)
}

/// [`init`], printing a warning instead of failing. Returns the log path when
/// logging is active.
pub fn init_or_warn(data_dir: &Path) -> Option<PathBuf> {
    match init(data_dir) {
        Ok(path) => Some(path),
        Err(e) => {
            eprintln!("⚠️  {e}");
            None
        }
    }
}
