use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter (e.g. "hrms_lite=debug").
pub const ENV_LOG: &str = "HRMS_LOG";

const LOG_FILE: &str = "hrms.log";

/// Send log output to a daily-rolling file so it never mixes with command
/// output. Keep the returned guard alive until exit, or buffered lines are
/// lost.
///
/// When the log directory is unusable, logging goes to stderr at `warn`
/// instead of stopping the tool.
pub fn init(dir: Option<&Path>) -> Result<WorkerGuard> {
  let (writer, guard, default_level) = match file_appender(dir) {
    Ok(appender) => {
      let (writer, guard) = tracing_appender::non_blocking(appender);
      (writer, guard, "info")
    }
    Err(e) => {
      eprintln!("warning: file logging disabled: {}", e);
      let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
      (writer, guard, "warn")
    }
  };

  let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(default_level));

  fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}

fn file_appender(dir: Option<&Path>) -> Result<RollingFileAppender> {
  let dir = match dir {
    Some(d) => d.to_path_buf(),
    None => default_dir()?,
  };
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  RollingFileAppender::builder()
    .rotation(Rotation::DAILY)
    .filename_prefix(LOG_FILE)
    .build(&dir)
    .map_err(|e| eyre!("Failed to open log file in {}: {}", dir.display(), e))
}

/// Get the default log directory.
pub fn default_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("hrms").join("logs"))
}
