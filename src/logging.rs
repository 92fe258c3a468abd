use color_eyre::{eyre::eyre, Result};
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured level. Logs go to stderr so command
/// output on stdout stays clean; with a directory configured they are also
/// written to a daily file. Keep the returned guard alive until exit or
/// buffered file lines are lost.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(&config.level))
    .map_err(|e| eyre!("Invalid log level {}: {}", config.level, e))?;

  let console = fmt::layer().with_target(false).with_writer(std::io::stderr);

  let (file, guard) = match &config.directory {
    Some(dir) => {
      fs::create_dir_all(dir).map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
      let appender = RollingFileAppender::new(Rotation::DAILY, dir, "meowmenu.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      let layer = fmt::layer().with_ansi(false).with_writer(writer);
      (Some(layer), Some(guard))
    }
    None => (None, None),
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(console)
    .with(file)
    .try_init()
    .map_err(|e| eyre!("Failed to install logger: {}", e))?;

  Ok(guard)
}
