use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "hianime=info";

/// Install the global subscriber.
///
/// Logs go to stderr, or to a daily file under the data directory when
/// `to_file` is set. The returned guard flushes pending lines on drop and
/// must be held until exit.
pub fn init(to_file: bool) -> Result<WorkerGuard> {
  let (writer, guard) = if to_file {
    let dir = dirs::data_dir()
      .ok_or_else(|| eyre!("Could not determine data directory"))?
      .join("hianime")
      .join("logs");
    std::fs::create_dir_all(&dir)
      .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

    tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "hianime.log"))
  } else {
    tracing_appender::non_blocking(std::io::stderr())
  };

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(!to_file),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
