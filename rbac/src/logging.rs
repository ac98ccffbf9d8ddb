use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, time::OffsetTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;
use crate::error::{RbacError, Result};

/// Initialize console logging, plus a daily rolling file when
/// `config.log_dir` is set.
///
/// `RUST_LOG` takes precedence over `config.level`. Keep the returned guard
/// alive for as long as file output should be flushed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let timer = OffsetTime::local_rfc_3339().unwrap_or_else(|_| {
        // Local offset is unavailable in some multi-threaded environments
        OffsetTime::new(
            time::UtcOffset::UTC,
            time::format_description::well_known::Rfc3339,
        )
    });

    let (file_layer, guard) = match &config.log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)?;

            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("rbac")
                .filename_suffix("log")
                .build(log_dir)
                .map_err(|e| RbacError::Logging(e.to_string()))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_timer(timer.clone())
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| RbacError::Logging(e.to_string()))?;

    tracing_subscriber::registry()
        .with(file_layer)
        .with(fmt::layer().with_timer(timer).with_target(false))
        .with(filter)
        .try_init()
        .map_err(|e| RbacError::Logging(e.to_string()))?;

    tracing::info!("Logging initialized at level {}", config.level);
    if let Some(log_dir) = &config.log_dir {
        tracing::info!("Log files are being written to: {:?}", log_dir);
    }

    Ok(guard)
}
