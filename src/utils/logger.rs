//! Logging utilities

use crate::{ConvertError, Result};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Initialize logging system
pub fn init<P: AsRef<Path>>(log_level: &str, log_file: P) -> Result<()> {
    let log_file = log_file.as_ref();
    let log_dir = log_file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(log_dir)?;

    // Daily rotation
    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        log_dir,
        log_file.file_name().unwrap_or(std::ffi::OsStr::new("autoconvert.log")),
    );

    let console_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(file_appender);

    // RUST_LOG wins over the CLI level
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ConvertError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}

/// Log an order with structured fields
#[macro_export]
macro_rules! log_order {
    ($level:ident, $symbol:expr, $side:expr, $quantity:expr, $($field:tt)*) => {
        tracing::$level!(
            symbol = %$symbol,
            side = %$side,
            quantity = %$quantity,
            $($field)*
        );
    };
}

/// Log a trade job with structured fields
#[macro_export]
macro_rules! log_job {
    ($level:ident, $job:expr, $($field:tt)*) => {
        tracing::$level!(
            from = %$job.from,
            to = %$job.to,
            amount = $job.amount,
            $($field)*
        );
    };
}
