//! Logging Infrastructure
//!
//! Structured logging for the order engine. Level comes from `RUST_LOG` when
//! set, otherwise from the configured log level. Optional daily-rolling file
//! output when a log directory is given.

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Initialize the logger with default settings (stdout, `info`)
pub fn init_logger() {
    init_logger_with_file(None, false, None);
}

/// Initialize the logger with optional JSON formatting and file output
pub fn init_logger_with_file(log_level: Option<&str>, json: bool, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.exists()
            && let Some(dir_str) = log_path.to_str()
        {
            let file_appender = tracing_appender::rolling::daily(dir_str, "order-engine");
            let builder = builder.with_ansi(false).with_writer(file_appender);
            // try_init: a second call (tests, embedding) keeps the first subscriber
            let _ = if json {
                builder.json().try_init()
            } else {
                builder.try_init()
            };
            return;
        }
    }

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
