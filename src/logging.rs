use std::env;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// `TRACING_LEVEL` overrides `level`. Output goes to stdout (pretty, or JSON
/// when `json` is set) and, when `LOG_FILE_PATH` is set, to that file as
/// well. Keep the returned guard alive so the file writer flushes on exit.
pub fn init_logger(level: &str, json: bool) -> Option<WorkerGuard> {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| level.to_string());
    let filter_layer = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let (json_layer, pretty_layer) = if json {
        (Some(fmt::layer().json().with_writer(std::io::stdout)), None)
    } else {
        (
            None,
            Some(
                fmt::layer()
                    .with_writer(std::io::stdout)
                    .pretty()
                    .with_file(false)
                    .with_ansi(true),
            ),
        )
    };

    let (file_layer, guard) = match env::var("LOG_FILE_PATH") {
        Ok(log_file_path) => {
            let file_appender = tracing_appender::rolling::never("./", log_file_path);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (
                Some(fmt::layer().with_writer(non_blocking).with_ansi(false)),
                Some(guard),
            )
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(json_layer)
        .with(pretty_layer)
        .with(file_layer)
        .with(filter_layer)
        .init();

    info!(filter = %filter, "Tracing configured");

    guard
}
