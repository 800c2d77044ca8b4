//! Logging setup for embedders: a compact console layer plus a
//! daily-rolling JSON file layer, filtered through `RUST_LOG`.

use std::error::Error;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Installs the global subscriber. Call once at startup; the returned
/// guard must be kept alive for the file writer to flush. Fails if a
/// global subscriber is already set.
pub fn init(log_dir: impl AsRef<Path>) -> Result<WorkerGuard, Box<dyn Error + Send + Sync>> {
    let file_appender = tracing_appender::rolling::daily(log_dir.as_ref(), "heapdb.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_level(true)
        .compact();

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .json()
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_installs_the_subscriber_once() {
        let log_dir = std::env::temp_dir().join(format!("heapdb-logs-{}", std::process::id()));

        let first = init(&log_dir);
        assert!(first.is_ok());

        // the global subscriber is already set now
        let second = init(&log_dir);
        assert!(second.is_err());
    }
}
