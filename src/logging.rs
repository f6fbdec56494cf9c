use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "teach-portal.log";

fn default_directive(level: &str) -> Directive {
    level
        .parse::<Directive>()
        .unwrap_or_else(|_| LevelFilter::from_level(Level::INFO).into())
}

/// Install the global subscriber: stderr without ANSI, filtered by
/// `RUST_LOG` on top of the configured level, plus a daily rolling file
/// when `log_dir` is set.
///
/// Keep the returned guard alive for the life of the process so buffered
/// file output is flushed.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(default_directive(&config.level));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_ansi(false))
        .with(file_layer)
        .try_init();

    if let Err(e) = result {
        // already installed, e.g. by an earlier call in the same process
        eprintln!("Logging already initialized: {e}");
    }
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_falls_back_to_info() {
        assert_eq!(default_directive("debug").to_string(), "debug");
        assert_eq!(default_directive("app=loud").to_string(), "info");
    }
}
