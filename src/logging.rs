//! Structured logging setup using the `tracing` ecosystem.
//!
//! Configures a `tracing-subscriber` with either JSON output (for
//! production) or pretty-printed output (for TTY / local dev). Format
//! is auto-detected from the terminal but can be forced via `--json`
//! or `--pretty`.
//!
//! Access records are emitted on the
//! [`portico::access`](crate::middleware::access_log::TARGET) target, so
//! the target is kept in the output.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[must_use]
pub fn resolve_format(pretty: bool, json: bool) -> LogFormat {
    if json {
        LogFormat::Json
    } else if pretty || std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

/// Level filter for `level`. Connection-pool chatter from the HTTP and
/// TLS stacks is capped at INFO even when debugging Portico itself.
#[must_use]
pub fn filter(level: &LogLevel) -> Targets {
    let level = LevelFilter::from_level(level.to_tracing_level());
    Targets::new()
        .with_default(level)
        .with_target("hyper_util", level.min(LevelFilter::INFO))
        .with_target("rustls", level.min(LevelFilter::INFO))
}

pub fn init(level: &LogLevel, format: LogFormat) {
    let filter = filter(level);

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn json_flag_wins() {
        assert_eq!(resolve_format(true, true), LogFormat::Json);
        assert_eq!(resolve_format(true, false), LogFormat::Pretty);
    }

    #[test]
    fn filter_follows_level() {
        let targets = filter(&LogLevel::Warn);
        assert!(targets.would_enable("portico", &Level::WARN));
        assert!(!targets.would_enable("portico", &Level::INFO));
    }

    #[test]
    fn stack_noise_is_capped() {
        let targets = filter(&LogLevel::Trace);
        assert!(targets.would_enable("portico::access", &Level::TRACE));
        assert!(!targets.would_enable("hyper_util::client", &Level::DEBUG));
        assert!(targets.would_enable("rustls", &Level::INFO));
    }
}
