//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, validate), and their associated argument structs.
//! Configuration flags are shared through [`ConfigArgs`] and each has an
//! environment variable equivalent for container deployments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use crate::config::RouteSpec;

#[derive(Parser)]
#[command(
    name = "portico",
    version,
    about = "HTTP edge server: static files and reverse proxying per route",
    propagate_version = true,
    args_conflicts_with_subcommands = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        portico run                                  Serve ./ on :8000\n  \
        portico run -r /=/var/www -r /api=http://localhost:3000\n  \
        portico run -c portico.yaml                  Start with a config file"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Options for running without a subcommand, which behaves like `run`.
    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the server
    Run(Box<RunArgs>),

    /// Resolve routes and certificates without starting
    Validate(ValidateArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct ConfigArgs {
    /// Config file path (.yaml, .json, .toml)
    #[arg(short, long, env = "PORTICO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on [default: :8000]
    #[arg(short, long, env = "PORTICO_LISTEN")]
    pub listen: Option<String>,

    /// Log level [default: info]
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Route as <SOURCE>=<TARGET>, repeatable [default: /=.]
    ///
    /// SOURCE is a path such as /api, optionally prefixed by a hostname
    /// (www.example.com/api) to match only requests for that host.
    /// TARGET is a local directory (/var/www/html) or a URL to proxy to
    /// (https://www.example.com/v1). The matched source path is stripped
    /// from the request and the rest is appended to the target, so with
    /// `-r /api=https://www.example.com/v1 -r /=/var/www/html`:
    ///   /index.html  -> /var/www/html/index.html
    ///   /api/pets/1  -> https://www.example.com/v1/pets/1
    ///
    /// Routes given here replace all routes from the config file.
    #[arg(short, long = "route", value_name = "SOURCE=TARGET", verbatim_doc_comment)]
    pub routes: Vec<RouteSpec>,
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        portico run -r /=./public                     Static site\n  \
        portico run -c portico.yaml --pretty          Local dev mode\n  \
        portico run -l 127.0.0.1:8080 -r /=http://localhost:3000")]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    // -- Logging --
    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Tuning --
    /// Seconds in-flight requests may take to finish after a shutdown signal
    #[arg(
        long,
        env = "GRACE_PERIOD_SECS",
        default_value_t = 30,
        help_heading = "Tuning"
    )]
    pub grace_period: u64,

    /// Seconds to wait for an upstream to start responding
    #[arg(
        long,
        env = "UPSTREAM_TIMEOUT_SECS",
        default_value_t = 60,
        help_heading = "Tuning"
    )]
    pub upstream_timeout: u64,
}

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_accepts_repeated_routes() {
        let cli = Cli::parse_from([
            "portico",
            "run",
            "-r",
            "/=/www",
            "--route",
            "example.com/api=http://up/v1",
            "--log-level",
            "warn",
        ]);
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config.routes.len(), 2);
        assert_eq!(args.config.routes[1].source, "example.com/api");
        assert_eq!(args.config.routes[1].target, "http://up/v1");
        assert_eq!(args.config.log_level, Some(LogLevel::Warn));
        assert_eq!(args.grace_period, 30);
    }

    #[test]
    fn route_without_equals_is_rejected() {
        let result = Cli::try_parse_from(["portico", "run", "-r", "/www"]);
        assert!(result.is_err());
    }

    #[test]
    fn no_subcommand_runs_with_defaults() {
        let cli = Cli::parse_from(["portico"]);
        assert!(cli.command.is_none());
        assert!(cli.run.config.routes.is_empty());
        assert_eq!(cli.run.upstream_timeout, 60);
    }

    #[test]
    fn run_flags_work_without_subcommand() {
        let cli = Cli::parse_from(["portico", "-r", "/=/www", "-l", ":9000"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.run.config.routes[0].target, "/www");
        assert_eq!(cli.run.config.listen.as_deref(), Some(":9000"));
    }

    #[test]
    fn top_level_flags_conflict_with_subcommands() {
        let result = Cli::try_parse_from(["portico", "-r", "/=/www", "validate"]);
        assert!(result.is_err());
    }
}
