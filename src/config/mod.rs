//! Configuration loading and merging.
//!
//! [`load`] produces the [`Settings`] the server runs with: built-in
//! defaults, replaced by values from an optional config file
//! ([`file`]), replaced in turn by command-line flags. Submodules hold
//! the serde file model and the listen-address validation.

pub mod file;
pub mod model;
pub mod validation;

use std::fmt;
use std::str::FromStr;

use crate::cli::{ConfigArgs, LogLevel};
use crate::error::PorticoError;
use model::Certificate;

pub const DEFAULT_LISTEN: &str = ":8000";

/// An unresolved `<source>=<target>` route as written by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub source: String,
    pub target: String,
}

impl RouteSpec {
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl FromStr for RouteSpec {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (source, target) = value
            .split_once('=')
            .ok_or_else(|| format!("'{value}' is missing '=' (expected <SOURCE>=<TARGET>)"))?;
        Ok(Self::new(source, target))
    }
}

impl fmt::Display for RouteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.source, self.target)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub listen: String,
    pub log_level: LogLevel,
    pub routes: Vec<RouteSpec>,
    pub tls: Vec<Certificate>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            log_level: LogLevel::Info,
            routes: vec![RouteSpec::new("/", ".")],
            tls: Vec::new(),
        }
    }
}

pub fn load(args: &ConfigArgs) -> Result<Settings, PorticoError> {
    let mut settings = Settings::default();

    if let Some(ref path) = args.config {
        file::load(path)?.apply_to(&mut settings);
    }

    if let Some(ref listen) = args.listen {
        settings.listen.clone_from(listen);
    }
    if let Some(ref level) = args.log_level {
        settings.log_level = level.clone();
    }
    if !args.routes.is_empty() {
        settings.routes.clone_from(&args.routes);
    }

    Ok(settings)
}
