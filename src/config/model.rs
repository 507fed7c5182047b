//! Serde data structures for the Portico configuration file.
//!
//! Contains [`FileConfig`] (the root), [`Routes`], [`RouteEntry`],
//! [`Tls`] and [`Certificate`]. All types use `deny_unknown_fields` for
//! strict parsing and every field is optional so a file may set only
//! what it needs.

use std::path::PathBuf;

use serde::Deserialize;

use super::{RouteSpec, Settings};
use crate::cli::LogLevel;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub listen: Option<String>,

    #[serde(default)]
    pub loglevel: Option<LogLevel>,

    #[serde(default)]
    pub routes: Routes,

    #[serde(default)]
    pub tls: Tls,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Routes {
    #[serde(default, rename = "static")]
    pub static_routes: Vec<RouteEntry>,

    #[serde(default, rename = "proxy")]
    pub proxy_routes: Vec<RouteEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteEntry {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tls {
    #[serde(default)]
    pub certificates: Vec<Certificate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Certificate {
    #[serde(rename = "certfile")]
    pub cert_file: PathBuf,

    #[serde(rename = "keyfile")]
    pub key_file: PathBuf,
}

impl Routes {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.static_routes.is_empty() && self.proxy_routes.is_empty()
    }

    /// Static routes first, then proxy routes, each in file order.
    #[must_use]
    pub fn to_specs(&self) -> Vec<RouteSpec> {
        self.static_routes
            .iter()
            .chain(&self.proxy_routes)
            .map(|r| RouteSpec::new(&r.source, &r.target))
            .collect()
    }
}

impl FileConfig {
    /// Overwrite `settings` with every value this file sets.
    pub fn apply_to(self, settings: &mut Settings) {
        if let Some(listen) = self.listen {
            settings.listen = listen;
        }
        if let Some(level) = self.loglevel {
            settings.log_level = level;
        }
        if !self.routes.is_empty() {
            settings.routes = self.routes.to_specs();
        }
        settings.tls = self.tls.certificates;
    }
}
