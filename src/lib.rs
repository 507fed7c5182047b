//! Portico is an HTTP edge server.
//!
//! It accepts HTTP/1.1 and HTTP/2 connections, optionally over TLS, and
//! dispatches each request by longest-prefix match on host and path to
//! one of two kinds of target: a local directory served as static files,
//! or an upstream origin reached through a reverse proxy.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, validate).
//! - [`config`] -- Settings from defaults, an optional config file, and flags.
//! - [`dispatch`] -- Path canonicalization and hand-off to the matched adapter.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`fileserver`] -- Static file adapter for local-directory targets.
//! - [`lifecycle`] -- Bind, serve, graceful drain, and stop.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`middleware`] -- Per-request access logging.
//! - [`proxy`] -- Reverse proxy adapter and forwarded-header rewriting.
//! - [`routing`] -- Route compilation, target resolution, and lookup.
//! - [`server`] -- Shared application state, router, HTTP client, and signals.
//! - [`tls`] -- Certificate loading and SNI selection.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |
//! | `file-backends` | All file format backends |
//! | `full` | All features |

// Binary crate: public items exist for the integration tests.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fileserver;
pub mod lifecycle;
pub mod logging;
pub mod middleware;
pub mod proxy;
pub mod routing;
pub mod server;
pub mod tls;
