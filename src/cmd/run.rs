//! `portico run` - start the server.
//!
//! Resolves settings, builds the route table and TLS material, binds the
//! listener, and serves until SIGINT or SIGTERM. Every startup problem is
//! reported before the listener is bound.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cli::RunArgs;
use crate::config::{self, validation};
use crate::error::PorticoError;
use crate::lifecycle::Lifecycle;
use crate::logging;
use crate::routing::RouteTable;
use crate::server::{self, AppState};
use crate::tls;

pub async fn execute(args: RunArgs) -> Result<(), PorticoError> {
    let settings = config::load(&args.config)?;

    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&settings.log_level, log_format);

    let routes = RouteTable::build(&settings.routes)?;
    for route in routes.routes() {
        tracing::info!(
            pattern = %route.pattern(),
            target = %route.target(),
            proxy = route.target().is_proxy(),
            "route registered"
        );
    }

    let tls = tls::load(&settings.tls)?;
    let addr = validation::resolve_listen_addr(&settings.listen)?;

    let state = AppState::new(
        routes,
        tls.is_some(),
        Duration::from_secs(args.upstream_timeout),
    );
    let router = server::build_router(Arc::new(state));

    let shutdown = CancellationToken::new();
    let listening = Lifecycle::new(addr, shutdown.clone())
        .with_tls(tls)
        .with_grace_period(Duration::from_secs(args.grace_period))
        .bind()?;

    tokio::spawn(async move {
        server::shutdown_signal().await;
        shutdown.cancel();
    });

    listening.serve(router).await
}
