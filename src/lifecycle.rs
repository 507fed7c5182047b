//! Listener lifecycle: bind, serve, drain, stop.
//!
//! A [`Lifecycle`] moves through [`Phase::Idle`], [`Phase::Listening`],
//! [`Phase::ShuttingDown`] and [`Phase::Stopped`], and publishes every
//! transition on a `watch` channel. Shutdown is requested by cancelling
//! the [`CancellationToken`] handed to [`Lifecycle::new`]; the OS signal
//! listener lives in [`server::shutdown_signal`](crate::server::shutdown_signal).
//!
//! Once cancelled, the listener stops accepting and in-flight requests
//! get the grace period to finish. Connections still open after that are
//! closed forcefully, and [`Listening::serve`] returns `Ok(())` either way.
//! If the accept loop stops on its own, accepted connections are drained
//! the same way before [`PorticoError::Transport`] is returned.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::PorticoError;

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Listening,
    ShuttingDown,
    Stopped,
}

pub struct Lifecycle {
    addr: SocketAddr,
    tls: Option<RustlsConfig>,
    grace_period: Duration,
    shutdown: CancellationToken,
    phase: watch::Sender<Phase>,
}

impl Lifecycle {
    #[must_use]
    pub fn new(addr: SocketAddr, shutdown: CancellationToken) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            addr,
            tls: None,
            grace_period: DEFAULT_GRACE_PERIOD,
            shutdown,
            phase,
        }
    }

    #[must_use]
    pub fn with_tls(mut self, tls: Option<RustlsConfig>) -> Self {
        self.tls = tls;
        self
    }

    #[must_use]
    pub const fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Bind the TCP listener. Failure here is fatal and leaves the
    /// lifecycle in [`Phase::Idle`].
    pub fn bind(self) -> Result<Listening, PorticoError> {
        let addr = self.addr;
        let bind_error = move |source: io::Error| PorticoError::Bind { addr, source };

        let listener = TcpListener::bind(addr).map_err(bind_error)?;
        listener.set_nonblocking(true).map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        self.phase.send_replace(Phase::Listening);
        tracing::info!(
            addr = %local_addr,
            tls = self.tls.is_some(),
            "listening"
        );

        Ok(Listening {
            listener,
            local_addr,
            lifecycle: self,
        })
    }
}

/// A bound listener that has not started accepting yet.
pub struct Listening {
    listener: TcpListener,
    local_addr: SocketAddr,
    lifecycle: Lifecycle,
}

impl Listening {
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.lifecycle.subscribe()
    }

    /// Serve `router` until the shutdown token is cancelled or the
    /// transport fails.
    pub async fn serve(self, router: Router) -> Result<(), PorticoError> {
        let Self {
            listener,
            lifecycle,
            ..
        } = self;
        let Lifecycle {
            tls,
            grace_period,
            shutdown,
            phase,
            ..
        } = lifecycle;

        let handle = Handle::new();
        let service = router.into_make_service_with_connect_info::<SocketAddr>();
        let server = async {
            match tls {
                Some(config) => {
                    axum_server::from_tcp_rustls(listener, config)
                        .handle(handle.clone())
                        .serve(service)
                        .await
                }
                None => {
                    axum_server::from_tcp(listener)
                        .handle(handle.clone())
                        .serve(service)
                        .await
                }
            }
        };
        tokio::pin!(server);

        let outcome = tokio::select! {
            result = &mut server => Some(result),
            () = shutdown.cancelled() => None,
        };

        phase.send_replace(Phase::ShuttingDown);

        let result = match outcome {
            None => {
                tracing::info!(
                    grace_period_secs = grace_period.as_secs(),
                    connections = handle.connection_count(),
                    "shutting down, draining connections"
                );
                handle.graceful_shutdown(Some(grace_period));
                if let Err(e) = server.await {
                    tracing::warn!(error = %e, "error while draining connections");
                }
                Ok(())
            }
            Some(Ok(())) => Err(drain_after_failure(
                &handle,
                grace_period,
                io::Error::other("listener stopped accepting connections"),
            )
            .await),
            Some(Err(e)) => Err(drain_after_failure(&handle, grace_period, e).await),
        };

        phase.send_replace(Phase::Stopped);
        tracing::info!("stopped");
        result
    }
}

/// The accept loop ended on its own. Connections it already accepted
/// still get the grace period before they are closed.
async fn drain_after_failure(handle: &Handle, grace_period: Duration, error: io::Error) -> PorticoError {
    tracing::error!(
        error = %error,
        connections = handle.connection_count(),
        "listener failed, draining connections"
    );
    handle.graceful_shutdown(Some(grace_period));

    let drained = tokio::time::timeout(grace_period, async {
        while handle.connection_count() > 0 {
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            connections = handle.connection_count(),
            "grace period elapsed, closing remaining connections"
        );
        handle.shutdown();
    }

    PorticoError::Transport(error)
}
