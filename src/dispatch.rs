//! Request dispatch: path canonicalization, route lookup, and hand-off to
//! the static or proxy adapter.

use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{HOST, LOCATION};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::fileserver;
use crate::proxy::{self, headers::ForwardedContext};
use crate::routing::path::{clean_path, strip_port};
use crate::routing::Target;
use crate::server::AppState;

/// Router fallback handling every request.
pub async fn dispatch(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let path = request.uri().path().to_owned();

    if path.starts_with('/') {
        if let Cow::Owned(clean) = clean_path(&path) {
            let location = match request.uri().query() {
                Some(query) => format!("{clean}?{query}"),
                None => clean,
            };
            return moved_permanently(&location);
        }
    }

    let host = request_host(&request);
    let host_name = host
        .as_ref()
        .and_then(|h| h.to_str().ok())
        .map(strip_port);

    let Some(matched) = state.routes.lookup(host_name, &path) else {
        tracing::debug!(host = ?host_name, path = %path, "no route");
        return (StatusCode::NOT_FOUND, "404 not found").into_response();
    };

    match matched.route.target() {
        Target::LocalDirectory { path: root } => {
            fileserver::serve(root, matched.remainder, request).await
        }
        Target::UpstreamOrigin(origin) => {
            let ctx = ForwardedContext {
                host,
                remote_addr: request
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| *addr),
                tls: state.tls,
            };
            proxy::forward(
                &state.http_client,
                origin,
                matched.remainder,
                &ctx,
                request,
                state.upstream_timeout,
            )
            .await
        }
    }
}

/// The host the client addressed: the URI authority (HTTP/2
/// `:authority`, absolute-form requests) or else the `Host` header.
fn request_host(request: &Request) -> Option<HeaderValue> {
    request
        .uri()
        .authority()
        .and_then(|authority| HeaderValue::from_str(authority.as_str()).ok())
        .or_else(|| request.headers().get(HOST).cloned())
}

/// `301 Moved Permanently` with the given `Location`, used verbatim.
pub fn moved_permanently(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(location) => (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "400 bad request").into_response(),
    }
}
