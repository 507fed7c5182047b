//! Forwarded-header rewriting and hop-by-hop stripping.
//!
//! [`forwarded_headers`] is a pure function from the inbound request's
//! headers plus its [`ForwardedContext`] to the outbound header map. It
//! copies every end-to-end header, then rewrites `X-Forwarded-For`,
//! `Host` and `X-Forwarded-Proto`.

use std::net::SocketAddr;
use std::sync::LazyLock;

use axum::http::header::{CONNECTION, HOST};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub static X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "proxy-authenticate",
        "proxy-authorization",
        "te",
        "trailer",
        "transfer-encoding",
        "upgrade",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// What the proxy knows about the inbound hop.
#[derive(Debug, Clone, Default)]
pub struct ForwardedContext {
    /// The inbound `Host` (or HTTP/2 `:authority`), port included.
    pub host: Option<HeaderValue>,
    /// Peer address of the inbound connection, when known.
    pub remote_addr: Option<SocketAddr>,
    /// Whether the inbound connection was TLS-terminated by this server.
    pub tls: bool,
}

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| name.trim().parse::<HeaderName>().ok())
        .collect();

    for name in HOP_BY_HOP.iter().chain(&listed) {
        headers.remove(name);
    }
}

#[must_use]
pub fn forwarded_headers(inbound: &HeaderMap, ctx: &ForwardedContext) -> HeaderMap {
    let mut headers = inbound.clone();
    strip_hop_by_hop(&mut headers);

    // X-Forwarded-For: append the caller to any prior chain
    match ctx.remote_addr {
        Some(addr) => {
            let mut chain = Vec::new();
            for prior in inbound.get_all(&X_FORWARDED_FOR) {
                chain.extend_from_slice(prior.as_bytes());
                chain.extend_from_slice(b", ");
            }
            chain.extend_from_slice(addr.ip().to_string().as_bytes());
            match HeaderValue::from_bytes(&chain) {
                Ok(val) => {
                    headers.insert(&X_FORWARDED_FOR, val);
                }
                Err(_) => {
                    headers.remove(&X_FORWARDED_FOR);
                }
            }
        }
        None => {
            headers.remove(&X_FORWARDED_FOR);
        }
    }

    // Host: the client-facing host, preferring one forwarded by an earlier proxy
    let host = inbound
        .get(&X_FORWARDED_HOST)
        .filter(|v| !v.is_empty())
        .or(ctx.host.as_ref());
    match host {
        Some(host) => {
            headers.insert(HOST, host.clone());
        }
        None => {
            headers.remove(HOST);
        }
    }

    // X-Forwarded-Proto: keep an earlier proxy's value
    if inbound
        .get(&X_FORWARDED_PROTO)
        .map_or(true, HeaderValue::is_empty)
    {
        let proto = if ctx.tls { "https" } else { "http" };
        headers.insert(&X_FORWARDED_PROTO, HeaderValue::from_static(proto));
    }

    headers
}
