//! Reverse proxying to an upstream origin.
//!
//! [`forward`] rebuilds the matched request against the route's
//! [`UpstreamOrigin`], rewrites forwarded headers through
//! [`headers::forwarded_headers`], and streams the upstream response back
//! unchanged apart from hop-by-hop headers. Each request gets exactly one
//! attempt; failures surface as 502 and timeouts as 504.

pub mod headers;

use std::time::Duration;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{StatusCode, Uri, Version};
use axum::response::{IntoResponse, Response};

use crate::routing::UpstreamOrigin;
use crate::server::HttpClient;
use headers::ForwardedContext;

/// Outbound URI: the origin's scheme and authority, `base_path + remainder`
/// concatenated verbatim, and the inbound query string.
pub fn upstream_uri(
    origin: &UpstreamOrigin,
    remainder: &str,
    query: Option<&str>,
) -> Result<Uri, axum::http::Error> {
    let mut path_and_query = String::with_capacity(
        origin.base_path.len() + remainder.len() + query.map_or(0, |q| q.len() + 1),
    );
    path_and_query.push_str(&origin.base_path);
    path_and_query.push_str(remainder);
    if let Some(query) = query {
        path_and_query.push('?');
        path_and_query.push_str(query);
    }

    Uri::builder()
        .scheme(origin.scheme.clone())
        .authority(origin.authority.clone())
        .path_and_query(path_and_query)
        .build()
}

pub async fn forward(
    client: &HttpClient,
    origin: &UpstreamOrigin,
    remainder: &str,
    ctx: &ForwardedContext,
    request: Request,
    timeout: Duration,
) -> Response {
    let (parts, body) = request.into_parts();

    let uri = match upstream_uri(origin, remainder, parts.uri.query()) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(path = %parts.uri.path(), error = %e, "cannot build upstream URI");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let mut outbound = hyper::Request::new(body);
    *outbound.method_mut() = parts.method;
    *outbound.uri_mut() = uri.clone();
    *outbound.headers_mut() = headers::forwarded_headers(&parts.headers, ctx);
    // The upstream pool speaks HTTP/1.1 whatever the inbound version was.
    *outbound.version_mut() = Version::HTTP_11;

    match tokio::time::timeout(timeout, client.request(outbound)).await {
        Ok(Ok(upstream)) => {
            let (mut upstream_parts, incoming) = upstream.into_parts();
            headers::strip_hop_by_hop(&mut upstream_parts.headers);

            let mut response = Response::new(Body::new(incoming));
            *response.status_mut() = upstream_parts.status;
            *response.headers_mut() = upstream_parts.headers;
            response
        }
        Ok(Err(e)) => {
            tracing::warn!(upstream = %uri, error = %e, "upstream request failed");
            StatusCode::BAD_GATEWAY.into_response()
        }
        Err(_) => {
            tracing::warn!(
                upstream = %uri,
                timeout_secs = timeout.as_secs(),
                "upstream did not respond in time"
            );
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
    }
}
