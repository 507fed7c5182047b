//! Per-request access logging.
//!
//! The record is written when the response body is dropped, so the byte
//! count and duration cover the whole streamed body rather than just the
//! time to the first header.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::extract::Request;
use axum::http::header::USER_AGENT;
use axum::http::{Method, StatusCode, Version};
use axum::middleware::Next;
use axum::response::Response;
use bytes::Bytes;
use hyper::body::{Body as HttpBody, Frame, SizeHint};

pub const TARGET: &str = "portico::access";

pub async fn log_request(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let version = request.version();
    let path = request.uri().path().to_owned();
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    let response = next.run(request).await;

    let record = AccessRecord {
        method,
        version,
        path,
        status: response.status(),
        user_agent,
        bytes: 0,
        started,
    };
    response.map(|inner| Body::new(CountingBody { inner, record }))
}

#[derive(Debug)]
struct AccessRecord {
    method: Method,
    version: Version,
    path: String,
    status: StatusCode,
    user_agent: String,
    bytes: u64,
    started: Instant,
}

impl AccessRecord {
    fn emit(&self) {
        let elapsed = self.started.elapsed();
        tracing::info!(
            target: TARGET,
            status = self.status.as_u16(),
            method = %self.method,
            version = ?self.version,
            path = %self.path,
            bytes = self.bytes,
            duration_ms = elapsed.as_secs_f64() * 1000.0,
            user_agent = %self.user_agent,
            "request completed"
        );
    }
}

struct CountingBody {
    inner: Body,
    record: AccessRecord,
}

impl HttpBody for CountingBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let poll = Pin::new(&mut self.inner).poll_frame(cx);
        if let Poll::Ready(Some(Ok(frame))) = &poll {
            if let Some(data) = frame.data_ref() {
                self.record.bytes += data.len() as u64;
            }
        }
        poll
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for CountingBody {
    fn drop(&mut self) {
        self.record.emit();
    }
}
