//! Tower middleware layers.
//!
//! [`access_log`] emits one structured record per completed request.
//! Forwarded-header rewriting lives with the proxy in
//! [`proxy::headers`](crate::proxy::headers).

pub mod access_log;
