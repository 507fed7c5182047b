//! Static file serving for local-directory routes.
//!
//! Regular files go through [`tower_http::services::ServeFile`], which
//! handles `Last-Modified`, `If-Modified-Since`, `Range` and content-type
//! detection. Directories are only ever served through their
//! `index.html`; there are no listings.

use std::io;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::dispatch::moved_permanently;

const INDEX_FILE: &str = "index.html";

/// Serve `remainder` from `root`.
///
/// `remainder` is the request path with the route prefix stripped, still
/// percent-encoded; it always starts with `/`. Directory redirects look at
/// the request's own path, so a route mounted at `/docs` sends `/docs` to
/// `docs/`.
pub async fn serve(root: &Path, remainder: &str, request: Request) -> Response {
    if remainder.ends_with("/index.html") {
        return moved_permanently("./");
    }

    let Some(path) = resolve(root, remainder) else {
        return not_found();
    };

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) => metadata,
        Err(e) => return fs_error(&path, &e),
    };

    if !metadata.is_dir() {
        return serve_file(ServeFile::new(&path), request).await;
    }

    let index = path.join(INDEX_FILE);
    match tokio::fs::metadata(&index).await {
        Ok(metadata) if metadata.is_file() => {}
        Ok(_) => return not_found(),
        Err(e) => return fs_error(&index, &e),
    }

    let request_path = request.uri().path();
    if !request_path.ends_with('/') {
        let base = request_path.rsplit('/').next().unwrap_or_default();
        return moved_permanently(&format!("{base}/"));
    }

    serve_file(
        ServeFile::new_with_mime(&index, &mime::TEXT_HTML_UTF_8),
        request,
    )
    .await
}

/// Map a request remainder onto the filesystem below `root`.
///
/// Returns `None` for undecodable paths and for any `..` segment, so a
/// request can never escape the served directory.
fn resolve(root: &Path, remainder: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(remainder).decode_utf8().ok()?;

    let mut path = root.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s if s.contains('\0') || s.contains('\\') => return None,
            s => path.push(s),
        }
    }
    Some(path)
}

async fn serve_file(service: ServeFile, request: Request) -> Response {
    service
        .oneshot(request)
        .await
        .map(|response| response.map(Body::new))
        .unwrap_or_else(|never| match never {})
}

fn fs_error(path: &Path, err: &io::Error) -> Response {
    match err.kind() {
        io::ErrorKind::NotFound => not_found(),
        io::ErrorKind::PermissionDenied => {
            tracing::debug!(path = %path.display(), "permission denied");
            (StatusCode::FORBIDDEN, "403 forbidden").into_response()
        }
        _ => {
            tracing::warn!(path = %path.display(), error = %err, "cannot stat file");
            not_found()
        }
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 not found").into_response()
}
