//! Route target classification and eager validation.
//!
//! A target string is either a filesystem path (optionally written as a
//! `file://` URL) or an `http(s)://` URL. [`Target::resolve`] decides
//! which once, at startup, and checks the directory exists.

use std::fmt;
use std::path::{Path, PathBuf};

use http::uri::{Authority, Scheme};
use url::Url;

#[derive(Debug, Clone)]
pub enum Target {
    LocalDirectory { path: PathBuf },
    UpstreamOrigin(UpstreamOrigin),
}

#[derive(Debug, Clone)]
pub struct UpstreamOrigin {
    pub scheme: Scheme,
    pub authority: Authority,
    /// Escaped path of the target URL without a trailing slash. Empty for
    /// targets that name only an origin.
    pub base_path: String,
}

impl Target {
    /// Classify and validate a route target. Returns a human-readable error.
    pub fn resolve(raw: &str) -> Result<Self, String> {
        match Url::parse(raw) {
            Ok(url) => match url.scheme() {
                "http" | "https" => UpstreamOrigin::from_url(&url).map(Self::UpstreamOrigin),
                // Only the path of a file URL is used; query and fragment are ignored.
                "file" => {
                    let path = url
                        .to_file_path()
                        .map_err(|()| format!("'{raw}' is not a usable file URL"))?;
                    local_directory(&path)
                }
                other => Err(format!(
                    "unsupported scheme '{other}' (expected a directory, file, http or https)"
                )),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => local_directory(Path::new(raw)),
            Err(e) => Err(format!("'{raw}' is not a valid URL: {e}")),
        }
    }

    #[must_use]
    pub const fn is_proxy(&self) -> bool {
        matches!(self, Self::UpstreamOrigin(_))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalDirectory { path } => write!(f, "{}", path.display()),
            Self::UpstreamOrigin(origin) => write!(
                f,
                "{}://{}{}",
                origin.scheme, origin.authority, origin.base_path
            ),
        }
    }
}

impl UpstreamOrigin {
    fn from_url(url: &Url) -> Result<Self, String> {
        let host = url
            .host_str()
            .ok_or_else(|| format!("'{url}' has no host"))?;
        let authority = url
            .port()
            .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));
        let authority = authority
            .parse::<Authority>()
            .map_err(|e| format!("'{url}' has an invalid host: {e}"))?;
        let scheme = if url.scheme() == "https" {
            Scheme::HTTPS
        } else {
            Scheme::HTTP
        };

        Ok(Self {
            scheme,
            authority,
            base_path: url.path().trim_end_matches('/').to_string(),
        })
    }
}

fn local_directory(raw: &Path) -> Result<Target, String> {
    // Rebuilding from components drops trailing slashes.
    let path: PathBuf = raw.components().collect();
    let display = if path.as_os_str().is_empty() {
        raw.display().to_string()
    } else {
        path.display().to_string()
    };

    let info = std::fs::metadata(&path).map_err(|e| format!("{display}: {e}"))?;
    if !info.is_dir() {
        return Err(format!("{display}: not a directory"));
    }
    Ok(Target::LocalDirectory { path })
}
