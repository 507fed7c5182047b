//! TLS certificate loading and SNI-based certificate selection.
//!
//! Every configured certificate pair is read and parsed once, before the
//! listener is bound. During the handshake the client's SNI name picks
//! the first certificate valid for it; clients without SNI, or names no
//! certificate covers, get the first configured pair.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::{ClientHello, ResolvesServerCert, ResolvesServerCertUsingSni};
use rustls::sign::CertifiedKey;
use rustls::ServerConfig;

use crate::config::model::Certificate;
use crate::error::PorticoError;

/// Build the server-side TLS configuration, or `None` when no
/// certificates are configured and the listener should stay plain TCP.
pub fn load(certificates: &[Certificate]) -> Result<Option<RustlsConfig>, PorticoError> {
    let Some(first) = certificates.first() else {
        return Ok(None);
    };

    let keys = certificates
        .iter()
        .map(load_certified_key)
        .collect::<Result<Vec<_>, _>>()?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| tls_error(&first.cert_file, &e))?
        .with_no_client_auth()
        .with_cert_resolver(Arc::new(SniResolver { keys }));
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(Some(RustlsConfig::from_config(Arc::new(config))))
}

fn load_certified_key(pair: &Certificate) -> Result<Arc<CertifiedKey>, PorticoError> {
    let certs = read_certs(&pair.cert_file)?;
    let key = read_private_key(&pair.key_file)?;
    let signing_key = rustls::crypto::ring::sign::any_supported_type(&key)
        .map_err(|e| tls_error(&pair.key_file, &e))?;

    tracing::debug!(
        cert = %pair.cert_file.display(),
        chain_len = certs.len(),
        "loaded TLS certificate"
    );
    Ok(Arc::new(CertifiedKey::new(certs, signing_key)))
}

fn read_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, PorticoError> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| tls_error(path, &e))?;
    if certs.is_empty() {
        return Err(tls_error(path, &"no PEM certificates found"));
    }
    Ok(certs)
}

fn read_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, PorticoError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| tls_error(path, &e))?
        .ok_or_else(|| tls_error(path, &"no PEM private key found"))
}

fn open(path: &Path) -> Result<BufReader<File>, PorticoError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| tls_error(path, &e))
}

fn tls_error(path: &Path, message: &dyn std::fmt::Display) -> PorticoError {
    PorticoError::Tls {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

#[derive(Debug)]
struct SniResolver {
    /// Never empty; the first entry is the fallback.
    keys: Vec<Arc<CertifiedKey>>,
}

impl SniResolver {
    fn key_for_name(&self, name: &str) -> Option<&Arc<CertifiedKey>> {
        self.keys.iter().find(|key| {
            // `add` only accepts a certificate that is valid for `name`.
            ResolvesServerCertUsingSni::new()
                .add(name, CertifiedKey::clone(key))
                .is_ok()
        })
    }
}

impl ResolvesServerCert for SniResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        client_hello
            .server_name()
            .and_then(|name| self.key_for_name(name))
            .or_else(|| self.keys.first())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/tls")
            .join(name)
    }

    fn pair(name: &str) -> Certificate {
        Certificate {
            cert_file: fixture(&format!("{name}.crt")),
            key_file: fixture(&format!("{name}.key")),
        }
    }

    fn resolver() -> SniResolver {
        SniResolver {
            keys: vec![
                load_certified_key(&pair("localhost")).unwrap(),
                load_certified_key(&pair("example")).unwrap(),
            ],
        }
    }

    #[test]
    fn no_certificates_means_plain_tcp() {
        assert!(load(&[]).unwrap().is_none());
    }

    #[test]
    fn loads_multiple_pairs() {
        let config = load(&[pair("localhost"), pair("example")]).unwrap();
        assert!(config.is_some());
    }

    #[test]
    fn missing_certificate_file_names_the_path() {
        let missing = Certificate {
            cert_file: fixture("nope.crt"),
            key_file: fixture("localhost.key"),
        };
        let err = load(&[missing]).unwrap_err();
        assert!(matches!(err, PorticoError::Tls { .. }));
        assert!(err.to_string().contains("nope.crt"));
    }

    #[test]
    fn key_in_certificate_slot_is_rejected() {
        let swapped = Certificate {
            cert_file: fixture("localhost.key"),
            key_file: fixture("localhost.key"),
        };
        let err = load(&[swapped]).unwrap_err();
        assert!(err.to_string().contains("no PEM certificates"));
    }

    #[test]
    fn certificate_in_key_slot_is_rejected() {
        let swapped = Certificate {
            cert_file: fixture("localhost.crt"),
            key_file: fixture("localhost.crt"),
        };
        let err = load(&[swapped]).unwrap_err();
        assert!(err.to_string().contains("no PEM private key"));
    }

    #[test]
    fn sni_name_selects_matching_certificate() {
        let resolver = resolver();
        let picked = resolver.key_for_name("example.test").unwrap();
        assert!(Arc::ptr_eq(picked, &resolver.keys[1]));

        let picked = resolver.key_for_name("localhost").unwrap();
        assert!(Arc::ptr_eq(picked, &resolver.keys[0]));
    }

    #[test]
    fn unknown_sni_name_has_no_match() {
        assert!(resolver().key_for_name("other.test").is_none());
    }
}
