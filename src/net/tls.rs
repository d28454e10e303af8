//! TLS configuration and certificate loading.
//!
//! PEM files are parsed with `rustls-pemfile` before being handed to
//! axum-server, so a bad certificate or key is reported at startup with the
//! offending path instead of as an opaque handshake failure.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no certificates found in {0}")]
    NoCertificates(PathBuf),

    #[error("no private key found in {0}")]
    NoPrivateKey(PathBuf),
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path).map(BufReader::new).map_err(|source| TlsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Check that `cert_path` holds at least one certificate and `key_path` a private key.
pub fn validate_pem_files(cert_path: &Path, key_path: &Path) -> Result<usize, TlsError> {
    let certs = rustls_pemfile::certs(&mut open(cert_path)?)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Io {
            path: cert_path.to_path_buf(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(cert_path.to_path_buf()));
    }

    match rustls_pemfile::private_key(&mut open(key_path)?) {
        Ok(Some(_)) => Ok(certs.len()),
        Ok(None) => Err(TlsError::NoPrivateKey(key_path.to_path_buf())),
        Err(source) => Err(TlsError::Io {
            path: key_path.to_path_buf(),
            source,
        }),
    }
}

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, TlsError> {
    let chain_len = validate_pem_files(cert_path, key_path)?;
    tracing::debug!(cert = %cert_path.display(), chain_len, "Loaded TLS certificate chain");

    RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|source| TlsError::Io {
            path: cert_path.to_path_buf(),
            source,
        })
}
