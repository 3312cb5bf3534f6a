//! TLS for both sides of the proxy
//!
//! - [`TlsAcceptor`] terminates client TLS on the listener, from a PEM
//!   certificate chain and private key.
//! - [`TlsManager`] opens TLS connections to backends, with roots from the
//!   system store and a Mozilla CA bundle fallback.
//!
//! Both use the ring crypto provider.

use crate::connection_error::ConnectionError;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{
    ClientConfig, DigitallySignedStruct, Error as RustlsError, RootCertStore, ServerConfig,
    SignatureScheme,
};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::{TlsConnector, client, server};
use tracing::{debug, warn};

/// TLS setup and handshake errors
#[derive(Error, Debug)]
pub enum TlsError {
    /// Failed to load certificate from file
    #[error("Failed to load certificate from {path}: {reason}")]
    CertificateLoad { path: PathBuf, reason: String },

    /// Failed to load private key from file
    #[error("Failed to load private key from {path}: {reason}")]
    PrivateKeyLoad { path: PathBuf, reason: String },

    /// Client-side TLS handshake failed
    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] std::io::Error),

    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    Config(String),
}

impl TlsError {
    fn cert_load(path: &Path, reason: impl Into<String>) -> Self {
        Self::CertificateLoad {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    fn key_load(path: &Path, reason: impl Into<String>) -> Self {
        Self::PrivateKeyLoad {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Load a PEM certificate chain
pub fn load_certificates(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let file = File::open(path).map_err(|e| TlsError::cert_load(path, e.to_string()))?;
    let mut reader = BufReader::new(file);

    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::cert_load(path, e.to_string()))?;

    if certs.is_empty() {
        return Err(TlsError::cert_load(path, "no certificates found in file"));
    }
    Ok(certs)
}

/// Load a PEM private key (PKCS#8, PKCS#1 or SEC1)
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let file = File::open(path).map_err(|e| TlsError::key_load(path, e.to_string()))?;
    let mut reader = BufReader::new(file);

    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| TlsError::key_load(path, e.to_string()))?
        .ok_or_else(|| TlsError::key_load(path, "no private key found in file"))
}

/// Server-side TLS for client connections
#[derive(Clone)]
pub struct TlsAcceptor {
    inner: tokio_rustls::TlsAcceptor,
}

impl std::fmt::Debug for TlsAcceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsAcceptor").finish_non_exhaustive()
    }
}

impl TlsAcceptor {
    /// Build an acceptor from PEM certificate chain and key files
    pub fn from_pem_files(cert_path: &Path, key_path: &Path) -> Result<Self, TlsError> {
        let certs = load_certificates(cert_path)?;
        let key = load_private_key(key_path)?;

        let server_config =
            ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
                .with_safe_default_protocol_versions()
                .map_err(|e| TlsError::Config(format!("Failed to set protocol versions: {}", e)))?
                .with_no_client_auth()
                .with_single_cert(certs, key)
                .map_err(|e| TlsError::Config(format!("Failed to build TLS config: {}", e)))?;

        Ok(Self {
            inner: tokio_rustls::TlsAcceptor::from(Arc::new(server_config)),
        })
    }

    /// Perform the server side of the TLS handshake
    pub async fn accept(&self, stream: TcpStream) -> Result<server::TlsStream<TcpStream>, TlsError> {
        self.inner.accept(stream).await.map_err(TlsError::Handshake)
    }
}

/// Certificate verifier that accepts every certificate
///
/// Installed for backends with `tls_verify_cert = false`, typically
/// providers presenting self-signed or mismatched certificates.
#[derive(Debug)]
struct NoVerifier;

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Client-side TLS connector with cached configuration
///
/// Root certificates are loaded once at construction and shared by every
/// backend connection made through this manager.
#[derive(Clone)]
pub struct TlsManager {
    verify_cert: bool,
    connector: TlsConnector,
}

impl std::fmt::Debug for TlsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsManager")
            .field("verify_cert", &self.verify_cert)
            .finish_non_exhaustive()
    }
}

impl TlsManager {
    /// Create a connector, verifying server certificates unless `verify_cert` is false
    pub fn new(verify_cert: bool) -> Result<Self, TlsError> {
        let builder =
            ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
                .with_safe_default_protocol_versions()
                .map_err(|e| TlsError::Config(format!("Failed to set protocol versions: {}", e)))?;

        let client_config = if verify_cert {
            let (root_store, sources) = load_root_store();
            debug!("TLS: Initialized with certificate sources: {}", sources.join(", "));
            builder
                .with_root_certificates(root_store)
                .with_no_client_auth()
        } else {
            warn!("TLS: Certificate verification DISABLED for some backends");
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerifier))
                .with_no_client_auth()
        };

        Ok(Self {
            verify_cert,
            connector: TlsConnector::from(Arc::new(client_config)),
        })
    }

    /// Whether this manager verifies server certificates
    pub fn verifies_certificates(&self) -> bool {
        self.verify_cert
    }

    /// Perform the client side of the TLS handshake with a backend
    pub async fn handshake(
        &self,
        stream: TcpStream,
        hostname: &str,
        backend_name: &str,
    ) -> Result<client::TlsStream<TcpStream>, ConnectionError> {
        let domain = ServerName::try_from(hostname.to_string())
            .map_err(|_| ConnectionError::InvalidServerName(hostname.to_string()))?;

        debug!("TLS: Connecting to {} ({})", backend_name, hostname);

        self.connector
            .connect(domain, stream)
            .await
            .map_err(|source| ConnectionError::TlsHandshake {
                backend: backend_name.to_string(),
                source,
            })
    }
}

/// System roots, falling back to the Mozilla bundle when none load
fn load_root_store() -> (RootCertStore, Vec<&'static str>) {
    let mut root_store = RootCertStore::empty();
    let mut sources = Vec::new();

    let native = rustls_native_certs::load_native_certs();
    for error in &native.errors {
        warn!("TLS: Certificate loading error: {}", error);
    }
    let (added, _ignored) = root_store.add_parsable_certificates(native.certs);
    if added > 0 {
        debug!("TLS: Loaded {} certificates from system store", added);
        sources.push("system certificates");
    }

    if root_store.is_empty() {
        debug!("TLS: No system certificates available, using Mozilla CA bundle fallback");
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        sources.push("Mozilla CA bundle");
    }

    (root_store, sources)
}
