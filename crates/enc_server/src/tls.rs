//! Self-provisioned TLS material.
//!
//! On first boot a self-signed certificate and key are generated. Later boots
//! reuse them. The SHA-256 fingerprint of the certificate is logged so an
//! operator can verify it out of band when accepting the browser exception.

use crate::error::{ServerError, ServerResult};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Common name of generated certificates.
pub const CERTIFICATE_CN: &str = "ENC Secret Store";

/// Locations and names for the server certificate.
#[derive(Debug, Clone)]
pub struct TlsPaths {
    /// PEM certificate path.
    pub certificate: PathBuf,
    /// PEM private key path.
    pub key: PathBuf,
    /// Host names added as SANs besides `localhost` and `127.0.0.1`.
    pub hosts: Vec<String>,
}

impl TlsPaths {
    /// Creates paths with no extra host names.
    pub fn new(certificate: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        Self {
            certificate: certificate.into(),
            key: key.into(),
            hosts: Vec::new(),
        }
    }

    /// Adds SAN host names.
    pub fn with_hosts(mut self, hosts: impl IntoIterator<Item = String>) -> Self {
        self.hosts.extend(hosts);
        self
    }

    fn subject_alt_names(&self) -> Vec<String> {
        let mut names = vec!["localhost".to_string(), "127.0.0.1".to_string()];
        for host in &self.hosts {
            if !host.is_empty() && host != "0.0.0.0" && !names.contains(host) {
                names.push(host.clone());
            }
        }
        names
    }
}

/// Generates certificate and key unless both already exist.
///
/// Returns `true` if new material was generated. If only one of the two files
/// exists, both are regenerated.
///
/// # Errors
///
/// Returns `CertificateWriteFailure` if generation fails or either file
/// cannot be written.
pub fn ensure_certificate(paths: &TlsPaths) -> ServerResult<bool> {
    if paths.certificate.exists() && paths.key.exists() {
        debug!(certificate = %paths.certificate.display(), "reusing TLS certificate");
        return Ok(false);
    }

    info!("TLS certificate files not found, generating new ones");

    let mut params = CertificateParams::new(paths.subject_alt_names())
        .map_err(|e| ServerError::CertificateWriteFailure(format!("invalid host name: {e}")))?;
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, CERTIFICATE_CN);
    params.distinguished_name = dn;

    let key_pair = KeyPair::generate()
        .map_err(|e| ServerError::CertificateWriteFailure(format!("key generation: {e}")))?;
    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| ServerError::CertificateWriteFailure(format!("self-signing: {e}")))?;

    write_file(&paths.key, key_pair.serialize_pem().as_bytes(), true)?;
    write_file(&paths.certificate, cert.pem().as_bytes(), false)?;

    info!(
        certificate = %paths.certificate.display(),
        key = %paths.key.display(),
        "new key and certificate generated, add them as an exception to your browser"
    );
    Ok(true)
}

fn write_file(path: &Path, contents: &[u8], private: bool) -> ServerResult<()> {
    let fail = |e: std::io::Error| {
        ServerError::CertificateWriteFailure(format!("{}: {e}", path.display()))
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(fail)?;
    }
    fs::write(path, contents).map_err(fail)?;

    #[cfg(unix)]
    if private {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(fail)?;
    }
    #[cfg(not(unix))]
    let _ = private;

    Ok(())
}

/// Returns the lowercase hex SHA-256 fingerprint of a PEM certificate.
///
/// # Errors
///
/// Returns `Certificate` if the file cannot be read, is not PEM, or does not
/// hold an X.509 certificate.
pub fn fingerprint(path: &Path) -> ServerResult<String> {
    let pem_data = fs::read(path)
        .map_err(|e| ServerError::Certificate(format!("cannot read {}: {e}", path.display())))?;
    fingerprint_pem(&pem_data)
}

/// Fingerprint of PEM certificate bytes.
pub fn fingerprint_pem(pem_data: &[u8]) -> ServerResult<String> {
    use x509_parser::pem::parse_x509_pem;

    let (_, pem) = parse_x509_pem(pem_data)
        .map_err(|e| ServerError::Certificate(format!("failed to parse PEM: {e}")))?;
    pem.parse_x509()
        .map_err(|e| ServerError::Certificate(format!("failed to parse X.509: {e}")))?;

    Ok(hex::encode(Sha256::digest(&pem.contents)))
}
