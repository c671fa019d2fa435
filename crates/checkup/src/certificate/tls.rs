//! Certificate inspection over a live TLS handshake.
//!
//! The handshake is allowed to complete whatever the chain looks like so the
//! leaf can still be read for expiry. Whether the chain verified against the
//! native roots is recorded on the side and reported as `valid`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use super::CertificateInspector;
use crate::error::TransportError;
use crate::types::CertificateInfo;

const SECONDS_PER_DAY: i64 = 86_400;

/// Inspects certificates with rustls, verifying against the platform roots
pub struct TlsCertificateInspector {
    verifier: Arc<WebPkiServerVerifier>,
}

impl TlsCertificateInspector {
    /// Load the platform's native root certificates
    pub fn with_native_roots() -> crate::Result<Self> {
        let native = rustls_native_certs::load_native_certs();
        for error in &native.errors {
            warn!("Failed to load a native root certificate: {error}");
        }

        let mut roots = RootCertStore::empty();
        let (added, ignored) = roots.add_parsable_certificates(native.certs);
        debug!(added, ignored, "Loaded native root certificates");

        Self::with_roots(roots)
    }

    pub fn with_roots(roots: RootCertStore) -> crate::Result<Self> {
        let verifier = WebPkiServerVerifier::builder(Arc::new(roots)).build()?;
        Ok(Self { verifier })
    }
}

#[async_trait]
impl CertificateInspector for TlsCertificateInspector {
    async fn inspect(&self, hostname: &str, port: u16) -> Result<CertificateInfo, TransportError> {
        let server_name = ServerName::try_from(hostname.to_string())
            .map_err(|e| TransportError::Dns(format!("{hostname}: {e}")))?;

        let recorder = Arc::new(RecordingVerifier::new(self.verifier.clone()));
        let config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(recorder.clone())
            .with_no_client_auth();

        let tcp = TcpStream::connect((hostname, port)).await?;
        let stream = TlsConnector::from(Arc::new(config)).connect(server_name, tcp).await?;

        let (_, connection) = stream.get_ref();
        let leaf = connection
            .peer_certificates()
            .and_then(|chain| chain.first())
            .ok_or_else(|| TransportError::Tls("server presented no certificate".to_string()))?;

        let (not_before, not_after) = validity_window(leaf)?;
        let now = Utc::now().timestamp();

        Ok(CertificateInfo {
            valid: recorder.trusted() && not_before <= now && now <= not_after,
            days_remaining: days_until(not_after, now),
        })
    }
}

/// Whole days from `now` until `not_after`, rounded down
fn days_until(not_after: i64, now: i64) -> i64 {
    (not_after - now).div_euclid(SECONDS_PER_DAY)
}

fn validity_window(certificate: &CertificateDer<'_>) -> Result<(i64, i64), TransportError> {
    let (_, parsed) = x509_parser::parse_x509_certificate(certificate.as_ref())
        .map_err(|e| TransportError::Tls(format!("unreadable certificate: {e}")))?;
    let validity = parsed.validity();
    Ok((validity.not_before.timestamp(), validity.not_after.timestamp()))
}

/// Delegates to WebPKI but always lets the handshake proceed, keeping the outcome
#[derive(Debug)]
struct RecordingVerifier {
    inner: Arc<WebPkiServerVerifier>,
    trusted: Mutex<bool>,
}

impl RecordingVerifier {
    fn new(inner: Arc<WebPkiServerVerifier>) -> Self {
        Self { inner, trusted: Mutex::new(false) }
    }

    fn trusted(&self) -> bool {
        *self.trusted.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ServerCertVerifier for RecordingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let outcome =
            self.inner.verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now);
        if let Err(e) = &outcome {
            debug!("Certificate chain rejected: {e}");
        }
        *self.trusted.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = outcome.is_ok();
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_until_rounds_down() {
        let now = 1_700_000_000;
        assert_eq!(days_until(now + 30 * SECONDS_PER_DAY, now), 30);
        assert_eq!(days_until(now + 30 * SECONDS_PER_DAY - 1, now), 29);
        assert_eq!(days_until(now + 1, now), 0);
        assert_eq!(days_until(now - 1, now), -1);
        assert_eq!(days_until(now - 3 * SECONDS_PER_DAY, now), -3);
    }

    #[test]
    fn test_garbage_certificate_is_tls_error() {
        let garbage = CertificateDer::from(vec![0x30, 0x03, 0x02, 0x01]);
        assert!(matches!(validity_window(&garbage), Err(TransportError::Tls(_))));
    }

    #[test]
    fn test_empty_root_store_is_rejected() {
        assert!(TlsCertificateInspector::with_roots(RootCertStore::empty()).is_err());
    }
}
