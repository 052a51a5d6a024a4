//! Server certificate verifiers, one per trust strategy.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::WebPkiSupportedAlgorithms;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, DigitallySignedStruct, SignatureScheme};

use super::certificate::{sha1_fingerprint, verify_hostname};
use super::trust::CertificateCapture;

fn check_hostname(
    enabled: bool,
    end_entity: &CertificateDer<'_>,
    server_name: &ServerName<'_>,
) -> Result<(), rustls::Error> {
    if !enabled {
        return Ok(());
    }
    verify_hostname(end_entity, server_name).map_err(|e| {
        tracing::debug!("hostname verification failed: {e}");
        rustls::Error::InvalidCertificate(CertificateError::NotValidForName)
    })
}

/// Handshake signatures are checked for every strategy, including the
/// accept-all ones: the peer still has to own the key it presented.
macro_rules! signature_checks {
    () => {
        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            rustls::crypto::verify_tls12_signature(message, cert, dss, &self.algorithms)
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            rustls::crypto::verify_tls13_signature(message, cert, dss, &self.algorithms)
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            self.algorithms.supported_schemes()
        }
    };
}

/// Accepts any chain, never checks the hostname.
#[derive(Debug)]
pub(crate) struct AcceptAllVerifier {
    pub(crate) algorithms: WebPkiSupportedAlgorithms,
}

impl ServerCertVerifier for AcceptAllVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        tracing::debug!("accepting unverified certificate chain for {server_name:?}");
        Ok(ServerCertVerified::assertion())
    }

    signature_checks!();
}

/// Accepts any chain and records it.
#[derive(Debug)]
pub(crate) struct CertificateReaderVerifier {
    pub(crate) algorithms: WebPkiSupportedAlgorithms,
    pub(crate) capture: CertificateCapture,
    pub(crate) hostname_verification: bool,
}

impl ServerCertVerifier for CertificateReaderVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let chain: Vec<CertificateDer<'static>> = std::iter::once(end_entity)
            .chain(intermediates)
            .map(|c| c.clone().into_owned())
            .collect();
        tracing::debug!(
            "read {} certificate(s) from {server_name:?}, end-entity sha1={}",
            chain.len(),
            sha1_fingerprint(end_entity)
        );
        self.capture.record(chain);

        check_hostname(self.hostname_verification, end_entity, server_name)?;
        Ok(ServerCertVerified::assertion())
    }

    signature_checks!();
}

/// Accepts a chain only when its end-entity certificate is byte-identical to
/// a pinned certificate.
#[derive(Debug)]
pub(crate) struct PinnedCertificateVerifier {
    pub(crate) algorithms: WebPkiSupportedAlgorithms,
    pub(crate) pinned: Vec<CertificateDer<'static>>,
    pub(crate) hostname_verification: bool,
}

impl ServerCertVerifier for PinnedCertificateVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let pinned = self
            .pinned
            .iter()
            .any(|cert| cert.as_ref() == end_entity.as_ref());

        if !pinned {
            tracing::warn!(
                "rejecting certificate sha1={} from {server_name:?}: not among the {} configured certificates",
                sha1_fingerprint(end_entity),
                self.pinned.len()
            );
            return Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            ));
        }

        check_hostname(self.hostname_verification, end_entity, server_name)?;
        Ok(ServerCertVerified::assertion())
    }

    signature_checks!();
}

/// Platform trust store verification; a name mismatch is forgiven when
/// hostname verification is off.
#[derive(Debug)]
pub(crate) struct PlatformVerifier {
    pub(crate) inner: Arc<WebPkiServerVerifier>,
    pub(crate) hostname_verification: bool,
}

impl ServerCertVerifier for PlatformVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        match self
            .inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
        {
            Err(rustls::Error::InvalidCertificate(
                CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. },
            )) if !self.hostname_verification => Ok(ServerCertVerified::assertion()),
            other => other,
        }
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
