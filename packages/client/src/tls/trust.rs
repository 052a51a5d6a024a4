//! Trust strategy resolution

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use rustls::client::danger::ServerCertVerifier;
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::CertificateDer;
use rustls::{ClientConfig, RootCertStore};

use super::certificate::sha1_fingerprint;
use super::errors::TlsError;
use super::verifier::{
    AcceptAllVerifier, CertificateReaderVerifier, PinnedCertificateVerifier, PlatformVerifier,
};
use crate::config::{AppSettings, ClientConfiguration, TrustManagerType};

/// Certificates observed by the certificate-reader strategy, end-entity
/// first within each chain. Repeated handshakes do not duplicate entries.
#[derive(Debug, Clone, Default)]
pub struct CertificateCapture {
    certificates: Arc<Mutex<Vec<CertificateDer<'static>>>>,
}

impl CertificateCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, chain: Vec<CertificateDer<'static>>) {
        let mut certificates = self
            .certificates
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for cert in chain {
            if !certificates.contains(&cert) {
                certificates.push(cert);
            }
        }
    }

    pub fn certificates(&self) -> Vec<CertificateDer<'static>> {
        self.certificates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Verifier and hostname policy for one client.
#[derive(Debug, Clone)]
pub struct ResolvedTrust {
    pub trust_manager_type: TrustManagerType,
    pub verifier: Arc<dyn ServerCertVerifier>,
    pub hostname_verification: bool,
    pub capture: Option<CertificateCapture>,
}

impl ResolvedTrust {
    /// Build a rustls client configuration around the resolved verifier.
    pub fn client_config(&self) -> Result<ClientConfig, TlsError> {
        let config = ClientConfig::builder_with_provider(crypto_provider())
            .with_safe_default_protocol_versions()
            .map_err(|e| TlsError::Config(e.to_string()))?
            .dangerous()
            .with_custom_certificate_verifier(self.verifier.clone())
            .with_no_client_auth();
        Ok(config)
    }

    /// Certificates captured so far; empty for strategies that do not capture.
    pub fn captured_certificates(&self) -> Vec<CertificateDer<'static>> {
        self.capture
            .as_ref()
            .map(CertificateCapture::certificates)
            .unwrap_or_default()
    }
}

/// Resolve the verifier and hostname policy for a client configuration.
///
/// Hostname verification is off for `promiscuous` trust, and everywhere
/// when the application disables it.
pub fn resolve_trust(
    settings: &AppSettings,
    config: &ClientConfiguration,
) -> Result<ResolvedTrust, TlsError> {
    let trust_manager_type = config.trust_manager_type();
    let hostname_verification = trust_manager_type != TrustManagerType::Promiscuous
        && settings.hostname_verification;
    let algorithms = crypto_provider().signature_verification_algorithms;

    let mut capture = None;
    let verifier: Arc<dyn ServerCertVerifier> = match trust_manager_type {
        TrustManagerType::Promiscuous => {
            tracing::warn!("certificate validation disabled: promiscuous trust in use");
            Arc::new(AcceptAllVerifier { algorithms })
        }
        TrustManagerType::PromiscuousCertReader => {
            let reader = CertificateCapture::new();
            capture = Some(reader.clone());
            Arc::new(CertificateReaderVerifier {
                algorithms,
                capture: reader,
                hostname_verification,
            })
        }
        TrustManagerType::ConfiguredCertificates => {
            if config.pinned_certificates().is_empty() {
                return Err(TlsError::MissingPinnedCertificates);
            }
            Arc::new(PinnedCertificateVerifier {
                algorithms,
                pinned: config.pinned_certificates().to_vec(),
                hostname_verification,
            })
        }
        TrustManagerType::DefaultTrust => {
            let inner = WebPkiServerVerifier::builder_with_provider(
                platform_roots()?,
                crypto_provider(),
            )
            .build()
            .map_err(|e| TlsError::TrustStore(e.to_string()))?;
            Arc::new(PlatformVerifier {
                inner,
                hostname_verification,
            })
        }
    };

    Ok(ResolvedTrust {
        trust_manager_type,
        verifier,
        hostname_verification,
        capture,
    })
}

/// Deterministic, non-sensitive description of the trust configuration.
pub fn debug_text(config: &ClientConfiguration) -> String {
    let mut text = format!("trust={}", config.trust_manager_type());
    if config.trust_manager_type() == TrustManagerType::ConfiguredCertificates {
        let fingerprints: Vec<String> = config
            .pinned_certificates()
            .iter()
            .map(sha1_fingerprint)
            .collect();
        text.push_str(&format!(" certificates=[{}]", fingerprints.join(",")));
    }
    text
}

fn crypto_provider() -> Arc<CryptoProvider> {
    static PROVIDER: OnceLock<Arc<CryptoProvider>> = OnceLock::new();
    PROVIDER
        .get_or_init(|| Arc::new(rustls::crypto::ring::default_provider()))
        .clone()
}

/// Platform trust store, loaded once per process. Falls back to the
/// bundled Mozilla roots when the platform store yields nothing.
fn platform_roots() -> Result<Arc<RootCertStore>, TlsError> {
    static ROOTS: OnceLock<Arc<RootCertStore>> = OnceLock::new();
    if let Some(roots) = ROOTS.get() {
        return Ok(roots.clone());
    }

    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for error in &native.errors {
        tracing::debug!("skipping platform certificate source: {error}");
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    tracing::debug!("loaded {added} platform root certificates ({ignored} ignored)");

    if roots.is_empty() {
        tracing::info!("platform trust store is empty, using bundled webpki roots");
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }
    if roots.is_empty() {
        return Err(TlsError::TrustStore("no root certificates available".to_string()));
    }

    Ok(ROOTS.get_or_init(|| Arc::new(roots)).clone())
}
