//! TLS-specific error types for detailed error handling

/// TLS-specific error types for detailed error handling
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("Certificate parsing failed: {0}")]
    CertificateParsing(String),
    #[error("Peer verification failed: {0}")]
    PeerVerification(String),
    #[error("configuredCertificates trust requires at least one pinned certificate")]
    MissingPinnedCertificates,
    #[error("Trust store unavailable: {0}")]
    TrustStore(String),
    #[error("TLS configuration failed: {0}")]
    Config(String),
}
