//! Per-client configuration used as the registry cache key.

use std::fmt;
use std::str::FromStr;

use rustls::pki_types::CertificateDer;

use super::ConfigurationError;

/// Certificate trust strategy applied to a client's TLS connections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TrustManagerType {
    /// Accept any chain; hostname verification is always off.
    Promiscuous,
    /// Accept any chain and record every chain seen for later inspection.
    PromiscuousCertReader,
    /// Accept only chains whose end-entity certificate is pinned.
    ConfiguredCertificates,
    /// Platform trust store.
    #[default]
    DefaultTrust,
}

impl TrustManagerType {
    pub const ALL: [TrustManagerType; 4] = [
        TrustManagerType::Promiscuous,
        TrustManagerType::PromiscuousCertReader,
        TrustManagerType::ConfiguredCertificates,
        TrustManagerType::DefaultTrust,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TrustManagerType::Promiscuous => "promiscuous",
            TrustManagerType::PromiscuousCertReader => "promiscuousCertReader",
            TrustManagerType::ConfiguredCertificates => "configuredCertificates",
            TrustManagerType::DefaultTrust => "defaultTrust",
        }
    }
}

impl fmt::Display for TrustManagerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrustManagerType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrustManagerType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigurationError::UnknownTrustManagerType(s.to_string()))
    }
}

/// Trust and logging choices for one client.
///
/// Equal configurations share the same per-thread cached client, so the
/// value is immutable once built: fields are private and only readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ClientConfiguration {
    trust_manager_type: TrustManagerType,
    pinned_certificates: Vec<CertificateDer<'static>>,
    mask_debug_body: bool,
}

impl ClientConfiguration {
    pub fn builder() -> ClientConfigurationBuilder {
        ClientConfigurationBuilder::default()
    }

    /// Shorthand for a configuration with only a trust type set.
    pub fn with_trust(trust_manager_type: TrustManagerType) -> Self {
        Self::builder().trust_manager_type(trust_manager_type).build()
    }

    pub fn trust_manager_type(&self) -> TrustManagerType {
        self.trust_manager_type
    }

    pub fn pinned_certificates(&self) -> &[CertificateDer<'static>] {
        &self.pinned_certificates
    }

    pub fn mask_debug_body(&self) -> bool {
        self.mask_debug_body
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfigurationBuilder {
    trust_manager_type: TrustManagerType,
    pinned_certificates: Vec<CertificateDer<'static>>,
    mask_debug_body: bool,
}

impl ClientConfigurationBuilder {
    #[must_use]
    pub fn trust_manager_type(mut self, trust_manager_type: TrustManagerType) -> Self {
        self.trust_manager_type = trust_manager_type;
        self
    }

    /// Pin one certificate. Order is kept and duplicates are dropped.
    #[must_use]
    pub fn pinned_certificate(mut self, certificate: CertificateDer<'static>) -> Self {
        if !self.pinned_certificates.contains(&certificate) {
            self.pinned_certificates.push(certificate);
        }
        self
    }

    #[must_use]
    pub fn pinned_certificates<I>(self, certificates: I) -> Self
    where
        I: IntoIterator<Item = CertificateDer<'static>>,
    {
        certificates
            .into_iter()
            .fold(self, |builder, cert| builder.pinned_certificate(cert))
    }

    #[must_use]
    pub fn mask_debug_body(mut self, mask: bool) -> Self {
        self.mask_debug_body = mask;
        self
    }

    pub fn build(self) -> ClientConfiguration {
        ClientConfiguration {
            trust_manager_type: self.trust_manager_type,
            pinned_certificates: self.pinned_certificates,
            mask_debug_body: self.mask_debug_body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_type_names_round_trip() {
        for t in TrustManagerType::ALL {
            assert_eq!(t.as_str().parse::<TrustManagerType>().expect("known name"), t);
        }
        assert!("bogus".parse::<TrustManagerType>().is_err());
    }

    #[test]
    fn test_pinned_certificates_are_deduplicated_in_order() {
        let a = CertificateDer::from(vec![1u8, 2, 3]);
        let b = CertificateDer::from(vec![4u8, 5, 6]);
        let cfg = ClientConfiguration::builder()
            .pinned_certificates([a.clone(), b.clone(), a.clone()])
            .build();
        assert_eq!(cfg.pinned_certificates(), &[a, b]);
    }
}
