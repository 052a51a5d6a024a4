//! Certificate parsing from PEM and DER

use std::fmt;
use std::io::BufReader;

use ring::digest;
use rustls::pki_types::CertificateDer;

use crate::tls::errors::TlsError;

/// Parse every `CERTIFICATE` block in PEM text into DER certificates.
pub fn parse_pem_certificates(pem: &str) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let mut reader = BufReader::new(pem.as_bytes());
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::CertificateParsing(format!("invalid PEM certificate: {e}")))?;

    if certs.is_empty() {
        return Err(TlsError::CertificateParsing(
            "no certificates found in PEM input".to_string(),
        ));
    }
    Ok(certs)
}

/// Upper-case hex SHA-1 of the DER encoding.
pub fn sha1_fingerprint(cert: &CertificateDer<'_>) -> String {
    hex::encode_upper(digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, cert.as_ref()))
}

/// Upper-case hex SHA-256 of the DER encoding.
pub fn sha256_fingerprint(cert: &CertificateDer<'_>) -> String {
    hex::encode_upper(digest::digest(&digest::SHA256, cert.as_ref()))
}

/// Operator-facing summary of a certificate, used to inspect chains captured
/// by the certificate-reader trust strategy before pinning them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    pub serial: String,
    pub not_before: String,
    pub not_after: String,
    pub dns_names: Vec<String>,
    pub sha1: String,
    pub sha256: String,
}

impl CertificateInfo {
    pub fn from_der(cert: &CertificateDer<'_>) -> Result<Self, TlsError> {
        let (_, parsed) = x509_parser::parse_x509_certificate(cert.as_ref())
            .map_err(|e| TlsError::CertificateParsing(format!("invalid DER certificate: {e}")))?;

        let dns_names = match parsed.subject_alternative_name() {
            Ok(Some(san)) => san
                .value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    x509_parser::extensions::GeneralName::DNSName(dns) => Some((*dns).to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        Ok(Self {
            subject: parsed.subject().to_string(),
            issuer: parsed.issuer().to_string(),
            serial: parsed.raw_serial_as_string(),
            not_before: parsed.validity().not_before.to_string(),
            not_after: parsed.validity().not_after.to_string(),
            dns_names,
            sha1: sha1_fingerprint(cert),
            sha256: sha256_fingerprint(cert),
        })
    }
}

impl fmt::Display for CertificateInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "subject={} issuer={} serial={} notAfter={} sha1={}",
            self.subject, self.issuer, self.serial, self.not_after, self.sha1
        )
    }
}
