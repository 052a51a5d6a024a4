//! Hostname verification against certificate SANs and Common Name

use std::net::IpAddr;

use rustls::pki_types::{CertificateDer, ServerName};
use x509_parser::extensions::GeneralName;

use crate::tls::errors::TlsError;

/// Verify that `server_name` is covered by the certificate's Subject
/// Alternative Names, or its Common Name when it carries no DNS SANs.
pub fn verify_hostname(cert: &CertificateDer<'_>, server_name: &ServerName<'_>) -> Result<(), TlsError> {
    let (_, parsed) = x509_parser::parse_x509_certificate(cert.as_ref())
        .map_err(|e| TlsError::CertificateParsing(format!("invalid DER certificate: {e}")))?;

    let mut dns_names = Vec::new();
    let mut ip_addresses = Vec::new();
    if let Ok(Some(san)) = parsed.subject_alternative_name() {
        for name in &san.value.general_names {
            match name {
                GeneralName::DNSName(dns) => dns_names.push((*dns).to_string()),
                GeneralName::IPAddress(bytes) => {
                    if let Some(ip) = ip_from_octets(bytes) {
                        ip_addresses.push(ip);
                    }
                }
                _ => {}
            }
        }
    }

    match server_name {
        ServerName::IpAddress(ip) => {
            let ip = IpAddr::from(*ip);
            if ip_addresses.contains(&ip) {
                return Ok(());
            }
            Err(TlsError::PeerVerification(format!(
                "IP address {ip} not found in certificate SANs"
            )))
        }
        ServerName::DnsName(dns) => {
            let hostname = dns.as_ref();
            if dns_names.iter().any(|pattern| matches_hostname(hostname, pattern)) {
                return Ok(());
            }

            if dns_names.is_empty() {
                let cn = parsed
                    .subject()
                    .iter_common_name()
                    .next()
                    .and_then(|cn| cn.as_str().ok());
                if let Some(cn) = cn {
                    if matches_hostname(hostname, cn) {
                        tracing::debug!("hostname {hostname} matched certificate common name");
                        return Ok(());
                    }
                }
            }

            Err(TlsError::PeerVerification(format!(
                "hostname {hostname} does not match any certificate SANs or Common Name"
            )))
        }
        _ => Err(TlsError::PeerVerification(
            "unsupported server name type".to_string(),
        )),
    }
}

/// Match a hostname against a DNS pattern; only a single leading `*.`
/// label wildcard is honoured.
pub fn matches_hostname(hostname: &str, pattern: &str) -> bool {
    let hostname = hostname.trim_end_matches('.').to_ascii_lowercase();
    let pattern = pattern.trim_end_matches('.').to_ascii_lowercase();

    if hostname == pattern {
        return true;
    }

    match pattern.strip_prefix("*.") {
        Some(suffix) => match hostname.split_once('.') {
            Some((label, rest)) => !label.is_empty() && rest == suffix,
            None => false,
        },
        None => false,
    }
}

fn ip_from_octets(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes).ok().map(IpAddr::from),
        16 => <[u8; 16]>::try_from(bytes).ok().map(IpAddr::from),
        _ => None,
    }
}
