//! Certificate parsing, fingerprints and hostname matching

pub mod hostname;
pub mod parser;

pub use hostname::{matches_hostname, verify_hostname};
pub use parser::{CertificateInfo, parse_pem_certificates, sha1_fingerprint, sha256_fingerprint};
