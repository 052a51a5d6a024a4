//! Certificate trust strategies.
//!
//! [`resolve_trust`] turns a [`crate::config::TrustManagerType`] plus the
//! application hostname policy into a rustls certificate verifier and the
//! `ClientConfig` both network backends build their TLS connections from.

pub mod certificate;
pub mod errors;
pub mod trust;
pub(crate) mod verifier;

pub use certificate::{CertificateInfo, parse_pem_certificates, sha1_fingerprint, sha256_fingerprint};
pub use errors::TlsError;
pub use trust::{CertificateCapture, ResolvedTrust, debug_text, resolve_trust};
