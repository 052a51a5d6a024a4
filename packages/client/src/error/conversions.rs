use http::header::{InvalidHeaderName, InvalidHeaderValue};

use super::constructors;
use super::types::Error;
use crate::tls::TlsError;

impl From<InvalidHeaderName> for Error {
    fn from(error: InvalidHeaderName) -> Self {
        constructors::invalid_request(error)
    }
}

impl From<InvalidHeaderValue> for Error {
    fn from(error: InvalidHeaderValue) -> Self {
        constructors::invalid_request(error)
    }
}

impl From<url::ParseError> for Error {
    fn from(error: url::ParseError) -> Self {
        constructors::invalid_request(error)
    }
}

impl From<http::Error> for Error {
    fn from(error: http::Error) -> Self {
        constructors::invalid_request(error)
    }
}

impl From<TlsError> for Error {
    fn from(error: TlsError) -> Self {
        match error {
            TlsError::MissingPinnedCertificates | TlsError::CertificateParsing(_) => {
                constructors::configuration(error)
            }
            _ => constructors::internal(error),
        }
    }
}

impl From<crate::config::ConfigurationError> for Error {
    fn from(error: crate::config::ConfigurationError) -> Self {
        constructors::configuration(error)
    }
}
