use http::StatusCode;

use super::helpers::{BadScheme, ClientClosed, TimedOut};
use super::types::{Error, Kind};
use super::BoxError;

/// Creates an `Error` for a configuration problem.
pub fn configuration<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Configuration).with(e.into())
}

/// Creates an `Error` for a request that cannot be sent as built.
pub fn invalid_request<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::InvalidRequest).with(e.into())
}

/// Creates an `Error` for an I/O failure during the exchange.
pub fn unreachable<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::ServiceUnreachable).with(e.into())
}

/// Creates a service-unreachable `Error` caused by an expired deadline.
pub fn timeout() -> Error {
    Error::new(Kind::ServiceUnreachable).with(TimedOut)
}

/// Creates an `Error` for a non-200 status seen while streaming a URL.
pub fn remote(url: url::Url, status: StatusCode, status_line: String) -> Error {
    Error::new(Kind::Remote(status, status_line)).with_url(url)
}

/// Creates an `Error` for a URL scheme that cannot be streamed.
pub fn unsupported_scheme(url: url::Url) -> Error {
    let scheme = url.scheme().to_string();
    Error::new(Kind::Unsupported)
        .with(BadScheme(scheme))
        .with_url(url)
}

/// Creates an `Error` for a body that exceeded `limit` bytes.
pub fn payload_too_large(limit: u64) -> Error {
    Error::new(Kind::PayloadTooLarge).with(format!("response body exceeds {limit} bytes"))
}

/// Creates an `Error` for a call made on a closed client.
pub fn closed(client_id: u64) -> Error {
    Error::new(Kind::Closed).with(ClientClosed(client_id))
}

/// Creates an `Error` for an unexpected internal failure.
pub fn internal<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Internal).with(e.into())
}
