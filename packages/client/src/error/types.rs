use std::error::Error as StdError;
use std::fmt;

use http::StatusCode;

/// A `Result` alias where the `Err` case is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents errors that can occur while issuing outbound requests.
pub struct Error {
    pub inner: Box<Inner>,
}

pub struct Inner {
    pub kind: Kind,
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub url: Option<url::Url>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    /// Malformed proxy URL, missing pinned certificates, unknown backend,
    /// unparseable property value.
    Configuration,
    /// The request itself could not be turned into a wire request
    /// (bad URL, bad header name or value).
    InvalidRequest,
    /// I/O failure during the exchange: refused, reset, timed out.
    ServiceUnreachable,
    /// Non-200 status while streaming a remote URL; carries the status line.
    Remote(StatusCode, String),
    /// URL scheme that cannot be streamed.
    Unsupported,
    /// Response body exceeded the configured maximum.
    PayloadTooLarge,
    /// Operation attempted on a closed client.
    Closed,
    /// Unexpected backend or runtime failure.
    Internal,
}

impl Error {
    pub fn new(kind: Kind) -> Error {
        Error {
            inner: Box::new(Inner {
                kind,
                source: None,
                url: None,
            }),
        }
    }

    #[must_use = "Error builder methods return a new Error and should be used"]
    pub fn with<E: Into<Box<dyn StdError + Send + Sync>>>(mut self, source: E) -> Error {
        self.inner.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: url::Url) -> Self {
        self.inner.url = Some(url);
        self
    }

    pub fn kind(&self) -> &Kind {
        &self.inner.kind
    }

    /// Get the URL associated with this error, if any
    #[must_use]
    pub fn url(&self) -> Option<&url::Url> {
        self.inner.url.as_ref()
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("outbound_client::Error");

        f.field("kind", &self.inner.kind);

        if let Some(ref source) = self.inner.source {
            f.field("source", source);
        }

        if let Some(ref url) = self.inner.url {
            f.field("url", url);
        }

        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.kind {
            Kind::Configuration => f.write_str("configuration error")?,
            Kind::InvalidRequest => f.write_str("invalid request")?,
            Kind::ServiceUnreachable => f.write_str("service unreachable")?,
            Kind::Remote(_, status_line) => write!(f, "remote error: {status_line}")?,
            Kind::Unsupported => f.write_str("unsupported")?,
            Kind::PayloadTooLarge => f.write_str("payload too large")?,
            Kind::Closed => f.write_str("client is closed")?,
            Kind::Internal => f.write_str("internal error")?,
        }

        if let Some(ref url) = self.inner.url {
            write!(f, " for url ({url})")?;
        }

        if let Some(ref source) = self.inner.source {
            write!(f, ": {source}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}
