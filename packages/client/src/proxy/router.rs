//! Per-request proxy routing decision

use base64::Engine;
use url::Url;

use super::exceptions::ProxyExceptions;
use crate::config::{AppSettings, ConfigurationError};

/// Credentials embedded in the proxy URL as `user:pass@`.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

impl ProxyCredentials {
    /// `Proxy-Authorization` value for basic authentication.
    pub fn basic_header(&self) -> String {
        let token = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

impl std::fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Where one request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyRoute {
    Direct,
    Proxy {
        /// Proxy URL without credentials
        proxy: Url,
        host: String,
        port: u16,
        credentials: Option<ProxyCredentials>,
        /// Target is https, so the proxy is used as a CONNECT tunnel
        secure: bool,
    },
}

impl ProxyRoute {
    pub fn is_direct(&self) -> bool {
        matches!(self, ProxyRoute::Direct)
    }
}

#[derive(Debug, Clone)]
struct ProxyEndpoint {
    url: Url,
    host: String,
    port: u16,
    credentials: Option<ProxyCredentials>,
}

/// Routing decision shared by both network backends.
#[derive(Debug, Clone, Default)]
pub struct ProxyRouter {
    endpoint: Option<ProxyEndpoint>,
    exceptions: ProxyExceptions,
}

impl ProxyRouter {
    /// Router that always routes directly.
    pub fn direct() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &AppSettings) -> Result<Self, ConfigurationError> {
        Self::new(settings.proxy_url.as_deref(), &settings.proxy_exceptions)
    }

    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidProxyUrl`] when the proxy URL
    /// does not parse, is not http(s), or has no host.
    pub fn new<S: AsRef<str>>(
        proxy_url: Option<&str>,
        exceptions: &[S],
    ) -> Result<Self, ConfigurationError> {
        let endpoint = match proxy_url.map(str::trim).filter(|u| !u.is_empty()) {
            None => None,
            Some(raw) => Some(parse_endpoint(raw)?),
        };

        Ok(Self {
            endpoint,
            exceptions: ProxyExceptions::new(exceptions),
        })
    }

    pub fn has_proxy(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Proxy host and port, when a proxy is configured.
    pub fn proxy_address(&self) -> Option<(&str, u16)> {
        self.endpoint.as_ref().map(|e| (e.host.as_str(), e.port))
    }

    /// Credentials taken from the proxy URL, if any.
    pub fn credentials(&self) -> Option<&ProxyCredentials> {
        self.endpoint.as_ref().and_then(|e| e.credentials.as_ref())
    }

    pub fn exceptions(&self) -> &ProxyExceptions {
        &self.exceptions
    }

    pub fn route(&self, target: &Url) -> ProxyRoute {
        let Some(endpoint) = &self.endpoint else {
            return ProxyRoute::Direct;
        };

        if let Some(pattern) = self.exceptions.matching(target) {
            tracing::trace!("{target} matches proxy exception '{pattern}', routing direct");
            return ProxyRoute::Direct;
        }

        ProxyRoute::Proxy {
            proxy: endpoint.url.clone(),
            host: endpoint.host.clone(),
            port: endpoint.port,
            credentials: endpoint.credentials.clone(),
            secure: target.scheme() == "https",
        }
    }
}

fn parse_endpoint(raw: &str) -> Result<ProxyEndpoint, ConfigurationError> {
    let invalid = |reason: &str| ConfigurationError::InvalidProxyUrl(redact(raw), reason.to_string());

    let mut url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    // The hop to the proxy is always plain HTTP
    let port = match url.scheme() {
        "http" => url.port().unwrap_or(80),
        other => return Err(invalid(&format!("unsupported proxy scheme '{other}'"))),
    };
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| invalid("missing host"))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();

    let credentials = if url.username().is_empty() {
        None
    } else {
        let username = urlencoding::decode(url.username())
            .map_err(|e| invalid(&e.to_string()))?
            .into_owned();
        let password = urlencoding::decode(url.password().unwrap_or_default())
            .map_err(|e| invalid(&e.to_string()))?
            .into_owned();
        Some(ProxyCredentials { username, password })
    };

    url.set_username("").map_err(|()| invalid("cannot strip credentials"))?;
    url.set_password(None).map_err(|()| invalid("cannot strip credentials"))?;

    Ok(ProxyEndpoint {
        url,
        host,
        port,
        credentials,
    })
}

/// Proxy URL with any password blanked, for error messages.
fn redact(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        _ => raw.to_string(),
    }
}
