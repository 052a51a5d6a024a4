//! Typed application settings for the outbound client.

use std::time::Duration;

use super::properties::{keys, PropertySource};
use super::ConfigurationError;

/// Application-level settings shared by every client the service issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    /// Name of the backend provider (`hyper` or `reqwest`)
    pub implementation: String,

    /// Enforce hostname matching on TLS certificates
    pub hostname_verification: bool,

    /// Proxy URL, optionally carrying `user:pass@` credentials
    pub proxy_url: Option<String>,

    /// Glob patterns of target URLs or hosts that bypass the proxy
    pub proxy_exceptions: Vec<String>,

    /// TCP connect (and tunnel/handshake) deadline
    pub connect_timeout: Duration,

    /// Idle read deadline while receiving a response
    pub socket_timeout: Duration,

    /// Deadline for the whole exchange
    pub request_timeout: Duration,

    /// Log entity bodies and sensitive headers verbatim
    pub always_log_entities: bool,

    /// Largest response body buffered in memory
    pub max_response_bytes: u64,

    /// `User-Agent` added to requests that carry none
    pub user_agent: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            implementation: "hyper".to_string(),
            hostname_verification: true,
            proxy_url: None,
            proxy_exceptions: Vec::new(),
            connect_timeout: Duration::from_millis(10_000),
            socket_timeout: Duration::from_millis(30_000),
            request_timeout: Duration::from_millis(60_000),
            always_log_entities: false,
            max_response_bytes: 10 * 1024 * 1024,
            user_agent: concat!("outbound-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl AppSettings {
    /// Read settings from the host's property source, falling back to
    /// defaults for absent keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidProperty`] naming the key when a
    /// present value cannot be parsed.
    pub fn from_properties(source: &dyn PropertySource) -> Result<Self, ConfigurationError> {
        let defaults = Self::default();
        let lookup = |key: &str| {
            source
                .property(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            implementation: lookup(keys::IMPLEMENTATION).unwrap_or(defaults.implementation),
            hostname_verification: parse_bool(
                keys::HOSTNAME_VERIFICATION,
                lookup(keys::HOSTNAME_VERIFICATION),
                defaults.hostname_verification,
            )?,
            proxy_url: lookup(keys::PROXY_URL),
            proxy_exceptions: lookup(keys::PROXY_EXCEPTIONS)
                .map(|raw| split_patterns(&raw))
                .unwrap_or_default(),
            connect_timeout: parse_millis(
                keys::CONNECT_TIMEOUT_MS,
                lookup(keys::CONNECT_TIMEOUT_MS),
                defaults.connect_timeout,
            )?,
            socket_timeout: parse_millis(
                keys::SOCKET_TIMEOUT_MS,
                lookup(keys::SOCKET_TIMEOUT_MS),
                defaults.socket_timeout,
            )?,
            request_timeout: parse_millis(
                keys::REQUEST_TIMEOUT_MS,
                lookup(keys::REQUEST_TIMEOUT_MS),
                defaults.request_timeout,
            )?,
            always_log_entities: parse_bool(
                keys::ALWAYS_LOG_ENTITIES,
                lookup(keys::ALWAYS_LOG_ENTITIES),
                defaults.always_log_entities,
            )?,
            max_response_bytes: parse_u64(
                keys::MAX_RESPONSE_BYTES,
                lookup(keys::MAX_RESPONSE_BYTES),
                defaults.max_response_bytes,
            )?,
            user_agent: lookup(keys::USER_AGENT).unwrap_or(defaults.user_agent),
        })
    }

    #[must_use]
    pub fn with_implementation(mut self, implementation: impl Into<String>) -> Self {
        self.implementation = implementation.into();
        self
    }

    #[must_use]
    pub fn with_hostname_verification(mut self, enabled: bool) -> Self {
        self.hostname_verification = enabled;
        self
    }

    #[must_use]
    pub fn with_proxy_url(mut self, url: impl Into<String>) -> Self {
        self.proxy_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_proxy_exceptions<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.proxy_exceptions = patterns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_always_log_entities(mut self, enabled: bool) -> Self {
        self.always_log_entities = enabled;
        self
    }

    #[must_use]
    pub fn with_max_response_bytes(mut self, limit: u64) -> Self {
        self.max_response_bytes = limit;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

fn split_patterns(raw: &str) -> Vec<String> {
    raw.split([',', '\n', ';'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(
    key: &'static str,
    value: Option<String>,
    default: bool,
) -> Result<bool, ConfigurationError> {
    match value {
        None => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(ConfigurationError::InvalidProperty {
                key,
                value: v,
                reason: "expected a boolean".to_string(),
            }),
        },
    }
}

fn parse_u64(
    key: &'static str,
    value: Option<String>,
    default: u64,
) -> Result<u64, ConfigurationError> {
    match value {
        None => Ok(default),
        Some(v) => v
            .parse::<u64>()
            .map_err(|e| ConfigurationError::InvalidProperty {
                key,
                reason: e.to_string(),
                value: v,
            }),
    }
}

fn parse_millis(
    key: &'static str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigurationError> {
    let millis = parse_u64(key, value, u64::try_from(default.as_millis()).unwrap_or(u64::MAX))?;
    Ok(Duration::from_millis(millis))
}
