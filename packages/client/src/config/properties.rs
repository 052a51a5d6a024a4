//! Key/value property lookups supplied by the host application.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Property keys read by [`super::AppSettings::from_properties`].
pub mod keys {
    pub const IMPLEMENTATION: &str = "http.client.implementation";
    pub const HOSTNAME_VERIFICATION: &str = "http.client.enableHostnameVerification";
    pub const PROXY_URL: &str = "http.proxy.url";
    pub const PROXY_EXCEPTIONS: &str = "http.proxy.exceptions";
    pub const CONNECT_TIMEOUT_MS: &str = "http.client.connectTimeoutMs";
    pub const SOCKET_TIMEOUT_MS: &str = "http.client.socketTimeoutMs";
    pub const REQUEST_TIMEOUT_MS: &str = "http.client.requestTimeoutMs";
    pub const ALWAYS_LOG_ENTITIES: &str = "http.client.alwaysLogEntities";
    pub const MAX_RESPONSE_BYTES: &str = "http.client.maxResponseBytes";
    pub const USER_AGENT: &str = "http.client.userAgent";
}

/// Opaque lookup into the host application's configuration.
pub trait PropertySource {
    fn property(&self, key: &str) -> Option<String>;
}

impl<F> PropertySource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn property(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// In-memory property source, deserializable from any serde format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapPropertySource {
    values: BTreeMap<String, String>,
}

impl MapPropertySource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl PropertySource for MapPropertySource {
    fn property(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

impl<K, V> FromIterator<(K, V)> for MapPropertySource
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
