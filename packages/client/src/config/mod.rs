//! Configuration consumed by the outbound client.
//!
//! The host application exposes its settings as opaque key/value lookups
//! through [`PropertySource`]. They are parsed once into a typed
//! [`AppSettings`]. Per-client trust and masking choices travel separately
//! as a [`ClientConfiguration`], which doubles as the registry cache key.

pub mod client;
pub mod properties;
pub mod settings;

pub use client::{ClientConfiguration, ClientConfigurationBuilder, TrustManagerType};
pub use properties::{keys, MapPropertySource, PropertySource};
pub use settings::AppSettings;

/// Configuration validation and parse failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("invalid value '{value}' for property '{key}': {reason}")]
    InvalidProperty {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid proxy url '{0}': {1}")]
    InvalidProxyUrl(String, String),
    #[error("unknown trust manager type '{0}'")]
    UnknownTrustManagerType(String),
    #[error("unknown http client implementation '{0}'")]
    UnknownImplementation(String),
}
