//! Outbound client prelude
//!
//! The types application code needs to obtain clients and exchange messages.

pub use crate::backend::{BackendInit, BackendKind, BackendProvider, NetworkBackend};
pub use crate::client::{HttpClient, HttpClientService, StatisticsSnapshot};
pub use crate::config::{
    AppSettings, ClientConfiguration, MapPropertySource, PropertySource, TrustManagerType,
};
pub use crate::error::{Error, Kind, Result};
pub use crate::http::{
    HttpBody, HttpContentType, HttpEntityDataType, HttpMethod, HttpRequest, HttpResponse,
};
pub use crate::proxy::{ProxyRoute, ProxyRouter};
