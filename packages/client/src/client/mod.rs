//! Client registry and issued client handles.

pub mod instance;
pub mod service;
pub mod stats;

pub use instance::HttpClient;
pub use service::HttpClientService;
pub use stats::{StatisticsCounters, StatisticsSnapshot};
