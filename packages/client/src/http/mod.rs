//! Request and response message model.
//!
//! Messages are immutable once built. Bodies are a three-way enum so a
//! message can never carry both a text and a binary payload.

pub mod body;
pub mod content_type;
pub mod debug;
pub mod method;
pub mod request;
pub mod response;

pub use body::{HttpBody, HttpEntityDataType};
pub use content_type::HttpContentType;
pub use debug::{MASKED_VALUE, is_sensitive_header};
pub use method::HttpMethod;
pub use request::{HttpRequest, HttpRequestBuilder, next_request_id};
pub use response::HttpResponse;

/// Ordered header list; names keep the case they were supplied with.
pub type Headers = Vec<(String, String)>;

pub(crate) fn headers_size(headers: &[(String, String)]) -> u64 {
    headers
        .iter()
        .map(|(name, value)| (name.len() + value.len()) as u64)
        .sum()
}
