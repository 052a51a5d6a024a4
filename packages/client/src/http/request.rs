//! Outbound request message

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use url::Url;

use super::body::HttpBody;
use super::method::HttpMethod;
use super::{Headers, debug, headers_size};
use crate::error::Result;

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Next process-wide request id; ids start at 1 and never repeat.
pub fn next_request_id() -> u64 {
    REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed) + 1
}

/// Immutable outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    request_id: u64,
    method: HttpMethod,
    url: Url,
    headers: Headers,
    body: HttpBody,
}

impl HttpRequest {
    pub fn builder(method: HttpMethod, url: impl Into<String>) -> HttpRequestBuilder {
        HttpRequestBuilder {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: HttpBody::Empty,
        }
    }

    pub fn get(url: impl Into<String>) -> HttpRequestBuilder {
        Self::builder(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> HttpRequestBuilder {
        Self::builder(HttpMethod::Post, url)
    }

    pub fn put(url: impl Into<String>) -> HttpRequestBuilder {
        Self::builder(HttpMethod::Put, url)
    }

    pub fn patch(url: impl Into<String>) -> HttpRequestBuilder {
        Self::builder(HttpMethod::Patch, url)
    }

    pub fn delete(url: impl Into<String>) -> HttpRequestBuilder {
        Self::builder(HttpMethod::Delete, url)
    }

    pub fn head(url: impl Into<String>) -> HttpRequestBuilder {
        Self::builder(HttpMethod::Head, url)
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &HttpBody {
        &self.body
    }

    pub fn is_https(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// Approximate size for statistics: headers, body, method and URL.
    pub fn size(&self) -> u64 {
        headers_size(&self.headers)
            + self.body.len() as u64
            + self.method.as_str().len() as u64
            + self.url.as_str().len() as u64
    }

    pub fn to_debug_string(&self, top_line: &str, always_log: bool, mask: bool) -> String {
        debug::render(top_line, self.request_id, &self.headers, &self.body, always_log, mask)
    }
}

/// Builder for [`HttpRequest`]; the request id is assigned by [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct HttpRequestBuilder {
    method: HttpMethod,
    url: String,
    headers: Headers,
    body: HttpBody,
}

impl HttpRequestBuilder {
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set a text body, replacing any previous body.
    #[must_use]
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.body = HttpBody::from(body.into());
        self
    }

    /// Set a binary body, replacing any previous body.
    #[must_use]
    pub fn binary_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = HttpBody::from(body.into());
        self
    }

    /// Parse the URL and assign the next request id.
    pub fn build(self) -> Result<HttpRequest> {
        let url = Url::parse(&self.url)?;
        Ok(HttpRequest {
            request_id: next_request_id(),
            method: self.method,
            url,
            headers: self.headers,
            body: self.body,
        })
    }
}
