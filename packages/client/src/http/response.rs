//! Response message

use bytes::Bytes;
use encoding_rs::Encoding;

use super::body::HttpBody;
use super::content_type::HttpContentType;
use super::{Headers, debug, headers_size};

/// Decode a text payload using the `charset` parameter of the content type,
/// falling back to UTF-8 for absent or unknown labels. Malformed sequences
/// become U+FFFD.
fn decode_text(content_type: Option<&str>, payload: &[u8]) -> String {
    let encoding = content_type
        .and_then(|value| {
            value.split(';').skip(1).find_map(|param| {
                let (name, label) = param.split_once('=')?;
                name.trim()
                    .eq_ignore_ascii_case("charset")
                    .then(|| label.trim().trim_matches('"'))
            })
        })
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(encoding_rs::UTF_8);

    let (text, _, _) = encoding.decode(payload);
    text.into_owned()
}

/// Immutable response, correlated to its request by `request_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    request_id: u64,
    status_code: u16,
    status_phrase: String,
    headers: Headers,
    content_type: HttpContentType,
    body: HttpBody,
}

impl HttpResponse {
    /// Assemble a response from raw parts, deriving the content type from
    /// the headers and classifying the payload as text or binary.
    pub fn from_parts(
        request_id: u64,
        status_code: u16,
        status_phrase: impl Into<String>,
        headers: Headers,
        payload: Bytes,
    ) -> Self {
        let header = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.as_str());
        let content_type = HttpContentType::from_header(header);

        let body = if payload.is_empty() {
            HttpBody::Empty
        } else if content_type.is_binary() {
            HttpBody::Binary(payload)
        } else {
            HttpBody::Text(decode_text(header, &payload))
        };

        Self {
            request_id,
            status_code,
            status_phrase: status_phrase.into(),
            headers,
            content_type,
            body,
        }
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn status_phrase(&self) -> &str {
        &self.status_phrase
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
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

    pub fn content_type(&self) -> &HttpContentType {
        &self.content_type
    }

    pub fn body(&self) -> &HttpBody {
        &self.body
    }

    pub fn text(&self) -> Option<&str> {
        self.body.as_text()
    }

    pub fn bytes(&self) -> Bytes {
        self.body.to_bytes()
    }

    /// Approximate size for statistics: headers plus body.
    pub fn size(&self) -> u64 {
        headers_size(&self.headers) + self.body.len() as u64
    }

    pub fn to_debug_string(&self, top_line: &str, always_log: bool, mask: bool) -> String {
        debug::render(top_line, self.request_id, &self.headers, &self.body, always_log, mask)
    }
}
