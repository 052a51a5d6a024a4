//! Debug rendering shared by requests and responses.

use std::fmt::Write;

use super::body::HttpBody;

/// Replaces sensitive header values and masked bodies in debug output.
pub const MASKED_VALUE: &str = "***masked***";

const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "x-auth-token",
];

const SENSITIVE_FRAGMENTS: &[&str] = &["password", "secret", "token"];

/// Headers that carry credentials and are masked unless entity logging is forced.
pub fn is_sensitive_header(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    SENSITIVE_HEADERS.contains(&name.as_str())
        || SENSITIVE_FRAGMENTS.iter().any(|fragment| name.contains(fragment))
}

pub(crate) fn render(
    top_line: &str,
    request_id: u64,
    headers: &[(String, String)],
    body: &HttpBody,
    always_log: bool,
    mask: bool,
) -> String {
    let mut out = format!("{top_line} id={request_id}");

    for (name, value) in headers {
        let shown = if !always_log && is_sensitive_header(name) {
            MASKED_VALUE
        } else {
            value.as_str()
        };
        let _ = write!(out, "\nheader: {name}={shown}");
    }

    match body {
        HttpBody::Binary(bytes) if !bytes.is_empty() => {
            let _ = write!(out, "\nbody: [binary, {} bytes]", bytes.len());
        }
        HttpBody::Text(text) if !text.is_empty() => {
            let shown = if always_log || !mask { text.as_str() } else { MASKED_VALUE };
            let _ = write!(out, "\nbody: [{} chars] {shown}", text.chars().count());
        }
        _ => out.push_str("\nbody: (no body)"),
    }

    out
}
