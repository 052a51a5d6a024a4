//! Response content type classification

use std::fmt;

/// Content type of a response, reduced to what body classification needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HttpContentType {
    Json,
    Xml,
    Html,
    Form,
    #[default]
    Plain,
    OctetStream,
    Png,
    Jpeg,
    Gif,
    Pdf,
    Zip,
    /// Any other well-formed `type/subtype`, lower-cased.
    Other(String),
}

impl HttpContentType {
    /// Parse a `Content-Type` header value. Absent or malformed values
    /// are treated as plain text.
    pub fn from_header(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return HttpContentType::Plain;
        };
        let essence = value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        let Some((kind, subtype)) = essence.split_once('/') else {
            return HttpContentType::Plain;
        };
        if kind.is_empty() || subtype.is_empty() {
            return HttpContentType::Plain;
        }

        match essence.as_str() {
            "application/json" => HttpContentType::Json,
            "application/xml" | "text/xml" => HttpContentType::Xml,
            "text/html" => HttpContentType::Html,
            "application/x-www-form-urlencoded" => HttpContentType::Form,
            "text/plain" => HttpContentType::Plain,
            "application/octet-stream" => HttpContentType::OctetStream,
            "image/png" => HttpContentType::Png,
            "image/jpeg" => HttpContentType::Jpeg,
            "image/gif" => HttpContentType::Gif,
            "application/pdf" => HttpContentType::Pdf,
            "application/zip" => HttpContentType::Zip,
            _ => HttpContentType::Other(essence),
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            HttpContentType::Json => "application/json",
            HttpContentType::Xml => "application/xml",
            HttpContentType::Html => "text/html",
            HttpContentType::Form => "application/x-www-form-urlencoded",
            HttpContentType::Plain => "text/plain",
            HttpContentType::OctetStream => "application/octet-stream",
            HttpContentType::Png => "image/png",
            HttpContentType::Jpeg => "image/jpeg",
            HttpContentType::Gif => "image/gif",
            HttpContentType::Pdf => "application/pdf",
            HttpContentType::Zip => "application/zip",
            HttpContentType::Other(essence) => essence,
        }
    }

    /// Whether a body of this type is kept as bytes rather than decoded.
    pub fn is_binary(&self) -> bool {
        match self {
            HttpContentType::OctetStream
            | HttpContentType::Png
            | HttpContentType::Jpeg
            | HttpContentType::Gif
            | HttpContentType::Pdf
            | HttpContentType::Zip => true,
            HttpContentType::Other(essence) => {
                let (kind, subtype) = essence.split_once('/').unwrap_or((essence, ""));
                match kind {
                    "text" => false,
                    "image" | "audio" | "video" | "font" => true,
                    "application" => !(subtype.ends_with("+json")
                        || subtype.ends_with("+xml")
                        || subtype.contains("javascript")
                        || subtype == "ecmascript"
                        || subtype == "x-ndjson"),
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

impl fmt::Display for HttpContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

#[cfg(test)]
mod tests {
    use super::HttpContentType;

    #[test]
    fn test_defaults_to_plain() {
        assert_eq!(HttpContentType::from_header(None), HttpContentType::Plain);
        assert_eq!(HttpContentType::from_header(Some("garbage")), HttpContentType::Plain);
        assert_eq!(HttpContentType::from_header(Some("")), HttpContentType::Plain);
    }

    #[test]
    fn test_parameters_are_ignored() {
        assert_eq!(
            HttpContentType::from_header(Some("Application/JSON; charset=UTF-8")),
            HttpContentType::Json
        );
    }

    #[test]
    fn test_binary_classification() {
        assert!(HttpContentType::from_header(Some("image/svg+png")).is_binary());
        assert!(HttpContentType::from_header(Some("application/pkix-cert")).is_binary());
        assert!(!HttpContentType::from_header(Some("application/problem+json")).is_binary());
        assert!(!HttpContentType::from_header(Some("text/csv")).is_binary());
        assert!(HttpContentType::OctetStream.is_binary());
        assert!(!HttpContentType::Json.is_binary());
    }
}
