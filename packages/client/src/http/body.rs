use bytes::Bytes;

/// Discriminates how a body was supplied or classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpEntityDataType {
    String,
    ByteArray,
}

/// Message body: absent, text, or binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HttpBody {
    #[default]
    Empty,
    Text(String),
    Binary(Bytes),
}

impl HttpBody {
    /// `None` for an empty body.
    pub fn data_type(&self) -> Option<HttpEntityDataType> {
        match self {
            HttpBody::Empty => None,
            HttpBody::Text(_) => Some(HttpEntityDataType::String),
            HttpBody::Binary(_) => Some(HttpEntityDataType::ByteArray),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            HttpBody::Empty => true,
            HttpBody::Text(text) => text.is_empty(),
            HttpBody::Binary(bytes) => bytes.is_empty(),
        }
    }

    /// Characters for text, bytes for binary.
    pub fn len(&self) -> usize {
        match self {
            HttpBody::Empty => 0,
            HttpBody::Text(text) => text.chars().count(),
            HttpBody::Binary(bytes) => bytes.len(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            HttpBody::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&Bytes> {
        match self {
            HttpBody::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Wire bytes of the body.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            HttpBody::Empty => Bytes::new(),
            HttpBody::Text(text) => Bytes::copy_from_slice(text.as_bytes()),
            HttpBody::Binary(bytes) => bytes.clone(),
        }
    }
}

impl From<String> for HttpBody {
    fn from(text: String) -> Self {
        if text.is_empty() { HttpBody::Empty } else { HttpBody::Text(text) }
    }
}

impl From<&str> for HttpBody {
    fn from(text: &str) -> Self {
        HttpBody::from(text.to_string())
    }
}

impl From<Bytes> for HttpBody {
    fn from(bytes: Bytes) -> Self {
        if bytes.is_empty() { HttpBody::Empty } else { HttpBody::Binary(bytes) }
    }
}

impl From<Vec<u8>> for HttpBody {
    fn from(bytes: Vec<u8>) -> Self {
        HttpBody::from(Bytes::from(bytes))
    }
}
