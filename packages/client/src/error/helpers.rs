use std::fmt;

/// A marker type to indicate that a connect, read or request deadline passed.
#[derive(Debug)]
pub struct TimedOut;

impl fmt::Display for TimedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("timed out")
    }
}

impl std::error::Error for TimedOut {}

/// A marker type to indicate that a URL scheme was bad.
#[derive(Debug)]
pub struct BadScheme(pub String);

impl fmt::Display for BadScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported url scheme '{}'", self.0)
    }
}

impl std::error::Error for BadScheme {}

/// A marker type to indicate that the client was already closed.
#[derive(Debug)]
pub struct ClientClosed(pub u64);

impl fmt::Display for ClientClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client #{} has been closed", self.0)
    }
}

impl std::error::Error for ClientClosed {}
