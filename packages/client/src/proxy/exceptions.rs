//! Proxy exception patterns
//!
//! Patterns are globs (`*` any run, `?` one character) compared
//! case-insensitively against both the target host and the full target URL,
//! so `*.internal.example.com` and `https://build.example.com/*` both work.

use url::Url;
use wildmatch::WildMatch;

/// Compiled list of patterns whose matches bypass the proxy.
#[derive(Debug, Clone, Default)]
pub struct ProxyExceptions {
    patterns: Vec<(String, WildMatch)>,
}

impl ProxyExceptions {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_ascii_lowercase())
            .filter(|p| !p.is_empty())
            .map(|p| {
                let matcher = WildMatch::new(&p);
                (p, matcher)
            })
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|(raw, _)| raw.as_str())
    }

    /// The first pattern matching the target, if any.
    pub fn matching(&self, target: &Url) -> Option<&str> {
        let host = target.host_str().unwrap_or_default().to_ascii_lowercase();
        let full = target.as_str().to_ascii_lowercase();

        self.patterns
            .iter()
            .find(|(_, matcher)| matcher.matches(&host) || matcher.matches(&full))
            .map(|(raw, _)| raw.as_str())
    }

    pub fn matches(&self, target: &Url) -> bool {
        self.matching(target).is_some()
    }
}
