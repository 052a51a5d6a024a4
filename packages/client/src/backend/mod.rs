//! Network backends.
//!
//! A backend owns the transport for one client instance: trust material,
//! proxy routing, timeouts and connection reuse. Two interchangeable
//! implementations exist, selected by name through [`provider_for`]:
//!
//! - [`HyperBackend`] (`hyper`) drives a hyper client over its own socket
//!   factory.
//! - [`ReqwestBackend`] (`reqwest`) wraps the declarative reqwest client.
//!
//! Both run their async client on a per-instance current-thread runtime,
//! resolve trust through [`crate::tls::resolve_trust`] and route through the
//! same [`ProxyRouter`], so they behave identically for callers. Streams
//! handed out by [`NetworkBackend::stream_for_url`] keep the runtime alive
//! until they are dropped.

pub mod hyper_client;
pub mod reqwest_client;

use std::fmt;
use std::fs::File;
use std::future::Future;
use std::io::{self, Read};
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use http::{Extensions, HeaderMap, StatusCode};
use rustls::pki_types::CertificateDer;
use tokio::runtime::Runtime;
use url::Url;

pub use hyper_client::HyperBackend;
pub use reqwest_client::ReqwestBackend;

use crate::client::stats::StatisticsCounters;
use crate::config::{AppSettings, ClientConfiguration, ConfigurationError};
use crate::error::{self, Result};
use crate::http::{Headers, HttpRequest, HttpResponse};
use crate::proxy::ProxyRouter;
use crate::tls::{resolve_trust, ResolvedTrust};

/// Everything a backend needs to build itself.
#[derive(Debug)]
pub struct BackendInit<'a> {
    pub settings: &'a AppSettings,
    pub stats: Arc<StatisticsCounters>,
    pub config: &'a ClientConfiguration,
    /// Optional label prefixed to this client's log lines
    pub session_label: Option<&'a str>,
    pub client_id: u64,
}

/// One client instance's transport.
///
/// Instances are `Send` but never shared: callers serialise access, so every
/// operation takes `&mut self` or `&self` without interior locking.
pub trait NetworkBackend: Send {
    /// Resolve trust, build the transport and apply timeouts.
    ///
    /// # Errors
    ///
    /// Configuration errors for unusable trust or proxy settings, internal
    /// errors when the transport cannot be built.
    fn init(init: &BackendInit<'_>) -> Result<Self>
    where
        Self: Sized;

    fn kind(&self) -> BackendKind;

    fn client_id(&self) -> u64;

    /// Execute one exchange and buffer the response.
    fn make_request(&mut self, request: &HttpRequest) -> Result<HttpResponse>;

    /// Open a byte stream for a `file`, `http` or `https` URL.
    fn stream_for_url(&mut self, url: &Url) -> Result<Box<dyn Read + Send>>;

    /// Release the transport. Calling it again is a no-op.
    fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Certificates captured by a certificate-reading trust strategy, end
    /// entity first. Empty for every other strategy.
    fn read_server_certificates(&self) -> Vec<CertificateDer<'static>>;
}

/// Builds a backend for the service.
pub type BackendProvider =
    Arc<dyn Fn(&BackendInit<'_>) -> Result<Box<dyn NetworkBackend>> + Send + Sync>;

/// Available backend implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Hyper,
    Reqwest,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Hyper, BackendKind::Reqwest];

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Hyper => "hyper",
            BackendKind::Reqwest => "reqwest",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PROVIDERS
            .iter()
            .find(|(kind, _)| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .map(|(kind, _)| *kind)
            .ok_or_else(|| ConfigurationError::UnknownImplementation(s.to_string()))
    }
}

type Constructor = fn(&BackendInit<'_>) -> Result<Box<dyn NetworkBackend>>;

static PROVIDERS: &[(BackendKind, Constructor)] = &[
    (BackendKind::Hyper, construct::<HyperBackend> as Constructor),
    (BackendKind::Reqwest, construct::<ReqwestBackend> as Constructor),
];

fn construct<B: NetworkBackend + 'static>(init: &BackendInit<'_>) -> Result<Box<dyn NetworkBackend>> {
    Ok(Box::new(B::init(init)?))
}

/// Look up the provider registered under `name` (case-insensitive).
///
/// # Errors
///
/// Returns a configuration error for an unknown implementation name.
pub fn provider_for(name: &str) -> Result<BackendProvider> {
    let kind = BackendKind::from_str(name)?;
    let constructor = PROVIDERS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, c)| *c)
        .ok_or_else(|| ConfigurationError::UnknownImplementation(name.to_string()))?;
    Ok(Arc::new(constructor))
}

/// State both backends carry: settings, counters, trust and routing.
#[derive(Debug)]
pub(crate) struct BackendContext {
    pub settings: AppSettings,
    pub config: ClientConfiguration,
    pub stats: Arc<StatisticsCounters>,
    pub client_id: u64,
    pub label: String,
    pub trust: ResolvedTrust,
    pub router: ProxyRouter,
}

impl BackendContext {
    pub fn new(init: &BackendInit<'_>) -> Result<Self> {
        let trust = resolve_trust(init.settings, init.config)?;
        let router = ProxyRouter::from_settings(init.settings)?;
        let label = match init.session_label {
            Some(session) => format!("{session}/client-{}", init.client_id),
            None => format!("client-{}", init.client_id),
        };

        Ok(Self {
            settings: init.settings.clone(),
            config: init.config.clone(),
            stats: init.stats.clone(),
            client_id: init.client_id,
            label,
            trust,
            router,
        })
    }

    /// Count and trace an outgoing request.
    pub fn begin(&self, request: &HttpRequest) -> Instant {
        self.stats.record_request(request.size());
        if tracing::enabled!(tracing::Level::DEBUG) {
            let top_line = format!("{} >> {} {}", self.label, request.method(), request.url());
            tracing::debug!(
                "{}",
                request.to_debug_string(
                    &top_line,
                    self.settings.always_log_entities,
                    self.config.mask_debug_body(),
                )
            );
        }
        Instant::now()
    }

    /// Count and trace a received response.
    pub fn finish(&self, response: &HttpResponse, started: Instant) {
        self.stats.record_response(response.size());
        if tracing::enabled!(tracing::Level::DEBUG) {
            let top_line = format!(
                "{} << {} {} ({} ms)",
                self.label,
                response.status_code(),
                response.status_phrase(),
                started.elapsed().as_millis()
            );
            tracing::debug!(
                "{}",
                response.to_debug_string(
                    &top_line,
                    self.settings.always_log_entities,
                    self.config.mask_debug_body(),
                )
            );
        }
    }

    /// Trace a failed exchange.
    pub fn failed(&self, request: &HttpRequest, err: &error::Error, started: Instant) {
        tracing::debug!(
            "{} !! {} {} id={} failed after {} ms: {}",
            self.label,
            request.method(),
            request.url(),
            request.request_id(),
            started.elapsed().as_millis(),
            err
        );
    }
}

/// Dispatch on the URL scheme: local files are opened directly, `http` and
/// `https` go through `remote`, anything else is unsupported.
pub(crate) fn stream_by_scheme<F>(url: &Url, remote: F) -> Result<Box<dyn Read + Send>>
where
    F: FnOnce() -> Result<Box<dyn Read + Send>>,
{
    match url.scheme() {
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|()| error::invalid_request(format!("not a local file url: {url}")))?;
            let file = File::open(&path).map_err(|e| error::unreachable(e).with_url(url.clone()))?;
            Ok(Box::new(file))
        }
        "http" | "https" => remote(),
        _ => Err(error::unsupported_scheme(url.clone())),
    }
}

/// Anything but `200 OK` fails a stream with the status line.
pub(crate) fn ensure_ok(url: &Url, status: u16, phrase: &str) -> Result<()> {
    if status == 200 {
        return Ok(());
    }
    let code = StatusCode::from_u16(status).map_err(error::internal)?;
    Err(error::remote(
        url.clone(),
        code,
        format!("HTTP/1.1 {status} {phrase}"),
    ))
}

/// Reason phrase as received on the wire, else the canonical one.
pub(crate) fn status_phrase(status: StatusCode, extensions: &Extensions) -> String {
    extensions
        .get::<hyper::ext::ReasonPhrase>()
        .map(|reason| String::from_utf8_lossy(reason.as_bytes()).into_owned())
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_default()
}

pub(crate) fn header_pairs(headers: &HeaderMap) -> Headers {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

pub(crate) fn current_thread_runtime() -> Result<Arc<Runtime>> {
    tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()
        .map(Arc::new)
        .map_err(error::internal)
}

/// Give up one handle on a backend runtime. The last holder shuts it down
/// without waiting, since dropping a runtime inside another one panics.
pub(crate) fn release_runtime(runtime: Arc<Runtime>) {
    if let Ok(runtime) = Arc::try_unwrap(runtime) {
        runtime.shutdown_background();
    }
}

pub(crate) type ChunkFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<Bytes>>> + Send + 'a>>;

/// A response body read chunk by chunk. `None` marks the end.
pub(crate) trait ChunkSource: Send {
    fn next_chunk(&mut self) -> ChunkFuture<'_>;
}

/// Buffer a whole body, failing once it passes `limit` bytes.
pub(crate) async fn collect_limited<S: ChunkSource>(source: &mut S, limit: u64) -> Result<Bytes> {
    let mut collected = BytesMut::new();
    while let Some(chunk) = source.next_chunk().await? {
        if (collected.len() + chunk.len()) as u64 > limit {
            return Err(error::payload_too_large(limit));
        }
        collected.extend_from_slice(&chunk);
    }
    Ok(collected.freeze())
}

/// Blocking reader over an async body. Each read drives the owning runtime
/// until the next chunk arrives and adds the bytes it yields to the response
/// counter. Bodies are not capped.
pub(crate) struct BodyReader<S: ChunkSource> {
    runtime: Option<Arc<Runtime>>,
    source: S,
    pending: Bytes,
    finished: bool,
    stats: Arc<StatisticsCounters>,
}

impl<S: ChunkSource> BodyReader<S> {
    pub fn new(runtime: Arc<Runtime>, source: S, stats: Arc<StatisticsCounters>) -> Self {
        Self {
            runtime: Some(runtime),
            source,
            pending: Bytes::new(),
            finished: false,
            stats,
        }
    }
}

impl<S: ChunkSource> Read for BodyReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pending.is_empty() {
            if self.finished {
                return Ok(0);
            }
            let Some(runtime) = self.runtime.as_ref() else {
                return Ok(0);
            };
            match runtime.block_on(self.source.next_chunk()) {
                Ok(Some(chunk)) => self.pending = chunk,
                Ok(None) => self.finished = true,
                Err(err) => {
                    let kind = if err.is_timeout() {
                        io::ErrorKind::TimedOut
                    } else {
                        io::ErrorKind::Other
                    };
                    return Err(io::Error::new(kind, err));
                }
            }
        }

        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending.split_to(n));
        self.stats.record_response(n as u64);
        Ok(n)
    }
}

impl<S: ChunkSource> Drop for BodyReader<S> {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            release_runtime(runtime);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_names() {
        assert!(provider_for("hyper").is_ok());
        assert!(provider_for("REQWEST").is_ok());
        let err = provider_for("curl").err().expect("unknown provider");
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unknown_scheme_is_unsupported() {
        let url = Url::parse("ftp://example.com/file").expect("url");
        let err = stream_by_scheme(&url, || unreachable!("remote not used"))
            .err()
            .expect("ftp rejected");
        assert!(err.is_unsupported());
    }

    struct Chunks(Vec<&'static [u8]>);

    impl ChunkSource for Chunks {
        fn next_chunk(&mut self) -> ChunkFuture<'_> {
            let next = if self.0.is_empty() {
                None
            } else {
                Some(Bytes::from_static(self.0.remove(0)))
            };
            Box::pin(async move { Ok(next) })
        }
    }

    #[test]
    fn test_body_reader_yields_every_chunk_and_counts_bytes() {
        let runtime = current_thread_runtime().expect("runtime");
        let stats = Arc::new(StatisticsCounters::new());
        let mut reader = BodyReader::new(runtime, Chunks(vec![&b"ab"[..], &b""[..], &b"cde"[..]]), stats.clone());

        let mut small = [0u8; 1];
        assert_eq!(reader.read(&mut small).expect("first byte"), 1);
        assert_eq!(&small, b"a");

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).expect("rest");
        assert_eq!(rest, b"bcde");
        assert_eq!(stats.snapshot().response_bytes, 5);
    }

    #[test]
    fn test_collect_limited_rejects_oversized_bodies() {
        let runtime = current_thread_runtime().expect("runtime");
        let collected = runtime
            .block_on(collect_limited(&mut Chunks(vec![&b"abc"[..], &b"de"[..]]), 5))
            .expect("within limit");
        assert_eq!(&collected[..], b"abcde");

        let err = runtime
            .block_on(collect_limited(&mut Chunks(vec![&b"abc"[..], &b"def"[..]]), 5))
            .expect_err("over limit");
        assert!(err.is_payload_too_large());
        release_runtime(runtime);
    }

    #[test]
    fn test_non_200_carries_status_line() {
        let url = Url::parse("http://example.com/missing").expect("url");
        let err = ensure_ok(&url, 404, "Not Found").expect_err("404 fails");
        assert!(err.is_remote());
        assert!(err.to_string().contains("404 Not Found"));
        assert!(ensure_ok(&url, 200, "OK").is_ok());
    }
}
