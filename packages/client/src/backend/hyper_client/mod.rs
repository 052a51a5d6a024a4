//! Connection-manager backend built on hyper.
//!
//! Each instance owns a current-thread tokio runtime and two pooled hyper
//! clients over [`ProxyConnector`]: one for direct targets and one for
//! targets routed through the proxy. The route is decided per request, so a
//! pooled connection never serves a target on the other route.
//!
//! Waiting for the response head is bounded by the request timeout. Every
//! body frame must arrive within the socket timeout and before the request
//! deadline.

mod connector;
mod tunnel;

use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rustls::pki_types::CertificateDer;
use tokio::runtime::Runtime;
use url::Url;

use self::connector::{ProxyConnector, ProxyHop};
use super::{
    collect_limited, current_thread_runtime, ensure_ok, header_pairs, release_runtime, status_phrase,
    stream_by_scheme, BackendContext, BackendInit, BackendKind, BodyReader, ChunkFuture, ChunkSource,
    NetworkBackend,
};
use crate::error::{self, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::proxy::{ProxyCredentials, ProxyRoute};

type PooledClient = Client<ProxyConnector, Full<Bytes>>;

pub struct HyperBackend {
    context: BackendContext,
    runtime: Option<Arc<Runtime>>,
    direct: Option<PooledClient>,
    proxied: Option<PooledClient>,
}

impl std::fmt::Debug for HyperBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperBackend")
            .field("client_id", &self.context.client_id)
            .field("open", &self.is_open())
            .field("proxied", &self.proxied.is_some())
            .finish()
    }
}

impl NetworkBackend for HyperBackend {
    fn init(init: &BackendInit<'_>) -> Result<Self> {
        let context = BackendContext::new(init)?;
        let tls = Arc::new(context.trust.client_config()?);
        let connect_timeout = context.settings.connect_timeout;

        let runtime = current_thread_runtime()?;

        let direct = build_client(ProxyConnector::new(tls.clone(), connect_timeout, None));

        let proxied = context.router.proxy_address().map(|(host, port)| {
            let hop = ProxyHop {
                host: host.to_string(),
                port,
                authorization: context.router.credentials().map(ProxyCredentials::basic_header),
            };
            build_client(ProxyConnector::new(tls.clone(), connect_timeout, Some(hop)))
        });

        tracing::info!(
            "{} created: backend=hyper {} proxy={}",
            context.label,
            crate::tls::debug_text(&context.config),
            proxied.is_some()
        );

        Ok(Self {
            context,
            runtime: Some(runtime),
            direct: Some(direct),
            proxied,
        })
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Hyper
    }

    fn client_id(&self) -> u64 {
        self.context.client_id
    }

    fn make_request(&mut self, request: &HttpRequest) -> Result<HttpResponse> {
        let started = self.context.begin(request);
        match self.buffer(request) {
            Ok(response) => {
                self.context.finish(&response, started);
                Ok(response)
            }
            Err(err) => {
                self.context.failed(request, &err, started);
                Err(err)
            }
        }
    }

    fn stream_for_url(&mut self, url: &Url) -> Result<Box<dyn Read + Send>> {
        stream_by_scheme(url, || {
            let request = HttpRequest::get(url.as_str()).build()?;
            self.context.begin(&request);
            let (runtime, parts, body) = self.send(&request)?;
            ensure_ok(url, parts.status.as_u16(), &status_phrase(parts.status, &parts.extensions))?;
            let reader = BodyReader::new(runtime, body, self.context.stats.clone());
            Ok(Box::new(reader) as Box<dyn Read + Send>)
        })
    }

    fn close(&mut self) -> Result<()> {
        self.direct = None;
        self.proxied = None;
        if let Some(runtime) = self.runtime.take() {
            release_runtime(runtime);
            tracing::info!("{} closed", self.context.label);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.runtime.is_some()
    }

    fn read_server_certificates(&self) -> Vec<CertificateDer<'static>> {
        self.context.trust.captured_certificates()
    }
}

impl HyperBackend {
    /// Send a request and wait for the response head. The body is left on
    /// the wire, bound to the request deadline.
    fn send(&self, request: &HttpRequest) -> Result<(Arc<Runtime>, http::response::Parts, FrameChunks)> {
        let closed = || error::closed(self.context.client_id);
        let runtime = self.runtime.clone().ok_or_else(closed)?;

        let route = self.context.router.route(request.url());
        let client = match &route {
            ProxyRoute::Direct => self.direct.clone(),
            ProxyRoute::Proxy { .. } => self.proxied.clone(),
        }
        .ok_or_else(closed)?;

        let wire_request = self.wire_request(request, &route)?;
        let settings = &self.context.settings;
        let deadline = Instant::now() + settings.request_timeout;
        let total = settings.request_timeout;

        let response = runtime
            .block_on(async move {
                match tokio::time::timeout(total, client.request(wire_request)).await {
                    Ok(response) => response.map_err(error::unreachable),
                    Err(_) => Err(error::timeout()),
                }
            })
            .map_err(|e| e.with_url(request.url().clone()))?;

        let (parts, body) = response.into_parts();
        let chunks = FrameChunks {
            body,
            idle: settings.socket_timeout,
            deadline,
        };
        Ok((runtime, parts, chunks))
    }

    /// Full exchange, with the body buffered up to `maxResponseBytes`.
    fn buffer(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let (runtime, parts, mut body) = self.send(request)?;
        let limit = self.context.settings.max_response_bytes;
        let payload = runtime
            .block_on(collect_limited(&mut body, limit))
            .map_err(|e| e.with_url(request.url().clone()))?;

        Ok(HttpResponse::from_parts(
            request.request_id(),
            parts.status.as_u16(),
            status_phrase(parts.status, &parts.extensions),
            header_pairs(&parts.headers),
            payload,
        ))
    }

    fn wire_request(
        &self,
        request: &HttpRequest,
        route: &ProxyRoute,
    ) -> Result<http::Request<Full<Bytes>>> {
        let mut target = request.url().clone();
        target.set_fragment(None);

        let mut builder = http::Request::builder()
            .method(http::Method::from(request.method()))
            .uri(target.as_str());

        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if request.header("user-agent").is_none() {
            builder = builder.header(http::header::USER_AGENT, self.context.settings.user_agent.as_str());
        }
        if let ProxyRoute::Proxy {
            credentials: Some(credentials),
            secure: false,
            ..
        } = route
        {
            if request.header("proxy-authorization").is_none() {
                builder = builder.header(http::header::PROXY_AUTHORIZATION, credentials.basic_header());
            }
        }

        let body = if request.method().has_body() && !request.body().is_empty() {
            request.body().to_bytes()
        } else {
            Bytes::new()
        };

        Ok(builder.body(Full::new(body))?)
    }
}

impl Drop for HyperBackend {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            release_runtime(runtime);
        }
    }
}

fn build_client(connector: ProxyConnector) -> PooledClient {
    Client::builder(TokioExecutor::new())
        .pool_timer(TokioTimer::new())
        .pool_idle_timeout(Duration::from_secs(90))
        .build(connector)
}

/// Body frames of one response. Each frame must arrive within `idle` and
/// before `deadline`.
struct FrameChunks {
    body: Incoming,
    idle: Duration,
    deadline: Instant,
}

impl ChunkSource for FrameChunks {
    fn next_chunk(&mut self) -> ChunkFuture<'_> {
        Box::pin(async move {
            loop {
                let wait = self.idle.min(self.deadline.saturating_duration_since(Instant::now()));
                let frame = match tokio::time::timeout(wait, self.body.frame()).await {
                    Ok(Some(frame)) => frame.map_err(error::unreachable)?,
                    Ok(None) => return Ok(None),
                    Err(_) => return Err(error::timeout()),
                };
                // Trailers carry no payload
                if let Ok(data) = frame.into_data() {
                    if !data.is_empty() {
                        return Ok(Some(data));
                    }
                }
            }
        })
    }
}
