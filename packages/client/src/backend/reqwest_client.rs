//! Declarative backend built on `reqwest`.
//!
//! The client is configured once: the resolved rustls configuration is
//! handed over as-is, redirects are disabled, and a custom proxy closure
//! asks the shared [`crate::proxy::ProxyRouter`] for every target URL.
//! Requests run on the instance's own current-thread runtime.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response};
use rustls::pki_types::CertificateDer;
use tokio::runtime::Runtime;
use url::Url;

use super::{
    collect_limited, current_thread_runtime, ensure_ok, header_pairs, release_runtime, status_phrase,
    stream_by_scheme, BackendContext, BackendInit, BackendKind, BodyReader, ChunkFuture, ChunkSource,
    NetworkBackend,
};
use crate::error::{self, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::proxy::ProxyRoute;

pub struct ReqwestBackend {
    context: BackendContext,
    runtime: Option<Arc<Runtime>>,
    client: Option<Client>,
}

impl std::fmt::Debug for ReqwestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestBackend")
            .field("client_id", &self.context.client_id)
            .field("open", &self.is_open())
            .finish()
    }
}

impl NetworkBackend for ReqwestBackend {
    fn init(init: &BackendInit<'_>) -> Result<Self> {
        let context = BackendContext::new(init)?;
        let tls = context.trust.client_config()?;
        let settings = &context.settings;

        let mut builder = Client::builder()
            .use_preconfigured_tls(tls)
            .https_only(false)
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.socket_timeout)
            .timeout(settings.request_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(settings.user_agent.as_str());

        builder = if context.router.has_proxy() {
            let router = context.router.clone();
            let mut proxy = reqwest::Proxy::custom(move |target| match router.route(target) {
                ProxyRoute::Direct => None,
                ProxyRoute::Proxy { proxy, .. } => Some(proxy),
            });
            if let Some(credentials) = context.router.credentials() {
                proxy = proxy.basic_auth(&credentials.username, &credentials.password);
            }
            builder.proxy(proxy)
        } else {
            builder.no_proxy()
        };

        let runtime = current_thread_runtime()?;
        let client = {
            let _entered = runtime.enter();
            builder.build().map_err(error::internal)?
        };

        tracing::info!(
            "{} created: backend=reqwest {} proxy={}",
            context.label,
            crate::tls::debug_text(&context.config),
            context.router.has_proxy()
        );

        Ok(Self {
            context,
            runtime: Some(runtime),
            client: Some(client),
        })
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Reqwest
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
            let (runtime, response) = self.send(&request)?;
            let status = response.status();
            ensure_ok(url, status.as_u16(), &status_phrase(status, response.extensions()))?;
            let reader = BodyReader::new(runtime, ResponseChunks(response), self.context.stats.clone());
            Ok(Box::new(reader) as Box<dyn Read + Send>)
        })
    }

    fn close(&mut self) -> Result<()> {
        self.client = None;
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

impl ReqwestBackend {
    /// Send a request and wait for the response head.
    fn send(&self, request: &HttpRequest) -> Result<(Arc<Runtime>, Response)> {
        let closed = || error::closed(self.context.client_id);
        let runtime = self.runtime.clone().ok_or_else(closed)?;
        let client = self.client.as_ref().ok_or_else(closed)?;

        let mut builder = client.request(http::Method::from(request.method()), request.url().clone());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if request.method().has_body() && !request.body().is_empty() {
            builder = builder.body(request.body().to_bytes());
        }

        let response = runtime
            .block_on(async move { builder.send().await })
            .map_err(|e| map_reqwest_error(e).with_url(request.url().clone()))?;
        Ok((runtime, response))
    }

    /// Full exchange, with the body buffered up to `maxResponseBytes`.
    fn buffer(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let (runtime, response) = self.send(request)?;
        let limit = self.context.settings.max_response_bytes;
        let status = response.status();
        let phrase = status_phrase(status, response.extensions());
        let headers = header_pairs(response.headers());

        let payload = runtime
            .block_on(collect_limited(&mut ResponseChunks(response), limit))
            .map_err(|e| e.with_url(request.url().clone()))?;

        Ok(HttpResponse::from_parts(
            request.request_id(),
            status.as_u16(),
            phrase,
            headers,
            payload,
        ))
    }
}

impl Drop for ReqwestBackend {
    fn drop(&mut self) {
        self.client = None;
        if let Some(runtime) = self.runtime.take() {
            release_runtime(runtime);
        }
    }
}

struct ResponseChunks(Response);

impl ChunkSource for ResponseChunks {
    fn next_chunk(&mut self) -> ChunkFuture<'_> {
        Box::pin(async move { self.0.chunk().await.map_err(map_reqwest_error) })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> error::Error {
    if err.is_builder() {
        error::invalid_request(err)
    } else {
        error::unreachable(err)
    }
}
