//! Cloneable handle over one backend instance

use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rustls::pki_types::CertificateDer;
use url::Url;

use crate::backend::{BackendKind, NetworkBackend};
use crate::error::{self, Result};
use crate::http::{HttpRequest, HttpResponse};

/// A client issued by [`super::HttpClientService`].
///
/// Clones share the same backend. Calls are serialised; each one blocks the
/// calling thread for the duration of the exchange.
#[derive(Clone)]
pub struct HttpClient {
    client_id: u64,
    kind: BackendKind,
    backend: Arc<Mutex<Box<dyn NetworkBackend>>>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("client_id", &self.client_id)
            .field("kind", &self.kind)
            .finish()
    }
}

impl HttpClient {
    pub(crate) fn new(backend: Box<dyn NetworkBackend>) -> Self {
        Self {
            client_id: backend.client_id(),
            kind: backend.kind(),
            backend: Arc::new(Mutex::new(backend)),
        }
    }

    // A panic inside a backend call leaves the backend usable.
    fn lock(&self) -> MutexGuard<'_, Box<dyn NetworkBackend>> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// # Errors
    ///
    /// `Closed` after [`HttpClient::close`]; otherwise whatever the exchange
    /// produced.
    pub fn make_request(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut backend = self.lock();
        if !backend.is_open() {
            return Err(error::closed(self.client_id));
        }
        backend.make_request(request)
    }

    /// Open a stream for a `file`, `http` or `https` URL.
    pub fn stream_for_url(&self, url: &Url) -> Result<Box<dyn Read + Send>> {
        let mut backend = self.lock();
        if !backend.is_open() {
            return Err(error::closed(self.client_id));
        }
        backend.stream_for_url(url)
    }

    pub fn read_server_certificates(&self) -> Vec<CertificateDer<'static>> {
        self.lock().read_server_certificates()
    }

    pub fn close(&self) -> Result<()> {
        self.lock().close()
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_open()
    }

    /// True when both handles share one backend.
    pub fn same_instance(&self, other: &HttpClient) -> bool {
        Arc::ptr_eq(&self.backend, &other.backend)
    }
}
