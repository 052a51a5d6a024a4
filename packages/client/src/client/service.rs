//! Client registry.
//!
//! Clients are cached per configuration and per thread: a thread asking for
//! the same [`ClientConfiguration`] twice gets the same instance back, while
//! two threads never share one. Every issued client is also tracked in a
//! flat set so shutdown reaches instances whose threads are gone.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use dashmap::DashMap;

use super::instance::HttpClient;
use super::stats::{StatisticsCounters, StatisticsSnapshot};
use crate::backend::{provider_for, BackendInit, BackendProvider};
use crate::config::{AppSettings, ClientConfiguration};
use crate::error::Result;

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

type ThreadSlots = Arc<DashMap<ThreadId, HttpClient>>;

pub struct HttpClientService {
    settings: AppSettings,
    provider: BackendProvider,
    provider_name: String,
    session_label: Option<String>,
    slots: DashMap<ClientConfiguration, ThreadSlots>,
    issued: DashMap<u64, HttpClient>,
    stats: Arc<StatisticsCounters>,
}

impl std::fmt::Debug for HttpClientService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientService")
            .field("provider", &self.provider_name)
            .field("issued", &self.issued.len())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl HttpClientService {
    /// Start the service with the backend named by
    /// `http.client.implementation`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no backend has that name.
    pub fn open(settings: AppSettings) -> Result<Self> {
        let provider = provider_for(&settings.implementation)?;
        let name = settings.implementation.to_ascii_lowercase();
        Ok(Self::build(settings, provider, name))
    }

    /// Start the service with a caller-supplied backend provider.
    pub fn with_provider(settings: AppSettings, provider: BackendProvider) -> Self {
        Self::build(settings, provider, "custom".to_string())
    }

    fn build(settings: AppSettings, provider: BackendProvider, provider_name: String) -> Self {
        tracing::info!("http client service started with backend '{provider_name}'");
        Self {
            settings,
            provider,
            provider_name,
            session_label: None,
            slots: DashMap::new(),
            issued: DashMap::new(),
            stats: Arc::new(StatisticsCounters::new()),
        }
    }

    /// Prefix log lines of clients created from now on with `label`.
    #[must_use]
    pub fn with_session_label(mut self, label: impl Into<String>) -> Self {
        self.session_label = Some(label.into());
        self
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// The calling thread's client for `config`, created on first use.
    ///
    /// # Errors
    ///
    /// Propagates backend construction failures (bad trust or proxy
    /// configuration, transport setup).
    pub fn get_client(&self, config: &ClientConfiguration) -> Result<HttpClient> {
        let thread_slots = self
            .slots
            .entry(config.clone())
            .or_insert_with(|| Arc::new(DashMap::new()))
            .value()
            .clone();
        let thread = thread::current().id();

        if let Some(cached) = thread_slots.get(&thread).map(|c| c.value().clone()) {
            if cached.is_open() {
                self.stats.record_reused();
                return Ok(cached);
            }
            tracing::debug!("replacing closed client-{}", cached.client_id());
            thread_slots.remove(&thread);
            self.issued.remove(&cached.client_id());
        }

        // Only this thread writes its own slot, so no other creator can race us.
        let client = self.create(config)?;
        thread_slots.insert(thread, client.clone());
        Ok(client)
    }

    fn create(&self, config: &ClientConfiguration) -> Result<HttpClient> {
        let client_id = NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed);
        let init = BackendInit {
            settings: &self.settings,
            stats: self.stats.clone(),
            config,
            session_label: self.session_label.as_deref(),
            client_id,
        };

        let client = HttpClient::new((self.provider)(&init)?);
        self.issued.insert(client.client_id(), client.clone());
        self.stats.record_created();
        Ok(client)
    }

    /// Close every issued client. Failures are logged and skipped.
    pub fn close(&self) {
        let clients: Vec<HttpClient> = self.issued.iter().map(|e| e.value().clone()).collect();
        tracing::info!("closing {} http clients", clients.len());

        for client in clients {
            let id = client.client_id();
            match catch_unwind(AssertUnwindSafe(|| client.close())) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!("failed to close client-{id}: {err}"),
                Err(_) => tracing::warn!("client-{id} panicked while closing"),
            }
            self.issued.remove(&id);
        }
        self.slots.clear();
    }

    /// Number of clients issued and not yet closed by the service.
    pub fn tracked_clients(&self) -> usize {
        self.issued.len()
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }

    /// Flat view of the service state for health output.
    pub fn debug_data(&self) -> BTreeMap<String, String> {
        let mut data = self.statistics().to_map();
        data.insert("implementation".to_string(), self.provider_name.clone());
        data.insert("trackedClients".to_string(), self.issued.len().to_string());
        data.insert("configurations".to_string(), self.slots.len().to_string());
        data.insert(
            "proxy".to_string(),
            self.settings
                .proxy_url
                .as_deref()
                .map(redact_proxy)
                .unwrap_or_else(|| "none".to_string()),
        );
        data
    }
}

fn redact_proxy(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "<invalid>".to_string(),
    }
}
