//! Translation engine: cache-first synchronous translation plus the async
//! request/result pipeline driven by a single worker thread.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::metrics::{metric_names, MetricsRegistry};
use crate::scheduler::{self, Scheduler, WorkerHandle};
use crate::state_machine::{EngineState, StateMachine};
use crate::translate::cache::{CacheKey, TranslationCache};
use crate::translate::decode;
use crate::translate::transport::{HttpsTransport, Transport, TransportError};
use crate::translate::{preview, ApiFailure, TranslateError, TranslationOutcome, TranslationRequest};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to spawn worker: {0}")]
    WorkerSpawn(String),
}

/// Body of a translate call to the proxy.
#[derive(Serialize)]
struct TranslateBody<'a> {
    #[serde(rename = "apiKey")]
    api_key: &'a str,
    text: &'a str,
    from: &'a str,
    to: &'a str,
}

/// State shared between the caller-facing engine and the worker thread.
pub struct TranslationCore {
    config: EngineConfig,
    transport: Arc<dyn Transport>,
    cache: TranslationCache,
    api_key: RwLock<String>,
    /// Last value reported by the proxy; negative means unknown.
    credits: RwLock<f64>,
    state: StateMachine,
    metrics: Arc<MetricsRegistry>,
}

impl TranslationCore {
    fn new(config: EngineConfig, transport: Arc<dyn Transport>) -> Self {
        let cache = TranslationCache::new(config.cache_capacity, config.cache_ttl);
        Self {
            config,
            transport,
            cache,
            api_key: RwLock::new(String::new()),
            credits: RwLock::new(-1.0),
            state: StateMachine::new(),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Cache-first translation. On a miss this performs one blocking round
    /// trip; the cache lock is not held across it.
    pub fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslateError> {
        if !self.state.current().accepts_work() {
            error!("translation engine not initialized");
            return Err(TranslateError::InvalidParams("translator not initialized"));
        }
        if text.is_empty() {
            error!("invalid translation parameters: empty text");
            return Err(TranslateError::InvalidParams("empty text"));
        }

        let key = TranslationCache::compute_key(source_lang, target_lang, text);
        if let Some(hit) = self.cache.get(&key) {
            debug!(text = preview(text, 50), "cache hit");
            return Ok(hit);
        }

        self.cache.evict_expired_and_overflow();

        let body = {
            let api_key = self.api_key.read();
            serde_json::to_string(&TranslateBody {
                api_key: &api_key,
                text,
                from: source_lang,
                to: target_lang,
            })
        }
        .map_err(|e| {
            error!(error = %e, "failed to encode request body");
            TranslateError::Encoding
        })?;
        let span = self.metrics.span(metric_names::TRANSLATE_DONE);

        debug!(
            text = preview(text, 50),
            from = source_lang,
            to = target_lang,
            "requesting translation from proxy"
        );
        let round_trip = self.metrics.span(metric_names::ROUND_TRIP);
        let response = self.transport.post(&self.config.translate_path, &body);
        round_trip.finish();

        let result = self.interpret_response(key, &response);
        span.finish();
        result
    }

    fn interpret_response(&self, key: CacheKey, response: &str) -> Result<String, TranslateError> {
        if response.is_empty() {
            error!("empty response from proxy");
            return Err(TranslateError::Network);
        }
        debug!(response = preview(response, 200), "proxy response");

        let error_text = decode::extract_field(response, "error");
        if !error_text.is_empty() {
            error!(error = %error_text, "proxy error");
            return Err(TranslateError::Api(ApiFailure::from_error_text(&error_text)));
        }

        let translation = decode::extract_field(response, "translation");
        if translation.is_empty() {
            error!("failed to parse translation from response");
            return Err(TranslateError::Api(ApiFailure::Unparseable));
        }

        let credits = decode::extract_number(response, "creditsRemaining");
        if credits >= 0.0 {
            *self.credits.write() = credits;
        }

        self.cache.insert(key, translation.clone());
        debug!(translation = preview(&translation, 50), "translation successful");
        Ok(translation)
    }
}

/// Owned translation service. Construct one and hand it to whatever layer
/// needs it; there is no process-wide instance.
pub struct TranslationEngine {
    core: Arc<TranslationCore>,
    scheduler: Scheduler,
    /// Also serializes initialize/shutdown.
    worker: Mutex<Option<WorkerHandle>>,
}

impl TranslationEngine {
    /// Engine talking to the configured proxy over HTTPS.
    pub fn new(config: EngineConfig) -> Self {
        let transport = Arc::new(HttpsTransport::new(&config));
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: EngineConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            core: Arc::new(TranslationCore::new(config, transport)),
            scheduler: Scheduler::new(),
            worker: Mutex::new(None),
        }
    }

    /// Open the transport and start the worker. Re-initializing a ready engine
    /// shuts it down first.
    pub fn initialize(&self, api_key: &str) -> Result<(), EngineError> {
        let mut worker = self.worker.lock();
        if self.core.state.current() == EngineState::Ready {
            info!("re-initializing translation engine");
            self.shutdown_locked(&mut worker);
        }

        let config = &self.core.config;
        info!(host = %config.server_host, port = config.server_port, "initializing translation engine");
        self.core
            .transport
            .open(&config.server_host, config.server_port)?;
        *self.core.api_key.write() = api_key.to_string();

        // Ready before the worker starts so requests left over from a previous
        // run are accepted.
        let _ = self.core.state.transition(EngineState::Ready);
        match scheduler::spawn_worker(&self.scheduler, Arc::clone(&self.core), config.idle_poll_interval) {
            Ok(handle) => {
                *worker = Some(handle);
                info!(endpoint = %self.core.transport.endpoint(), "translation engine ready");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to spawn worker thread");
                let _ = self.core.state.transition(EngineState::Stopping);
                self.core.transport.close();
                let _ = self.core.state.transition(EngineState::Uninitialized);
                Err(EngineError::WorkerSpawn(e.to_string()))
            }
        }
    }

    /// Stop the worker, close the transport, clear the cache. Safe to call at
    /// any time, any number of times.
    pub fn shutdown(&self) {
        let mut worker = self.worker.lock();
        self.shutdown_locked(&mut worker);
    }

    fn shutdown_locked(&self, worker: &mut Option<WorkerHandle>) {
        if self.core.state.current() != EngineState::Ready {
            return;
        }
        let _ = self.core.state.transition(EngineState::Stopping);
        if let Some(handle) = worker.take() {
            handle.stop_and_join();
        }
        self.core.transport.close();
        self.core.cache.clear();
        let _ = self.core.state.transition(EngineState::Uninitialized);
        match serde_json::to_string(&self.core.metrics.summary()) {
            Ok(summary) => info!(metrics = %summary, "translation engine shut down"),
            Err(_) => info!("translation engine shut down"),
        }
    }

    /// Translate on the caller's thread, bypassing the queue.
    pub fn translate_sync(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslateError> {
        if !self.is_ready() {
            warn!("translate_sync on uninitialized engine");
            return Err(TranslateError::InvalidParams("translator not initialized"));
        }
        self.core.translate(text, source_lang, target_lang)
    }

    /// Queue a request for the worker. Returns false when not ready.
    pub fn enqueue_async(&self, id: &str, text: &str, source_lang: &str, target_lang: &str) -> bool {
        if !self.is_ready() {
            return false;
        }
        let queued = self
            .scheduler
            .submit(TranslationRequest::new(id, text, source_lang, target_lang));
        if queued {
            debug!(id, from = source_lang, to = target_lang, "async request queued");
        }
        queued
    }

    /// Oldest completed outcome, if any.
    pub fn poll_one(&self) -> Option<TranslationOutcome> {
        self.scheduler.poll()
    }

    pub fn pending_count(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn credits_remaining(&self) -> f64 {
        *self.core.credits.read()
    }

    pub fn is_ready(&self) -> bool {
        self.core.state.current() == EngineState::Ready
    }

    pub fn state(&self) -> EngineState {
        self.core.state.current()
    }

    pub fn endpoint(&self) -> String {
        self.core.transport.endpoint()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.core.config
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.core.metrics
    }

    pub fn cache_len(&self) -> usize {
        self.core.cache.len()
    }
}

impl Drop for TranslationEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
