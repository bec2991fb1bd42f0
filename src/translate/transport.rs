//! HTTPS transport to the translation proxy.
//! One pooled reqwest client per open connection, driven by a private Tokio
//! runtime so the worker thread can issue blocking round trips.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::Url;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("http client setup failed: {0}")]
    Client(String),
}

/// Send-a-body, get-a-body transport (adapter for different backends).
///
/// `post` returns the raw response body, or an empty string on any transport
/// failure. Callers cannot tell a failed connection from an empty reply.
pub trait Transport: Send + Sync {
    fn open(&self, host: &str, port: u16) -> Result<(), TransportError>;
    fn post(&self, path: &str, body: &str) -> String;
    fn close(&self);
    fn is_open(&self) -> bool;
    /// Human-readable endpoint, e.g. `https://host:443`.
    fn endpoint(&self) -> String;
}

struct Connection {
    /// Always `Some` until drop.
    runtime: Option<tokio::runtime::Runtime>,
    http: reqwest::Client,
    base_url: Url,
}

impl Connection {
    /// Run one request to completion on the private runtime. `block_on` panics
    /// on a thread already driving a runtime, so from async callers the request
    /// is driven by a scoped helper thread instead.
    fn exchange(&self, request: reqwest::RequestBuilder) -> String {
        let Some(runtime) = self.runtime.as_ref() else {
            return String::new();
        };
        if tokio::runtime::Handle::try_current().is_err() {
            return runtime.block_on(send(request));
        }
        std::thread::scope(|scope| scope.spawn(|| runtime.block_on(send(request))).join())
            .unwrap_or_else(|_| {
                error!("transport helper thread panicked");
                String::new()
            })
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // A plain drop blocks, which panics inside an async context.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

pub struct HttpsTransport {
    use_tls: bool,
    user_agent: String,
    request_timeout: Duration,
    endpoint: Mutex<String>,
    conn: Mutex<Option<Arc<Connection>>>,
}

impl HttpsTransport {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            use_tls: config.use_tls,
            user_agent: config.user_agent.clone(),
            request_timeout: config.request_timeout,
            endpoint: Mutex::new(format_endpoint(
                config.use_tls,
                &config.server_host,
                config.server_port,
            )),
            conn: Mutex::new(None),
        }
    }

    fn connect(&self, host: &str, port: u16) -> Result<Connection, TransportError> {
        if host.trim().is_empty() {
            return Err(TransportError::InvalidEndpoint("empty host".into()));
        }
        let endpoint = format_endpoint(self.use_tls, host, port);
        let base_url =
            Url::parse(&endpoint).map_err(|e| TransportError::InvalidEndpoint(format!("{endpoint}: {e}")))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("transport-io")
            .enable_all()
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        let http = reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Connection {
            runtime: Some(runtime),
            http,
            base_url,
        })
    }
}

impl Transport for HttpsTransport {
    fn open(&self, host: &str, port: u16) -> Result<(), TransportError> {
        self.close();
        let conn = self.connect(host, port).map_err(|e| {
            error!(host, port, error = %e, "transport_open_failed");
            e
        })?;
        *self.endpoint.lock() = format_endpoint(self.use_tls, host, port);
        *self.conn.lock() = Some(Arc::new(conn));
        info!(endpoint = %self.endpoint(), "transport_open");
        Ok(())
    }

    fn post(&self, path: &str, body: &str) -> String {
        let Some(conn) = self.conn.lock().clone() else {
            error!("post on closed transport");
            return String::new();
        };
        let url = match conn.base_url.join(path) {
            Ok(url) => url,
            Err(e) => {
                error!(path, error = %e, "invalid request path");
                return String::new();
            }
        };

        let request = conn
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .body(body.to_owned());

        conn.exchange(request)
    }

    fn close(&self) {
        // The last Arc to go shuts the runtime down.
        if self.conn.lock().take().is_some() {
            info!("transport_closed");
        }
    }

    fn is_open(&self) -> bool {
        self.conn.lock().is_some()
    }

    fn endpoint(&self) -> String {
        self.endpoint.lock().clone()
    }
}

async fn send(request: reqwest::RequestBuilder) -> String {
    let response = match request.send().await {
        Ok(resp) => resp,
        Err(e) if e.is_timeout() => {
            warn!(error = %e, "request timeout");
            return String::new();
        }
        Err(e) => {
            error!(error = %e, "http request failed");
            return String::new();
        }
    };

    let status = response.status();
    if !status.is_success() {
        // The proxy reports application errors in the body; pass it on.
        warn!(status = status.as_u16(), "non-success status from proxy");
    }
    match response.text().await {
        Ok(text) => {
            debug!(status = status.as_u16(), bytes = text.len(), "response_received");
            text
        }
        Err(e) => {
            error!(error = %e, "failed to read response body");
            String::new()
        }
    }
}

fn format_endpoint(use_tls: bool, host: &str, port: u16) -> String {
    let scheme = if use_tls { "https" } else { "http" };
    format!("{scheme}://{host}:{port}")
}
