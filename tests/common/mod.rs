#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use transrelay::translate::transport::{Transport, TransportError};
use transrelay::{EngineConfig, TranslationEngine, TranslationOutcome};

/// In-memory transport: replies from a script, records every request body.
pub struct FakeTransport {
    replies: Mutex<VecDeque<String>>,
    /// Used once the script runs out.
    fallback: Mutex<String>,
    bodies: Mutex<Vec<String>>,
    posts: AtomicUsize,
    opens: AtomicUsize,
    open: AtomicBool,
    fail_open: AtomicBool,
    delay: Mutex<Duration>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(r#"{"translation":"ok"}"#.to_string()),
            bodies: Mutex::new(Vec::new()),
            posts: AtomicUsize::new(0),
            opens: AtomicUsize::new(0),
            open: AtomicBool::new(false),
            fail_open: AtomicBool::new(false),
            delay: Mutex::new(Duration::ZERO),
        })
    }

    pub fn push_reply(&self, body: &str) {
        self.replies.lock().push_back(body.to_string());
    }

    pub fn set_fallback(&self, body: &str) {
        *self.fallback.lock() = body.to_string();
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn post_count(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().clone()
    }
}

impl Transport for FakeTransport {
    fn open(&self, host: &str, _port: u16) -> Result<(), TransportError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(TransportError::InvalidEndpoint(host.to_string()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn post(&self, _path: &str, body: &str) -> String {
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.posts.fetch_add(1, Ordering::SeqCst);
        self.bodies.lock().push(body.to_string());
        if !self.open.load(Ordering::SeqCst) {
            return String::new();
        }
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.lock().clone())
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn endpoint(&self) -> String {
        "https://fake.test:443".to_string()
    }
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        idle_poll_interval: Duration::from_millis(5),
        ..EngineConfig::default()
    }
}

pub fn engine_with(transport: &Arc<FakeTransport>) -> TranslationEngine {
    TranslationEngine::with_transport(test_config(), transport.clone())
}

/// Poll until an outcome arrives or the deadline passes.
pub fn wait_for_outcome(engine: &TranslationEngine, timeout: Duration) -> Option<TranslationOutcome> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(outcome) = engine.poll_one() {
            return Some(outcome);
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    None
}
