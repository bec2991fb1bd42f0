//! Two-queue scheduler: requests in, outcomes out, one worker in between.
//! Both queues are unbounded crossbeam channels so the caller never blocks.
//! The worker runs on a dedicated OS thread and drains requests in FIFO order.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel as cb;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::TranslationCore;
use crate::metrics::metric_names;
use crate::translate::{preview, TranslationOutcome, TranslationRequest};

/// Owns the request and result queues. Lives as long as the engine, so requests
/// left behind at shutdown are picked up by the next worker.
pub struct Scheduler {
    request_tx: cb::Sender<TranslationRequest>,
    request_rx: cb::Receiver<TranslationRequest>,
    result_tx: cb::Sender<TranslationOutcome>,
    result_rx: cb::Receiver<TranslationOutcome>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (request_tx, request_rx) = cb::unbounded();
        let (result_tx, result_rx) = cb::unbounded();
        Self {
            request_tx,
            request_rx,
            result_tx,
            result_rx,
        }
    }

    /// Append a request. Never blocks.
    pub fn submit(&self, request: TranslationRequest) -> bool {
        match self.request_tx.send(request) {
            Ok(()) => true,
            Err(cb::SendError(req)) => {
                error!(id = %req.id, "request queue closed");
                false
            }
        }
    }

    /// Oldest completed outcome, if any. Never blocks.
    pub fn poll(&self) -> Option<TranslationOutcome> {
        self.result_rx.try_recv().ok()
    }

    /// Requests not yet picked up by the worker.
    pub fn pending(&self) -> usize {
        self.request_rx.len()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Running worker thread plus the token that stops it.
pub struct WorkerHandle {
    stop: CancellationToken,
    thread: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal stop and wait for the current unit of work to finish.
    pub fn stop_and_join(self) {
        self.stop.cancel();
        if self.thread.join().is_err() {
            error!("translate worker panicked");
        }
    }
}

/// Worker loop: runs on a dedicated OS thread (not Tokio).
/// Checks the stop token at the top of every iteration; waits at most
/// `idle` for a request before checking again.
pub fn spawn_worker(
    scheduler: &Scheduler,
    core: Arc<TranslationCore>,
    idle: Duration,
) -> std::io::Result<WorkerHandle> {
    let stop = CancellationToken::new();
    let rx = scheduler.request_rx.clone();
    let tx = scheduler.result_tx.clone();
    let token = stop.clone();

    let thread = std::thread::Builder::new()
        .name("translate-worker".into())
        .spawn(move || {
            info!("worker thread started");
            while !token.is_cancelled() {
                match rx.recv_timeout(idle) {
                    Ok(request) => {
                        let outcome = process_request(&core, request);
                        if tx.send(outcome).is_err() {
                            warn!("result queue closed, exiting worker");
                            break;
                        }
                    }
                    Err(cb::RecvTimeoutError::Timeout) => continue,
                    Err(cb::RecvTimeoutError::Disconnected) => {
                        info!("request queue closed, exiting worker");
                        break;
                    }
                }
            }
            info!("worker thread stopped");
        })?;

    Ok(WorkerHandle { stop, thread })
}

fn process_request(core: &TranslationCore, request: TranslationRequest) -> TranslationOutcome {
    let wait_us = request.submitted_at.elapsed().as_micros() as f64;
    core.metrics().record(metric_names::QUEUE_WAIT, wait_us);
    debug!(
        id = %request.id,
        trace_id = %request.trace_id,
        from = %request.source_lang,
        to = %request.target_lang,
        text = preview(&request.text, 50),
        "processing async request"
    );

    let result = catch_unwind(AssertUnwindSafe(|| {
        core.translate(&request.text, &request.source_lang, &request.target_lang)
    }));

    let outcome = match result {
        Ok(result) => TranslationOutcome::from_result(request.id, result),
        Err(_) => {
            error!(id = %request.id, trace_id = %request.trace_id, "translation panicked");
            TranslationOutcome {
                id: request.id,
                translation: String::new(),
                error: Some("unknown error".to_string()),
                ready: true,
            }
        }
    };

    match &outcome.error {
        None => debug!(id = %outcome.id, trace_id = %request.trace_id, "async request completed"),
        Some(err) => warn!(id = %outcome.id, trace_id = %request.trace_id, error = %err, "async request failed"),
    }
    outcome
}
