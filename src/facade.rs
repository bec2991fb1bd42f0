//! Command surface for the host dispatcher.
//!
//! Every command returns a [`Reply`]; failures are encoded as `error|<reason>`
//! strings so the host never sees a panic or an `Err`.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, error, info};

use crate::config::EngineConfig;
use crate::engine::TranslationEngine;

/// Value handed back to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Number(f64),
}

impl Reply {
    fn text(s: impl Into<String>) -> Self {
        Reply::Text(s.into())
    }

    fn error(reason: impl std::fmt::Display) -> Self {
        Reply::Text(format!("error|{reason}"))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Text(s) => Some(s),
            Reply::Number(_) => None,
        }
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Text(s) => write!(f, "{s}"),
            Reply::Number(n) => write!(f, "{n}"),
        }
    }
}

pub struct ClientFacade {
    engine: TranslationEngine,
}

impl ClientFacade {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_engine(TranslationEngine::new(config))
    }

    pub fn with_engine(engine: TranslationEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &TranslationEngine {
        &self.engine
    }

    pub fn version() -> String {
        format!(
            "transrelay v{} - Multi-language Translation via Proxy Server",
            env!("CARGO_PKG_VERSION")
        )
    }

    /// Dispatch one command. `args[0]` is the subcommand.
    pub fn handle(&self, args: &[&str]) -> Reply {
        match catch_unwind(AssertUnwindSafe(|| self.dispatch(args))) {
            Ok(reply) => reply,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown error".to_string());
                error!(command = args.first().copied().unwrap_or(""), error = %message, "command panicked");
                Reply::error(message)
            }
        }
    }

    fn dispatch(&self, args: &[&str]) -> Reply {
        let Some((&subcmd, rest)) = args.split_first() else {
            return Reply::error("no subcommand specified");
        };
        debug!(subcmd, "command received");

        match subcmd {
            "ping" => Reply::text("pong"),
            "version" => Reply::Text(Self::version()),
            "status" => Reply::Text(self.status()),
            "setkey" => match rest.first() {
                Some(key) => self.set_key(key),
                None => Reply::error("API key required"),
            },
            "credits" => self.credits(),
            "translate_async" => match rest {
                [id, text, tail @ ..] => {
                    let (src, tgt) = self.language_pair(tail);
                    self.translate_async(id, text, src, tgt)
                }
                _ => Reply::error("requestId and text required"),
            },
            "poll" => Reply::Text(self.poll()),
            "translate" => match rest {
                [text, tail @ ..] => {
                    let (src, tgt) = self.language_pair(tail);
                    self.translate(text, src, tgt)
                }
                _ => Reply::error("text required"),
            },
            other => Reply::error(format!("unknown command: {other}")),
        }
    }

    /// Languages apply only when both are given.
    fn language_pair<'a>(&'a self, tail: &[&'a str]) -> (&'a str, &'a str) {
        match tail {
            [src, tgt, ..] => (*src, *tgt),
            _ => {
                let config = self.engine.config();
                (config.default_source_lang.as_str(), config.default_target_lang.as_str())
            }
        }
    }

    pub fn status(&self) -> String {
        let mut status = format!(
            "Status: Active, Translator {}, Server: {}, Pending: {}",
            if self.engine.is_ready() { "Ready" } else { "Not Ready" },
            self.engine.endpoint(),
            self.engine.pending_count()
        );
        let credits = self.engine.credits_remaining();
        if credits >= 0.0 {
            status.push_str(&format!(", Credits: {} cents", credits as i64));
        }
        status
    }

    pub fn set_key(&self, api_key: &str) -> Reply {
        match self.engine.initialize(api_key) {
            Ok(()) => {
                info!("API key set");
                Reply::text("ok")
            }
            Err(e) => {
                error!(error = %e, "failed to initialize with API key");
                Reply::error("initialization failed")
            }
        }
    }

    pub fn credits(&self) -> Reply {
        let credits = self.engine.credits_remaining();
        if credits >= 0.0 {
            Reply::Number(credits)
        } else {
            Reply::text("unknown")
        }
    }

    pub fn translate_async(&self, id: &str, text: &str, src: &str, tgt: &str) -> Reply {
        if !self.engine.is_ready() {
            return Reply::error("translator not initialized");
        }
        if text.is_empty() {
            return Reply::error("empty text");
        }
        if self.engine.enqueue_async(id, text, src, tgt) {
            Reply::text("ok")
        } else {
            Reply::error("failed to queue request")
        }
    }

    /// `id|translation|error|credits`, or empty when nothing is ready.
    pub fn poll(&self) -> String {
        let Some(outcome) = self.engine.poll_one() else {
            return String::new();
        };
        let credits = self.engine.credits_remaining();
        let credits = if credits >= 0.0 {
            (credits as i64).to_string()
        } else {
            String::new()
        };
        debug!(id = %outcome.id, credits = %credits, "poll returned outcome");
        format!(
            "{}|{}|{}|{}",
            outcome.id,
            outcome.translation,
            outcome.error.unwrap_or_default(),
            credits
        )
    }

    pub fn translate(&self, text: &str, src: &str, tgt: &str) -> Reply {
        if !self.engine.is_ready() {
            return Reply::error("translator not initialized");
        }
        match self.engine.translate_sync(text, src, tgt) {
            Ok(translation) => Reply::Text(translation),
            Err(e) => Reply::error(e),
        }
    }
}
