//! transrelay: cached asynchronous translation through a remote proxy.
//! Library surface: engine construction, command facade, logging setup.

pub mod config;
pub mod engine;
pub mod facade;
pub mod metrics;
pub mod scheduler;
pub mod state_machine;
pub mod translate;

pub use config::EngineConfig;
pub use engine::{EngineError, TranslationEngine};
pub use facade::{ClientFacade, Reply};
pub use state_machine::EngineState;
pub use translate::{ApiFailure, TranslateError, TranslationOutcome};

/// Install the fmt subscriber. `RUST_LOG` overrides the default filter.
/// Calling this more than once is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("transrelay=info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}
