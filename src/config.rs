use std::time::Duration;

/// Engine settings. `Default` matches the proxy deployment; `from_env`
/// overrides individual fields from `TRANSRELAY_*` variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // Remote proxy
    pub server_host: String,
    pub server_port: u16,
    pub use_tls: bool,
    pub translate_path: String,
    pub user_agent: String,
    pub request_timeout: Duration,

    // Cache
    pub cache_capacity: usize,
    pub cache_ttl: Duration,

    // Worker
    pub idle_poll_interval: Duration,

    // Language pair used when the caller omits one
    pub default_source_lang: String,
    pub default_target_lang: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server_host: "translate.example.com".to_string(),
            server_port: 443,
            use_tls: true,
            translate_path: "/api/translate".to_string(),
            user_agent: format!("transrelay/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(15),
            cache_capacity: 500,
            cache_ttl: Duration::from_millis(3_600_000),
            idle_poll_interval: Duration::from_millis(50),
            default_source_lang: "zh".to_string(),
            default_target_lang: "en".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_host: std::env::var("TRANSRELAY_SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: env_parse("TRANSRELAY_SERVER_PORT").unwrap_or(defaults.server_port),
            use_tls: env_parse("TRANSRELAY_USE_TLS").unwrap_or(defaults.use_tls),
            translate_path: std::env::var("TRANSRELAY_TRANSLATE_PATH")
                .unwrap_or(defaults.translate_path),
            user_agent: defaults.user_agent,
            request_timeout: env_parse("TRANSRELAY_REQUEST_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            cache_capacity: env_parse("TRANSRELAY_CACHE_CAPACITY").unwrap_or(defaults.cache_capacity),
            cache_ttl: env_parse("TRANSRELAY_CACHE_TTL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.cache_ttl),
            idle_poll_interval: defaults.idle_poll_interval,
            default_source_lang: std::env::var("TRANSRELAY_SOURCE_LANG")
                .unwrap_or(defaults.default_source_lang),
            default_target_lang: std::env::var("TRANSRELAY_TARGET_LANG")
                .unwrap_or(defaults.default_target_lang),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
