use std::time::Duration;

// ---------------------------------------------------------------------------
// Env-driven configuration. Every knob has a typed default; unset or
// unparseable values fall back silently, matching the rest of the env surface.
// ---------------------------------------------------------------------------

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_BROWSER_WS_URL: &str = "BROWSER_WS_URL";
pub const ENV_SNAPSHOT_DIR: &str = "SNAPSHOT_DIR";

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Retry chain tuning.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub cooldown: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
            cooldown: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_retries: env_parse("RETRY_MAX_RETRIES", d.max_retries),
            initial_delay: Duration::from_secs_f64(env_parse(
                "RETRY_INITIAL_DELAY",
                d.initial_delay.as_secs_f64(),
            )),
            max_delay: Duration::from_secs_f64(env_parse(
                "RETRY_MAX_DELAY",
                d.max_delay.as_secs_f64(),
            )),
            backoff_factor: env_parse("RETRY_BACKOFF_FACTOR", d.backoff_factor),
            cooldown: Duration::from_secs_f64(env_parse(
                "RETRY_COOLDOWN",
                d.cooldown.as_secs_f64(),
            )),
        }
    }
}

/// Worker pool and frontier tuning.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub max_workers: usize,
    pub max_queue_size: usize,
    /// Politeness throttle applied before every fetch.
    pub cooldown: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 3,
            max_queue_size: 876,
            cooldown: Duration::from_secs(1),
        }
    }
}

impl QueueConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_workers: env_parse("SPIDER_MAX_WORKERS", d.max_workers),
            max_queue_size: env_parse("SPIDER_MAX_QUEUE_SIZE", d.max_queue_size),
            cooldown: Duration::from_secs_f64(env_parse(
                "SPIDER_COOLDOWN_SECS",
                d.cooldown.as_secs_f64(),
            )),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// DevTools websocket endpoint of an externally managed browser. Unset
    /// disables the browser fallback entirely.
    pub browser_ws_url: Option<String>,
    pub http_timeout: Duration,
    pub user_agent_index: usize,
    /// Directory for page snapshots. Unset disables snapshots.
    pub snapshot_dir: Option<String>,
    pub retry: RetryConfig,
    pub queue: QueueConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://pressreel.db".to_string(),
            browser_ws_url: None,
            http_timeout: Duration::from_secs(30),
            user_agent_index: 0,
            snapshot_dir: None,
            retry: RetryConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            database_url: env_string(ENV_DATABASE_URL).unwrap_or(d.database_url),
            browser_ws_url: env_string(ENV_BROWSER_WS_URL),
            http_timeout: Duration::from_secs(env_parse("HTTP_TIMEOUT", 30u64)),
            user_agent_index: env_parse("USER_AGENT_INDEX", d.user_agent_index),
            snapshot_dir: env_string(ENV_SNAPSHOT_DIR),
            retry: RetryConfig::from_env(),
            queue: QueueConfig::from_env(),
        }
    }
}
