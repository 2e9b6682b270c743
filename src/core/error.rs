use std::time::Duration;

// ---------------------------------------------------------------------------
// Error taxonomy. Fetch errors carry a retry_after hint consumed by the retry
// chain; queue errors are admission outcomes with stable wire codes.
// ---------------------------------------------------------------------------

/// Errors produced by the fetch pipeline (direct HTTP or headless browser).
///
/// Variants that return `Some` from [`FetchError::retry_after`] are retryable;
/// the hint is the minimum wait the server / failure mode suggests.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP status >= 400 from either client.
    #[error("HTTP {status} error")]
    Status { status: u16 },

    /// Body shorter than the plausibility floor after a redirect. The direct
    /// client signals this so the caller prefers the browser fallback.
    #[error("redirect detected with small content ({len} chars), should use browser")]
    ThinRedirect { len: usize },

    /// Transport-level failure (DNS, TLS, connect, body read).
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// Could not reach the browser's DevTools websocket endpoint.
    #[error("browser connection failed: {0}")]
    BrowserConnection(String),

    /// The browser connected but navigation or capture failed.
    #[error("browser fetch failed: {0}")]
    Browser(String),

    /// The request URL did not parse or used a non-HTTP scheme.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Primary client failed and no browser fallback is configured.
    #[error("primary client failed and no fallback available: {0}")]
    NoFallback(String),
}

impl FetchError {
    /// Suggested minimum wait before retrying, or `None` when the error is
    /// not retryable.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::Status { status } => Some(if *status >= 500 {
                Duration::from_secs(10)
            } else {
                Duration::from_secs(2)
            }),
            FetchError::ThinRedirect { .. } => Some(Duration::from_millis(100)),
            FetchError::Transport(_) => Some(Duration::from_secs(5)),
            FetchError::BrowserConnection(_) => Some(Duration::from_secs(5)),
            FetchError::Browser(_) => Some(Duration::from_secs(5)),
            FetchError::InvalidUrl { .. } => None,
            FetchError::NoFallback(_) => None,
        }
    }
}

/// Admission outcomes for the crawl frontier.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("queue is full")]
    Full,

    #[error("URL already crawled")]
    AlreadyDone,

    #[error("URL poisoned (processing_count at cap)")]
    Poisoned,

    #[error("URL already queued by another worker")]
    Duplicate,

    #[error("URL excluded by filter")]
    FilterExcluded,

    #[error("spider is not running")]
    NotRunning,
}

impl QueueError {
    /// Stable code exposed at the core boundary.
    pub fn code(&self) -> &'static str {
        match self {
            QueueError::Full => "queue_full",
            QueueError::AlreadyDone => "already_done",
            QueueError::Poisoned => "poisoned",
            QueueError::Duplicate => "duplicate",
            QueueError::FilterExcluded => "filter_excluded",
            QueueError::NotRunning => "not_running",
        }
    }
}

/// Umbrella error for spider operations.
#[derive(Debug, thiserror::Error)]
pub enum SpiderError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

impl SpiderError {
    pub fn code(&self) -> &'static str {
        match self {
            SpiderError::Fetch(_) => "fetch_failed",
            SpiderError::Queue(q) => q.code(),
            SpiderError::Database(_) => "database_error",
            SpiderError::Parse(_) => "parse_failed",
        }
    }
}
