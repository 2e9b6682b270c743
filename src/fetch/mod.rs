//! Two-tier fetch pipeline: a direct HTTP client backed by an optional
//! headless-browser fallback, both wrapped in the retry chain.

mod browser_client;
mod http_client;

pub use browser_client::{BrowserClient, BrowserConfig};
pub use http_client::DirectClient;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::core::config::AppConfig;
use crate::core::error::FetchError;
use crate::core::retry::RetryPolicy;
use crate::core::types::{HttpRequest, HttpResponse};

/// Desktop/mobile user agents selectable by `USER_AGENT_INDEX`.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (iPad; CPU OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
];

pub fn user_agent(index: usize) -> &'static str {
    USER_AGENTS.get(index).copied().unwrap_or(USER_AGENTS[0])
}

/// The fetch seam every scraper talks through.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError>;
}

/// Primary-then-browser fetch policy. Any primary error triggers the browser
/// when one is configured; otherwise the primary error propagates.
pub struct FallbackClient {
    primary: DirectClient,
    browser: Option<Arc<BrowserClient>>,
}

impl FallbackClient {
    pub fn new(primary: DirectClient, browser: Option<Arc<BrowserClient>>) -> Self {
        info!(
            "FallbackClient initialized - browser fallback: {}",
            if browser.is_some() { "ENABLED" } else { "DISABLED" }
        );
        Self { primary, browser }
    }

    pub fn browser(&self) -> Option<&Arc<BrowserClient>> {
        self.browser.as_ref()
    }

    /// Tear down the browser connection, if any. Shutdown errors are logged
    /// and swallowed.
    pub async fn close(&self) {
        if let Some(browser) = &self.browser {
            browser.close().await;
        }
    }
}

#[async_trait]
impl HttpClient for FallbackClient {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        info!("[FALLBACK CLIENT] Attempting direct fetch (primary)...");
        let primary_err = match self.primary.fetch(request).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        warn!("[FALLBACK CLIENT] Primary client failed: {}", primary_err);
        let Some(browser) = &self.browser else {
            return Err(FetchError::NoFallback(primary_err.to_string()));
        };

        info!("[FALLBACK CLIENT] Falling back to browser mode...");
        browser.fetch(request).await
    }
}

/// Builds clients from configuration, wiring the default retry chain unless
/// the caller injects a specific one.
pub struct ClientFactory;

impl ClientFactory {
    pub fn direct_client(config: &AppConfig, retry: Option<RetryPolicy>) -> DirectClient {
        let retry = retry.unwrap_or_else(|| RetryPolicy::from_config(&config.retry));
        DirectClient::new(config.http_timeout, config.user_agent_index, retry)
    }

    pub fn browser_client(
        config: &AppConfig,
        retry: Option<RetryPolicy>,
    ) -> Option<Arc<BrowserClient>> {
        let Some(ws_url) = config.browser_ws_url.clone() else {
            info!("Browser client not created - websocket URL not configured");
            return None;
        };
        info!("Creating browser client with websocket: {}", ws_url);

        let retry = retry.unwrap_or_else(|| RetryPolicy::from_config(&config.retry));
        let browser_config = BrowserConfig {
            websocket_url: ws_url,
            user_agent: user_agent(config.user_agent_index).to_string(),
            timeout: config.http_timeout,
            ..BrowserConfig::default()
        };
        Some(Arc::new(BrowserClient::new(browser_config, retry)))
    }

    /// The standard two-tier pipeline.
    pub fn with_fallback(config: &AppConfig, retry: Option<RetryPolicy>) -> FallbackClient {
        let primary = Self::direct_client(config, retry.clone());
        let browser = Self::browser_client(config, retry);
        FallbackClient::new(primary, browser)
    }
}
