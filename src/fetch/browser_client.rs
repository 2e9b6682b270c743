use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::error::FetchError;
use crate::core::retry::RetryPolicy;
use crate::core::types::{HttpRequest, HttpResponse};

use super::HttpClient;

/// Headless browser tuning. The browser itself is externally managed; this
/// client only attaches over its DevTools websocket.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub websocket_url: String,
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub timeout: Duration,
    /// Wait for `document.readyState === "complete"` after navigation.
    pub wait_for_ready_state: bool,
    /// Poll content length until it stops changing (network-quiescence proxy).
    pub wait_for_network_idle: bool,
    /// Extra settle time for late-hydrating content.
    pub additional_wait: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            websocket_url: String::new(),
            user_agent: String::new(),
            viewport_width: 1920,
            viewport_height: 1080,
            timeout: Duration::from_secs(30),
            wait_for_ready_state: true,
            wait_for_network_idle: true,
            additional_wait: Duration::from_secs(2),
        }
    }
}

struct Connection {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

/// Headless browser client over a shared DevTools connection. Lazily
/// connected, single instance; every fetch opens a fresh tab and closes it on
/// all exit paths.
pub struct BrowserClient {
    config: BrowserConfig,
    retry: RetryPolicy,
    connection: Mutex<Option<Connection>>,
}

impl BrowserClient {
    pub fn new(config: BrowserConfig, retry: RetryPolicy) -> Self {
        Self {
            config,
            retry,
            connection: Mutex::new(None),
        }
    }

    /// Connect on first use; reuse the connection across tabs afterwards.
    async fn ensure_connected(&self) -> Result<(), FetchError> {
        let mut guard = self.connection.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        info!(
            "[BROWSER MODE] Connecting to browser via websocket: {}",
            self.config.websocket_url
        );
        let (browser, mut handler) = Browser::connect(self.config.websocket_url.as_str())
            .await
            .map_err(|e| FetchError::BrowserConnection(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    error!("CDP handler error: {}", e);
                }
            }
        });

        info!("[BROWSER MODE] Successfully connected to browser via websocket");
        *guard = Some(Connection {
            browser,
            handler_task,
        });
        Ok(())
    }

    async fn new_page(&self) -> Result<Page, FetchError> {
        self.ensure_connected().await?;
        let guard = self.connection.lock().await;
        let Some(conn) = guard.as_ref() else {
            return Err(FetchError::BrowserConnection(
                "browser connection lost".to_string(),
            ));
        };
        conn.browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))
    }

    async fn fetch_once(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        info!("[BROWSER MODE] Fetching URL: {}", request.url);

        let page = self.new_page().await?;
        let result = self.drive_page(&page, request).await;

        // the tab must die on every exit path
        if let Err(e) = page.close().await {
            debug!("[BROWSER MODE] Page close error (non-fatal): {}", e);
        }
        result
    }

    async fn drive_page(
        &self,
        page: &Page,
        request: &HttpRequest,
    ) -> Result<HttpResponse, FetchError> {
        let timeout = request.timeout.unwrap_or(self.config.timeout);

        debug!(
            "[BROWSER MODE] Navigating with timeout: {}ms",
            timeout.as_millis()
        );
        tokio::time::timeout(timeout, page.goto(request.url.as_str()))
            .await
            .map_err(|_| FetchError::Browser(format!("navigation timed out: {}", request.url)))?
            .map_err(|e| FetchError::Browser(e.to_string()))?;

        if self.config.wait_for_ready_state {
            debug!("[BROWSER MODE] Waiting for DOM to be complete...");
            self.wait_for_ready_state(page, timeout.min(Duration::from_secs(10)))
                .await;
        }

        if self.config.wait_for_network_idle {
            debug!("[BROWSER MODE] Waiting for content to settle...");
            self.wait_until_stable(page, Duration::from_millis(500), timeout.min(Duration::from_secs(8)))
                .await;
        }

        if !self.config.additional_wait.is_zero() {
            debug!(
                "[BROWSER MODE] Waiting additional {:.1}s for dynamic content...",
                self.config.additional_wait.as_secs_f64()
            );
            tokio::time::sleep(self.config.additional_wait).await;
        }

        // one scroll cycle to trigger lazy-loaded content
        debug!("[BROWSER MODE] Scrolling to trigger lazy-loaded content...");
        if let Err(e) = page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
        {
            debug!("[BROWSER MODE] Scroll failed: {}", e);
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        if let Err(e) = page.evaluate("window.scrollTo(0, 0)").await {
            debug!("[BROWSER MODE] Scroll failed: {}", e);
        }
        tokio::time::sleep(Duration::from_millis(500)).await;

        let content = page
            .content()
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?;
        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| request.url.clone());

        info!(
            "[BROWSER MODE] Successfully fetched {} chars from {}",
            content.len(),
            request.url
        );

        Ok(HttpResponse {
            content,
            status_code: 200,
            headers: Default::default(),
            final_url,
        })
    }

    async fn wait_for_ready_state(&self, page: &Page, deadline: Duration) {
        let start = tokio::time::Instant::now();
        while start.elapsed() < deadline {
            let ready = page
                .evaluate("document.readyState")
                .await
                .ok()
                .and_then(|v| v.into_value::<String>().ok())
                .map(|s| s == "complete")
                .unwrap_or(false);
            if ready {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        debug!("[BROWSER MODE] DOM ready state check timed out, continuing...");
    }

    /// Network-idle approximation: the DOM has settled once its serialized
    /// length stops changing between polls.
    async fn wait_until_stable(&self, page: &Page, quiet: Duration, deadline: Duration) {
        let start = tokio::time::Instant::now();
        let mut last_len = 0usize;
        while start.elapsed() < deadline {
            let len = page.content().await.map(|c| c.len()).unwrap_or(0);
            if len > 0 && len == last_len {
                return;
            }
            last_len = len;
            tokio::time::sleep(quiet).await;
        }
        warn!("[BROWSER MODE] Network idle wait timed out");
    }

    /// Tear down tab state, browser connection, and the handler task, in that
    /// order. Errors are logged and swallowed.
    pub async fn close(&self) {
        let mut guard = self.connection.lock().await;
        if let Some(mut conn) = guard.take() {
            if let Err(e) = conn.browser.close().await {
                warn!("[BROWSER MODE] Browser close error (non-fatal): {}", e);
            }
            conn.handler_task.abort();
            debug!("Browser client closed");
        }
    }
}

#[async_trait]
impl HttpClient for BrowserClient {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        self.retry.run(|| self.fetch_once(request)).await
    }
}
