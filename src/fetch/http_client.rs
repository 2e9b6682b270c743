use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::core::error::FetchError;
use crate::core::retry::RetryPolicy;
use crate::core::types::{HttpRequest, HttpResponse};

use super::{user_agent, HttpClient};

/// Bodies shorter than this after a redirect are assumed to be interstitial
/// pages; the browser fallback renders the real thing.
const MIN_PLAUSIBLE_BODY: usize = 500;

/// Direct HTTP client over a shared reqwest connection pool.
pub struct DirectClient {
    client: reqwest::Client,
    timeout: Duration,
    user_agent: &'static str,
    retry: RetryPolicy,
}

impl DirectClient {
    pub fn new(timeout: Duration, user_agent_index: usize, retry: RetryPolicy) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            timeout,
            user_agent: user_agent(user_agent_index),
            retry,
        }
    }

    fn default_headers(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("accept", "*/*"),
            ("accept-language", "en-GB,en;q=0.6"),
            ("sec-fetch-dest", "document"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-site", "none"),
            ("sec-fetch-user", "?1"),
            ("sec-gpc", "1"),
            ("user-agent", self.user_agent),
        ]
    }

    async fn fetch_once(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        info!("[HTTP MODE] Fetching URL: {}", request.url);

        let mut builder = self
            .client
            .get(&request.url)
            .timeout(request.timeout.unwrap_or(self.timeout));

        for (name, value) in self.default_headers() {
            builder = builder.header(name, value);
        }
        if let Some(referer) = &request.referer {
            builder = builder.header("referer", referer);
        }
        if let Some(extra) = &request.headers {
            for (name, value) in extra {
                builder = builder.header(name, value);
            }
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(FetchError::Status { status });
        }

        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let content = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if content.len() < MIN_PLAUSIBLE_BODY && final_url != request.url {
            warn!(
                "[HTTP MODE] Small content ({} chars) after redirect, likely redirect page. Using browser instead.",
                content.len()
            );
            return Err(FetchError::ThinRedirect { len: content.len() });
        }
        if content.len() < MIN_PLAUSIBLE_BODY {
            warn!(
                "[HTTP MODE] Very small content ({} chars), might be incomplete.",
                content.len()
            );
        }

        info!(
            "[HTTP MODE] Successfully fetched {} chars from {}",
            content.len(),
            final_url
        );

        Ok(HttpResponse {
            content,
            status_code: status,
            headers,
            final_url,
        })
    }
}

#[async_trait]
impl HttpClient for DirectClient {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        self.retry.run(|| self.fetch_once(request)).await
    }
}
