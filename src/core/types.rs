use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A request to scrape one URL. Immutable.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub url: String,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Everything extracted from one successful fetch. Owned by the producing
/// worker until handed to the repository.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeResult {
    pub url: String,
    pub html: String,
    pub cleaned_html: String,
    pub meta_tags: BTreeMap<String, String>,
    pub images: BTreeSet<String>,
    pub json_ld_blocks: Vec<String>,
    pub article_links: BTreeSet<String>,
    pub job_created_at: Option<DateTime<Utc>>,
    pub job_processed_at: Option<DateTime<Utc>>,
}

/// A single outgoing HTTP request as seen by the fetch pipeline.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub url: String,
    pub referer: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Response produced by either fetch client.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub content: String,
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    /// URL after redirects; compared against the requested URL to detect
    /// thin redirect pages.
    pub final_url: String,
}

/// Snapshot of the spider's state. The sole introspection surface for the
/// core.
#[derive(Debug, Clone, Serialize)]
pub struct SpiderStats {
    pub pending: i64,
    pub processing: i64,
    pub done: i64,
    pub failed: i64,
    /// URLs rejected by filters or the priority policy before admission.
    pub skipped: u64,
    pub queue_size: usize,
    pub max_queue_size: usize,
    pub workers: usize,
    pub running: bool,
}
