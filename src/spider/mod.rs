//! The spider scheduler: a worker pool over the bounded in-memory queue,
//! with the durable frontier as the source of truth.

pub mod queue;

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::core::config::QueueConfig;
use crate::core::error::{QueueError, SpiderError};
use crate::core::filters::FilterService;
use crate::core::priority::ArticlePriorityPolicy;
use crate::core::types::{ScrapeRequest, SpiderStats};
use crate::db::{Admission, Database, ProcessingClaim, Repository, UrlQueueStore};
use crate::scrapers::ScraperService;

use queue::WorkQueue;

const CONTENT_FILTER_REASON: &str = "Excluded by content filter";

struct SpiderInner {
    scraper: ScraperService,
    frontier: UrlQueueStore,
    repository: Repository,
    filters: Option<FilterService>,
    policy: Option<ArticlePriorityPolicy>,
    config: QueueConfig,
    queue: WorkQueue,
    running: AtomicBool,
    skipped: AtomicU64,
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
    monitor: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

/// Crawl scheduler. Cheap to clone; all state lives behind one `Arc`.
#[derive(Clone)]
pub struct SpiderService {
    inner: Arc<SpiderInner>,
}

impl SpiderService {
    pub fn new(
        scraper: ScraperService,
        database: &Database,
        config: QueueConfig,
        filters: Option<FilterService>,
        policy: Option<ArticlePriorityPolicy>,
    ) -> Self {
        let queue = WorkQueue::new(config.max_queue_size);
        Self {
            inner: Arc::new(SpiderInner {
                scraper,
                frontier: UrlQueueStore::new(database.pool().clone()),
                repository: Repository::new(database.pool().clone()),
                filters,
                policy,
                config,
                queue,
                running: AtomicBool::new(false),
                skipped: AtomicU64::new(0),
                workers: tokio::sync::Mutex::new(Vec::new()),
                monitor: tokio::sync::Mutex::new(None),
            }),
        }
    }

    /// Start the worker pool. A cold start first rebuilds the in-memory queue
    /// from rows still marked pending.
    pub async fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            warn!("[SPIDER] Already running");
            return;
        }

        match self.inner.frontier.pending().await {
            Ok(rows) if !rows.is_empty() => {
                info!("[SPIDER] Recovering {} pending URLs into the queue", rows.len());
                for row in rows {
                    if self.inner.queue.push(row.url, row.priority).is_err() {
                        warn!("[SPIDER] Queue full during recovery, remaining URLs stay pending");
                        break;
                    }
                }
            }
            Ok(_) => {}
            Err(e) => error!("[SPIDER] Failed to recover pending URLs: {}", e),
        }

        let mut workers = self.inner.workers.lock().await;
        for worker_id in 0..self.inner.config.max_workers {
            let inner = self.inner.clone();
            workers.push(tokio::spawn(worker_loop(inner, worker_id)));
        }
        info!(
            "[SPIDER] Started with {} workers, max queue: {}",
            self.inner.config.max_workers, self.inner.config.max_queue_size
        );
    }

    /// Cooperative shutdown: stop admitting, unblock every worker with a
    /// sentinel, and join them. In-flight fetches run to completion.
    pub async fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }

        for _ in 0..self.inner.config.max_workers {
            self.inner.queue.push_sentinel();
        }
        if let Some(monitor) = self.inner.monitor.lock().await.take() {
            monitor.abort();
        }

        let handles: Vec<JoinHandle<()>> = self.inner.workers.lock().await.drain(..).collect();
        for handle in handles {
            if tokio::time::timeout(Duration::from_secs(10), handle)
                .await
                .is_err()
            {
                warn!("[SPIDER] Worker join timed out");
            }
        }
        info!("[SPIDER] Stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Admit one URL into the frontier and the scheduling queue.
    ///
    /// `priority == 0` is re-scored by the policy when one is configured.
    pub async fn enqueue_url(&self, url: &str, priority: i64) -> Result<(), SpiderError> {
        if !self.is_running() {
            warn!("[SPIDER] Not running, cannot enqueue");
            return Err(QueueError::NotRunning.into());
        }

        if let Some(filters) = &self.inner.filters {
            if filters.should_exclude_url(url) {
                debug!("[SPIDER] URL excluded by filter: {}", url);
                self.inner.skipped.fetch_add(1, Ordering::SeqCst);
                return Err(QueueError::FilterExcluded.into());
            }
        }
        if let Some(policy) = &self.inner.policy {
            if policy.should_exclude_url(url) {
                debug!("[SPIDER] URL excluded by priority policy: {}", url);
                self.inner.skipped.fetch_add(1, Ordering::SeqCst);
                return Err(QueueError::FilterExcluded.into());
            }
        }

        let priority = match (&self.inner.policy, priority) {
            (Some(policy), 0) => policy.get_priority(url),
            _ => priority,
        };

        match self.inner.frontier.admit(url, priority).await? {
            Admission::Inserted | Admission::Refreshed => {}
            Admission::AlreadyDone => {
                info!("[SPIDER] URL already done: {}", url);
                return Err(QueueError::AlreadyDone.into());
            }
            Admission::Poisoned => {
                warn!("[SPIDER] URL processing_count too low: {}", url);
                return Err(QueueError::Poisoned.into());
            }
            Admission::Duplicate => {
                debug!("[SPIDER] URL already exists (duplicate): {}", url);
                return Err(QueueError::Duplicate.into());
            }
        }

        self.inner.queue.push(url.to_string(), priority)?;
        info!("[SPIDER] Enqueued URL: {} with priority {}", url, priority);
        Ok(())
    }

    pub async fn stats(&self) -> Result<SpiderStats, SpiderError> {
        let (pending, processing, done, failed) = self.inner.frontier.status_counts().await?;
        Ok(SpiderStats {
            pending,
            processing,
            done,
            failed,
            skipped: self.inner.skipped.load(Ordering::SeqCst),
            queue_size: self.inner.queue.len(),
            max_queue_size: self.inner.config.max_queue_size,
            workers: self.inner.config.max_workers,
            running: self.is_running(),
        })
    }

    /// Spawn a sidecar task that logs the stats snapshot on an interval.
    pub async fn spawn_monitor(&self, interval: Duration) {
        let spider = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if !spider.is_running() {
                    break;
                }
                match spider.stats().await {
                    Ok(stats) => info!(
                        "[MONITOR] pending={} processing={} done={} failed={} skipped={} queue={}/{}",
                        stats.pending,
                        stats.processing,
                        stats.done,
                        stats.failed,
                        stats.skipped,
                        stats.queue_size,
                        stats.max_queue_size
                    ),
                    Err(e) => error!("[MONITOR] Error getting stats: {}", e),
                }
            }
        });
        if let Some(previous) = self.inner.monitor.lock().await.replace(handle) {
            previous.abort();
        }
    }

    /// Block until the in-memory queue is drained. Test/tooling helper; the
    /// frontier may still hold failed rows.
    pub async fn wait_idle(&self) {
        loop {
            if self.inner.queue.is_empty() {
                if let Ok((_, processing, _, _)) = self.inner.frontier.status_counts().await {
                    if processing == 0 {
                        return;
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

async fn worker_loop(inner: Arc<SpiderInner>, worker_id: usize) {
    info!("[QUEUE] Worker {} started", worker_id);

    while inner.running.load(Ordering::SeqCst) {
        let item = match tokio::time::timeout(Duration::from_secs(1), inner.queue.pop()).await {
            Ok(item) => item,
            Err(_) => continue,
        };

        let Some(url) = item.url else {
            info!("[QUEUE] Worker {} received shutdown signal", worker_id);
            break;
        };

        info!(
            "[QUEUE] Worker {} processing item (priority: {})",
            worker_id, item.priority
        );
        process_url(&inner, &url).await;
    }

    info!("[QUEUE] Worker {} stopped", worker_id);
}

/// Drive one URL through claim -> cooldown -> scrape -> persist -> discover.
async fn process_url(inner: &Arc<SpiderInner>, url: &str) {
    info!("[SPIDER] Processing URL: {}", url);

    match inner.frontier.claim_for_processing(url).await {
        Ok(ProcessingClaim::Claimed) => {}
        Ok(ProcessingClaim::Missing) => {
            warn!("[SPIDER] URL not found in queue: {}", url);
            return;
        }
        Ok(ProcessingClaim::AlreadyDone) => {
            info!("[SPIDER] URL already done, skipping: {}", url);
            return;
        }
        Ok(ProcessingClaim::Poisoned) => {
            warn!("[SPIDER] URL processing_count at cap, skipping: {}", url);
            return;
        }
        Err(e) => {
            error!("[SPIDER] Error claiming URL {}: {}", url, e);
            return;
        }
    }

    // politeness throttle
    if !inner.config.cooldown.is_zero() {
        tokio::time::sleep(inner.config.cooldown).await;
    }

    let job_id = match inner.repository.create_scrape_job(url).await {
        Ok(id) => id,
        Err(e) => {
            error!("[SPIDER] Failed to create job for {}: {}", url, e);
            record_failure(inner, url, &e.to_string()).await;
            return;
        }
    };
    let job_created_at = Utc::now();
    if let Err(e) = inner.repository.update_job_status(job_id, "started", None).await {
        error!("[SPIDER] Failed to mark job started: {}", e);
    }

    let scrape = inner.scraper.scrape(&ScrapeRequest::new(url)).await;

    let mut result = match scrape {
        Ok(result) => result,
        Err(e) => {
            let message = e.to_string();
            error!("[SPIDER] Error processing URL {}: {}", url, message);
            if let Err(je) = inner
                .repository
                .update_job_status(job_id, "failed", Some(&message))
                .await
            {
                error!("[SPIDER] Failed to update job status: {}", je);
            }
            record_failure(inner, url, &message).await;
            return;
        }
    };

    // second layer: content filter over the raw page
    if let Some(filters) = &inner.filters {
        if filters.should_exclude_content(url, &result.html) {
            info!("[SPIDER] Content excluded by filter, skipping: {}", url);
            if let Err(e) = inner
                .repository
                .update_job_status(job_id, "failed", Some(CONTENT_FILTER_REASON))
                .await
            {
                error!("[SPIDER] Failed to update job status: {}", e);
            }
            if let Err(e) = inner.frontier.mark_done(url, Some(CONTENT_FILTER_REASON)).await {
                error!("[SPIDER] Failed to update URL status: {}", e);
            }
            return;
        }
    }

    result.job_created_at = Some(job_created_at);
    result.job_processed_at = Some(Utc::now());

    let persisted = async {
        inner.repository.save_scrape_result(Some(job_id), &result).await?;
        inner.repository.update_job_status(job_id, "completed", None).await
    }
    .await;

    if let Err(e) = persisted {
        let message = e.to_string();
        error!("[SPIDER] Failed to save result for {}: {}", url, message);
        if let Err(je) = inner
            .repository
            .update_job_status(job_id, "failed", Some(&message))
            .await
        {
            error!("[SPIDER] Failed to update job status: {}", je);
        }
        record_failure(inner, url, &message).await;
        return;
    }

    info!(
        "[SPIDER] Successfully scraped URL: {}, found {} article links",
        url,
        result.article_links.len()
    );

    enqueue_article_links(inner, &result.article_links, url).await;

    if let Err(e) = inner.frontier.mark_done(url, None).await {
        error!("[SPIDER] Failed to update URL status: {}", e);
    }
}

async fn record_failure(inner: &Arc<SpiderInner>, url: &str, message: &str) {
    if let Err(e) = inner.frontier.mark_failed(url, message).await {
        error!("[SPIDER] Failed to update URL status: {}", e);
    }
}

/// Score, interleave, and admit links discovered on one page.
async fn enqueue_article_links(inner: &Arc<SpiderInner>, links: &BTreeSet<String>, source_url: &str) {
    if links.is_empty() {
        debug!("[SPIDER] No article links to enqueue from {}", source_url);
        return;
    }
    info!(
        "[SPIDER] Enqueueing {} article links from {}",
        links.len(),
        source_url
    );

    // BTreeSet iteration gives the stable lexical pre-sort
    let mut scored: Vec<(String, i64)> = Vec::new();
    let mut skipped = 0u64;
    for link in links {
        match &inner.policy {
            Some(policy) if policy.should_exclude_url(link) => {
                debug!("[SPIDER] URL excluded by priority policy: {}", link);
                skipped += 1;
            }
            Some(policy) => scored.push((link.clone(), policy.get_priority(link))),
            None => scored.push((link.clone(), 0)),
        }
    }

    let ordered = interleave_by_domain(scored);

    let mut enqueued = 0u64;
    for (link, priority) in ordered {
        if !inner.running.load(Ordering::SeqCst) {
            break;
        }
        if inner.queue.len() >= inner.config.max_queue_size {
            warn!(
                "[SPIDER] Queue full ({}), stopping enqueue",
                inner.config.max_queue_size
            );
            break;
        }
        if let Some(filters) = &inner.filters {
            if filters.should_exclude_url(&link) {
                debug!("[SPIDER] URL excluded by filter: {}", link);
                skipped += 1;
                continue;
            }
        }

        match inner.frontier.admit(&link, priority).await {
            Ok(Admission::Inserted | Admission::Refreshed) => {
                match inner.queue.push(link.clone(), priority) {
                    Ok(()) => {
                        enqueued += 1;
                        debug!("[SPIDER] Enqueued: {}", link);
                    }
                    Err(_) => {
                        warn!(
                            "[SPIDER] Queue full ({}), stopping enqueue",
                            inner.config.max_queue_size
                        );
                        break;
                    }
                }
            }
            Ok(_) => skipped += 1,
            Err(e) => error!("[SPIDER] Error enqueueing link {}: {}", link, e),
        }
    }

    info!("[SPIDER] Enqueued {} links, skipped {} links", enqueued, skipped);
    inner.skipped.fetch_add(skipped, Ordering::SeqCst);
}

/// Round-robin links across hosts within each priority class, ascending by
/// priority, so no single source monopolizes the queue.
fn interleave_by_domain(links: Vec<(String, i64)>) -> Vec<(String, i64)> {
    let mut groups: BTreeMap<i64, BTreeMap<String, VecDeque<String>>> = BTreeMap::new();
    for (link, priority) in links {
        let host = Url::parse(&link)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        groups
            .entry(priority)
            .or_default()
            .entry(host)
            .or_default()
            .push_back(link);
    }

    let mut ordered = Vec::new();
    for (priority, mut domains) in groups {
        loop {
            let mut emitted = false;
            for queue in domains.values_mut() {
                if let Some(link) = queue.pop_front() {
                    ordered.push((link, priority));
                    emitted = true;
                }
            }
            if !emitted {
                break;
            }
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaving_rotates_hosts_within_priority() {
        // 40 links over 4 hosts, one priority class
        let mut links = Vec::new();
        for host in ["a.com", "b.com", "c.com", "d.com"] {
            for i in 0..10 {
                links.push((format!("https://{}/story-{}", host, i), 0));
            }
        }
        let ordered = interleave_by_domain(links);
        assert_eq!(ordered.len(), 40);

        // first emission window covers every host exactly once
        let first_hosts: Vec<String> = ordered[..4]
            .iter()
            .map(|(l, _)| Url::parse(l).unwrap().host_str().unwrap().to_string())
            .collect();
        let unique: std::collections::BTreeSet<&String> = first_hosts.iter().collect();
        assert_eq!(unique.len(), 4);

        // every window of 4 keeps covering all hosts
        for window in ordered.chunks(4) {
            let hosts: std::collections::BTreeSet<String> = window
                .iter()
                .map(|(l, _)| Url::parse(l).unwrap().host_str().unwrap().to_string())
                .collect();
            assert_eq!(hosts.len(), 4);
        }
    }

    #[test]
    fn interleaving_orders_priority_classes_ascending() {
        let links = vec![
            ("https://a.com/low".to_string(), 10),
            ("https://a.com/high".to_string(), -10),
            ("https://b.com/neutral".to_string(), 0),
        ];
        let ordered = interleave_by_domain(links);
        let priorities: Vec<i64> = ordered.iter().map(|(_, p)| *p).collect();
        assert_eq!(priorities, vec![-10, 0, 10]);
    }

    #[test]
    fn unparseable_links_group_under_unknown_host() {
        let links = vec![("not a url".to_string(), 0)];
        let ordered = interleave_by_domain(links);
        assert_eq!(ordered.len(), 1);
    }
}
