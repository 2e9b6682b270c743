use chrono::Utc;
use sqlx::SqlitePool;
use tracing::warn;

use crate::db::models::UrlQueueRow;

/// Below this `processing_count` a URL is permanently skipped.
pub const POISON_THRESHOLD: i64 = -5;

const MAX_QUEUE_ERROR_LEN: usize = 500;

fn truncated(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Outcome of an admission attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Admission {
    /// New row inserted as pending.
    Inserted,
    /// Existing row reset to pending with the new priority.
    Refreshed,
    /// Already crawled; `done` is terminal.
    AlreadyDone,
    /// Poison cap reached; never re-attempted.
    Poisoned,
    /// Another worker won the insert race.
    Duplicate,
}

/// Outcome of a worker's claim on a dequeued URL.
#[derive(Debug, PartialEq, Eq)]
pub enum ProcessingClaim {
    Claimed,
    Missing,
    AlreadyDone,
    Poisoned,
}

/// Durable crawl frontier over the `url_queue` table. The table is the source
/// of truth; the in-memory heap is only a scheduling mirror.
#[derive(Clone)]
pub struct UrlQueueStore {
    pool: SqlitePool,
}

impl UrlQueueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, url: &str) -> Result<Option<UrlQueueRow>, sqlx::Error> {
        sqlx::query_as::<_, UrlQueueRow>("SELECT * FROM url_queue WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
    }

    /// Admit a URL at `priority`: insert as pending, or reset an existing
    /// non-terminal row. A unique-constraint violation from a racing writer
    /// is a benign duplicate, not an error.
    pub async fn admit(&self, url: &str, priority: i64) -> Result<Admission, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, UrlQueueRow>("SELECT * FROM url_queue WHERE url = ?")
            .bind(url)
            .fetch_optional(&mut *tx)
            .await?;

        let admission = match existing {
            Some(row) if row.status == "done" => Admission::AlreadyDone,
            Some(row) if row.processing_count <= POISON_THRESHOLD => Admission::Poisoned,
            Some(_) => {
                sqlx::query("UPDATE url_queue SET status = 'pending', priority = ? WHERE url = ?")
                    .bind(priority)
                    .bind(url)
                    .execute(&mut *tx)
                    .await?;
                Admission::Refreshed
            }
            None => {
                let inserted = sqlx::query(
                    r#"
                    INSERT INTO url_queue (url, status, priority, processing_count, created_at)
                    VALUES (?, 'pending', ?, 0, ?)
                    "#,
                )
                .bind(url)
                .bind(priority)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await;

                match inserted {
                    Ok(_) => Admission::Inserted,
                    Err(e) if is_unique_violation(&e) => Admission::Duplicate,
                    Err(e) => return Err(e),
                }
            }
        };

        tx.commit().await?;
        Ok(admission)
    }

    /// Re-read guard + claim: only a pending/failed row below the poison cap
    /// moves to `processing`.
    pub async fn claim_for_processing(&self, url: &str) -> Result<ProcessingClaim, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let Some(row) = sqlx::query_as::<_, UrlQueueRow>("SELECT * FROM url_queue WHERE url = ?")
            .bind(url)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(ProcessingClaim::Missing);
        };

        if row.status == "done" {
            return Ok(ProcessingClaim::AlreadyDone);
        }
        if row.processing_count <= POISON_THRESHOLD {
            return Ok(ProcessingClaim::Poisoned);
        }

        sqlx::query("UPDATE url_queue SET status = 'processing', last_processed_at = ? WHERE url = ?")
            .bind(Utc::now())
            .bind(url)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(ProcessingClaim::Claimed)
    }

    /// Terminal success (or content-filter exclusion): `done` with the
    /// counter reset to 1.
    pub async fn mark_done(&self, url: &str, error_message: Option<&str>) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE url_queue SET
                status = 'done',
                processing_count = 1,
                error_message = ?,
                last_processed_at = ?
            WHERE url = ?
            "#,
        )
        .bind(error_message.map(|e| truncated(e, MAX_QUEUE_ERROR_LEN)))
        .bind(Utc::now())
        .bind(url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Failure: decrement the counter and record the error. Re-enqueueing is
    /// allowed until the poison cap.
    pub async fn mark_failed(&self, url: &str, error_message: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE url_queue SET
                processing_count = processing_count - 1,
                status = 'failed',
                error_message = ?,
                last_processed_at = ?
            WHERE url = ?
            "#,
        )
        .bind(truncated(error_message, MAX_QUEUE_ERROR_LEN))
        .bind(Utc::now())
        .bind(url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Rows to reload into the scheduling heap on a cold start.
    pub async fn pending(&self) -> Result<Vec<UrlQueueRow>, sqlx::Error> {
        sqlx::query_as::<_, UrlQueueRow>(
            "SELECT * FROM url_queue WHERE status = 'pending' ORDER BY priority ASC, created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Frontier size per status: (pending, processing, done, failed).
    pub async fn status_counts(&self) -> Result<(i64, i64, i64, i64), sqlx::Error> {
        let count = |status: &'static str| {
            let pool = self.pool.clone();
            async move {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM url_queue WHERE status = ?")
                    .bind(status)
                    .fetch_one(&pool)
                    .await
            }
        };
        Ok((
            count("pending").await?,
            count("processing").await?,
            count("done").await?,
            count("failed").await?,
        ))
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e.as_database_error() {
        Some(db_err) => {
            if db_err.is_unique_violation() {
                true
            } else {
                warn!("[QUEUE] Database error during insert: {}", db_err);
                false
            }
        }
        None => false,
    }
}
