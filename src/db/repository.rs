use chrono::Utc;
use sqlx::SqlitePool;
use tracing::warn;

use crate::core::types::ScrapeResult;
use crate::db::models::{ScrapeJobRow, ScrapeResultRow};

/// Image URLs longer than the column width are truncated, not rejected.
const MAX_URL_LEN: usize = 2048;
const MAX_JOB_ERROR_LEN: usize = 1000;

fn truncated(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Persists scrape jobs and denormalized scrape results.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a job row and return its id.
    pub async fn create_scrape_job(&self, url: &str) -> Result<i64, sqlx::Error> {
        let res = sqlx::query(
            "INSERT INTO scrape_jobs (url, status, created_at) VALUES (?, 'pending', ?)",
        )
        .bind(url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(res.last_insert_rowid())
    }

    /// Advance a job's status, stamping `started_at` / `completed_at`.
    pub async fn update_job_status(
        &self,
        job_id: i64,
        status: &str,
        error_message: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        let started_at = (status == "started").then_some(now);
        let completed_at = matches!(status, "completed" | "failed").then_some(now);
        let error_message = error_message.map(|e| truncated(e, MAX_JOB_ERROR_LEN).to_string());

        sqlx::query(
            r#"
            UPDATE scrape_jobs SET
                status = ?,
                started_at = COALESCE(?, started_at),
                completed_at = COALESCE(?, completed_at),
                error_message = COALESCE(?, error_message)
            WHERE id = ?
            "#,
        )
        .bind(status)
        .bind(started_at)
        .bind(completed_at)
        .bind(error_message)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Write the result row and its denormalized children; returns result id.
    pub async fn save_scrape_result(
        &self,
        job_id: Option<i64>,
        result: &ScrapeResult,
    ) -> Result<i64, sqlx::Error> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result_id = sqlx::query(
            r#"
            INSERT INTO scrape_results (job_id, url, html, cleaned_html, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(job_id)
        .bind(&result.url)
        .bind(&result.html)
        .bind(&result.cleaned_html)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for (key, value) in &result.meta_tags {
            sqlx::query(
                "INSERT INTO meta_tags (result_id, key, value, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(result_id)
            .bind(key)
            .bind(value)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        for image_url in &result.images {
            if image_url.len() > MAX_URL_LEN {
                warn!(
                    "[REPO] Image URL too long ({} chars), truncating: {}...",
                    image_url.len(),
                    truncated(image_url, 100)
                );
            }
            sqlx::query(
                "INSERT INTO image_urls (result_id, url, created_at) VALUES (?, ?, ?)",
            )
            .bind(result_id)
            .bind(truncated(image_url, MAX_URL_LEN))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        for block in &result.json_ld_blocks {
            sqlx::query(
                "INSERT INTO json_ld_blocks (result_id, content, created_at) VALUES (?, ?, ?)",
            )
            .bind(result_id)
            .bind(block)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        for link in &result.article_links {
            sqlx::query(
                "INSERT INTO article_links (result_id, url, created_at) VALUES (?, ?, ?)",
            )
            .bind(result_id)
            .bind(link)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(result_id)
    }

    pub async fn get_scrape_job(&self, job_id: i64) -> Result<Option<ScrapeJobRow>, sqlx::Error> {
        sqlx::query_as::<_, ScrapeJobRow>("SELECT * FROM scrape_jobs WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_scrape_result(
        &self,
        result_id: i64,
    ) -> Result<Option<ScrapeResultRow>, sqlx::Error> {
        sqlx::query_as::<_, ScrapeResultRow>("SELECT * FROM scrape_results WHERE id = ?")
            .bind(result_id)
            .fetch_optional(&self.pool)
            .await
    }
}
