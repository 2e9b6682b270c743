use chrono::{DateTime, Utc};

/// One scrape attempt. Append-only history; rows are never deleted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapeJobRow {
    pub id: i64,
    pub url: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapeResultRow {
    pub id: i64,
    pub job_id: Option<i64>,
    pub url: String,
    pub html: Option<String>,
    pub cleaned_html: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MetaTagRow {
    pub id: i64,
    pub result_id: Option<i64>,
    pub key: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImageUrlRow {
    pub id: i64,
    pub result_id: Option<i64>,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JsonLdBlockRow {
    pub id: i64,
    pub result_id: Option<i64>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticleLinkRow {
    pub id: i64,
    pub result_id: Option<i64>,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// One frontier entry. `processing_count` starts at 0, decrements on failure
/// and resets to 1 on success; at or below -5 the URL is poisoned.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UrlQueueRow {
    pub url: String,
    pub status: String,
    pub priority: i64,
    pub processing_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_processed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}
