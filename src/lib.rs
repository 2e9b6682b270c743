pub mod core;
pub mod db;
pub mod distill;
pub mod fetch;
pub mod scrapers;
pub mod snapshot;
pub mod spider;

// --- Primary core exports ---
pub use crate::core::config::{AppConfig, QueueConfig, RetryConfig};
pub use crate::core::error::{FetchError, QueueError, SpiderError};
pub use crate::core::filters::{FilterService, PatternFilter};
pub use crate::core::priority::ArticlePriorityPolicy;
pub use crate::core::retry::RetryPolicy;
pub use crate::core::sources::{default_news_sources, NewsSource};
pub use crate::core::types::*;

pub use crate::db::{Database, Repository, UrlQueueStore};
pub use crate::distill::{Distiller, SlugDetectionConfig};
pub use crate::fetch::{BrowserClient, ClientFactory, DirectClient, FallbackClient, HttpClient};
pub use crate::scrapers::{LinkDetection, ScraperRecipe, ScraperService};
pub use crate::spider::SpiderService;
