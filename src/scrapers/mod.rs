//! Per-host scrape recipes and the dispatcher that runs them.
//!
//! Host variants differ only in how article links are detected and whether
//! the loose resolved-link set is merged in, so a recipe is plain data
//! rather than a type per site.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use crate::core::error::SpiderError;
use crate::core::types::{HttpRequest, ScrapeRequest, ScrapeResult};
use crate::distill::{Distiller, SlugDetectionConfig};
use crate::fetch::HttpClient;
use crate::snapshot::SnapshotWriter;

/// Minimum URL length for the loose resolved-link merge.
const RESOLVED_LINK_MIN_LENGTH: usize = 25;

/// How a recipe finds outbound article candidates.
#[derive(Debug, Clone)]
pub enum LinkDetection {
    /// Same-host links ending in a `-<digits>` slug id.
    TrailingId,
    /// Slug-shape heuristics for sites without numeric ids.
    Slug(SlugDetectionConfig),
}

/// One site's scrape behavior.
#[derive(Debug, Clone)]
pub struct ScraperRecipe {
    pub name: &'static str,
    pub link_detection: LinkDetection,
    /// Also union `extract_all_resolved_links` into the article set.
    pub merge_resolved_links: bool,
}

impl ScraperRecipe {
    pub fn generic() -> Self {
        Self {
            name: "generic",
            link_detection: LinkDetection::TrailingId,
            merge_resolved_links: false,
        }
    }
}

fn has_excluded_path(link: &str, exclude_paths: &BTreeSet<String>) -> bool {
    let Ok(url) = Url::parse(link) else {
        return false;
    };
    url.path()
        .split('/')
        .filter(|part| !part.is_empty())
        .any(|part| exclude_paths.contains(&part.to_lowercase()))
}

fn default_registry() -> HashMap<String, ScraperRecipe> {
    let ndtv = ScraperRecipe {
        name: "ndtv",
        link_detection: LinkDetection::TrailingId,
        merge_resolved_links: true,
    };
    let republic = ScraperRecipe {
        name: "republic",
        link_detection: LinkDetection::Slug(SlugDetectionConfig {
            exclude_paths: [
                "about", "contact", "privacy", "terms", "login", "signup", "home", "index",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            ..SlugDetectionConfig::default()
        }),
        merge_resolved_links: true,
    };

    let mut registry = HashMap::new();
    for host in ["ndtv.com", "ndtvprofit.com"] {
        registry.insert(host.to_string(), ndtv.clone());
    }
    registry.insert("republicworld.com".to_string(), republic);
    registry
}

/// Picks the recipe for a URL's host and runs fetch + distillation.
pub struct ScraperService {
    client: Arc<dyn HttpClient>,
    registry: HashMap<String, ScraperRecipe>,
    generic: ScraperRecipe,
    snapshots: Option<SnapshotWriter>,
}

impl ScraperService {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        let registry = default_registry();
        let mut hosts: Vec<&String> = registry.keys().collect();
        hosts.sort();
        info!("ScraperService initialized. Registered domains: {:?}", hosts);
        Self {
            client,
            registry,
            generic: ScraperRecipe::generic(),
            snapshots: None,
        }
    }

    /// Enable best-effort page snapshots under `dir`.
    pub fn with_snapshots(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.snapshots = Some(SnapshotWriter::new(dir));
        self
    }

    pub fn register(&mut self, host: &str, recipe: ScraperRecipe) {
        info!("Registered scraper {} for domain: {}", recipe.name, host);
        self.registry.insert(host.to_lowercase(), recipe);
    }

    /// Site-specific recipe for the URL's host (with and without `www.`),
    /// falling back to the generic one.
    pub fn recipe_for(&self, url: &str) -> &ScraperRecipe {
        let Some(host) = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
        else {
            return &self.generic;
        };

        if let Some(recipe) = self.registry.get(&host) {
            return recipe;
        }
        let bare = host.strip_prefix("www.").unwrap_or(&host);
        self.registry.get(bare).unwrap_or(&self.generic)
    }

    /// Fetch a page and distill it into a [`ScrapeResult`].
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResult, SpiderError> {
        let recipe = self.recipe_for(&request.url);
        info!(
            "[SCRAPER] Starting scrape for URL: {} (recipe: {})",
            request.url, recipe.name
        );

        let response = self
            .client
            .fetch(&HttpRequest::new(&request.url))
            .await?;

        let mut distiller = Distiller::parse(&response.content);

        let meta_tags = distiller.extract_meta_tags();
        let images = distiller.extract_image_urls();
        let json_ld_blocks = distiller.extract_all_json_ld();

        let mut article_links = match &recipe.link_detection {
            LinkDetection::TrailingId => distiller.extract_article_links(&request.url),
            LinkDetection::Slug(cfg) => distiller.extract_slug_article_links(&request.url, cfg),
        };
        if recipe.merge_resolved_links {
            let mut resolved =
                distiller.extract_all_resolved_links(&request.url, RESOLVED_LINK_MIN_LENGTH);
            // the merge must not reintroduce sections the slug config excludes
            if let LinkDetection::Slug(cfg) = &recipe.link_detection {
                resolved.retain(|link| !has_excluded_path(link, &cfg.exclude_paths));
            }
            debug!(
                "[SCRAPER] Merging {} resolved links into {} article links",
                resolved.len(),
                article_links.len()
            );
            article_links.extend(resolved);
        }

        distiller.run_cleaning_pipeline();
        let cleaned_html = distiller.html();

        let result = ScrapeResult {
            url: request.url.clone(),
            html: response.content,
            cleaned_html,
            meta_tags,
            images,
            json_ld_blocks,
            article_links,
            job_created_at: None,
            job_processed_at: None,
        };

        info!(
            "[SCRAPER] Scrape completed: {} meta tags, {} images, {} json-ld blocks, {} article links",
            result.meta_tags.len(),
            result.images.len(),
            result.json_ld_blocks.len(),
            result.article_links.len()
        );

        if let Some(snapshots) = &self.snapshots {
            snapshots.save(&result, recipe.name);
        }

        Ok(result)
    }
}
