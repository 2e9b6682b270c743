use regex::RegexBuilder;
use tracing::debug;

// ---------------------------------------------------------------------------
// Link/content exclusion filters. A filter service holds an ordered list and
// short-circuits on the first filter that excludes.
// ---------------------------------------------------------------------------

/// Non-article page shapes: tag/category/author/search listings plus binary
/// and asset extensions that are never worth a fetch.
pub const DEFAULT_EXCLUDE_URL_PATTERNS: &[&str] = &[
    r"/tags?/",
    r"/topics?/",
    r"/category/",
    r"/categories/",
    r"/author/",
    r"/search[/?]",
    r"/page/\d+",
    r"\.(?:jpg|jpeg|png|gif|webp|svg|ico)(?:\?|$)",
    r"\.(?:css|js|json|xml|rss)(?:\?|$)",
    r"\.(?:pdf|zip|gz|tar|exe|dmg)(?:\?|$)",
    r"\.(?:mp3|mp4|avi|mov|wav)(?:\?|$)",
];

/// Pages that declare themselves non-indexable or non-article.
pub const DEFAULT_EXCLUDE_CONTENT_PATTERNS: &[&str] = &[
    r#"<meta[^>]+name=["']robots["'][^>]*content=["'][^"']*noindex"#,
    r#"<meta[^>]+property=["']og:type["'][^>]*content=["'](?:video[^"']*|profile|product)["']"#,
];

/// Filter matching regex lists against URLs and raw HTML.
pub struct PatternFilter {
    name: String,
    url_patterns: Vec<regex::Regex>,
    content_patterns: Vec<regex::Regex>,
}

impl PatternFilter {
    pub fn new(
        name: impl Into<String>,
        url_patterns: &[&str],
        content_patterns: &[&str],
    ) -> Result<Self, regex::Error> {
        let compile = |patterns: &[&str]| -> Result<Vec<regex::Regex>, regex::Error> {
            patterns
                .iter()
                .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
                .collect()
        };
        Ok(Self {
            name: name.into(),
            url_patterns: compile(url_patterns)?,
            content_patterns: compile(content_patterns)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn should_exclude_url(&self, url: &str) -> bool {
        self.url_patterns.iter().any(|p| p.is_match(url))
    }

    pub fn should_exclude_content(&self, url: &str, html: &str) -> bool {
        for pattern in &self.content_patterns {
            if pattern.is_match(html) {
                debug!("[FILTER] Content excluded by pattern: {}", url);
                return true;
            }
        }
        false
    }
}

/// Ordered list of filters; first exclusion wins.
#[derive(Default)]
pub struct FilterService {
    filters: Vec<PatternFilter>,
}

impl FilterService {
    pub fn new(filters: Vec<PatternFilter>) -> Self {
        Self { filters }
    }

    /// Service preloaded with the default URL and content exclusions.
    pub fn with_defaults() -> Self {
        let default = PatternFilter::new(
            "default-patterns",
            DEFAULT_EXCLUDE_URL_PATTERNS,
            DEFAULT_EXCLUDE_CONTENT_PATTERNS,
        )
        .expect("default filter patterns are valid");
        Self {
            filters: vec![default],
        }
    }

    pub fn add_filter(&mut self, filter: PatternFilter) {
        debug!("[FILTER] Added filter: {}", filter.name());
        self.filters.push(filter);
    }

    pub fn should_exclude_url(&self, url: &str) -> bool {
        for filter in &self.filters {
            if filter.should_exclude_url(url) {
                debug!("[FILTER] URL excluded by {}: {}", filter.name(), url);
                return true;
            }
        }
        false
    }

    pub fn should_exclude_content(&self, url: &str, html: &str) -> bool {
        self.filters
            .iter()
            .any(|f| f.should_exclude_content(url, html))
    }
}
