use std::collections::BTreeSet;

use regex::Regex;
use scraper::Selector;
use url::Url;

use super::Distiller;

/// Thresholds for the slug-heuristic article detector. The defaults are tuned
/// for long, hyphenated news slugs.
#[derive(Debug, Clone)]
pub struct SlugDetectionConfig {
    pub min_slug_length: usize,
    pub min_hyphen_count: usize,
    pub min_path_depth: usize,
    pub min_total_path_length: usize,
    pub exclude_paths: BTreeSet<String>,
    pub require_lowercase: bool,
    pub min_hyphen_ratio: f64,
}

impl Default for SlugDetectionConfig {
    fn default() -> Self {
        Self {
            min_slug_length: 30,
            min_hyphen_count: 3,
            min_path_depth: 1,
            min_total_path_length: 50,
            exclude_paths: BTreeSet::new(),
            require_lowercase: true,
            min_hyphen_ratio: 0.05,
        }
    }
}

/// Whether a URL path looks like an article slug under `cfg`. Every threshold
/// must hold simultaneously.
pub fn is_probable_article_slug(url_path: &str, cfg: &SlugDetectionConfig) -> bool {
    let normalized = url_path.trim_matches('/');
    if normalized.is_empty() {
        return false;
    }

    let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();
    if parts.len() < cfg.min_path_depth {
        return false;
    }

    if parts
        .iter()
        .any(|p| cfg.exclude_paths.contains(&p.to_lowercase()))
    {
        return false;
    }

    if normalized.len() < cfg.min_total_path_length {
        return false;
    }

    let Some(slug) = parts.last() else {
        return false;
    };
    if slug.len() < cfg.min_slug_length {
        return false;
    }

    let hyphen_count = slug.matches('-').count();
    if hyphen_count < cfg.min_hyphen_count {
        return false;
    }

    let hyphen_ratio = hyphen_count as f64 / slug.len() as f64;
    if hyphen_ratio < cfg.min_hyphen_ratio {
        return false;
    }

    if cfg.require_lowercase && *slug != slug.to_lowercase() {
        return false;
    }

    true
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

fn strip_query(href: &str) -> &str {
    match href.find('?') {
        Some(i) => &href[..i],
        None => href,
    }
}

fn strip_query_and_fragment(href: &str) -> &str {
    let href = strip_query(href);
    match href.find('#') {
        Some(i) => &href[..i],
        None => href,
    }
}

impl Distiller {
    fn hrefs(&self) -> Vec<String> {
        let Ok(sel) = Selector::parse("a[href]") else {
            return Vec::new();
        };
        self.doc
            .select(&sel)
            .filter_map(|a| a.value().attr("href"))
            .map(str::to_string)
            .collect()
    }

    /// ID-based article detector: same-host links of plausible length whose
    /// path ends in a `-<digits>` slug id.
    pub fn extract_article_links(&self, base_url: &str) -> BTreeSet<String> {
        let article_id = Regex::new(r"-\d+$").expect("article id pattern is valid");
        let base_host = host_of(base_url);
        let mut links = BTreeSet::new();

        for href in self.hrefs() {
            let absolute = if href.starts_with('/') {
                match &base_host {
                    Some(host) => format!("https://{}{}", host, href),
                    None => continue,
                }
            } else {
                href
            };

            // must belong to the seed's site
            if let Some(base_host) = &base_host {
                match host_of(&absolute) {
                    Some(link_host) if link_host == *base_host => {}
                    _ => continue,
                }
            }

            let trimmed = strip_query(&absolute);
            if trimmed.len() < 80 {
                continue;
            }
            if !article_id.is_match(trimmed) {
                continue;
            }
            links.insert(trimmed.to_string());
        }
        links
    }

    /// Slug-heuristic detector for sites without numeric article ids.
    pub fn extract_slug_article_links(
        &self,
        base_url: &str,
        cfg: &SlugDetectionConfig,
    ) -> BTreeSet<String> {
        let mut links = BTreeSet::new();
        let Ok(base) = Url::parse(base_url) else {
            return links;
        };
        let Some(base_host) = base.host_str().map(str::to_string) else {
            return links;
        };

        for href in self.hrefs() {
            let href = strip_query_and_fragment(&href);

            let (full_url, path) = if href.starts_with('/') {
                (
                    format!("{}://{}{}", base.scheme(), base_host, href),
                    href.to_string(),
                )
            } else if let Ok(parsed) = Url::parse(href) {
                if parsed.host_str() != Some(base_host.as_str()) {
                    continue;
                }
                (href.to_string(), parsed.path().to_string())
            } else {
                continue;
            };

            if is_probable_article_slug(&path, cfg) {
                links.insert(full_url);
            }
        }
        links
    }

    /// Loose discovery: absolutize every same-host or relative link, keep the
    /// ones longer than `min_length`. Foreign absolute URLs are rejected.
    pub fn extract_all_resolved_links(&self, base_url: &str, min_length: usize) -> BTreeSet<String> {
        let mut links = BTreeSet::new();
        let Ok(base) = Url::parse(base_url) else {
            return links;
        };
        let Some(base_host) = base.host_str().map(str::to_string) else {
            return links;
        };
        let Ok(base_root) = Url::parse(&format!("{}://{}", base.scheme(), base_host)) else {
            return links;
        };

        for href in self.hrefs() {
            let href = strip_query_and_fragment(&href);

            let full_url = if href.starts_with('/') {
                match base_root.join(href) {
                    Ok(u) => u.to_string(),
                    Err(_) => continue,
                }
            } else if href.starts_with("http://") || href.starts_with("https://") {
                match Url::parse(href) {
                    Ok(u) if u.host_str() == Some(base_host.as_str()) => href.to_string(),
                    _ => continue,
                }
            } else {
                match base_root.join(href) {
                    Ok(u) => u.to_string(),
                    Err(_) => continue,
                }
            };

            if full_url.len() > min_length {
                links.insert(full_url);
            }
        }
        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com/";

    fn page(links: &[&str]) -> Distiller {
        let anchors: String = links
            .iter()
            .map(|l| format!(r#"<a href="{}">x</a>"#, l))
            .collect();
        Distiller::parse(&format!("<html><body>{}</body></html>", anchors))
    }

    #[test]
    fn id_detector_requires_same_host_length_and_trailing_id() {
        let d = page(&[
            // accepted: root-relative, long, trailing id
            "/business/a-very-long-story-slug-that-clears-the-length-floor-easily-1234567",
            // rejected: foreign host
            "https://other.com/business/a-very-long-story-slug-that-clears-the-length-floor-1234567",
            // rejected: too short
            "/biz-99",
            // rejected: no trailing id
            "/business/a-very-long-story-slug-that-clears-the-length-floor-easily-noid",
        ]);
        let links = d.extract_article_links(BASE);
        assert_eq!(links.len(), 1);
        let only = links.iter().next().unwrap();
        assert!(only.starts_with("https://example.com/business/"));
        assert!(only.ends_with("-1234567"));
        assert!(only.len() >= 80);
    }

    #[test]
    fn id_detector_strips_query_strings() {
        let long_path =
            "/markets/one-sufficiently-long-hyphenated-market-story-for-the-detector-55512";
        let d = page(&[&format!("{}?pfrom=home", long_path)]);
        let links = d.extract_article_links(BASE);
        assert_eq!(links.len(), 1);
        assert!(!links.iter().next().unwrap().contains('?'));
    }

    #[test]
    fn slug_detector_boundary_flips() {
        let cfg = SlugDetectionConfig::default();
        let ok = "/news/a-long-enough-lowercase-article-slug-with-hyphens-here";
        assert!(is_probable_article_slug(ok, &cfg));

        // each violated threshold flips the verdict
        assert!(!is_probable_article_slug("/news/short-slug", &cfg));

        let deep = SlugDetectionConfig {
            min_path_depth: 3,
            ..cfg.clone()
        };
        assert!(!is_probable_article_slug(ok, &deep));

        let long_total = SlugDetectionConfig {
            min_total_path_length: 500,
            ..cfg.clone()
        };
        assert!(!is_probable_article_slug(ok, &long_total));

        let hyphens = SlugDetectionConfig {
            min_hyphen_count: 40,
            ..cfg.clone()
        };
        assert!(!is_probable_article_slug(ok, &hyphens));

        let ratio = SlugDetectionConfig {
            min_hyphen_ratio: 0.9,
            ..cfg.clone()
        };
        assert!(!is_probable_article_slug(ok, &ratio));

        let upper = "/news/A-Long-Enough-Uppercase-Article-Slug-With-Hyphens-Here";
        assert!(!is_probable_article_slug(upper, &cfg));
        let relaxed = SlugDetectionConfig {
            require_lowercase: false,
            ..cfg.clone()
        };
        assert!(is_probable_article_slug(upper, &relaxed));

        let excluded = SlugDetectionConfig {
            exclude_paths: ["news".to_string()].into_iter().collect(),
            ..cfg
        };
        assert!(!is_probable_article_slug(ok, &excluded));
    }

    #[test]
    fn slug_detector_resolves_and_filters_hosts() {
        let slug = "a-long-enough-lowercase-article-slug-with-hyphens-here";
        let d = page(&[
            &format!("/news/{}", slug),
            &format!("https://example.com/news/{}#section", slug),
            &format!("https://foreign.com/news/{}", slug),
        ]);
        let links = d.extract_slug_article_links(BASE, &SlugDetectionConfig::default());
        assert_eq!(links.len(), 1);
        assert_eq!(
            links.iter().next().unwrap(),
            &format!("https://example.com/news/{}", slug)
        );
    }

    #[test]
    fn resolved_links_reject_foreign_and_short() {
        let d = page(&[
            "/a/fairly/long/relative/path",
            "relative/without/leading/slash",
            "https://example.com/absolute/same/host/path",
            "https://foreign.com/absolute/other/host/path",
            "/x",
        ]);
        let links = d.extract_all_resolved_links(BASE, 25);
        assert!(links.contains("https://example.com/a/fairly/long/relative/path"));
        assert!(links.contains("https://example.com/relative/without/leading/slash"));
        assert!(links.contains("https://example.com/absolute/same/host/path"));
        assert!(!links.iter().any(|l| l.contains("foreign.com")));
        assert!(!links.contains("https://example.com/x"));
    }
}
