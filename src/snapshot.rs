//! Best-effort page snapshots: one `.html` and one `.json` per scrape for
//! offline inspection. A snapshot failure never fails the scrape.

use std::path::{Path, PathBuf};

use regex::Regex;
use scraper::{Html, Selector};
use tracing::{info, warn};

use crate::core::types::ScrapeResult;

const MAX_STEM_LEN: usize = 100;

/// Writes scrape snapshots under `<base_dir>/<recipe>/`.
pub struct SnapshotWriter {
    base_dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn save(&self, result: &ScrapeResult, recipe: &str) {
        match self.write(result, recipe) {
            Ok((html_path, json_path)) => {
                info!(
                    "[SNAPSHOT] Saved {} and {}",
                    html_path.display(),
                    json_path.display()
                );
            }
            Err(e) => warn!("[SNAPSHOT] Failed to save snapshot files: {}", e),
        }
    }

    fn write(&self, result: &ScrapeResult, recipe: &str) -> std::io::Result<(PathBuf, PathBuf)> {
        let title = extract_title(result);
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        let stem = format!("{}_{}", sanitize_stem(&title), &uuid[..8]);

        let dir = self.base_dir.join(recipe.to_lowercase());
        std::fs::create_dir_all(&dir)?;

        let html_path = dir.join(format!("{stem}.html"));
        let json_path = dir.join(format!("{stem}.json"));

        std::fs::write(&html_path, &result.html)?;

        let payload = serde_json::json!({
            "url": result.url,
            "title": title,
            "meta_tags": result.meta_tags,
            "images": result.images,
            "json_ld_blocks": result.json_ld_blocks,
            "article_links": result.article_links,
            "html_length": result.html.len(),
            "cleaned_html_length": result.cleaned_html.len(),
            "cleaned_html": result.cleaned_html,
        });
        std::fs::write(&json_path, serde_json::to_string_pretty(&payload)?)?;

        Ok((html_path, json_path))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

/// Title from meta tags, falling back to the `<title>` element.
fn extract_title(result: &ScrapeResult) -> String {
    for key in ["og:title", "twitter:title", "title", "article:title"] {
        if let Some(title) = result.meta_tags.get(key) {
            if !title.trim().is_empty() {
                return title.trim().to_string();
            }
        }
    }

    if let Ok(sel) = Selector::parse("title") {
        let doc = Html::parse_document(&result.html);
        if let Some(el) = doc.select(&sel).next() {
            let title = el.text().collect::<String>().trim().to_string();
            if !title.is_empty() {
                return title;
            }
        }
    }

    "untitled".to_string()
}

fn sanitize_stem(text: &str) -> String {
    let strip = Regex::new(r"[^\w\s-]").expect("strip pattern is valid");
    let collapse = Regex::new(r"[-\s]+").expect("collapse pattern is valid");

    let cleaned = strip.replace_all(text, "");
    let cleaned = collapse.replace_all(&cleaned, "-");
    let cleaned = cleaned.trim_matches('-');

    let truncated: String = cleaned.chars().take(MAX_STEM_LEN).collect();
    if truncated.is_empty() {
        "untitled".to_string()
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn result_with_title(title: &str) -> ScrapeResult {
        let mut meta = BTreeMap::new();
        meta.insert("og:title".to_string(), title.to_string());
        ScrapeResult {
            url: "https://example.com/story".to_string(),
            html: "<html><body>x</body></html>".to_string(),
            cleaned_html: "<body>x</body>".to_string(),
            meta_tags: meta,
            ..Default::default()
        }
    }

    #[test]
    fn stems_are_filesystem_safe() {
        assert_eq!(sanitize_stem("RBI: Policy / Update!"), "RBI-Policy-Update");
        assert_eq!(sanitize_stem("   "), "untitled");
        assert!(sanitize_stem(&"x".repeat(500)).len() <= MAX_STEM_LEN);
    }

    #[test]
    fn title_falls_back_to_title_element() {
        let result = ScrapeResult {
            html: "<html><head><title>From Tag</title></head></html>".to_string(),
            ..Default::default()
        };
        assert_eq!(extract_title(&result), "From Tag");
        assert_eq!(extract_title(&ScrapeResult::default()), "untitled");
    }

    #[test]
    fn snapshot_writes_html_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path());
        writer.save(&result_with_title("A Story"), "generic");

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("generic"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|p| p.extension().unwrap() == "html"));
        assert!(entries.iter().any(|p| p.extension().unwrap() == "json"));

        let json_path = entries
            .iter()
            .find(|p| p.extension().unwrap() == "json")
            .unwrap();
        let payload: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(payload["title"], "A Story");
        assert_eq!(payload["url"], "https://example.com/story");
    }
}
