use std::collections::{BTreeMap, BTreeSet};

use scraper::Selector;

use super::Distiller;

/// Lazy-loading attribute variants commonly carrying the real image URL.
const IMAGE_URL_ATTRS: &[&str] = &["src", "data-src", "data-lazy", "data-original", "data-srcset"];

impl Distiller {
    /// Collect every `<meta>` into a key/value map.
    ///
    /// Key = first non-empty of `property | name | itemprop`, value = `content`,
    /// both trimmed. Later duplicates overwrite earlier ones.
    pub fn extract_meta_tags(&self) -> BTreeMap<String, String> {
        let mut meta = BTreeMap::new();
        let Ok(sel) = Selector::parse("meta") else {
            return meta;
        };

        for el in self.doc.select(&sel) {
            let key = ["property", "name", "itemprop"]
                .iter()
                .find_map(|attr| el.value().attr(attr).filter(|v| !v.is_empty()));
            let value = el.value().attr("content").filter(|v| !v.is_empty());

            if let (Some(key), Some(value)) = (key, value) {
                meta.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        meta
    }

    /// Union of image URLs across `src` and the usual lazy-loading attributes.
    pub fn extract_image_urls(&self) -> BTreeSet<String> {
        let mut urls = BTreeSet::new();
        let Ok(sel) = Selector::parse("img") else {
            return urls;
        };

        for img in self.doc.select(&sel) {
            for attr in IMAGE_URL_ATTRS {
                if let Some(val) = img.value().attr(attr) {
                    if !val.is_empty() {
                        urls.insert(val.trim().to_string());
                    }
                }
            }
        }
        urls
    }

    /// Raw text of every `<script type="application/ld+json">`, trimmed, in
    /// document order.
    pub fn extract_all_json_ld(&self) -> Vec<String> {
        let mut blocks = Vec::new();
        let Ok(sel) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
            return blocks;
        };

        for script in self.doc.select(&sel) {
            let raw = script.text().collect::<String>();
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                blocks.push(trimmed.to_string());
            }
        }
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_key_prefers_property_then_name_then_itemprop() {
        let html = r#"<html><head>
            <meta property="og:title" content=" Title ">
            <meta name="description" content="Desc">
            <meta itemprop="datePublished" content="2024-01-01">
            <meta name="empty" content="">
            <meta content="orphan value">
        </head></html>"#;
        let d = Distiller::parse(html);
        let meta = d.extract_meta_tags();
        assert_eq!(meta.get("og:title").map(String::as_str), Some("Title"));
        assert_eq!(meta.get("description").map(String::as_str), Some("Desc"));
        assert_eq!(
            meta.get("datePublished").map(String::as_str),
            Some("2024-01-01")
        );
        assert!(!meta.contains_key("empty"));
        assert_eq!(meta.len(), 3);
    }

    #[test]
    fn duplicate_meta_keys_last_occurrence_wins() {
        let html = r#"<html><head>
            <meta property="og:title" content="first">
            <meta property="og:title" content="second">
        </head></html>"#;
        let d = Distiller::parse(html);
        assert_eq!(
            d.extract_meta_tags().get("og:title").map(String::as_str),
            Some("second")
        );
    }

    #[test]
    fn image_urls_union_lazy_attributes() {
        let html = r#"<body>
            <img src="/a.jpg">
            <img data-src="/b.jpg" src="/placeholder.gif">
            <img data-lazy=" /c.jpg ">
            <img data-original="/d.jpg">
            <img data-srcset="/e.jpg 2x">
            <img alt="no url">
        </body>"#;
        let d = Distiller::parse(html);
        let urls = d.extract_image_urls();
        for expected in ["/a.jpg", "/b.jpg", "/placeholder.gif", "/c.jpg", "/d.jpg", "/e.jpg 2x"] {
            assert!(urls.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn json_ld_blocks_keep_document_order() {
        let html = r#"<html><head>
            <script type="application/ld+json">{"@type":"NewsArticle","pos":1}</script>
            <script>var notLd = true;</script>
            <script type="application/ld+json"> {"@type":"Organization","pos":2} </script>
        </head></html>"#;
        let d = Distiller::parse(html);
        let blocks = d.extract_all_json_ld();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains("\"pos\":1"));
        assert!(blocks[1].contains("\"pos\":2"));
        assert!(!blocks[1].starts_with(' '));
    }
}
