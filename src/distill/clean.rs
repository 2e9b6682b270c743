use ego_tree::NodeId;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use super::Distiller;

/// Boilerplate blocks matched by their entire (trimmed, lower-cased) text.
const JUNK_TEXT_BLOCKS: &[&str] = &[
    "advertisement",
    "sponsored",
    "promoted",
    "related articles",
    "recommended",
    "you may like",
    "newsletters",
];

/// Tags removed when they contain no element and no non-whitespace text.
const EMPTYABLE_TAGS: &str = "div, span, section, article, p, aside, header, footer";

/// Structural chrome removed wholesale late in the pipeline.
const LAYOUT_TAGS: &str = "nav, aside, footer, header, menu";

fn is_hollow(el: &ElementRef) -> bool {
    let has_child_element = el
        .descendants()
        .skip(1)
        .any(|n| n.value().is_element());
    let has_text = el.text().any(|t| !t.trim().is_empty());
    !has_child_element && !has_text
}

impl Distiller {
    /// Run the full cleaning pipeline in its fixed order. Idempotent:
    /// re-running on an already-cleaned document is a no-op.
    pub fn run_cleaning_pipeline(&mut self) {
        self.remove_scripts();
        self.remove_css();
        self.remove_iframes();
        self.remove_svg();
        self.remove_junk_text_blocks();
        self.remove_all_classes_and_ids();
        self.remove_empty_tags();
        self.aggressive_cleanup();
        self.keep_only_body();
        self.remove_layout_tags();
        self.collapse_wrappers();
        self.deep_prune_empty();
    }

    fn select_ids<F>(&self, css: &str, pred: F) -> Vec<NodeId>
    where
        F: Fn(&ElementRef) -> bool,
    {
        let Ok(sel) = Selector::parse(css) else {
            return Vec::new();
        };
        self.doc
            .select(&sel)
            .filter(|el| pred(el))
            .map(|el| el.id())
            .collect()
    }

    fn detach_all(&mut self, ids: Vec<NodeId>) {
        for id in ids {
            if let Some(mut node) = self.doc.tree.get_mut(id) {
                node.detach();
            }
        }
    }

    /// Ids of every element node in the document.
    fn element_ids(&self) -> Vec<NodeId> {
        self.doc
            .tree
            .root()
            .descendants()
            .filter(|n| n.value().is_element())
            .map(|n| n.id())
            .collect()
    }

    /// 1. Delete `<script>` except JSON-LD payloads.
    pub fn remove_scripts(&mut self) {
        let ids = self.select_ids("script", |el| {
            el.value().attr("type") != Some("application/ld+json")
        });
        self.detach_all(ids);
    }

    /// 2. Delete `<style>` and strip inline `style` attributes.
    pub fn remove_css(&mut self) {
        let ids = self.select_ids("style", |_| true);
        self.detach_all(ids);
        self.strip_attributes(|local| local == "style");
    }

    /// 3. Delete `<iframe>`.
    pub fn remove_iframes(&mut self) {
        let ids = self.select_ids("iframe", |_| true);
        self.detach_all(ids);
    }

    /// 4. Delete `<svg>` subtrees.
    pub fn remove_svg(&mut self) {
        let ids = self.select_ids("svg", |_| true);
        self.detach_all(ids);
    }

    /// 5. Delete elements whose whole text is a known boilerplate label.
    /// The document roots stay put so the tree always serializes.
    pub fn remove_junk_text_blocks(&mut self) {
        let ids = self.select_ids("*", |el| {
            if matches!(el.value().name(), "html" | "body") {
                return false;
            }
            let text = el.text().collect::<String>();
            let text = text.trim().to_lowercase();
            JUNK_TEXT_BLOCKS.contains(&text.as_str())
        });
        self.detach_all(ids);
    }

    /// 6. Strip `class` and `id` from every element.
    pub fn remove_all_classes_and_ids(&mut self) {
        self.strip_attributes(|local| local == "class" || local == "id");
    }

    /// 7. Delete contentless instances of the usual wrapper tags.
    pub fn remove_empty_tags(&mut self) {
        let ids = self.select_ids(EMPTYABLE_TAGS, is_hollow);
        self.detach_all(ids);
    }

    /// 8. Remove empty-valued attributes and whitespace-only text nodes.
    pub fn aggressive_cleanup(&mut self) {
        for id in self.element_ids() {
            if let Some(mut node) = self.doc.tree.get_mut(id) {
                if let Node::Element(el) = node.value() {
                    el.attrs.retain(|(_, v)| !v.is_empty());
                }
            }
        }

        let blank_text: Vec<NodeId> = self
            .doc
            .tree
            .root()
            .descendants()
            .filter(|n| matches!(n.value(), Node::Text(t) if t.text.trim().is_empty()))
            .map(|n| n.id())
            .collect();
        self.detach_all(blank_text);
    }

    /// 9. Reparse with the `<body>` subtree as the document root.
    pub fn keep_only_body(&mut self) {
        let Ok(sel) = Selector::parse("body") else {
            return;
        };
        if let Some(body) = self.doc.select(&sel).next() {
            self.doc = Html::parse_document(&body.html());
        }
    }

    /// 10. Delete layout chrome.
    pub fn remove_layout_tags(&mut self) {
        let ids = self.select_ids(LAYOUT_TAGS, |_| true);
        self.detach_all(ids);
    }

    /// 11. Replace any `<div>` whose element-children count is exactly one by
    /// that child. Fixed point.
    pub fn collapse_wrappers(&mut self) {
        let Ok(sel) = Selector::parse("div") else {
            return;
        };
        loop {
            let pairs: Vec<(NodeId, NodeId)> = self
                .doc
                .select(&sel)
                .filter_map(|div| {
                    let mut elements = div.children().filter(|c| c.value().is_element());
                    match (elements.next(), elements.next()) {
                        (Some(only), None) => Some((div.id(), only.id())),
                        _ => None,
                    }
                })
                .collect();

            let mut changed = false;
            for (wrapper, child) in pairs {
                // wrapper may already have been detached earlier in this pass
                let attached = self
                    .doc
                    .tree
                    .get(wrapper)
                    .map(|n| n.parent().is_some())
                    .unwrap_or(false);
                if !attached {
                    continue;
                }
                if let Some(mut node) = self.doc.tree.get_mut(wrapper) {
                    node.insert_id_before(child);
                    node.detach();
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// 12. Repeatedly delete contentless `div`/`span`/`section`. Fixed point.
    pub fn deep_prune_empty(&mut self) {
        loop {
            let ids = self.select_ids("div, span, section", is_hollow);
            if ids.is_empty() {
                break;
            }
            self.detach_all(ids);
        }
    }

    fn strip_attributes<F>(&mut self, remove: F)
    where
        F: Fn(&str) -> bool,
    {
        for id in self.element_ids() {
            if let Some(mut node) = self.doc.tree.get_mut(id) {
                if let Node::Element(el) = node.value() {
                    el.attrs.retain(|(name, _)| !remove(name.local.as_ref()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaned(html: &str) -> String {
        let mut d = Distiller::parse(html);
        d.run_cleaning_pipeline();
        d.html()
    }

    #[test]
    fn scripts_are_removed_except_json_ld() {
        let out = cleaned(
            r#"<body><script>alert(1)</script>
            <script type="application/ld+json">{"@type":"NewsArticle"}</script>
            <p>keep</p></body>"#,
        );
        assert!(!out.contains("alert(1)"));
        assert!(out.contains("NewsArticle"));
        assert!(out.contains("<p>keep</p>"));
    }

    #[test]
    fn css_iframes_and_svg_are_removed() {
        let out = cleaned(
            r#"<body><style>p{color:red}</style>
            <p style="color:blue" class="lede" id="first">text</p>
            <iframe src="https://ads.example.com"></iframe>
            <svg><circle r="1"/></svg></body>"#,
        );
        assert!(!out.contains("<style"));
        assert!(!out.contains("style="));
        assert!(!out.contains("<iframe"));
        assert!(!out.contains("<svg"));
        assert!(!out.contains("class="));
        assert!(!out.contains("id="));
        assert!(out.contains("text"));
    }

    #[test]
    fn junk_text_blocks_are_removed_by_exact_match() {
        let out = cleaned(
            r#"<body><p>Advertisement</p><p>RELATED ARTICLES</p>
            <p>advertisement rates rose</p><p>story body</p></body>"#,
        );
        assert!(!out.contains("Advertisement<"));
        assert!(!out.contains("RELATED ARTICLES"));
        assert!(out.contains("advertisement rates rose"));
        assert!(out.contains("story body"));
    }

    #[test]
    fn layout_tags_are_removed_and_only_body_kept() {
        let out = cleaned(
            r#"<html><head><title>t</title></head>
            <body><nav>menu</nav><header>masthead</header>
            <article><p>the story</p></article>
            <footer>legal</footer></body></html>"#,
        );
        assert!(!out.contains("menu"));
        assert!(!out.contains("masthead"));
        assert!(!out.contains("legal"));
        assert!(!out.contains("<title>"));
        assert!(out.contains("the story"));
    }

    #[test]
    fn nested_wrappers_collapse_to_content() {
        let mut html = String::from("<body>");
        for _ in 0..200 {
            html.push_str("<div>");
        }
        html.push_str("<p>text</p>");
        for _ in 0..200 {
            html.push_str("</div>");
        }
        html.push_str("</body>");

        let out = cleaned(&html);
        assert!(out.contains("<p>text</p>"));
        assert!(!out.contains("<div>"));
    }

    #[test]
    fn deep_prune_removes_nested_empties() {
        let out = cleaned(
            r#"<body><section><div><span></span></div></section><p>kept</p></body>"#,
        );
        assert!(!out.contains("<section"));
        assert!(!out.contains("<span"));
        assert!(out.contains("kept"));
    }

    #[test]
    fn pipeline_is_idempotent() {
        let html = r#"<html><head><script>x()</script></head>
        <body><nav>nav</nav>
        <div class="wrap"><div><article><p style="x">Body text</p>
        <img src="/a.jpg" alt=""></article></div></div>
        <div><span>   </span></div>
        <p>Advertisement</p></body></html>"#;

        let mut d = Distiller::parse(html);
        d.run_cleaning_pipeline();
        let once = d.html();
        d.run_cleaning_pipeline();
        let twice = d.html();
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_attributes_are_dropped() {
        let out = cleaned(r#"<body><p><img src="/a.jpg" alt="" data-x="1">x</p></body>"#);
        assert!(!out.contains("alt="));
        assert!(out.contains(r#"data-x="1""#));
        assert!(out.contains(r#"src="/a.jpg""#));
    }
}
