//! HTML distillation: read-only artifact extraction plus a deterministic,
//! idempotent cleaning pipeline over the same parsed document.

mod clean;
mod extract;
mod links;

pub use links::SlugDetectionConfig;

use scraper::Html;

/// One parsed page. Extraction methods are read-only and may be called in any
/// order before cleaning; the cleaning pipeline mutates the tree in place.
pub struct Distiller {
    doc: Html,
}

impl Distiller {
    pub fn parse(html: &str) -> Self {
        Self {
            doc: Html::parse_document(html),
        }
    }

    /// Serialize the current document.
    pub fn html(&self) -> String {
        self.doc.root_element().html()
    }
}
