//! The sitemap document: page records keyed by path, and the store that
//! owns the in-memory copy the UI edits.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EditorError, EditorResult};

/// Body given to pages created from the editor.
pub const DEFAULT_BODY: &str = "Write the page content here.\n";

/// One page of the site. Known keys are always written back, absent ones as
/// `null` or `[]`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub md: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
    /// Keys this editor does not know about, kept so saving is lossless.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Path-keyed pages in server order.
pub type Document = IndexMap<String, PageRecord>;

pub fn parse_document(json: &str) -> Result<Document, serde_json::Error> {
    serde_json::from_str(json)
}

pub fn document_to_json(doc: &Document) -> Result<String, serde_json::Error> {
    serde_json::to_string(doc)
}

/// A single-field replacement on a page record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldUpdate {
    Title(String),
    Md(String),
    Date(Option<String>),
    Image(Option<String>),
    Links(Vec<String>),
}

impl FieldUpdate {
    pub fn field_name(&self) -> &'static str {
        match self {
            FieldUpdate::Title(_) => "title",
            FieldUpdate::Md(_) => "md",
            FieldUpdate::Date(_) => "date",
            FieldUpdate::Image(_) => "image",
            FieldUpdate::Links(_) => "links",
        }
    }

    fn apply(self, page: &mut PageRecord) {
        match self {
            FieldUpdate::Title(title) => page.title = title,
            FieldUpdate::Md(md) => page.md = md,
            FieldUpdate::Date(date) => page.date = date,
            FieldUpdate::Image(image) => page.image = image,
            FieldUpdate::Links(links) => page.links = links,
        }
    }
}

/// Normalizes user input into a document key: trims, uses forward slashes,
/// drops leading slashes, and appends `suffix` when missing.
pub fn normalize_page_path(raw: &str, suffix: &str) -> Option<String> {
    let cleaned = raw.trim().replace('\\', "/");
    let cleaned = cleaned.trim_start_matches('/').trim();
    if cleaned.is_empty() || cleaned == suffix {
        return None;
    }
    if cleaned.ends_with(suffix) {
        Some(cleaned.to_string())
    } else {
        Some(format!("{cleaned}{suffix}"))
    }
}

pub fn strip_suffix<'a>(path: &'a str, suffix: &str) -> &'a str {
    path.strip_suffix(suffix).unwrap_or(path)
}

/// Title for a freshly created page: the path without its suffix, with
/// separators turned into spaces.
pub fn default_title(path: &str, suffix: &str) -> String {
    strip_suffix(path, suffix)
        .split(['/', '-', '_'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Site-absolute link target used in markdown links, e.g. `/about` for
/// `about.html`.
pub fn link_target(path: &str, suffix: &str) -> String {
    format!("/{}", strip_suffix(path, suffix))
}

/// Presence checks before a save. Records always serialize `title` and `md`,
/// so only the keys need checking; empty titles and bodies are fine.
pub fn validate_for_save(doc: &Document) -> EditorResult<()> {
    if doc.keys().any(|path| path.trim().is_empty()) {
        return Err(EditorError::Validation("a page has an empty path".into()));
    }
    Ok(())
}

/// Owner of the in-memory document.
#[derive(Clone, Debug)]
pub struct SitemapStore {
    doc: Document,
    suffix: String,
}

impl SitemapStore {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            doc: Document::new(),
            suffix: suffix.into(),
        }
    }

    #[cfg(test)]
    pub fn with_document(doc: Document, suffix: impl Into<String>) -> Self {
        Self {
            doc,
            suffix: suffix.into(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn len(&self) -> usize {
        self.doc.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.doc.contains_key(path)
    }

    pub fn first_path(&self) -> Option<&str> {
        self.doc.keys().next().map(String::as_str)
    }

    /// Replaces the whole document.
    pub fn load(&mut self, doc: Document) {
        info!(pages = doc.len(), "sitemap loaded");
        self.doc = doc;
    }

    pub fn get_page(&self, path: &str) -> Option<&PageRecord> {
        self.doc.get(path)
    }

    pub fn update_field(&mut self, path: &str, update: FieldUpdate) -> EditorResult<()> {
        let Some(page) = self.doc.get_mut(path) else {
            return Err(EditorError::NotFound {
                path: path.to_string(),
            });
        };
        debug!(path, field = update.field_name(), "page field updated");
        update.apply(page);
        Ok(())
    }

    /// Inserts a new page and returns its normalized path.
    pub fn create_page(&mut self, raw: &str, today: NaiveDate) -> EditorResult<String> {
        let path = normalize_page_path(raw, &self.suffix).ok_or_else(|| {
            EditorError::InvalidPath {
                raw: raw.to_string(),
            }
        })?;
        if self.doc.contains_key(&path) {
            return Err(EditorError::DuplicatePage { path });
        }

        let page = PageRecord {
            title: default_title(&path, &self.suffix),
            md: DEFAULT_BODY.to_string(),
            date: Some(today.format("%Y-%m-%d").to_string()),
            image: None,
            links: Vec::new(),
            extra: serde_json::Map::new(),
        };
        info!(path = %path, "page created");
        self.doc.insert(path.clone(), page);
        Ok(path)
    }

    /// Removes a page, keeping the order of the others.
    pub fn delete_page(&mut self, path: &str) -> EditorResult<PageRecord> {
        let removed = self
            .doc
            .shift_remove(path)
            .ok_or_else(|| EditorError::NotFound {
                path: path.to_string(),
            })?;
        info!(path, "page deleted");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    fn store_with_a() -> SitemapStore {
        let doc = parse_document(r#"{"a.html": {"title": "A", "md": "x", "links": []}}"#).unwrap();
        SitemapStore::with_document(doc, ".html")
    }

    #[test]
    fn round_trips_through_json() {
        let json = r##"{
            "index.html": {"title": "Home", "md": "# Hi", "date": null, "links": ["/about.html"]},
            "about.html": {"title": "About", "md": "", "date": "2009-01-02", "image": "sites/a.png", "links": []},
            "news/x.html": {"title": "X", "md": "y", "links": [], "weight": 3}
        }"##;
        let doc = parse_document(json).unwrap();
        let reparsed = parse_document(&document_to_json(&doc).unwrap()).unwrap();
        assert_eq!(doc, reparsed);
        assert_eq!(
            reparsed.keys().collect::<Vec<_>>(),
            vec!["index.html", "about.html", "news/x.html"]
        );
        assert_eq!(reparsed["news/x.html"].extra["weight"], 3);
    }

    #[test]
    fn rejects_duplicate_page() {
        let mut store = store_with_a();
        let before = store.document().clone();
        assert_eq!(
            store.create_page("a", day()),
            Err(EditorError::DuplicatePage {
                path: "a.html".into()
            })
        );
        assert_eq!(store.document(), &before);
    }

    #[test]
    fn creates_page_with_defaults() {
        let mut store = store_with_a();
        let before = store.get_page("a.html").cloned();

        let path = store.create_page("b", day()).unwrap();
        assert_eq!(path, "b.html");
        let page = store.get_page("b.html").unwrap();
        assert_eq!(page.title, "b");
        assert_eq!(page.md, DEFAULT_BODY);
        assert_eq!(page.date.as_deref(), Some("2024-05-17"));
        assert_eq!(page.image, None);
        assert!(page.links.is_empty());
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_page("a.html").cloned(), before);
    }

    #[test]
    fn normalizes_created_paths() {
        let mut store = SitemapStore::new(".html");
        assert_eq!(
            store.create_page(" /events/summer-camp ", day()).unwrap(),
            "events/summer-camp.html"
        );
        assert_eq!(
            store.get_page("events/summer-camp.html").unwrap().title,
            "events summer camp"
        );
        assert_eq!(store.create_page("c.html", day()).unwrap(), "c.html");
        assert!(matches!(
            store.create_page("  / ", day()),
            Err(EditorError::InvalidPath { .. })
        ));
    }

    #[test]
    fn updates_exactly_one_field() {
        let mut store = store_with_a();
        store.create_page("b", day()).unwrap();
        let other = store.get_page("b.html").cloned();

        store
            .update_field("a.html", FieldUpdate::Title("New".into()))
            .unwrap();

        let page = store.get_page("a.html").unwrap();
        assert_eq!(page.title, "New");
        assert_eq!(page.md, "x");
        assert!(page.links.is_empty());
        assert_eq!(page.date, None);
        assert_eq!(store.get_page("b.html").cloned(), other);
    }

    #[test]
    fn update_on_missing_page_reports_not_found() {
        let mut store = store_with_a();
        let before = store.document().clone();
        assert!(matches!(
            store.update_field("nope.html", FieldUpdate::Md("z".into())),
            Err(EditorError::NotFound { .. })
        ));
        assert_eq!(store.document(), &before);
    }

    #[test]
    fn delete_keeps_remaining_order() {
        let mut store = SitemapStore::new(".html");
        for name in ["one", "two", "three"] {
            store.create_page(name, day()).unwrap();
        }
        let removed = store.delete_page("two.html").unwrap();
        assert_eq!(removed.title, "two");
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.document().keys().collect::<Vec<_>>(),
            vec!["one.html", "three.html"]
        );
        assert!(store.delete_page("two.html").is_err());
    }

    #[test]
    fn builds_link_targets() {
        assert_eq!(link_target("about.html", ".html"), "/about");
        assert_eq!(link_target("news/x.html", ".html"), "/news/x");
        assert_eq!(link_target("raw", ".html"), "/raw");
    }

    #[test]
    fn writes_every_known_key() {
        let doc = parse_document(r#"{"a.html": {"title": "A", "md": "x", "image": null}}"#).unwrap();
        let json = document_to_json(&doc).unwrap();
        assert_eq!(
            json,
            r#"{"a.html":{"title":"A","md":"x","date":null,"image":null,"links":[]}}"#
        );
        assert_eq!(parse_document(&json).unwrap(), doc);
    }

    #[test]
    fn validation_accepts_blank_titles() {
        let mut store = store_with_a();
        assert!(validate_for_save(store.document()).is_ok());
        store
            .update_field("a.html", FieldUpdate::Title(String::new()))
            .unwrap();
        store.update_field("a.html", FieldUpdate::Md(String::new())).unwrap();
        assert!(validate_for_save(store.document()).is_ok());
    }

    #[test]
    fn validation_rejects_blank_keys() {
        let mut doc = store_with_a().document().clone();
        doc.insert(" ".into(), PageRecord::default());
        assert!(matches!(
            validate_for_save(&doc),
            Err(EditorError::Validation(_))
        ));
    }
}
