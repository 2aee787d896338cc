//! The "insert link" widget: search existing pages while typing, turn a pick
//! into a markdown link, or create a page from the typed text.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::info;

use crate::error::EditorResult;
use crate::search::{SearchHit, SearchIndex};
use crate::session::Session;
use crate::sitemap::link_target;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LinkFlow {
    #[default]
    Closed,
    Open {
        term: String,
    },
}

impl LinkFlow {
    /// Opens with an empty term, discarding any previous one.
    pub fn open(&mut self) {
        *self = LinkFlow::Open {
            term: String::new(),
        };
    }

    pub fn close(&mut self) {
        *self = LinkFlow::Closed;
    }

    pub fn is_open(&self) -> bool {
        matches!(self, LinkFlow::Open { .. })
    }

    pub fn term(&self) -> &str {
        match self {
            LinkFlow::Open { term } => term,
            LinkFlow::Closed => "",
        }
    }

    /// Keystrokes only count while open.
    pub fn set_term(&mut self, value: impl Into<String>) {
        if let LinkFlow::Open { term } = self {
            *term = value.into();
        }
    }

    pub fn results(&self, index: &SearchIndex) -> Vec<SearchHit> {
        match self {
            LinkFlow::Open { term } => index.query(term),
            LinkFlow::Closed => Vec::new(),
        }
    }

    /// Whether "create page" is offered for the current term.
    pub fn offers_create(&self, index: &SearchIndex) -> bool {
        match self {
            LinkFlow::Open { term } => !term.trim().is_empty() && index.has_no_match(term),
            LinkFlow::Closed => false,
        }
    }

    /// Closes and returns the markdown link for `hit`.
    pub fn select(&mut self, hit: &SearchHit, suffix: &str) -> String {
        self.close();
        link_token(&hit.title, &hit.path, suffix)
    }

    /// Creates a page named after the current term. Stays open on failure so
    /// the user can fix the term.
    pub fn create_from_term(&mut self, session: &mut Session, today: NaiveDate) -> EditorResult<String> {
        let slug = slugify(self.term());
        let path = session.create_page(&slug, today)?;
        info!(path = %path, "page created from link search");
        self.close();
        Ok(path)
    }
}

pub fn link_token(title: &str, path: &str, suffix: &str) -> String {
    format!("[{}]({})", title, link_target(path, suffix))
}

/// Lowercases, drops everything but letters, digits, spaces and hyphens, and
/// joins words with hyphens: `"Hello World!"` becomes `hello-world`.
pub fn slugify(text: &str) -> String {
    static RE_STRIP: OnceLock<Regex> = OnceLock::new();
    static RE_SPACE: OnceLock<Regex> = OnceLock::new();

    let re_strip = RE_STRIP.get_or_init(|| Regex::new(r"[^a-z0-9\s-]").expect("valid strip regex"));
    let re_space = RE_SPACE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"));

    let lowered = text.to_lowercase();
    let stripped = re_strip.replace_all(&lowered, "");
    re_space.replace_all(stripped.trim(), "-").into_owned()
}
