//! Whole-site figures for the sidebar: content statistics, how often each
//! page is linked to, and the orderings built on them.

use std::collections::HashMap;

use crate::sitemap::Document;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentStats {
    pub total_pages: usize,
    pub pages_with_dates: usize,
    pub pages_with_images: usize,
    /// Markdown characters across all pages.
    pub total_content_length: usize,
    pub earliest_date: Option<String>,
    pub latest_date: Option<String>,
}

pub fn content_stats(doc: &Document) -> ContentStats {
    let mut stats = ContentStats {
        total_pages: doc.len(),
        ..ContentStats::default()
    };

    let mut dates: Vec<&str> = Vec::new();
    for page in doc.values() {
        if let Some(date) = page.date.as_deref().filter(|d| !d.is_empty()) {
            stats.pages_with_dates += 1;
            dates.push(date);
        }
        if page.image.as_deref().is_some_and(|i| !i.is_empty()) {
            stats.pages_with_images += 1;
        }
        stats.total_content_length += page.md.chars().count();
    }

    dates.sort_unstable();
    stats.earliest_date = dates.first().map(|d| d.to_string());
    stats.latest_date = dates.last().map(|d| d.to_string());
    stats
}

/// Counts, for every page, the links pointing at it from other records.
/// External links, query links and targets outside the document are ignored.
pub fn inbound_links(doc: &Document) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for (from, page) in doc {
        for link in &page.links {
            let Some(target) = resolve_link(from, link) else {
                continue;
            };
            if doc.contains_key(&target) {
                *counts.entry(target).or_insert(0) += 1;
            }
        }
    }
    counts
}

fn resolve_link(from: &str, link: &str) -> Option<String> {
    if link.starts_with("http") || link.contains('?') {
        return None;
    }
    let link = link.trim_start_matches('/');
    if !link.starts_with("../") {
        return Some(link.to_string());
    }

    // `news/item.html` resolves relative to `news/`; an extensionless
    // `news/item` is treated as a directory itself.
    let base = match from.rsplit_once('/') {
        Some((dir, file)) if file.contains('.') => format!("{dir}/"),
        None if from.contains('.') => String::new(),
        _ => format!("{from}/"),
    };
    Some(normalize_segments(&format!("{base}{link}")))
}

fn normalize_segments(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SidebarOrder {
    #[default]
    Document,
    Title,
    Popularity,
}

impl SidebarOrder {
    pub const ALL: [SidebarOrder; 3] = [
        SidebarOrder::Document,
        SidebarOrder::Title,
        SidebarOrder::Popularity,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SidebarOrder::Document => "Site order",
            SidebarOrder::Title => "Title",
            SidebarOrder::Popularity => "Most linked",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            SidebarOrder::Document => "document",
            SidebarOrder::Title => "title",
            SidebarOrder::Popularity => "popularity",
        }
    }

    pub fn from_key(key: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|order| order.key() == key)
            .unwrap_or_default()
    }
}

/// Page paths in the requested order; ties keep document order.
pub fn ordered_paths(doc: &Document, order: SidebarOrder, inbound: &HashMap<String, usize>) -> Vec<String> {
    let mut paths: Vec<&String> = doc.keys().collect();
    match order {
        SidebarOrder::Document => {}
        SidebarOrder::Title => paths.sort_by_cached_key(|path| doc[path.as_str()].title.to_lowercase()),
        SidebarOrder::Popularity => {
            paths.sort_by_key(|path| std::cmp::Reverse(inbound.get(path.as_str()).copied().unwrap_or(0)))
        }
    }
    paths.into_iter().cloned().collect()
}
