//! Fuzzy page lookup over `(path, title)` pairs.
//!
//! The index is a flat projection of the document rebuilt after every
//! mutation; documents stay in the hundreds of pages, so a linear scan per
//! keystroke is fine. Distances come from `strsim`.

use crate::sitemap::Document;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchOptions {
    /// Entries listed for a blank term.
    pub browse_limit: usize,
    /// Maximum ranked results.
    pub result_limit: usize,
    /// Highest distance (0 = perfect, 1 = unrelated) a field may have to match.
    pub threshold: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            browse_limit: 10,
            result_limit: 8,
            threshold: 0.4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchEntry {
    pub path: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    pub path: String,
    pub title: String,
    /// `None` in browse mode.
    pub score: Option<f64>,
}

#[derive(Clone, Debug, Default)]
pub struct SearchIndex {
    entries: Vec<SearchEntry>,
    options: SearchOptions,
}

impl SearchIndex {
    pub fn build(doc: &Document, options: SearchOptions) -> Self {
        let entries = doc
            .iter()
            .map(|(path, page)| SearchEntry {
                path: path.clone(),
                title: page.title.clone(),
            })
            .collect();
        Self { entries, options }
    }

    pub fn query(&self, term: &str) -> Vec<SearchHit> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return self
                .entries
                .iter()
                .take(self.options.browse_limit)
                .map(|entry| hit(entry, None))
                .collect();
        }

        let mut scored: Vec<(f64, usize)> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(order, entry)| {
                let best = [&entry.title, &entry.path]
                    .into_iter()
                    .map(|field| field_distance(&term, field))
                    .filter(|distance| *distance <= self.options.threshold)
                    .min_by(f64::total_cmp)?;
                Some((best, order))
            })
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        scored
            .into_iter()
            .take(self.options.result_limit)
            .map(|(score, order)| hit(&self.entries[order], Some(score)))
            .collect()
    }

    /// True when no path or title contains `term` case-insensitively. Drives
    /// the "create page" offer and ignores the fuzzy threshold.
    pub fn has_no_match(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        !self.entries.iter().any(|entry| {
            entry.path.to_lowercase().contains(&needle)
                || entry.title.to_lowercase().contains(&needle)
        })
    }
}

fn hit(entry: &SearchEntry, score: Option<f64>) -> SearchHit {
    SearchHit {
        path: entry.path.clone(),
        title: entry.title.clone(),
        score,
    }
}

/// Distance between a lowercase term and the best-aligned stretch of `field`.
/// Windows one char shorter and longer than the term absorb a dropped or
/// doubled letter.
fn field_distance(term: &str, field: &str) -> f64 {
    let field: Vec<char> = field.to_lowercase().chars().collect();
    let term_len = term.chars().count();
    if field.len() <= term_len {
        let whole: String = field.iter().collect();
        return 1.0 - strsim::normalized_levenshtein(term, &whole);
    }

    let mut best = 1.0_f64;
    for width in [term_len.saturating_sub(1).max(1), term_len, term_len + 1] {
        if width > field.len() {
            continue;
        }
        for window in field.windows(width) {
            let candidate: String = window.iter().collect();
            let distance = 1.0 - strsim::normalized_levenshtein(term, &candidate);
            if distance < best {
                best = distance;
                if best == 0.0 {
                    return best;
                }
            }
        }
    }
    best
}
