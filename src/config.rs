//! Editor configuration: defaults, overridden by JSON saved in
//! `localStorage`, overridden by `?api=` / `?log=` in the page URL.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::search::SearchOptions;

/// `localStorage` key holding a JSON [`EditorConfig`].
pub const STORAGE_KEY: &str = "sitemap-editor.config";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Base URL of the sitemap server, without the `/api/...` route.
    pub api_base: String,
    /// Suffix every page path carries.
    pub page_suffix: String,
    pub browse_limit: usize,
    pub result_limit: usize,
    pub fuzzy_threshold: f64,
    pub log_level: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        let search = SearchOptions::default();
        Self {
            api_base: "http://localhost:8000".to_string(),
            page_suffix: ".html".to_string(),
            browse_limit: search.browse_limit,
            result_limit: search.result_limit,
            fuzzy_threshold: search.threshold,
            log_level: "info".to_string(),
        }
    }
}

impl EditorConfig {
    /// Reads stored settings and URL overrides from the browser.
    pub fn load() -> Self {
        let mut config = Self::default();
        let Some(window) = web_sys::window() else {
            return config;
        };

        if let Ok(Some(storage)) = window.local_storage() {
            if let Ok(Some(raw)) = storage.get_item(STORAGE_KEY) {
                config = Self::from_json_or_default(&raw);
            }
        }

        let search = window.location().search().unwrap_or_default();
        if let Ok(params) = web_sys::UrlSearchParams::new_with_str(&search) {
            config.apply_overrides(params.get("api"), params.get("log"));
        }

        config.sanitized()
    }

    pub fn from_json_or_default(raw: &str) -> Self {
        match serde_json::from_str::<Self>(raw) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring stored editor config");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, api: Option<String>, log: Option<String>) {
        if let Some(api) = api.filter(|v| !v.trim().is_empty()) {
            self.api_base = api.trim().to_string();
        }
        if let Some(log) = log.filter(|v| !v.trim().is_empty()) {
            self.log_level = log.trim().to_string();
        }
    }

    /// Pulls out-of-range values back to something usable.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.api_base = self.api_base.trim().trim_end_matches('/').to_string();
        if self.api_base.is_empty() {
            self.api_base = defaults.api_base;
        }
        if self.page_suffix.trim().is_empty() {
            self.page_suffix = defaults.page_suffix;
        }
        self.browse_limit = self.browse_limit.max(1);
        self.result_limit = self.result_limit.max(1);
        self.fuzzy_threshold = if self.fuzzy_threshold.is_finite() {
            self.fuzzy_threshold.clamp(0.0, 1.0)
        } else {
            defaults.fuzzy_threshold
        };
        self
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            browse_limit: self.browse_limit,
            result_limit: self.result_limit,
            threshold: self.fuzzy_threshold,
        }
    }

    pub fn max_level(&self) -> Level {
        Level::from_str(&self.log_level).unwrap_or(Level::INFO)
    }
}
