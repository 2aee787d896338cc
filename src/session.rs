//! Editing session: the store, its search index, which page is selected, and
//! whether a load or save is in flight.

use chrono::NaiveDate;
use tracing::debug;

use crate::config::EditorConfig;
use crate::editor_core::{BodyBuffer, Selection};
use crate::error::{EditorError, EditorResult, SyncOp};
use crate::search::{SearchIndex, SearchOptions};
use crate::sitemap::{Document, FieldUpdate, PageRecord, SitemapStore};

#[derive(Clone, Debug)]
pub struct Session {
    store: SitemapStore,
    index: SearchIndex,
    options: SearchOptions,
    selected: Option<String>,
    busy: Option<SyncOp>,
}

impl Session {
    pub fn new(suffix: impl Into<String>, options: SearchOptions) -> Self {
        let store = SitemapStore::new(suffix);
        let index = SearchIndex::build(store.document(), options);
        Self {
            store,
            index,
            options,
            selected: None,
            busy: None,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.page_suffix.clone(), config.search_options())
    }

    pub fn store(&self) -> &SitemapStore {
        &self.store
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Page behind the selection; `None` renders an empty editing pane.
    pub fn selected_page(&self) -> Option<&PageRecord> {
        self.selected
            .as_deref()
            .and_then(|path| self.store.get_page(path))
    }

    pub fn busy(&self) -> Option<SyncOp> {
        self.busy
    }

    pub fn select(&mut self, path: &str) {
        if !self.store.contains(path) {
            debug!(path, "selected path is not in the sitemap");
        }
        self.selected = Some(path.to_string());
    }

    /// Applies `update` to the selected page. Returns whether anything changed;
    /// a missing selection or page is a no-op.
    pub fn edit(&mut self, update: FieldUpdate) -> bool {
        let Some(path) = self.selected.clone() else {
            debug!(field = update.field_name(), "edit without a selected page");
            return false;
        };
        self.edit_page(&path, update)
    }

    pub fn edit_page(&mut self, path: &str, update: FieldUpdate) -> bool {
        match self.store.update_field(path, update) {
            Ok(()) => {
                self.reindex();
                true
            }
            Err(err) => {
                debug!(error = %err, "edit ignored");
                false
            }
        }
    }

    /// Puts `snippet` into the selected page body at `caret` (or at the end)
    /// and returns where the caret lands.
    pub fn insert_into_body(&mut self, snippet: &str, caret: Option<Selection>) -> Option<Selection> {
        let page = self.selected_page()?;
        let mut buffer = BodyBuffer::new(page.md.clone());
        if let Some(caret) = caret {
            buffer.set_selection(caret);
        }
        let next = buffer.insert_snippet(snippet);
        self.edit(FieldUpdate::Md(buffer.text));
        Some(next)
    }

    pub fn create_page(&mut self, raw: &str, today: NaiveDate) -> EditorResult<String> {
        let path = self.store.create_page(raw, today)?;
        self.reindex();
        Ok(path)
    }

    /// Deletes `path` once `confirm` agrees. `Ok(None)` means the caller
    /// declined. A deleted selection moves to the first remaining page.
    pub fn delete_page(
        &mut self,
        path: &str,
        confirm: impl FnOnce(&PageRecord) -> bool,
    ) -> EditorResult<Option<PageRecord>> {
        let page = self.store.get_page(path).ok_or_else(|| EditorError::NotFound {
            path: path.to_string(),
        })?;
        if !confirm(page) {
            debug!(path, "deletion declined");
            return Ok(None);
        }

        let removed = self.store.delete_page(path)?;
        if self.selected.as_deref() == Some(path) {
            self.selected = self.store.first_path().map(str::to_string);
        }
        self.reindex();
        Ok(Some(removed))
    }

    /// Claims the busy flag for `op`.
    pub fn begin_sync(&mut self, op: SyncOp) -> EditorResult<()> {
        if let Some(current) = self.busy {
            return Err(EditorError::Busy(current));
        }
        self.busy = Some(op);
        Ok(())
    }

    /// Ends a load. On success the document is replaced and the selection is
    /// kept when it still exists; on failure the current document stays.
    pub fn finish_load(&mut self, result: EditorResult<Document>) -> EditorResult<usize> {
        self.busy = None;
        let doc = result?;
        let pages = doc.len();
        self.store.load(doc);
        let keep = self
            .selected
            .as_deref()
            .is_some_and(|path| self.store.contains(path));
        if !keep {
            self.selected = self.store.first_path().map(str::to_string);
        }
        self.reindex();
        Ok(pages)
    }

    pub fn finish_save(&mut self, result: EditorResult<()>) -> EditorResult<()> {
        self.busy = None;
        result
    }

    fn reindex(&mut self) {
        self.index = SearchIndex::build(self.store.document(), self.options);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkError;
    use crate::sitemap::parse_document;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 30).unwrap()
    }

    fn session() -> Session {
        let mut session = Session::new(".html", SearchOptions::default());
        let doc = parse_document(
            r#"{
                "a.html": {"title": "A", "md": "x", "links": []},
                "b.html": {"title": "B", "md": "y", "links": []},
                "c.html": {"title": "C", "md": "z", "links": []}
            }"#,
        )
        .unwrap();
        session.begin_sync(SyncOp::Load).unwrap();
        session.finish_load(Ok(doc)).unwrap();
        session
    }

    #[test]
    fn load_selects_first_page() {
        let session = session();
        assert_eq!(session.selected(), Some("a.html"));
        assert_eq!(session.busy(), None);
    }

    #[test]
    fn selecting_absent_path_gives_empty_pane() {
        let mut session = session();
        session.select("missing.html");
        assert_eq!(session.selected(), Some("missing.html"));
        assert!(session.selected_page().is_none());
        assert!(!session.edit(FieldUpdate::Title("ignored".into())));
        assert_eq!(session.store().len(), 3);
    }

    #[test]
    fn edits_reach_store_and_index() {
        let mut session = session();
        session.select("b.html");
        assert!(session.edit(FieldUpdate::Title("Bravo".into())));
        assert_eq!(session.store().get_page("b.html").unwrap().title, "Bravo");
        assert!(!session.index().has_no_match("bravo"));
    }

    #[test]
    fn created_pages_are_searchable() {
        let mut session = session();
        let path = session.create_page("hello-world", day()).unwrap();
        assert_eq!(path, "hello-world.html");
        assert_eq!(session.index().query("hello")[0].path, "hello-world.html");
    }

    #[test]
    fn declined_delete_changes_nothing() {
        let mut session = session();
        assert_eq!(session.delete_page("b.html", |_| false), Ok(None));
        assert_eq!(session.store().len(), 3);
    }

    #[test]
    fn deleting_selection_moves_it() {
        let mut session = session();
        session.select("a.html");
        let removed = session.delete_page("a.html", |page| page.title == "A").unwrap();
        assert_eq!(removed.map(|p| p.md), Some("x".to_string()));
        assert_eq!(session.store().len(), 2);
        assert_eq!(session.selected(), Some("b.html"));
        assert!(session.index().has_no_match("a.html"));
    }

    #[test]
    fn deleting_last_page_clears_selection() {
        let mut session = Session::new(".html", SearchOptions::default());
        session.create_page("only", day()).unwrap();
        session.select("only.html");
        session.delete_page("only.html", |_| true).unwrap();
        assert_eq!(session.selected(), None);
        assert!(session.store().is_empty());
    }

    #[test]
    fn deleting_other_page_keeps_selection() {
        let mut session = session();
        session.select("c.html");
        session.delete_page("a.html", |_| true).unwrap();
        assert_eq!(session.selected(), Some("c.html"));
    }

    #[test]
    fn busy_flag_blocks_second_sync() {
        let mut session = session();
        session.begin_sync(SyncOp::Save).unwrap();
        assert_eq!(
            session.begin_sync(SyncOp::Save),
            Err(EditorError::Busy(SyncOp::Save))
        );
        assert_eq!(
            session.begin_sync(SyncOp::Load),
            Err(EditorError::Busy(SyncOp::Save))
        );
        session.finish_save(Ok(())).unwrap();
        assert!(session.begin_sync(SyncOp::Load).is_ok());
    }

    #[test]
    fn failed_load_keeps_document() {
        let mut session = session();
        session.select("c.html");
        session.begin_sync(SyncOp::Load).unwrap();
        let err = session
            .finish_load(Err(EditorError::Load(NetworkError::Transport("offline".into()))))
            .unwrap_err();
        assert!(matches!(err, EditorError::Load(_)));
        assert_eq!(session.store().len(), 3);
        assert_eq!(session.selected(), Some("c.html"));
        assert_eq!(session.busy(), None);
    }

    #[test]
    fn reload_keeps_surviving_selection() {
        let mut session = session();
        session.select("c.html");
        let doc = session.store().document().clone();
        session.begin_sync(SyncOp::Load).unwrap();
        session.finish_load(Ok(doc)).unwrap();
        assert_eq!(session.selected(), Some("c.html"));
    }

    #[test]
    fn inserts_link_into_selected_body() {
        let mut session = session();
        session.select("b.html");
        let caret = session.insert_into_body("[A](/a)", Some(Selection::cursor(0)));
        assert_eq!(session.store().get_page("b.html").unwrap().md, "[A](/a)y");
        assert_eq!(caret, Some(Selection::cursor(7)));

        let caret = session.insert_into_body("[C](/c)", None);
        assert_eq!(session.store().get_page("b.html").unwrap().md, "[A](/a)y\n[C](/c)");
        assert_eq!(caret, Some(Selection::cursor(16)));
    }
}
