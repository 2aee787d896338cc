//! Loading and saving the whole sitemap against the editor server.
//!
//! `GET /api/sitemap` returns the document, `POST /api/sitemap` replaces it
//! (the server regenerates the site afterwards), `GET /api/status` reports
//! on the server's copy. There is no per-page endpoint.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{error, info, warn};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use crate::error::{EditorError, EditorResult, NetworkError};
use crate::sitemap::{self, Document};

const SITEMAP_ROUTE: &str = "/api/sitemap";
const STATUS_ROUTE: &str = "/api/status";

/// What the server knows about its own copy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ServerStatus {
    pub sitemap_exists: bool,
    #[serde(default)]
    pub sitemap_path: String,
    #[serde(default)]
    pub sitemap_size: u64,
    #[serde(default)]
    pub static_dir_exists: bool,
    #[serde(default)]
    pub static_dir_path: String,
}

/// Transport for the sitemap endpoints.
#[allow(async_fn_in_trait)]
pub trait SitemapGateway {
    async fn fetch_document(&self) -> Result<Document, NetworkError>;
    async fn persist_document(&self, doc: &Document) -> Result<(), NetworkError>;
    async fn fetch_status(&self) -> Result<ServerStatus, NetworkError>;
}

/// Fetches the document, mapping failures to [`EditorError::Load`].
pub async fn load_document<G: SitemapGateway>(gateway: &G) -> EditorResult<Document> {
    match gateway.fetch_document().await {
        Ok(doc) => {
            info!(pages = doc.len(), "sitemap fetched");
            Ok(doc)
        }
        Err(err) => {
            error!(error = %err, "sitemap fetch failed");
            Err(EditorError::Load(err))
        }
    }
}

/// Checks and persists the whole document. Nothing is sent when the presence
/// checks fail.
pub async fn save_document<G: SitemapGateway>(gateway: &G, doc: &Document) -> EditorResult<()> {
    if let Err(err) = sitemap::validate_for_save(doc) {
        warn!(error = %err, "save refused");
        return Err(err);
    }
    match gateway.persist_document(doc).await {
        Ok(()) => {
            info!(pages = doc.len(), "sitemap saved");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "sitemap save failed");
            Err(EditorError::Save(err))
        }
    }
}

/// Browser `fetch` implementation.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    api_base: String,
}

impl HttpGateway {
    pub fn new(api_base: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.api_base, route)
    }

    async fn send(&self, method: &str, route: &str, body: Option<String>) -> Result<Response, NetworkError> {
        let window = web_sys::window().ok_or_else(|| NetworkError::Transport("no browser window".into()))?;

        let init = RequestInit::new();
        init.set_method(method);
        init.set_mode(RequestMode::Cors);
        if let Some(body) = &body {
            init.set_body(&JsValue::from_str(body));
        }

        let url = self.url(route);
        let request = Request::new_with_str_and_init(&url, &init)
            .map_err(|e| NetworkError::Transport(describe_js(&e)))?;
        let headers = request.headers();
        headers
            .set("Accept", "application/json")
            .map_err(|e| NetworkError::Transport(describe_js(&e)))?;
        if body.is_some() {
            headers
                .set("Content-Type", "application/json")
                .map_err(|e| NetworkError::Transport(describe_js(&e)))?;
        }

        let value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| NetworkError::Transport(describe_js(&e)))?;
        let response: Response = value
            .dyn_into()
            .map_err(|_| NetworkError::Malformed("fetch did not yield a Response".into()))?;

        if !response.ok() {
            return Err(NetworkError::Status {
                status: response.status(),
                status_text: response.status_text(),
            });
        }
        Ok(response)
    }

    async fn text(response: Response) -> Result<String, NetworkError> {
        let promise = response
            .text()
            .map_err(|e| NetworkError::Malformed(describe_js(&e)))?;
        let value = JsFuture::from(promise)
            .await
            .map_err(|e| NetworkError::Malformed(describe_js(&e)))?;
        value
            .as_string()
            .ok_or_else(|| NetworkError::Malformed("response body is not text".into()))
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, NetworkError> {
        let promise = response
            .json()
            .map_err(|e| NetworkError::Malformed(describe_js(&e)))?;
        let value = JsFuture::from(promise)
            .await
            .map_err(|e| NetworkError::Malformed(describe_js(&e)))?;
        serde_wasm_bindgen::from_value(value).map_err(|e| NetworkError::Malformed(e.to_string()))
    }
}

impl SitemapGateway for HttpGateway {
    async fn fetch_document(&self) -> Result<Document, NetworkError> {
        let response = self.send("GET", SITEMAP_ROUTE, None).await?;
        // Parsed from text: a JS object round trip loses key order and
        // integer-ness in unknown fields.
        let body = Self::text(response).await?;
        sitemap::parse_document(&body).map_err(|e| NetworkError::Malformed(e.to_string()))
    }

    async fn persist_document(&self, doc: &Document) -> Result<(), NetworkError> {
        let body = sitemap::document_to_json(doc).map_err(|e| NetworkError::Encode(e.to_string()))?;
        self.send("POST", SITEMAP_ROUTE, Some(body)).await?;
        Ok(())
    }

    async fn fetch_status(&self) -> Result<ServerStatus, NetworkError> {
        let response = self.send("GET", STATUS_ROUTE, None).await?;
        Self::json(response).await
    }
}

fn describe_js(value: &JsValue) -> String {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use futures::executor::block_on;

    use super::*;
    use crate::error::SyncOp;
    use crate::search::SearchOptions;
    use crate::session::Session;
    use crate::sitemap::{parse_document, FieldUpdate};

    #[derive(Default)]
    struct MemoryGateway {
        served: Option<Document>,
        fail: Option<NetworkError>,
        saved: RefCell<Vec<Document>>,
    }

    impl SitemapGateway for MemoryGateway {
        async fn fetch_document(&self) -> Result<Document, NetworkError> {
            if let Some(err) = &self.fail {
                return Err(err.clone());
            }
            self.served
                .clone()
                .ok_or_else(|| NetworkError::Status {
                    status: 404,
                    status_text: "Not Found".into(),
                })
        }

        async fn persist_document(&self, doc: &Document) -> Result<(), NetworkError> {
            if let Some(err) = &self.fail {
                return Err(err.clone());
            }
            self.saved.borrow_mut().push(doc.clone());
            Ok(())
        }

        async fn fetch_status(&self) -> Result<ServerStatus, NetworkError> {
            Ok(ServerStatus {
                sitemap_exists: self.served.is_some(),
                sitemap_size: self.served.as_ref().map_or(0, |d| d.len() as u64),
                ..ServerStatus::default()
            })
        }
    }

    fn sample() -> Document {
        parse_document(r#"{"a.html": {"title": "A", "md": "x", "links": []}}"#).unwrap()
    }

    #[test]
    fn loads_into_session() {
        let gateway = MemoryGateway {
            served: Some(sample()),
            ..MemoryGateway::default()
        };
        let mut session = Session::new(".html", SearchOptions::default());
        session.begin_sync(SyncOp::Load).unwrap();
        let pages = session.finish_load(block_on(load_document(&gateway))).unwrap();
        assert_eq!(pages, 1);
        assert_eq!(session.store().document(), &sample());
    }

    #[test]
    fn non_success_status_is_a_load_error() {
        let gateway = MemoryGateway::default();
        assert!(matches!(
            block_on(load_document(&gateway)),
            Err(EditorError::Load(NetworkError::Status { status: 404, .. }))
        ));
    }

    #[test]
    fn failed_save_keeps_edits() {
        let gateway = MemoryGateway {
            served: Some(sample()),
            fail: Some(NetworkError::Transport("connection refused".into())),
            ..MemoryGateway::default()
        };
        let mut session = Session::new(".html", SearchOptions::default());
        session.begin_sync(SyncOp::Load).unwrap();
        session.finish_load(Ok(sample())).unwrap();
        session.edit(FieldUpdate::Md("edited".into()));

        session.begin_sync(SyncOp::Save).unwrap();
        let doc = session.store().document().clone();
        let result = session.finish_save(block_on(save_document(&gateway, &doc)));

        assert!(matches!(result, Err(EditorError::Save(NetworkError::Transport(_)))));
        assert_eq!(session.store().get_page("a.html").unwrap().md, "edited");
        assert_eq!(session.busy(), None);
    }

    #[test]
    fn saves_whole_document() {
        let gateway = MemoryGateway::default();
        let mut doc = sample();
        doc.insert(
            "b.html".into(),
            parse_document(r#"{"b.html": {"title": "B", "md": ""}}"#).unwrap()["b.html"].clone(),
        );
        block_on(save_document(&gateway, &doc)).unwrap();
        assert_eq!(gateway.saved.borrow().as_slice(), &[doc]);
    }

    #[test]
    fn invalid_document_is_not_sent() {
        let gateway = MemoryGateway::default();
        let mut doc = sample();
        doc.insert(String::new(), doc["a.html"].clone());
        assert!(matches!(
            block_on(save_document(&gateway, &doc)),
            Err(EditorError::Validation(_))
        ));
        assert!(gateway.saved.borrow().is_empty());
    }

    #[test]
    fn blank_title_is_still_saved() {
        let gateway = MemoryGateway::default();
        let doc = parse_document(r#"{"a.html": {"title": "", "md": "x"}}"#).unwrap();
        block_on(save_document(&gateway, &doc)).unwrap();
        assert_eq!(gateway.saved.borrow().len(), 1);
    }

    #[test]
    fn decodes_server_status() {
        let status: ServerStatus = serde_json::from_str(
            r#"{
                "sitemap_exists": true,
                "sitemap_path": "/srv/site/sitemap.json",
                "sitemap_size": 48213,
                "static_dir_exists": false,
                "static_dir_path": "/srv/site/static"
            }"#,
        )
        .unwrap();
        assert_eq!(
            status,
            ServerStatus {
                sitemap_exists: true,
                sitemap_path: "/srv/site/sitemap.json".into(),
                sitemap_size: 48213,
                static_dir_exists: false,
                static_dir_path: "/srv/site/static".into(),
            }
        );

        let sparse: ServerStatus = serde_json::from_str(r#"{"sitemap_exists": false}"#).unwrap();
        assert_eq!(sparse, ServerStatus::default());
    }

    #[test]
    fn gateway_trims_base_url() {
        let gateway = HttpGateway::new("http://localhost:8000/");
        assert_eq!(gateway.url(SITEMAP_ROUTE), "http://localhost:8000/api/sitemap");
    }
}
