//! Error types for the editor core and the sync gateway.

use std::fmt;

/// Failures talking to the sitemap server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// The request never produced a response (offline, CORS, DNS...)
    #[error("request failed: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status
    #[error("server responded {status} {status_text}")]
    Status { status: u16, status_text: String },

    /// The response body could not be decoded
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The request body could not be encoded
    #[error("could not encode request: {0}")]
    Encode(String),
}

/// Which sync operation holds the busy flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOp {
    Load,
    Save,
}

impl fmt::Display for SyncOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOp::Load => f.write_str("load"),
            SyncOp::Save => f.write_str("save"),
        }
    }
}

/// Editor operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditorError {
    /// Initial or manual fetch failed; the previous document is kept
    #[error("could not load the sitemap: {0}")]
    Load(#[source] NetworkError),

    /// Persist failed; in-memory edits are kept
    #[error("could not save the sitemap: {0}")]
    Save(#[source] NetworkError),

    /// Document failed the pre-save presence checks
    #[error("sitemap is not valid: {0}")]
    Validation(String),

    /// Page creation rejected
    #[error("a page already exists at {path}")]
    DuplicatePage { path: String },

    /// Path is empty after normalization
    #[error("'{raw}' is not a usable page path")]
    InvalidPath { raw: String },

    /// Operation on a path that is not in the document
    #[error("no page at {path}")]
    NotFound { path: String },

    /// Another load or save is still in flight
    #[error("a {0} is already in progress")]
    Busy(SyncOp),
}

/// Result type alias for editor operations
pub type EditorResult<T> = Result<T, EditorError>;
