//! Per-reference error types
//!
//! A failing reference never aborts a run: the error is recorded in the
//! report together with the stage it happened in, and the URL stays remote.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while fetching, converting or storing a single resource.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server answered {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("no usable content-type header")]
    MissingContentType,

    #[error("render failed: {0}")]
    Render(String),

    #[error("rendering disabled")]
    RenderDisabled,

    #[error("`{program}` exited with {status:?}: {stderr}")]
    Process {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not move download to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Pipeline step a reference was in when it was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Probe,
    Download,
    Hash,
    Rename,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Probe => write!(f, "probe"),
            Stage::Download => write!(f, "download"),
            Stage::Hash => write!(f, "hash"),
            Stage::Rename => write!(f, "rename"),
        }
    }
}

/// Failure of one reference, tagged with its stage
#[derive(Debug, Error)]
#[error("{stage}: {source}")]
pub struct ReferenceError {
    pub stage: Stage,
    #[source]
    pub source: FetchError,
}

impl ReferenceError {
    pub fn new(stage: Stage, source: FetchError) -> Self {
        Self { stage, source }
    }
}

/// Errors from the completion API used for citations
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("completion API returned no text")]
    Empty,
}

/// Failure to cite one archived PDF
#[derive(Debug, Error)]
pub enum CiteError {
    #[error("PDF text extraction failed: {0}")]
    Pdf(String),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("completion was empty after cleaning")]
    EmptyCitation,

    #[error("no rewritable shortcode for {0}")]
    Unwritten(String),
}
