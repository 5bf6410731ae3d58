//! Resource fetching: content-type probe, raw download, HTML rendering
//!
//! Downloads land in unique temporary files inside the archive directory so
//! the final rename is atomic and concurrent runs never share a path.

use crate::error::{FetchError, ReferenceError, Stage};
use crate::render::PageRenderer;
use crate::resource::{ResourceKind, Strategy};
use reqwest::header::CONTENT_TYPE;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Result of the content-type probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Supported(ResourceKind),
    Unsupported { content_type: String },
}

/// A downloaded resource waiting to be hashed and renamed
#[derive(Debug)]
pub struct Fetched {
    pub file: NamedTempFile,
    /// Extension of the archived file, without the dot
    pub extension: &'static str,
    /// Whether an HTML page was rendered to PDF
    pub rendered: bool,
}

/// Fetches resources over HTTP, rendering HTML pages with `P`
pub struct Fetcher<P> {
    client: reqwest::Client,
    renderer: P,
    timeout: Duration,
}

impl<P: PageRenderer> Fetcher<P> {
    pub fn new(renderer: P, timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            renderer,
            timeout,
        })
    }

    pub fn into_renderer(self) -> P {
        self.renderer
    }

    /// Ask the server what `url` is. The body is never read.
    pub async fn probe(&self, url: &str) -> Result<Probe, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(FetchError::MissingContentType)?
            .to_string();

        debug!(url, content_type = %content_type, "probed");

        Ok(match ResourceKind::from_content_type(&content_type) {
            Some(kind) => Probe::Supported(kind),
            None => Probe::Unsupported { content_type },
        })
    }

    /// Stream the body of `url` into `dest`
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| FetchError::io(dest, e))?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::io(dest, e))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| FetchError::io(dest, e))?;

        Ok(written)
    }

    /// Fetch `url` as `kind` into a temporary file in `dir`
    pub async fn fetch(
        &self,
        url: &str,
        kind: ResourceKind,
        dir: &Path,
    ) -> Result<Fetched, ReferenceError> {
        if kind.strategy() == Strategy::RenderWithFallback {
            let file = temp_file(dir, "pdf").map_err(|e| ReferenceError::new(Stage::Download, e))?;
            match self.renderer.render_pdf(url, file.path(), self.timeout).await {
                Ok(()) => {
                    return Ok(Fetched {
                        file,
                        extension: "pdf",
                        rendered: true,
                    })
                }
                Err(FetchError::RenderDisabled) => {}
                Err(e) => warn!(url, error = %e, "render failed, downloading page as-is"),
            }
        }

        let extension = kind.extension();
        let file = temp_file(dir, extension).map_err(|e| ReferenceError::new(Stage::Download, e))?;
        self.download(url, file.path())
            .await
            .map_err(|e| ReferenceError::new(Stage::Download, e))?;

        Ok(Fetched {
            file,
            extension,
            rendered: false,
        })
    }
}

fn temp_file(dir: &Path, extension: &str) -> Result<NamedTempFile, FetchError> {
    tempfile::Builder::new()
        .prefix(".tmp-")
        .suffix(&format!(".{}", extension))
        .tempfile_in(dir)
        .map_err(|e| FetchError::io(dir, e))
}
