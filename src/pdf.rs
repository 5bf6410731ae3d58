//! Local PDF text extraction for citations
//!
//! No external APIs: text comes from pdf-extract.

use crate::error::CiteError;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Source of the first-page text of an archived document
#[allow(async_fn_in_trait)]
pub trait TextExtractor {
    async fn first_page_text(&self, path: &Path, max_chars: usize) -> Result<String, CiteError>;
}

/// Reads PDFs with pdf-extract
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    async fn first_page_text(&self, path: &Path, max_chars: usize) -> Result<String, CiteError> {
        first_page_text(path, max_chars).await
    }
}

/// Text of the first page of a PDF, capped at `max_chars` characters.
///
/// Runs on the blocking pool; pdf-extract is synchronous and CPU bound.
pub async fn first_page_text(path: &Path, max_chars: usize) -> Result<String, CiteError> {
    let owned: PathBuf = path.to_path_buf();
    let text = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text(&owned).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| CiteError::Pdf(format!("{}: extraction aborted: {}", path.display(), e)))?
    .map_err(|e| CiteError::Pdf(format!("{}: {}", path.display(), e)))?;

    let page = first_page(&text, max_chars);
    if page.is_empty() {
        return Err(CiteError::Pdf(format!(
            "{} contains no extractable text",
            path.display()
        )));
    }
    Ok(page)
}

/// First form-feed separated page, whitespace-normalised per line
pub fn first_page(text: &str, max_chars: usize) -> String {
    let page = text
        .split('\u{c}')
        .find(|p| !p.trim().is_empty())
        .unwrap_or_default();

    let lines: Vec<&str> = page
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    let joined = lines.join("\n");

    if max_chars > 0 && joined.chars().count() > max_chars {
        joined.chars().take(max_chars).collect()
    } else {
        joined
    }
}

/// DOI mentioned in the text, if any
pub fn extract_doi(text: &str) -> Option<String> {
    let doi_re = Regex::new(r"(?i)(?:doi[:\s]+|https?://(?:dx\.)?doi\.org/)(10\.\d{4,}/[^\s\)]+)").ok()?;
    doi_re
        .captures(text)
        .map(|c| c[1].trim_end_matches(['.', ',', ';']).to_string())
}
