//! cite command: Generate APA citations for archived PDFs
//!
//! Reads the first page of every archived PDF a post references, asks a
//! completion API for an APA citation and stores it in the shortcode's
//! `citation` attribute. References that already carry a citation are left
//! alone and cost no API call.

use crate::config::list_posts;
use crate::error::{CiteError, CompletionError};
use crate::pdf::{extract_doi, PdfExtractor, TextExtractor};
use crate::report::{self, truncate, OutputFormat};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Args)]
pub struct CiteArgs {
    /// Directory containing the Markdown posts
    #[arg(long, default_value = "content/posts", env = "HUGO_ARCHIVE_POSTS_DIR")]
    pub posts_dir: PathBuf,

    /// Hugo static directory the reference paths resolve against
    #[arg(long, default_value = "static", env = "HUGO_ARCHIVE_STATIC_DIR")]
    pub static_dir: PathBuf,

    /// Completion model
    #[arg(long, default_value = "gpt-3.5-turbo-instruct")]
    pub model: String,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, default_value = "https://api.openai.com/v1")]
    pub api_base: String,

    /// API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Sampling temperature
    #[arg(long, default_value = "0.9")]
    pub temperature: f32,

    /// Max characters of first-page text sent to the model
    #[arg(long, default_value = "4000")]
    pub max_chars: usize,

    /// Timeout per API request in milliseconds
    #[arg(long, default_value = "60000")]
    pub timeout: u64,

    /// List references that need a citation without calling the API
    #[arg(long)]
    pub dry_run: bool,

    /// Report format
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

/// Configuration for citing
#[derive(Debug, Clone)]
pub struct CiteConfig {
    pub posts_dir: PathBuf,
    pub static_dir: PathBuf,
    pub max_chars: usize,
}

/// What happened to one PDF reference
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum CiteOutcome {
    Cited { citation: String },
    /// Shortcode already had a citation
    Present,
    /// Archived file not found under the static directory
    Missing { path: String },
    Failed { error: String },
    /// Dry run: would be cited
    Pending,
}

#[derive(Debug, Clone, Serialize)]
pub struct CiteResult {
    pub document: String,
    pub reference: String,
    #[serde(flatten)]
    pub outcome: CiteOutcome,
}

#[derive(Debug, Default, Serialize)]
pub struct CiteReport {
    pub documents: usize,
    pub rewritten: usize,
    pub cited: usize,
    pub present: usize,
    pub missing: usize,
    pub failed: usize,
    pub timestamp: String,
    pub results: Vec<CiteResult>,
}

impl CiteReport {
    fn record(&mut self, result: CiteResult) {
        match result.outcome {
            CiteOutcome::Cited { .. } => self.cited += 1,
            CiteOutcome::Present => self.present += 1,
            CiteOutcome::Missing { .. } => self.missing += 1,
            CiteOutcome::Failed { .. } => self.failed += 1,
            CiteOutcome::Pending => {}
        }
        self.results.push(result);
    }
}

/// Text completion backend
#[allow(async_fn_in_trait)]
pub trait CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// OpenAI-compatible `/completions` endpoint
pub struct OpenAiClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    text: String,
}

impl OpenAiClient {
    pub fn new(
        api_base: &str,
        api_key: &str,
        model: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .user_agent(crate::config::DEFAULT_USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature,
        })
    }
}

impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            temperature: self.temperature,
            max_tokens: 256,
        };

        let response = self
            .client
            .post(format!("{}/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: CompletionResponse = response.json().await?;
        body.choices
            .into_iter()
            .map(|c| c.text)
            .find(|t| !t.trim().is_empty())
            .ok_or(CompletionError::Empty)
    }
}

/// Run the cite command
pub async fn run_cite(args: CiteArgs) -> Result<()> {
    let config = CiteConfig {
        posts_dir: args.posts_dir.clone(),
        static_dir: args.static_dir.clone(),
        max_chars: args.max_chars,
    };

    let api_key = match (&args.api_key, args.dry_run) {
        (Some(key), _) => key.clone(),
        (None, true) => String::new(),
        (None, false) => anyhow::bail!("No API key: pass --api-key or set OPENAI_API_KEY"),
    };

    let client = OpenAiClient::new(
        &args.api_base,
        &api_key,
        &args.model,
        args.temperature,
        Duration::from_millis(args.timeout),
    )
    .context("Failed to build HTTP client")?;

    let report = Citer::new(config, client).run(args.dry_run).await?;

    println!("{}", report::render(&report, args.format)?);

    eprintln!(
        "Done: {} cited, {} already present, {} missing, {} failed",
        report.cited, report.present, report.missing, report.failed
    );

    Ok(())
}

/// Adds citations to the posts of one site
pub struct Citer<C, X = PdfExtractor> {
    config: CiteConfig,
    client: C,
    extractor: X,
}

impl<C: CompletionClient> Citer<C> {
    pub fn new(config: CiteConfig, client: C) -> Self {
        Self::with_extractor(config, client, PdfExtractor)
    }
}

impl<C: CompletionClient, X: TextExtractor> Citer<C, X> {
    pub fn with_extractor(config: CiteConfig, client: C, extractor: X) -> Self {
        Self {
            config,
            client,
            extractor,
        }
    }

    pub async fn run(&self, dry_run: bool) -> Result<CiteReport> {
        let posts = list_posts(&self.config.posts_dir).with_context(|| {
            format!("Failed to list posts in {}", self.config.posts_dir.display())
        })?;

        eprintln!(
            "Citing PDFs referenced from {} post{}...",
            posts.len(),
            if posts.len() == 1 { "" } else { "s" }
        );

        let mut report = CiteReport {
            documents: posts.len(),
            timestamp: Utc::now().to_rfc3339(),
            ..Default::default()
        };

        for post in &posts {
            let (changed, results) = self.cite_document(post, dry_run).await?;
            if changed {
                report.rewritten += 1;
            }
            for result in results {
                report.record(result);
            }
        }

        Ok(report)
    }

    /// Cite the PDF references of one post, writing it back if it changed
    pub async fn cite_document(&self, path: &Path, dry_run: bool) -> Result<(bool, Vec<CiteResult>)> {
        let original = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let document = path.display().to_string();
        let mut content = original.clone();
        let mut results = Vec::new();
        let mut seen = HashSet::new();

        for reference in pdf_references(&original) {
            if !seen.insert(reference.clone()) {
                continue;
            }
            let outcome = self.cite_reference(&mut content, &reference, dry_run).await;
            results.push(CiteResult {
                document: document.clone(),
                reference,
                outcome,
            });
        }

        let changed = content != original;
        if changed {
            tokio::fs::write(path, &content)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        Ok((changed, results))
    }

    async fn cite_reference(&self, content: &mut String, reference: &str, dry_run: bool) -> CiteOutcome {
        if existing_citation(content, reference).is_some() {
            info!(reference, "citation already present");
            return CiteOutcome::Present;
        }

        let local = local_path(&self.config.static_dir, reference);
        if !local.is_file() {
            warn!(path = %local.display(), "archived file not found");
            return CiteOutcome::Missing {
                path: local.display().to_string(),
            };
        }

        if dry_run {
            return CiteOutcome::Pending;
        }

        eprintln!("  -> {}", truncate(reference, 60));

        match self.try_cite(content, reference, &local).await {
            Ok(citation) => {
                info!(reference, citation = %citation, "citation added");
                CiteOutcome::Cited { citation }
            }
            Err(e) => {
                warn!(reference, error = %e, "skipping reference");
                CiteOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn try_cite(
        &self,
        content: &mut String,
        reference: &str,
        local: &Path,
    ) -> Result<String, CiteError> {
        let first_page = self
            .extractor
            .first_page_text(local, self.config.max_chars)
            .await?;

        let reply = self.client.complete(&citation_prompt(&first_page)).await?;
        let citation = clean_citation(&reply);
        if citation.is_empty() {
            return Err(CiteError::EmptyCitation);
        }

        let updated = set_citation(content, reference, &citation);
        if updated == *content {
            return Err(CiteError::Unwritten(reference.to_string()));
        }
        *content = updated;
        Ok(citation)
    }
}

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)\{\{<\s*reference\s+content="([^"]+)""#).unwrap())
}

/// One `name="value"` shortcode attribute
fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\s+([A-Za-z_][\w-]*)="([^"]*)""#).unwrap())
}

/// Site-local references whose path ends in `.pdf`
pub fn pdf_references(content: &str) -> Vec<String> {
    reference_re()
        .captures_iter(content)
        .map(|cap| cap[1].to_string())
        .filter(|r| r.starts_with('/'))
        .filter(|r| Path::new(r).extension().is_some_and(|ext| ext.eq_ignore_ascii_case("pdf")))
        .collect()
}

/// File a site path resolves to under the static directory
pub fn local_path(static_dir: &Path, reference: &str) -> PathBuf {
    static_dir.join(reference.trim_start_matches('/'))
}

/// Whole `reference` shortcodes for one path; group 1 holds the attributes after `content`
fn shortcode_re(reference: &str) -> Regex {
    let pattern = format!(
        r#"\{{\{{<\s*(?i:reference)\s+(?i:content)="{}"((?:\s+[A-Za-z_][\w-]*="[^"]*")*)\s*/?>\}}\}}"#,
        regex::escape(reference)
    );
    // the reference is escaped, so the pattern is always valid
    Regex::new(&pattern).unwrap()
}

/// Value of the `citation` attribute in an attribute list
fn citation_attr(attrs: &str) -> Option<&str> {
    attr_re()
        .captures_iter(attrs)
        .find(|c| c[1].eq_ignore_ascii_case("citation"))
        .and_then(|c| c.get(2))
        .map(|m| m.as_str())
}

fn has_citation(attrs: &str) -> bool {
    citation_attr(attrs).is_some_and(|c| !c.trim().is_empty())
}

/// Attribute list with `citation` set, replacing an empty one or appending it
fn with_citation(attrs: &str, citation: &str) -> String {
    let mut found = false;
    let mut out = attr_re()
        .replace_all(attrs, |c: &Captures| {
            if c[1].eq_ignore_ascii_case("citation") {
                found = true;
                format!(r#" citation="{}""#, citation)
            } else {
                c[0].to_string()
            }
        })
        .into_owned();
    if !found {
        out.push_str(&format!(r#" citation="{}""#, citation));
    }
    out
}

/// Non-empty citation already attached to `reference`, if any
pub fn existing_citation(content: &str, reference: &str) -> Option<String> {
    shortcode_re(reference)
        .captures_iter(content)
        .filter_map(|cap| citation_attr(&cap[1]).map(str::to_string))
        .find(|c| !c.trim().is_empty())
}

/// Put `citation` on every shortcode for `reference` that lacks one
pub fn set_citation(content: &str, reference: &str, citation: &str) -> String {
    shortcode_re(reference)
        .replace_all(content, |cap: &Captures| match (cap.get(0), cap.get(1)) {
            (Some(all), Some(attrs)) if !has_citation(attrs.as_str()) => {
                let whole = all.as_str();
                let head = &whole[..attrs.start() - all.start()];
                let tail = &whole[attrs.end() - all.start()..];
                format!("{}{}{}", head, with_citation(attrs.as_str(), citation), tail)
            }
            _ => cap[0].to_string(),
        })
        .into_owned()
}

/// Prompt asking for an APA citation of a document's first page
pub fn citation_prompt(first_page: &str) -> String {
    let doi_hint = extract_doi(first_page)
        .map(|doi| format!("The document's DOI is {}.\n", doi))
        .unwrap_or_default();
    format!(
        "Write an APA citation based on the first page of this document.\n\
         If it is difficult to read the document, check if the document\n\
         title is very familiar to your training data and whether you\n\
         already know the authors, publish date, etc.\n\
         {}\n\
         {}\n",
        doi_hint, first_page
    )
}

/// Single line, no surrounding whitespace, no double quotes
pub fn clean_citation(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('"', "'")
}
