//! archive command: Archive linked resources and rewrite posts
//!
//! For every remote `reference`/`figure` shortcode URL in the posts:
//! probe the content type, download (or render HTML to PDF), hash, move the
//! file to `<archive dir>/<sha256>_<sanitized url>[.ext]` and point the post
//! at the local copy. A failing reference is skipped and stays remote.

use crate::browser::ChromeRenderer;
use crate::config::{list_posts, ArchiveConfig};
use crate::error::{FetchError, ReferenceError, Stage};
use crate::extract::{extract_shortcode_urls, is_archivable};
use crate::fetch::{Fetcher, Probe};
use crate::hash::sha256_file;
use crate::naming::archive_file_name;
use crate::process::SystemRunner;
use crate::render::{NoRenderer, PageRenderer, RendererKind, WkhtmltopdfRenderer};
use crate::report::{self, truncate, OutputFormat};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Args)]
pub struct ArchiveArgs {
    /// Directory containing the Markdown posts
    #[arg(long, default_value = "content/posts", env = "HUGO_ARCHIVE_POSTS_DIR")]
    pub posts_dir: PathBuf,

    /// Hugo static directory (archives are written below it)
    #[arg(long, default_value = "static", env = "HUGO_ARCHIVE_STATIC_DIR")]
    pub static_dir: PathBuf,

    /// Archive directory name under the static directory
    #[arg(long, default_value = "archives")]
    pub archive_subdir: String,

    /// Timeout per request and per render in milliseconds
    #[arg(long, default_value = "10000")]
    pub timeout: u64,

    /// How HTML pages are turned into PDFs
    #[arg(long, value_enum, default_value_t = RendererKind::Wkhtmltopdf)]
    pub renderer: RendererKind,

    /// wkhtmltopdf executable
    #[arg(long, default_value = "wkhtmltopdf")]
    pub wkhtmltopdf: String,

    /// List archivable references without fetching or writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Report format
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

impl ArchiveArgs {
    pub fn config(&self) -> ArchiveConfig {
        ArchiveConfig {
            posts_dir: self.posts_dir.clone(),
            static_dir: self.static_dir.clone(),
            archive_subdir: self.archive_subdir.clone(),
            timeout: Duration::from_millis(self.timeout),
            ..Default::default()
        }
    }
}

/// What happened to one reference
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    /// Fetched and stored; `path` is the site path now used by the post
    Archived {
        path: String,
        hash: String,
        extension: String,
        rendered: bool,
    },
    /// Already archived earlier in this run
    Reused { path: String },
    Unsupported { content_type: String },
    Failed { stage: Stage, error: String },
    /// Dry run: would be fetched
    Pending,
}

impl Outcome {
    /// Site path the reference now points at, if it was archived
    pub fn archive_path(&self) -> Option<&str> {
        match self {
            Outcome::Archived { path, .. } | Outcome::Reused { path } => Some(path),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceResult {
    pub document: String,
    pub url: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Report printed to stdout
#[derive(Debug, Default, Serialize)]
pub struct ArchiveReport {
    pub documents: usize,
    pub rewritten: usize,
    pub archived: usize,
    pub reused: usize,
    pub unsupported: usize,
    pub failed: usize,
    pub timestamp: String,
    pub results: Vec<ReferenceResult>,
}

impl ArchiveReport {
    fn record(&mut self, result: ReferenceResult) {
        match result.outcome {
            Outcome::Archived { .. } => self.archived += 1,
            Outcome::Reused { .. } => self.reused += 1,
            Outcome::Unsupported { .. } => self.unsupported += 1,
            Outcome::Failed { .. } => self.failed += 1,
            Outcome::Pending => {}
        }
        self.results.push(result);
    }
}

/// Run the archive command
pub async fn run_archive(args: ArchiveArgs) -> Result<()> {
    let config = args.config();

    let report = match args.renderer {
        // nothing is rendered in a dry run
        _ if args.dry_run => Archiver::new(config, NoRenderer)?.run(true).await?,
        RendererKind::Wkhtmltopdf => {
            let renderer = WkhtmltopdfRenderer::new(SystemRunner, args.wkhtmltopdf.clone());
            Archiver::new(config, renderer)?.run(false).await?
        }
        RendererKind::None => Archiver::new(config, NoRenderer)?.run(false).await?,
        RendererKind::Chrome => {
            let chrome = ChromeRenderer::launch().await?;
            let archiver = Archiver::new(config, chrome)?;
            let report = archiver.run(false).await;
            archiver.into_renderer().close().await?;
            report?
        }
    };

    println!("{}", report::render(&report, args.format)?);

    eprintln!(
        "Done: {} archived, {} unsupported, {} failed, {} posts rewritten",
        report.archived, report.unsupported, report.failed, report.rewritten
    );

    Ok(())
}

/// The archive pipeline for one site
pub struct Archiver<P> {
    config: ArchiveConfig,
    fetcher: Fetcher<P>,
}

impl<P: PageRenderer> Archiver<P> {
    pub fn new(config: ArchiveConfig, renderer: P) -> Result<Self> {
        let fetcher = Fetcher::new(renderer, config.timeout, &config.user_agent)
            .context("Failed to build HTTP client")?;
        Ok(Self { config, fetcher })
    }

    pub fn into_renderer(self) -> P {
        self.fetcher.into_renderer()
    }

    /// Process every post, one after another
    pub async fn run(&self, dry_run: bool) -> Result<ArchiveReport> {
        let posts = list_posts(&self.config.posts_dir).with_context(|| {
            format!("Failed to list posts in {}", self.config.posts_dir.display())
        })?;

        eprintln!(
            "Scanning {} post{} in {}...",
            posts.len(),
            if posts.len() == 1 { "" } else { "s" },
            self.config.posts_dir.display()
        );

        if !dry_run {
            let archive_dir = self.config.archive_dir();
            tokio::fs::create_dir_all(&archive_dir)
                .await
                .with_context(|| format!("Failed to create {}", archive_dir.display()))?;
        }

        let mut report = ArchiveReport {
            documents: posts.len(),
            timestamp: Utc::now().to_rfc3339(),
            ..Default::default()
        };
        let mut known = HashMap::new();

        for post in &posts {
            let results = if dry_run {
                self.plan_document(post).await?
            } else {
                let (changed, results) = self.archive_document(post, &mut known).await?;
                if changed {
                    report.rewritten += 1;
                }
                results
            };
            for result in results {
                report.record(result);
            }
        }

        Ok(report)
    }

    /// References of a post that a real run would fetch
    pub async fn plan_document(&self, path: &Path) -> Result<Vec<ReferenceResult>> {
        let content = read_post(path).await?;
        let prefix = self.config.url_prefix();
        let mut seen = HashSet::new();

        Ok(extract_shortcode_urls(&content)
            .into_iter()
            .filter(|url| is_archivable(url, &prefix) && seen.insert(url.clone()))
            .map(|url| ReferenceResult {
                document: path.display().to_string(),
                url,
                outcome: Outcome::Pending,
            })
            .collect())
    }

    /// Archive the references of one post and write it back if it changed.
    ///
    /// `known` maps already archived URLs to their site path across posts.
    pub async fn archive_document(
        &self,
        path: &Path,
        known: &mut HashMap<String, String>,
    ) -> Result<(bool, Vec<ReferenceResult>)> {
        let content = read_post(path).await?;
        let document = path.display().to_string();

        let (rewritten, results) = self.archive_text(&document, &content, known).await;
        let changed = rewritten != content;

        // written once, after every reference of the post was handled
        if changed {
            tokio::fs::write(path, &rewritten)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "post rewritten");
        }

        Ok((changed, results))
    }

    /// Archive the references in `content` and return the rewritten text
    pub async fn archive_text(
        &self,
        document: &str,
        content: &str,
        known: &mut HashMap<String, String>,
    ) -> (String, Vec<ReferenceResult>) {
        let prefix = self.config.url_prefix();
        let urls = extract_shortcode_urls(content);
        let mut targets = HashMap::new();
        let mut seen = HashSet::new();
        let mut results = Vec::new();

        for url in &urls {
            if !is_archivable(url, &prefix) || !seen.insert(url.clone()) {
                continue;
            }

            let outcome = match known.get(url) {
                Some(path) => Outcome::Reused { path: path.clone() },
                None => {
                    eprintln!("  -> {}", truncate(url, 60));
                    self.archive_reference(url).await
                }
            };

            if let Some(path) = outcome.archive_path() {
                known.insert(url.clone(), path.to_string());
                targets.insert(url.clone(), path.to_string());
            }

            results.push(ReferenceResult {
                document: document.to_string(),
                url: url.clone(),
                outcome,
            });
        }

        let text = rewrite_urls(content, &urls, &targets);
        for (url, path) in &targets {
            info!(url = %url, path = %path, "replaced url");
        }

        (text, results)
    }

    /// Fetch, hash and store one URL. Never fails: problems become outcomes.
    pub async fn archive_reference(&self, url: &str) -> Outcome {
        match self.try_archive(url).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(url, stage = %e.stage, error = %e.source, "skipping reference");
                Outcome::Failed {
                    stage: e.stage,
                    error: e.source.to_string(),
                }
            }
        }
    }

    async fn try_archive(&self, url: &str) -> Result<Outcome, ReferenceError> {
        let probe = self
            .fetcher
            .probe(url)
            .await
            .map_err(|e| ReferenceError::new(Stage::Probe, e))?;

        let kind = match probe {
            Probe::Supported(kind) => kind,
            Probe::Unsupported { content_type } => {
                warn!(url, content_type = %content_type, "unsupported content type, skipping");
                return Ok(Outcome::Unsupported { content_type });
            }
        };

        let archive_dir = self.config.archive_dir();
        let fetched = self.fetcher.fetch(url, kind, &archive_dir).await?;

        let hash = sha256_file(fetched.file.path()).map_err(|e| {
            ReferenceError::new(Stage::Hash, FetchError::io(fetched.file.path(), e))
        })?;

        let file_name = archive_file_name(&hash, url, fetched.extension);
        let dest = archive_dir.join(&file_name);
        fetched.file.persist(&dest).map_err(|e| {
            ReferenceError::new(
                Stage::Rename,
                FetchError::Persist {
                    path: dest.clone(),
                    source: e.error,
                },
            )
        })?;
        make_world_readable(&dest);

        info!(url, file = %file_name, "archived");

        Ok(Outcome::Archived {
            path: self.config.archive_url(&file_name),
            hash,
            extension: fetched.extension.to_string(),
            rendered: fetched.rendered,
        })
    }
}

/// Replace every occurrence of the archived URLs in one left-to-right pass.
///
/// At each position the longest listed URL wins, so a URL that is a prefix
/// of another never rewrites inside it. URLs without a target are copied
/// unchanged.
fn rewrite_urls(content: &str, urls: &[String], targets: &HashMap<String, String>) -> String {
    let mut ordered: Vec<&str> = urls
        .iter()
        .map(String::as_str)
        .filter(|u| !u.is_empty())
        .collect();
    ordered.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    ordered.dedup();

    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(c) = rest.chars().next() {
        match ordered.iter().find(|u| rest.starts_with(**u)) {
            Some(url) => {
                out.push_str(targets.get(*url).map_or(*url, String::as_str));
                rest = &rest[url.len()..];
            }
            None => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    out
}

async fn read_post(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Temporary files are created 0600; archives are served by the site
#[cfg(unix)]
fn make_world_readable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644)) {
        warn!(path = %path.display(), error = %e, "could not set archive permissions");
    }
}

#[cfg(not(unix))]
fn make_world_readable(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_archive_path() {
        let archived = Outcome::Archived {
            path: "/archives/ab_x.pdf".to_string(),
            hash: "ab".to_string(),
            extension: "pdf".to_string(),
            rendered: false,
        };
        assert_eq!(archived.archive_path(), Some("/archives/ab_x.pdf"));
        assert_eq!(
            Outcome::Reused {
                path: "/archives/ab_x.pdf".to_string()
            }
            .archive_path(),
            Some("/archives/ab_x.pdf")
        );
        assert_eq!(Outcome::Pending.archive_path(), None);
    }

    #[test]
    fn test_serialize_result() {
        let result = ReferenceResult {
            document: "post.md".to_string(),
            url: "https://example.com/v.mp4".to_string(),
            outcome: Outcome::Unsupported {
                content_type: "video/mp4".to_string(),
            },
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""outcome":"unsupported""#));
        assert!(json.contains(r#""content_type":"video/mp4""#));
    }

    fn targets(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(u, p)| (u.to_string(), p.to_string()))
            .collect()
    }

    #[test]
    fn test_rewrite_urls_prefers_longest_url() {
        let content = "a=\"https://x.org/doc\" b=\"https://x.org/doc.pdf\" c=\"https://x.org/doc\"";
        let urls = vec![
            "https://x.org/doc".to_string(),
            "https://x.org/doc.pdf".to_string(),
        ];
        let map = targets(&[
            ("https://x.org/doc", "/archives/1_doc.pdf"),
            ("https://x.org/doc.pdf", "/archives/2_doc.pdf"),
        ]);
        assert_eq!(
            rewrite_urls(content, &urls, &map),
            "a=\"/archives/1_doc.pdf\" b=\"/archives/2_doc.pdf\" c=\"/archives/1_doc.pdf\""
        );
    }

    #[test]
    fn test_rewrite_urls_keeps_longer_remote_url() {
        // the longer URL failed and must stay intact
        let content = "\"https://x.org/doc\" \"https://x.org/doc.pdf\"";
        let urls = vec![
            "https://x.org/doc".to_string(),
            "https://x.org/doc.pdf".to_string(),
        ];
        let map = targets(&[("https://x.org/doc", "/archives/1_doc")]);
        assert_eq!(
            rewrite_urls(content, &urls, &map),
            "\"/archives/1_doc\" \"https://x.org/doc.pdf\""
        );
    }

    #[test]
    fn test_rewrite_urls_every_occurrence() {
        let content = "ü https://x.org/a ü https://x.org/a";
        let urls = vec!["https://x.org/a".to_string()];
        let map = targets(&[("https://x.org/a", "/archives/a")]);
        assert_eq!(rewrite_urls(content, &urls, &map), "ü /archives/a ü /archives/a");
    }

    #[test]
    fn test_report_counts() {
        let mut report = ArchiveReport::default();
        for outcome in [
            Outcome::Pending,
            Outcome::Unsupported {
                content_type: "video/mp4".to_string(),
            },
            Outcome::Failed {
                stage: Stage::Probe,
                error: "x".to_string(),
            },
            Outcome::Reused {
                path: "/archives/a".to_string(),
            },
        ] {
            report.record(ReferenceResult {
                document: "p.md".to_string(),
                url: "https://example.com".to_string(),
                outcome,
            });
        }
        assert_eq!(report.unsupported, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.reused, 1);
        assert_eq!(report.archived, 0);
        assert_eq!(report.results.len(), 4);
    }
}
