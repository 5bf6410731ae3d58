//! convert-front-matter command: `key: value` → `key = value` in `+++` blocks

use crate::config::list_posts;
use crate::report::{self, OutputFormat};
use anyhow::{Context, Result};
use clap::Args;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

#[derive(Args)]
pub struct ConvertArgs {
    /// Directory containing the Markdown posts
    #[arg(long, default_value = "content/posts", env = "HUGO_ARCHIVE_POSTS_DIR")]
    pub posts_dir: PathBuf,

    /// Report what would change without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Report format
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
pub struct FileConversion {
    pub file: String,
    pub lines_changed: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct ConvertReport {
    pub scanned: usize,
    pub converted: usize,
    pub lines_changed: usize,
    pub files: Vec<FileConversion>,
}

fn key_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*?):\s*(.*)$").unwrap())
}

/// Run the convert-front-matter command
pub async fn run_convert(args: ConvertArgs) -> Result<()> {
    let report = convert_posts(&args.posts_dir, args.dry_run).await?;

    println!("{}", report::render(&report, args.format)?);
    eprintln!(
        "Done: {}/{} posts converted ({} lines)",
        report.converted, report.scanned, report.lines_changed
    );

    Ok(())
}

/// Convert every post in `dir`
pub async fn convert_posts(dir: &Path, dry_run: bool) -> Result<ConvertReport> {
    let posts = list_posts(dir).with_context(|| format!("Failed to list posts in {}", dir.display()))?;
    let mut report = ConvertReport {
        scanned: posts.len(),
        ..Default::default()
    };

    for post in &posts {
        let changed = convert_file(post, dry_run).await?;
        if changed > 0 {
            report.converted += 1;
            report.lines_changed += changed;
            report.files.push(FileConversion {
                file: post.display().to_string(),
                lines_changed: changed,
            });
        }
    }

    Ok(report)
}

/// Convert one file in place; returns the number of changed lines
pub async fn convert_file(path: &Path, dry_run: bool) -> Result<usize> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let (converted, changed) = convert_front_matter(&content);
    if changed > 0 && !dry_run {
        tokio::fs::write(path, converted)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), lines = changed, "front matter converted");
    }

    Ok(changed)
}

/// Rewrite YAML-style lines inside `+++` blocks as TOML assignments.
///
/// Lines keep their original endings. Returns the text and the number of
/// lines changed.
pub fn convert_front_matter(content: &str) -> (String, usize) {
    let mut out = String::with_capacity(content.len() + 16);
    let mut in_header = false;
    let mut changed = 0;

    for line in content.split_inclusive('\n') {
        let body = line.trim_end_matches(['\n', '\r']);
        let ending = &line[body.len()..];

        if body.trim() == "+++" {
            in_header = !in_header;
            out.push_str(line);
            continue;
        }

        match in_header.then(|| convert_line(body)).flatten() {
            Some(updated) => {
                debug!(from = body, to = %updated, "header line");
                out.push_str(&updated);
                out.push_str(ending);
                changed += 1;
            }
            None => out.push_str(line),
        }
    }

    (out, changed)
}

/// `key: value` → `key = value`; `None` if the line is not of that form
fn convert_line(line: &str) -> Option<String> {
    let cap = key_value_re().captures(line)?;
    let key = &cap[1];
    if key.contains('=') {
        return None;
    }
    Some(format!("{} = {}", key, &cap[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_header_only() {
        let content = "+++\ntitle: Hello\ndate: 2023-01-01\n+++\n\nBody: stays\n";
        let (out, changed) = convert_front_matter(content);
        assert_eq!(
            out,
            "+++\ntitle = Hello\ndate = 2023-01-01\n+++\n\nBody: stays\n"
        );
        assert_eq!(changed, 2);
    }

    #[test]
    fn test_already_toml_untouched() {
        let content = "+++\ntitle = \"a: b\"\ndraft = false\n+++\n";
        let (out, changed) = convert_front_matter(content);
        assert_eq!(out, content);
        assert_eq!(changed, 0);
    }

    #[test]
    fn test_preserves_crlf_and_missing_final_newline() {
        let content = "+++\r\ntags: [\"a\"]\r\n+++";
        let (out, changed) = convert_front_matter(content);
        assert_eq!(out, "+++\r\ntags = [\"a\"]\r\n+++");
        assert_eq!(changed, 1);
    }

    #[test]
    fn test_value_with_colon() {
        assert_eq!(
            convert_line("link: https://example.com"),
            Some("link = https://example.com".to_string())
        );
    }

    #[test]
    fn test_no_header() {
        let content = "key: value\n";
        assert_eq!(convert_front_matter(content), (content.to_string(), 0));
    }

    #[tokio::test]
    async fn test_convert_posts_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let post = dir.path().join("a.md");
        std::fs::write(&post, "+++\ntitle: A\n+++\n").unwrap();
        std::fs::write(dir.path().join("b.md"), "+++\ntitle = \"B\"\n+++\n").unwrap();

        let report = convert_posts(dir.path(), true).await.unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.converted, 1);
        assert_eq!(std::fs::read_to_string(&post).unwrap(), "+++\ntitle: A\n+++\n");

        convert_posts(dir.path(), false).await.unwrap();
        assert_eq!(std::fs::read_to_string(&post).unwrap(), "+++\ntitle = A\n+++\n");
    }
}
