//! Site layout and run configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("hugo-archive/", env!("CARGO_PKG_VERSION"));

/// Where posts and archives live, plus fetch limits
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Directory holding the `*.md` posts
    pub posts_dir: PathBuf,
    /// Hugo `static/` directory, served at the site root
    pub static_dir: PathBuf,
    /// Archive directory name under `static_dir`
    pub archive_subdir: String,
    /// Per-request and per-process timeout
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            posts_dir: PathBuf::from("content/posts"),
            static_dir: PathBuf::from("static"),
            archive_subdir: "archives".to_string(),
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ArchiveConfig {
    /// Filesystem directory the archive files are written to
    pub fn archive_dir(&self) -> PathBuf {
        self.static_dir.join(self.archive_subdir.trim_matches('/'))
    }

    /// Root-relative path prefix posts use to reference archives
    pub fn url_prefix(&self) -> String {
        format!("/{}/", self.archive_subdir.trim_matches('/'))
    }

    /// Site path of an archive file
    pub fn archive_url(&self, file_name: &str) -> String {
        format!("{}{}", self.url_prefix(), file_name)
    }
}

/// Markdown posts directly inside `dir`, sorted by path
pub fn list_posts(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let pattern = Path::new(&glob::Pattern::escape(&dir.to_string_lossy())).join("*.md");
    let mut posts = Vec::new();
    for entry in glob::glob(&pattern.to_string_lossy())? {
        let path = entry?;
        if path.is_file() {
            posts.push(path);
        }
    }
    posts.sort();
    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = ArchiveConfig::default();
        assert_eq!(config.archive_dir(), PathBuf::from("static/archives"));
        assert_eq!(config.url_prefix(), "/archives/");
        assert_eq!(config.archive_url("ab_x.pdf"), "/archives/ab_x.pdf");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_subdir_slashes_are_trimmed() {
        let config = ArchiveConfig {
            archive_subdir: "/mirror/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.url_prefix(), "/mirror/");
        assert_eq!(config.archive_dir(), PathBuf::from("static/mirror"));
        assert!(config.archive_dir().starts_with(&config.static_dir));
    }

    #[test]
    fn test_list_posts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.md"), "b").unwrap();
        fs::write(dir.path().join("a.md"), "a").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("drafts.md")).unwrap();
        fs::write(dir.path().join("[x].md"), "x").unwrap();

        let posts = list_posts(dir.path()).unwrap();
        let names: Vec<_> = posts
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["[x].md", "a.md", "b.md"]);
    }
}
