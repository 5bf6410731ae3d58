//! Reference extraction from Hugo shortcodes

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\{\{< reference content="([^"]+)""#).unwrap())
}

fn figure_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\{\{< figure src="([^"]+)""#).unwrap())
}

/// URLs of `{{< reference content="..." >}}` shortcodes, in document order
pub fn extract_reference_urls(content: &str) -> Vec<String> {
    reference_re()
        .captures_iter(content)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// URLs of `{{< figure src="..." >}}` shortcodes, in document order
pub fn extract_figure_urls(content: &str) -> Vec<String> {
    figure_re()
        .captures_iter(content)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// All shortcode URLs: references first, then figures.
///
/// Duplicates are kept.
pub fn extract_shortcode_urls(content: &str) -> Vec<String> {
    let mut urls = extract_reference_urls(content);
    urls.extend(extract_figure_urls(content));
    urls
}

/// Whether a shortcode URL still points at a remote HTTP(S) resource
pub fn is_archivable(url: &str, archive_prefix: &str) -> bool {
    if url.starts_with(archive_prefix) {
        return false;
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return false;
    }
    Url::parse(url).is_ok_and(|u| u.host_str().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST: &str = r#"+++
title = "Notes"
+++

Intro {{< reference content="https://example.com/paper.pdf" >}}.

{{< figure src="https://img.example.org/cat.png" title="cat" >}}

Again {{< reference content="https://example.com/paper.pdf" citation="" >}}
and {{< reference content="/archives/abc_old.pdf" >}}
"#;

    #[test]
    fn test_extract_reference_urls() {
        let urls = extract_reference_urls(POST);
        assert_eq!(
            urls,
            vec![
                "https://example.com/paper.pdf",
                "https://example.com/paper.pdf",
                "/archives/abc_old.pdf",
            ]
        );
    }

    #[test]
    fn test_extract_figure_urls() {
        assert_eq!(
            extract_figure_urls(POST),
            vec!["https://img.example.org/cat.png"]
        );
    }

    #[test]
    fn test_references_before_figures() {
        let urls = extract_shortcode_urls(POST);
        assert_eq!(urls.len(), 4);
        assert_eq!(urls[3], "https://img.example.org/cat.png");
    }

    #[test]
    fn test_no_shortcodes() {
        assert!(extract_shortcode_urls("plain [link](https://example.com)").is_empty());
    }

    #[test]
    fn test_is_archivable() {
        assert!(is_archivable("https://example.com/a.pdf", "/archives/"));
        assert!(is_archivable("http://example.com/", "/archives/"));
        assert!(!is_archivable("/archives/abc_a.pdf", "/archives/"));
        assert!(!is_archivable("/images/local.png", "/archives/"));
        assert!(!is_archivable("ftp://example.com/file", "/archives/"));
        assert!(!is_archivable("https://", "/archives/"));
    }
}
