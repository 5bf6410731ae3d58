//! Report output on stdout

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

/// Output format for command reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON on one line
    #[default]
    Json,
    Yaml,
}

/// Serialize a report in the requested format
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    })
}

/// Shorten a string for progress lines
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        ok: usize,
        name: &'static str,
    }

    #[test]
    fn test_render_json() {
        let out = render(&Sample { ok: 2, name: "a" }, OutputFormat::Json).unwrap();
        assert_eq!(out, r#"{"ok":2,"name":"a"}"#);
    }

    #[test]
    fn test_render_yaml() {
        let out = render(&Sample { ok: 2, name: "a" }, OutputFormat::Yaml).unwrap();
        assert!(out.contains("ok: 2"));
        assert!(out.contains("name: a"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a very long string", 10), "this is...");
        assert_eq!(truncate("ünïcödé-string", 6), "ünï...");
    }
}
