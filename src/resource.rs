//! Supported resource kinds, selected from the server's content type

use serde::Serialize;

/// Image formats that are archived as-is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

/// What a reference points at, and therefore how it is fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Rendered to PDF, raw download as fallback
    Html,
    Pdf,
    Image(ImageFormat),
}

/// How a resource kind is turned into bytes on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    RenderWithFallback,
    Download,
}

impl ResourceKind {
    /// Map a `Content-Type` header value to a kind.
    ///
    /// Parameters such as `charset` are ignored. Returns `None` for
    /// unsupported types.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = mime_essence(content_type);
        let kind = match essence.as_str() {
            "text/html" | "application/xhtml+xml" => ResourceKind::Html,
            "application/pdf" => ResourceKind::Pdf,
            "image/jpeg" | "image/jpg" | "image/pjpeg" => ResourceKind::Image(ImageFormat::Jpeg),
            "image/png" => ResourceKind::Image(ImageFormat::Png),
            "image/gif" => ResourceKind::Image(ImageFormat::Gif),
            "image/webp" => ResourceKind::Image(ImageFormat::Webp),
            _ => return None,
        };
        Some(kind)
    }

    /// File extension of a raw download, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ResourceKind::Html => "html",
            ResourceKind::Pdf => "pdf",
            ResourceKind::Image(ImageFormat::Jpeg) => "jpg",
            ResourceKind::Image(ImageFormat::Png) => "png",
            ResourceKind::Image(ImageFormat::Gif) => "gif",
            ResourceKind::Image(ImageFormat::Webp) => "webp",
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            ResourceKind::Html => Strategy::RenderWithFallback,
            ResourceKind::Pdf | ResourceKind::Image(_) => Strategy::Download,
        }
    }
}

/// `type/subtype` part of a content type, lowercased
pub fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_content_type() {
        assert_eq!(
            ResourceKind::from_content_type("text/html; charset=UTF-8"),
            Some(ResourceKind::Html)
        );
        assert_eq!(
            ResourceKind::from_content_type("application/pdf"),
            Some(ResourceKind::Pdf)
        );
        assert_eq!(
            ResourceKind::from_content_type("IMAGE/PNG"),
            Some(ResourceKind::Image(ImageFormat::Png))
        );
        assert_eq!(ResourceKind::from_content_type("video/mp4"), None);
        assert_eq!(ResourceKind::from_content_type(""), None);
    }

    #[test]
    fn test_extension() {
        assert_eq!(ResourceKind::Html.extension(), "html");
        assert_eq!(ResourceKind::Image(ImageFormat::Jpeg).extension(), "jpg");
        assert_eq!(ResourceKind::Image(ImageFormat::Webp).extension(), "webp");
    }

    #[test]
    fn test_strategy() {
        assert_eq!(ResourceKind::Html.strategy(), Strategy::RenderWithFallback);
        assert_eq!(ResourceKind::Pdf.strategy(), Strategy::Download);
        assert_eq!(
            ResourceKind::Image(ImageFormat::Gif).strategy(),
            Strategy::Download
        );
    }

    #[test]
    fn test_mime_essence() {
        assert_eq!(mime_essence(" Text/HTML ; charset=utf-8"), "text/html");
        assert_eq!(mime_essence("application/pdf"), "application/pdf");
    }
}
