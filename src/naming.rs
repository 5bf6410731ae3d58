//! Archive file naming: `<sha256>_<sanitized url>[.ext]`

const MAX_SANITIZED_LEN: usize = 150;

/// Turn a URL into a filesystem-safe name fragment.
///
/// The scheme is dropped, `/` and every character outside
/// `[A-Za-z0-9._~-]` become `_`, trailing underscores are trimmed.
pub fn sanitize_url(url: &str) -> String {
    let rest = match url.split_once("://") {
        Some((_, rest)) => rest,
        None => url,
    };

    let mut out: String = rest
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '~' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // all ASCII from here on, byte truncation is safe
    out.truncate(MAX_SANITIZED_LEN);
    let trimmed = out.trim_end_matches('_');
    trimmed.to_string()
}

/// Final archive file name for a download.
///
/// `extension` is given without the dot and is not repeated when the
/// sanitized URL already ends with it.
pub fn archive_file_name(hash: &str, url: &str, extension: &str) -> String {
    let sanitized = sanitize_url(url);
    if has_extension(&sanitized, extension) {
        format!("{}_{}", hash, sanitized)
    } else {
        format!("{}_{}.{}", hash, sanitized, extension)
    }
}

fn has_extension(name: &str, extension: &str) -> bool {
    let suffix = format!(".{}", extension);
    name.len() >= suffix.len()
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(&suffix)
}
