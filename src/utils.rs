//! Utility functions for file naming and on-disk inspection

use std::path::{Component, Path};

/// Replacement for every forbidden character
pub const SANITIZE_PLACEHOLDER: char = '_';

/// Characters that are forbidden in file names on at least one supported platform.
/// ASCII control characters are rejected as well.
const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace filesystem-forbidden characters with [`SANITIZE_PLACEHOLDER`]
///
/// A name made only of dots and blanks (`.`, `..`, ` . `) could resolve to the current or
/// parent directory, so every character of it becomes the placeholder. The placeholder is
/// itself allowed, so sanitizing twice yields the same result.
///
/// # Examples
///
/// ```
/// use tidlarr::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("AC/DC: Live?"), "AC_DC_ Live_");
/// assert_eq!(sanitize_filename(&sanitize_filename("a<b>")), "a_b_");
/// assert_eq!(sanitize_filename(".."), "__");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if FORBIDDEN_CHARS.contains(&c) || c.is_ascii_control() {
                SANITIZE_PLACEHOLDER
            } else {
                c
            }
        })
        .collect();

    if is_dots_only(&sanitized) {
        sanitized.chars().map(|_| SANITIZE_PLACEHOLDER).collect()
    } else {
        sanitized
    }
}

/// Whether a name carries nothing but dots and whitespace (empty included)
pub fn is_dots_only(name: &str) -> bool {
    name.chars().all(|c| c == '.' || c.is_whitespace())
}

/// Whether `name` joins onto a directory as exactly one child entry
///
/// Rejects empty names, `.`, `..`, absolute paths and anything with a separator.
pub fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

/// First four characters of a release date, or an empty string if it is shorter
pub fn release_year(release_date: &str) -> &str {
    release_date.get(..4).unwrap_or("")
}

/// Total size in bytes of the regular files directly inside `dir`
///
/// Returns `None` when the directory cannot be read, so callers can fall back to a
/// placeholder size.
pub async fn directory_size(dir: &Path) -> Option<u64> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut total = 0u64;
    while let Ok(Some(entry)) = entries.next_entry().await {
        if let Ok(metadata) = entry.metadata().await
            && metadata.is_file()
        {
            total += metadata.len();
        }
    }
    Some(total)
}

/// Strip a trailing `.nzb` extension (any case) from an uploaded file name
pub fn strip_nzb_extension(filename: &str) -> &str {
    let len = filename.len();
    if len >= 4
        && filename.is_char_boundary(len - 4)
        && filename[len - 4..].eq_ignore_ascii_case(".nzb")
    {
        &filename[..len - 4]
    } else {
        filename
    }
}
