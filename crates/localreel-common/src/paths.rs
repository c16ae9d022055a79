//! Path utilities for recognising playable media by name.
//!
//! The allow-list is fixed; matching is a case-insensitive suffix test on the
//! entry name, so `.mp4` and `Clip.MP4` both qualify.

use std::path::Path;

use crate::types::MediaKind;

/// Extensions the scanner and the asset cache treat as media.
const MEDIA_EXTENSIONS: &[&str] = &["m4b", "mp3", "mp4", "webm", "ogg", "mov", "mkv"];

/// Check if a file name ends with one of the media extensions.
///
/// # Examples
///
/// ```
/// use localreel_common::paths::is_media_name;
///
/// assert!(is_media_name("a.mp4"));
/// assert!(is_media_name("c.MKV"));
/// assert!(!is_media_name("b.txt"));
/// ```
pub fn is_media_name(name: &str) -> bool {
    media_kind_of_name(name).is_some()
}

/// Check if a path names a media file.
pub fn is_media_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(is_media_name)
        .unwrap_or(false)
}

/// Resolve the media kind from a file name's suffix.
pub fn media_kind_of_name(name: &str) -> Option<MediaKind> {
    let lower = name.to_lowercase();
    MEDIA_EXTENSIONS
        .iter()
        .find(|ext| {
            lower
                .strip_suffix(**ext)
                .is_some_and(|stem| stem.ends_with('.'))
        })
        .and_then(|ext| MediaKind::from_extension(ext))
}

/// Check if a request path or URL refers to a media file.
///
/// Query strings and fragments are ignored.
///
/// ```
/// use localreel_common::paths::is_media_request;
///
/// assert!(is_media_request("/videos/clip.webm?t=10"));
/// assert!(!is_media_request("/app.js"));
/// ```
pub fn is_media_request(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    is_media_name(path)
}

/// Get the list of media file extensions.
#[must_use]
pub fn media_extensions() -> &'static [&'static str] {
    MEDIA_EXTENSIONS
}
