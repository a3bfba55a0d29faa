//! Output Storage
//!
//! Naming and writing of generated media files.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::CoreResult;

/// Timestamp layout used in generated file names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `<prefix>_<YYYYMMDD_HHMMSS>.<ext>`
pub fn default_file_name(prefix: &str, extension: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}_{}.{}",
        prefix,
        now.format(TIMESTAMP_FORMAT),
        extension.trim_start_matches('.')
    )
}

/// Picks the destination for a result.
///
/// An explicit `requested` path wins; otherwise a timestamped name is placed in
/// `output_dir`. Default names have one-second resolution, so concurrent calls
/// to the same provider within a second share a path and the last write wins.
/// Pass `requested` to keep such calls apart.
pub fn resolve_output_path(
    output_dir: &Path,
    prefix: &str,
    extension: &str,
    requested: Option<&Path>,
) -> PathBuf {
    match requested {
        Some(path) => path.to_path_buf(),
        None => output_dir.join(default_file_name(prefix, extension, Utc::now())),
    }
}

/// File extension for a MIME type, or `fallback` when unknown
pub fn extension_for_mime<'a>(mime: Option<&str>, fallback: &'a str) -> &'a str {
    let Some(mime) = mime else {
        return fallback;
    };
    let essence = mime.split(';').next().unwrap_or("").trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "video/mp4" => "mp4",
        _ => fallback,
    }
}

/// Writes `data` to `path`, creating parent directories and replacing any
/// existing file. Returns the path written.
pub async fn save_media(path: &Path, data: &[u8]) -> CoreResult<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, data).await?;
    debug!("Saved {} bytes to {}", data.len(), path.display());
    Ok(path.to_path_buf())
}
