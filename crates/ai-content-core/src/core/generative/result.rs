//! Generation Result
//!
//! The uniform value every provider returns from a successful call.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Provider-specific values echoed back with a result (prompt, durations, vendor IDs)
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Kind of content a provider produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Music / audio tracks
    Music,
    /// Video clips
    Video,
    /// Still images
    Image,
}

impl ContentType {
    /// All content types, in display order
    pub const ALL: [ContentType; 3] = [ContentType::Music, ContentType::Video, ContentType::Image];

    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Music => "music",
            ContentType::Video => "video",
            ContentType::Image => "image",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "music" => Ok(ContentType::Music),
            "video" => Ok(ContentType::Video),
            "image" => Ok(ContentType::Image),
            _ => Err(format!(
                "Unknown content type: '{}'. Valid: music, video, image",
                s
            )),
        }
    }
}

/// Result of a completed generation.
///
/// Only constructed through [`GenerationResult::saved`], after the media has
/// been written to disk, so `success` always comes with a path and the bytes.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    id: String,
    success: bool,
    provider: String,
    content_type: ContentType,
    file_path: Option<PathBuf>,
    #[serde(skip)]
    data: Option<Vec<u8>>,
    metadata: Metadata,
    generation_time_ms: u64,
}

impl GenerationResult {
    /// Creates a successful result for media persisted at `file_path`
    pub fn saved(
        provider: impl Into<String>,
        content_type: ContentType,
        file_path: PathBuf,
        data: Vec<u8>,
    ) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            success: true,
            provider: provider.into(),
            content_type,
            file_path: Some(file_path),
            data: Some(data),
            metadata: Metadata::new(),
            generation_time_ms: 0,
        }
    }

    /// Attaches metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Records how long the call took
    pub fn with_generation_time_ms(mut self, ms: u64) -> Self {
        self.generation_time_ms = ms;
        self
    }

    /// Unique result ID (ULID)
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// Registry name of the provider that produced this result
    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Where the media was written
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Raw media bytes
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Takes ownership of the raw media bytes
    pub fn into_data(self) -> Option<Vec<u8>> {
        self.data
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Looks up a metadata value by key
    pub fn metadata_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    pub fn generation_time_ms(&self) -> u64 {
        self.generation_time_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_type_display_and_parse() {
        assert_eq!(ContentType::Music.to_string(), "music");
        assert_eq!(ContentType::Video.as_str(), "video");
        assert_eq!("Image".parse::<ContentType>().unwrap(), ContentType::Image);
        assert_eq!(" music ".parse::<ContentType>().unwrap(), ContentType::Music);
        assert!("audio".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_content_type_serialization() {
        assert_eq!(
            serde_json::to_string(&ContentType::Video).unwrap(),
            "\"video\""
        );
        assert_eq!(
            serde_json::from_str::<ContentType>("\"image\"").unwrap(),
            ContentType::Image
        );
    }

    #[test]
    fn test_saved_result_invariant() {
        let result = GenerationResult::saved(
            "loudly",
            ContentType::Music,
            PathBuf::from("exports/loudly_20250101_000000.mp3"),
            vec![1, 2, 3],
        );

        assert!(result.success());
        assert!(!result.id().is_empty());
        assert_eq!(result.provider(), "loudly");
        assert_eq!(result.content_type(), ContentType::Music);
        assert!(result.file_path().is_some());
        assert_eq!(result.data(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn test_metadata_and_timing() {
        let mut metadata = Metadata::new();
        metadata.insert("prompt".to_string(), json!("calm piano"));

        let result = GenerationResult::saved(
            "imagen",
            ContentType::Image,
            PathBuf::from("a.png"),
            vec![0],
        )
        .with_metadata(metadata)
        .with_generation_time_ms(250);

        assert_eq!(result.metadata_value("prompt"), Some(&json!("calm piano")));
        assert_eq!(result.generation_time_ms(), 250);
        assert_eq!(result.into_data(), Some(vec![0]));
    }

    #[test]
    fn test_serialization_skips_raw_bytes() {
        let result = GenerationResult::saved(
            "veo",
            ContentType::Video,
            PathBuf::from("v.mp4"),
            vec![9; 16],
        );
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["success"], json!(true));
        assert_eq!(value["content_type"], json!("video"));
        assert_eq!(value["file_path"], json!("v.mp4"));
        assert!(value.get("data").is_none());
    }
}
