//! Generative AI Providers
//!
//! Provider abstraction shared by every vendor adapter.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Instant;
use tracing::error;

use super::options::GenerationOptions;
use super::result::{ContentType, GenerationResult, Metadata};
use super::storage;
use crate::core::{CoreError, CoreResult};

/// Maximum number of prompt characters written to logs
pub const LOG_PROMPT_CHARS: usize = 50;

/// Trait for generative AI providers
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Returns the registry name of the provider
    fn name(&self) -> &str;

    /// Returns the kind of content the provider produces
    fn content_type(&self) -> ContentType;

    /// Whether the provider can sing supplied lyrics
    fn supports_vocals(&self) -> bool {
        false
    }

    /// Whether the provider can condition on a reference audio clip
    fn supports_reference_audio(&self) -> bool {
        false
    }

    /// Generates content for `prompt`, persists it and returns the result.
    ///
    /// Implementations only fail with [`CoreError::Authentication`] or
    /// [`CoreError::Provider`].
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> CoreResult<GenerationResult>;
}

/// Shortened prompt for log lines
pub fn prompt_preview(prompt: &str) -> String {
    let mut chars = prompt.chars();
    let head: String = chars.by_ref().take(LOG_PROMPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Narrows an error at the adapter boundary and logs it
pub fn boundary_error(provider: &str, err: CoreError) -> CoreError {
    let err = err.into_provider_error(provider);
    error!("{} generation failed: {}", provider, err);
    err
}

/// Milliseconds elapsed since `started`
pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Mock Provider for Testing
// ============================================================================

/// Provider that writes a fixed payload without touching the network
#[derive(Debug, Clone)]
pub struct MockGenerativeProvider {
    name: String,
    content_type: ContentType,
    output_dir: PathBuf,
    payload: Vec<u8>,
    fail_with: Option<String>,
}

impl MockGenerativeProvider {
    /// Creates a new mock provider writing into `output_dir`
    pub fn new(
        name: impl Into<String>,
        content_type: ContentType,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type,
            output_dir: output_dir.into(),
            payload: b"mock-media".to_vec(),
            fail_with: None,
        }
    }

    /// Sets the bytes written on success
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Makes every call fail with a provider error
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    fn extension(&self) -> &'static str {
        match self.content_type {
            ContentType::Music => "mp3",
            ContentType::Video => "mp4",
            ContentType::Image => "png",
        }
    }
}

#[async_trait]
impl GenerativeProvider for MockGenerativeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn content_type(&self) -> ContentType {
        self.content_type
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> CoreResult<GenerationResult> {
        let started = Instant::now();
        if let Some(message) = &self.fail_with {
            return Err(boundary_error(
                &self.name,
                CoreError::provider(&self.name, message.clone()),
            ));
        }

        let path = storage::resolve_output_path(
            &self.output_dir,
            &self.name,
            self.extension(),
            options.output_path.as_deref(),
        );
        let path = storage::save_media(&path, &self.payload)
            .await
            .map_err(|e| boundary_error(&self.name, e))?;

        let mut metadata = Metadata::new();
        metadata.insert("prompt".to_string(), prompt.into());

        Ok(
            GenerationResult::saved(&self.name, self.content_type, path, self.payload.clone())
                .with_metadata(metadata)
                .with_generation_time_ms(elapsed_ms(started)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prompt_preview_truncates() {
        let long = "a".repeat(80);
        let preview = prompt_preview(&long);
        assert_eq!(preview.len(), LOG_PROMPT_CHARS + 3);
        assert!(preview.ends_with("..."));

        assert_eq!(prompt_preview("short"), "short");
        assert_eq!(prompt_preview(&"b".repeat(50)), "b".repeat(50));
    }

    #[test]
    fn test_prompt_preview_respects_char_boundaries() {
        let prompt = "é".repeat(60);
        let preview = prompt_preview(&prompt);
        assert_eq!(preview.chars().count(), LOG_PROMPT_CHARS + 3);
    }

    #[test]
    fn test_boundary_error_wraps_io() {
        let err = boundary_error(
            "veo",
            CoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")),
        );
        assert!(matches!(err, CoreError::Provider { ref provider, .. } if provider == "veo"));
    }

    #[tokio::test]
    async fn test_mock_provider_writes_payload() {
        let temp = TempDir::new().unwrap();
        let provider = MockGenerativeProvider::new("mock", ContentType::Image, temp.path())
            .with_payload(vec![1, 2, 3]);

        assert_eq!(provider.name(), "mock");
        assert_eq!(provider.content_type(), ContentType::Image);
        assert!(!provider.supports_vocals());
        assert!(!provider.supports_reference_audio());

        let result = provider
            .generate("a red fox", &GenerationOptions::default())
            .await
            .unwrap();

        let path = result.file_path().unwrap();
        assert!(path.starts_with(temp.path()));
        assert_eq!(path.extension().unwrap(), "png");
        assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3]);
        assert_eq!(result.metadata_value("prompt").unwrap(), "a red fox");
    }

    #[tokio::test]
    async fn test_mock_provider_failure() {
        let temp = TempDir::new().unwrap();
        let provider = MockGenerativeProvider::new("mock", ContentType::Music, temp.path())
            .with_failure("quota exceeded");

        let err = provider
            .generate("x", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }
}
