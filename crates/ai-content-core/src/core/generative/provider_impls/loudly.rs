//! Loudly Music Provider
//!
//! Adapter for the Loudly prompt-to-song API. One POST creates the song and
//! returns a file URL, which is then downloaded and saved as MP3.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use crate::core::generative::http;
use crate::core::generative::options::{clamp_with_warning, warn_unsupported, GenerationOptions};
use crate::core::generative::providers::{
    boundary_error, elapsed_ms, prompt_preview, GenerativeProvider,
};
use crate::core::generative::result::{ContentType, GenerationResult, Metadata};
use crate::core::generative::storage;
use crate::core::settings::Settings;
use crate::core::{CoreError, CoreResult};

// =============================================================================
// Constants
// =============================================================================

/// Shortest song Loudly will render
pub const MIN_DURATION_SECS: u32 = 30;

/// Longest song Loudly will render
pub const MAX_DURATION_SECS: u32 = 420;

/// Duration used when none is requested
pub const DEFAULT_DURATION_SECS: u32 = 30;

const FILE_EXTENSION: &str = "mp3";

// =============================================================================
// API Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
struct SongRequest<'a> {
    prompt: &'a str,
    duration: u32,
    test: bool,
}

#[derive(Debug, Deserialize)]
struct SongResponse {
    #[serde(default)]
    music_file_path: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    title: Option<Value>,
}

// =============================================================================
// LoudlyMusicProvider
// =============================================================================

/// Loudly music generation provider
pub struct LoudlyMusicProvider {
    api_key: String,
    base_url: String,
    request_timeout: u64,
    output_dir: PathBuf,
}

impl std::fmt::Debug for LoudlyMusicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoudlyMusicProvider")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl LoudlyMusicProvider {
    pub const NAME: &'static str = "loudly";

    /// Creates the provider, failing when no API key is configured
    pub fn new(settings: &Settings) -> CoreResult<Self> {
        let api_key = settings
            .loudly
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CoreError::authentication(Self::NAME))?;

        Ok(Self {
            api_key,
            base_url: settings.loudly.base_url.trim_end_matches('/').to_string(),
            request_timeout: settings.loudly.request_timeout,
            output_dir: settings.output_dir.clone(),
        })
    }

    fn songs_url(&self) -> String {
        format!("{}/ai/prompt/songs", self.base_url)
    }

    /// Requested duration forced into Loudly's supported range
    fn effective_duration(requested: Option<u32>) -> u32 {
        clamp_with_warning(
            Self::NAME,
            "duration",
            requested.unwrap_or(DEFAULT_DURATION_SECS),
            MIN_DURATION_SECS,
            MAX_DURATION_SECS,
        )
    }

    async fn run(&self, prompt: &str, options: &GenerationOptions) -> CoreResult<GenerationResult> {
        let started = Instant::now();
        warn_unsupported(
            Self::NAME,
            &[
                ("bpm", options.bpm.is_some()),
                ("lyrics", options.lyrics.is_some()),
                ("reference_audio_url", options.reference_audio_url.is_some()),
            ],
        );

        let duration = Self::effective_duration(options.duration_seconds);
        let request = SongRequest {
            prompt,
            duration,
            test: options.test_mode,
        };

        let client = http::build_client(Self::NAME, self.request_timeout)?;
        let song: SongResponse = http::send_json(
            Self::NAME,
            client
                .post(self.songs_url())
                .header("API-KEY", &self.api_key)
                .json(&request),
        )
        .await?;

        let file_url = song
            .music_file_path
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                CoreError::provider(
                    Self::NAME,
                    "No 'music_file_path' found in Loudly API response",
                )
            })?;

        let audio = http::download(Self::NAME, &client, file_url, &[]).await?;

        let path = storage::resolve_output_path(
            &self.output_dir,
            Self::NAME,
            FILE_EXTENSION,
            options.output_path.as_deref(),
        );
        let path = storage::save_media(&path, &audio).await?;
        info!("Loudly: saved to {}", path.display());

        let mut metadata = Metadata::new();
        metadata.insert("prompt".to_string(), prompt.into());
        metadata.insert("duration".to_string(), duration.into());
        metadata.insert("test_mode".to_string(), options.test_mode.into());
        metadata.insert(
            "loudly_song_id".to_string(),
            song.id.unwrap_or(Value::Null),
        );
        metadata.insert(
            "loudly_title".to_string(),
            song.title.unwrap_or(Value::Null),
        );

        Ok(
            GenerationResult::saved(Self::NAME, ContentType::Music, path, audio)
                .with_metadata(metadata)
                .with_generation_time_ms(elapsed_ms(started)),
        )
    }
}

#[async_trait]
impl GenerativeProvider for LoudlyMusicProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn content_type(&self) -> ContentType {
        ContentType::Music
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> CoreResult<GenerationResult> {
        info!("Loudly: generating music from prompt: {}", prompt_preview(prompt));
        self.run(prompt, options)
            .await
            .map_err(|e| boundary_error(Self::NAME, e))
    }
}
