//! Google Lyria Music Provider
//!
//! Instrumental music generation through the Gemini API `:predict` endpoint.
//! Audio comes back inline as base64 WAV.

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use super::google::{self, decode_first_prediction, PredictResponse};
use crate::core::generative::http;
use crate::core::generative::options::{clamp_with_warning, warn_unsupported, GenerationOptions};
use crate::core::generative::providers::{
    boundary_error, elapsed_ms, prompt_preview, GenerativeProvider,
};
use crate::core::generative::result::{ContentType, GenerationResult, Metadata};
use crate::core::generative::storage;
use crate::core::settings::Settings;
use crate::core::CoreResult;

/// Slowest tempo folded into the prompt
pub const MIN_BPM: u32 = 60;

/// Fastest tempo folded into the prompt
pub const MAX_BPM: u32 = 200;

/// Lyria renders fixed-length clips
pub const CLIP_DURATION_SECS: u32 = 30;

const DEFAULT_MIME_TYPE: &str = "audio/wav";

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<LyriaInstance<'a>>,
    parameters: LyriaParameters,
}

#[derive(Debug, Serialize)]
struct LyriaInstance<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct LyriaParameters {
    sample_count: u32,
}

/// Google Lyria music provider
pub struct LyriaMusicProvider {
    api_key: String,
    base_url: String,
    model: String,
    request_timeout: u64,
    output_dir: PathBuf,
}

impl std::fmt::Debug for LyriaMusicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LyriaMusicProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl LyriaMusicProvider {
    pub const NAME: &'static str = "lyria";

    pub fn new(settings: &Settings) -> CoreResult<Self> {
        let cfg = &settings.google;
        let api_key = google::require_api_key(cfg, Self::NAME)?;

        Ok(Self {
            api_key,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.lyria_model.clone(),
            request_timeout: cfg.request_timeout,
            output_dir: settings.output_dir.clone(),
        })
    }

    fn predict_url(&self) -> String {
        format!("{}/models/{}:predict", self.base_url, self.model)
    }

    /// Prompt with the tempo hint appended
    fn effective_prompt(prompt: &str, bpm: Option<u32>) -> (String, Option<u32>) {
        match bpm {
            Some(bpm) => {
                let bpm = clamp_with_warning(Self::NAME, "bpm", bpm, MIN_BPM, MAX_BPM);
                (format!("{}, {} BPM", prompt.trim_end(), bpm), Some(bpm))
            }
            None => (prompt.to_string(), None),
        }
    }

    async fn run(&self, prompt: &str, options: &GenerationOptions) -> CoreResult<GenerationResult> {
        let started = Instant::now();
        warn_unsupported(
            Self::NAME,
            &[
                ("lyrics", options.lyrics.is_some()),
                ("reference_audio_url", options.reference_audio_url.is_some()),
                ("test_mode", options.test_mode),
            ],
        );
        if let Some(duration) = options.duration_seconds {
            if duration != CLIP_DURATION_SECS {
                warn!(
                    "lyria: clips are {}s long, requested duration {}s ignored",
                    CLIP_DURATION_SECS, duration
                );
            }
        }

        let (effective_prompt, bpm) = Self::effective_prompt(prompt, options.bpm);
        let request = PredictRequest {
            instances: vec![LyriaInstance {
                prompt: &effective_prompt,
                negative_prompt: options.negative_prompt(),
                seed: options.seed,
            }],
            parameters: LyriaParameters { sample_count: 1 },
        };

        let client = http::build_client(Self::NAME, self.request_timeout)?;
        let response: PredictResponse = http::send_json(
            Self::NAME,
            client
                .post(self.predict_url())
                .header(google::API_KEY_HEADER, &self.api_key)
                .json(&request),
        )
        .await?;

        let (audio, mime_type) = decode_first_prediction(Self::NAME, response.predictions)?;
        let mime_type = mime_type.unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
        let extension = storage::extension_for_mime(Some(mime_type.as_str()), "wav");

        let path = storage::resolve_output_path(
            &self.output_dir,
            Self::NAME,
            extension,
            options.output_path.as_deref(),
        );
        let path = storage::save_media(&path, &audio).await?;
        info!("Lyria: saved to {}", path.display());

        let mut metadata = Metadata::new();
        metadata.insert("prompt".to_string(), prompt.into());
        metadata.insert("effective_prompt".to_string(), effective_prompt.into());
        metadata.insert("bpm".to_string(), bpm.into());
        metadata.insert("model".to_string(), self.model.clone().into());
        metadata.insert("mime_type".to_string(), mime_type.into());

        Ok(
            GenerationResult::saved(Self::NAME, ContentType::Music, path, audio)
                .with_metadata(metadata)
                .with_generation_time_ms(elapsed_ms(started)),
        )
    }
}

#[async_trait]
impl GenerativeProvider for LyriaMusicProvider {
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
        info!("Lyria: generating music from prompt: {}", prompt_preview(prompt));
        self.run(prompt, options)
            .await
            .map_err(|e| boundary_error(Self::NAME, e))
    }
}
