//! Google Imagen Image Provider

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use super::google::{self, decode_first_prediction, PredictResponse};
use crate::core::generative::http;
use crate::core::generative::options::{warn_unsupported, GenerationOptions};
use crate::core::generative::providers::{
    boundary_error, elapsed_ms, prompt_preview, GenerativeProvider,
};
use crate::core::generative::result::{ContentType, GenerationResult, Metadata};
use crate::core::generative::storage;
use crate::core::settings::Settings;
use crate::core::CoreResult;

/// Aspect ratios Imagen accepts
pub const SUPPORTED_ASPECT_RATIOS: &[&str] = &["1:1", "3:4", "4:3", "9:16", "16:9"];

/// Aspect ratio used when none (or an unsupported one) is requested
pub const DEFAULT_ASPECT_RATIO: &str = "1:1";

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<ImagenInstance<'a>>,
    parameters: ImagenParameters<'a>,
}

#[derive(Debug, Serialize)]
struct ImagenInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagenParameters<'a> {
    sample_count: u32,
    aspect_ratio: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

/// Google Imagen image provider
pub struct ImagenImageProvider {
    api_key: String,
    base_url: String,
    model: String,
    request_timeout: u64,
    output_dir: PathBuf,
}

impl std::fmt::Debug for ImagenImageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagenImageProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl ImagenImageProvider {
    pub const NAME: &'static str = "imagen";

    pub fn new(settings: &Settings) -> CoreResult<Self> {
        let cfg = &settings.google;
        let api_key = google::require_api_key(cfg, Self::NAME)?;

        Ok(Self {
            api_key,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.imagen_model.clone(),
            request_timeout: cfg.request_timeout,
            output_dir: settings.output_dir.clone(),
        })
    }

    fn predict_url(&self) -> String {
        format!("{}/models/{}:predict", self.base_url, self.model)
    }

    fn aspect_ratio(requested: Option<&str>) -> &str {
        match requested.map(str::trim) {
            None => DEFAULT_ASPECT_RATIO,
            Some(ratio) if SUPPORTED_ASPECT_RATIOS.iter().any(|r| *r == ratio) => ratio,
            Some(ratio) => {
                warn!(
                    "imagen: aspect ratio '{}' not supported, using {}",
                    ratio, DEFAULT_ASPECT_RATIO
                );
                DEFAULT_ASPECT_RATIO
            }
        }
    }

    async fn run(&self, prompt: &str, options: &GenerationOptions) -> CoreResult<GenerationResult> {
        let started = Instant::now();
        warn_unsupported(
            Self::NAME,
            &[
                ("duration_seconds", options.duration_seconds.is_some()),
                ("bpm", options.bpm.is_some()),
                ("lyrics", options.lyrics.is_some()),
                ("reference_audio_url", options.reference_audio_url.is_some()),
                ("test_mode", options.test_mode),
            ],
        );

        let aspect_ratio = Self::aspect_ratio(options.aspect_ratio.as_deref());
        let request = PredictRequest {
            instances: vec![ImagenInstance { prompt }],
            parameters: ImagenParameters {
                sample_count: 1,
                aspect_ratio,
                negative_prompt: options.negative_prompt(),
                seed: options.seed,
            },
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

        let (image, mime_type) = decode_first_prediction(Self::NAME, response.predictions)?;
        let extension = storage::extension_for_mime(mime_type.as_deref(), "png");

        let path = storage::resolve_output_path(
            &self.output_dir,
            Self::NAME,
            extension,
            options.output_path.as_deref(),
        );
        let path = storage::save_media(&path, &image).await?;
        info!("Imagen: saved to {}", path.display());

        let mut metadata = Metadata::new();
        metadata.insert("prompt".to_string(), prompt.into());
        metadata.insert("aspect_ratio".to_string(), aspect_ratio.into());
        metadata.insert("model".to_string(), self.model.clone().into());
        metadata.insert("mime_type".to_string(), mime_type.into());

        Ok(
            GenerationResult::saved(Self::NAME, ContentType::Image, path, image)
                .with_metadata(metadata)
                .with_generation_time_ms(elapsed_ms(started)),
        )
    }
}

#[async_trait]
impl GenerativeProvider for ImagenImageProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn content_type(&self) -> ContentType {
        ContentType::Image
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> CoreResult<GenerationResult> {
        info!("Imagen: generating image from prompt: {}", prompt_preview(prompt));
        self.run(prompt, options)
            .await
            .map_err(|e| boundary_error(Self::NAME, e))
    }
}
