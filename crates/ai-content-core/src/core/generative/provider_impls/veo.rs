//! Google Veo Video Provider
//!
//! Submits a long-running `predictLongRunning` operation, polls it until done
//! and downloads the resulting MP4.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::google;
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

pub const MIN_DURATION_SECS: u32 = 5;
pub const MAX_DURATION_SECS: u32 = 8;
pub const DEFAULT_DURATION_SECS: u32 = 8;

/// Aspect ratios Veo accepts
pub const SUPPORTED_ASPECT_RATIOS: &[&str] = &["16:9", "9:16"];
pub const DEFAULT_ASPECT_RATIO: &str = "16:9";

const FILE_EXTENSION: &str = "mp4";

// =============================================================================
// API Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
struct LongRunningRequest<'a> {
    instances: Vec<VeoInstance<'a>>,
    parameters: VeoParameters<'a>,
}

#[derive(Debug, Serialize)]
struct VeoInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoParameters<'a> {
    aspect_ratio: &'a str,
    duration_seconds: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationError>,
    #[serde(default)]
    response: Option<OperationResponse>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    #[serde(default)]
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    #[serde(default)]
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    #[serde(default)]
    uri: Option<String>,
}

impl Operation {
    /// Video URI of a finished operation, or the reason there is none
    fn video_uri(self, provider: &str) -> CoreResult<String> {
        if let Some(err) = self.error {
            return Err(CoreError::provider(
                provider,
                format!(
                    "Operation {} failed (code {}): {}",
                    self.name,
                    err.code.unwrap_or_default(),
                    err.message.unwrap_or_default()
                ),
            ));
        }

        self.response
            .and_then(|r| r.generate_video_response)
            .and_then(|r| r.generated_samples.into_iter().next())
            .and_then(|s| s.video)
            .and_then(|v| v.uri)
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| CoreError::provider(provider, "No video URI in operation response"))
    }
}

// =============================================================================
// VeoVideoProvider
// =============================================================================

/// Google Veo video generation provider
pub struct VeoVideoProvider {
    api_key: String,
    base_url: String,
    model: String,
    request_timeout: u64,
    poll_interval: Duration,
    max_poll_attempts: u32,
    output_dir: PathBuf,
}

impl std::fmt::Debug for VeoVideoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VeoVideoProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("poll_interval", &self.poll_interval)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .finish_non_exhaustive()
    }
}

impl VeoVideoProvider {
    pub const NAME: &'static str = "veo";

    pub fn new(settings: &Settings) -> CoreResult<Self> {
        let cfg = &settings.google;
        let api_key = google::require_api_key(cfg, Self::NAME)?;

        Ok(Self {
            api_key,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.veo_model.clone(),
            request_timeout: cfg.request_timeout,
            poll_interval: Duration::from_millis(cfg.poll_interval_ms),
            max_poll_attempts: cfg.max_poll_attempts.max(1),
            output_dir: settings.output_dir.clone(),
        })
    }

    fn submit_url(&self) -> String {
        format!("{}/models/{}:predictLongRunning", self.base_url, self.model)
    }

    fn operation_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name.trim_start_matches('/'))
    }

    fn aspect_ratio(requested: Option<&str>) -> &str {
        match requested.map(str::trim) {
            None => DEFAULT_ASPECT_RATIO,
            Some(ratio) if SUPPORTED_ASPECT_RATIOS.iter().any(|r| *r == ratio) => ratio,
            Some(ratio) => {
                warn!(
                    "veo: aspect ratio '{}' not supported, using {}",
                    ratio, DEFAULT_ASPECT_RATIO
                );
                DEFAULT_ASPECT_RATIO
            }
        }
    }

    fn effective_duration(requested: Option<u32>) -> u32 {
        clamp_with_warning(
            Self::NAME,
            "duration",
            requested.unwrap_or(DEFAULT_DURATION_SECS),
            MIN_DURATION_SECS,
            MAX_DURATION_SECS,
        )
    }

    /// The API key only goes to file URIs served by the configured API host
    fn download_headers(&self, uri: &str) -> Vec<(&'static str, &str)> {
        if http::same_origin(&self.base_url, uri) {
            vec![(google::API_KEY_HEADER, self.api_key.as_str())]
        } else {
            warn!("veo: video URI is not on {}, downloading without API key", self.base_url);
            Vec::new()
        }
    }

    /// Polls until the operation reports `done` or carries an error
    async fn wait_for_operation(
        &self,
        client: &reqwest::Client,
        mut operation: Operation,
    ) -> CoreResult<Operation> {
        let mut attempts = 0;
        while !operation.done && operation.error.is_none() {
            if attempts >= self.max_poll_attempts {
                return Err(CoreError::provider(
                    Self::NAME,
                    format!(
                        "Operation {} did not finish after {} polls",
                        operation.name, attempts
                    ),
                ));
            }
            attempts += 1;
            tokio::time::sleep(self.poll_interval).await;

            debug!("veo: polling {} (attempt {})", operation.name, attempts);
            operation = http::send_json(
                Self::NAME,
                client
                    .get(self.operation_url(&operation.name))
                    .header(google::API_KEY_HEADER, &self.api_key),
            )
            .await?;
        }
        Ok(operation)
    }

    async fn run(&self, prompt: &str, options: &GenerationOptions) -> CoreResult<GenerationResult> {
        let started = Instant::now();
        warn_unsupported(
            Self::NAME,
            &[
                ("bpm", options.bpm.is_some()),
                ("lyrics", options.lyrics.is_some()),
                ("reference_audio_url", options.reference_audio_url.is_some()),
                ("test_mode", options.test_mode),
            ],
        );

        let duration = Self::effective_duration(options.duration_seconds);
        let aspect_ratio = Self::aspect_ratio(options.aspect_ratio.as_deref());
        let request = LongRunningRequest {
            instances: vec![VeoInstance { prompt }],
            parameters: VeoParameters {
                aspect_ratio,
                duration_seconds: duration,
                negative_prompt: options.negative_prompt(),
                seed: options.seed,
            },
        };

        let client = http::build_client(Self::NAME, self.request_timeout)?;
        let operation: Operation = http::send_json(
            Self::NAME,
            client
                .post(self.submit_url())
                .header(google::API_KEY_HEADER, &self.api_key)
                .json(&request),
        )
        .await?;
        info!("Veo: submitted operation {}", operation.name);

        let operation = self.wait_for_operation(&client, operation).await?;
        let operation_name = operation.name.clone();
        let uri = operation.video_uri(Self::NAME)?;

        let headers = self.download_headers(&uri);
        let video = http::download(Self::NAME, &client, &uri, &headers).await?;

        let path = storage::resolve_output_path(
            &self.output_dir,
            Self::NAME,
            FILE_EXTENSION,
            options.output_path.as_deref(),
        );
        let path = storage::save_media(&path, &video).await?;
        info!("Veo: saved to {}", path.display());

        let mut metadata = Metadata::new();
        metadata.insert("prompt".to_string(), prompt.into());
        metadata.insert("duration".to_string(), duration.into());
        metadata.insert("aspect_ratio".to_string(), aspect_ratio.into());
        metadata.insert("operation".to_string(), operation_name.into());
        metadata.insert("model".to_string(), self.model.clone().into());

        Ok(
            GenerationResult::saved(Self::NAME, ContentType::Video, path, video)
                .with_metadata(metadata)
                .with_generation_time_ms(elapsed_ms(started)),
        )
    }
}

#[async_trait]
impl GenerativeProvider for VeoVideoProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn content_type(&self) -> ContentType {
        ContentType::Video
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> CoreResult<GenerationResult> {
        info!("Veo: generating video from prompt: {}", prompt_preview(prompt));
        self.run(prompt, options)
            .await
            .map_err(|e| boundary_error(Self::NAME, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> VeoVideoProvider {
        let mut settings = Settings::default();
        settings.google.api_key = Some("k".to_string());
        VeoVideoProvider::new(&settings).unwrap()
    }

    #[test]
    fn test_missing_key_is_authentication_error() {
        let err = VeoVideoProvider::new(&Settings::default()).unwrap_err();
        assert!(err.is_authentication());
        assert_eq!(err.provider_name(), Some("veo"));
    }

    #[test]
    fn test_url_building() {
        let provider = provider();
        assert_eq!(
            provider.submit_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/veo-3.0-generate-001:predictLongRunning"
        );
        assert_eq!(
            provider.operation_url("models/veo/operations/abc"),
            "https://generativelanguage.googleapis.com/v1beta/models/veo/operations/abc"
        );
    }

    #[test]
    fn test_api_key_only_sent_to_api_host() {
        let provider = provider();
        let own = provider.download_headers(
            "https://generativelanguage.googleapis.com/v1beta/files/v:download?alt=media",
        );
        assert_eq!(own, vec![("x-goog-api-key", "k")]);

        assert!(provider
            .download_headers("https://storage.example.net/v.mp4")
            .is_empty());
    }

    #[test]
    fn test_duration_and_aspect_ratio() {
        assert_eq!(VeoVideoProvider::effective_duration(None), 8);
        assert_eq!(VeoVideoProvider::effective_duration(Some(2)), 5);
        assert_eq!(VeoVideoProvider::effective_duration(Some(30)), 8);
        assert_eq!(VeoVideoProvider::effective_duration(Some(6)), 6);

        assert_eq!(VeoVideoProvider::aspect_ratio(None), "16:9");
        assert_eq!(VeoVideoProvider::aspect_ratio(Some("9:16")), "9:16");
        assert_eq!(VeoVideoProvider::aspect_ratio(Some("1:1")), "16:9");
    }

    #[test]
    fn test_request_serialization() {
        let request = LongRunningRequest {
            instances: vec![VeoInstance { prompt: "drone shot" }],
            parameters: VeoParameters {
                aspect_ratio: "16:9",
                duration_seconds: 8,
                negative_prompt: None,
                seed: Some(11),
            },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "instances": [{ "prompt": "drone shot" }],
                "parameters": { "aspectRatio": "16:9", "durationSeconds": 8, "seed": 11 }
            })
        );
    }

    #[test]
    fn test_operation_video_uri() {
        let op: Operation = serde_json::from_value(json!({
            "name": "models/veo/operations/1",
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [{ "video": { "uri": "https://files.example/v.mp4" } }]
                }
            }
        }))
        .unwrap();
        assert_eq!(op.video_uri("veo").unwrap(), "https://files.example/v.mp4");
    }

    #[test]
    fn test_operation_error_is_provider_error() {
        let op: Operation = serde_json::from_value(json!({
            "name": "models/veo/operations/2",
            "done": true,
            "error": { "code": 3, "message": "prompt rejected" }
        }))
        .unwrap();
        let err = op.video_uri("veo").unwrap_err();
        assert!(matches!(err, CoreError::Provider { .. }));
        assert!(err.to_string().contains("prompt rejected"));
    }

    #[test]
    fn test_operation_without_samples() {
        let op: Operation = serde_json::from_value(json!({
            "name": "models/veo/operations/3",
            "done": true,
            "response": { "generateVideoResponse": { "generatedSamples": [] } }
        }))
        .unwrap();
        assert!(op.video_uri("veo").is_err());
    }

    #[test]
    fn test_pending_operation_deserialization() {
        let op: Operation =
            serde_json::from_value(json!({ "name": "models/veo/operations/4" })).unwrap();
        assert!(!op.done);
        assert!(op.error.is_none());
    }
}
