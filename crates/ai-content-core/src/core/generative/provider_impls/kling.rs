//! Kling Video Provider
//!
//! Text-to-video through the Kling API. Every request carries a freshly signed
//! HS256 token from the access/secret key pair. A call creates a task and polls
//! it until it succeeds or fails.

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::core::generative::http;
use crate::core::generative::options::{warn_unsupported, GenerationOptions};
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

/// Lifetime of a signed API token
pub const TOKEN_TTL_SECS: i64 = 1800;

/// Clock skew allowance applied to `nbf`
pub const TOKEN_LEEWAY_SECS: i64 = 5;

/// Clip lengths Kling renders
pub const SUPPORTED_DURATIONS: [u32; 2] = [5, 10];

pub const DEFAULT_ASPECT_RATIO: &str = "16:9";
pub const SUPPORTED_ASPECT_RATIOS: &[&str] = &["16:9", "9:16", "1:1"];

const FILE_EXTENSION: &str = "mp4";

// =============================================================================
// API Request/Response Types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    exp: i64,
    nbf: i64,
}

#[derive(Debug, Serialize)]
struct Text2VideoRequest<'a> {
    model_name: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
    duration: String,
    aspect_ratio: &'a str,
}

/// Response envelope shared by every Kling endpoint
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TaskData {
    task_id: String,
    #[serde(default)]
    task_status: TaskStatus,
    #[serde(default)]
    task_status_msg: Option<String>,
    #[serde(default)]
    task_result: Option<TaskResult>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TaskStatus {
    #[default]
    Submitted,
    Processing,
    Succeed,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct TaskResult {
    #[serde(default)]
    videos: Vec<TaskVideo>,
}

#[derive(Debug, Deserialize)]
struct TaskVideo {
    #[serde(default)]
    url: Option<String>,
}

impl<T> Envelope<T> {
    /// Unwraps `data`, treating a non-zero code as a provider error
    fn into_data(self, provider: &str) -> CoreResult<T> {
        if self.code != 0 {
            return Err(CoreError::provider(
                provider,
                format!(
                    "API error code {}: {}",
                    self.code,
                    self.message.unwrap_or_default()
                ),
            ));
        }
        self.data
            .ok_or_else(|| CoreError::provider(provider, "Response contained no data"))
    }
}

// =============================================================================
// KlingVideoProvider
// =============================================================================

/// Kling video generation provider
pub struct KlingVideoProvider {
    access_key: String,
    secret_key: String,
    base_url: String,
    model: String,
    request_timeout: u64,
    poll_interval: Duration,
    max_poll_attempts: u32,
    output_dir: PathBuf,
}

impl std::fmt::Debug for KlingVideoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KlingVideoProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .finish_non_exhaustive()
    }
}

impl KlingVideoProvider {
    pub const NAME: &'static str = "kling";

    /// Creates the provider; both keys must be configured
    pub fn new(settings: &Settings) -> CoreResult<Self> {
        let cfg = &settings.kling;
        let present = |v: &Option<String>| v.clone().filter(|k| !k.trim().is_empty());
        let (Some(access_key), Some(secret_key)) = (present(&cfg.access_key), present(&cfg.secret_key))
        else {
            return Err(CoreError::authentication(Self::NAME));
        };

        Ok(Self {
            access_key,
            secret_key,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            request_timeout: cfg.request_timeout,
            poll_interval: Duration::from_millis(cfg.poll_interval_ms),
            max_poll_attempts: cfg.max_poll_attempts.max(1),
            output_dir: settings.output_dir.clone(),
        })
    }

    fn submit_url(&self) -> String {
        format!("{}/v1/videos/text2video", self.base_url)
    }

    fn task_url(&self, task_id: &str) -> String {
        format!("{}/v1/videos/text2video/{}", self.base_url, task_id)
    }

    /// Signs a bearer token valid for [`TOKEN_TTL_SECS`]
    fn sign_token(&self, now: i64) -> CoreResult<String> {
        let claims = Claims {
            iss: self.access_key.clone(),
            exp: now + TOKEN_TTL_SECS,
            nbf: now - TOKEN_LEEWAY_SECS,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret_key.as_bytes()),
        )
        .map_err(|e| CoreError::provider(Self::NAME, format!("Failed to sign token: {}", e)))
    }

    /// Attaches a token signed at `now`; each request gets its own
    fn authorized(
        &self,
        request: reqwest::RequestBuilder,
        now: i64,
    ) -> CoreResult<reqwest::RequestBuilder> {
        Ok(request.bearer_auth(self.sign_token(now)?))
    }

    /// Snaps a requested length to the nearest supported clip length
    fn effective_duration(requested: Option<u32>) -> u32 {
        let Some(requested) = requested else {
            return SUPPORTED_DURATIONS[0];
        };
        let snapped = SUPPORTED_DURATIONS
            .iter()
            .copied()
            .min_by_key(|d| d.abs_diff(requested))
            .unwrap_or(SUPPORTED_DURATIONS[0]);
        if snapped != requested {
            warn!(
                "kling: duration {} not supported, using {}",
                requested, snapped
            );
        }
        snapped
    }

    fn aspect_ratio(requested: Option<&str>) -> &str {
        match requested.map(str::trim) {
            None => DEFAULT_ASPECT_RATIO,
            Some(ratio) if SUPPORTED_ASPECT_RATIOS.iter().any(|r| *r == ratio) => ratio,
            Some(ratio) => {
                warn!(
                    "kling: aspect ratio '{}' not supported, using {}",
                    ratio, DEFAULT_ASPECT_RATIO
                );
                DEFAULT_ASPECT_RATIO
            }
        }
    }

    /// Polls the task until it reaches a terminal status and returns the video URL
    async fn wait_for_video(
        &self,
        client: &reqwest::Client,
        task_id: &str,
    ) -> CoreResult<String> {
        for attempt in 1..=self.max_poll_attempts {
            tokio::time::sleep(self.poll_interval).await;

            let request = self.authorized(
                client.get(self.task_url(task_id)),
                chrono::Utc::now().timestamp(),
            )?;
            let envelope: Envelope<TaskData> = http::send_json(Self::NAME, request).await?;
            let task = envelope.into_data(Self::NAME)?;
            debug!(
                "kling: task {} is {:?} (attempt {})",
                task_id, task.task_status, attempt
            );

            match task.task_status {
                TaskStatus::Succeed => {
                    return task
                        .task_result
                        .and_then(|r| r.videos.into_iter().next())
                        .and_then(|v| v.url)
                        .filter(|url| !url.is_empty())
                        .ok_or_else(|| {
                            CoreError::provider(Self::NAME, "Task succeeded without a video URL")
                        });
                }
                TaskStatus::Failed => {
                    return Err(CoreError::provider(
                        Self::NAME,
                        format!(
                            "Task {} failed: {}",
                            task_id,
                            task.task_status_msg.unwrap_or_default()
                        ),
                    ));
                }
                TaskStatus::Submitted | TaskStatus::Processing | TaskStatus::Unknown => {}
            }
        }

        Err(CoreError::provider(
            Self::NAME,
            format!(
                "Task {} did not finish after {} polls",
                task_id, self.max_poll_attempts
            ),
        ))
    }

    async fn run(&self, prompt: &str, options: &GenerationOptions) -> CoreResult<GenerationResult> {
        let started = Instant::now();
        warn_unsupported(
            Self::NAME,
            &[
                ("bpm", options.bpm.is_some()),
                ("lyrics", options.lyrics.is_some()),
                ("reference_audio_url", options.reference_audio_url.is_some()),
                ("seed", options.seed.is_some()),
                ("test_mode", options.test_mode),
            ],
        );

        let duration = Self::effective_duration(options.duration_seconds);
        let aspect_ratio = Self::aspect_ratio(options.aspect_ratio.as_deref());
        let request = Text2VideoRequest {
            model_name: &self.model,
            prompt,
            negative_prompt: options.negative_prompt(),
            duration: duration.to_string(),
            aspect_ratio,
        };

        let client = http::build_client(Self::NAME, self.request_timeout)?;

        let submit = self.authorized(
            client.post(self.submit_url()).json(&request),
            chrono::Utc::now().timestamp(),
        )?;
        let envelope: Envelope<TaskData> = http::send_json(Self::NAME, submit).await?;
        let task = envelope.into_data(Self::NAME)?;
        info!("Kling: submitted task {}", task.task_id);

        let video_url = self.wait_for_video(&client, &task.task_id).await?;
        let video = http::download(Self::NAME, &client, &video_url, &[]).await?;

        let path = storage::resolve_output_path(
            &self.output_dir,
            Self::NAME,
            FILE_EXTENSION,
            options.output_path.as_deref(),
        );
        let path = storage::save_media(&path, &video).await?;
        info!("Kling: saved to {}", path.display());

        let mut metadata = Metadata::new();
        metadata.insert("prompt".to_string(), prompt.into());
        metadata.insert("duration".to_string(), duration.into());
        metadata.insert("aspect_ratio".to_string(), aspect_ratio.into());
        metadata.insert("kling_task_id".to_string(), task.task_id.into());
        metadata.insert("model".to_string(), self.model.clone().into());

        Ok(
            GenerationResult::saved(Self::NAME, ContentType::Video, path, video)
                .with_metadata(metadata)
                .with_generation_time_ms(elapsed_ms(started)),
        )
    }
}

#[async_trait]
impl GenerativeProvider for KlingVideoProvider {
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
        info!("Kling: generating video from prompt: {}", prompt_preview(prompt));
        self.run(prompt, options)
            .await
            .map_err(|e| boundary_error(Self::NAME, e))
    }
}
