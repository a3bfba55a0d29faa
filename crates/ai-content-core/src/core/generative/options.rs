//! Generation Options
//!
//! Optional knobs passed alongside a prompt. Each provider reads the options it
//! understands and logs a warning for the ones it ignores.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;

/// Options bag shared by all providers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Requested length of the output in seconds
    pub duration_seconds: Option<u32>,
    /// Tempo hint for music
    pub bpm: Option<u32>,
    /// Lyrics for vocal music
    pub lyrics: Option<String>,
    /// URL of an audio clip to condition music generation on
    pub reference_audio_url: Option<String>,
    /// Explicit destination path; a timestamped name in the output dir otherwise
    pub output_path: Option<PathBuf>,
    /// Ask the vendor for a non-billed test render where supported
    pub test_mode: bool,
    /// Content to steer away from
    pub negative_prompt: Option<String>,
    /// Aspect ratio for visual output (e.g. "16:9")
    pub aspect_ratio: Option<String>,
    /// Seed for reproducible output
    pub seed: Option<u64>,
    /// Provider-specific extras
    pub extra: HashMap<String, serde_json::Value>,
}

impl GenerationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    pub fn with_bpm(mut self, bpm: u32) -> Self {
        self.bpm = Some(bpm);
        self
    }

    pub fn with_lyrics(mut self, lyrics: impl Into<String>) -> Self {
        self.lyrics = Some(lyrics.into());
        self
    }

    pub fn with_reference_audio_url(mut self, url: impl Into<String>) -> Self {
        self.reference_audio_url = Some(url.into());
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative_prompt.into());
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(aspect_ratio.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets a provider-specific extra value
    pub fn with_extra<T: Serialize>(mut self, key: impl Into<String>, value: T) -> Self {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(v) => {
                self.extra.insert(key, v);
            }
            Err(e) => warn!(
                "Extra option '{}' could not be serialized and was ignored: {}",
                key, e
            ),
        }
        self
    }

    /// Reads a provider-specific extra value
    pub fn get_extra<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.extra
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Negative prompt, if set and not blank
    pub fn negative_prompt(&self) -> Option<&str> {
        self.negative_prompt
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Clamps `value` into `[min, max]`, warning when it had to move
pub(crate) fn clamp_with_warning(provider: &str, option: &str, value: u32, min: u32, max: u32) -> u32 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!(
            "{}: {} {} outside supported range [{}, {}], using {}",
            provider, option, value, min, max, clamped
        );
    }
    clamped
}

/// Logs each option the provider does not understand
pub(crate) fn warn_unsupported(provider: &str, options: &[(&str, bool)]) {
    for (name, present) in options {
        if *present {
            warn!("{}: option '{}' is not supported and was ignored", provider, name);
        }
    }
}
