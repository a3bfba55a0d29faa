//! Settings
//!
//! Provider credentials, endpoints and output locations.
//!
//! Settings are layered:
//! - Built-in defaults for every field
//! - An optional YAML file deep-merged over the defaults
//! - Environment variables for credentials and the output directory
//!
//! The merged result is normalized so out-of-range values never reach the
//! provider adapters. Settings are passed explicitly to each adapter; there is
//! no process-wide instance.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::{CoreError, CoreResult};

/// Default directory for generated media
pub const DEFAULT_OUTPUT_DIR: &str = "exports";

/// Environment variable overriding the output directory
pub const ENV_OUTPUT_DIR: &str = "AI_CONTENT_OUTPUT_DIR";

/// Environment variables for the Google API key, in lookup order
pub const ENV_GOOGLE_API_KEYS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Environment variable for the Loudly API key
pub const ENV_LOUDLY_API_KEY: &str = "LOUDLY_API_KEY";

/// Environment variable for the Kling access key
pub const ENV_KLING_ACCESS_KEY: &str = "KLING_ACCESS_KEY";

/// Environment variable for the Kling secret key
pub const ENV_KLING_SECRET_KEY: &str = "KLING_SECRET_KEY";

const MIN_TIMEOUT_SECS: u64 = 1;
const MAX_TIMEOUT_SECS: u64 = 3600;
const MIN_POLL_INTERVAL_MS: u64 = 100;
const MAX_POLL_INTERVAL_MS: u64 = 60_000;
const MAX_POLL_ATTEMPTS: u32 = 1000;

// =============================================================================
// Settings
// =============================================================================

/// Top-level settings shared by all providers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Directory generated files are written to when no explicit path is given
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory for rolling log files (CLI only; `None` disables file logging)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Google (Lyria, Veo, Imagen) settings
    #[serde(default)]
    pub google: GoogleSettings,

    /// Loudly settings
    #[serde(default)]
    pub loudly: LoudlySettings,

    /// Kling settings
    #[serde(default)]
    pub kling: KlingSettings,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            log_dir: None,
            google: GoogleSettings::default(),
            loudly: LoudlySettings::default(),
            kling: KlingSettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from defaults, an optional YAML file and the environment.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut settings = match path {
            Some(path) => {
                let overlay = load_yaml_config(path)?;
                info!("Loaded configuration from {}", path.display());
                Self::from_yaml_value(overlay)?
            }
            None => Self::default(),
        };

        settings.apply_env();
        settings.normalize();
        Ok(settings)
    }

    /// Parses YAML text and merges it over the defaults. The environment is not consulted.
    pub fn from_yaml_str(yaml: &str) -> CoreResult<Self> {
        let overlay = parse_yaml(yaml)?;
        let mut settings = Self::from_yaml_value(overlay)?;
        settings.normalize();
        Ok(settings)
    }

    fn from_yaml_value(overlay: Value) -> CoreResult<Self> {
        let defaults = serde_yaml::to_value(Self::default())
            .map_err(|e| CoreError::Config(format!("Failed to serialize defaults: {}", e)))?;
        let merged = merge_configs(defaults, overlay);
        serde_yaml::from_value(merged)
            .map_err(|e| CoreError::Config(format!("Invalid configuration: {}", e)))
    }

    /// Applies overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Applies overrides using a custom variable lookup.
    ///
    /// Blank values are ignored so an empty variable never clears a configured key.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = ENV_GOOGLE_API_KEYS.iter().find_map(|&k| get(k)) {
            debug!("Google API key taken from environment");
            self.google.api_key = Some(key);
        }
        if let Some(key) = get(ENV_LOUDLY_API_KEY) {
            debug!("Loudly API key taken from environment");
            self.loudly.api_key = Some(key);
        }
        if let Some(key) = get(ENV_KLING_ACCESS_KEY) {
            self.kling.access_key = Some(key);
        }
        if let Some(key) = get(ENV_KLING_SECRET_KEY) {
            self.kling.secret_key = Some(key);
        }
        if let Some(dir) = get(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
        }
    }

    /// Normalizes and clamps settings so adapters always see valid values.
    ///
    /// Tolerant: bad values are corrected instead of rejected.
    pub fn normalize(&mut self) {
        if self.output_dir.as_os_str().is_empty() {
            self.output_dir = default_output_dir();
        }

        non_blank(&mut self.google.api_key);
        self.google.base_url = normalize_base_url(&self.google.base_url, DEFAULT_GOOGLE_BASE_URL);
        self.google.request_timeout = clamp_timeout(self.google.request_timeout);
        self.google.poll_interval_ms = clamp_poll_interval(self.google.poll_interval_ms);
        self.google.max_poll_attempts = self.google.max_poll_attempts.clamp(1, MAX_POLL_ATTEMPTS);

        non_blank(&mut self.loudly.api_key);
        self.loudly.base_url = normalize_base_url(&self.loudly.base_url, DEFAULT_LOUDLY_BASE_URL);
        self.loudly.request_timeout = clamp_timeout(self.loudly.request_timeout);

        non_blank(&mut self.kling.access_key);
        non_blank(&mut self.kling.secret_key);
        self.kling.base_url = normalize_base_url(&self.kling.base_url, DEFAULT_KLING_BASE_URL);
        self.kling.request_timeout = clamp_timeout(self.kling.request_timeout);
        self.kling.poll_interval_ms = clamp_poll_interval(self.kling.poll_interval_ms);
        self.kling.max_poll_attempts = self.kling.max_poll_attempts.clamp(1, MAX_POLL_ATTEMPTS);
    }
}

fn non_blank(value: &mut Option<String>) {
    if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
        *value = None;
    }
}

fn clamp_timeout(secs: u64) -> u64 {
    secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS)
}

fn clamp_poll_interval(ms: u64) -> u64 {
    ms.clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS)
}

fn normalize_base_url(url: &str, fallback: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        warn!("Empty base URL in configuration, using {}", fallback);
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Masks a credential for `Debug` output
fn redacted(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "<redacted>",
        None => "<unset>",
    }
}

// =============================================================================
// Google
// =============================================================================

/// Default Google Generative Language API base URL
pub const DEFAULT_GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Settings for the Google providers (Lyria, Veo, Imagen)
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct GoogleSettings {
    /// API key sent as `x-goog-api-key`
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_google_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_google_timeout")]
    pub request_timeout: u64,

    /// Lyria music model
    #[serde(default = "default_lyria_model")]
    pub lyria_model: String,

    /// Veo video model
    #[serde(default = "default_veo_model")]
    pub veo_model: String,

    /// Imagen image model
    #[serde(default = "default_imagen_model")]
    pub imagen_model: String,

    /// Delay between long-running operation polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum number of polls before giving up
    #[serde(default = "default_google_poll_attempts")]
    pub max_poll_attempts: u32,
}

fn default_google_base_url() -> String {
    DEFAULT_GOOGLE_BASE_URL.to_string()
}

fn default_google_timeout() -> u64 {
    120
}

fn default_lyria_model() -> String {
    "lyria-002".to_string()
}

fn default_veo_model() -> String {
    "veo-3.0-generate-001".to_string()
}

fn default_imagen_model() -> String {
    "imagen-4.0-generate-001".to_string()
}

fn default_poll_interval_ms() -> u64 {
    10_000
}

fn default_google_poll_attempts() -> u32 {
    60
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_google_base_url(),
            request_timeout: default_google_timeout(),
            lyria_model: default_lyria_model(),
            veo_model: default_veo_model(),
            imagen_model: default_imagen_model(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_google_poll_attempts(),
        }
    }
}

impl std::fmt::Debug for GoogleSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSettings")
            .field("api_key", &redacted(&self.api_key))
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("lyria_model", &self.lyria_model)
            .field("veo_model", &self.veo_model)
            .field("imagen_model", &self.imagen_model)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .finish()
    }
}

// =============================================================================
// Loudly
// =============================================================================

/// Default Loudly API base URL
pub const DEFAULT_LOUDLY_BASE_URL: &str = "https://soundtracks.loudly.com/api";

/// Settings for the Loudly music provider
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct LoudlySettings {
    /// API key sent as `API-KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_loudly_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_loudly_timeout")]
    pub request_timeout: u64,
}

fn default_loudly_base_url() -> String {
    DEFAULT_LOUDLY_BASE_URL.to_string()
}

fn default_loudly_timeout() -> u64 {
    120
}

impl Default for LoudlySettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_loudly_base_url(),
            request_timeout: default_loudly_timeout(),
        }
    }
}

impl std::fmt::Debug for LoudlySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoudlySettings")
            .field("api_key", &redacted(&self.api_key))
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

// =============================================================================
// Kling
// =============================================================================

/// Default Kling API base URL
pub const DEFAULT_KLING_BASE_URL: &str = "https://api.klingai.com";

/// Settings for the Kling video provider
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct KlingSettings {
    /// Access key (JWT issuer)
    #[serde(default)]
    pub access_key: Option<String>,

    /// Secret key used to sign request tokens
    #[serde(default)]
    pub secret_key: Option<String>,

    /// API base URL
    #[serde(default = "default_kling_base_url")]
    pub base_url: String,

    /// Model name sent with each task
    #[serde(default = "default_kling_model")]
    pub model: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_kling_timeout")]
    pub request_timeout: u64,

    /// Delay between task status polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum number of polls before giving up
    #[serde(default = "default_kling_poll_attempts")]
    pub max_poll_attempts: u32,
}

fn default_kling_base_url() -> String {
    DEFAULT_KLING_BASE_URL.to_string()
}

fn default_kling_model() -> String {
    "kling-v1".to_string()
}

fn default_kling_timeout() -> u64 {
    60
}

fn default_kling_poll_attempts() -> u32 {
    90
}

impl Default for KlingSettings {
    fn default() -> Self {
        Self {
            access_key: None,
            secret_key: None,
            base_url: default_kling_base_url(),
            model: default_kling_model(),
            request_timeout: default_kling_timeout(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_kling_poll_attempts(),
        }
    }
}

impl std::fmt::Debug for KlingSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KlingSettings")
            .field("access_key", &redacted(&self.access_key))
            .field("secret_key", &redacted(&self.secret_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .finish()
    }
}

// =============================================================================
// YAML Loading
// =============================================================================

/// Reads a YAML configuration file into an untyped value.
///
/// An empty file yields an empty mapping.
pub fn load_yaml_config(path: &Path) -> CoreResult<Value> {
    let content = fs::read_to_string(path)?;
    parse_yaml(&content).map_err(|e| match e {
        CoreError::Config(msg) => CoreError::Config(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

fn parse_yaml(content: &str) -> CoreResult<Value> {
    let value: Value = serde_yaml::from_str(content)
        .map_err(|e| CoreError::Config(format!("Failed to parse YAML: {}", e)))?;

    match value {
        Value::Null => Ok(Value::Mapping(serde_yaml::Mapping::new())),
        Value::Mapping(_) => Ok(value),
        _ => Err(CoreError::Config(
            "Top-level configuration must be a mapping".to_string(),
        )),
    }
}

/// Deep-merges `overlay` into `base`.
///
/// Mappings merge key by key, recursively. Any other overlay value replaces the
/// base value, except `null`, which leaves the base untouched.
pub fn merge_configs(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(mut base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(existing) => merge_configs(existing, value),
                    None => value,
                };
                base_map.insert(key, merged);
            }
            Value::Mapping(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}
