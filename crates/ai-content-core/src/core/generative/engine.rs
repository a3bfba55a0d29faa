//! Generative Engine
//!
//! Entry point that resolves a provider by content type and name, builds it
//! from settings and runs the generation.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use super::options::GenerationOptions;
use super::providers::{prompt_preview, GenerativeProvider};
use super::registry::ProviderRegistry;
use super::result::{ContentType, GenerationResult};
use crate::core::settings::Settings;
use crate::core::CoreResult;

/// Default number of results kept in history
const DEFAULT_MAX_HISTORY: usize = 100;

/// Main generative AI engine
pub struct GenerativeEngine {
    registry: Arc<ProviderRegistry>,
    settings: Arc<Settings>,
    /// Recent results, oldest first
    history: Arc<RwLock<Vec<GenerationResult>>>,
    max_history: usize,
}

impl std::fmt::Debug for GenerativeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerativeEngine")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl GenerativeEngine {
    /// Creates an engine over an explicit registry and settings
    pub fn new(registry: ProviderRegistry, settings: Settings) -> Self {
        Self {
            registry: Arc::new(registry),
            settings: Arc::new(settings),
            history: Arc::new(RwLock::new(Vec::new())),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }

    /// Creates an engine with the built-in providers
    pub fn from_settings(settings: Settings) -> Self {
        Self::new(ProviderRegistry::with_builtin_providers(), settings)
    }

    /// Sets how many results the history keeps
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Registered provider names for a content type
    pub fn providers(&self, content_type: ContentType) -> Vec<String> {
        self.registry.names(content_type)
    }

    /// Builds the named provider from the engine settings
    pub fn provider(
        &self,
        content_type: ContentType,
        name: &str,
    ) -> CoreResult<Box<dyn GenerativeProvider>> {
        self.registry.create(content_type, name, &self.settings)
    }

    /// Generates content with a specific provider
    pub async fn generate(
        &self,
        content_type: ContentType,
        provider_name: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> CoreResult<GenerationResult> {
        let provider = self.provider(content_type, provider_name)?;

        info!(
            "Generating {} with '{}': {}",
            content_type,
            provider_name,
            prompt_preview(prompt)
        );

        let result = provider.generate(prompt, options).await?;
        self.add_to_history(result.clone()).await;

        Ok(result)
    }

    async fn add_to_history(&self, result: GenerationResult) {
        let mut history = self.history.write().await;
        history.push(result);

        while history.len() > self.max_history {
            history.remove(0);
        }
    }

    /// Most recent results, newest first
    pub async fn history(&self, limit: usize) -> Vec<GenerationResult> {
        let history = self.history.read().await;
        history.iter().rev().take(limit).cloned().collect()
    }

    pub async fn clear_history(&self) {
        self.history.write().await.clear();
    }
}
