//! Provider Registry
//!
//! Maps `(content type, name)` to a factory that builds the provider from
//! [`Settings`]. Music, video and image names live in separate namespaces.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use super::provider_impls::{
    ImagenImageProvider, KlingVideoProvider, LoudlyMusicProvider, LyriaMusicProvider,
    VeoVideoProvider,
};
use super::providers::GenerativeProvider;
use super::result::ContentType;
use crate::core::settings::Settings;
use crate::core::{CoreError, CoreResult};

/// Builds a provider from settings
pub type ProviderFactory =
    Arc<dyn Fn(&Settings) -> CoreResult<Box<dyn GenerativeProvider>> + Send + Sync>;

/// Registry of provider factories
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    namespaces: HashMap<ContentType, BTreeMap<String, ProviderFactory>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for content_type in ContentType::ALL {
            map.entry(&content_type, &self.names(content_type));
        }
        map.finish()
    }
}

impl ProviderRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in providers
    pub fn with_builtin_providers() -> Self {
        let mut registry = Self::new();
        register_builtin_providers(&mut registry);
        registry
    }

    /// Registers a factory under `name` in the `content_type` namespace
    pub fn register<F>(
        &mut self,
        content_type: ContentType,
        name: impl Into<String>,
        factory: F,
    ) -> CoreResult<()>
    where
        F: Fn(&Settings) -> CoreResult<Box<dyn GenerativeProvider>> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CoreError::Config(
                "Provider name cannot be empty".to_string(),
            ));
        }

        let namespace = self.namespaces.entry(content_type).or_default();
        if namespace.contains_key(&name) {
            return Err(CoreError::ProviderAlreadyRegistered { content_type, name });
        }

        debug!("Registered {} provider '{}'", content_type, name);
        namespace.insert(name, Arc::new(factory));
        Ok(())
    }

    pub fn register_music<F>(&mut self, name: impl Into<String>, factory: F) -> CoreResult<()>
    where
        F: Fn(&Settings) -> CoreResult<Box<dyn GenerativeProvider>> + Send + Sync + 'static,
    {
        self.register(ContentType::Music, name, factory)
    }

    pub fn register_video<F>(&mut self, name: impl Into<String>, factory: F) -> CoreResult<()>
    where
        F: Fn(&Settings) -> CoreResult<Box<dyn GenerativeProvider>> + Send + Sync + 'static,
    {
        self.register(ContentType::Video, name, factory)
    }

    pub fn register_image<F>(&mut self, name: impl Into<String>, factory: F) -> CoreResult<()>
    where
        F: Fn(&Settings) -> CoreResult<Box<dyn GenerativeProvider>> + Send + Sync + 'static,
    {
        self.register(ContentType::Image, name, factory)
    }

    /// Looks up a factory. Repeated lookups return the same factory.
    pub fn get(&self, content_type: ContentType, name: &str) -> CoreResult<ProviderFactory> {
        self.namespaces
            .get(&content_type)
            .and_then(|ns| ns.get(name))
            .cloned()
            .ok_or_else(|| CoreError::ProviderNotFound {
                content_type,
                name: name.to_string(),
            })
    }

    pub fn get_music(&self, name: &str) -> CoreResult<ProviderFactory> {
        self.get(ContentType::Music, name)
    }

    pub fn get_video(&self, name: &str) -> CoreResult<ProviderFactory> {
        self.get(ContentType::Video, name)
    }

    pub fn get_image(&self, name: &str) -> CoreResult<ProviderFactory> {
        self.get(ContentType::Image, name)
    }

    /// Looks up a factory and builds the provider
    pub fn create(
        &self,
        content_type: ContentType,
        name: &str,
        settings: &Settings,
    ) -> CoreResult<Box<dyn GenerativeProvider>> {
        let factory = self.get(content_type, name)?;
        factory(settings)
    }

    pub fn contains(&self, content_type: ContentType, name: &str) -> bool {
        self.namespaces
            .get(&content_type)
            .is_some_and(|ns| ns.contains_key(name))
    }

    /// Registered names for a content type, sorted
    pub fn names(&self, content_type: ContentType) -> Vec<String> {
        self.namespaces
            .get(&content_type)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default()
    }
}

fn boxed<P: GenerativeProvider + 'static>(
    provider: CoreResult<P>,
) -> CoreResult<Box<dyn GenerativeProvider>> {
    Ok(Box::new(provider?))
}

/// Registers the built-in adapters. Names already taken are left alone.
pub fn register_builtin_providers(registry: &mut ProviderRegistry) {
    let results = [
        registry.register_music(LyriaMusicProvider::NAME, |s: &Settings| {
            boxed(LyriaMusicProvider::new(s))
        }),
        registry.register_music(LoudlyMusicProvider::NAME, |s: &Settings| {
            boxed(LoudlyMusicProvider::new(s))
        }),
        registry.register_video(VeoVideoProvider::NAME, |s: &Settings| {
            boxed(VeoVideoProvider::new(s))
        }),
        registry.register_video(KlingVideoProvider::NAME, |s: &Settings| {
            boxed(KlingVideoProvider::new(s))
        }),
        registry.register_image(ImagenImageProvider::NAME, |s: &Settings| {
            boxed(ImagenImageProvider::new(s))
        }),
    ];

    for result in results {
        if let Err(e) = result {
            debug!("Skipping built-in provider: {}", e);
        }
    }
}
