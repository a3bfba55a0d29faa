//! Generative AI Module
//!
//! Provides AI-powered music, video and image generation:
//! - Provider registry keyed by content type and name
//! - Vendor adapters (Lyria, Loudly, Veo, Kling, Imagen)
//! - Uniform result model with the media persisted to disk

pub mod engine;
pub mod http;
pub mod options;
pub mod provider_impls;
pub mod providers;
pub mod registry;
pub mod result;
pub mod storage;

pub use engine::GenerativeEngine;
pub use options::GenerationOptions;
pub use provider_impls::{
    ImagenImageProvider, KlingVideoProvider, LoudlyMusicProvider, LyriaMusicProvider,
    VeoVideoProvider,
};
pub use providers::{GenerativeProvider, MockGenerativeProvider};
pub use registry::{register_builtin_providers, ProviderFactory, ProviderRegistry};
pub use result::{ContentType, GenerationResult, Metadata};
