//! AI Content Core Library
//!
//! Thin client for generating music, video and images through hosted
//! providers (Google Lyria/Veo/Imagen, Loudly, Kling). Every provider is
//! looked up by content type and name, reads its credentials from
//! [`Settings`], calls the vendor API and writes the media to disk.
//!
//! ```no_run
//! use ai_content_core::{ContentType, GenerationOptions, GenerativeEngine, Settings};
//!
//! # async fn run() -> ai_content_core::CoreResult<()> {
//! let engine = GenerativeEngine::from_settings(Settings::load(None)?);
//! let result = engine
//!     .generate(
//!         ContentType::Music,
//!         "loudly",
//!         "warm lofi beat",
//!         &GenerationOptions::new().with_duration(60),
//!     )
//!     .await?;
//! println!("{:?}", result.file_path());
//! # Ok(())
//! # }
//! ```

pub mod core;

pub use crate::core::generative::{
    ContentType, GenerationOptions, GenerationResult, GenerativeEngine, GenerativeProvider,
    ProviderFactory, ProviderRegistry,
};
pub use crate::core::settings::Settings;
pub use crate::core::{CoreError, CoreResult};
