//! AI Content Core
//!
//! Provider registry, vendor adapters, configuration and error types.

pub mod generative;
pub mod settings;

mod error;
pub use error::*;
