//! Concrete vendor adapters

mod google;
pub mod imagen;
pub mod kling;
pub mod loudly;
pub mod lyria;
pub mod veo;

pub use imagen::ImagenImageProvider;
pub use kling::KlingVideoProvider;
pub use loudly::LoudlyMusicProvider;
pub use lyria::LyriaMusicProvider;
pub use veo::VeoVideoProvider;
