//! Audio pipeline: symphonia decode, rubato resample, cpal output

pub mod decoder;
pub mod device;
pub mod output;
pub mod resampler;
pub mod types;

pub use decoder::SimpleDecoder;
pub use device::{DeviceEngine, Playhead};
pub use output::AudioOutput;
pub use resampler::Resampler;
pub use types::{AudioFrame, DecodedAudio};
