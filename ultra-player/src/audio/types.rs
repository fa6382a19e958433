//! Core audio data types
//!
//! Defines the in-memory track and the frames handed to the output device.

/// Fully decoded track held in RAM.
///
/// **Format:**
/// - Samples are f32 (floating point -1.0 to 1.0)
/// - Stereo interleaved: [L, R, L, R, ...]
/// - Sample rate is the output device rate after resampling
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// PCM audio samples (interleaved stereo)
    pub samples: Vec<f32>,

    /// Sample rate of `samples`
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// Number of stereo frames
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    /// Get duration in milliseconds
    pub fn duration_ms(&self) -> i64 {
        self.frame_to_ms(self.frames())
    }

    /// Get audio frame at specific frame index
    pub fn frame(&self, frame_index: usize) -> Option<AudioFrame> {
        let sample_index = frame_index.checked_mul(2)?;
        let end = sample_index.checked_add(2)?;
        match self.samples.get(sample_index..end) {
            Some(&[left, right]) => Some(AudioFrame { left, right }),
            _ => None,
        }
    }

    /// Frame index for a position, clamped to `0..=frames()`
    pub fn ms_to_frame(&self, position_ms: i64) -> usize {
        if position_ms <= 0 || self.sample_rate == 0 {
            return 0;
        }
        let frame = (position_ms as u128 * self.sample_rate as u128) / 1000;
        usize::try_from(frame).unwrap_or(usize::MAX).min(self.frames())
    }

    /// Position in milliseconds of a frame index
    pub fn frame_to_ms(&self, frame_index: usize) -> i64 {
        if self.sample_rate == 0 {
            return 0;
        }
        let ms = (frame_index as u128 * 1000) / self.sample_rate as u128;
        i64::try_from(ms).unwrap_or(i64::MAX)
    }
}

/// AudioFrame represents a single stereo sample (one frame of audio).
///
/// Used for passing audio data between the playhead and output device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFrame {
    /// Left channel sample
    pub left: f32,

    /// Right channel sample
    pub right: f32,
}

impl AudioFrame {
    /// Create a silent frame (0.0, 0.0)
    pub fn zero() -> Self {
        AudioFrame { left: 0.0, right: 0.0 }
    }

    /// Create a frame from left and right samples
    pub fn from_stereo(left: f32, right: f32) -> Self {
        AudioFrame { left, right }
    }

    /// Apply volume scaling to both channels
    pub fn apply_volume(&mut self, volume: f32) {
        self.left *= volume;
        self.right *= volume;
    }

    /// Clamp samples to valid range [-1.0, 1.0] to prevent clipping
    pub fn clamp(&mut self) {
        self.left = self.left.clamp(-1.0, 1.0);
        self.right = self.right.clamp(-1.0, 1.0);
    }
}
