/// Sound identifiers and decoded audio buffers
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_SOUND_ID: AtomicU64 = AtomicU64::new(0);

/// Caller-assigned sound identifier
///
/// Several players may share an id; the bank keys its registries on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SoundId(String);

impl SoundId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id for a sound decoded without one
    pub fn generate() -> Self {
        let n = NEXT_SOUND_ID.fetch_add(1, Ordering::Relaxed);
        Self(format!("sound-{}", n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SoundId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Decoded PCM audio, planar f32 samples
///
/// Immutable once built. Players share it through an `Arc`, so a taken
/// player and the player it came from read the same samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Build from planar channel data. Channels longer than the shortest one
    /// are truncated so every channel has the same frame count.
    pub fn new(sample_rate: u32, mut channels: Vec<Vec<f32>>) -> Self {
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        for channel in &mut channels {
            channel.truncate(frames);
        }
        Self {
            sample_rate,
            channels,
        }
    }

    /// Build from interleaved samples (L, R, L, R, ...)
    pub fn from_interleaved(sample_rate: u32, channel_count: usize, samples: &[f32]) -> Self {
        let channel_count = channel_count.max(1);
        let mut channels = vec![Vec::with_capacity(samples.len() / channel_count); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, sample) in channels.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }
        Self::new(sample_rate, channels)
    }

    /// One silent mono frame, substituted when a sound cannot be decoded
    pub fn silent(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: vec![vec![0.0]],
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of sample frames per channel
    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Playback length at rate 1
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_silent(&self) -> bool {
        self.channels.iter().flatten().all(|s| *s == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sound_id_display() {
        assert_eq!(SoundId::new("meow").to_string(), "meow");
        assert_eq!(SoundId::from("pop").as_str(), "pop");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = SoundId::generate();
        let b = SoundId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("sound-"));
    }

    #[test]
    fn test_interleaved_split() {
        let buffer = AudioBuffer::from_interleaved(8000, 2, &[0.1, -0.1, 0.2, -0.2, 0.3, -0.3]);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frames(), 3);
        assert_eq!(buffer.channel(0), Some(&[0.1, 0.2, 0.3][..]));
        assert_eq!(buffer.channel(1), Some(&[-0.1, -0.2, -0.3][..]));
    }

    #[test]
    fn test_uneven_channels_truncate() {
        let buffer = AudioBuffer::new(100, vec![vec![0.5; 10], vec![0.5; 7]]);
        assert_eq!(buffer.frames(), 7);
        assert_eq!(buffer.channel(0).map(<[f32]>::len), Some(7));
    }

    #[test]
    fn test_duration() {
        let buffer = AudioBuffer::new(44100, vec![vec![0.0; 8820]]);
        assert!((buffer.duration_secs() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_silent_buffer() {
        let buffer = AudioBuffer::silent(22050);
        assert_eq!(buffer.channel_count(), 1);
        assert_eq!(buffer.frames(), 1);
        assert!(buffer.is_silent());
    }
}
