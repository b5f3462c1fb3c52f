//! Sound playback and effect routing for sprite-based creative coding.
//!
//! Start with [`audio_system::AudioEngine`]: it decodes sounds, builds effect
//! chains and hands out [`audio_system::SoundBank`]s and per-entity
//! [`audio_system::AudioPlayer`]s.

pub mod audio_system;
pub mod config;
pub mod error;

pub use audio_system::{AudioEngine, EffectKind, SoundBank, SoundId, SoundPlayer};
pub use config::EngineConfig;
pub use error::{AudioError, ConfigError, Result};
