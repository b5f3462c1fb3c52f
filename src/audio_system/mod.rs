pub mod audio_player;
pub mod backend;
pub mod bank;
pub mod bus;
pub mod completion;
pub mod decode;
pub mod effects;
pub mod engine;
pub mod events;
pub mod owner;
pub mod player;
/// Audio system module
///
/// Playback lifecycle and effect routing for sprite sounds:
/// - Click-free stop and restart of sounds (fade out over the decay duration)
/// - Effect chains that add no graph hops while their effects are neutral
/// - Sound banks shared by many owners, where the latest owner wins
///
/// ## Architecture
///
/// ```text
/// AudioEngine (backend, master input, decoded buffers)
///   ├── SoundBank
///   │     ├── SoundPlayer (meow) ──> EffectChain (meow) ─┐
///   │     └── SoundPlayer (pop)  ──> EffectChain (pop)  ─┤
///   └── AudioPlayer (per sprite)                          ├──> master input ──> destination
///         └── SoundPlayer ... ──> EffectChain ───────────┘
///
/// Each EffectChain:
///   input ──> [Pan] ──> [Pitch] ──> [Volume] ──> target
///   (neutral effects are skipped; pitch acts on player playback rate)
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// use sprite_audio::audio_system::{AudioEngine, BasicOwner, SimulatedBackend};
///
/// let engine = AudioEngine::new(SimulatedBackend::new(), EngineConfig::default())?;
/// let mut bank = engine.create_bank()?;
/// let meow = engine.decode_sound(&bytes);
///
/// let sprite = BasicOwner::new(1).with_effect(EffectKind::Pitch, 20.0);
/// let done = bank.play_sound(&sprite, &meow)?;
///
/// // Host loop: advance the backend clock, then dispatch ended sounds
/// engine.process_events();
/// ```
pub mod source;
pub mod state;

// Re-export commonly used types
pub use audio_player::AudioPlayer;
pub use backend::{AudioBackend, NodeId, NodeKind, ParamName, SimulatedBackend, SourceState};
pub use bank::SoundBank;
pub use bus::{EventBus, SubscriberId};
pub use completion::Completion;
pub use decode::{DefaultDecoder, SoundDecoder};
pub use effects::{Effect, EffectChain, EffectKind};
pub use engine::{AudioEngine, SharedBackend};
pub use events::PlaybackEvent;
pub use owner::{BasicOwner, EffectSettings, OwnerFilter, OwnerId, SoundOwner};
pub use player::{SharedPlayer, SoundPlayer};
pub use source::{AudioBuffer, SoundId};
pub use state::PlaybackState;
