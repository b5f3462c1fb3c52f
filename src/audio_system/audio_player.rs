/// Per-entity audio player
///
/// Gives one entity (a sprite, a stage) its own effect chain that every
/// sound it plays is routed through:
///
/// ```text
/// SoundPlayer ─┐
/// SoundPlayer ─┼──> EffectChain (pan, pitch, volume) ──> engine input
/// SoundPlayer ─┘
/// ```
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;

use super::backend::NodeId;
use super::completion::Completion;
use super::effects::{EffectChain, EffectKind};
use super::engine::AudioEngine;
use super::player::{SharedPlayer, SoundPlayer};
use super::source::SoundId;

pub struct AudioPlayer {
    engine: AudioEngine,
    effects: EffectChain,
    sound_players: HashMap<SoundId, SharedPlayer>,
    disposed: bool,
}

impl AudioPlayer {
    pub fn new(engine: &AudioEngine) -> Result<Self> {
        let mut player = Self {
            engine: engine.clone(),
            effects: engine.create_effect_chain()?,
            sound_players: HashMap::new(),
            disposed: false,
        };
        player.clear_effects()?;
        Ok(player)
    }

    /// Node other sources can feed to share this entity's effects
    pub fn input_node(&self) -> NodeId {
        self.effects.input_node()
    }

    pub fn effects(&self) -> &EffectChain {
        &self.effects
    }

    pub fn sound_players(&self) -> &HashMap<SoundId, SharedPlayer> {
        &self.sound_players
    }

    pub fn add_sound_player(&mut self, player: SoundPlayer) -> SharedPlayer {
        let id = player.id().clone();
        let shared = player.into_shared();
        self.effects.add_sound_player(Arc::clone(&shared));
        if let Some(old) = self.sound_players.insert(id, Arc::clone(&shared)) {
            self.effects.remove_sound_player(&old);
            old.lock().dispose();
        }
        shared
    }

    /// Play a sound the engine has decoded. Unknown ids are logged and
    /// yield an already resolved completion.
    pub fn play_sound(&mut self, id: &SoundId) -> Result<Completion> {
        if self.disposed {
            tracing::warn!("Ignoring play of {} on a disposed audio player", id);
            return Ok(Completion::resolved());
        }

        let player = match self.sound_players.get(id) {
            Some(player) => Arc::clone(player),
            None => match self.engine.buffer(id) {
                Some(buffer) => {
                    self.add_sound_player(SoundPlayer::new(&self.engine, id.clone(), buffer))
                }
                None => {
                    tracing::warn!("No decoded sound {} for audio player", id);
                    return Ok(Completion::resolved());
                }
            },
        };

        let mut player = player.lock();
        player.connect(self.effects.input_node())?;
        player.play()?;
        Ok(player.finished())
    }

    pub fn stop_all_sounds(&mut self) {
        for (id, player) in &self.sound_players {
            if let Err(err) = player.lock().stop() {
                tracing::warn!("Failed to stop {}: {}", id, err);
            }
        }
    }

    /// Set one of this entity's effects
    pub fn set_effect(&mut self, kind: EffectKind, value: f64) -> Result<()> {
        self.effects.set(kind, value)
    }

    pub fn clear_effects(&mut self) -> Result<()> {
        self.effects.clear()
    }

    /// Volume in the range 0-100
    pub fn set_volume(&mut self, value: f64) -> Result<()> {
        self.set_effect(EffectKind::Volume, value)
    }

    /// Send this entity's output somewhere other than the engine input
    pub fn connect(&mut self, target: NodeId) -> Result<()> {
        self.effects.connect(target)
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.effects.dispose();
        for (_, player) in self.sound_players.drain() {
            player.lock().dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_system::backend::ParamName;
    use crate::audio_system::effects::test_support::simulated_engine;
    use crate::error::AudioError;

    #[test]
    fn test_play_decoded_sound() {
        let (backend, engine) = simulated_engine();
        let mut audio = engine.create_audio_player().unwrap();
        let id = engine.decode_sound(&[]);

        let done = audio.play_sound(&id).unwrap();
        assert_eq!(audio.sound_players().len(), 1);

        let node = audio.sound_players()[&id].lock().output_node().unwrap();
        assert_eq!(backend.lock().outputs_of(node), vec![audio.input_node()]);

        // one silent frame at the default rate ends almost at once
        backend.lock().process_to(0.01);
        engine.process_events();
        assert!(done.is_resolved());
    }

    #[test]
    fn test_unknown_sound_resolves() {
        let (_backend, engine) = simulated_engine();
        let mut audio = engine.create_audio_player().unwrap();
        assert!(audio.play_sound(&SoundId::new("nope")).unwrap().is_resolved());
        assert!(audio.sound_players().is_empty());
    }

    #[test]
    fn test_volume_patches_chain() {
        let (backend, engine) = simulated_engine();
        let mut audio = engine.create_audio_player().unwrap();
        audio.set_volume(25.0).unwrap();
        assert_eq!(audio.effects().hop_count(), 1);

        let gain = audio
            .effects()
            .effect(EffectKind::Volume)
            .and_then(|e| e.nodes())
            .and_then(|n| n.input())
            .unwrap();
        backend.lock().process_to(1.0);
        assert_eq!(backend.lock().param_value(gain, ParamName::Gain), Some(0.25));

        audio.clear_effects().unwrap();
        assert_eq!(audio.effects().hop_count(), 0);
    }

    #[test]
    fn test_players_cannot_feed_each_other() {
        let (_backend, engine) = simulated_engine();
        let mut a = engine.create_audio_player().unwrap();
        let mut b = engine.create_audio_player().unwrap();

        a.connect(b.input_node()).unwrap();
        assert!(matches!(
            b.connect(a.input_node()),
            Err(AudioError::Topology(_))
        ));
        assert!(engine.reaches(a.input_node(), |node| node == engine.input_node()));
    }

    #[test]
    fn test_stop_all_and_dispose() {
        let (backend, engine) = simulated_engine();
        let mut audio = engine.create_audio_player().unwrap();
        let a = engine.decode_sound(&[]);
        let b = engine.decode_sound(&[]);
        audio.play_sound(&a).unwrap();
        audio.play_sound(&b).unwrap();

        audio.stop_all_sounds();
        assert!(audio.sound_players().values().all(|p| !p.lock().is_playing()));

        let input = audio.input_node();
        audio.dispose();
        audio.dispose();
        assert!(!backend.lock().is_live(input));
        assert!(audio.sound_players().is_empty());
    }
}
