/// Sound bank
///
/// Coordinates sound players shared by many owners. Each sound id has one
/// player and its own effect chain cloned from the bank's prototype. The
/// last owner to play a sound owns it, and a new owner always wins: its play
/// fades out whatever the previous owner started.
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AudioError, Result};

use super::completion::Completion;
use super::effects::EffectChain;
use super::engine::AudioEngine;
use super::owner::{OwnerFilter, OwnerId, SoundOwner};
use super::player::{SharedPlayer, SoundPlayer};
use super::source::SoundId;

pub struct SoundBank {
    engine: AudioEngine,
    sound_players: HashMap<SoundId, SharedPlayer>,
    player_targets: HashMap<SoundId, OwnerId>,
    sound_effects: HashMap<SoundId, EffectChain>,
    prototype: EffectChain,
    disposed: bool,
}

impl SoundBank {
    /// Create a bank whose per-sound chains are cloned from `prototype`
    pub fn new(engine: &AudioEngine, prototype: EffectChain) -> Self {
        Self {
            engine: engine.clone(),
            sound_players: HashMap::new(),
            player_targets: HashMap::new(),
            sound_effects: HashMap::new(),
            prototype,
            disposed: false,
        }
    }

    /// Register a player under its id, replacing (and disposing) any
    /// player already registered there
    pub fn add_sound_player(&mut self, player: SoundPlayer) -> SharedPlayer {
        let id = player.id().clone();
        let shared = player.into_shared();
        if let Some(old) = self.sound_players.insert(id.clone(), Arc::clone(&shared)) {
            if let Some(chain) = self.sound_effects.get_mut(&id) {
                chain.remove_sound_player(&old);
            }
            old.lock().dispose();
        }
        tracing::debug!("Added sound player {} to bank", id);
        shared
    }

    /// Player for `id`. Sounds decoded by the engine but not yet registered
    /// get a player on first use.
    pub fn get_sound_player(&mut self, id: &SoundId) -> Result<SharedPlayer> {
        if let Some(player) = self.sound_players.get(id) {
            return Ok(Arc::clone(player));
        }

        match self.engine.buffer(id) {
            Some(buffer) => {
                let player = SoundPlayer::new(&self.engine, id.clone(), buffer);
                Ok(self.add_sound_player(player))
            }
            None => {
                tracing::warn!("Sound {} is not in the bank", id);
                Err(AudioError::SoundNotFound(id.clone()))
            }
        }
    }

    /// Effect chain for `id`, cloned from the prototype on first use
    pub fn get_sound_effects(&mut self, id: &SoundId) -> Result<&mut EffectChain> {
        match self.sound_effects.entry(id.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(self.prototype.clone_chain()?)),
        }
    }

    /// Owner that last played `id`
    pub fn owner_of(&self, id: &SoundId) -> Option<OwnerId> {
        self.player_targets.get(id).copied()
    }

    pub fn sound_ids(&self) -> impl Iterator<Item = &SoundId> {
        self.sound_players.keys()
    }

    pub fn prototype(&self) -> &EffectChain {
        &self.prototype
    }

    /// Play `id` for `owner` through the sound's chain. A missing sound is
    /// logged and yields an already resolved completion.
    pub fn play_sound(&mut self, owner: &dyn SoundOwner, id: &SoundId) -> Result<Completion> {
        if self.disposed {
            tracing::warn!("Ignoring play of {} on a disposed bank", id);
            return Ok(Completion::resolved());
        }

        let player = match self.get_sound_player(id) {
            Ok(player) => player,
            Err(AudioError::SoundNotFound(_)) => return Ok(Completion::resolved()),
            Err(err) => return Err(err),
        };

        let owner_id = owner.owner_id();
        let handoff = match self.player_targets.insert(id.clone(), owner_id) {
            Some(previous) if previous != owner_id => {
                tracing::debug!("{} takes {} over from {}", owner_id, id, previous);
                player.lock().stop()?;
                true
            }
            _ => false,
        };

        let chain = self.get_sound_effects(id)?;
        chain.add_sound_player(Arc::clone(&player));
        // values the new owner does not set must not carry over
        if handoff {
            chain.clear()?;
        }
        chain.set_effects_from_owner(owner)?;
        let input = chain.input_node();

        let mut player = player.lock();
        player.connect(input)?;
        player.play()?;
        Ok(player.finished())
    }

    /// Re-read effect values for every sound `owner` currently owns
    pub fn set_effects(&mut self, owner: &dyn SoundOwner) -> Result<()> {
        let owner_id = owner.owner_id();
        for (id, target) in &self.player_targets {
            if *target != owner_id {
                continue;
            }
            if let Some(chain) = self.sound_effects.get_mut(id) {
                chain.set_effects_from_owner(owner)?;
            }
        }
        Ok(())
    }

    /// Stop `id` if `owner` is the one that last played it
    pub fn stop(&mut self, owner: OwnerId, id: &SoundId) -> Result<()> {
        if self.player_targets.get(id) != Some(&owner) {
            return Ok(());
        }
        match self.sound_players.get(id) {
            Some(player) => player.lock().stop(),
            None => Ok(()),
        }
    }

    /// Stop every sound whose owner passes `filter`
    pub fn stop_all_sounds(&mut self, filter: OwnerFilter) {
        for (id, owner) in &self.player_targets {
            if !filter.matches(*owner) {
                continue;
            }
            if let Some(player) = self.sound_players.get(id) {
                if let Err(err) = player.lock().stop() {
                    tracing::warn!("Failed to stop {}: {}", id, err);
                }
            }
        }
    }

    /// Dispose every chain and player. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        self.player_targets.clear();
        for (_, mut chain) in self.sound_effects.drain() {
            chain.dispose();
        }
        for (_, player) in self.sound_players.drain() {
            player.lock().dispose();
        }
        self.prototype.dispose();
        tracing::debug!("Sound bank disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
