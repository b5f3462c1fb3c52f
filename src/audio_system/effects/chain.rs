/// Ordered effect pipeline shared by a group of sound players
///
/// ```text
/// players ──> input_node ──> [effect 0] ──> [effect 1] ──> ... ──> target
/// ```
///
/// Index 0 is nearest the input. Neutral effects are skipped when wiring, so
/// the input node feeds the first patched effect (the head), or the target
/// directly when nothing is patched.
use std::sync::Arc;

use crate::audio_system::backend::{NodeId, NodeKind};
use crate::audio_system::engine::AudioEngine;
use crate::audio_system::owner::SoundOwner;
use crate::audio_system::player::SharedPlayer;
use crate::error::{AudioError, Result};

use super::{Effect, EffectKind};

pub struct EffectChain {
    engine: AudioEngine,
    kinds: Vec<EffectKind>,
    effects: Vec<Effect>,
    input_node: NodeId,
    target: Option<NodeId>,
    head: Option<usize>,
    players: Vec<SharedPlayer>,
    disposed: bool,
}

impl EffectChain {
    pub fn new(engine: &AudioEngine, kinds: &[EffectKind]) -> Self {
        let effects = kinds.iter().map(|kind| Effect::new(engine, *kind)).collect();
        Self {
            engine: engine.clone(),
            kinds: kinds.to_vec(),
            effects,
            input_node: engine.create_node(NodeKind::Gain),
            target: None,
            head: None,
            players: Vec::new(),
            disposed: false,
        }
    }

    /// Node players connect to
    pub fn input_node(&self) -> NodeId {
        self.input_node
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn kinds(&self) -> &[EffectKind] {
        &self.kinds
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn effect(&self, kind: EffectKind) -> Option<&Effect> {
        self.effects.iter().find(|e| e.kind() == kind)
    }

    pub fn value(&self, kind: EffectKind) -> Option<f64> {
        self.effect(kind).map(Effect::value)
    }

    /// Index of the first patched effect
    pub fn head(&self) -> Option<usize> {
        self.head
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn owns(&self, node: NodeId) -> bool {
        node == self.input_node
            || self
                .effects
                .iter()
                .any(|e| e.nodes().is_some_and(|nodes| nodes.contains(node)))
    }

    /// Route the chain's output to `target`. Fails when the signal would
    /// loop back into the chain.
    pub fn connect(&mut self, target: NodeId) -> Result<()> {
        if self.engine.reaches(target, |node| self.owns(node)) {
            return Err(AudioError::Topology(format!(
                "effect chain {} would feed itself through {}",
                self.input_node, target
            )));
        }
        self.target = Some(target);
        self.rewire()
    }

    /// Reconnect every patched effect, last to first, then the input node
    fn rewire(&mut self) -> Result<()> {
        let Some(target) = self.target else {
            return Ok(());
        };
        if self.disposed {
            return Ok(());
        }

        let mut next = target;
        for effect in self.effects.iter_mut().rev() {
            next = effect.connect(next)?;
        }
        self.engine.reroute(self.input_node, next)?;
        self.head = self.effects.iter().position(|e| !e.is_neutral());

        tracing::debug!(
            "Rewired chain {}: head {:?}, {} hop(s)",
            self.input_node,
            self.head,
            self.hop_count()
        );
        Ok(())
    }

    /// Node a predecessor of effect `index` must feed: the effect's own
    /// input when patched, otherwise that of the next patched effect, or the
    /// chain's target.
    pub fn effect_input(&self, index: usize) -> Option<NodeId> {
        self.effects
            .iter()
            .skip(index)
            .find(|e| !e.is_neutral())
            .and_then(|e| e.nodes().and_then(|nodes| nodes.input()))
            .or(self.target)
    }

    /// Nodes between the input node and the target
    pub fn hop_count(&self) -> usize {
        self.effects.iter().map(Effect::hop_count).sum()
    }

    /// Set one effect, rewiring when it starts or stops being neutral.
    /// Kinds the chain was not built with are ignored.
    pub fn set(&mut self, kind: EffectKind, value: f64) -> Result<()> {
        let Some(index) = self.effects.iter().position(|e| e.kind() == kind) else {
            tracing::debug!("Chain has no {} effect, ignoring", kind);
            return Ok(());
        };

        let changed = self.effects[index].set(value)?;
        self.effects[index].update(&self.players);
        if changed {
            self.rewire()?;
        }
        Ok(())
    }

    /// Copy effect values from an owner. Settings win over direct values;
    /// kinds the owner has neither for are left as they are.
    pub fn set_effects_from_owner(&mut self, owner: &dyn SoundOwner) -> Result<()> {
        for kind in self.kinds.clone() {
            let value = owner
                .sound_effects()
                .and_then(|settings| settings.get(kind))
                .or_else(|| owner.effect_value(kind));
            if let Some(value) = value {
                self.set(kind, value)?;
            }
        }
        Ok(())
    }

    /// Start managing a player; it picks up the chain's player-side effects
    pub fn add_sound_player(&mut self, player: SharedPlayer) {
        if self.players.iter().any(|p| Arc::ptr_eq(p, &player)) {
            return;
        }
        self.players.push(player);
        self.update();
    }

    pub fn remove_sound_player(&mut self, player: &SharedPlayer) {
        self.players.retain(|p| !Arc::ptr_eq(p, player));
    }

    pub fn sound_players(&self) -> &[SharedPlayer] {
        &self.players
    }

    /// Push every effect's value to the managed players
    pub fn update(&self) {
        for effect in &self.effects {
            effect.update(&self.players);
        }
    }

    /// Return every effect to its default
    pub fn clear(&mut self) -> Result<()> {
        let mut changed = false;
        for effect in &mut self.effects {
            changed |= effect.clear()?;
        }
        self.update();
        if changed {
            self.rewire()?;
        }
        Ok(())
    }

    /// Fresh chain with the same effect kinds and target, default values
    pub fn clone_chain(&self) -> Result<EffectChain> {
        let mut chain = EffectChain::new(&self.engine, &self.kinds);
        if let Some(target) = self.target {
            chain.connect(target)?;
        }
        Ok(chain)
    }

    /// Release every node. Managed players are left alone.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.players.clear();
        for effect in &mut self.effects {
            effect.dispose();
        }
        self.engine.release(self.input_node);
        self.head = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::audio_system::effects::test_support::simulated_engine;
    use crate::audio_system::owner::{EffectSettings, OwnerId};
    use crate::audio_system::player::SoundPlayer;
    use crate::audio_system::source::{AudioBuffer, SoundId};

    const DEFAULT_KINDS: [EffectKind; 3] = [EffectKind::Pan, EffectKind::Pitch, EffectKind::Volume];

    struct Sprite {
        id: OwnerId,
        settings: Option<EffectSettings>,
        volume: Option<f64>,
    }

    impl SoundOwner for Sprite {
        fn owner_id(&self) -> OwnerId {
            self.id
        }

        fn sound_effects(&self) -> Option<&EffectSettings> {
            self.settings.as_ref()
        }

        fn effect_value(&self, kind: EffectKind) -> Option<f64> {
            match kind {
                EffectKind::Volume => self.volume,
                _ => None,
            }
        }
    }

    fn player(engine: &AudioEngine, id: &str) -> SharedPlayer {
        let buffer = Arc::new(AudioBuffer::new(1000, vec![vec![0.1; 200]]));
        Arc::new(Mutex::new(SoundPlayer::new(engine, SoundId::new(id), buffer)))
    }

    #[test]
    fn test_default_chain_has_no_hops() {
        let (backend, engine) = simulated_engine();
        let chain = engine.create_effect_chain().unwrap();

        assert_eq!(chain.hop_count(), 0);
        assert_eq!(chain.head(), None);
        assert_eq!(
            backend.lock().hops_between(chain.input_node(), engine.input_node()),
            Some(0)
        );
    }

    #[test]
    fn test_patched_effect_adds_one_hop() {
        let (backend, engine) = simulated_engine();
        let mut chain = engine.create_effect_chain().unwrap();

        chain.set(EffectKind::Volume, 40.0).unwrap();
        assert_eq!(chain.head(), Some(2));
        assert_eq!(
            backend.lock().hops_between(chain.input_node(), engine.input_node()),
            Some(1)
        );

        chain.set(EffectKind::Pan, 30.0).unwrap();
        assert_eq!(chain.head(), Some(0));
        assert_eq!(chain.hop_count(), 2);
        assert_eq!(
            backend.lock().hops_between(chain.input_node(), engine.input_node()),
            Some(2)
        );

        chain.clear().unwrap();
        assert_eq!(
            backend.lock().hops_between(chain.input_node(), engine.input_node()),
            Some(0)
        );
    }

    #[test]
    fn test_effect_input_resolves_through_neutral() {
        let (_backend, engine) = simulated_engine();
        let mut chain = engine.create_effect_chain().unwrap();

        assert_eq!(chain.effect_input(0), Some(engine.input_node()));

        chain.set(EffectKind::Volume, 10.0).unwrap();
        let volume_input = chain
            .effect(EffectKind::Volume)
            .and_then(|e| e.nodes())
            .and_then(|n| n.input());
        assert!(volume_input.is_some());
        assert_eq!(chain.effect_input(0), volume_input);
        assert_eq!(chain.effect_input(1), volume_input);
    }

    #[test]
    fn test_connect_to_own_node_fails() {
        let (_backend, engine) = simulated_engine();
        let mut chain = EffectChain::new(&engine, &DEFAULT_KINDS);
        let input = chain.input_node();
        assert!(matches!(
            chain.connect(input),
            Err(AudioError::Topology(_))
        ));
    }

    #[test]
    fn test_connect_into_downstream_chain_fails() {
        let (backend, engine) = simulated_engine();
        let mut first = engine.create_effect_chain().unwrap();
        let mut second = engine.create_effect_chain().unwrap();
        second.set(EffectKind::Volume, 50.0).unwrap();

        first.connect(second.input_node()).unwrap();
        assert!(matches!(
            second.connect(first.input_node()),
            Err(AudioError::Topology(_))
        ));

        // the rejected connect leaves the working route alone
        assert_eq!(
            backend
                .lock()
                .hops_between(first.input_node(), engine.input_node()),
            Some(2)
        );
    }

    #[test]
    fn test_pitch_reaches_every_player() {
        let (_backend, engine) = simulated_engine();
        let mut chain = engine.create_effect_chain().unwrap();
        let a = player(&engine, "a");
        let b = player(&engine, "b");
        chain.add_sound_player(a.clone());
        chain.add_sound_player(b.clone());
        chain.add_sound_player(a.clone());
        assert_eq!(chain.sound_players().len(), 2);

        chain.set(EffectKind::Pitch, 10.0).unwrap();
        let expected = 2f64.powf(1.0 / 12.0);
        assert!((a.lock().playback_rate() - expected).abs() < 1e-12);
        assert!((b.lock().playback_rate() - expected).abs() < 1e-12);

        let c = player(&engine, "c");
        chain.add_sound_player(c.clone());
        assert!((c.lock().playback_rate() - expected).abs() < 1e-12);

        chain.remove_sound_player(&a);
        assert_eq!(chain.sound_players().len(), 2);
    }

    #[test]
    fn test_effects_from_owner() {
        let (_backend, engine) = simulated_engine();
        let mut chain = engine.create_effect_chain().unwrap();

        let mut settings = EffectSettings::default();
        settings.set(EffectKind::Pan, -40.0);
        let sprite = Sprite {
            id: OwnerId(1),
            settings: Some(settings),
            volume: Some(70.0),
        };
        chain.set_effects_from_owner(&sprite).unwrap();

        assert_eq!(chain.value(EffectKind::Pan), Some(-40.0));
        assert_eq!(chain.value(EffectKind::Volume), Some(70.0));
        assert_eq!(chain.value(EffectKind::Pitch), Some(0.0));
    }

    #[test]
    fn test_unknown_kind_ignored() {
        let (_backend, engine) = simulated_engine();
        let mut chain = engine.create_effect_chain().unwrap();
        chain.set(EffectKind::Echo, 50.0).unwrap();
        assert_eq!(chain.value(EffectKind::Echo), None);
        assert_eq!(chain.hop_count(), 0);
    }

    #[test]
    fn test_clone_chain_is_independent() {
        let (backend, engine) = simulated_engine();
        let mut chain = engine.create_effect_chain().unwrap();
        chain.set(EffectKind::Pan, 50.0).unwrap();

        let copy = chain.clone_chain().unwrap();
        assert_ne!(copy.input_node(), chain.input_node());
        assert_eq!(copy.target(), chain.target());
        assert_eq!(copy.value(EffectKind::Pan), Some(0.0));
        assert_eq!(
            backend.lock().hops_between(copy.input_node(), engine.input_node()),
            Some(0)
        );
    }

    #[test]
    fn test_dispose_releases_nodes() {
        let (backend, engine) = simulated_engine();
        let mut chain = engine.create_effect_chain().unwrap();
        chain.set(EffectKind::Volume, 20.0).unwrap();
        let input = chain.input_node();

        chain.dispose();
        chain.dispose();
        assert!(!backend.lock().is_live(input));
        assert!(chain.effects().iter().all(Effect::is_disposed));
        assert!(chain.sound_players().is_empty());
    }
}
