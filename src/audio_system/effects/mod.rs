/// Audio effects module
///
/// Every effect owns zero or more backend nodes. An effect at its default
/// value is neutral: it is bypassed and adds no hops between its predecessor
/// and its target. Setting a non-default value splices its nodes in.
///
/// Effects do not know their predecessor. Whoever owns them (an
/// [`EffectChain`] or a taken sound player) feeds the node returned by
/// [`Effect::connect`].
pub mod chain;
pub mod echo;
pub mod fuzz;
pub mod pan;
pub mod pitch;
pub mod reverb;
pub mod robotic;
pub mod volume;
pub mod wobble;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AudioError, Result};

use super::backend::NodeId;
use super::engine::AudioEngine;
use super::player::SharedPlayer;

pub use chain::EffectChain;
pub use echo::EchoEffect;
pub use fuzz::FuzzEffect;
pub use pan::PanEffect;
pub use pitch::PitchEffect;
pub use reverb::ReverbEffect;
pub use robotic::RoboticEffect;
pub use volume::VolumeEffect;
pub use wobble::WobbleEffect;

/// Effect tags, as they appear in configuration and owner settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    Pan,
    Pitch,
    Volume,
    Reverb,
    Echo,
    Fuzz,
    Robotic,
    Wobble,
}

impl EffectKind {
    pub const ALL: [EffectKind; 8] = [
        EffectKind::Pan,
        EffectKind::Pitch,
        EffectKind::Volume,
        EffectKind::Reverb,
        EffectKind::Echo,
        EffectKind::Fuzz,
        EffectKind::Robotic,
        EffectKind::Wobble,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EffectKind::Pan => "pan",
            EffectKind::Pitch => "pitch",
            EffectKind::Volume => "volume",
            EffectKind::Reverb => "reverb",
            EffectKind::Echo => "echo",
            EffectKind::Fuzz => "fuzz",
            EffectKind::Robotic => "robotic",
            EffectKind::Wobble => "wobble",
        }
    }

    /// Parse a tag name, case-insensitive
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Factory for the kind's behavior
    pub fn create(&self) -> Box<dyn EffectBehavior> {
        match self {
            EffectKind::Pan => Box::new(PanEffect),
            EffectKind::Pitch => Box::new(PitchEffect),
            EffectKind::Volume => Box::new(VolumeEffect),
            EffectKind::Reverb => Box::new(ReverbEffect),
            EffectKind::Echo => Box::new(EchoEffect),
            EffectKind::Fuzz => Box::new(FuzzEffect),
            EffectKind::Robotic => Box::new(RoboticEffect),
            EffectKind::Wobble => Box::new(WobbleEffect),
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Nodes an effect splices in, wired input to output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectNodes {
    nodes: Vec<NodeId>,
}

impl EffectNodes {
    /// Nodes in signal order; callers connect consecutive nodes themselves
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self { nodes }
    }

    pub fn single(node: NodeId) -> Self {
        Self { nodes: vec![node] }
    }

    pub fn input(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn output(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }
}

/// What distinguishes one effect kind from another
pub trait EffectBehavior: Send {
    fn default_value(&self) -> f64 {
        0.0
    }

    /// False for effects that act on players instead of the graph
    fn patches_graph(&self) -> bool {
        true
    }

    fn clamp(&self, value: f64) -> f64 {
        value.clamp(0.0, 100.0)
    }

    /// Create and internally wire the effect's nodes
    fn build(&self, engine: &AudioEngine) -> Result<EffectNodes>;

    /// Push `value` into the nodes
    fn apply(&self, engine: &AudioEngine, nodes: &EffectNodes, value: f64) -> Result<()>;

    /// Push `value` into players routed through the effect
    fn update_players(&self, _value: f64, _players: &[SharedPlayer]) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectState {
    Uninitialized,
    Initialized(EffectNodes),
    /// Terminal; nodes are released and `set` is ignored
    Disposed,
}

/// One effect instance with its lifecycle and wiring
pub struct Effect {
    kind: EffectKind,
    behavior: Box<dyn EffectBehavior>,
    engine: AudioEngine,
    value: f64,
    state: EffectState,
    target: Option<NodeId>,
}

impl Effect {
    pub fn new(engine: &AudioEngine, kind: EffectKind) -> Self {
        let behavior = kind.create();
        Self {
            kind,
            value: behavior.default_value(),
            behavior,
            engine: engine.clone(),
            state: EffectState::Uninitialized,
            target: None,
        }
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn default_value(&self) -> f64 {
        self.behavior.default_value()
    }

    pub fn state(&self) -> &EffectState {
        &self.state
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, EffectState::Initialized(_))
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.state, EffectState::Disposed)
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn nodes(&self) -> Option<&EffectNodes> {
        match &self.state {
            EffectState::Initialized(nodes) => Some(nodes),
            _ => None,
        }
    }

    /// A neutral effect is bypassed and adds no hops
    pub fn is_neutral(&self) -> bool {
        !self.behavior.patches_graph()
            || !self.is_initialized()
            || self.value == self.behavior.default_value()
    }

    /// Hops this effect currently adds to the path through it
    pub fn hop_count(&self) -> usize {
        if self.is_neutral() {
            0
        } else {
            self.nodes().map_or(0, EffectNodes::len)
        }
    }

    /// Build the nodes. Happens on first `set`.
    pub fn initialize(&mut self) -> Result<()> {
        if !matches!(self.state, EffectState::Uninitialized) {
            return Ok(());
        }

        let nodes = self.behavior.build(&self.engine)?;
        if self.behavior.patches_graph() {
            if let (Some(output), Some(target)) = (nodes.output(), self.target) {
                self.engine.reroute(output, target)?;
            }
        }
        tracing::debug!("Initialized {} effect with {} node(s)", self.kind, nodes.len());
        self.state = EffectState::Initialized(nodes);
        Ok(())
    }

    /// Set the value, initializing on first use. Returns true when the
    /// effect switched between neutral and patched, so the owner must rewire.
    pub fn set(&mut self, value: f64) -> Result<bool> {
        if self.is_disposed() {
            tracing::warn!("Ignoring set on disposed {} effect", self.kind);
            return Ok(false);
        }
        if !value.is_finite() {
            tracing::warn!("Ignoring non-finite {} value {}", self.kind, value);
            return Ok(false);
        }

        self.initialize()?;
        let was_neutral = self.is_neutral();
        self.value = self.behavior.clamp(value);
        if let EffectState::Initialized(nodes) = &self.state {
            self.behavior.apply(&self.engine, nodes, self.value)?;
        }
        Ok(was_neutral != self.is_neutral())
    }

    /// Return to the default value
    pub fn clear(&mut self) -> Result<bool> {
        if !self.is_initialized() {
            self.value = self.behavior.default_value();
            return Ok(false);
        }
        self.set(self.behavior.default_value())
    }

    /// Route the effect's output to `target` and return the node the
    /// predecessor must feed: the effect's input when patched, `target`
    /// itself when neutral.
    pub fn connect(&mut self, target: NodeId) -> Result<NodeId> {
        if let EffectState::Initialized(nodes) = &self.state {
            if nodes.contains(target) {
                return Err(AudioError::Topology(format!(
                    "{} effect cannot target its own {}",
                    self.kind, target
                )));
            }
        }
        self.target = Some(target);

        let EffectState::Initialized(nodes) = &self.state else {
            return Ok(target);
        };
        if !self.behavior.patches_graph() {
            return Ok(target);
        }
        if let Some(output) = nodes.output() {
            self.engine.reroute(output, target)?;
        }
        if self.is_neutral() {
            Ok(target)
        } else {
            Ok(nodes.input().unwrap_or(target))
        }
    }

    /// Push the value into players this effect applies to
    pub fn update(&self, players: &[SharedPlayer]) {
        if !self.is_disposed() {
            self.behavior.update_players(self.value, players);
        }
    }

    /// Release the nodes. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if let EffectState::Initialized(nodes) =
            std::mem::replace(&mut self.state, EffectState::Disposed)
        {
            for node in nodes.iter() {
                self.engine.release(node);
            }
        }
        self.target = None;
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("state", &self.state)
            .field("target", &self.target)
            .finish()
    }
}
