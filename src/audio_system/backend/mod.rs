/// Audio graph backend contract
///
/// The engine never processes samples itself. Every node, connection and
/// parameter change goes through an [`AudioBackend`], which owns the actual
/// signal processing (gain, panning, filters, buffer playback) and the audio
/// clock.
pub mod simulated;

use std::fmt;
use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::error::Result;

use super::source::AudioBuffer;

pub use simulated::{SimulatedBackend, SourceState};

/// Handle to a node living inside a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Kinds of node an effect or player can ask the backend for
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Single gain stage
    Gain,

    /// Equal-power stereo panner
    StereoPanner,

    /// One-shot playback of a decoded buffer
    BufferSource {
        buffer: Arc<AudioBuffer>,
        playback_rate: f64,
    },

    /// Room reverb with a wet/dry mix
    Reverb,

    /// Delay line fed back into itself
    FeedbackDelay { delay_time: f64, feedback: f32 },

    /// Waveshaping distortion
    Distortion { amount: f32 },

    /// Comb filter with a short feedback delay
    FeedbackCombFilter { delay_time: f64, resonance: f32 },

    /// Gain modulated by a low frequency oscillator
    Tremolo { frequency: f32 },
}

impl NodeKind {
    /// Short name used in logs and graph dumps
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Gain => "Gain",
            NodeKind::StereoPanner => "StereoPanner",
            NodeKind::BufferSource { .. } => "BufferSource",
            NodeKind::Reverb => "Reverb",
            NodeKind::FeedbackDelay { .. } => "FeedbackDelay",
            NodeKind::Distortion { .. } => "Distortion",
            NodeKind::FeedbackCombFilter { .. } => "FeedbackCombFilter",
            NodeKind::Tremolo { .. } => "Tremolo",
        }
    }

    /// Parameters the node exposes, with their initial values
    pub fn default_params(&self) -> Vec<(ParamName, f32)> {
        match self {
            NodeKind::Gain => vec![(ParamName::Gain, 1.0)],
            NodeKind::StereoPanner => vec![(ParamName::Pan, 0.0)],
            NodeKind::BufferSource { playback_rate, .. } => {
                vec![(ParamName::PlaybackRate, *playback_rate as f32)]
            }
            NodeKind::Reverb => vec![(ParamName::Wet, 0.0)],
            NodeKind::FeedbackDelay {
                delay_time,
                feedback,
            } => vec![
                (ParamName::Wet, 0.0),
                (ParamName::DelayTime, *delay_time as f32),
                (ParamName::Feedback, *feedback),
            ],
            NodeKind::Distortion { .. } => vec![(ParamName::Wet, 0.0)],
            NodeKind::FeedbackCombFilter {
                delay_time,
                resonance,
            } => vec![
                (ParamName::Wet, 0.0),
                (ParamName::DelayTime, *delay_time as f32),
                (ParamName::Feedback, *resonance),
            ],
            NodeKind::Tremolo { frequency } => {
                vec![(ParamName::Wet, 0.0), (ParamName::Frequency, *frequency)]
            }
        }
    }
}

/// Automatable node parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamName {
    Gain,
    Pan,
    PlaybackRate,
    Wet,
    Feedback,
    DelayTime,
    Frequency,
}

/// Platform audio graph primitives consumed by the engine.
///
/// Times are seconds on the backend's own clock. `ramp_param` moves a
/// parameter linearly from its value at `now + start_delay` to `target`,
/// arriving exactly at `now + start_delay + ramp_time`.
pub trait AudioBackend: Send {
    /// Current time on the audio clock
    fn current_time(&self) -> f64;

    /// Node that represents the speakers
    fn destination(&self) -> NodeId;

    fn create_node(&mut self, kind: NodeKind) -> NodeId;

    fn connect(&mut self, src: NodeId, dst: NodeId) -> Result<()>;

    /// Remove every outgoing connection of `node`
    fn disconnect(&mut self, node: NodeId) -> Result<()>;

    /// Nodes `node` feeds into. Unknown nodes have none.
    fn outputs_of(&self, node: NodeId) -> Vec<NodeId>;

    fn set_param(&mut self, node: NodeId, param: ParamName, value: f32) -> Result<()>;

    fn ramp_param(
        &mut self,
        node: NodeId,
        param: ParamName,
        target: f32,
        start_delay: f64,
        ramp_time: f64,
    ) -> Result<()>;

    /// Start a buffer source. A source can only be started once.
    fn start(&mut self, node: NodeId, when: f64) -> Result<()>;

    /// Schedule a buffer source to stop
    fn stop(&mut self, node: NodeId, when: f64) -> Result<()>;

    /// Free the node. Unknown nodes are ignored.
    fn release(&mut self, node: NodeId);

    /// Stream of buffer sources that reached the end of playback
    fn ended_events(&self) -> Receiver<NodeId>;
}
