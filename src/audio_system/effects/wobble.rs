/// Wobble effect: tremolo whose depth and speed both rise with the value
use crate::audio_system::backend::{NodeKind, ParamName};
use crate::audio_system::engine::AudioEngine;
use crate::error::Result;

use super::{EffectBehavior, EffectNodes};

#[derive(Debug, Clone, Copy, Default)]
pub struct WobbleEffect;

impl EffectBehavior for WobbleEffect {
    fn build(&self, engine: &AudioEngine) -> Result<EffectNodes> {
        Ok(EffectNodes::single(
            engine.create_node(NodeKind::Tremolo { frequency: 0.0 }),
        ))
    }

    fn apply(&self, engine: &AudioEngine, nodes: &EffectNodes, value: f64) -> Result<()> {
        let Some(tremolo) = nodes.input() else {
            return Ok(());
        };
        engine.decay_param(tremolo, ParamName::Wet, (value / 100.0) as f32)?;
        engine.decay_param(tremolo, ParamName::Frequency, (value / 10.0) as f32)
    }
}
