/// Reverb effect, value is the wet mix percentage
use crate::audio_system::backend::{NodeKind, ParamName};
use crate::audio_system::engine::AudioEngine;
use crate::error::Result;

use super::{EffectBehavior, EffectNodes};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReverbEffect;

impl EffectBehavior for ReverbEffect {
    fn build(&self, engine: &AudioEngine) -> Result<EffectNodes> {
        Ok(EffectNodes::single(engine.create_node(NodeKind::Reverb)))
    }

    fn apply(&self, engine: &AudioEngine, nodes: &EffectNodes, value: f64) -> Result<()> {
        if let Some(reverb) = nodes.input() {
            engine.decay_param(reverb, ParamName::Wet, (value / 100.0) as f32)?;
        }
        Ok(())
    }
}
