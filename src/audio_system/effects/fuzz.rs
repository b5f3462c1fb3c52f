/// Fuzz effect, a distortion whose wet mix follows the value
use crate::audio_system::backend::{NodeKind, ParamName};
use crate::audio_system::engine::AudioEngine;
use crate::error::Result;

use super::{EffectBehavior, EffectNodes};

#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzEffect;

impl EffectBehavior for FuzzEffect {
    fn build(&self, engine: &AudioEngine) -> Result<EffectNodes> {
        Ok(EffectNodes::single(
            engine.create_node(NodeKind::Distortion { amount: 1.0 }),
        ))
    }

    fn apply(&self, engine: &AudioEngine, nodes: &EffectNodes, value: f64) -> Result<()> {
        if let Some(distortion) = nodes.input() {
            engine.decay_param(distortion, ParamName::Wet, (value / 100.0) as f32)?;
        }
        Ok(())
    }
}
