/// Volume effect
///
/// A single gain stage. The value is a percentage: 100 is unity gain and the
/// default, 0 is silence. Changes ramp over the decay duration so they never
/// click.
use crate::audio_system::backend::{NodeKind, ParamName};
use crate::audio_system::engine::AudioEngine;
use crate::error::Result;

use super::{EffectBehavior, EffectNodes};

#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeEffect;

impl VolumeEffect {
    /// Gain for a 0-100 volume value
    pub fn gain_for(value: f64) -> f32 {
        (value.clamp(0.0, 100.0) / 100.0) as f32
    }
}

impl EffectBehavior for VolumeEffect {
    fn default_value(&self) -> f64 {
        100.0
    }

    fn build(&self, engine: &AudioEngine) -> Result<EffectNodes> {
        Ok(EffectNodes::single(engine.create_node(NodeKind::Gain)))
    }

    fn apply(&self, engine: &AudioEngine, nodes: &EffectNodes, value: f64) -> Result<()> {
        if let Some(gain) = nodes.input() {
            engine.decay_param(gain, ParamName::Gain, Self::gain_for(value))?;
        }
        Ok(())
    }
}
