/// Stereo pan effect, -100 (left) to 100 (right)
use crate::audio_system::backend::{NodeKind, ParamName};
use crate::audio_system::engine::AudioEngine;
use crate::error::Result;

use super::{EffectBehavior, EffectNodes};

#[derive(Debug, Clone, Copy, Default)]
pub struct PanEffect;

impl EffectBehavior for PanEffect {
    fn clamp(&self, value: f64) -> f64 {
        value.clamp(-100.0, 100.0)
    }

    fn build(&self, engine: &AudioEngine) -> Result<EffectNodes> {
        Ok(EffectNodes::single(engine.create_node(NodeKind::StereoPanner)))
    }

    fn apply(&self, engine: &AudioEngine, nodes: &EffectNodes, value: f64) -> Result<()> {
        if let Some(panner) = nodes.input() {
            engine.decay_param(panner, ParamName::Pan, (value / 100.0) as f32)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_system::effects::test_support::simulated_engine;
    use crate::audio_system::effects::{Effect, EffectKind};

    #[test]
    fn test_pan_position() {
        let (backend, engine) = simulated_engine();
        let mut effect = Effect::new(&engine, EffectKind::Pan);
        effect.set(-250.0).unwrap();
        assert_eq!(effect.value(), -100.0);

        let panner = effect.nodes().and_then(EffectNodes::input).unwrap();
        backend.lock().process_to(1.0);
        assert_eq!(backend.lock().param_value(panner, ParamName::Pan), Some(-1.0));
        assert_eq!(backend.lock().kind_name(panner), Some("StereoPanner"));
    }
}
