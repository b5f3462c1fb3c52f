/// Echo effect
///
/// A quarter-second feedback delay. Any non-zero value mixes the echo in at
/// half level; the value itself controls how long the echo keeps repeating.
use crate::audio_system::backend::{NodeKind, ParamName};
use crate::audio_system::engine::AudioEngine;
use crate::error::Result;

use super::{EffectBehavior, EffectNodes};

const DELAY_TIME: f64 = 0.25;
const ECHO_WET: f32 = 0.5;
const MAX_FEEDBACK: f64 = 0.75;

#[derive(Debug, Clone, Copy, Default)]
pub struct EchoEffect;

impl EchoEffect {
    pub fn feedback_for(value: f64) -> f32 {
        (value / 100.0 * MAX_FEEDBACK) as f32
    }
}

impl EffectBehavior for EchoEffect {
    fn build(&self, engine: &AudioEngine) -> Result<EffectNodes> {
        Ok(EffectNodes::single(engine.create_node(NodeKind::FeedbackDelay {
            delay_time: DELAY_TIME,
            feedback: 0.0,
        })))
    }

    fn apply(&self, engine: &AudioEngine, nodes: &EffectNodes, value: f64) -> Result<()> {
        let Some(delay) = nodes.input() else {
            return Ok(());
        };
        let wet = if value == 0.0 { 0.0 } else { ECHO_WET };
        engine.decay_param(delay, ParamName::Wet, wet)?;
        engine.decay_param(delay, ParamName::Feedback, Self::feedback_for(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_system::effects::test_support::simulated_engine;
    use crate::audio_system::effects::{Effect, EffectKind};

    #[test]
    fn test_echo_levels() {
        let (backend, engine) = simulated_engine();
        let mut effect = Effect::new(&engine, EffectKind::Echo);
        effect.set(100.0).unwrap();
        let delay = effect.nodes().and_then(EffectNodes::input).unwrap();

        let graph = backend.lock();
        assert_eq!(graph.param_target(delay, ParamName::Wet), Some(0.5));
        assert_eq!(graph.param_target(delay, ParamName::Feedback), Some(0.75));
        assert_eq!(graph.param_value(delay, ParamName::DelayTime), Some(0.25));
    }
}
