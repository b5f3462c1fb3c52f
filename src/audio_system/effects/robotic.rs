/// Robotic effect
///
/// A resonant comb filter tuned to a low note. Higher values pick a higher
/// note, in tenths of a semitone above MIDI note 26.
use crate::audio_system::backend::{NodeKind, ParamName};
use crate::audio_system::engine::AudioEngine;
use crate::error::Result;

use super::{EffectBehavior, EffectNodes};

const RESONANCE: f32 = 0.9;

#[derive(Debug, Clone, Copy, Default)]
pub struct RoboticEffect;

impl RoboticEffect {
    /// Comb delay for a value: one period of the tuned note
    pub fn delay_time_for(value: f64) -> f64 {
        let note = ((value - 100.0) / 10.0) + 36.0;
        let frequency = 440.0 * 2f64.powf((note - 69.0) / 12.0);
        1.0 / frequency
    }
}

impl EffectBehavior for RoboticEffect {
    /// Any value picks a note, negative ones included
    fn clamp(&self, value: f64) -> f64 {
        value
    }

    fn build(&self, engine: &AudioEngine) -> Result<EffectNodes> {
        Ok(EffectNodes::single(engine.create_node(
            NodeKind::FeedbackCombFilter {
                delay_time: Self::delay_time_for(0.0),
                resonance: RESONANCE,
            },
        )))
    }

    fn apply(&self, engine: &AudioEngine, nodes: &EffectNodes, value: f64) -> Result<()> {
        let Some(comb) = nodes.input() else {
            return Ok(());
        };
        let wet = if value == 0.0 { 0.0 } else { 1.0 };
        engine.set_param(comb, ParamName::DelayTime, Self::delay_time_for(value) as f32)?;
        engine.decay_param(comb, ParamName::Wet, wet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_system::effects::test_support::simulated_engine;
    use crate::audio_system::effects::{Effect, EffectKind};

    #[test]
    fn test_delay_tracks_note() {
        // value 100 is MIDI 36, C2 at ~65.4 Hz
        let delay = RoboticEffect::delay_time_for(100.0);
        assert!((1.0 / delay - 65.406).abs() < 0.01);

        // twelve semitones lower halves the frequency
        let lower = RoboticEffect::delay_time_for(-20.0);
        assert!((lower / delay - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_values_outside_percent_range_pass_through() {
        let (backend, engine) = simulated_engine();
        let mut effect = Effect::new(&engine, EffectKind::Robotic);
        effect.set(-20.0).unwrap();
        assert_eq!(effect.value(), -20.0);

        let comb = effect.nodes().and_then(EffectNodes::input).unwrap();
        let graph = backend.lock();
        assert_eq!(
            graph.param_value(comb, ParamName::DelayTime),
            Some(RoboticEffect::delay_time_for(-20.0) as f32)
        );
        assert_eq!(graph.param_target(comb, ParamName::Wet), Some(1.0));
    }
}
