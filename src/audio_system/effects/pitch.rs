/// Pitch effect
///
/// Does not touch the graph. Pitch is applied by changing the playback rate
/// of every player routed through the chain. The value is in tenths of a
/// semitone, so 10 raises the sound by one semitone.
use crate::audio_system::engine::AudioEngine;
use crate::audio_system::player::SharedPlayer;
use crate::error::Result;

use super::{EffectBehavior, EffectNodes};

#[derive(Debug, Clone, Copy, Default)]
pub struct PitchEffect;

impl PitchEffect {
    /// Playback rate for a pitch value
    pub fn ratio(value: f64) -> f64 {
        2f64.powf((value / 10.0) / 12.0)
    }
}

impl EffectBehavior for PitchEffect {
    fn patches_graph(&self) -> bool {
        false
    }

    fn clamp(&self, value: f64) -> f64 {
        value
    }

    fn build(&self, _engine: &AudioEngine) -> Result<EffectNodes> {
        Ok(EffectNodes::default())
    }

    fn apply(&self, _engine: &AudioEngine, _nodes: &EffectNodes, _value: f64) -> Result<()> {
        Ok(())
    }

    fn update_players(&self, value: f64, players: &[SharedPlayer]) {
        let ratio = Self::ratio(value);
        for player in players {
            let mut player = player.lock();
            if let Err(err) = player.set_playback_rate(ratio) {
                tracing::warn!("Could not set pitch on {}: {}", player.id(), err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio() {
        assert_eq!(PitchEffect::ratio(0.0), 1.0);
        assert!((PitchEffect::ratio(120.0) - 2.0).abs() < 1e-12);
        assert!((PitchEffect::ratio(-120.0) - 0.5).abs() < 1e-12);
        assert!((PitchEffect::ratio(10.0) - 2f64.powf(1.0 / 12.0)).abs() < 1e-12);
    }

    #[test]
    fn test_never_patches() {
        assert!(!PitchEffect.patches_graph());
        assert_eq!(PitchEffect.clamp(-500.0), -500.0);
    }
}
