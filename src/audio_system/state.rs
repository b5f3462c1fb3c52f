/// Sound player lifecycle
///
/// `Idle → Starting → Playing → Stopping → Finished`. A finished player can
/// be played again, which re-enters `Starting`.

/// State of one sound player
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PlaybackState {
    /// Never played; no graph nodes allocated
    #[default]
    Idle,

    /// Inside the decay window after `play()`; further plays are debounced
    Starting,

    Playing,

    /// Fading out on a taken player
    Stopping,

    /// Last playback ended; ready to play again
    Finished,
}

impl PlaybackState {
    /// Check if the player is producing sound
    pub fn is_audible(&self) -> bool {
        matches!(
            self,
            PlaybackState::Starting | PlaybackState::Playing | PlaybackState::Stopping
        )
    }

    /// Check if a `play()` right now would be debounced
    pub fn is_debouncing(&self) -> bool {
        matches!(self, PlaybackState::Starting)
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self, PlaybackState::Starting | PlaybackState::Stopping)
    }

    pub fn description(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::Starting => "Starting...",
            PlaybackState::Playing => "Playing",
            PlaybackState::Stopping => "Stopping...",
            PlaybackState::Finished => "Finished",
        }
    }
}
