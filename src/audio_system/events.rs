/// Playback events broadcast on the engine's [`EventBus`](super::bus::EventBus)
use super::source::SoundId;

/// Lifecycle notifications emitted by sound players
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// A player began a new playback instance
    Started { sound_id: SoundId },

    /// A playback instance ended (natural end, take or hard stop)
    Stopped { sound_id: SoundId },
}

impl PlaybackEvent {
    pub fn sound_id(&self) -> &SoundId {
        match self {
            PlaybackEvent::Started { sound_id } | PlaybackEvent::Stopped { sound_id } => sound_id,
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self, PlaybackEvent::Started { .. })
    }
}
