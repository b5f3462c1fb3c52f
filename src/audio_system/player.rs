/// Sound player for a single decoded sound
///
/// Plays one buffer at a time and stops without audible clipping. Stopping
/// hands the playing node to a taken player, which fades it out over the
/// decay duration and then releases it, while this player is free to start
/// again right away.
use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

use super::backend::{NodeId, NodeKind, ParamName};
use super::bus::EventBus;
use super::completion::{Completion, Resolver};
use super::effects::{Effect, EffectKind};
use super::engine::AudioEngine;
use super::events::PlaybackEvent;
use super::source::{AudioBuffer, SoundId};
use super::state::PlaybackState;

/// Player shared between a bank, its chain and pending callbacks
pub type SharedPlayer = Arc<Mutex<SoundPlayer>>;

/// State the ended callback needs without locking the player
#[derive(Default)]
struct PlaybackSignals {
    playing: bool,
    waiters: Vec<Resolver>,
}

/// Mark playback over and resolve completions. Returns whether it was playing.
fn finish_playback(signals: &Mutex<PlaybackSignals>) -> bool {
    let (was_playing, waiters) = {
        let mut signals = signals.lock();
        let was_playing = mem::replace(&mut signals.playing, false);
        (was_playing, mem::take(&mut signals.waiters))
    };
    for waiter in waiters {
        waiter.resolve();
    }
    was_playing
}

pub struct SoundPlayer {
    id: SoundId,
    engine: AudioEngine,
    buffer: Arc<AudioBuffer>,
    playback_rate: f64,

    output_node: Option<NodeId>,
    /// Only present on a taken player while it fades out
    volume_effect: Option<Effect>,
    target: Option<NodeId>,

    initialized: bool,
    starting_until: f64,
    signals: Arc<Mutex<PlaybackSignals>>,
    /// Taken players stay silent on the event bus
    announces: bool,
    disposed: bool,
}

impl SoundPlayer {
    pub fn new(engine: &AudioEngine, id: SoundId, buffer: Arc<AudioBuffer>) -> Self {
        Self {
            id,
            engine: engine.clone(),
            buffer,
            playback_rate: 1.0,
            output_node: None,
            volume_effect: None,
            target: None,
            initialized: false,
            starting_until: 0.0,
            signals: Arc::new(Mutex::new(PlaybackSignals::default())),
            announces: true,
            disposed: false,
        }
    }

    pub fn into_shared(self) -> SharedPlayer {
        Arc::new(Mutex::new(self))
    }

    pub fn id(&self) -> &SoundId {
        &self.id
    }

    pub fn buffer(&self) -> &Arc<AudioBuffer> {
        &self.buffer
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn output_node(&self) -> Option<NodeId> {
        self.output_node
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_playing(&self) -> bool {
        self.signals.lock().playing
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Engine time until which a new `play()` is debounced
    pub fn starting_until(&self) -> f64 {
        self.starting_until
    }

    pub fn state(&self) -> PlaybackState {
        if self.disposed {
            return PlaybackState::Finished;
        }
        if !self.initialized {
            return PlaybackState::Idle;
        }
        if !self.is_playing() {
            return PlaybackState::Finished;
        }
        if self.volume_effect.is_some() {
            PlaybackState::Stopping
        } else if self.engine.current_time() < self.starting_until {
            PlaybackState::Starting
        } else {
            PlaybackState::Playing
        }
    }

    fn publish(&self, event: PlaybackEvent) {
        if self.announces {
            self.engine.events().publish(event);
        }
    }

    fn publish_stopped(&self) {
        self.publish(PlaybackEvent::Stopped {
            sound_id: self.id.clone(),
        });
    }

    /// Listener that ends the current playback instance when `node` ends
    fn watch_node(&self, node: NodeId) {
        let signals = Arc::clone(&self.signals);
        let events: Option<EventBus> = self.announces.then(|| self.engine.events().clone());
        let id = self.id.clone();
        self.engine.on_ended(
            node,
            Box::new(move || {
                if finish_playback(&signals) {
                    tracing::debug!("Sound {} ended", id);
                    if let Some(events) = events {
                        events.publish(PlaybackEvent::Stopped { sound_id: id });
                    }
                }
            }),
        );
    }

    /// Allocate the first source node
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;
        self.create_source()
    }

    /// Replace the source node. Buffer sources only play once.
    fn create_source(&mut self) -> Result<()> {
        if let Some(old) = self.output_node.take() {
            self.engine.release(old);
        }

        let node = self.engine.create_node(NodeKind::BufferSource {
            buffer: Arc::clone(&self.buffer),
            playback_rate: self.playback_rate,
        });
        self.output_node = Some(node);
        self.route_output()?;
        self.watch_node(node);
        Ok(())
    }

    /// Feed the output node into the target, through the fade when present
    fn route_output(&mut self) -> Result<()> {
        let (Some(node), Some(target)) = (self.output_node, self.target) else {
            return Ok(());
        };
        let destination = match self.volume_effect.as_mut() {
            Some(fade) => fade.connect(target)?,
            None => target,
        };
        self.engine.reroute(node, destination)
    }

    /// Send output to `target`, rerouting a live node
    pub fn connect(&mut self, target: NodeId) -> Result<()> {
        self.target = Some(target);
        if self.initialized {
            self.route_output()?;
        }
        Ok(())
    }

    /// Start playback. Inside the starting window this only restarts the
    /// completion cycle; otherwise any current playback is faded out first.
    pub fn play(&mut self) -> Result<()> {
        if self.disposed {
            tracing::warn!("Cannot play disposed sound {}", self.id);
            return Ok(());
        }

        let now = self.engine.current_time();
        if self.is_playing() && now < self.starting_until {
            tracing::debug!("Debounced play of {} at {:.4}s", self.id, now);
            let waiters = mem::take(&mut self.signals.lock().waiters);
            for waiter in waiters {
                waiter.resolve();
            }
            self.publish_stopped();
            self.publish(PlaybackEvent::Started {
                sound_id: self.id.clone(),
            });
            return Ok(());
        }

        if self.is_playing() {
            self.stop()?;
        }

        if self.initialized {
            self.create_source()?;
        } else {
            self.initialize()?;
        }

        if let Some(node) = self.output_node {
            self.engine.start_source(node, now)?;
        }
        self.signals.lock().playing = true;
        self.starting_until = now + self.engine.decay_wait() + self.engine.decay_duration();

        tracing::debug!("Playing {} on {:?}", self.id, self.output_node);
        self.publish(PlaybackEvent::Started {
            sound_id: self.id.clone(),
        });
        Ok(())
    }

    /// Move the current node into a new player. This player ends its
    /// playback instance and is ready to play again; the returned player
    /// keeps the node sounding.
    pub fn take(&mut self) -> SoundPlayer {
        let mut taken = SoundPlayer::new(&self.engine, self.id.clone(), Arc::clone(&self.buffer));
        taken.playback_rate = self.playback_rate;
        taken.target = self.target;
        taken.announces = false;
        taken.volume_effect = self.volume_effect.take();

        if let Some(node) = self.output_node.take() {
            taken.output_node = Some(node);
            taken.initialized = true;
            taken.signals.lock().playing = self.is_playing();
            taken.watch_node(node);

            if finish_playback(&self.signals) {
                self.publish_stopped();
            }
        }

        self.starting_until = 0.0;
        taken
    }

    /// Fade out over the decay duration. Does nothing when not playing.
    pub fn stop(&mut self) -> Result<()> {
        if !self.is_playing() {
            return Ok(());
        }

        let mut taken = self.take();
        let Some(node) = taken.output_node else {
            return Ok(());
        };

        if taken.volume_effect.is_none() {
            let mut fade = Effect::new(&self.engine, EffectKind::Volume);
            fade.set(0.0)?;
            taken.volume_effect = Some(fade);
            taken.route_output()?;
        }

        let stop_at = self.engine.current_time() + self.engine.decay_duration();
        self.engine.stop_source(node, stop_at)?;
        tracing::debug!("Stopping {} ({}), silent at {:.4}s", self.id, node, stop_at);

        self.engine.on_ended(
            node,
            Box::new(move || {
                let mut taken = taken;
                taken.dispose();
            }),
        );
        Ok(())
    }

    /// Stop at once, without a fade
    pub fn stop_immediately(&mut self) -> Result<()> {
        if !self.is_playing() {
            return Ok(());
        }

        if let Some(node) = self.output_node {
            self.engine.clear_ended(node);
            self.engine.stop_source(node, self.engine.current_time())?;
        }
        self.starting_until = 0.0;
        if finish_playback(&self.signals) {
            self.publish_stopped();
        }
        Ok(())
    }

    /// Completion for the current (or next) playback instance
    pub fn finished(&self) -> Completion {
        let (completion, resolver) = Completion::pending();
        self.signals.lock().waiters.push(resolver);
        completion
    }

    pub fn set_playback_rate(&mut self, value: f64) -> Result<()> {
        self.playback_rate = value;
        if let Some(node) = self.output_node {
            self.engine
                .set_param(node, ParamName::PlaybackRate, value as f32)?;
        }
        Ok(())
    }

    /// Release nodes. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        if let Some(mut fade) = self.volume_effect.take() {
            fade.dispose();
        }
        if let Some(node) = self.output_node.take() {
            if self.is_playing() {
                if let Err(err) = self.engine.stop_source(node, self.engine.current_time()) {
                    tracing::debug!("Stop during dispose of {} failed: {}", self.id, err);
                }
            }
            self.engine.release(node);
        }
        if finish_playback(&self.signals) {
            self.publish_stopped();
        }

        self.initialized = false;
        self.target = None;
    }
}

impl Drop for SoundPlayer {
    fn drop(&mut self) {
        let waiters = mem::take(&mut self.signals.lock().waiters);
        for waiter in waiters {
            waiter.resolve();
        }
    }
}

impl std::fmt::Debug for SoundPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundPlayer")
            .field("id", &self.id)
            .field("output_node", &self.output_node)
            .field("target", &self.target)
            .field("playing", &self.is_playing())
            .field("playback_rate", &self.playback_rate)
            .finish()
    }
}
