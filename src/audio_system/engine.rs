/// Shared audio context
///
/// An `AudioEngine` is a cheap, cloneable handle. Every player, effect and
/// bank holds one. It owns the master input node, the decay constants, the
/// registry of decoded buffers and the dispatch of end-of-playback events.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::{Mutex, RwLock};

use crate::config::EngineConfig;
use crate::error::{AudioError, Result};

use super::audio_player::AudioPlayer;
use super::backend::{AudioBackend, NodeId, NodeKind, ParamName};
use super::bank::SoundBank;
use super::bus::EventBus;
use super::decode::{DefaultDecoder, SoundDecoder};
use super::effects::{EffectChain, EffectKind};
use super::player::SoundPlayer;
use super::source::{AudioBuffer, SoundId};

/// Backend behind a lock, shared by every handle
pub type SharedBackend = Arc<Mutex<dyn AudioBackend>>;

/// Work to run once a buffer source ends
pub type EndedListener = Box<dyn FnOnce() + Send>;

#[derive(Clone)]
pub struct AudioEngine {
    backend: SharedBackend,
    input_node: NodeId,
    config: Arc<EngineConfig>,
    decoder: Arc<dyn SoundDecoder>,
    buffers: Arc<RwLock<HashMap<SoundId, Arc<AudioBuffer>>>>,
    listeners: Arc<Mutex<HashMap<NodeId, EndedListener>>>,
    ended_rx: Receiver<NodeId>,
    events: EventBus,
}

impl AudioEngine {
    /// Take ownership of a backend and build the engine around it
    pub fn new(backend: impl AudioBackend + 'static, config: EngineConfig) -> Result<Self> {
        Self::with_backend(Arc::new(Mutex::new(backend)), config)
    }

    /// Build the engine around a backend the caller keeps a handle to
    pub fn with_backend(backend: SharedBackend, config: EngineConfig) -> Result<Self> {
        Self::with_decoder(backend, config, Arc::new(DefaultDecoder))
    }

    pub fn with_decoder(
        backend: SharedBackend,
        config: EngineConfig,
        decoder: Arc<dyn SoundDecoder>,
    ) -> Result<Self> {
        config.validate()?;

        let (input_node, ended_rx) = {
            let mut graph = backend.lock();
            let input = graph.create_node(NodeKind::Gain);
            let destination = graph.destination();
            graph.connect(input, destination)?;
            (input, graph.ended_events())
        };

        tracing::debug!(
            "Audio engine ready (decay {:.3}s, wait {:.3}s, effects {:?})",
            config.decay_duration,
            config.decay_wait,
            config.effects
        );

        Ok(Self {
            backend,
            input_node,
            config: Arc::new(config),
            decoder,
            buffers: Arc::new(RwLock::new(HashMap::new())),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            ended_rx,
            events: EventBus::new(),
        })
    }

    pub fn current_time(&self) -> f64 {
        self.backend.lock().current_time()
    }

    /// Length of a parameter transition or stop fade, in seconds
    pub fn decay_duration(&self) -> f64 {
        self.config.decay_duration
    }

    pub fn decay_wait(&self) -> f64 {
        self.config.decay_wait
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Effects every new chain is built from
    pub fn effect_kinds(&self) -> &[EffectKind] {
        &self.config.effects
    }

    /// Master input; everything audible ends up here
    pub fn input_node(&self) -> NodeId {
        self.input_node
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // Decoding

    /// Decode bytes, substituting one silent sample when they are unusable
    fn decode_buffer(&self, bytes: &[u8]) -> Arc<AudioBuffer> {
        if bytes.is_empty() {
            return Arc::new(AudioBuffer::silent(self.config.sample_rate));
        }
        match self.decoder.decode(bytes) {
            Ok(buffer) => Arc::new(buffer),
            Err(err) => {
                tracing::warn!("Audio data could not be decoded, using silence: {}", err);
                Arc::new(AudioBuffer::silent(self.config.sample_rate))
            }
        }
    }

    /// Decode a sound and keep its buffer in the registry
    pub fn decode_sound(&self, bytes: &[u8]) -> SoundId {
        let id = SoundId::generate();
        self.insert_buffer(id.clone(), self.decode_buffer(bytes));
        id
    }

    /// Decode a sound into a ready-to-play player
    pub fn decode_sound_player(&self, bytes: &[u8]) -> SoundPlayer {
        SoundPlayer::new(self, SoundId::generate(), self.decode_buffer(bytes))
    }

    pub fn insert_buffer(&self, id: SoundId, buffer: Arc<AudioBuffer>) {
        tracing::info!(
            "Registered sound {} ({} ch, {:.3}s)",
            id,
            buffer.channel_count(),
            buffer.duration_secs()
        );
        self.buffers.write().insert(id, buffer);
    }

    pub fn buffer(&self, id: &SoundId) -> Option<Arc<AudioBuffer>> {
        self.buffers.read().get(id).cloned()
    }

    // Factories

    /// Chain of the configured effects, feeding the master input
    pub fn create_effect_chain(&self) -> Result<EffectChain> {
        let mut chain = EffectChain::new(self, self.effect_kinds());
        chain.connect(self.input_node)?;
        Ok(chain)
    }

    pub fn create_bank(&self) -> Result<SoundBank> {
        Ok(SoundBank::new(self, self.create_effect_chain()?))
    }

    pub fn create_audio_player(&self) -> Result<AudioPlayer> {
        AudioPlayer::new(self)
    }

    // End-of-playback dispatch

    /// Run `listener` once `node` ends. Replaces any listener already set.
    pub fn on_ended(&self, node: NodeId, listener: EndedListener) {
        self.listeners.lock().insert(node, listener);
    }

    pub fn clear_ended(&self, node: NodeId) {
        self.listeners.lock().remove(&node);
    }

    /// Run listeners for every source the backend reported as ended.
    /// Returns how many listeners ran.
    pub fn process_events(&self) -> usize {
        let mut handled = 0;
        while let Ok(node) = self.ended_rx.try_recv() {
            let listener = self.listeners.lock().remove(&node);
            if let Some(listener) = listener {
                listener();
                handled += 1;
            }
        }
        handled
    }

    // Graph primitives, each a single short lock

    pub(crate) fn create_node(&self, kind: NodeKind) -> NodeId {
        self.backend.lock().create_node(kind)
    }

    pub(crate) fn connect(&self, src: NodeId, dst: NodeId) -> Result<()> {
        if src == dst {
            return Err(AudioError::Topology(format!("{} cannot feed itself", src)));
        }
        self.backend.lock().connect(src, dst)
    }

    pub(crate) fn disconnect(&self, node: NodeId) -> Result<()> {
        self.backend.lock().disconnect(node)
    }

    /// Disconnect `src` and route it to `dst` only
    pub(crate) fn reroute(&self, src: NodeId, dst: NodeId) -> Result<()> {
        if src == dst {
            return Err(AudioError::Topology(format!("{} cannot feed itself", src)));
        }
        self.disconnect(src)?;
        self.connect(src, dst)
    }

    /// Whether `from` or any node downstream of it satisfies `hit`
    pub(crate) fn reaches(&self, from: NodeId, hit: impl Fn(NodeId) -> bool) -> bool {
        let graph = self.backend.lock();
        let mut visited = HashSet::new();
        let mut pending = vec![from];
        while let Some(node) = pending.pop() {
            if !visited.insert(node) {
                continue;
            }
            if hit(node) {
                return true;
            }
            pending.extend(graph.outputs_of(node));
        }
        false
    }

    pub(crate) fn set_param(&self, node: NodeId, param: ParamName, value: f32) -> Result<()> {
        self.backend.lock().set_param(node, param, value)
    }

    /// Linear ramp over the decay duration, starting now
    pub(crate) fn decay_param(&self, node: NodeId, param: ParamName, target: f32) -> Result<()> {
        self.backend
            .lock()
            .ramp_param(node, param, target, 0.0, self.config.decay_duration)
    }

    pub(crate) fn start_source(&self, node: NodeId, when: f64) -> Result<()> {
        self.backend.lock().start(node, when)
    }

    pub(crate) fn stop_source(&self, node: NodeId, when: f64) -> Result<()> {
        self.backend.lock().stop(node, when)
    }

    pub(crate) fn release(&self, node: NodeId) {
        self.clear_ended(node);
        self.backend.lock().release(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_system::backend::SimulatedBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn simulated() -> (Arc<Mutex<SimulatedBackend>>, AudioEngine) {
        let backend = Arc::new(Mutex::new(SimulatedBackend::new()));
        let engine = AudioEngine::with_backend(backend.clone(), EngineConfig::default()).unwrap();
        (backend, engine)
    }

    #[test]
    fn test_input_feeds_destination() {
        let (backend, engine) = simulated();
        let graph = backend.lock();
        assert_eq!(graph.outputs_of(engine.input_node()), vec![graph.destination()]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            decay_duration: -1.0,
            ..EngineConfig::default()
        };
        let result = AudioEngine::new(SimulatedBackend::new(), config);
        assert!(matches!(result, Err(AudioError::Config(_))));
    }

    #[test]
    fn test_decode_garbage_registers_silence() {
        let (_backend, engine) = simulated();
        let id = engine.decode_sound(b"nope");
        let buffer = engine.buffer(&id).unwrap();
        assert_eq!(buffer.frames(), 1);
        assert!(buffer.is_silent());

        let empty = engine.decode_sound(&[]);
        assert_ne!(id, empty);
        assert!(engine.buffer(&empty).unwrap().is_silent());
    }

    #[test]
    fn test_ended_listeners_run_once() {
        let (backend, engine) = simulated();
        let buffer = Arc::new(AudioBuffer::new(100, vec![vec![0.0; 10]]));
        let node = engine.create_node(NodeKind::BufferSource {
            buffer,
            playback_rate: 1.0,
        });
        engine.start_source(node, 0.0).unwrap();

        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        engine.on_ended(
            node,
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(engine.process_events(), 0);
        backend.lock().process_to(0.1);
        assert_eq!(engine.process_events(), 1);
        assert_eq!(engine.process_events(), 0);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reroute_replaces_outputs() {
        let (backend, engine) = simulated();
        let src = engine.create_node(NodeKind::Gain);
        let first = engine.create_node(NodeKind::Gain);
        let second = engine.create_node(NodeKind::Gain);

        engine.reroute(src, first).unwrap();
        engine.reroute(src, second).unwrap();
        assert_eq!(backend.lock().outputs_of(src), vec![second]);
        assert!(engine.reaches(src, |node| node == second));
        assert!(!engine.reaches(src, |node| node == first));
    }

    #[test]
    fn test_self_connection_is_topology_error() {
        let (_backend, engine) = simulated();
        let node = engine.create_node(NodeKind::Gain);
        assert!(matches!(
            engine.connect(node, node),
            Err(AudioError::Topology(_))
        ));
    }
}
