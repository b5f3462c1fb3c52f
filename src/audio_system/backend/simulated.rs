/// Deterministic, clock-driven audio graph
///
/// Keeps the full node graph, parameter automation and source lifecycle in
/// memory without rendering samples. The clock only moves when the host calls
/// [`SimulatedBackend::process_to`], which makes it suitable for headless
/// hosts and for asserting graph shapes at exact times.
use std::collections::{BTreeMap, HashMap, HashSet};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::{AudioError, Result};

use super::{AudioBackend, NodeId, NodeKind, ParamName};

/// Lifecycle of a buffer source node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Created, `start` not called yet
    Unscheduled,
    /// Start time is in the future
    Scheduled,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Copy)]
struct Ramp {
    from: f32,
    target: f32,
    start: f64,
    end: f64,
}

#[derive(Debug, Clone, Copy)]
struct Param {
    value: f32,
    ramp: Option<Ramp>,
}

impl Param {
    fn new(value: f32) -> Self {
        Self { value, ramp: None }
    }

    fn value_at(&self, time: f64) -> f32 {
        match self.ramp {
            None => self.value,
            Some(ramp) if time <= ramp.start => ramp.from,
            Some(ramp) if time >= ramp.end => ramp.target,
            Some(ramp) => {
                let t = ((time - ramp.start) / (ramp.end - ramp.start)) as f32;
                ramp.from + (ramp.target - ramp.from) * t
            }
        }
    }

    /// Fold a completed ramp into the plain value
    fn settle(&mut self, time: f64) {
        if let Some(ramp) = self.ramp {
            if time >= ramp.end {
                self.value = ramp.target;
                self.ramp = None;
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Source {
    state: SourceState,
    start_time: f64,
    stop_time: Option<f64>,
    duration: f64,
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    outputs: Vec<NodeId>,
    params: HashMap<ParamName, Param>,
    source: Option<Source>,
}

/// In-memory [`AudioBackend`] with a manually advanced clock
pub struct SimulatedBackend {
    current_time: f64,
    next_id: u64,
    destination: NodeId,
    nodes: BTreeMap<NodeId, Node>,
    ended_tx: Sender<NodeId>,
    ended_rx: Receiver<NodeId>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        let (ended_tx, ended_rx) = unbounded();
        let mut backend = Self {
            current_time: 0.0,
            next_id: 0,
            destination: NodeId(0),
            nodes: BTreeMap::new(),
            ended_tx,
            ended_rx,
        };
        backend.destination = backend.create_node(NodeKind::Gain);
        backend
    }

    /// Move the clock forward to `time`, starting and finishing sources whose
    /// times have passed. Finished sources are published on the ended stream.
    pub fn process_to(&mut self, time: f64) {
        if time > self.current_time {
            self.current_time = time;
        }
        let now = self.current_time;

        for (id, node) in self.nodes.iter_mut() {
            for param in node.params.values_mut() {
                param.settle(now);
            }

            let rate = node
                .params
                .get(&ParamName::PlaybackRate)
                .map(|p| p.value_at(now) as f64)
                .unwrap_or(1.0);

            let Some(source) = node.source.as_mut() else {
                continue;
            };

            if source.state == SourceState::Scheduled && source.start_time <= now {
                source.state = SourceState::Playing;
            }

            if source.state == SourceState::Playing {
                let natural_end = if rate > 0.0 {
                    source.start_time + source.duration / rate
                } else {
                    f64::INFINITY
                };
                let end = source.stop_time.map_or(natural_end, |stop| stop.min(natural_end));
                if end <= now {
                    source.state = SourceState::Finished;
                    tracing::trace!("{} finished at {:.4}s", id, now);
                    let _ = self.ended_tx.send(*id);
                }
            }
        }
    }

    /// Advance the clock by `delta` seconds
    pub fn advance(&mut self, delta: f64) {
        let target = self.current_time + delta;
        self.process_to(target);
    }

    /// Current value of a node parameter, resolving any ramp in progress
    pub fn param_value(&self, node: NodeId, param: ParamName) -> Option<f32> {
        self.nodes
            .get(&node)?
            .params
            .get(&param)
            .map(|p| p.value_at(self.current_time))
    }

    /// Final value a parameter is heading for
    pub fn param_target(&self, node: NodeId, param: ParamName) -> Option<f32> {
        let param = self.nodes.get(&node)?.params.get(&param)?;
        Some(param.ramp.map_or(param.value, |r| r.target))
    }

    pub fn source_state(&self, node: NodeId) -> Option<SourceState> {
        self.nodes.get(&node)?.source.as_ref().map(|s| s.state)
    }

    pub fn kind_name(&self, node: NodeId) -> Option<&'static str> {
        self.nodes.get(&node).map(|n| n.kind.name())
    }

    pub fn is_live(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn outputs_of(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|n| n.outputs.clone())
            .unwrap_or_default()
    }

    /// Nodes with a connection into `node`
    pub fn inputs_of(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.outputs.contains(&node))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Buffer sources currently producing sound
    pub fn playing_sources(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| {
                n.source
                    .as_ref()
                    .is_some_and(|s| s.state == SourceState::Playing)
            })
            .map(|(id, _)| *id)
            .collect()
    }

    /// Nodes strictly between `from` and `to` along the first path found
    pub fn route(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
        let mut visited = HashSet::new();
        let mut path = Vec::new();
        if self.walk(from, to, &mut visited, &mut path) {
            // path holds every node after `from` up to and including `to`
            path.pop();
            Some(path)
        } else {
            None
        }
    }

    /// Number of intermediate nodes between `from` and `to`
    pub fn hops_between(&self, from: NodeId, to: NodeId) -> Option<usize> {
        self.route(from, to).map(|path| path.len())
    }

    fn walk(
        &self,
        at: NodeId,
        to: NodeId,
        visited: &mut HashSet<NodeId>,
        path: &mut Vec<NodeId>,
    ) -> bool {
        if !visited.insert(at) {
            return false;
        }
        let Some(node) = self.nodes.get(&at) else {
            return false;
        };
        for next in &node.outputs {
            path.push(*next);
            if *next == to || self.walk(*next, to, visited, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(&node)
            .ok_or(AudioError::UnknownNode(node))
    }

    fn param_mut(&mut self, node: NodeId, name: ParamName) -> Result<&mut Param> {
        let entry = self.node_mut(node)?;
        let kind = entry.kind.name();
        entry.params.get_mut(&name).ok_or_else(|| AudioError::Backend {
            node,
            reason: format!("{} has no {:?} parameter", kind, name),
        })
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for SimulatedBackend {
    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn destination(&self) -> NodeId {
        self.destination
    }

    fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        let params = kind
            .default_params()
            .into_iter()
            .map(|(name, value)| (name, Param::new(value)))
            .collect();
        let source = match &kind {
            NodeKind::BufferSource { buffer, .. } => Some(Source {
                state: SourceState::Unscheduled,
                start_time: 0.0,
                stop_time: None,
                duration: buffer.duration_secs(),
            }),
            _ => None,
        };

        self.nodes.insert(
            id,
            Node {
                kind,
                outputs: Vec::new(),
                params,
                source,
            },
        );
        id
    }

    fn connect(&mut self, src: NodeId, dst: NodeId) -> Result<()> {
        if !self.nodes.contains_key(&dst) {
            return Err(AudioError::UnknownNode(dst));
        }
        let node = self.node_mut(src)?;
        if !node.outputs.contains(&dst) {
            node.outputs.push(dst);
        }
        Ok(())
    }

    fn disconnect(&mut self, node: NodeId) -> Result<()> {
        self.node_mut(node)?.outputs.clear();
        Ok(())
    }

    fn outputs_of(&self, node: NodeId) -> Vec<NodeId> {
        SimulatedBackend::outputs_of(self, node)
    }

    fn set_param(&mut self, node: NodeId, param: ParamName, value: f32) -> Result<()> {
        let param = self.param_mut(node, param)?;
        param.value = value;
        param.ramp = None;
        Ok(())
    }

    fn ramp_param(
        &mut self,
        node: NodeId,
        param: ParamName,
        target: f32,
        start_delay: f64,
        ramp_time: f64,
    ) -> Result<()> {
        let now = self.current_time;
        let start = now + start_delay.max(0.0);
        let param = self.param_mut(node, param)?;
        let from = param.value_at(start);
        if ramp_time <= 0.0 && start_delay <= 0.0 {
            param.value = target;
            param.ramp = None;
        } else {
            param.value = from;
            param.ramp = Some(Ramp {
                from,
                target,
                start,
                end: start + ramp_time.max(0.0),
            });
        }
        Ok(())
    }

    fn start(&mut self, node: NodeId, when: f64) -> Result<()> {
        let now = self.current_time;
        let entry = self.node_mut(node)?;
        let kind = entry.kind.name();
        let source = entry.source.as_mut().ok_or_else(|| AudioError::Backend {
            node,
            reason: format!("{} cannot be started", kind),
        })?;
        if source.state != SourceState::Unscheduled {
            return Err(AudioError::Backend {
                node,
                reason: "buffer source already started".to_string(),
            });
        }
        source.start_time = when.max(now);
        source.state = if source.start_time <= now {
            SourceState::Playing
        } else {
            SourceState::Scheduled
        };
        Ok(())
    }

    fn stop(&mut self, node: NodeId, when: f64) -> Result<()> {
        let now = self.current_time;
        let entry = self.node_mut(node)?;
        let kind = entry.kind.name();
        let source = entry.source.as_mut().ok_or_else(|| AudioError::Backend {
            node,
            reason: format!("{} cannot be stopped", kind),
        })?;
        match source.state {
            SourceState::Unscheduled => Err(AudioError::Backend {
                node,
                reason: "buffer source stopped before start".to_string(),
            }),
            SourceState::Finished => Ok(()),
            SourceState::Scheduled | SourceState::Playing => {
                let when = when.max(now);
                source.stop_time = Some(source.stop_time.map_or(when, |t| t.min(when)));
                Ok(())
            }
        }
    }

    fn release(&mut self, node: NodeId) {
        if node == self.destination {
            return;
        }
        if self.nodes.remove(&node).is_some() {
            for other in self.nodes.values_mut() {
                other.outputs.retain(|out| *out != node);
            }
        }
    }

    fn ended_events(&self) -> Receiver<NodeId> {
        self.ended_rx.clone()
    }
}
