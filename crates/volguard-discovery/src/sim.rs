//! In-memory hosts.
//!
//! [`MemoryDocument`] is a small element tree with shadow roots, mutation
//! notifications and source-ready callbacks. [`SimulatedGraph`] mixes a sine
//! per connected element into the analyser and records gain node levels.
//! Both are cheap-to-clone handles over shared state so a driver can mutate
//! the page while an agent owns it.

use std::collections::{BTreeMap, BTreeSet};
use std::f32::consts::TAU;
use std::sync::Arc;

use parking_lot::Mutex;
use volguard_core::AnalysisSource;

use crate::{AudioGraph, DomHost, ElementId, GainNodeId, GraphError, HostError, HostEvent, MediaKind};

#[derive(Debug, Default)]
struct Node {
    kind: Option<MediaKind>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    shadow: Option<ElementId>,
    has_source: bool,
    amplitude: f32,
    faulty: bool,
}

#[derive(Debug, Default)]
struct Document {
    nodes: BTreeMap<ElementId, Node>,
    root: Option<ElementId>,
    observed: Option<ElementId>,
    source_watch: BTreeSet<ElementId>,
    events: Vec<HostEvent>,
    next_id: u64,
}

impl Document {
    fn alloc(&mut self, node: Node) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    fn node(&self, id: ElementId) -> Result<&Node, HostError> {
        let node = self.nodes.get(&id).ok_or(HostError::UnknownElement(id))?;
        if node.faulty {
            return Err(HostError::denied(id, "access denied"));
        }
        Ok(node)
    }

    /// Walk parents (a shadow root's parent is its host) up to the root.
    fn is_under(&self, id: ElementId, ancestor: ElementId) -> bool {
        let mut cur = Some(id);
        let mut hops = 0usize;
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            hops += 1;
            if hops > self.nodes.len() {
                return false;
            }
            cur = self.nodes.get(&c).and_then(|n| n.parent);
        }
        false
    }

    fn is_connected(&self, id: ElementId) -> bool {
        self.root.is_some_and(|root| self.is_under(id, root))
    }

    /// Mutation records only fire for light-tree changes under the observed
    /// root; shadow trees are invisible to the observer.
    fn observed_light_parent(&self, parent: ElementId) -> bool {
        let Some(observed) = self.observed else {
            return false;
        };
        let mut cur = Some(parent);
        while let Some(c) = cur {
            if c == observed {
                return true;
            }
            let Some(node) = self.nodes.get(&c) else {
                return false;
            };
            let Some(p) = node.parent else {
                return false;
            };
            if self.nodes.get(&p).is_some_and(|pn| pn.shadow == Some(c)) {
                return false;
            }
            cur = Some(p);
        }
        false
    }
}

/// Shared in-memory document.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    inner: Arc<Mutex<Document>>,
}

impl MemoryDocument {
    /// A document whose body has not been built yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A document with a body already in place.
    pub fn with_body() -> (Self, ElementId) {
        let doc = Self::new();
        let body = doc.create_body();
        (doc, body)
    }

    /// Build the body. Emits [`HostEvent::RootAvailable`].
    pub fn create_body(&self) -> ElementId {
        let mut d = self.inner.lock();
        if let Some(root) = d.root {
            return root;
        }
        let id = d.alloc(Node::default());
        d.root = Some(id);
        d.events.push(HostEvent::RootAvailable);
        id
    }

    /// Body, if built.
    pub fn body(&self) -> Option<ElementId> {
        self.inner.lock().root
    }

    /// Create a detached plain element.
    pub fn create_element(&self) -> ElementId {
        self.inner.lock().alloc(Node::default())
    }

    /// Create a detached media element.
    ///
    /// `amplitude` is the peak level of the tone it plays once connected.
    pub fn create_media(&self, kind: MediaKind, has_source: bool, amplitude: f32) -> ElementId {
        self.inner.lock().alloc(Node {
            kind: Some(kind),
            has_source,
            amplitude,
            ..Node::default()
        })
    }

    /// Append `child` under `parent`. Emits [`HostEvent::NodesAdded`] when the
    /// parent is observed.
    pub fn append(&self, parent: ElementId, child: ElementId) {
        let mut d = self.inner.lock();
        if !d.nodes.contains_key(&parent) {
            return;
        }
        if let Some(old) = d.nodes.get(&child).and_then(|n| n.parent)
            && let Some(p) = d.nodes.get_mut(&old)
        {
            p.children.retain(|&c| c != child);
        }
        let Some(node) = d.nodes.get_mut(&child) else {
            return;
        };
        node.parent = Some(parent);
        if let Some(p) = d.nodes.get_mut(&parent) {
            p.children.push(child);
        }
        if d.observed_light_parent(parent) {
            d.events.push(HostEvent::NodesAdded(vec![child]));
        }
    }

    /// Attach a shadow root to `host`, returning the existing one if present.
    pub fn attach_shadow(&self, host: ElementId) -> Option<ElementId> {
        let mut d = self.inner.lock();
        let existing = d.nodes.get(&host)?.shadow;
        if existing.is_some() {
            return existing;
        }
        let shadow = d.alloc(Node {
            parent: Some(host),
            ..Node::default()
        });
        if let Some(h) = d.nodes.get_mut(&host) {
            h.shadow = Some(shadow);
        }
        Some(shadow)
    }

    /// Detach `child` from its parent.
    pub fn remove(&self, child: ElementId) {
        let mut d = self.inner.lock();
        let Some(parent) = d.nodes.get(&child).and_then(|n| n.parent) else {
            return;
        };
        let observed = d.observed_light_parent(parent);
        if let Some(p) = d.nodes.get_mut(&parent) {
            p.children.retain(|&c| c != child);
        }
        if let Some(n) = d.nodes.get_mut(&child) {
            n.parent = None;
        }
        if observed {
            d.events.push(HostEvent::NodesRemoved(vec![child]));
        }
    }

    /// Give `element` a source. Fires a pending source watch once.
    pub fn set_source(&self, element: ElementId) {
        let mut d = self.inner.lock();
        if let Some(n) = d.nodes.get_mut(&element) {
            n.has_source = true;
        }
        if d.source_watch.remove(&element) {
            d.events.push(HostEvent::SourceReady(element));
        }
    }

    /// Change the level an element plays at.
    pub fn set_amplitude(&self, element: ElementId, amplitude: f32) {
        if let Some(n) = self.inner.lock().nodes.get_mut(&element) {
            n.amplitude = amplitude;
        }
    }

    /// Make every host query about `element` fail.
    pub fn make_faulty(&self, element: ElementId) {
        if let Some(n) = self.inner.lock().nodes.get_mut(&element) {
            n.faulty = true;
        }
    }

    /// Queue [`HostEvent::PageLoaded`].
    pub fn finish_loading(&self) {
        self.inner.lock().events.push(HostEvent::PageLoaded);
    }

    /// Queue [`HostEvent::UserGesture`].
    pub fn user_gesture(&self) {
        self.inner.lock().events.push(HostEvent::UserGesture);
    }

    /// Whether an observer is installed.
    pub fn is_observed(&self) -> bool {
        self.inner.lock().observed.is_some()
    }

    fn amplitude_if_connected(&self, element: ElementId) -> f32 {
        let d = self.inner.lock();
        if !d.is_connected(element) {
            return 0.0;
        }
        d.nodes.get(&element).map_or(0.0, |n| n.amplitude)
    }
}

impl DomHost for MemoryDocument {
    fn document_root(&self) -> Result<Option<ElementId>, HostError> {
        Ok(self.inner.lock().root)
    }

    fn media_kind(&self, element: ElementId) -> Result<Option<MediaKind>, HostError> {
        Ok(self.inner.lock().node(element)?.kind)
    }

    fn children(&self, element: ElementId) -> Result<Vec<ElementId>, HostError> {
        Ok(self.inner.lock().node(element)?.children.clone())
    }

    fn shadow_root(&self, element: ElementId) -> Result<Option<ElementId>, HostError> {
        Ok(self.inner.lock().node(element)?.shadow)
    }

    fn is_connected(&self, element: ElementId) -> Result<bool, HostError> {
        let d = self.inner.lock();
        d.node(element)?;
        Ok(d.is_connected(element))
    }

    fn has_media_source(&self, element: ElementId) -> Result<bool, HostError> {
        Ok(self.inner.lock().node(element)?.has_source)
    }

    fn observe(&mut self, root: ElementId) -> Result<(), HostError> {
        let mut d = self.inner.lock();
        d.node(root).map_err(|_| HostError::ObserveFailed(root))?;
        d.observed = Some(root);
        Ok(())
    }

    fn watch_source(&mut self, element: ElementId) -> Result<(), HostError> {
        let mut d = self.inner.lock();
        d.node(element)?;
        d.source_watch.insert(element);
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.inner.lock().events)
    }
}

#[derive(Debug)]
struct Graph {
    suspended: bool,
    gains: Vec<f32>,
    sources: BTreeMap<ElementId, GainNodeId>,
    sample_rate: f32,
    frequency: f32,
    phase: f32,
}

/// Shared simulated audio graph.
///
/// Each connected element contributes a sine at its document amplitude to the
/// analyser (which taps the signal before the gain nodes). A suspended graph
/// produces silence.
#[derive(Debug, Clone)]
pub struct SimulatedGraph {
    doc: MemoryDocument,
    inner: Arc<Mutex<Graph>>,
}

impl SimulatedGraph {
    /// A running graph over `doc`.
    pub fn new(doc: MemoryDocument) -> Self {
        Self::with_state(doc, false)
    }

    /// A graph that starts suspended, as under autoplay restrictions.
    pub fn suspended(doc: MemoryDocument) -> Self {
        Self::with_state(doc, true)
    }

    fn with_state(doc: MemoryDocument, suspended: bool) -> Self {
        Self {
            doc,
            inner: Arc::new(Mutex::new(Graph {
                suspended,
                gains: Vec::new(),
                sources: BTreeMap::new(),
                sample_rate: 48_000.0,
                frequency: 440.0,
                phase: 0.0,
            })),
        }
    }

    /// Current level of a gain node.
    pub fn gain(&self, node: GainNodeId) -> Option<f32> {
        self.inner.lock().gains.get(node.0 as usize).copied()
    }

    /// Gain applied to `element`'s signal, if it feeds the graph.
    pub fn element_gain(&self, element: ElementId) -> Option<f32> {
        let g = self.inner.lock();
        let node = g.sources.get(&element)?;
        g.gains.get(node.0 as usize).copied()
    }

    /// Elements feeding source nodes.
    pub fn connected_elements(&self) -> Vec<ElementId> {
        self.inner.lock().sources.keys().copied().collect()
    }

    /// Number of gain nodes created.
    pub fn gain_nodes(&self) -> usize {
        self.inner.lock().gains.len()
    }

    /// Attach `element` to a source node outside the limiter, so a later
    /// connect fails with [`GraphError::AlreadyConnected`].
    pub fn claim_elsewhere(&self, element: ElementId) {
        let mut g = self.inner.lock();
        let node = GainNodeId(g.gains.len() as u32);
        g.gains.push(1.0);
        g.sources.insert(element, node);
    }
}

impl AnalysisSource for SimulatedGraph {
    fn read_time_domain(&mut self, out: &mut [f32]) {
        let sources: Vec<ElementId> = {
            let g = self.inner.lock();
            if g.suspended {
                out.fill(0.0);
                return;
            }
            g.sources.keys().copied().collect()
        };
        let amplitude: f32 = sources
            .iter()
            .map(|&e| self.doc.amplitude_if_connected(e))
            .sum();

        let mut g = self.inner.lock();
        let step = TAU * g.frequency / g.sample_rate;
        let mut phase = g.phase;
        for sample in out.iter_mut() {
            *sample = amplitude * phase.sin();
            phase = (phase + step) % TAU;
        }
        g.phase = phase;
    }
}

impl AudioGraph for SimulatedGraph {
    fn create_gain(&mut self) -> Result<GainNodeId, GraphError> {
        let mut g = self.inner.lock();
        let node = GainNodeId(g.gains.len() as u32);
        g.gains.push(1.0);
        Ok(node)
    }

    fn connect_element(&mut self, element: ElementId, gain: GainNodeId) -> Result<(), GraphError> {
        let mut g = self.inner.lock();
        if g.sources.contains_key(&element) {
            return Err(GraphError::AlreadyConnected(element));
        }
        if gain.0 as usize >= g.gains.len() {
            return Err(GraphError::UnknownNode(gain));
        }
        g.sources.insert(element, gain);
        Ok(())
    }

    fn set_gain(&mut self, gain: GainNodeId, value: f32) -> Result<(), GraphError> {
        let mut g = self.inner.lock();
        let slot = g
            .gains
            .get_mut(gain.0 as usize)
            .ok_or(GraphError::UnknownNode(gain))?;
        *slot = value;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), GraphError> {
        self.inner.lock().suspended = false;
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        self.inner.lock().suspended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volguard_core::LevelMeter;

    #[test]
    fn observer_sees_light_tree_only() {
        let (mut doc, body) = MemoryDocument::with_body();
        doc.drain_events();
        doc.observe(body).unwrap();

        let div = doc.create_element();
        doc.append(body, div);
        let shadow = doc.attach_shadow(div).unwrap();
        let video = doc.create_media(MediaKind::Video, true, 0.5);
        doc.append(shadow, video);

        assert_eq!(doc.drain_events(), vec![HostEvent::NodesAdded(vec![div])]);
        assert!(doc.is_connected(video).unwrap());
    }

    #[test]
    fn source_watch_fires_once() {
        let (mut doc, body) = MemoryDocument::with_body();
        let audio = doc.create_media(MediaKind::Audio, false, 0.1);
        doc.append(body, audio);
        doc.drain_events();

        doc.watch_source(audio).unwrap();
        doc.set_source(audio);
        doc.set_source(audio);
        assert_eq!(doc.drain_events(), vec![HostEvent::SourceReady(audio)]);
    }

    #[test]
    fn removed_subtree_is_disconnected() {
        let (doc, body) = MemoryDocument::with_body();
        let div = doc.create_element();
        let video = doc.create_media(MediaKind::Video, true, 0.5);
        doc.append(body, div);
        doc.append(div, video);
        doc.remove(div);
        assert!(!doc.is_connected(video).unwrap());
    }

    #[test]
    fn faulty_nodes_error() {
        let (doc, body) = MemoryDocument::with_body();
        doc.make_faulty(body);
        assert!(doc.children(body).is_err());
    }

    #[test]
    fn graph_level_follows_connected_elements() {
        let (doc, body) = MemoryDocument::with_body();
        let video = doc.create_media(MediaKind::Video, true, 0.5);
        doc.append(body, video);

        let mut graph = SimulatedGraph::new(doc.clone());
        let mut meter = LevelMeter::new(4800);
        assert_eq!(meter.measure(&mut graph).rms, 0.0);

        let node = graph.create_gain().unwrap();
        graph.connect_element(video, node).unwrap();
        let reading = meter.measure(&mut graph);
        assert!((reading.rms - 0.5 / 2f32.sqrt()).abs() < 0.01);

        doc.remove(video);
        assert_eq!(meter.measure(&mut graph).rms, 0.0);
    }

    #[test]
    fn second_connect_is_already_connected() {
        let (doc, body) = MemoryDocument::with_body();
        let video = doc.create_media(MediaKind::Video, true, 0.5);
        doc.append(body, video);
        let mut graph = SimulatedGraph::new(doc);
        let a = graph.create_gain().unwrap();
        let b = graph.create_gain().unwrap();
        graph.connect_element(video, a).unwrap();
        assert!(matches!(
            graph.connect_element(video, b),
            Err(GraphError::AlreadyConnected(_))
        ));
    }

    #[test]
    fn suspended_graph_is_silent_until_resumed() {
        let (doc, body) = MemoryDocument::with_body();
        let audio = doc.create_media(MediaKind::Audio, true, 0.8);
        doc.append(body, audio);
        let mut graph = SimulatedGraph::suspended(doc);
        let node = graph.create_gain().unwrap();
        graph.connect_element(audio, node).unwrap();

        let mut meter = LevelMeter::new(2048);
        assert!(graph.is_suspended());
        assert_eq!(meter.measure(&mut graph).rms, 0.0);
        graph.resume().unwrap();
        assert!(meter.measure(&mut graph).rms > 0.1);
    }
}
