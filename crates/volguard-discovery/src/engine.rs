//! The discovery engine: scan, bind, watch, retry, evict.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use volguard_config::Tuning;

use crate::registry::{BindingRegistry, MediaBinding};
use crate::retry::RetrySchedule;
use crate::{AudioGraph, DomHost, ElementId, GainNodeId, GraphError, HostEvent, MediaKind};

/// Knobs for [`DiscoveryEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoverySettings {
    /// Deepest nesting (light tree plus shadow trees) a scan descends into.
    pub max_depth: usize,
    /// Spacing between late-render retries.
    pub retry_interval: Duration,
    /// Retry budget.
    pub retry_max_attempts: u32,
    /// Re-check period while the root to observe does not exist.
    pub observer_install_retry: Duration,
}

impl From<&Tuning> for DiscoverySettings {
    fn from(t: &Tuning) -> Self {
        Self {
            max_depth: t.max_traversal_depth,
            retry_interval: t.retry_interval(),
            retry_max_attempts: t.retry_max_attempts,
            observer_install_retry: t.observer_install_retry(),
        }
    }
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self::from(&Tuning::default())
    }
}

/// Result of one [`DiscoveryEngine::bind`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// New binding with the element feeding its gain node.
    Bound,
    /// New binding, but the element was already attached elsewhere.
    Degraded,
    /// The element already had a binding.
    AlreadyBound,
    /// No source yet; one more attempt happens when it appears.
    AwaitingSource,
    /// Not an audio/video element.
    NotMedia,
    /// Host or graph refused; no binding was made.
    Failed,
}

impl BindOutcome {
    /// Whether the element ends up with a binding.
    pub fn is_bound(self) -> bool {
        matches!(
            self,
            BindOutcome::Bound | BindOutcome::Degraded | BindOutcome::AlreadyBound
        )
    }
}

/// Counters from one traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Nodes looked at.
    pub visited: usize,
    /// Audio/video elements seen, bound or not.
    pub media_found: usize,
    /// Bindings created by this scan.
    pub newly_bound: usize,
    /// Steps that failed and were skipped.
    pub errors: usize,
    /// Subtrees not entered because of the depth limit.
    pub truncated: usize,
}

impl ScanReport {
    fn merge(&mut self, other: ScanReport) {
        self.visited += other.visited;
        self.media_found += other.media_found;
        self.newly_bound += other.newly_bound;
        self.errors += other.errors;
        self.truncated += other.truncated;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Observer {
    NotInstalled,
    Deferred { next_check: Duration },
    Installed(ElementId),
}

/// A gain node the engine created for one element. Outlives the binding, so
/// a detached and re-attached element keeps feeding the same node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OwnedNode {
    node: GainNodeId,
    wired: bool,
}

/// Finds media elements and keeps exactly one binding per element.
///
/// Nothing here returns an error. Each traversal and bind step logs its own
/// failure and moves on.
#[derive(Debug)]
pub struct DiscoveryEngine<H> {
    host: H,
    registry: BindingRegistry,
    nodes: BTreeMap<ElementId, OwnedNode>,
    pending_source: BTreeSet<ElementId>,
    observer: Observer,
    retry: RetrySchedule,
    settings: DiscoverySettings,
}

impl<H: DomHost> DiscoveryEngine<H> {
    /// Create an engine over `host`.
    pub fn new(host: H, settings: DiscoverySettings) -> Self {
        Self {
            host,
            registry: BindingRegistry::new(),
            nodes: BTreeMap::new(),
            pending_source: BTreeSet::new(),
            observer: Observer::NotInstalled,
            retry: RetrySchedule::new(settings.retry_interval, settings.retry_max_attempts),
            settings,
        }
    }

    /// The host document.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable host access, for draining events.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Current bindings.
    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    /// Late-render retry state.
    pub fn retry(&self) -> &RetrySchedule {
        &self.retry
    }

    /// Whether the mutation observer is installed.
    pub fn is_observing(&self) -> bool {
        matches!(self.observer, Observer::Installed(_))
    }

    /// Gain node created for `element`, bound or not.
    pub fn gain_node_of(&self, element: ElementId) -> Option<GainNodeId> {
        self.nodes.get(&element).map(|owned| owned.node)
    }

    /// Elements waiting for a source.
    pub fn pending_sources(&self) -> usize {
        self.pending_source.len()
    }

    /// Traverse `root`, its descendants, and every shadow tree below it,
    /// binding each audio/video element found.
    pub fn scan<G: AudioGraph + ?Sized>(&mut self, graph: &mut G, root: ElementId) -> ScanReport {
        let mut report = ScanReport::default();
        let mut seen = BTreeSet::new();
        let mut stack = vec![(root, 0usize)];

        while let Some((node, depth)) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            report.visited += 1;

            match self.host.media_kind(node) {
                Ok(Some(kind)) => {
                    report.media_found += 1;
                    let outcome = self.bind_as(graph, node, kind);
                    if matches!(outcome, BindOutcome::Bound | BindOutcome::Degraded) {
                        report.newly_bound += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(element = %node, error = %e, "media check failed");
                    report.errors += 1;
                }
            }

            if depth >= self.settings.max_depth {
                report.truncated += 1;
                tracing::debug!(element = %node, depth, "depth limit reached");
                continue;
            }

            match self.host.children(node) {
                Ok(children) => stack.extend(children.into_iter().rev().map(|c| (c, depth + 1))),
                Err(e) => {
                    tracing::warn!(element = %node, error = %e, "children unavailable");
                    report.errors += 1;
                }
            }
            match self.host.shadow_root(node) {
                Ok(Some(shadow)) => stack.push((shadow, depth + 1)),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(element = %node, error = %e, "shadow root unavailable");
                    report.errors += 1;
                }
            }
        }

        tracing::debug!(
            root = %root,
            visited = report.visited,
            media = report.media_found,
            bound = report.newly_bound,
            "scan complete"
        );
        report
    }

    /// Scan the whole document. Arms the late-render retry when nothing is
    /// found.
    pub fn scan_document<G: AudioGraph + ?Sized>(
        &mut self,
        graph: &mut G,
        now: Duration,
    ) -> ScanReport {
        let report = match self.host.document_root() {
            Ok(Some(root)) => self.scan(graph, root),
            Ok(None) => ScanReport::default(),
            Err(e) => {
                tracing::warn!(error = %e, "document root unavailable");
                ScanReport {
                    errors: 1,
                    ..ScanReport::default()
                }
            }
        };
        if report.media_found == 0 {
            self.retry.arm(now);
        } else {
            self.retry.satisfy();
        }
        report
    }

    /// Bind one element. Idempotent.
    pub fn bind<G: AudioGraph + ?Sized>(&mut self, graph: &mut G, element: ElementId) -> BindOutcome {
        if self.registry.contains(element) {
            return BindOutcome::AlreadyBound;
        }
        match self.host.media_kind(element) {
            Ok(Some(kind)) => self.bind_as(graph, element, kind),
            Ok(None) => BindOutcome::NotMedia,
            Err(e) => {
                tracing::warn!(element = %element, error = %e, "media check failed");
                BindOutcome::Failed
            }
        }
    }

    fn bind_as<G: AudioGraph + ?Sized>(
        &mut self,
        graph: &mut G,
        element: ElementId,
        kind: MediaKind,
    ) -> BindOutcome {
        if self.registry.contains(element) {
            return BindOutcome::AlreadyBound;
        }

        match self.host.has_media_source(element) {
            Ok(true) => {}
            Ok(false) => {
                if self.pending_source.insert(element) {
                    if let Err(e) = self.host.watch_source(element) {
                        tracing::warn!(element = %element, error = %e, "cannot watch for source");
                        self.pending_source.remove(&element);
                        return BindOutcome::Failed;
                    }
                    tracing::debug!(element = %element, %kind, "waiting for media source");
                }
                return BindOutcome::AwaitingSource;
            }
            Err(e) => {
                tracing::warn!(element = %element, error = %e, "source check failed");
                return BindOutcome::Failed;
            }
        }

        let owned = match self.nodes.get(&element) {
            Some(owned) => *owned,
            None => match graph.create_gain() {
                Ok(node) => {
                    let owned = OwnedNode { node, wired: false };
                    self.nodes.insert(element, owned);
                    owned
                }
                Err(e) => {
                    tracing::warn!(element = %element, error = %e, "gain node creation failed");
                    return BindOutcome::Failed;
                }
            },
        };
        let gain_node = owned.node;

        let (degraded, outcome) = if owned.wired {
            tracing::debug!(element = %element, node = gain_node.0, "reusing gain node");
            (false, BindOutcome::Bound)
        } else {
            match graph.connect_element(element, gain_node) {
                Ok(()) => {
                    self.nodes.insert(element, OwnedNode { node: gain_node, wired: true });
                    (false, BindOutcome::Bound)
                }
                Err(GraphError::AlreadyConnected(_)) => {
                    tracing::warn!(element = %element, "already attached elsewhere; binding degraded");
                    (true, BindOutcome::Degraded)
                }
                Err(e) => {
                    tracing::warn!(element = %element, error = %e, "connect failed");
                    return BindOutcome::Failed;
                }
            }
        };

        self.registry.insert(MediaBinding {
            element,
            kind,
            gain_node,
            degraded,
        });
        self.pending_source.remove(&element);
        tracing::debug!(element = %element, %kind, degraded, "media element bound");
        outcome
    }

    /// Install the subtree observer on the document root, or defer until the
    /// root exists. Returns whether the observer is installed.
    pub fn watch(&mut self, now: Duration) -> bool {
        if self.is_observing() {
            return true;
        }
        let root = match self.host.document_root() {
            Ok(Some(root)) => root,
            Ok(None) => {
                self.defer_observer(now);
                return false;
            }
            Err(e) => {
                tracing::warn!(error = %e, "document root unavailable");
                self.defer_observer(now);
                return false;
            }
        };
        match self.host.observe(root) {
            Ok(()) => {
                self.observer = Observer::Installed(root);
                tracing::info!(root = %root, "mutation observer installed");
                true
            }
            Err(e) => {
                tracing::warn!(root = %root, error = %e, "observer install failed");
                self.defer_observer(now);
                false
            }
        }
    }

    fn defer_observer(&mut self, now: Duration) {
        self.observer = Observer::Deferred {
            next_check: now + self.settings.observer_install_retry,
        };
        tracing::debug!("observer install deferred");
    }

    /// React to a host notification. Returns `false` for events that are not
    /// discovery's concern ([`HostEvent::PageLoaded`], [`HostEvent::UserGesture`]).
    pub fn handle_event<G: AudioGraph + ?Sized>(
        &mut self,
        graph: &mut G,
        event: &HostEvent,
        now: Duration,
    ) -> bool {
        match event {
            HostEvent::NodesAdded(nodes) => {
                let found: usize = nodes.iter().map(|&node| self.scan(graph, node).media_found).sum();
                if found > 0 {
                    self.retry.satisfy();
                }
                true
            }
            HostEvent::NodesRemoved(_) => {
                self.evict_detached();
                true
            }
            HostEvent::SourceReady(element) => {
                if self.pending_source.remove(element) {
                    let outcome = self.bind(graph, *element);
                    tracing::debug!(element = %element, ?outcome, "source ready");
                    if outcome.is_bound() {
                        self.retry.satisfy();
                    }
                }
                true
            }
            HostEvent::RootAvailable => {
                if self.watch(now) {
                    self.scan_document(graph, now);
                }
                true
            }
            HostEvent::PageLoaded | HostEvent::UserGesture => false,
        }
    }

    /// Periodic housekeeping: re-check a deferred observer install and run a
    /// late-render retry when one is due. Returns the scans performed.
    pub fn retry_tick<G: AudioGraph + ?Sized>(&mut self, graph: &mut G, now: Duration) -> ScanReport {
        let mut report = ScanReport::default();

        if let Observer::Deferred { next_check } = self.observer
            && now >= next_check
            && self.watch(now)
        {
            report.merge(self.scan_document(graph, now));
        }

        if self.retry.is_due(now) {
            let scan = match self.host.document_root() {
                Ok(Some(root)) => self.scan(graph, root),
                _ => ScanReport::default(),
            };
            self.retry.record(now, scan.media_found > 0);
            tracing::debug!(
                attempt = self.retry.attempts(),
                found = scan.media_found,
                "late-render retry"
            );
            report.merge(scan);
        }
        report
    }

    /// Drop bindings (and pending source watches) whose element has left the
    /// document. Returns the number of bindings evicted.
    pub fn evict_detached(&mut self) -> usize {
        let mut evicted = 0;
        for element in self.registry.elements() {
            if !self.still_connected(element) {
                self.registry.remove(element);
                evicted += 1;
                tracing::debug!(element = %element, "evicted detached binding");
            }
        }
        let pending: Vec<_> = self.pending_source.iter().copied().collect();
        for element in pending {
            if !self.still_connected(element) {
                self.pending_source.remove(&element);
            }
        }
        evicted
    }

    fn still_connected(&self, element: ElementId) -> bool {
        match self.host.is_connected(element) {
            Ok(connected) => connected,
            Err(e) => {
                tracing::debug!(element = %element, error = %e, "liveness check failed");
                false
            }
        }
    }

    /// Set every live binding's gain node to `gain`. Bindings found detached
    /// along the way are evicted. Returns how many nodes were updated.
    pub fn apply_gain<G: AudioGraph + ?Sized>(&mut self, graph: &mut G, gain: f32) -> usize {
        let mut applied = 0;
        for element in self.registry.elements() {
            if !self.still_connected(element) {
                self.registry.remove(element);
                tracing::debug!(element = %element, "evicted detached binding");
                continue;
            }
            let Some(node) = self.registry.get(element).map(|b| b.gain_node) else {
                continue;
            };
            match graph.set_gain(node, gain) {
                Ok(()) => applied += 1,
                Err(e) => tracing::warn!(element = %element, error = %e, "set gain failed"),
            }
        }
        applied
    }
}
