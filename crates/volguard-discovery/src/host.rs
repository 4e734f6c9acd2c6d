//! Host-environment seams.
//!
//! The engine never touches a real document or audio stack. A host supplies
//! [`DomHost`] for tree access and mutation notifications, and [`AudioGraph`]
//! for source/gain/analyser wiring.

use std::fmt;

use volguard_core::AnalysisSource;

use crate::{GraphError, HostError};

/// Opaque handle to a node in the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

/// Handle to a gain node owned by an [`AudioGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GainNodeId(pub u32);

/// Kind of media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// `<audio>`
    Audio,
    /// `<video>`
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        })
    }
}

/// Something the host reports between ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// Nodes were inserted under the observed root.
    NodesAdded(Vec<ElementId>),
    /// Nodes were removed from under the observed root.
    NodesRemoved(Vec<ElementId>),
    /// An element registered with [`DomHost::watch_source`] now has a source.
    SourceReady(ElementId),
    /// The document root now exists.
    RootAvailable,
    /// The page finished loading.
    PageLoaded,
    /// The user clicked or pressed a key.
    UserGesture,
}

/// Read access to the host document plus its notification hooks.
pub trait DomHost {
    /// Root the engine scans and observes (the document body). `None` while
    /// the page has not built it yet.
    fn document_root(&self) -> Result<Option<ElementId>, HostError>;

    /// `Some` for audio/video elements.
    fn media_kind(&self, element: ElementId) -> Result<Option<MediaKind>, HostError>;

    /// Light-tree children, in document order.
    fn children(&self, element: ElementId) -> Result<Vec<ElementId>, HostError>;

    /// Attached shadow root, if any.
    fn shadow_root(&self, element: ElementId) -> Result<Option<ElementId>, HostError>;

    /// Whether the element is still attached to the document.
    fn is_connected(&self, element: ElementId) -> Result<bool, HostError>;

    /// Whether the element exposes a playable source (`src`, `srcObject`,
    /// or a non-empty `currentSrc`).
    fn has_media_source(&self, element: ElementId) -> Result<bool, HostError>;

    /// Start reporting subtree insertions and removals under `root`.
    fn observe(&mut self, root: ElementId) -> Result<(), HostError>;

    /// Deliver one [`HostEvent::SourceReady`] the next time `element` gains a
    /// source. One-shot.
    fn watch_source(&mut self, element: ElementId) -> Result<(), HostError>;

    /// Take every event queued since the last call.
    fn drain_events(&mut self) -> Vec<HostEvent>;
}

/// The page's audio graph.
///
/// Every bound element feeds its own gain node (then the output) and the
/// shared analyser; [`AnalysisSource`] reads that analyser.
pub trait AudioGraph: AnalysisSource {
    /// Create a gain node wired to the output, at unity.
    fn create_gain(&mut self) -> Result<GainNodeId, GraphError>;

    /// Route `element` through `gain` and into the analyser.
    ///
    /// Fails with [`GraphError::AlreadyConnected`] when the element already
    /// feeds a source node.
    fn connect_element(&mut self, element: ElementId, gain: GainNodeId) -> Result<(), GraphError>;

    /// Set a gain node's level.
    fn set_gain(&mut self, gain: GainNodeId, value: f32) -> Result<(), GraphError>;

    /// Resume a suspended context (needs a user gesture on most hosts).
    fn resume(&mut self) -> Result<(), GraphError>;

    /// Whether the context is suspended.
    fn is_suspended(&self) -> bool;
}
