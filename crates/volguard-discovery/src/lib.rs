//! Volguard Discovery - finding and binding media elements
//!
//! Pages add media whenever they like: in the initial markup, deep inside
//! shadow trees, after a client-side route change, or with no source until
//! metadata loads. The [`DiscoveryEngine`] keeps finding them and wires each
//! one into the audio graph exactly once.
//!
//! # Host Seams
//!
//! - [`DomHost`] - tree access, mutation observer, source-ready callbacks
//! - [`AudioGraph`] - gain nodes, element routing, analyser readout
//!
//! [`sim`] has in-memory implementations of both.
//!
//! # Discovery Paths
//!
//! | Trigger | Engine entry point |
//! |---|---|
//! | Initial load | [`DiscoveryEngine::scan_document`] |
//! | Subtree insertion | [`HostEvent::NodesAdded`] via [`DiscoveryEngine::handle_event`] |
//! | Source appears later | [`HostEvent::SourceReady`] (one extra attempt) |
//! | Late client-side render | [`DiscoveryEngine::retry_tick`] |
//! | Body not built yet | deferred [`DiscoveryEngine::watch`] |
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use volguard_discovery::sim::{MemoryDocument, SimulatedGraph};
//! use volguard_discovery::{DiscoveryEngine, DiscoverySettings, MediaKind};
//!
//! let (doc, body) = MemoryDocument::with_body();
//! let host = doc.create_element();
//! doc.append(body, host);
//! let shadow = doc.attach_shadow(host).unwrap();
//! let video = doc.create_media(MediaKind::Video, true, 0.5);
//! doc.append(shadow, video);
//!
//! let mut graph = SimulatedGraph::new(doc.clone());
//! let mut engine = DiscoveryEngine::new(doc, DiscoverySettings::default());
//! let report = engine.scan_document(&mut graph, Duration::ZERO);
//!
//! assert_eq!(report.newly_bound, 1);
//! assert!(engine.registry().contains(video));
//! ```

mod engine;
mod error;
mod host;
mod registry;
mod retry;
pub mod sim;

pub use engine::{BindOutcome, DiscoveryEngine, DiscoverySettings, ScanReport};
pub use error::{GraphError, HostError};
pub use host::{AudioGraph, DomHost, ElementId, GainNodeId, HostEvent, MediaKind};
pub use registry::{BindingRegistry, MediaBinding};
pub use retry::{RetrySchedule, RetryState};
