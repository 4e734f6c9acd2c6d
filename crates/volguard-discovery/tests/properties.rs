//! Property tests: random trees, random bind orders.

use std::time::Duration;

use proptest::prelude::*;
use volguard_discovery::sim::{MemoryDocument, SimulatedGraph};
use volguard_discovery::{DiscoveryEngine, DiscoverySettings, ElementId, MediaKind};

/// Node layout: (parent index into already-built nodes, kind selector, in shadow).
fn build(doc: &MemoryDocument, body: ElementId, layout: &[(usize, u8, bool)]) -> Vec<ElementId> {
    let mut nodes = vec![body];
    let mut media = Vec::new();
    for &(parent_ix, kind, shadow) in layout {
        let parent = nodes[parent_ix % nodes.len()];
        let parent = if shadow {
            doc.attach_shadow(parent).unwrap_or(parent)
        } else {
            parent
        };
        let id = match kind % 3 {
            0 => doc.create_element(),
            1 => doc.create_media(MediaKind::Audio, true, 0.1),
            _ => doc.create_media(MediaKind::Video, true, 0.1),
        };
        if kind % 3 != 0 {
            media.push(id);
        }
        doc.append(parent, id);
        nodes.push(id);
    }
    media
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn every_media_element_bound_exactly_once(
        layout in prop::collection::vec((0usize..64, 0u8..3, any::<bool>()), 1..30),
        rescans in 1usize..4,
    ) {
        let (doc, body) = MemoryDocument::with_body();
        let media = build(&doc, body, &layout);
        let mut graph = SimulatedGraph::new(doc.clone());
        let mut engine = DiscoveryEngine::new(doc, DiscoverySettings::default());

        for _ in 0..rescans {
            engine.scan_document(&mut graph, Duration::ZERO);
        }
        for &m in &media {
            engine.bind(&mut graph, m);
        }

        prop_assert_eq!(engine.registry().len(), media.len());
        prop_assert_eq!(graph.gain_nodes(), media.len());
        for m in media {
            prop_assert!(engine.registry().contains(m));
        }
    }
}
