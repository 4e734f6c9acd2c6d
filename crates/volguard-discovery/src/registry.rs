//! Element → binding registry.

use std::collections::BTreeMap;

use crate::{ElementId, GainNodeId, MediaKind};

/// One media element wired into the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaBinding {
    /// The bound element.
    pub element: ElementId,
    /// Audio or video.
    pub kind: MediaKind,
    /// Gain node the element's signal flows through.
    pub gain_node: GainNodeId,
    /// The element was already attached elsewhere; the gain node exists but
    /// is not fed by this element's signal.
    pub degraded: bool,
}

/// Bindings keyed by element. At most one per element.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    bindings: BTreeMap<ElementId, MediaBinding>,
}

impl BindingRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a binding. An existing binding for the same element is kept and
    /// `false` returned.
    pub fn insert(&mut self, binding: MediaBinding) -> bool {
        if self.bindings.contains_key(&binding.element) {
            return false;
        }
        self.bindings.insert(binding.element, binding);
        true
    }

    /// Whether `element` is bound.
    pub fn contains(&self, element: ElementId) -> bool {
        self.bindings.contains_key(&element)
    }

    /// Binding for `element`.
    pub fn get(&self, element: ElementId) -> Option<&MediaBinding> {
        self.bindings.get(&element)
    }

    /// Drop the binding for `element`.
    pub fn remove(&mut self, element: ElementId) -> Option<MediaBinding> {
        self.bindings.remove(&element)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings in element order.
    pub fn iter(&self) -> impl Iterator<Item = &MediaBinding> {
        self.bindings.values()
    }

    /// Bound element handles.
    pub fn elements(&self) -> Vec<ElementId> {
        self.bindings.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(id: u64, node: u32) -> MediaBinding {
        MediaBinding {
            element: ElementId(id),
            kind: MediaKind::Video,
            gain_node: GainNodeId(node),
            degraded: false,
        }
    }

    #[test]
    fn insert_is_once_per_element() {
        let mut reg = BindingRegistry::new();
        assert!(reg.insert(binding(1, 0)));
        assert!(!reg.insert(binding(1, 9)));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(ElementId(1)).unwrap().gain_node, GainNodeId(0));
    }

    #[test]
    fn remove_frees_the_slot() {
        let mut reg = BindingRegistry::new();
        reg.insert(binding(3, 0));
        assert!(reg.remove(ElementId(3)).is_some());
        assert!(reg.is_empty());
        assert!(reg.insert(binding(3, 1)));
    }

    #[test]
    fn elements_are_ordered() {
        let mut reg = BindingRegistry::new();
        reg.insert(binding(5, 0));
        reg.insert(binding(2, 1));
        assert_eq!(reg.elements(), vec![ElementId(2), ElementId(5)]);
    }
}
