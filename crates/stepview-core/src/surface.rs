//! Render surface abstraction
//!
//! The reconciler drives any scene graph through [`RenderSurface`]. The web
//! viewer implements it over Bevy entities; [`HeadlessSurface`] keeps nodes
//! in memory for tests and headless runs.

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::geometry::Primitive;

/// A retained-mode scene graph supporting add/remove and per-node visibility
pub trait RenderSurface {
    /// Handle to a live node. Owned exclusively by the object-group registry.
    type Handle: Clone + PartialEq + Debug;

    /// Upload a primitive and attach it to the scene, visible
    fn insert(&mut self, primitive: &Primitive) -> Self::Handle;

    /// Detach a node from the scene without freeing its resources
    fn detach(&mut self, handle: &Self::Handle);

    /// Free the graphics resources behind a detached node
    fn release(&mut self, handle: Self::Handle);

    fn set_visible(&mut self, handle: &Self::Handle, visible: bool);
}

/// Node held by a [`HeadlessSurface`]
#[derive(Debug, Clone)]
pub struct HeadlessNode {
    pub primitive: Primitive,
    pub attached: bool,
    pub visible: bool,
}

/// In-memory render surface
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    next_id: u64,
    nodes: BTreeMap<u64, HeadlessNode>,
    released: Vec<u64>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: u64) -> Option<&HeadlessNode> {
        self.nodes.get(&id)
    }

    /// Nodes currently attached to the scene
    pub fn attached(&self) -> impl Iterator<Item = (u64, &HeadlessNode)> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.attached)
            .map(|(id, node)| (*id, node))
    }

    pub fn attached_count(&self) -> usize {
        self.attached().count()
    }

    /// Nodes whose resources are still allocated (attached or not)
    pub fn live_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_released(&self, id: u64) -> bool {
        self.released.contains(&id)
    }

    pub fn is_visible(&self, id: u64) -> Option<bool> {
        self.nodes.get(&id).map(|node| node.visible)
    }

    pub fn released_count(&self) -> usize {
        self.released.len()
    }
}

impl RenderSurface for HeadlessSurface {
    type Handle = u64;

    fn insert(&mut self, primitive: &Primitive) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(
            id,
            HeadlessNode {
                primitive: primitive.clone(),
                attached: true,
                visible: true,
            },
        );
        id
    }

    fn detach(&mut self, handle: &u64) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.attached = false;
        }
    }

    fn release(&mut self, handle: u64) {
        match self.nodes.remove(&handle) {
            Some(node) => {
                if node.attached {
                    tracing::warn!(node = handle, "Released a node that was still attached");
                }
                self.released.push(handle);
            }
            None => tracing::warn!(node = handle, "Release of unknown node"),
        }
    }

    fn set_visible(&mut self, handle: &u64, visible: bool) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.visible = visible;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::global_axes;

    #[test]
    fn test_headless_lifecycle() {
        let mut surface = HeadlessSurface::new();
        let prims = global_axes();
        let id = surface.insert(&prims[0]);

        assert_eq!(surface.attached_count(), 1);
        assert_eq!(surface.is_visible(id), Some(true));

        surface.set_visible(&id, false);
        assert_eq!(surface.is_visible(id), Some(false));

        surface.detach(&id);
        assert_eq!(surface.attached_count(), 0);
        assert_eq!(surface.live_count(), 1);

        surface.release(id);
        assert_eq!(surface.live_count(), 0);
        assert!(surface.is_released(id));
    }
}
