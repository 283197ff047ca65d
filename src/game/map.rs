//! Node map
//!
//! The active objects only need to ask two questions of the world map: can an
//! object stand in a node, and is a node liquid. `NodeMap` is that seam;
//! `VoxelMap` is a sparse in-memory implementation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::game::math::V3s16;

/// Kind of node occupying a position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Empty space
    #[default]
    Air,
    /// Walkable solid node
    Solid,
    /// Liquid node (not walkable)
    Liquid,
    /// Unloaded or unknown area
    Ignore,
}

impl NodeKind {
    /// Objects collide with solid nodes and with unloaded space
    pub fn is_walkable(self) -> bool {
        matches!(self, NodeKind::Solid | NodeKind::Ignore)
    }

    pub fn is_liquid(self) -> bool {
        matches!(self, NodeKind::Liquid)
    }
}

/// Read access to the world's nodes
pub trait NodeMap: Send + Sync {
    /// Node at a position
    fn node(&self, pos: V3s16) -> NodeKind;

    fn is_walkable(&self, pos: V3s16) -> bool {
        self.node(pos).is_walkable()
    }

    fn is_liquid(&self, pos: V3s16) -> bool {
        self.node(pos).is_liquid()
    }
}

/// Sparse map: unset positions hold `default_kind`
#[derive(Debug, Clone, Default)]
pub struct VoxelMap {
    nodes: HashMap<V3s16, NodeKind>,
    default_kind: NodeKind,
}

impl VoxelMap {
    /// Create an empty map of air
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a map whose unset positions are the given kind
    pub fn filled_with(default_kind: NodeKind) -> Self {
        Self {
            nodes: HashMap::new(),
            default_kind,
        }
    }

    /// Set a node
    pub fn set_node(&mut self, pos: V3s16, kind: NodeKind) {
        if kind == self.default_kind {
            self.nodes.remove(&pos);
        } else {
            self.nodes.insert(pos, kind);
        }
    }

    /// Fill a box of nodes (inclusive corners)
    pub fn fill(&mut self, from: V3s16, to: V3s16, kind: NodeKind) {
        for x in from.x.min(to.x)..=from.x.max(to.x) {
            for y in from.y.min(to.y)..=from.y.max(to.y) {
                for z in from.z.min(to.z)..=from.z.max(to.z) {
                    self.set_node(V3s16::new(x, y, z), kind);
                }
            }
        }
    }

    /// Number of explicitly set nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeMap for VoxelMap {
    fn node(&self, pos: V3s16) -> NodeKind {
        self.nodes.get(&pos).copied().unwrap_or(self.default_kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kinds() {
        assert!(NodeKind::Solid.is_walkable());
        assert!(NodeKind::Ignore.is_walkable());
        assert!(!NodeKind::Liquid.is_walkable());
        assert!(NodeKind::Liquid.is_liquid());
        assert!(!NodeKind::Air.is_walkable());
    }

    #[test]
    fn test_voxel_map_fill() {
        let mut map = VoxelMap::new();
        map.fill(V3s16::new(-1, 0, -1), V3s16::new(1, 0, 1), NodeKind::Solid);
        assert_eq!(map.len(), 9);
        assert!(map.is_walkable(V3s16::new(0, 0, 0)));
        assert!(!map.is_walkable(V3s16::new(0, 1, 0)));

        map.set_node(V3s16::new(0, 0, 0), NodeKind::Air);
        assert_eq!(map.len(), 8);
    }

    #[test]
    fn test_default_kind() {
        let map = VoxelMap::filled_with(NodeKind::Liquid);
        assert!(map.is_liquid(V3s16::new(100, -5, 3)));
    }
}
