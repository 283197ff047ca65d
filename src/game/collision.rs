//! Box collision against the node map
//!
//! Movement is split into sub-steps no longer than `pos_max_d`; in each
//! sub-step the axes are resolved one at a time (Y first) and an axis that
//! would push the box into a walkable node is left unmoved with its velocity
//! zeroed.

use crate::game::map::NodeMap;
use crate::game::math::{Aabb3f, V3f, V3s16, BS};

/// Upper bound on sub-steps per call
const MAX_SUBSTEPS: usize = 100;

/// Outcome of a collision move
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionMoveResult {
    /// Box rests on a walkable node
    pub touching_ground: bool,
    /// Movement was blocked on at least one axis
    pub collides: bool,
    /// Horizontal movement was blocked
    pub collides_xz: bool,
}

/// World-space box of a node
fn node_box(p: V3s16) -> Aabb3f {
    let center = p.to_world();
    let half = V3f::new(BS / 2.0, BS / 2.0, BS / 2.0);
    Aabb3f::new(center - half, center + half)
}

/// Whether a world-space box overlaps any walkable node
pub fn box_collides(map: &dyn NodeMap, b: &Aabb3f) -> bool {
    let min = b.min.to_node();
    let max = b.max.to_node();
    for x in min.x..=max.x {
        for y in min.y..=max.y {
            for z in min.z..=max.z {
                let p = V3s16::new(x, y, z);
                if map.is_walkable(p) && node_box(p).intersects(b) {
                    return true;
                }
            }
        }
    }
    false
}

/// Move `pos` by `vel * dtime`, stopping at walkable nodes
///
/// `collisionbox` is relative to `pos` and already in world units.
pub fn collision_move(
    map: &dyn NodeMap,
    pos_max_d: f32,
    collisionbox: &Aabb3f,
    dtime: f32,
    pos: &mut V3f,
    vel: &mut V3f,
) -> CollisionMoveResult {
    let mut result = CollisionMoveResult::default();
    if dtime <= 0.0 {
        return result;
    }

    let distance = (*vel * dtime).length();
    let substeps = if pos_max_d > 0.0 {
        ((distance / pos_max_d).ceil() as usize).clamp(1, MAX_SUBSTEPS)
    } else {
        1
    };
    let step_dtime = dtime / substeps as f32;

    for _ in 0..substeps {
        for axis in [1usize, 0, 2] {
            let d = vel.axis(axis) * step_dtime;
            if d == 0.0 {
                continue;
            }
            let mut trial = *pos;
            trial.set_axis(axis, pos.axis(axis) + d);
            if box_collides(map, &collisionbox.translated(trial)) {
                if axis == 1 && d < 0.0 {
                    result.touching_ground = true;
                }
                if axis != 1 {
                    result.collides_xz = true;
                }
                result.collides = true;
                vel.set_axis(axis, 0.0);
            } else {
                *pos = trial;
            }
        }
    }

    if !result.touching_ground {
        let below = collisionbox.translated(*pos - V3f::new(0.0, 0.01 * BS, 0.0));
        result.touching_ground = box_collides(map, &below);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::map::{NodeKind, VoxelMap};

    fn floor_map() -> VoxelMap {
        let mut map = VoxelMap::new();
        map.fill(V3s16::new(-3, -1, -3), V3s16::new(3, -1, 3), NodeKind::Solid);
        map
    }

    fn small_box() -> Aabb3f {
        Aabb3f::default().scaled(0.3 * BS)
    }

    #[test]
    fn test_falls_onto_floor() {
        let map = floor_map();
        let mut pos = V3f::new(0.0, 5.0, 0.0);
        let mut vel = V3f::new(0.0, -100.0, 0.0);

        let result = collision_move(&map, 0.25 * BS, &small_box(), 1.0, &mut pos, &mut vel);
        assert!(result.touching_ground);
        assert!(result.collides);
        assert_eq!(vel.y, 0.0);
        // Floor top is at -5.0, box half height 1.5
        assert!(pos.y >= -3.5 - 1e-3);
        assert!(pos.y < 0.0);
    }

    #[test]
    fn test_free_flight() {
        let map = VoxelMap::new();
        let mut pos = V3f::ZERO;
        let mut vel = V3f::new(10.0, 0.0, 0.0);
        let result = collision_move(&map, 0.25 * BS, &small_box(), 0.5, &mut pos, &mut vel);
        assert_eq!(result, CollisionMoveResult::default());
        assert!((pos.x - 5.0).abs() < 1e-4);
        assert_eq!(vel.x, 10.0);
    }

    #[test]
    fn test_wall_blocks_horizontal() {
        let mut map = VoxelMap::new();
        map.fill(V3s16::new(2, -2, -2), V3s16::new(2, 2, 2), NodeKind::Solid);
        let mut pos = V3f::ZERO;
        let mut vel = V3f::new(50.0, 0.0, 0.0);
        let result = collision_move(&map, 0.25 * BS, &small_box(), 1.0, &mut pos, &mut vel);
        assert!(result.collides_xz);
        assert_eq!(vel.x, 0.0);
        // Wall face at x = 15.0, box half width 1.5
        assert!(pos.x <= 13.5 + 1e-3);
    }
}
