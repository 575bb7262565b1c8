//! # Pathfinding
//!
//! Grid A* over standing cells. A cell `(x, y, z)` is standable when the
//! block below is solid and the two above the feet are clear.
//!
//! Moves:
//! - 8-connected on the same level; diagonals may not cut corners
//! - step up one block
//! - drop down up to [`Pathfinder::max_drop`] blocks
//!
//! Searches stop after a node budget so one unreachable target cannot stall
//! a frame.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use ragamuffin_world::BlockPos;

use crate::physics::VoxelQuery;

const STRAIGHT: u32 = 10;
const DIAGONAL: u32 = 14;
const STEP_UP: u32 = 5;
const DROP: u32 = 2;

const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Grid A* over standable cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pathfinder {
    /// Nodes expanded before giving up.
    pub max_nodes: usize,
    /// Deepest drop taken in one move.
    pub max_drop: i32,
}

impl Default for Pathfinder {
    fn default() -> Self {
        Self {
            max_nodes: 2000,
            max_drop: 3,
        }
    }
}

/// Solid below, two clear blocks from the feet up.
pub fn is_standable(world: &impl VoxelQuery, pos: BlockPos) -> bool {
    world.is_solid(pos.x, pos.y - 1, pos.z) && is_clear(world, pos)
}

fn is_clear(world: &impl VoxelQuery, pos: BlockPos) -> bool {
    !world.is_solid(pos.x, pos.y, pos.z) && !world.is_solid(pos.x, pos.y + 1, pos.z)
}

/// Nearest standable cell in the column, searching a couple of blocks up
/// and down from `pos`.
pub fn snap_to_ground(world: &impl VoxelQuery, pos: BlockPos) -> Option<BlockPos> {
    [0, -1, 1, -2, -3]
        .into_iter()
        .map(|dy| pos.offset(0, dy, 0))
        .find(|&p| is_standable(world, p))
}

impl Pathfinder {
    /// Creates a pathfinder with a node budget.
    #[must_use]
    pub const fn new(max_nodes: usize) -> Self {
        Self { max_nodes, max_drop: 3 }
    }

    /// Finds a walkable route. Returns waypoints after `start`, ending at
    /// `goal`; empty if already there.
    ///
    /// `start` and `goal` are snapped to the ground first. Returns `None` when
    /// either is not standable, the goal is unreachable, or the node budget
    /// runs out.
    pub fn find_path(&self, world: &impl VoxelQuery, start: BlockPos, goal: BlockPos) -> Option<Vec<BlockPos>> {
        let start = snap_to_ground(world, start)?;
        let goal = snap_to_ground(world, goal)?;
        if start == goal {
            return Some(Vec::new());
        }

        let mut frontier = BinaryHeap::new();
        let mut came_from: HashMap<BlockPos, BlockPos> = HashMap::new();
        let mut cost_so_far: HashMap<BlockPos, u32> = HashMap::new();

        frontier.push(Reverse((heuristic(start, goal), 0, start)));
        cost_so_far.insert(start, 0);
        let mut expanded = 0;

        while let Some(Reverse((_, cost, current))) = frontier.pop() {
            if current == goal {
                let mut path = vec![current];
                let mut node = current;
                while let Some(&prev) = came_from.get(&node) {
                    if prev == start {
                        break;
                    }
                    path.push(prev);
                    node = prev;
                }
                path.reverse();
                return Some(path);
            }

            // Stale entry for a node already reached more cheaply
            if cost_so_far.get(&current).is_some_and(|&c| c < cost) {
                continue;
            }

            expanded += 1;
            if expanded > self.max_nodes {
                return None;
            }

            for (next, step_cost) in self.neighbors(world, current) {
                let new_cost = cost + step_cost;
                if cost_so_far.get(&next).map_or(true, |&c| new_cost < c) {
                    cost_so_far.insert(next, new_cost);
                    came_from.insert(next, current);
                    frontier.push(Reverse((new_cost + heuristic(next, goal), new_cost, next)));
                }
            }
        }

        None
    }

    fn neighbors(&self, world: &impl VoxelQuery, from: BlockPos) -> Vec<(BlockPos, u32)> {
        let mut out = Vec::with_capacity(8);

        for (dx, dz) in DIRECTIONS {
            let side = from.offset(dx, 0, dz);

            if dx != 0 && dz != 0 {
                // Diagonals stay level and need both orthogonal cells open
                let corners_open = is_clear(world, from.offset(dx, 0, 0)) && is_clear(world, from.offset(0, 0, dz));
                if corners_open && is_standable(world, side) {
                    out.push((side, DIAGONAL));
                }
                continue;
            }

            if is_standable(world, side) {
                out.push((side, STRAIGHT));
                continue;
            }

            // Step up: headroom above us and a clear cell on top of the ledge
            let up = side.offset(0, 1, 0);
            if world.is_solid(side.x, side.y, side.z)
                && !world.is_solid(from.x, from.y + 2, from.z)
                && is_standable(world, up)
            {
                out.push((up, STRAIGHT + STEP_UP));
                continue;
            }

            // Walk off the edge and fall
            if is_clear(world, side) {
                for depth in 1..=self.max_drop {
                    let below = side.offset(0, -depth, 0);
                    if world.is_solid(below.x, below.y, below.z) {
                        break;
                    }
                    if is_standable(world, below) {
                        out.push((below, STRAIGHT + DROP * depth as u32));
                        break;
                    }
                }
            }
        }

        out
    }
}

/// Octile distance in cost units. Height changes only ever add cost.
fn heuristic(a: BlockPos, b: BlockPos) -> u32 {
    let dx = a.x.abs_diff(b.x);
    let dz = a.z.abs_diff(b.z);
    STRAIGHT * dx.max(dz) + (DIAGONAL - STRAIGHT) * dx.min(dz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Ground top at y = 5 with extra solid blocks.
    #[derive(Default)]
    struct Grid {
        extra: HashSet<(i32, i32, i32)>,
        holes: HashSet<(i32, i32)>,
    }

    impl Grid {
        fn wall(mut self, x: i32, z_range: std::ops::RangeInclusive<i32>, height: i32) -> Self {
            for z in z_range {
                for y in 5..5 + height {
                    self.extra.insert((x, y, z));
                }
            }
            self
        }
    }

    impl VoxelQuery for Grid {
        fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
            if (0..5).contains(&y) {
                return !(y == 4 && self.holes.contains(&(x, z)));
            }
            self.extra.contains(&(x, y, z))
        }
    }

    #[test]
    fn test_straight_line() {
        let grid = Grid::default();
        let path = Pathfinder::default()
            .find_path(&grid, BlockPos::new(0, 5, 0), BlockPos::new(5, 5, 0))
            .unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path.last(), Some(&BlockPos::new(5, 5, 0)));
        assert!(!path.contains(&BlockPos::new(0, 5, 0)));
    }

    #[test]
    fn test_already_there() {
        let grid = Grid::default();
        let pos = BlockPos::new(2, 5, 2);
        assert_eq!(Pathfinder::default().find_path(&grid, pos, pos), Some(Vec::new()));
    }

    #[test]
    fn test_goes_around_a_wall() {
        let grid = Grid::default().wall(3, -3..=3, 2);
        let path = Pathfinder::default()
            .find_path(&grid, BlockPos::new(0, 5, 0), BlockPos::new(6, 5, 0))
            .unwrap();
        assert_eq!(path.last(), Some(&BlockPos::new(6, 5, 0)));
        assert!(path.iter().all(|p| p.y == 5));
        assert!(path.iter().any(|p| p.z.abs() > 3));
    }

    #[test]
    fn test_steps_up_and_drops_down() {
        // One-high step onto a platform, then off the far side
        let grid = Grid::default().wall(3, -20..=20, 1).wall(4, -20..=20, 1);
        let path = Pathfinder::default()
            .find_path(&grid, BlockPos::new(0, 5, 0), BlockPos::new(7, 5, 0))
            .unwrap();
        assert!(path.contains(&BlockPos::new(3, 6, 0)) || path.iter().any(|p| p.y == 6));
        assert_eq!(path.last(), Some(&BlockPos::new(7, 5, 0)));
    }

    #[test]
    fn test_no_corner_cutting() {
        // Blocks at (1, z=0) and (0, z=1) close the diagonal to (1, 1)
        let grid = Grid::default().wall(1, 0..=0, 2);
        let mut grid = grid;
        for y in 5..7 {
            grid.extra.insert((0, y, 1));
        }
        let path = Pathfinder::default()
            .find_path(&grid, BlockPos::new(0, 5, 0), BlockPos::new(1, 5, 1))
            .unwrap();
        assert!(path.len() > 1, "took the diagonal: {path:?}");
    }

    #[test]
    fn test_unreachable_and_budget() {
        // Boxed in by a tall ring
        let mut grid = Grid::default();
        for d in -2..=2 {
            for y in 5..9 {
                grid.extra.insert((d, y, -2));
                grid.extra.insert((d, y, 2));
                grid.extra.insert((-2, y, d));
                grid.extra.insert((2, y, d));
            }
        }
        assert!(Pathfinder::default()
            .find_path(&grid, BlockPos::new(0, 5, 0), BlockPos::new(10, 5, 0))
            .is_none());

        let open = Grid::default();
        assert!(Pathfinder::new(10)
            .find_path(&open, BlockPos::new(0, 5, 0), BlockPos::new(40, 5, 0))
            .is_none());
    }

    #[test]
    fn test_drops_into_a_pit() {
        let mut grid = Grid::default();
        grid.holes.insert((2, 0));
        // One block deep
        let path = Pathfinder::default()
            .find_path(&grid, BlockPos::new(0, 5, 0), BlockPos::new(2, 4, 0))
            .unwrap();
        assert_eq!(path.last(), Some(&BlockPos::new(2, 4, 0)));
    }
}
