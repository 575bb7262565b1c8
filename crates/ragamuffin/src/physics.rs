//! # Physics
//!
//! Kinematic bodies against the voxel grid, plus the DDA raycast used to
//! pick blocks.
//!
//! Features:
//! - Gravity simulation with terminal velocity
//! - Per-axis collision against voxels and extra boxes (props, cars)
//! - One-block step-up when walking into a ledge
//! - Ground detection and jumping
//!
//! Bodies standing in a chunk that is not loaded are frozen until it is.

use ragamuffin_world::{Aabb, BlockPos, ChunkCoord, World};

/// Gravity acceleration (blocks per second squared).
pub const GRAVITY: f32 = 32.0;

/// Terminal velocity (blocks per second).
pub const TERMINAL_VELOCITY: f32 = 50.0;

/// Tallest ledge a walking body climbs without jumping.
pub const STEP_HEIGHT: f32 = 1.0;

/// Player hitbox width (blocks).
pub const PLAYER_WIDTH: f32 = 0.6;
/// Player hitbox height (blocks).
pub const PLAYER_HEIGHT: f32 = 1.8;
/// Player eye height offset from feet (blocks).
pub const PLAYER_EYE_HEIGHT: f32 = 1.6;

/// Longest distance moved in one collision sub-step.
const MAX_SUBSTEP: f32 = 0.45;

/// Gap left between a body and a wall it was pushed out of.
const SKIN: f32 = 1e-3;

// ============================================================================
// VOXEL QUERY
// ============================================================================

/// Solidity lookup for collision and raycasts.
pub trait VoxelQuery {
    /// Returns `true` if the voxel blocks movement.
    fn is_solid(&self, x: i32, y: i32, z: i32) -> bool;

    /// Whether the ground under a world position exists yet.
    fn is_loaded_at(&self, _x: f32, _z: f32) -> bool {
        true
    }
}

impl VoxelQuery for World {
    fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        World::is_solid(self, x, y, z)
    }

    fn is_loaded_at(&self, x: f32, z: f32) -> bool {
        self.is_loaded(ChunkCoord::from_world_pos(x, z))
    }
}

/// Solid voxel boxes touching an AABB.
fn voxel_boxes<'a, W: VoxelQuery>(world: &'a W, aabb: Aabb) -> impl Iterator<Item = Aabb> + 'a {
    let min_x = aabb.min[0].floor() as i32;
    let max_x = aabb.max[0].ceil() as i32;
    let min_y = aabb.min[1].floor() as i32;
    let max_y = aabb.max[1].ceil() as i32;
    let min_z = aabb.min[2].floor() as i32;
    let max_z = aabb.max[2].ceil() as i32;

    (min_y..max_y)
        .flat_map(move |y| (min_z..max_z).flat_map(move |z| (min_x..max_x).map(move |x| (x, y, z))))
        .filter(move |&(x, y, z)| world.is_solid(x, y, z))
        .map(|(x, y, z)| Aabb::from_voxel(x, y, z))
        .filter(move |v| v.intersects(&aabb))
}

// ============================================================================
// BODY
// ============================================================================

/// What happened during one [`Body::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveResult {
    /// Horizontal movement was stopped by a wall.
    pub blocked: bool,
    /// The body climbed a ledge.
    pub stepped: bool,
    /// The body touched down this update.
    pub landed: bool,
}

/// Kinematic body shared by the player and NPCs.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    /// Feet position (centre of the footprint).
    pub position: [f32; 3],
    /// Velocity (blocks per second).
    pub velocity: [f32; 3],
    /// Is the body standing on something?
    pub on_ground: bool,
    /// Footprint width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Body {
    /// Creates a body standing at `position`.
    #[must_use]
    pub const fn new(position: [f32; 3], width: f32, height: f32) -> Self {
        Self {
            position,
            velocity: [0.0; 3],
            on_ground: false,
            width,
            height,
        }
    }

    /// Current collision box.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb::from_feet(self.position, self.width, self.height)
    }

    /// Sets the horizontal velocity, keeping vertical velocity.
    pub fn set_walk(&mut self, vx: f32, vz: f32) {
        self.velocity[0] = vx;
        self.velocity[2] = vz;
    }

    /// Zeroes horizontal velocity.
    pub fn stop(&mut self) {
        self.set_walk(0.0, 0.0);
    }

    /// Jumps if standing on something. Returns whether the jump happened.
    pub fn jump(&mut self, speed: f32) -> bool {
        if !self.on_ground {
            return false;
        }
        self.velocity[1] = speed;
        self.on_ground = false;
        true
    }

    /// Moves the body without collision and clears its velocity.
    pub fn teleport(&mut self, position: [f32; 3]) {
        self.position = position;
        self.velocity = [0.0; 3];
        self.on_ground = false;
    }

    /// Integrates gravity and moves with collision.
    pub fn update(&mut self, dt: f32, world: &impl VoxelQuery, obstacles: &[Aabb]) -> MoveResult {
        let mut result = MoveResult::default();
        if !world.is_loaded_at(self.position[0], self.position[2]) {
            return result;
        }

        // Re-check support every frame so walking off an edge starts a fall
        self.on_ground = self.velocity[1] <= 0.0 && self.touching_ground(world, obstacles);
        let was_airborne = !self.on_ground;
        if self.on_ground {
            self.velocity[1] = 0.0;
        } else {
            self.velocity[1] = (self.velocity[1] - GRAVITY * dt).max(-TERMINAL_VELOCITY);
        }

        let longest = self.velocity.iter().fold(0.0_f32, |m, v| m.max((v * dt).abs()));
        let steps = ((longest / MAX_SUBSTEP).ceil() as u32).max(1);
        let sub_dt = dt / steps as f32;

        for _ in 0..steps {
            for axis in [0, 2] {
                let delta = self.velocity[axis] * sub_dt;
                if delta.abs() > 1e-5 {
                    match self.move_horizontal(axis, delta, world, obstacles) {
                        Horizontal::Moved => {}
                        Horizontal::Stepped => result.stepped = true,
                        Horizontal::Blocked => result.blocked = true,
                    }
                }
            }

            let delta = self.velocity[1] * sub_dt;
            if delta.abs() > 1e-5 {
                self.move_vertical(delta, world, obstacles);
            }
        }

        if self.velocity[1] <= 0.0 && self.touching_ground(world, obstacles) {
            self.on_ground = true;
        }
        result.landed = was_airborne && self.on_ground;
        result
    }

    fn colliders_at(&self, feet: [f32; 3], world: &impl VoxelQuery, obstacles: &[Aabb]) -> Vec<Aabb> {
        let aabb = Aabb::from_feet(feet, self.width, self.height);
        voxel_boxes(world, aabb)
            .chain(obstacles.iter().copied().filter(|o| o.intersects(&aabb)))
            .collect()
    }

    fn blocked_at(&self, feet: [f32; 3], world: &impl VoxelQuery, obstacles: &[Aabb]) -> bool {
        let aabb = Aabb::from_feet(feet, self.width, self.height);
        voxel_boxes(world, aabb).next().is_some() || obstacles.iter().any(|o| o.intersects(&aabb))
    }

    fn move_horizontal(
        &mut self,
        axis: usize,
        delta: f32,
        world: &impl VoxelQuery,
        obstacles: &[Aabb],
    ) -> Horizontal {
        let mut target = self.position;
        target[axis] += delta;

        let hits = self.colliders_at(target, world, obstacles);
        if hits.is_empty() {
            self.position = target;
            return Horizontal::Moved;
        }

        if self.on_ground {
            let mut lifted = self.position;
            lifted[1] += STEP_HEIGHT;
            let mut raised = target;
            raised[1] += STEP_HEIGHT;
            if !self.blocked_at(lifted, world, obstacles) && !self.blocked_at(raised, world, obstacles) {
                self.position = raised;
                return Horizontal::Stepped;
            }
        }

        // Slide up flush against the nearest face
        let half = self.width / 2.0;
        let from = self.position[axis];
        let flush = if delta > 0.0 {
            hits.iter()
                .map(|b| b.min[axis] - half - SKIN)
                .fold(target[axis], f32::min)
                .max(from)
        } else {
            hits.iter()
                .map(|b| b.max[axis] + half + SKIN)
                .fold(target[axis], f32::max)
                .min(from)
        };
        self.position[axis] = flush;
        self.velocity[axis] = 0.0;
        Horizontal::Blocked
    }

    fn move_vertical(&mut self, delta: f32, world: &impl VoxelQuery, obstacles: &[Aabb]) {
        let mut target = self.position;
        target[1] += delta;

        let hits = self.colliders_at(target, world, obstacles);
        if hits.is_empty() {
            self.position = target;
            return;
        }

        let from = self.position[1];
        self.position[1] = if delta < 0.0 {
            self.on_ground = true;
            hits.iter().map(|b| b.max[1]).fold(target[1], f32::max).min(from)
        } else {
            hits.iter()
                .map(|b| b.min[1] - self.height - SKIN)
                .fold(target[1], f32::min)
                .max(from)
        };
        self.velocity[1] = 0.0;
    }

    fn touching_ground(&self, world: &impl VoxelQuery, obstacles: &[Aabb]) -> bool {
        let half = self.width / 2.0;
        let [x, y, z] = self.position;
        let feet = Aabb::new([x - half, y - 0.05, z - half], [x + half, y, z + half]);
        voxel_boxes(world, feet).next().is_some() || obstacles.iter().any(|o| o.intersects(&feet))
    }
}

enum Horizontal {
    Moved,
    Stepped,
    Blocked,
}

// ============================================================================
// RAYCAST SYSTEM
// ============================================================================

/// Result of a raycast against the voxel world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaycastHit {
    /// The voxel that was hit.
    pub voxel: BlockPos,
    /// The face normal of the hit (-1, 0, or 1 for each axis). All zero when
    /// the ray started inside the voxel.
    pub normal: [i32; 3],
    /// Distance from ray origin to hit point.
    pub distance: f32,
    /// Exact hit position in world space.
    pub hit_point: [f32; 3],
}

impl RaycastHit {
    /// The empty voxel in front of the hit face.
    #[must_use]
    pub const fn adjacent(&self) -> BlockPos {
        self.voxel.offset(self.normal[0], self.normal[1], self.normal[2])
    }
}

/// Performs a raycast against the voxel world.
/// Uses DDA (Digital Differential Analyzer) algorithm for efficiency.
pub fn raycast(
    origin: [f32; 3],
    direction: [f32; 3],
    max_distance: f32,
    world: &impl VoxelQuery,
) -> Option<RaycastHit> {
    let len = length(direction);
    if len < 0.0001 {
        return None;
    }
    let dir = [direction[0] / len, direction[1] / len, direction[2] / len];

    let mut voxel = [
        origin[0].floor() as i32,
        origin[1].floor() as i32,
        origin[2].floor() as i32,
    ];

    let step = dir.map(|d| if d >= 0.0 { 1 } else { -1 });

    // Distance between voxel boundaries along each axis
    let t_delta = dir.map(|d| if d.abs() < 0.0001 { f32::MAX } else { (1.0 / d).abs() });

    // Distance to the first boundary
    let mut t_max = [0.0_f32; 3];
    for axis in 0..3 {
        t_max[axis] = if dir[axis].abs() < 0.0001 {
            f32::MAX
        } else if dir[axis] > 0.0 {
            ((voxel[axis] + 1) as f32 - origin[axis]) / dir[axis]
        } else {
            (voxel[axis] as f32 - origin[axis]) / dir[axis]
        };
    }

    let mut distance = 0.0;
    let mut last_normal = [0, 0, 0];

    while distance <= max_distance {
        if world.is_solid(voxel[0], voxel[1], voxel[2]) {
            return Some(RaycastHit {
                voxel: BlockPos::new(voxel[0], voxel[1], voxel[2]),
                normal: last_normal,
                distance,
                hit_point: [
                    origin[0] + dir[0] * distance,
                    origin[1] + dir[1] * distance,
                    origin[2] + dir[2] * distance,
                ],
            });
        }

        let axis = if t_max[0] < t_max[1] && t_max[0] < t_max[2] {
            0
        } else if t_max[1] < t_max[2] {
            1
        } else {
            2
        };
        distance = t_max[axis];
        t_max[axis] += t_delta[axis];
        voxel[axis] += step[axis];
        last_normal = [0, 0, 0];
        last_normal[axis] = -step[axis];
    }

    None
}

/// Whether the straight line between two points is free of solid voxels.
pub fn line_of_sight(from: [f32; 3], to: [f32; 3], world: &impl VoxelQuery) -> bool {
    let delta = sub(to, from);
    let dist = length(delta);
    raycast(from, delta, dist, world).map_or(true, |hit| hit.distance >= dist - 0.05)
}

/// Gets the look direction from camera yaw and pitch in degrees.
///
/// Yaw 0 faces -Z; yaw 90 faces +X.
#[must_use]
pub fn look_direction(yaw: f32, pitch: f32) -> [f32; 3] {
    let yaw_rad = yaw.to_radians();
    let pitch_rad = pitch.to_radians();
    [
        yaw_rad.sin() * pitch_rad.cos(),
        pitch_rad.sin(),
        -yaw_rad.cos() * pitch_rad.cos(),
    ]
}

/// Yaw in degrees that faces along `(dx, dz)`.
#[must_use]
pub fn yaw_towards(dx: f32, dz: f32) -> f32 {
    dx.atan2(-dz).to_degrees()
}

// ============================================================================
// VECTOR HELPERS
// ============================================================================

/// `a - b`.
#[must_use]
pub fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Euclidean length.
#[must_use]
pub fn length(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Distance between two points.
#[must_use]
pub fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    length(sub(a, b))
}

/// Distance ignoring height.
#[must_use]
pub fn horizontal_distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dz = a[2] - b[2];
    (dx * dx + dz * dz).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Flat ground with its top face at y = 5, plus extra blocks.
    #[derive(Default)]
    struct Grid {
        extra: HashSet<(i32, i32, i32)>,
    }

    impl Grid {
        fn with(blocks: &[(i32, i32, i32)]) -> Self {
            Self {
                extra: blocks.iter().copied().collect(),
            }
        }
    }

    impl VoxelQuery for Grid {
        fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
            (0..5).contains(&y) || self.extra.contains(&(x, y, z))
        }
    }

    fn run(body: &mut Body, grid: &Grid, obstacles: &[Aabb], seconds: f32) -> MoveResult {
        let mut any = MoveResult::default();
        for _ in 0..(seconds * 30.0) as u32 {
            let r = body.update(1.0 / 30.0, grid, obstacles);
            any.blocked |= r.blocked;
            any.stepped |= r.stepped;
            any.landed |= r.landed;
        }
        any
    }

    #[test]
    fn test_falls_and_lands_on_ground() {
        let grid = Grid::default();
        let mut body = Body::new([0.5, 12.0, 0.5], PLAYER_WIDTH, PLAYER_HEIGHT);

        let result = run(&mut body, &grid, &[], 2.0);
        assert!(result.landed);
        assert!(body.on_ground);
        assert!((body.position[1] - 5.0).abs() < 1e-4);
        assert!(body.velocity[1].abs() < f32::EPSILON);
    }

    #[test]
    fn test_wall_blocks_and_steps() {
        // Two-high wall at x = 3: blocked
        let wall = Grid::with(&[(3, 5, 0), (3, 6, 0)]);
        let mut body = Body::new([0.5, 5.0, 0.5], PLAYER_WIDTH, PLAYER_HEIGHT);
        body.on_ground = true;
        body.set_walk(4.0, 0.0);
        let result = run(&mut body, &wall, &[], 1.5);
        assert!(result.blocked);
        assert!(body.position[0] < 3.0 - PLAYER_WIDTH / 2.0 + 0.01);
        assert!((body.position[1] - 5.0).abs() < 1e-4);

        // A single block is a step
        let ledge = Grid::with(&[(3, 5, 0)]);
        let mut body = Body::new([0.5, 5.0, 0.5], PLAYER_WIDTH, PLAYER_HEIGHT);
        body.on_ground = true;
        body.set_walk(4.0, 0.0);
        let result = run(&mut body, &ledge, &[], 1.5);
        assert!(result.stepped);
        assert!(body.position[0] > 3.0);
    }

    #[test]
    fn test_obstacle_boxes_block() {
        let grid = Grid::default();
        let bin = Aabb::new([2.0, 5.0, -1.0], [3.0, 7.5, 2.0]);
        let mut body = Body::new([0.5, 5.0, 0.5], PLAYER_WIDTH, PLAYER_HEIGHT);
        body.set_walk(4.0, 0.0);

        run(&mut body, &grid, &[bin], 1.0);
        assert!(body.position[0] <= 2.0 - PLAYER_WIDTH / 2.0);
        assert!(!body.aabb().intersects(&bin));
    }

    #[test]
    fn test_walking_off_an_edge_falls() {
        let grid = Grid::with(&[(0, 5, 0), (1, 5, 0)]);
        let mut body = Body::new([0.5, 6.0, 0.5], 0.6, 1.8);
        run(&mut body, &grid, &[], 0.2);
        assert!(body.on_ground);

        body.set_walk(0.0, 4.0);
        run(&mut body, &grid, &[], 1.0);
        assert!((body.position[1] - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_jump_needs_ground() {
        let grid = Grid::default();
        let mut body = Body::new([0.5, 5.0, 0.5], PLAYER_WIDTH, PLAYER_HEIGHT);
        assert!(!body.jump(9.0));

        body.update(1.0 / 30.0, &grid, &[]);
        assert!(body.jump(9.0));
        body.update(1.0 / 30.0, &grid, &[]);
        assert!(body.position[1] > 5.0);
        assert!(!body.jump(9.0));
    }

    #[test]
    fn test_raycast_hits_face() {
        let grid = Grid::with(&[(0, 6, -4)]);
        let hit = raycast([0.5, 6.5, 0.5], look_direction(0.0, 0.0), 10.0, &grid).unwrap();
        assert_eq!(hit.voxel, BlockPos::new(0, 6, -4));
        assert_eq!(hit.normal, [0, 0, 1]);
        assert_eq!(hit.adjacent(), BlockPos::new(0, 6, -3));
        assert!((hit.distance - 3.5).abs() < 1e-4);

        // Looking straight down hits the ground top face
        let hit = raycast([0.5, 6.5, 0.5], look_direction(0.0, -90.0), 10.0, &grid).unwrap();
        assert_eq!(hit.voxel, BlockPos::new(0, 4, 0));
        assert_eq!(hit.normal, [0, 1, 0]);

        assert!(raycast([0.5, 6.5, 0.5], look_direction(180.0, 0.0), 10.0, &grid).is_none());
    }

    #[test]
    fn test_line_of_sight() {
        let grid = Grid::with(&[(5, 6, 0)]);
        assert!(!line_of_sight([0.5, 6.5, 0.5], [9.5, 6.5, 0.5], &grid));
        assert!(line_of_sight([0.5, 6.5, 0.5], [0.5, 6.5, 9.5], &grid));
    }

    #[test]
    fn test_look_direction_and_yaw_agree() {
        for yaw in [0.0_f32, 45.0, 90.0, 135.0, -90.0] {
            let dir = look_direction(yaw, 0.0);
            let back = yaw_towards(dir[0], dir[2]);
            assert!((back - yaw).abs() < 1e-3, "{yaw} -> {back}");
        }
    }
}
