//! # Cars
//!
//! Parked cars sit on the roads waiting to be borrowed. A car is a box that
//! slides along the road at a fixed height: no gravity, no climbing. Walking
//! pace steering, a top speed and a nasty habit of stopping dead on walls.
//!
//! ```text
//!            throttle               brake / friction
//! speed ──────────────> max_speed ─────────────────> 0
//!   └── reverse down to -max_reverse_speed
//! heading += steer × turn_rate × (speed / max_speed)
//! ```
//!
//! Heading follows the look convention: 0 faces -Z, 90 faces +X.

use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use ragamuffin_world::{ground_at, Aabb, ChunkCoord, Ground, World, CHUNK_SIZE, SURFACE_Y};
use tracing::{debug, info};

use crate::config::VehicleSection;
use crate::gameplay::npc::NpcId;
use crate::physics::{horizontal_distance, VoxelQuery};

/// Unique car identifier.
pub type CarId = u32;

/// Side to side.
pub const CAR_WIDTH: f32 = 1.8;

/// Roof height above the road.
pub const CAR_HEIGHT: f32 = 1.5;

/// Bumper to bumper.
pub const CAR_LENGTH: f32 = 3.6;

/// Bodywork below this height rides over kerbs and loose rubbish.
const CLEARANCE: f32 = 0.3;

/// Seconds before the same pedestrian can be hit again.
const HIT_COOLDOWN: f32 = 1.0;

/// Speed kept after ploughing through someone.
const HIT_SLOWDOWN: f32 = 0.5;

/// Salt for per-chunk parking seeds.
const PARKING_SALT: u64 = 0x4341_5253;

/// Driver controls for one step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CarInput {
    /// Accelerator, `-1.0` (reverse) to `1.0`.
    pub throttle: f32,
    /// Steering, `-1.0` (left) to `1.0` (right).
    pub steer: f32,
    /// Foot on the brake.
    pub brake: bool,
}

/// What happened to a car in one step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CarStep {
    /// Damage taken hitting a wall.
    pub crash_damage: Option<f32>,
    /// Pedestrians hit above the injury speed, with the speed at impact.
    pub pedestrians: Vec<(NpcId, f32)>,
}

/// A car.
#[derive(Clone, Debug, PartialEq)]
pub struct Car {
    /// Unique identifier.
    pub id: CarId,
    /// Centre of the footprint at road level.
    pub position: [f32; 3],
    /// Facing in degrees.
    pub heading: f32,
    /// Signed speed along the heading, blocks per second.
    pub speed: f32,
    /// Remaining health; wrecked at zero.
    pub health: f32,
    /// Someone is behind the wheel.
    pub occupied: bool,
    recent_hits: Vec<(NpcId, f32)>,
}

impl Car {
    /// A parked car.
    #[must_use]
    pub fn new(id: CarId, position: [f32; 3], heading: f32, max_health: f32) -> Self {
        Self {
            id,
            position,
            heading,
            speed: 0.0,
            health: max_health,
            occupied: false,
            recent_hits: Vec::new(),
        }
    }

    /// Unit vector the bonnet points along.
    #[must_use]
    pub fn forward(&self) -> [f32; 3] {
        let rad = self.heading.to_radians();
        [rad.sin(), 0.0, -rad.cos()]
    }

    /// Unit vector out of the driver's right-hand side.
    #[must_use]
    pub fn right(&self) -> [f32; 3] {
        let [fx, _, fz] = self.forward();
        [-fz, 0.0, fx]
    }

    /// Beyond repair.
    #[must_use]
    pub fn is_wrecked(&self) -> bool {
        self.health <= 0.0
    }

    /// Axis-aligned box around the rotated footprint.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        self.aabb_at(self.position, self.heading)
    }

    fn aabb_at(&self, position: [f32; 3], heading: f32) -> Aabb {
        let rad = heading.to_radians();
        let (s, c) = (rad.sin().abs(), rad.cos().abs());
        let hx = c * CAR_WIDTH / 2.0 + s * CAR_LENGTH / 2.0;
        let hz = s * CAR_WIDTH / 2.0 + c * CAR_LENGTH / 2.0;
        let [x, y, z] = position;
        Aabb::new([x - hx, y, z - hz], [x + hx, y + CAR_HEIGHT, z + hz])
    }

    fn hits_wall(&self, world: &impl VoxelQuery, position: [f32; 3], heading: f32) -> bool {
        let aabb = self.aabb_at(position, heading);
        let (x0, x1) = (aabb.min[0].floor() as i32, aabb.max[0].ceil() as i32);
        let (z0, z1) = (aabb.min[2].floor() as i32, aabb.max[2].ceil() as i32);
        let (y0, y1) = ((aabb.min[1] + CLEARANCE).floor() as i32, aabb.max[1].ceil() as i32);
        (y0..y1).any(|y| (z0..z1).any(|z| (x0..x1).any(|x| world.is_solid(x, y, z))))
    }

    /// Applies driver input and moves. A wall stops the car dead and costs
    /// health in proportion to the impact speed.
    pub fn update(
        &mut self,
        dt: f32,
        input: CarInput,
        world: &impl VoxelQuery,
        pedestrians: &[(NpcId, Aabb)],
        config: &VehicleSection,
    ) -> CarStep {
        let mut step = CarStep::default();
        self.recent_hits.retain_mut(|(_, t)| {
            *t -= dt;
            *t > 0.0
        });
        if !world.is_loaded_at(self.position[0], self.position[2]) {
            return step;
        }

        let input = if self.is_wrecked() { CarInput::default() } else { input };
        let throttle = input.throttle.clamp(-1.0, 1.0);
        if input.brake {
            self.speed = approach_zero(self.speed, config.braking * dt);
        } else if throttle.abs() > 1e-3 {
            // Throttle against the direction of travel brakes first
            let rate = if throttle * self.speed < 0.0 {
                config.braking
            } else {
                config.acceleration
            };
            self.speed += throttle * rate * dt;
        } else {
            self.speed = approach_zero(self.speed, config.friction * dt);
        }
        self.speed = self.speed.clamp(-config.max_reverse_speed, config.max_speed);

        let steer = input.steer.clamp(-1.0, 1.0);
        let heading = (self.heading + steer * config.turn_rate * (self.speed / config.max_speed) * dt).rem_euclid(360.0);

        let [fx, _, fz] = {
            let rad = heading.to_radians();
            [rad.sin(), 0.0, -rad.cos()]
        };
        let target = [
            self.position[0] + fx * self.speed * dt,
            self.position[1],
            self.position[2] + fz * self.speed * dt,
        ];

        if self.hits_wall(world, target, heading) {
            if self.speed.abs() > 1e-3 {
                let damage = config.collision_damage * (self.speed.abs() / config.max_speed).min(1.0);
                self.health = (self.health - damage).max(0.0);
                debug!(car = self.id, damage, health = self.health, "car crashed");
                step.crash_damage = Some(damage);
            }
            self.speed = 0.0;
            return step;
        }
        self.position = target;
        self.heading = heading;

        let impact = self.speed.abs();
        if impact > config.injury_speed {
            let body = self.aabb();
            for &(npc, aabb) in pedestrians {
                if !aabb.intersects(&body) || self.recent_hits.iter().any(|&(id, _)| id == npc) {
                    continue;
                }
                self.recent_hits.push((npc, HIT_COOLDOWN));
                step.pedestrians.push((npc, impact));
            }
            if !step.pedestrians.is_empty() {
                self.speed *= HIT_SLOWDOWN;
            }
        }
        step
    }
}

fn approach_zero(value: f32, amount: f32) -> f32 {
    if value > 0.0 {
        (value - amount).max(0.0)
    } else {
        (value + amount).min(0.0)
    }
}

/// Every car in the loaded town, and which one the player is driving.
#[derive(Clone, Debug)]
pub struct VehicleManager {
    cars: Vec<Car>,
    next_id: CarId,
    spawned_chunks: HashSet<ChunkCoord>,
    driving: Option<CarId>,
}

impl Default for VehicleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl VehicleManager {
    /// No cars.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cars: Vec::new(),
            next_id: 1,
            spawned_chunks: HashSet::new(),
            driving: None,
        }
    }

    /// Parks a car.
    pub fn spawn(&mut self, position: [f32; 3], heading: f32, config: &VehicleSection) -> CarId {
        let id = self.next_id;
        self.next_id += 1;
        self.cars.push(Car::new(id, position, heading, config.max_health));
        debug!(car = id, x = position[0], z = position[2], "car parked");
        id
    }

    /// Maybe parks a car on a road in a freshly loaded chunk. The same seed
    /// always parks the same cars.
    pub fn spawn_for_chunk(&mut self, world: &World, coord: ChunkCoord, config: &VehicleSection) -> Option<CarId> {
        const ATTEMPTS: usize = 8;
        if !world.is_loaded(coord) || !self.spawned_chunks.insert(coord) {
            return None;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(world.seed().derive(PARKING_SALT).hash2(coord.x, coord.z));
        if rng.gen::<f32>() >= config.spawn_chance {
            return None;
        }

        for _ in 0..ATTEMPTS {
            let x = coord.world_x() + rng.gen_range(0..CHUNK_SIZE as i32);
            let z = coord.world_z() + rng.gen_range(0..CHUNK_SIZE as i32);
            let along_z = ground_at(x, z - 2) == Ground::Road && ground_at(x, z + 2) == Ground::Road;
            let along_x = ground_at(x - 2, z) == Ground::Road && ground_at(x + 2, z) == Ground::Road;
            let heading = match (along_z, along_x) {
                (true, false) => 0.0,
                (false, true) => 90.0,
                _ => continue,
            };
            if ground_at(x, z) != Ground::Road {
                continue;
            }
            let position = [x as f32 + 0.5, (SURFACE_Y + 1) as f32, z as f32 + 0.5];
            let probe = Car::new(0, position, heading, config.max_health);
            let overlaps = self.cars.iter().any(|c| c.aabb().intersects(&probe.aabb()));
            if overlaps || probe.hits_wall(world, position, heading) {
                continue;
            }
            return Some(self.spawn(position, heading, config));
        }
        None
    }

    /// Tows away the parked cars standing in an unloaded chunk. The car being
    /// driven stays.
    pub fn despawn_chunk(&mut self, coord: ChunkCoord) -> usize {
        self.spawned_chunks.remove(&coord);
        let before = self.cars.len();
        self.cars
            .retain(|c| c.occupied || ChunkCoord::from_world_pos(c.position[0], c.position[2]) != coord);
        before - self.cars.len()
    }

    /// All cars.
    #[must_use]
    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    /// Number of cars.
    #[must_use]
    pub fn count(&self) -> usize {
        self.cars.len()
    }

    /// Finds a car.
    #[must_use]
    pub fn get(&self, id: CarId) -> Option<&Car> {
        self.cars.iter().find(|c| c.id == id)
    }

    /// Finds a mutable car.
    pub fn get_mut(&mut self, id: CarId) -> Option<&mut Car> {
        self.cars.iter_mut().find(|c| c.id == id)
    }

    /// The car the player is in.
    #[must_use]
    pub const fn driving(&self) -> Option<CarId> {
        self.driving
    }

    /// Nearest drivable car whose body is within `reach` of `position`.
    #[must_use]
    pub fn nearest_in_reach(&self, position: [f32; 3], reach: f32) -> Option<CarId> {
        self.cars
            .iter()
            .filter(|c| !c.occupied && !c.is_wrecked())
            .map(|c| (c.id, distance_to_box(position, &c.aabb())))
            .filter(|&(_, d)| d <= reach)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Gets into the nearest car in reach.
    pub fn enter(&mut self, position: [f32; 3], reach: f32) -> Option<CarId> {
        if self.driving.is_some() {
            return None;
        }
        let id = self.nearest_in_reach(position, reach)?;
        let car = self.get_mut(id)?;
        car.occupied = true;
        self.driving = Some(id);
        info!(car = id, "player got into a car");
        Some(id)
    }

    /// Gets out on the driver's side (right-hand drive) if there is room,
    /// otherwise the passenger side or the roof. Returns the car and where the player
    /// stands.
    pub fn exit(&mut self, world: &World) -> Option<(CarId, [f32; 3])> {
        let id = self.driving.take()?;
        let car = self.get_mut(id)?;
        car.occupied = false;
        car.speed = 0.0;

        let offset = CAR_WIDTH / 2.0 + 0.8;
        let [rx, _, rz] = car.right();
        let [x, y, z] = car.position;
        let beside = [offset, -offset].into_iter().find_map(|side| {
            let (px, pz) = (x + rx * side, z + rz * side);
            let feet = world.standing_height(px.floor() as i32, pz.floor() as i32, y as i32 - 1)?;
            let clear = feet - (y as i32) <= 1;
            clear.then_some([px, feet as f32, pz])
        });
        let spot = beside.unwrap_or([x, y + CAR_HEIGHT, z]);
        info!(car = id, "player got out of a car");
        Some((id, spot))
    }

    /// Drives the player's car for one step.
    pub fn drive(
        &mut self,
        dt: f32,
        input: CarInput,
        world: &World,
        pedestrians: &[(NpcId, Aabb)],
        config: &VehicleSection,
    ) -> Option<(CarId, CarStep)> {
        let id = self.driving?;
        let car = self.get_mut(id)?;
        Some((id, car.update(dt, input, world, pedestrians, config)))
    }

    /// Lets the empty cars roll to a stop.
    pub fn update_parked(&mut self, dt: f32, world: &World, config: &VehicleSection) {
        for car in self.cars.iter_mut().filter(|c| !c.occupied && c.speed != 0.0) {
            car.update(dt, CarInput::default(), world, &[], config);
        }
    }
}

fn distance_to_box(point: [f32; 3], aabb: &Aabb) -> f32 {
    let clamped = [
        point[0].clamp(aabb.min[0], aabb.max[0]),
        point[1],
        point[2].clamp(aabb.min[2], aabb.max[2]),
    ];
    horizontal_distance(point, clamped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragamuffin_world::{Block, BlockPos, BlockType, WorldSeed};

    /// Flat ground, top at y = 4, plus extra blocks.
    #[derive(Default)]
    struct Flat {
        walls: HashSet<(i32, i32, i32)>,
    }

    impl VoxelQuery for Flat {
        fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
            y <= SURFACE_Y || self.walls.contains(&(x, y, z))
        }
    }

    fn parked() -> Car {
        Car::new(1, [0.5, 5.0, 0.5], 0.0, VehicleSection::default().max_health)
    }

    fn run(car: &mut Car, world: &Flat, input: CarInput, seconds: f32) -> CarStep {
        let config = VehicleSection::default();
        let mut total = CarStep::default();
        for _ in 0..(seconds * 30.0) as u32 {
            let step = car.update(1.0 / 30.0, input, world, &[], &config);
            total.crash_damage = total.crash_damage.or(step.crash_damage);
        }
        total
    }

    #[test]
    fn test_accelerates_to_top_speed_and_coasts_to_a_stop() {
        let config = VehicleSection::default();
        let world = Flat::default();
        let mut car = parked();

        let full = CarInput {
            throttle: 1.0,
            ..CarInput::default()
        };
        run(&mut car, &world, full, 5.0);
        assert!((car.speed - config.max_speed).abs() < 1e-3);
        // Heading 0 drives towards -Z
        assert!(car.position[2] < -10.0);
        assert!((car.position[0] - 0.5).abs() < 1e-3);

        run(&mut car, &world, CarInput::default(), 10.0);
        assert_eq!(car.speed, 0.0);
    }

    #[test]
    fn test_brakes_and_reverses() {
        let config = VehicleSection::default();
        let world = Flat::default();
        let mut car = parked();
        car.speed = 10.0;

        let brake = CarInput {
            brake: true,
            ..CarInput::default()
        };
        run(&mut car, &world, brake, 1.0);
        assert_eq!(car.speed, 0.0);

        let back = CarInput {
            throttle: -1.0,
            ..CarInput::default()
        };
        run(&mut car, &world, back, 3.0);
        assert!((car.speed + config.max_reverse_speed).abs() < 1e-3);
    }

    #[test]
    fn test_steering_needs_speed() {
        let world = Flat::default();
        let mut car = parked();
        let steer = CarInput {
            steer: 1.0,
            ..CarInput::default()
        };
        run(&mut car, &world, steer, 1.0);
        assert_eq!(car.heading, 0.0);

        let turn = CarInput {
            throttle: 1.0,
            steer: 1.0,
            brake: false,
        };
        run(&mut car, &world, turn, 1.0);
        assert!(car.heading > 0.0 && car.heading < 180.0, "{}", car.heading);
    }

    #[test]
    fn test_wall_stops_and_damages() {
        let config = VehicleSection::default();
        let mut world = Flat::default();
        for x in -3..=3 {
            world.walls.insert((x, 5, -12));
        }
        let mut car = parked();
        let full = CarInput {
            throttle: 1.0,
            ..CarInput::default()
        };

        let step = run(&mut car, &world, full, 3.0);
        let damage = step.crash_damage.unwrap();
        assert!(damage > 0.0 && damage <= config.collision_damage);
        assert!(car.health < config.max_health);
        assert!(car.aabb().min[2] >= -11.0);
    }

    #[test]
    fn test_pedestrian_hit_only_above_injury_speed() {
        let config = VehicleSection::default();
        let world = Flat::default();
        let npc = Aabb::from_feet([0.5, 5.0, -1.2], 0.6, 1.8);

        let mut slow = parked();
        slow.speed = config.injury_speed * 0.5;
        let step = slow.update(1.0 / 30.0, CarInput::default(), &world, &[(7, npc)], &config);
        assert!(step.pedestrians.is_empty());

        let mut fast = parked();
        fast.speed = config.injury_speed + 4.0;
        let cruise = CarInput {
            throttle: 1.0,
            ..CarInput::default()
        };
        let step = fast.update(1.0 / 30.0, cruise, &world, &[(7, npc)], &config);
        assert_eq!(step.pedestrians.len(), 1);
        assert_eq!(step.pedestrians[0].0, 7);

        // Not hit twice in the same pass
        fast.speed = config.injury_speed + 4.0;
        let again = fast.update(1.0 / 30.0, cruise, &world, &[(7, npc)], &config);
        assert!(again.pedestrians.is_empty());
    }

    #[test]
    fn test_rotated_box_swaps_extent() {
        let mut car = parked();
        let along_z = car.aabb();
        car.heading = 90.0;
        let along_x = car.aabb();
        assert!(along_z.max[2] - along_z.min[2] > along_z.max[0] - along_z.min[0]);
        assert!(along_x.max[0] - along_x.min[0] > along_x.max[2] - along_x.min[2]);
    }

    #[test]
    fn test_enter_and_exit() {
        let config = VehicleSection::default();
        let mut world = World::with_seed(WorldSeed::new(5));
        world.ensure_loaded_around(2.0, 12.0, 1);
        let mut cars = VehicleManager::new();
        let id = cars.spawn([2.0, 5.0, 12.0], 0.0, &config);

        assert_eq!(cars.enter([20.0, 5.0, 12.0], config.enter_reach), None);
        assert_eq!(cars.enter([4.5, 5.0, 12.0], config.enter_reach), Some(id));
        assert!(cars.get(id).unwrap().occupied);
        assert_eq!(cars.nearest_in_reach([4.5, 5.0, 12.0], config.enter_reach), None);

        let (out, spot) = cars.exit(&world).unwrap();
        assert_eq!(out, id);
        assert!(!cars.get(id).unwrap().occupied);
        assert!(horizontal_distance(spot, [2.0, 5.0, 12.0]) > CAR_WIDTH / 2.0);
        assert!(cars.exit(&world).is_none());
    }

    #[test]
    fn test_drive_into_placed_wall_on_a_real_road() {
        let config = VehicleSection::default();
        let mut world = World::with_seed(WorldSeed::new(5));
        world.ensure_loaded_around(2.0, 12.0, 1);
        for x in 0..4 {
            world.set_block(BlockPos::new(x, 5, 4), Block::placed(BlockType::Brick)).unwrap();
        }
        let mut cars = VehicleManager::new();
        let id = cars.spawn([2.0, 5.0, 12.0], 0.0, &config);
        cars.enter([2.0, 5.0, 14.5], config.enter_reach).unwrap();

        let full = CarInput {
            throttle: 1.0,
            ..CarInput::default()
        };
        let mut crashed = false;
        for _ in 0..90 {
            let (_, step) = cars.drive(1.0 / 30.0, full, &world, &[], &config).unwrap();
            crashed |= step.crash_damage.is_some();
        }
        assert!(crashed);
        assert!(cars.get(id).unwrap().position[2] > 5.0);
    }

    #[test]
    fn test_parking_is_deterministic_and_on_roads() {
        let config = VehicleSection {
            spawn_chance: 1.0,
            ..VehicleSection::default()
        };
        let park = || {
            let mut world = World::with_seed(WorldSeed::new(9));
            world.ensure_loaded_around(0.0, 0.0, 2);
            let mut cars = VehicleManager::new();
            for cz in -2..=2 {
                for cx in -2..=2 {
                    cars.spawn_for_chunk(&world, ChunkCoord::new(cx, cz), &config);
                }
            }
            assert_eq!(cars.spawn_for_chunk(&world, ChunkCoord::new(0, 0), &config), None);
            cars.cars().iter().map(|c| (c.position, c.heading)).collect::<Vec<_>>()
        };
        let a = park();
        assert!(!a.is_empty());
        assert_eq!(a, park());
        for (pos, _) in &a {
            assert_eq!(ground_at(pos[0].floor() as i32, pos[2].floor() as i32), Ground::Road);
        }
    }

    #[test]
    fn test_despawn_keeps_the_driven_car() {
        let config = VehicleSection::default();
        let mut cars = VehicleManager::new();
        let parked = cars.spawn([2.0, 5.0, 2.0], 0.0, &config);
        let driven = cars.spawn([6.0, 5.0, 2.0], 0.0, &config);
        cars.get_mut(driven).unwrap().occupied = true;

        assert_eq!(cars.despawn_chunk(ChunkCoord::new(0, 0)), 1);
        assert!(cars.get(parked).is_none());
        assert!(cars.get(driven).is_some());
    }
}
