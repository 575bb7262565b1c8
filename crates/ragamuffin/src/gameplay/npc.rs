//! # NPCs
//!
//! Townsfolk with a body, a brain and a gob. Every NPC runs the same loop
//! each step:
//!
//! 1. Tick timers (speech, knockout, attack cooldown)
//! 2. Run its type's brain, which may change state and picks where to go
//! 3. Follow an A* path there, repathing periodically
//! 4. Move the body with gravity and collision
//!
//! ## Brains
//!
//! ```text
//! Police       Patrolling ─> Warning ─> Aggressive ─> Arresting ─> Patrolling
//!                   └──────────────────────^ (pursuit notoriety / assault)
//! YouthGang    Wandering ─> Warning (Wary) ─> Aggressive (Hostile)
//!                   └─> Fleeing when badly hurt
//! Public etc.  Wandering <─> Idle, Fleeing from trouble
//! Shopkeeper   Idle behind the counter, shouts about crime in the shop
//! Council      Patrolling ─> Demolishing player-built blocks
//! ```
//!
//! NPCs spawn deterministically per chunk and vanish when their home chunk
//! unloads.

use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use ragamuffin_economy::DisguiseKind;
use ragamuffin_world::{ground_at, Aabb, Block, BlockPos, ChunkCoord, Ground, LandmarkType, World, CHUNK_SIZE, SURFACE_Y};
use tracing::{debug, info};

use crate::config::{GameConfig, NpcSection};
use crate::events::{EventSender, GameEvent};
use crate::gameplay::gang::{GangTerritories, Hostility, TerritoryId};
use crate::gameplay::pathfinding::Pathfinder;
use crate::physics::{horizontal_distance, line_of_sight, yaw_towards, Body};

// ============================================================================
// NPC CONSTANTS
// ============================================================================

/// NPC hitbox width (blocks).
pub const NPC_WIDTH: f32 = 0.6;

/// NPC hitbox height (blocks).
pub const NPC_HEIGHT: f32 = 1.8;

/// Eye height above the feet.
pub const NPC_EYE_HEIGHT: f32 = 1.6;

/// Close enough to a waypoint to move on.
const WAYPOINT_REACHED: f32 = 0.35;

/// How far a fleeing NPC tries to run.
const FLEE_DISTANCE: f32 = 10.0;

/// Fleeing lasts at least this long.
const MIN_FLEE_TIME: f32 = 4.0;

/// Below this fraction of health a fighter runs.
const BADLY_HURT: f32 = 0.3;

/// Health fraction on waking from a knockout.
const RECOVERED_HEALTH: f32 = 0.5;

/// Hit points regained per second while conscious.
const HEALTH_REGEN: f32 = 1.0;

/// Idle pause between wander legs.
const IDLE_TIME: std::ops::Range<f32> = 2.0..5.0;

/// Builders work from this far away.
const DEMOLISH_REACH: f32 = 2.5;

/// Blocks above the ground a builder looks for work.
const BUILDER_SCAN_HEIGHT: i32 = 8;

/// Hop when walking into something.
const NPC_JUMP_VELOCITY: f32 = 8.0;

/// Salt for per-chunk spawn seeds.
const SPAWN_SALT: u64 = 0x4e50_4353;

// ============================================================================
// NPC TYPES
// ============================================================================

/// Unique NPC identifier.
pub type NpcId = u32;

/// Who an NPC answers to. Disguises pass with one faction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Faction {
    /// Ordinary folk.
    Civilian,
    /// The Old Bill.
    Police,
    /// The council.
    Council,
    /// The youth gangs.
    Gang,
}

/// Kinds of people in town.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NpcType {
    /// Someone going about their day.
    Public,
    /// Slow, easily startled.
    Pensioner,
    /// Wobbly, chatty.
    Drunk,
    /// Patrols, warns, chases, arrests.
    Police,
    /// Holds territory.
    YouthGang,
    /// Minds a shop.
    Shopkeeper,
    /// Knocks down anything the player builds.
    CouncilBuilder,
}

impl NpcType {
    /// Every type.
    pub const ALL: [Self; 7] = [
        Self::Public,
        Self::Pensioner,
        Self::Drunk,
        Self::Police,
        Self::YouthGang,
        Self::Shopkeeper,
        Self::CouncilBuilder,
    ];

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Public => "Member of the Public",
            Self::Pensioner => "Pensioner",
            Self::Drunk => "Drunk",
            Self::Police => "Police Officer",
            Self::YouthGang => "Youth",
            Self::Shopkeeper => "Shopkeeper",
            Self::CouncilBuilder => "Council Builder",
        }
    }

    /// Walking speed in blocks per second.
    #[must_use]
    pub const fn speed(self) -> f32 {
        match self {
            Self::Public => 2.5,
            Self::Pensioner => 1.2,
            Self::Drunk => 1.5,
            Self::Police => 3.0,
            Self::YouthGang => 3.2,
            Self::Shopkeeper => 2.0,
            Self::CouncilBuilder => 2.2,
        }
    }

    /// Hit points.
    #[must_use]
    pub const fn max_health(self) -> f32 {
        match self {
            Self::Pensioner => 15.0,
            Self::Drunk => 25.0,
            Self::Public | Self::Shopkeeper => 30.0,
            Self::YouthGang | Self::CouncilBuilder => 40.0,
            Self::Police => 60.0,
        }
    }

    /// Allegiance.
    #[must_use]
    pub const fn faction(self) -> Faction {
        match self {
            Self::Police => Faction::Police,
            Self::YouthGang => Faction::Gang,
            Self::CouncilBuilder => Faction::Council,
            Self::Public | Self::Pensioner | Self::Drunk | Self::Shopkeeper => Faction::Civilian,
        }
    }

    /// State a freshly spawned (or recovered) NPC starts in.
    #[must_use]
    pub const fn initial_state(self) -> NpcState {
        match self {
            Self::Police | Self::CouncilBuilder => NpcState::Patrolling,
            Self::Shopkeeper => NpcState::Idle,
            Self::Public | Self::Pensioner | Self::Drunk | Self::YouthGang => NpcState::Wandering,
        }
    }

    /// Carries a phone worth nicking.
    #[must_use]
    pub const fn can_be_mugged(self) -> bool {
        matches!(self, Self::Public | Self::Pensioner)
    }
}

// ============================================================================
// AI STATE MACHINE
// ============================================================================

/// Behaviour states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NpcState {
    /// Standing still.
    Idle,
    /// Strolling about near home.
    Wandering,
    /// Walking a beat.
    Patrolling,
    /// Telling the player to move along.
    Warning,
    /// Chasing the player.
    Aggressive,
    /// Nicking the player.
    Arresting,
    /// Running away.
    Fleeing,
    /// Taking down a player-built block.
    Demolishing,
    /// Out cold.
    KnockedOut,
}

/// A line of speech with its remaining display time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Speech {
    /// What was said.
    pub text: &'static str,
    /// Seconds left on screen.
    pub remaining: f32,
}

mod lines {
    pub const POLICE_WARN: &str = "Oi! Move along, you.";
    pub const POLICE_CHASE: &str = "Stop! Police!";
    pub const POLICE_ARREST: &str = "You're nicked, sunshine.";
    pub const GANG_WARN: &str = "You lost, mate?";
    pub const GANG_ATTACK: &str = "Get him!";
    pub const GANG_FLEE: &str = "Leg it!";
    pub const CIVILIAN_FLEE: &str = "Help! Police!";
    pub const SHOPKEEPER_SHOUT: &str = "Oi! I'm calling the police!";
    pub const BUILDER_DEMOLISH: &str = "This structure contravenes planning regulations.";
    pub const BUILDER_COLLEAGUE: &str = "Alright, mate. Tea break?";
    pub const RECOVER: &str = "Ow, me head.";
    pub const DRUNK: [&str; 3] = ["Oi oi!", "I love you, mate.", "Where's me kebab?"];
}

// ============================================================================
// WHAT AN NPC KNOWS ABOUT THE PLAYER
// ============================================================================

/// The player as NPCs perceive them this step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlayerView {
    /// Feet position.
    pub position: [f32; 3],
    /// Eye position.
    pub eye: [f32; 3],
    /// Current notoriety.
    pub notoriety: f32,
    /// Disguise being worn.
    pub disguise: Option<DisguiseKind>,
    /// Standing next to something they built.
    pub near_player_built: bool,
    /// Police are in their post-arrest grace period.
    pub police_cooldown: bool,
    /// Dead and awaiting respawn.
    pub dead: bool,
}

impl PlayerView {
    /// An unremarkable player standing at `position`.
    #[must_use]
    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            eye: [position[0], position[1] + NPC_EYE_HEIGHT, position[2]],
            ..Self::default()
        }
    }

    fn wearing(&self, kind: DisguiseKind) -> bool {
        self.disguise == Some(kind)
    }
}

/// Shared read-only state for one NPC step.
#[derive(Clone, Copy, Debug)]
pub struct NpcContext<'a> {
    /// The player.
    pub player: PlayerView,
    /// Gang territories and their hostility.
    pub territories: &'a GangTerritories,
    /// Tunables.
    pub config: &'a GameConfig,
}

/// What the NPCs did to the player this step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NpcUpdate {
    /// Officer who got hold of the player.
    pub arrested_by: Option<NpcId>,
    /// Melee damage dealt to the player.
    pub player_damage: f32,
    /// Player-built blocks the council took down.
    pub demolished: Vec<BlockPos>,
}

/// Result of hitting an NPC.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitOutcome {
    /// Who was hit.
    pub kind: NpcType,
    /// The hit knocked them out.
    pub knocked_out: bool,
    /// Already out cold before the hit.
    pub was_unconscious: bool,
    /// Gang territory the NPC belongs to.
    pub territory: Option<TerritoryId>,
}

enum Movement {
    Stay,
    Walk([f32; 3], f32),
}

// ============================================================================
// NPC
// ============================================================================

/// A non-player character.
#[derive(Clone, Debug)]
pub struct Npc {
    /// Unique identifier.
    pub id: NpcId,
    /// Type.
    pub kind: NpcType,
    /// Physical body.
    pub body: Body,
    /// Facing in degrees. 0 faces -Z.
    pub yaw: f32,
    health: f32,
    state: NpcState,
    state_time: f32,
    timer: f32,
    hidden_time: f32,
    attack_cooldown: f32,
    work_timer: f32,
    repath_timer: f32,
    goal: Option<BlockPos>,
    /// Remaining waypoints, next one last.
    path: Vec<BlockPos>,
    wander_target: Option<[f32; 3]>,
    demolish_target: Option<BlockPos>,
    speech: Option<Speech>,
    provoked: bool,
    mugged: bool,
    blocked: bool,
    home: [f32; 3],
    home_chunk: ChunkCoord,
    territory: Option<TerritoryId>,
    shop: Option<LandmarkType>,
    rng: ChaCha8Rng,
}

impl Npc {
    /// Creates an NPC standing at `position`.
    #[must_use]
    pub fn new(id: NpcId, kind: NpcType, position: [f32; 3], seed: u64) -> Self {
        Self {
            id,
            kind,
            body: Body::new(position, NPC_WIDTH, NPC_HEIGHT),
            yaw: 0.0,
            health: kind.max_health(),
            state: kind.initial_state(),
            state_time: 0.0,
            timer: 0.0,
            hidden_time: 0.0,
            attack_cooldown: 0.0,
            work_timer: 0.0,
            repath_timer: 0.0,
            goal: None,
            path: Vec::new(),
            wander_target: None,
            demolish_target: None,
            speech: None,
            provoked: false,
            mugged: false,
            blocked: false,
            home: position,
            home_chunk: ChunkCoord::from_world_pos(position[0], position[2]),
            territory: None,
            shop: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Feet position.
    #[must_use]
    pub const fn position(&self) -> [f32; 3] {
        self.body.position
    }

    /// Eye position.
    #[must_use]
    pub fn eye_position(&self) -> [f32; 3] {
        let [x, y, z] = self.body.position;
        [x, y + NPC_EYE_HEIGHT, z]
    }

    /// Collision box.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        self.body.aabb()
    }

    /// Current hit points.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> NpcState {
        self.state
    }

    /// Speech bubble, if talking.
    #[must_use]
    pub const fn speech(&self) -> Option<Speech> {
        self.speech
    }

    /// Where the NPC belongs.
    #[must_use]
    pub const fn home(&self) -> [f32; 3] {
        self.home
    }

    /// Chunk the NPC was spawned for.
    #[must_use]
    pub const fn home_chunk(&self) -> ChunkCoord {
        self.home_chunk
    }

    /// Gang territory, for youths.
    #[must_use]
    pub const fn territory(&self) -> Option<TerritoryId> {
        self.territory
    }

    /// Shop minded, for shopkeepers.
    #[must_use]
    pub const fn shop(&self) -> Option<LandmarkType> {
        self.shop
    }

    /// Not knocked out.
    #[must_use]
    pub fn is_conscious(&self) -> bool {
        self.state != NpcState::KnockedOut
    }

    /// Waypoints still to walk, next first.
    #[must_use]
    pub fn path(&self) -> Vec<BlockPos> {
        self.path.iter().rev().copied().collect()
    }

    fn set_state(&mut self, to: NpcState, events: &EventSender) {
        if self.state == to {
            return;
        }
        let from = self.state;
        debug!(id = self.id, kind = self.kind.name(), ?from, ?to, "npc state changed");
        events.send(GameEvent::NpcStateChanged {
            id: self.id,
            kind: self.kind,
            from,
            to,
        });
        self.state = to;
        self.state_time = 0.0;
        self.timer = 0.0;
        self.hidden_time = 0.0;
        self.path.clear();
        self.goal = None;
        self.wander_target = None;
    }

    fn speak(&mut self, text: &'static str, config: &NpcSection, events: &EventSender) {
        self.speech = Some(Speech {
            text,
            remaining: config.speech_duration,
        });
        events.send(GameEvent::NpcSpoke { id: self.id, text });
    }

    fn distance_to(&self, point: [f32; 3]) -> f32 {
        horizontal_distance(self.position(), point)
    }

    fn can_see(&self, world: &World, player: &PlayerView, range: f32) -> bool {
        !player.dead
            && self.distance_to(player.position) <= range
            && line_of_sight(self.eye_position(), player.eye, world)
    }

    fn face(&mut self, point: [f32; 3]) {
        let [x, _, z] = self.position();
        let (dx, dz) = (point[0] - x, point[2] - z);
        if dx.abs() > 1e-4 || dz.abs() > 1e-4 {
            self.yaw = yaw_towards(dx, dz);
        }
    }

    // ------------------------------------------------------------------
    // Per-step update
    // ------------------------------------------------------------------

    fn update(
        &mut self,
        dt: f32,
        world: &mut World,
        ctx: &NpcContext<'_>,
        pathfinder: &Pathfinder,
        events: &EventSender,
        out: &mut NpcUpdate,
    ) {
        let npc_config = &ctx.config.npc;
        self.state_time += dt;
        self.attack_cooldown = (self.attack_cooldown - dt).max(0.0);
        if let Some(speech) = &mut self.speech {
            speech.remaining -= dt;
            if speech.remaining <= 0.0 {
                self.speech = None;
            }
        }

        let movement = if self.state == NpcState::KnockedOut {
            self.timer -= dt;
            if self.timer <= 0.0 {
                self.health = self.kind.max_health() * RECOVERED_HEALTH;
                self.set_state(self.kind.initial_state(), events);
                self.speak(lines::RECOVER, npc_config, events);
            }
            Movement::Stay
        } else {
            self.health = (self.health + HEALTH_REGEN * dt).min(self.kind.max_health());
            match self.kind {
                NpcType::Police => self.police_brain(dt, world, ctx, events, out),
                NpcType::YouthGang => self.gang_brain(dt, world, ctx, events, out),
                NpcType::Shopkeeper => self.shopkeeper_brain(dt, world, ctx, events),
                NpcType::CouncilBuilder => self.builder_brain(dt, world, ctx, events, out),
                NpcType::Public | NpcType::Pensioner | NpcType::Drunk => {
                    self.civilian_brain(dt, world, ctx, events)
                }
            }
        };

        let world: &World = world;
        match movement {
            Movement::Stay => self.body.stop(),
            Movement::Walk(target, speed) => self.walk_towards(dt, world, target, speed, pathfinder, npc_config),
        }

        if self.blocked && self.body.on_ground {
            self.body.jump(NPC_JUMP_VELOCITY);
        }
        let area = self.aabb();
        let reach = Aabb::new(area.min.map(|v| v - 1.0), area.max.map(|v| v + 1.0));
        let obstacles: Vec<Aabb> = world.props_in(reach).map(|p| p.prop.aabb()).collect();
        self.blocked = self.body.update(dt, world, &obstacles).blocked;
    }

    fn walk_towards(
        &mut self,
        dt: f32,
        world: &World,
        target: [f32; 3],
        speed: f32,
        pathfinder: &Pathfinder,
        config: &NpcSection,
    ) {
        let goal = BlockPos::containing(target);
        self.repath_timer -= dt;
        let new_goal = self.goal != Some(goal);
        // Paths go stale when blocks change, so even a fixed goal is
        // searched again once the timer runs out
        let due = self.repath_timer <= 0.0;
        if (new_goal && self.path.is_empty()) || (due && (new_goal || !self.path.is_empty())) {
            let start = BlockPos::containing(self.position());
            self.path = pathfinder.find_path(world, start, goal).unwrap_or_else(|| vec![goal]);
            self.path.reverse();
            self.goal = Some(goal);
            self.repath_timer = config.repath_interval;
        }

        let position = self.position();
        while let Some(next) = self.path.last() {
            let center = [next.x as f32 + 0.5, next.y as f32, next.z as f32 + 0.5];
            if horizontal_distance(position, center) < WAYPOINT_REACHED {
                self.path.pop();
            } else {
                break;
            }
        }

        let Some(next) = self.path.last() else {
            self.body.stop();
            return;
        };
        let (dx, dz) = (next.x as f32 + 0.5 - position[0], next.z as f32 + 0.5 - position[2]);
        let len = dx.hypot(dz);
        if len < 1e-4 {
            self.body.stop();
            return;
        }
        self.body.set_walk(dx / len * speed, dz / len * speed);
        self.yaw = yaw_towards(dx, dz);
    }

    /// Point [`FLEE_DISTANCE`] away from `threat`.
    fn flee_target(&mut self, threat: [f32; 3]) -> [f32; 3] {
        let [x, y, z] = self.position();
        let (mut dx, mut dz) = (x - threat[0], z - threat[2]);
        let len = dx.hypot(dz);
        if len < 1e-3 {
            let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
            (dx, dz) = (angle.cos(), angle.sin());
        } else {
            (dx, dz) = (dx / len, dz / len);
        }
        [x + dx * FLEE_DISTANCE, y, z + dz * FLEE_DISTANCE]
    }

    /// Strolls between random spots near home, pausing in between. Civilians
    /// show the pause as [`NpcState::Idle`].
    fn wander(&mut self, dt: f32, world: &World, config: &NpcSection, events: &EventSender) -> Movement {
        let pause_state = match self.state {
            NpcState::Wandering | NpcState::Idle if self.kind.faction() == Faction::Civilian => Some(NpcState::Idle),
            _ => None,
        };

        if let Some(target) = self.wander_target {
            if self.distance_to(target) > WAYPOINT_REACHED * 2.0 && self.state_time < 20.0 {
                return Movement::Walk(target, self.kind.speed());
            }
            // Arrived, or given up on a spot that cannot be reached
            self.wander_target = None;
            let pause = self.rng.gen_range(IDLE_TIME);
            if let Some(idle) = pause_state {
                self.set_state(idle, events);
            }
            self.timer = pause;
            return Movement::Stay;
        }

        self.timer -= dt;
        if self.timer > 0.0 {
            return Movement::Stay;
        }

        let r = config.wander_radius;
        let x = self.home[0] + self.rng.gen_range(-r..=r);
        let z = self.home[2] + self.rng.gen_range(-r..=r);
        let from = self.home[1] as i32 - 3;
        let Some(y) = world.standing_height(x.floor() as i32, z.floor() as i32, from) else {
            self.timer = 1.0;
            return Movement::Stay;
        };
        if pause_state.is_some() {
            self.set_state(NpcState::Wandering, events);
        }
        self.state_time = 0.0;
        let target = [x.floor() + 0.5, y as f32, z.floor() + 0.5];
        self.wander_target = Some(target);
        Movement::Walk(target, self.kind.speed())
    }

    // ------------------------------------------------------------------
    // Brains
    // ------------------------------------------------------------------

    fn police_brain(
        &mut self,
        dt: f32,
        world: &World,
        ctx: &NpcContext<'_>,
        events: &EventSender,
        out: &mut NpcUpdate,
    ) -> Movement {
        let police = &ctx.config.police;
        let npc_config = &ctx.config.npc;
        let player = &ctx.player;
        let dist = self.distance_to(player.position);
        let sees = self.can_see(world, player, police.detection_range);
        let ignores = player.dead
            || player.police_cooldown
            || (player.wearing(DisguiseKind::PoliceUniform) && !self.provoked);
        let pursuit = self.provoked || player.notoriety >= police.pursuit_notoriety;

        match self.state {
            NpcState::Warning => {
                if ignores {
                    self.set_state(NpcState::Patrolling, events);
                    return Movement::Stay;
                }
                if pursuit {
                    self.set_state(NpcState::Aggressive, events);
                    self.speak(lines::POLICE_CHASE, npc_config, events);
                    return Movement::Stay;
                }
                self.face(player.position);
                self.timer -= dt;
                if self.timer <= 0.0 {
                    if dist <= police.warning_range {
                        self.set_state(NpcState::Aggressive, events);
                        self.speak(lines::POLICE_CHASE, npc_config, events);
                    } else {
                        self.set_state(NpcState::Patrolling, events);
                    }
                }
                Movement::Stay
            }
            NpcState::Aggressive => {
                if ignores {
                    self.stand_down(events);
                    return Movement::Stay;
                }
                if dist <= police.arrest_range {
                    self.set_state(NpcState::Arresting, events);
                    self.speak(lines::POLICE_ARREST, npc_config, events);
                    out.arrested_by.get_or_insert(self.id);
                    return Movement::Stay;
                }
                if dist > police.give_up_range {
                    self.stand_down(events);
                    return Movement::Stay;
                }
                if sees {
                    self.hidden_time = 0.0;
                } else {
                    self.hidden_time += dt;
                    if self.hidden_time >= police.hidden_give_up_time {
                        self.stand_down(events);
                        return Movement::Stay;
                    }
                }
                Movement::Walk(player.position, self.kind.speed() * police.chase_speed_multiplier)
            }
            NpcState::Arresting => {
                if ignores {
                    self.stand_down(events);
                } else if dist > police.arrest_range * 2.0 {
                    self.set_state(NpcState::Aggressive, events);
                } else {
                    self.face(player.position);
                    out.arrested_by.get_or_insert(self.id);
                }
                Movement::Stay
            }
            _ => {
                if self.state != NpcState::Patrolling {
                    self.set_state(NpcState::Patrolling, events);
                }
                if !ignores && sees {
                    if pursuit {
                        self.set_state(NpcState::Aggressive, events);
                        self.speak(lines::POLICE_CHASE, npc_config, events);
                        return Movement::Stay;
                    }
                    let suspicious = player.notoriety >= police.warn_notoriety
                        || player.wearing(DisguiseKind::Balaclava)
                        || player.near_player_built;
                    if suspicious {
                        self.set_state(NpcState::Warning, events);
                        self.timer = police.warning_duration;
                        self.face(player.position);
                        self.speak(lines::POLICE_WARN, npc_config, events);
                        return Movement::Stay;
                    }
                }
                self.wander(dt, world, npc_config, events)
            }
        }
    }

    fn stand_down(&mut self, events: &EventSender) {
        self.provoked = false;
        self.set_state(NpcState::Patrolling, events);
    }

    fn gang_brain(
        &mut self,
        dt: f32,
        world: &World,
        ctx: &NpcContext<'_>,
        events: &EventSender,
        out: &mut NpcUpdate,
    ) -> Movement {
        let gang = &ctx.config.gang;
        let npc_config = &ctx.config.npc;
        let player = &ctx.player;
        let dist = self.distance_to(player.position);
        let hostility = self.territory.map_or(Hostility::Neutral, |t| ctx.territories.hostility(t));
        let hostile = !player.dead && (self.provoked || hostility == Hostility::Hostile);
        let blends_in = player.wearing(DisguiseKind::Tracksuit);
        let hurt = self.health < self.kind.max_health() * BADLY_HURT;

        if self.state == NpcState::Fleeing {
            if self.state_time >= MIN_FLEE_TIME && !hurt {
                self.set_state(NpcState::Wandering, events);
                return Movement::Stay;
            }
            let target = self.flee_target(player.position);
            return Movement::Walk(target, self.kind.speed());
        }
        if hurt {
            self.set_state(NpcState::Fleeing, events);
            self.speak(lines::GANG_FLEE, npc_config, events);
            return Movement::Stay;
        }

        match self.state {
            NpcState::Aggressive => {
                if !hostile || dist > npc_config.detection_range * 2.0 {
                    self.provoked = false;
                    self.set_state(NpcState::Wandering, events);
                    return Movement::Stay;
                }
                self.face(player.position);
                if dist <= npc_config.melee_range {
                    if self.attack_cooldown <= 0.0 {
                        out.player_damage += npc_config.melee_damage;
                        self.attack_cooldown = npc_config.melee_cooldown;
                        debug!(id = self.id, damage = npc_config.melee_damage, "youth lands a punch");
                    }
                    return Movement::Stay;
                }
                Movement::Walk(player.position, self.kind.speed())
            }
            NpcState::Warning => {
                if hostile {
                    self.set_state(NpcState::Aggressive, events);
                    self.speak(lines::GANG_ATTACK, npc_config, events);
                } else if hostility != Hostility::Wary || blends_in || dist > gang.warning_range {
                    self.set_state(NpcState::Wandering, events);
                } else {
                    self.face(player.position);
                }
                Movement::Stay
            }
            _ => {
                if hostile && dist <= npc_config.detection_range {
                    self.set_state(NpcState::Aggressive, events);
                    self.speak(lines::GANG_ATTACK, npc_config, events);
                    return Movement::Stay;
                }
                if hostility == Hostility::Wary && !blends_in && !player.dead && dist <= gang.warning_range {
                    self.set_state(NpcState::Warning, events);
                    self.face(player.position);
                    self.speak(lines::GANG_WARN, npc_config, events);
                    return Movement::Stay;
                }
                if self.state != NpcState::Wandering {
                    self.set_state(NpcState::Wandering, events);
                }
                self.wander(dt, world, npc_config, events)
            }
        }
    }

    fn civilian_brain(&mut self, dt: f32, world: &World, ctx: &NpcContext<'_>, events: &EventSender) -> Movement {
        let npc_config = &ctx.config.npc;
        let player = &ctx.player;

        if self.state == NpcState::Fleeing {
            if self.state_time >= MIN_FLEE_TIME && self.distance_to(player.position) > npc_config.detection_range {
                self.provoked = false;
                self.set_state(self.kind.initial_state(), events);
                return Movement::Stay;
            }
            let target = self.flee_target(player.position);
            return Movement::Walk(target, self.kind.speed() * 1.5);
        }

        let frightened = self.provoked
            || (player.notoriety >= npc_config.flee_notoriety
                && self.can_see(world, player, npc_config.detection_range));
        if frightened {
            self.set_state(NpcState::Fleeing, events);
            self.speak(lines::CIVILIAN_FLEE, npc_config, events);
            return Movement::Stay;
        }

        if self.kind == NpcType::Drunk && self.speech.is_none() && self.rng.gen_bool(0.002) {
            let line = lines::DRUNK[self.rng.gen_range(0..lines::DRUNK.len())];
            self.speak(line, npc_config, events);
        }
        self.wander(dt, world, npc_config, events)
    }

    fn shopkeeper_brain(&mut self, dt: f32, world: &World, ctx: &NpcContext<'_>, events: &EventSender) -> Movement {
        if self.provoked || self.state == NpcState::Fleeing {
            return self.civilian_brain(dt, world, ctx, events);
        }
        if self.state != NpcState::Idle {
            self.set_state(NpcState::Idle, events);
        }
        if self.distance_to(self.home) > 1.0 {
            return Movement::Walk(self.home, self.kind.speed());
        }
        self.face(ctx.player.position);
        Movement::Stay
    }

    fn builder_brain(
        &mut self,
        dt: f32,
        world: &mut World,
        ctx: &NpcContext<'_>,
        events: &EventSender,
        out: &mut NpcUpdate,
    ) -> Movement {
        let npc_config = &ctx.config.npc;
        let player = &ctx.player;

        if self.provoked || self.state == NpcState::Fleeing {
            return self.civilian_brain(dt, world, ctx, events);
        }

        // A colleague in hi-vis is left to get on with it
        let colleague_nearby = player.wearing(DisguiseKind::HiVis)
            && !player.dead
            && self.distance_to(player.position) <= npc_config.detection_range;

        if self.state == NpcState::Demolishing {
            if colleague_nearby {
                self.demolish_target = None;
                self.set_state(NpcState::Patrolling, events);
                self.speak(lines::BUILDER_COLLEAGUE, npc_config, events);
                return Movement::Stay;
            }
            let target = match self.demolish_target {
                Some(pos) if world.get_block(pos).is_player_placed() => pos,
                _ => match find_player_block(world, self.position(), npc_config.detection_range) {
                    Some(pos) => {
                        self.demolish_target = Some(pos);
                        pos
                    }
                    None => {
                        self.demolish_target = None;
                        self.set_state(NpcState::Patrolling, events);
                        return Movement::Stay;
                    }
                },
            };

            let center = target.center();
            if self.distance_to(center) > DEMOLISH_REACH {
                return Movement::Walk([center[0], target.y as f32, center[2]], self.kind.speed());
            }

            self.face(center);
            self.timer += dt;
            if self.timer >= npc_config.demolish_interval {
                self.timer = 0.0;
                if world.set_block(target, Block::AIR).is_ok() {
                    info!(id = self.id, x = target.x, y = target.y, z = target.z, "council demolished a block");
                    events.send(GameEvent::BlockDemolished { npc: self.id, pos: target });
                    out.demolished.push(target);
                    self.speak(lines::BUILDER_DEMOLISH, npc_config, events);
                }
                self.demolish_target = None;
            }
            return Movement::Stay;
        }

        if self.state != NpcState::Patrolling {
            self.set_state(NpcState::Patrolling, events);
        }
        self.work_timer -= dt;
        if self.work_timer <= 0.0 {
            self.work_timer = npc_config.demolish_interval;
            if !colleague_nearby {
                if let Some(pos) = find_player_block(world, self.position(), npc_config.detection_range) {
                    self.set_state(NpcState::Demolishing, events);
                    self.demolish_target = Some(pos);
                    return Movement::Stay;
                }
            }
        }
        self.wander(dt, world, npc_config, events)
    }
}

/// Nearest player-placed block within `range` of `from`.
fn find_player_block(world: &World, from: [f32; 3], range: f32) -> Option<BlockPos> {
    let base = BlockPos::containing(from);
    let r = range as i32;
    let mut best: Option<(i32, BlockPos)> = None;
    for y in SURFACE_Y..=SURFACE_Y + BUILDER_SCAN_HEIGHT {
        for dz in -r..=r {
            for dx in -r..=r {
                let pos = BlockPos::new(base.x + dx, y, base.z + dz);
                if !world.get_block(pos).is_player_placed() {
                    continue;
                }
                let dy = y - base.y;
                let d = dx * dx + dy * dy + dz * dz;
                if best.map_or(true, |(bd, _)| d < bd) {
                    best = Some((d, pos));
                }
            }
        }
    }
    best.map(|(_, pos)| pos)
}

// ============================================================================
// NPC MANAGER
// ============================================================================

/// Owns every NPC in the loaded part of town.
#[derive(Clone, Debug)]
pub struct NpcManager {
    npcs: Vec<Npc>,
    next_id: NpcId,
    spawned_chunks: HashSet<ChunkCoord>,
    pathfinder: Pathfinder,
}

impl NpcManager {
    /// Creates an empty manager whose searches expand at most `path_node_budget` nodes.
    #[must_use]
    pub fn new(path_node_budget: usize) -> Self {
        Self {
            npcs: Vec::with_capacity(256),
            next_id: 1,
            spawned_chunks: HashSet::new(),
            pathfinder: Pathfinder::new(path_node_budget),
        }
    }

    /// Spawns an NPC.
    pub fn spawn(&mut self, kind: NpcType, position: [f32; 3], seed: u64, events: &EventSender) -> NpcId {
        let id = self.next_id;
        self.next_id += 1;
        self.npcs.push(Npc::new(id, kind, position, seed));
        debug!(id, kind = kind.name(), x = position[0], y = position[1], z = position[2], "npc spawned");
        events.send(GameEvent::NpcSpawned { id, kind });
        id
    }

    /// Spawns a gang member belonging to a territory.
    pub fn spawn_gang_member(
        &mut self,
        territory: TerritoryId,
        position: [f32; 3],
        seed: u64,
        events: &EventSender,
    ) -> NpcId {
        let id = self.spawn(NpcType::YouthGang, position, seed, events);
        if let Some(npc) = self.get_mut(id) {
            npc.territory = Some(territory);
        }
        id
    }

    /// Spawns the keeper of a shop.
    pub fn spawn_shopkeeper(&mut self, shop: LandmarkType, position: [f32; 3], seed: u64, events: &EventSender) -> NpcId {
        let id = self.spawn(NpcType::Shopkeeper, position, seed, events);
        if let Some(npc) = self.get_mut(id) {
            npc.shop = Some(shop);
        }
        id
    }

    /// Populates a freshly loaded chunk. Each chunk is populated once until
    /// it unloads; the same seed always yields the same townsfolk.
    pub fn spawn_for_chunk(
        &mut self,
        world: &World,
        coord: ChunkCoord,
        config: &GameConfig,
        territories: &GangTerritories,
        events: &EventSender,
    ) -> usize {
        if !world.is_loaded(coord) || !self.spawned_chunks.insert(coord) {
            return 0;
        }
        let chunk_seed = world.seed().derive(SPAWN_SALT).hash2(coord.x, coord.z);
        let mut rng = ChaCha8Rng::seed_from_u64(chunk_seed);
        let in_chunk = |p: [f32; 3]| ChunkCoord::from_world_pos(p[0], p[2]) == coord;
        let before = self.npcs.len();

        for landmark in world.plan().landmarks() {
            if landmark.kind == LandmarkType::PoliceStation && in_chunk(landmark.entrance()) {
                let [x, y, z] = landmark.entrance();
                for offset in [-1.5, 1.5] {
                    self.spawn(NpcType::Police, [x + offset, y, z], rng.gen(), events);
                }
            } else if landmark.kind.is_shop() && in_chunk(landmark.interior()) {
                self.spawn_shopkeeper(landmark.kind, landmark.interior(), rng.gen(), events);
            }
        }

        for territory in territories.iter().filter(|t| in_chunk(t.rally)) {
            let n = config.gang.members_per_territory;
            for i in 0..n {
                let angle = i as f32 / n as f32 * std::f32::consts::TAU;
                let (x, z) = (territory.rally[0] + angle.cos() * 2.5, territory.rally[2] + angle.sin() * 2.5);
                let from = territory.rally[1] as i32 - 2;
                if let Some(y) = world.standing_height(x.floor() as i32, z.floor() as i32, from) {
                    self.spawn_gang_member(territory.id, [x, y as f32, z], rng.gen(), events);
                }
            }
        }

        if rng.gen::<f32>() < config.npc.spawn_chance {
            let count = rng.gen_range(1..=config.npc.max_per_chunk.max(1));
            for _ in 0..count {
                let Some(position) = pavement_spot(world, coord, &mut rng) else {
                    continue;
                };
                let kind = match rng.gen_range(0..100) {
                    0..=44 => NpcType::Public,
                    45..=64 => NpcType::Pensioner,
                    65..=79 => NpcType::Drunk,
                    _ => NpcType::CouncilBuilder,
                };
                self.spawn(kind, position, rng.gen(), events);
            }
        }

        // Bobbies on the beat, away from the station
        if rng.gen::<f32>() < config.police.patrol_chance {
            if let Some(position) = pavement_spot(world, coord, &mut rng) {
                self.spawn(NpcType::Police, position, rng.gen(), events);
            }
        }

        // Everything spawned here belongs to this chunk, wherever it stands
        for npc in &mut self.npcs[before..] {
            npc.home_chunk = coord;
        }
        self.npcs.len() - before
    }

    /// Removes the NPCs that belong to an unloaded chunk.
    pub fn despawn_chunk(&mut self, coord: ChunkCoord, events: &EventSender) -> usize {
        self.spawned_chunks.remove(&coord);
        let before = self.npcs.len();
        self.npcs.retain(|npc| {
            if npc.home_chunk == coord {
                events.send(GameEvent::NpcDespawned { id: npc.id });
                false
            } else {
                true
            }
        });
        before - self.npcs.len()
    }

    /// Steps every NPC.
    pub fn update(&mut self, dt: f32, world: &mut World, ctx: &NpcContext<'_>, events: &EventSender) -> NpcUpdate {
        let mut out = NpcUpdate::default();
        for npc in &mut self.npcs {
            npc.update(dt, world, ctx, &self.pathfinder, events, &mut out);
        }
        out
    }

    /// All NPCs.
    #[must_use]
    pub fn npcs(&self) -> &[Npc] {
        &self.npcs
    }

    /// Number of NPCs.
    #[must_use]
    pub fn count(&self) -> usize {
        self.npcs.len()
    }

    /// Finds an NPC by ID.
    #[must_use]
    pub fn get(&self, id: NpcId) -> Option<&Npc> {
        self.npcs.iter().find(|n| n.id == id)
    }

    /// Finds a mutable NPC by ID.
    pub fn get_mut(&mut self, id: NpcId) -> Option<&mut Npc> {
        self.npcs.iter_mut().find(|n| n.id == id)
    }

    /// Removes an NPC by ID.
    pub fn remove(&mut self, id: NpcId, events: &EventSender) -> bool {
        let Some(idx) = self.npcs.iter().position(|n| n.id == id) else {
            return false;
        };
        self.npcs.remove(idx);
        events.send(GameEvent::NpcDespawned { id });
        true
    }

    /// Collision boxes of every NPC.
    pub fn boxes(&self) -> impl Iterator<Item = (NpcId, Aabb)> + '_ {
        self.npcs.iter().map(|n| (n.id, n.aabb()))
    }

    /// Hurts an NPC and provokes it. Knocks it out at zero health.
    pub fn take_hit(&mut self, id: NpcId, damage: f32, config: &NpcSection, events: &EventSender) -> Option<HitOutcome> {
        let npc = self.get_mut(id)?;
        let was_unconscious = !npc.is_conscious();
        let mut knocked_out = false;

        if !was_unconscious {
            npc.health = (npc.health - damage).max(0.0);
            npc.provoked = true;
            if npc.health <= 0.0 {
                npc.set_state(NpcState::KnockedOut, events);
                npc.timer = config.knockout_time;
                npc.speech = None;
                knocked_out = true;
                info!(id, kind = npc.kind.name(), "npc knocked out");
                events.send(GameEvent::NpcKnockedOut { id });
            }
        }

        Some(HitOutcome {
            kind: npc.kind,
            knocked_out,
            was_unconscious,
            territory: npc.territory,
        })
    }

    /// Goes through an unconscious NPC's pockets. Returns whether there was
    /// anything to take.
    pub fn mug(&mut self, id: NpcId) -> bool {
        match self.get_mut(id) {
            Some(npc) if !npc.is_conscious() && npc.kind.can_be_mugged() && !npc.mugged => {
                npc.mugged = true;
                true
            }
            _ => false,
        }
    }

    /// Conscious, non-gang NPCs within `range` of `position`. Gangs never
    /// grass.
    #[must_use]
    pub fn witnesses(&self, position: [f32; 3], range: f32) -> Vec<NpcId> {
        self.npcs
            .iter()
            .filter(|n| n.is_conscious() && n.kind.faction() != Faction::Gang)
            .filter(|n| n.distance_to(position) <= range)
            .map(|n| n.id)
            .collect()
    }

    /// Sends conscious officers within `range` after the player. Returns how
    /// many responded.
    pub fn alert_police(&mut self, position: [f32; 3], range: f32, config: &NpcSection, events: &EventSender) -> usize {
        let mut responded = 0;
        for npc in &mut self.npcs {
            if npc.kind != NpcType::Police || !npc.is_conscious() || npc.distance_to(position) > range {
                continue;
            }
            responded += 1;
            if matches!(npc.state, NpcState::Aggressive | NpcState::Arresting) {
                continue;
            }
            npc.provoked = true;
            npc.set_state(NpcState::Aggressive, events);
            npc.speak(lines::POLICE_CHASE, config, events);
        }
        responded
    }

    /// The keeper of `shop` shouts about a crime. Returns whether anyone
    /// shouted.
    pub fn shopkeeper_shout(&mut self, shop: LandmarkType, config: &NpcSection, events: &EventSender) -> bool {
        let Some(keeper) = self
            .npcs
            .iter_mut()
            .find(|n| n.shop == Some(shop) && n.is_conscious())
        else {
            return false;
        };
        keeper.speak(lines::SHOPKEEPER_SHOUT, config, events);
        true
    }

    /// Every officer stands down once the player has been processed.
    pub fn finish_arrest(&mut self, events: &EventSender) {
        for npc in &mut self.npcs {
            if npc.kind == NpcType::Police && npc.is_conscious() {
                npc.stand_down(events);
            }
        }
    }

    /// Faction and distance of every conscious NPC near `position`, for
    /// disguise scrutiny.
    #[must_use]
    pub fn observers(&self, position: [f32; 3], range: f32) -> Vec<(Faction, f32)> {
        self.npcs
            .iter()
            .filter(|n| n.is_conscious())
            .map(|n| (n.kind.faction(), n.distance_to(position)))
            .filter(|&(_, d)| d <= range)
            .collect()
    }
}

impl Default for NpcManager {
    fn default() -> Self {
        Self::new(Pathfinder::default().max_nodes)
    }
}

/// A random pavement column in the chunk with somewhere to stand.
fn pavement_spot(world: &World, coord: ChunkCoord, rng: &mut ChaCha8Rng) -> Option<[f32; 3]> {
    const ATTEMPTS: usize = 8;
    (0..ATTEMPTS).find_map(|_| {
        let x = coord.world_x() + rng.gen_range(0..CHUNK_SIZE as i32);
        let z = coord.world_z() + rng.gen_range(0..CHUNK_SIZE as i32);
        if ground_at(x, z) != Ground::Pavement {
            return None;
        }
        let y = world.standing_height(x, z, SURFACE_Y)?;
        Some([x as f32 + 0.5, y as f32, z as f32 + 0.5])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use ragamuffin_world::{BlockType, WorldSeed};

    struct Scene {
        world: World,
        spawn: [f32; 3],
        npcs: NpcManager,
        bus: EventBus,
        config: GameConfig,
        territories: GangTerritories,
    }

    impl Scene {
        fn new() -> Self {
            let mut world = World::with_seed(WorldSeed::new(3));
            let spawn = world.plan().spawn_point();
            world.ensure_loaded_around(spawn[0], spawn[2], 2);
            let config = GameConfig::default();
            let territories = GangTerritories::from_plan(world.plan(), &config.gang);
            Self {
                world,
                spawn,
                npcs: NpcManager::new(config.npc.path_node_budget),
                bus: EventBus::new(4096),
                config,
                territories,
            }
        }

        fn at(&self, dx: f32, dz: f32) -> [f32; 3] {
            [self.spawn[0] + dx, self.spawn[1], self.spawn[2] + dz]
        }

        fn spawn(&mut self, kind: NpcType, dx: f32, dz: f32) -> NpcId {
            let pos = self.at(dx, dz);
            self.npcs.spawn(kind, pos, 7, &self.bus.sender())
        }

        fn step(&mut self, player: PlayerView, seconds: f32) -> NpcUpdate {
            let sender = self.bus.sender();
            let mut total = NpcUpdate::default();
            let dt = 1.0 / 30.0;
            for _ in 0..(seconds / dt).round() as u32 {
                let ctx = NpcContext {
                    player,
                    territories: &self.territories,
                    config: &self.config,
                };
                let out = self.npcs.update(dt, &mut self.world, &ctx, &sender);
                total.arrested_by = total.arrested_by.or(out.arrested_by);
                total.player_damage += out.player_damage;
                total.demolished.extend(out.demolished);
            }
            total
        }

        fn state(&self, id: NpcId) -> NpcState {
            self.npcs.get(id).unwrap().state()
        }
    }

    #[test]
    fn test_types_have_sensible_stats() {
        for kind in NpcType::ALL {
            assert!(kind.speed() > 0.0);
            assert!(kind.max_health() > 0.0);
        }
        assert_eq!(NpcType::Police.faction(), Faction::Police);
        assert_eq!(NpcType::YouthGang.faction(), Faction::Gang);
        assert_eq!(NpcType::CouncilBuilder.initial_state(), NpcState::Patrolling);
    }

    #[test]
    fn test_chunk_spawning_is_deterministic_and_once_only() {
        let config = GameConfig::default();
        let spawn_for = || {
            let mut world = World::with_seed(WorldSeed::new(21));
            let station = *world.plan().landmark(LandmarkType::PoliceStation).unwrap();
            let entrance = station.entrance();
            world.ensure_loaded_around(entrance[0], entrance[2], 1);
            let territories = GangTerritories::from_plan(world.plan(), &config.gang);
            let coord = ChunkCoord::from_world_pos(entrance[0], entrance[2]);
            let bus = EventBus::default();
            let mut npcs = NpcManager::default();
            let first = npcs.spawn_for_chunk(&world, coord, &config, &territories, &bus.sender());
            let again = npcs.spawn_for_chunk(&world, coord, &config, &territories, &bus.sender());
            assert_eq!(again, 0);
            assert!(first >= 2);
            npcs.npcs().iter().map(|n| (n.kind, n.position())).collect::<Vec<_>>()
        };

        let a = spawn_for();
        assert_eq!(a, spawn_for());
        assert!(a.iter().filter(|(k, _)| *k == NpcType::Police).count() >= 2);
    }

    #[test]
    fn test_stale_path_is_searched_again_on_the_timer() {
        let mut scene = Scene::new();
        let id = scene.spawn(NpcType::Public, 0.0, 0.0);
        let target = scene.at(3.0, 0.0);
        let pathfinder = Pathfinder::new(scene.config.npc.path_node_budget);
        let config = scene.config.npc.clone();
        let npc = scene.npcs.get_mut(id).unwrap();

        npc.walk_towards(0.01, &scene.world, target, 1.0, &pathfinder, &config);
        assert!(!npc.path.is_empty());

        // Same goal, timer still running: the old route is kept
        let stale = BlockPos::new(-500, SURFACE_Y + 1, -500);
        npc.path = vec![stale];
        npc.walk_towards(0.01, &scene.world, target, 1.0, &pathfinder, &config);
        assert_eq!(npc.path, vec![stale]);

        npc.walk_towards(config.repath_interval + 0.1, &scene.world, target, 1.0, &pathfinder, &config);
        assert!(!npc.path.is_empty());
        assert!(!npc.path.contains(&stale));
    }

    #[test]
    fn test_despawn_on_unload() {
        let mut scene = Scene::new();
        let coord = ChunkCoord::from_world_pos(scene.spawn[0], scene.spawn[2]);
        let sender = scene.bus.sender();
        scene.npcs.spawn(NpcType::Public, scene.spawn, 1, &sender);
        scene.bus.receiver().drain();

        assert_eq!(scene.npcs.despawn_chunk(coord, &sender), 1);
        assert_eq!(scene.npcs.count(), 0);
        assert!(matches!(scene.bus.receiver().drain()[..], [GameEvent::NpcDespawned { .. }]));
    }

    #[test]
    fn test_police_warn_then_chase_then_arrest() {
        let mut scene = Scene::new();
        let officer = scene.spawn(NpcType::Police, 4.0, 0.0);
        let mut player = PlayerView::at(scene.spawn);
        player.notoriety = scene.config.police.warn_notoriety + 5.0;

        scene.step(player, 0.1);
        assert_eq!(scene.state(officer), NpcState::Warning);
        assert_eq!(scene.npcs.get(officer).unwrap().speech().unwrap().text, lines::POLICE_WARN);

        scene.step(player, scene.config.police.warning_duration + 0.2);
        let out = scene.step(player, 5.0);
        assert_eq!(out.arrested_by, Some(officer));
        assert_eq!(scene.state(officer), NpcState::Arresting);

        scene.npcs.finish_arrest(&scene.bus.sender());
        assert_eq!(scene.state(officer), NpcState::Patrolling);
    }

    #[test]
    fn test_police_chase_immediately_at_pursuit_notoriety() {
        let mut scene = Scene::new();
        let officer = scene.spawn(NpcType::Police, 5.0, 0.0);
        let mut player = PlayerView::at(scene.spawn);
        player.notoriety = scene.config.police.pursuit_notoriety;

        scene.step(player, 0.1);
        assert_eq!(scene.state(officer), NpcState::Aggressive);
    }

    #[test]
    fn test_police_ignore_uniform_and_cooldown() {
        let mut scene = Scene::new();
        let officer = scene.spawn(NpcType::Police, 4.0, 0.0);
        let mut player = PlayerView::at(scene.spawn);
        player.notoriety = 90.0;
        player.disguise = Some(DisguiseKind::PoliceUniform);
        scene.step(player, 1.0);
        assert_eq!(scene.state(officer), NpcState::Patrolling);

        player.disguise = None;
        player.police_cooldown = true;
        scene.step(player, 1.0);
        assert_eq!(scene.state(officer), NpcState::Patrolling);
    }

    #[test]
    fn test_balaclava_draws_a_warning() {
        let mut scene = Scene::new();
        let officer = scene.spawn(NpcType::Police, 4.0, 0.0);
        let mut player = PlayerView::at(scene.spawn);
        player.disguise = Some(DisguiseKind::Balaclava);
        scene.step(player, 0.1);
        assert_eq!(scene.state(officer), NpcState::Warning);
    }

    #[test]
    fn test_police_give_up_when_player_escapes() {
        let mut scene = Scene::new();
        let officer = scene.spawn(NpcType::Police, 2.0, 0.0);
        let sender = scene.bus.sender();
        let npc_config = scene.config.npc.clone();
        scene.npcs.take_hit(officer, 1.0, &npc_config, &sender);

        let near = PlayerView::at(scene.at(0.0, 6.0));
        scene.step(near, 0.1);
        assert_eq!(scene.state(officer), NpcState::Aggressive);

        let far = PlayerView::at(scene.at(0.0, scene.config.police.give_up_range + 10.0));
        scene.step(far, 0.1);
        assert_eq!(scene.state(officer), NpcState::Patrolling);
    }

    #[test]
    fn test_civilian_flees_notorious_player() {
        let mut scene = Scene::new();
        let person = scene.spawn(NpcType::Public, 3.0, 0.0);
        let mut player = PlayerView::at(scene.spawn);
        player.notoriety = scene.config.npc.flee_notoriety + 10.0;

        scene.step(player, 0.1);
        assert_eq!(scene.state(person), NpcState::Fleeing);
        let before = horizontal_distance(scene.npcs.get(person).unwrap().position(), scene.spawn);
        scene.step(player, 2.0);
        let after = horizontal_distance(scene.npcs.get(person).unwrap().position(), scene.spawn);
        assert!(after > before + 1.0, "{before} -> {after}");
    }

    #[test]
    fn test_knockout_and_recovery() {
        let mut scene = Scene::new();
        let person = scene.spawn(NpcType::Pensioner, 3.0, 0.0);
        let sender = scene.bus.sender();
        let npc_config = scene.config.npc.clone();

        let hit = scene.npcs.take_hit(person, 100.0, &npc_config, &sender).unwrap();
        assert!(hit.knocked_out);
        assert_eq!(scene.state(person), NpcState::KnockedOut);
        assert!(scene.bus.receiver().drain().contains(&GameEvent::NpcKnockedOut { id: person }));

        let again = scene.npcs.take_hit(person, 10.0, &npc_config, &sender).unwrap();
        assert!(again.was_unconscious);
        assert!(scene.npcs.mug(person));
        assert!(!scene.npcs.mug(person));

        let player = PlayerView::at(scene.at(0.0, 40.0));
        scene.step(player, npc_config.knockout_time + 0.5);
        assert!(scene.npcs.get(person).unwrap().is_conscious());
        assert!(scene.npcs.get(person).unwrap().health() > 0.0);
    }

    #[test]
    fn test_witnesses_exclude_gangs_and_the_unconscious() {
        let mut scene = Scene::new();
        let public = scene.spawn(NpcType::Public, 2.0, 0.0);
        scene.spawn(NpcType::YouthGang, -2.0, 0.0);
        let pensioner = scene.spawn(NpcType::Pensioner, 0.0, 2.0);
        scene.spawn(NpcType::Police, 100.0, 0.0);
        let npc_config = scene.config.npc.clone();
        scene.npcs.take_hit(pensioner, 100.0, &npc_config, &scene.bus.sender());

        assert_eq!(scene.npcs.witnesses(scene.spawn, 16.0), vec![public]);
    }

    #[test]
    fn test_alert_police_and_shopkeeper_shout() {
        let mut scene = Scene::new();
        let officer = scene.spawn(NpcType::Police, 5.0, 0.0);
        let sender = scene.bus.sender();
        let npc_config = scene.config.npc.clone();
        let spawn = scene.spawn;

        assert_eq!(scene.npcs.alert_police(spawn, 16.0, &npc_config, &sender), 1);
        assert_eq!(scene.state(officer), NpcState::Aggressive);

        assert!(!scene.npcs.shopkeeper_shout(LandmarkType::Greggs, &npc_config, &sender));
        let keeper = scene.npcs.spawn_shopkeeper(LandmarkType::Greggs, spawn, 3, &sender);
        assert!(scene.npcs.shopkeeper_shout(LandmarkType::Greggs, &npc_config, &sender));
        assert_eq!(scene.npcs.get(keeper).unwrap().speech().unwrap().text, lines::SHOPKEEPER_SHOUT);
    }

    #[test]
    fn test_gang_warns_when_wary_and_fights_when_hostile() {
        let mut scene = Scene::new();
        let youth = scene.spawn(NpcType::YouthGang, 2.0, 0.0);
        scene.npcs.get_mut(youth).unwrap().territory = Some(0);
        let player = PlayerView::at(scene.spawn);

        scene.step(player, 0.5);
        assert_ne!(scene.state(youth), NpcState::Warning);

        let gang = scene.config.gang.clone();
        let inside = scene.territories.get(0).unwrap().center;
        scene.territories.update(gang.warn_after + 0.5, inside, false, &gang);
        assert_eq!(scene.territories.hostility(0), Hostility::Wary);
        scene.step(player, 0.1);
        assert_eq!(scene.state(youth), NpcState::Warning);

        // Wearing the colours calms them down
        let mut tracksuit = player;
        tracksuit.disguise = Some(DisguiseKind::Tracksuit);
        scene.step(tracksuit, 0.1);
        assert_ne!(scene.state(youth), NpcState::Warning);

        scene.territories.provoke(0, &gang);
        let out = scene.step(player, 4.0);
        assert_eq!(scene.state(youth), NpcState::Aggressive);
        assert!(out.player_damage >= scene.config.npc.melee_damage);
    }

    #[test]
    fn test_hurt_youth_runs() {
        let mut scene = Scene::new();
        let youth = scene.spawn(NpcType::YouthGang, 2.0, 0.0);
        let npc_config = scene.config.npc.clone();
        let max = NpcType::YouthGang.max_health();
        scene.npcs.take_hit(youth, max * 0.8, &npc_config, &scene.bus.sender());
        scene.step(PlayerView::at(scene.spawn), 0.1);
        assert_eq!(scene.state(youth), NpcState::Fleeing);
    }

    #[test]
    fn test_builder_demolishes_player_blocks() {
        let mut scene = Scene::new();
        let builder = scene.spawn(NpcType::CouncilBuilder, 0.0, 0.0);
        let target = BlockPos::containing(scene.at(3.0, 0.0));
        scene.world.set_block(target, Block::placed(BlockType::Cardboard)).unwrap();

        // A hi-vis colleague is left alone
        let mut colleague = PlayerView::at(scene.at(-2.0, 0.0));
        colleague.disguise = Some(DisguiseKind::HiVis);
        let out = scene.step(colleague, 3.0);
        assert!(out.demolished.is_empty());
        assert!(scene.world.get_block(target).is_player_placed());

        let player = PlayerView::at(scene.at(-2.0, 0.0));
        let out = scene.step(player, 20.0);
        assert_eq!(out.demolished, vec![target]);
        assert!(scene.world.get_block(target).is_air());
        assert!(scene
            .bus
            .receiver()
            .drain()
            .contains(&GameEvent::BlockDemolished { npc: builder, pos: target }));
    }

    #[test]
    fn test_wanderers_stay_near_home() {
        let mut scene = Scene::new();
        let person = scene.spawn(NpcType::Public, 0.0, 0.0);
        let player = PlayerView::at(scene.at(0.0, 40.0));
        scene.step(player, 30.0);
        let npc = scene.npcs.get(person).unwrap();
        let radius = scene.config.npc.wander_radius;
        assert!(horizontal_distance(npc.position(), npc.home()) <= radius * 1.5 + 1.0);
        assert!(matches!(npc.state(), NpcState::Wandering | NpcState::Idle));
    }
}
