//! # Simulation
//!
//! [`Game`] owns the whole town and advances it one fixed step at a time.
//! Front ends (the headless runner, tests) talk to it through player
//! actions and read what happened from the event channel.
//!
//! ```text
//! Game::update(dt):
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. STREAM    world chunks around the player, NPCs and cars follow   │
//! │ 2. CLOCK     night, new day                                         │
//! │ 3. MOVE      walking body or the car being driven                   │
//! │ 4. SURVIVE   hunger, warmth, energy, health                         │
//! │ 5. TOWN      gangs, NPC brains, arrests, disguise scrutiny          │
//! │ 6. RESPAWN   dead players come back at the park                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every action either succeeds and emits events, or fails with a
//! [`GameError`] and leaves the town as it was.

use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use ragamuffin_economy::{
    Bet, Bookmaker, CraftResult, CraftingGraph, DisguiseKind, DropRoller, DropTables, Inventory, ItemStack,
    Material, RaceResult, RecipeBook, RecipeId, ShopCatalogue, Wallet,
};
use ragamuffin_world::{Aabb, BlockPos, LandmarkType, PropType, World, WorldSeed};
use tracing::{debug, info, warn};

use crate::clock::GameClock;
use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::events::{EventBus, EventReceiver, EventSender, GameEvent};
use crate::gameplay::disguise::DisguiseSystem;
use crate::gameplay::gang::GangTerritories;
use crate::gameplay::npc::{HitOutcome, NpcContext, NpcId, NpcManager, NpcType, PlayerView};
use crate::gameplay::police::{ArrestSystem, Crime, CrimeReport};
use crate::interaction::{find_npc_in_reach, find_prop_in_reach, BlockBreaker, BlockPlacer, BreakOutcome};
use crate::physics::{look_direction, raycast};
use crate::player::{DamageCause, Environment, Player};
use crate::shelter::ShelterDetector;
use crate::vehicle::{CarId, CarInput, VehicleManager};

/// Seconds between dying and waking up in the park.
pub const RESPAWN_DELAY: f32 = 5.0;

/// Player-built blocks this close make the police curious.
const NEAR_BUILT_RADIUS: i32 = 2;

/// Share of a car's crash damage the driver feels.
const CRASH_INJURY: f32 = 0.25;

/// Damage to a pedestrian per block per second of impact speed.
const PEDESTRIAN_DAMAGE: f32 = 4.0;

/// Cash in pence found on a mugging victim.
const MUGGING_CASH: std::ops::RangeInclusive<u64> = 50..=800;

const DROP_SALT: u64 = 0x4452_4f50;
const BOOKIES_SALT: u64 = 0x4245_5453;
const MUGGING_SALT: u64 = 0x4d55_4753;

/// What the player is trying to do on foot.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Stride {
    forward: f32,
    strafe: f32,
    sprint: bool,
}

impl Stride {
    fn is_moving(self) -> bool {
        self.forward != 0.0 || self.strafe != 0.0
    }
}

/// What a punch landed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PunchOutcome {
    /// A block.
    Block {
        /// Which block.
        pos: BlockPos,
        /// Whether it gave.
        outcome: BreakOutcome,
    },
    /// A street prop.
    Prop {
        /// What it was.
        kind: PropType,
        /// The punch finished it off.
        destroyed: bool,
    },
}

/// Result of punching an NPC.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NpcPunch {
    /// Who was hit.
    pub npc: NpcId,
    /// How it went for them.
    pub outcome: HitOutcome,
    /// Their pockets were emptied.
    pub mugged: bool,
}

/// The town, the player and everything that happens to them.
pub struct Game {
    config: GameConfig,
    world: World,
    player: Player,
    inventory: Inventory,
    wallet: Wallet,
    npcs: NpcManager,
    vehicles: VehicleManager,
    territories: GangTerritories,
    disguise: DisguiseSystem,
    arrests: ArrestSystem,
    breaker: BlockBreaker,
    shelter: ShelterDetector,
    clock: GameClock,
    shops: ShopCatalogue,
    bookies: Bookmaker,
    crafting: CraftingGraph,
    drop_tables: DropTables,
    drops: DropRoller,
    loot_rng: ChaCha8Rng,
    stride: Stride,
    car_input: CarInput,
    respawn_timer: f32,
    sender: EventSender,
    receiver: EventReceiver,
}

impl Game {
    /// Builds the town for `config` and puts the player in the spawn park.
    ///
    /// # Errors
    ///
    /// [`GameError::Config`] for invalid settings, or I/O and parse errors
    /// from custom drop tables and recipe books.
    pub fn new(config: GameConfig) -> GameResult<Self> {
        config.validate()?;

        let seed = WorldSeed::new(config.world.seed);
        let mut world = World::new(seed, config.world.streaming());
        let spawn = world.plan().spawn_point();
        world.ensure_loaded_around(spawn[0], spawn[2], 1);

        let drop_tables = match &config.economy.drop_tables {
            Some(path) => DropTables::from_toml_str(&std::fs::read_to_string(path)?)?,
            None => DropTables::default(),
        };
        let recipes = match &config.economy.recipes {
            Some(path) => RecipeBook::from_toml_str(&std::fs::read_to_string(path)?)?,
            None => RecipeBook::builtin(),
        };

        let bus = EventBus::default();
        let territories = GangTerritories::from_plan(world.plan(), &config.gang);
        let mut game = Self {
            player: Player::new(spawn, &config.player),
            inventory: Inventory::with_capacity(config.player.inventory_slots),
            wallet: Wallet::new(config.player.starting_money),
            npcs: NpcManager::new(config.npc.path_node_budget),
            vehicles: VehicleManager::new(),
            territories,
            disguise: DisguiseSystem::new(),
            arrests: ArrestSystem::new(),
            breaker: BlockBreaker::new(config.player.block_hit_timeout),
            shelter: ShelterDetector::default(),
            clock: GameClock::new(&config.clock),
            shops: ShopCatalogue::default(),
            bookies: Bookmaker::new(
                seed.derive(BOOKIES_SALT).value(),
                config.economy.min_stake,
                config.economy.max_stake,
            ),
            crafting: recipes.into_graph()?,
            drop_tables,
            drops: DropRoller::new(seed.derive(DROP_SALT).value()),
            loot_rng: ChaCha8Rng::seed_from_u64(seed.derive(MUGGING_SALT).value()),
            stride: Stride::default(),
            car_input: CarInput::default(),
            respawn_timer: 0.0,
            sender: bus.sender(),
            receiver: bus.receiver(),
            world,
            config,
        };
        game.stream_chunks();

        info!(
            seed = game.config.world.seed,
            chunks = game.world.loaded_chunk_count(),
            npcs = game.npcs.count(),
            cars = game.vehicles.count(),
            "town ready"
        );
        Ok(game)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The voxel town.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the voxel town.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The player.
    #[must_use]
    pub const fn player(&self) -> &Player {
        &self.player
    }

    /// Mutable access to the player.
    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    /// The player's pockets.
    #[must_use]
    pub const fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Mutable access to the player's pockets.
    pub fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    /// The player's money.
    #[must_use]
    pub const fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Townsfolk.
    #[must_use]
    pub const fn npcs(&self) -> &NpcManager {
        &self.npcs
    }

    /// Cars.
    #[must_use]
    pub const fn vehicles(&self) -> &VehicleManager {
        &self.vehicles
    }

    /// Gang territories.
    #[must_use]
    pub const fn territories(&self) -> &GangTerritories {
        &self.territories
    }

    /// What the player is wearing.
    #[must_use]
    pub const fn disguise(&self) -> &DisguiseSystem {
        &self.disguise
    }

    /// Arrest history and post-arrest cooldown.
    #[must_use]
    pub const fn arrests(&self) -> &ArrestSystem {
        &self.arrests
    }

    /// Time of day.
    #[must_use]
    pub const fn clock(&self) -> &GameClock {
        &self.clock
    }

    /// Recipes.
    #[must_use]
    pub const fn crafting(&self) -> &CraftingGraph {
        &self.crafting
    }

    /// Shop prices.
    #[must_use]
    pub const fn shops(&self) -> &ShopCatalogue {
        &self.shops
    }

    /// The bookies.
    #[must_use]
    pub const fn bookmaker(&self) -> &Bookmaker {
        &self.bookies
    }

    /// Car the player is driving.
    #[must_use]
    pub const fn driving(&self) -> Option<CarId> {
        self.vehicles.driving()
    }

    /// Landmark the player is standing in.
    #[must_use]
    pub fn current_landmark(&self) -> Option<LandmarkType> {
        self.world
            .plan()
            .landmark_at_point(self.player.position())
            .map(|l| l.kind)
    }

    /// Drains every event since the last call.
    #[must_use]
    pub fn events(&self) -> Vec<GameEvent> {
        self.receiver.drain()
    }

    /// A second handle on the event channel.
    #[must_use]
    pub fn event_receiver(&self) -> EventReceiver {
        self.receiver.clone()
    }

    // =========================================================================
    // Simulation step
    // =========================================================================

    /// Advances the town by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.breaker.tick(dt);
        self.arrests.tick(dt);

        let [x, _, z] = self.player.position();
        self.world.update(x, z);
        self.stream_chunks();

        let tick = self.clock.advance(dt);
        if tick.new_day {
            self.sender.send(GameEvent::NewDay { day: self.clock.day() });
        }
        if tick.nightfall {
            self.sender.send(GameEvent::NightFell { day: self.clock.day() });
        }

        if self.player.is_dead() {
            self.tick_respawn(dt);
        } else {
            self.move_body(dt);
            self.survive(dt);
        }

        self.update_town(dt);
        self.vehicles.update_parked(dt, &self.world, &self.config.vehicle);
    }

    fn stream_chunks(&mut self) {
        for coord in self.world.drain_unloaded() {
            self.npcs.despawn_chunk(coord, &self.sender);
            self.vehicles.despawn_chunk(coord);
        }
        for coord in self.world.drain_loaded() {
            self.npcs
                .spawn_for_chunk(&self.world, coord, &self.config, &self.territories, &self.sender);
            self.vehicles.spawn_for_chunk(&self.world, coord, &self.config.vehicle);
        }
    }

    fn move_body(&mut self, dt: f32) {
        if self.vehicles.driving().is_some() {
            self.drive_step(dt);
            return;
        }

        let cfg = &self.config.player;
        let stride = self.stride;
        let sprinting = stride.sprint && !self.player.stats.energy.is_empty();
        let speed = if sprinting { cfg.sprint_speed } else { cfg.walk_speed };

        let [fx, _, fz] = look_direction(self.player.yaw, 0.0);
        let (rx, rz) = (-fz, fx);
        let mut vx = fx * stride.forward + rx * stride.strafe;
        let mut vz = fz * stride.forward + rz * stride.strafe;
        let len = (vx * vx + vz * vz).sqrt();
        if len > 1.0 {
            vx /= len;
            vz /= len;
        }
        self.player.body.set_walk(vx * speed, vz * speed);

        let around = self.player.body.aabb();
        let area = Aabb::new(around.min.map(|v| v - 2.0), around.max.map(|v| v + 2.0));
        let obstacles: Vec<Aabb> = self
            .world
            .props_in(area)
            .map(|p| p.prop.aabb())
            .chain(self.vehicles.cars().iter().map(|c| c.aabb()))
            .filter(|b| b.intersects(&area))
            .collect();
        self.player.body.update(dt, &self.world, &obstacles);
    }

    fn drive_step(&mut self, dt: f32) {
        let pedestrians: Vec<(NpcId, Aabb)> = self.npcs.boxes().collect();
        let Some((car, step)) =
            self.vehicles
                .drive(dt, self.car_input, &self.world, &pedestrians, &self.config.vehicle)
        else {
            return;
        };

        if let Some(damage) = step.crash_damage {
            self.sender.send(GameEvent::CarCrashed { car, damage });
            self.hurt_player(damage * CRASH_INJURY, DamageCause::Crash);
        }
        for (npc, speed) in step.pedestrians {
            self.sender.send(GameEvent::PedestrianHit { car, npc, speed });
            self.npcs
                .take_hit(npc, speed * PEDESTRIAN_DAMAGE, &self.config.npc, &self.sender);
            let at = self.npcs.get(npc).map_or(self.player.position(), |n| n.position());
            self.commit_crime(Crime::DangerousDriving, at, None);
        }

        // A fatal crash has already thrown the player out
        if self.vehicles.driving() != Some(car) {
            return;
        }
        if let Some(seat) = self.vehicles.get(car).map(|c| c.position) {
            self.player.body.teleport(seat);
        }
    }

    fn survive(&mut self, dt: f32) {
        let feet = self.player.position();
        let driving = self.vehicles.driving().is_some();
        let env = Environment {
            sheltered: driving || self.shelter.is_sheltered(&self.world, feet),
            near_campfire: self
                .shelter
                .near_campfire(&self.world, feet, self.config.player.campfire_radius),
            night: self.clock.is_night(),
            moving: !driving && self.stride.is_moving(),
            sprinting: !driving && self.stride.is_moving() && self.stride.sprint,
        };

        let tick = self.player.update(dt, env, &self.config.player);
        if let Some((amount, cause)) = tick.damage {
            self.sender.send(GameEvent::PlayerDamaged { amount, cause });
            if tick.died {
                self.on_death(cause);
            }
        }
        self.player.decay_notoriety(dt, self.config.player.notoriety_decay);
    }

    fn update_town(&mut self, dt: f32) {
        let position = self.player.position();
        let tracksuit = self.disguise.is_wearing(DisguiseKind::Tracksuit);
        for change in self.territories.update(dt, position, tracksuit, &self.config.gang) {
            self.sender.send(GameEvent::GangHostilityChanged {
                territory: change.territory,
                from: change.from,
                to: change.to,
            });
        }

        let ctx = NpcContext {
            player: self.player_view(),
            territories: &self.territories,
            config: &self.config,
        };
        let out = self.npcs.update(dt, &mut self.world, &ctx, &self.sender);

        for pos in out.demolished {
            debug!(x = pos.x, y = pos.y, z = pos.z, "player build demolished");
        }
        if out.player_damage > 0.0 {
            self.hurt_player(out.player_damage, DamageCause::Assault);
        }
        if let Some(officer) = out.arrested_by {
            debug!(officer, "officer made the arrest");
            self.arrest();
        }

        if !self.player.is_dead() {
            let observers = self
                .npcs
                .observers(self.player.position(), self.config.disguise.scrutiny_range);
            if let Some(kind) = self.disguise.update(dt, observers, &self.config.disguise) {
                self.disguise_blown(kind);
            }
        }
    }

    fn player_view(&self) -> PlayerView {
        PlayerView {
            position: self.player.position(),
            eye: self.player.eye_position(),
            notoriety: self.player.notoriety(),
            disguise: self.disguise.worn(),
            near_player_built: near_player_built(&self.world, self.player.position()),
            police_cooldown: self.arrests.is_cooling_down(),
            dead: self.player.is_dead(),
        }
    }

    fn tick_respawn(&mut self, dt: f32) {
        self.respawn_timer -= dt;
        if self.respawn_timer > 0.0 {
            return;
        }
        let position = self.world.plan().spawn_point();
        self.world.ensure_loaded_around(position[0], position[2], 1);
        self.stream_chunks();
        self.player.respawn(position);
        info!(day = self.clock.day(), "player respawned");
        self.sender.send(GameEvent::PlayerRespawned { position });
    }

    // =========================================================================
    // Harm, crime and the law
    // =========================================================================

    fn hurt_player(&mut self, amount: f32, cause: DamageCause) {
        if self.player.is_dead() || amount <= 0.0 {
            return;
        }
        let died = self.player.damage(amount);
        self.sender.send(GameEvent::PlayerDamaged { amount, cause });
        if died {
            self.on_death(cause);
        }
    }

    fn on_death(&mut self, cause: DamageCause) {
        info!(?cause, "player died");
        self.get_out();
        self.stride = Stride::default();
        self.respawn_timer = RESPAWN_DELAY;
        self.sender.send(GameEvent::PlayerDied { cause });
    }

    fn get_out(&mut self) {
        if let Some((car, spot)) = self.vehicles.exit(&self.world) {
            self.player.body.teleport(spot);
            self.car_input = CarInput::default();
            self.sender.send(GameEvent::ExitedCar { car });
        }
    }

    fn commit_crime(&mut self, crime: Crime, at: [f32; 3], shop: Option<LandmarkType>) -> CrimeReport {
        let range = self.config.police.witness_range;
        let witnessed = !self.npcs.witnesses(at, range).is_empty();
        let report = self
            .arrests
            .report_crime(&mut self.player, crime, witnessed, self.disguise.worn(), &self.config.police);

        if witnessed {
            self.npcs.alert_police(at, range, &self.config.npc, &self.sender);
            if let Some(kind) = self.disguise.crime_penalty(&self.config.disguise) {
                self.disguise_blown(kind);
            }
        }
        if let Some(shop) = shop {
            self.npcs.shopkeeper_shout(shop, &self.config.npc, &self.sender);
        }

        self.sender.send(GameEvent::CrimeReported {
            crime,
            witnessed,
            notoriety: self.player.notoriety(),
        });
        report
    }

    fn disguise_blown(&mut self, kind: DisguiseKind) {
        self.player.add_notoriety(self.config.disguise.blown_notoriety);
        self.sender.send(GameEvent::DisguiseBlown { kind });
    }

    fn arrest(&mut self) {
        self.get_out();
        let station = self
            .world
            .plan()
            .landmark(LandmarkType::PoliceStation)
            .map_or_else(|| self.world.plan().spawn_point(), |l| l.entrance());
        self.world.ensure_loaded_around(station[0], station[2], 1);
        self.stream_chunks();

        let arrest = self.arrests.arrest(
            &mut self.player,
            &mut self.inventory,
            &mut self.wallet,
            &mut self.disguise,
            station,
            &self.config.police,
        );
        self.stride = Stride::default();
        self.npcs.finish_arrest(&self.sender);
        self.sender.send(GameEvent::PlayerArrested {
            fine: arrest.fine,
            confiscated: arrest.confiscated,
        });
    }

    // =========================================================================
    // Player actions
    // =========================================================================

    fn ensure_alive(&self) -> GameResult<()> {
        if self.player.is_dead() {
            Err(GameError::PlayerDead)
        } else {
            Ok(())
        }
    }

    fn tool_power(&self) -> u32 {
        self.inventory.selected().map_or(1, |s| s.material.tool_power())
    }

    /// Puts drops in the pockets. Whatever does not fit is left behind.
    fn pocket(&mut self, drops: Vec<ItemStack>) -> Vec<ItemStack> {
        drops
            .into_iter()
            .filter(|stack| match self.inventory.add(stack.material, stack.count) {
                Ok(()) => true,
                Err(err) => {
                    warn!(item = stack.material.name(), count = stack.count, %err, "pockets full");
                    false
                }
            })
            .collect()
    }

    /// Turns to face `yaw` (degrees, 0 faces -Z) and `pitch`.
    pub fn look(&mut self, yaw: f32, pitch: f32) {
        self.player.set_look(yaw, pitch);
    }

    /// Picks a hotbar slot.
    pub fn select_hotbar(&mut self, index: usize) {
        self.inventory.select_hotbar(index);
    }

    /// Walks relative to the facing direction. `forward` and `strafe` run
    /// `-1.0..=1.0`; the intent holds until changed.
    ///
    /// # Errors
    ///
    /// [`GameError::PlayerDead`].
    pub fn move_player(&mut self, forward: f32, strafe: f32, sprint: bool) -> GameResult<()> {
        self.ensure_alive()?;
        self.stride = Stride {
            forward: forward.clamp(-1.0, 1.0),
            strafe: strafe.clamp(-1.0, 1.0),
            sprint,
        };
        Ok(())
    }

    /// Jumps. Returns whether the player left the ground.
    ///
    /// # Errors
    ///
    /// [`GameError::PlayerDead`].
    pub fn jump(&mut self) -> GameResult<bool> {
        self.ensure_alive()?;
        if self.vehicles.driving().is_some() {
            return Ok(false);
        }
        Ok(self.player.body.jump(self.config.player.jump_velocity))
    }

    /// Punches whatever block or prop is in front of the player.
    ///
    /// Broken blocks and smashed props drop into the pockets. Damaging a
    /// landmark is criminal damage.
    ///
    /// # Errors
    ///
    /// [`GameError::NothingInReach`], [`GameError::PlayerDead`], or a world
    /// error for unbreakable blocks.
    pub fn punch_block(&mut self) -> GameResult<PunchOutcome> {
        self.ensure_alive()?;
        let eye = self.player.eye_position();
        let dir = self.player.look_direction();
        let reach = self.config.player.reach;

        let hit = raycast(eye, dir, reach, &self.world);
        let prop = find_prop_in_reach(&self.world, eye, dir, reach);
        let power = self.tool_power();

        if let Some((id, distance)) = prop {
            if hit.map_or(true, |h| distance < h.distance) {
                let prop_hit = self.world.damage_prop(id, power).ok_or(GameError::NothingInReach)?;
                if prop_hit.destroyed {
                    let rolled = self.drops.roll_prop(&self.drop_tables, prop_hit.kind);
                    let drops = self.pocket(rolled);
                    self.sender.send(GameEvent::PropDestroyed {
                        kind: prop_hit.kind,
                        drops,
                    });
                }
                return Ok(PunchOutcome::Prop {
                    kind: prop_hit.kind,
                    destroyed: prop_hit.destroyed,
                });
            }
        }

        let hit = hit.ok_or(GameError::NothingInReach)?;
        let pos = hit.voxel;
        let outcome = self.breaker.hit(&mut self.world, pos, power)?;
        if let BreakOutcome::Broken(block) = outcome {
            // Player-built walls are nobody's property
            let landmark = self
                .world
                .plan()
                .landmark_at(pos)
                .map(|l| l.kind)
                .filter(|_| !block.is_player_placed());
            let rolled = self.drops.roll_block(&self.drop_tables, block.kind(), landmark);
            let drops = self.pocket(rolled);
            self.sender.send(GameEvent::BlockBroken {
                pos,
                block: block.kind(),
                drops,
            });
            if let Some(kind) = landmark {
                self.commit_crime(Crime::ShopDamage, pos.center(), kind.is_shop().then_some(kind));
            }
        }
        Ok(PunchOutcome::Block { pos, outcome })
    }

    /// Places the selected item against the face in front of the player.
    ///
    /// # Errors
    ///
    /// [`GameError::NothingSelected`], [`GameError::NotPlaceable`],
    /// [`GameError::NothingInReach`], or the placement rejections of
    /// [`BlockPlacer::place`].
    pub fn place_block(&mut self) -> GameResult<BlockPos> {
        self.ensure_alive()?;
        let material = self.inventory.selected().ok_or(GameError::NothingSelected)?.material;
        let kind = material.placeable_block().ok_or(GameError::NotPlaceable(material))?;
        let hit = raycast(
            self.player.eye_position(),
            self.player.look_direction(),
            self.config.player.reach,
            &self.world,
        )
        .ok_or(GameError::NothingInReach)?;

        let blockers: Vec<Aabb> = std::iter::once(self.player.body.aabb())
            .chain(self.npcs.boxes().map(|(_, b)| b))
            .chain(self.vehicles.cars().iter().map(|c| c.aabb()))
            .collect();
        let pos = BlockPlacer::place(&mut self.world, &hit, kind, &blockers)?;
        self.inventory.take_selected();
        self.sender.send(GameEvent::BlockPlaced { pos, block: kind });
        Ok(pos)
    }

    /// Punches the NPC in front of the player. Hitting someone already out
    /// cold goes through their pockets instead.
    ///
    /// # Errors
    ///
    /// [`GameError::NothingInReach`] or [`GameError::PlayerDead`].
    pub fn punch_npc(&mut self) -> GameResult<NpcPunch> {
        self.ensure_alive()?;
        let npc = find_npc_in_reach(
            &self.world,
            self.player.eye_position(),
            self.player.look_direction(),
            self.config.player.reach,
            self.npcs.boxes(),
        )
        .ok_or(GameError::NothingInReach)?;

        let damage = self.config.player.punch_damage * self.tool_power() as f32;
        let outcome = self
            .npcs
            .take_hit(npc, damage, &self.config.npc, &self.sender)
            .ok_or(GameError::NothingInReach)?;
        let at = self.npcs.get(npc).map_or(self.player.position(), |n| n.position());

        let mut mugged = false;
        if outcome.was_unconscious {
            if self.npcs.mug(npc) {
                mugged = true;
                let cash = self.loot_rng.gen_range(MUGGING_CASH);
                self.wallet.deposit(cash);
                self.pocket(vec![ItemStack::new(Material::StolenPhone, 1)]);
                self.commit_crime(Crime::Theft, at, None);
            }
        } else {
            let crime = if outcome.kind == NpcType::Police {
                Crime::AssaultOnOfficer
            } else {
                Crime::Assault
            };
            if let Some(change) = outcome
                .territory
                .and_then(|t| self.territories.provoke(t, &self.config.gang))
            {
                self.sender.send(GameEvent::GangHostilityChanged {
                    territory: change.territory,
                    from: change.from,
                    to: change.to,
                });
            }
            self.commit_crime(crime, at, None);
        }

        Ok(NpcPunch { npc, outcome, mugged })
    }

    /// Crafts a recipe from the pockets.
    ///
    /// # Errors
    ///
    /// [`GameError::PlayerDead`], or economy errors for unknown recipes,
    /// missing inputs or full pockets.
    pub fn craft(&mut self, recipe: RecipeId) -> GameResult<CraftResult> {
        self.ensure_alive()?;
        let result = self.crafting.craft(&mut self.inventory, recipe)?;
        self.sender.send(GameEvent::Crafted { recipe });
        Ok(result)
    }

    /// Eats the selected item. Returns what was eaten.
    ///
    /// # Errors
    ///
    /// [`GameError::NothingSelected`], [`GameError::NotEdible`] or
    /// [`GameError::PlayerDead`].
    pub fn eat_selected(&mut self) -> GameResult<Material> {
        self.ensure_alive()?;
        let food = self.inventory.selected().ok_or(GameError::NothingSelected)?.material;
        let value = food.food_value().ok_or(GameError::NotEdible(food))?;
        self.inventory.take_selected();
        self.player.eat(value);
        self.sender.send(GameEvent::Ate { food });
        Ok(food)
    }

    /// Puts on clothing from the pockets.
    ///
    /// # Errors
    ///
    /// As [`DisguiseSystem::equip`].
    pub fn equip_disguise(&mut self, material: Material) -> GameResult<DisguiseKind> {
        self.ensure_alive()?;
        let kind = material.disguise().ok_or(GameError::NotWearable(material))?;
        if let Some(previous) = self.disguise.equip(&mut self.inventory, material)? {
            self.sender.send(GameEvent::DisguiseRemoved { kind: previous });
        }
        self.sender.send(GameEvent::DisguiseEquipped { kind });
        Ok(kind)
    }

    /// Takes the disguise off.
    ///
    /// # Errors
    ///
    /// As [`DisguiseSystem::remove`].
    pub fn remove_disguise(&mut self) -> GameResult<DisguiseKind> {
        let kind = self.disguise.remove(&mut self.inventory)?;
        self.sender.send(GameEvent::DisguiseRemoved { kind });
        Ok(kind)
    }

    fn shop_here(&self) -> GameResult<LandmarkType> {
        self.current_landmark()
            .filter(|&kind| self.shops.stock(kind).is_some())
            .ok_or(GameError::NotInShop)
    }

    fn at_bookies(&self) -> GameResult<()> {
        match self.current_landmark() {
            Some(LandmarkType::Bookies) => Ok(()),
            _ => Err(GameError::NotAtBookies),
        }
    }

    /// Buys from the shop the player is standing in. Returns pence paid.
    ///
    /// # Errors
    ///
    /// [`GameError::NotInShop`] or the shop's refusal.
    pub fn buy(&mut self, material: Material, quantity: u32) -> GameResult<u64> {
        let shop = self.shop_here()?;
        let total = self
            .shops
            .buy(&mut self.wallet, &mut self.inventory, shop, material, quantity)?;
        self.sender.send(GameEvent::Purchased {
            shop,
            material,
            quantity,
            total,
        });
        Ok(total)
    }

    /// Sells to the shop the player is standing in. Returns pence received.
    ///
    /// # Errors
    ///
    /// [`GameError::NotInShop`] or the shop's refusal.
    pub fn sell(&mut self, material: Material, quantity: u32) -> GameResult<u64> {
        let shop = self.shop_here()?;
        let total = self
            .shops
            .sell(&mut self.wallet, &mut self.inventory, shop, material, quantity)?;
        self.sender.send(GameEvent::Sold {
            shop,
            material,
            quantity,
            total,
        });
        Ok(total)
    }

    /// Backs a runner in the current race.
    ///
    /// # Errors
    ///
    /// [`GameError::NotAtBookies`] or the bookmaker's refusal.
    pub fn place_bet(&mut self, runner: usize, stake: u64) -> GameResult<Bet> {
        self.at_bookies()?;
        let bet = self.bookies.place_bet(&mut self.wallet, runner, stake)?;
        let name = self
            .bookies
            .current_race()
            .runners
            .get(bet.runner)
            .map_or("", |r| r.name);
        self.sender.send(GameEvent::BetPlaced {
            race_id: bet.race_id,
            runner: name,
            stake: bet.stake,
        });
        Ok(bet)
    }

    /// Runs the current race and pays out.
    ///
    /// # Errors
    ///
    /// [`GameError::NotAtBookies`].
    pub fn settle_race(&mut self) -> GameResult<RaceResult> {
        self.at_bookies()?;
        let result = self.bookies.settle(&mut self.wallet);
        self.sender.send(GameEvent::RaceSettled {
            race_id: result.race_id,
            winner: result.winner_name,
            payout: result.payout,
        });
        Ok(result)
    }

    /// Gets into the nearest car within reach.
    ///
    /// # Errors
    ///
    /// [`GameError::NoCarInReach`] or [`GameError::PlayerDead`].
    pub fn enter_car(&mut self) -> GameResult<CarId> {
        self.ensure_alive()?;
        if let Some(car) = self.vehicles.driving() {
            return Ok(car);
        }
        let car = self
            .vehicles
            .enter(self.player.position(), self.config.vehicle.enter_reach)
            .ok_or(GameError::NoCarInReach)?;
        if let Some(seat) = self.vehicles.get(car).map(|c| c.position) {
            self.player.body.teleport(seat);
        }
        self.stride = Stride::default();
        self.car_input = CarInput::default();
        self.sender.send(GameEvent::EnteredCar { car });
        Ok(car)
    }

    /// Gets out of the car.
    ///
    /// # Errors
    ///
    /// [`GameError::NotDriving`].
    pub fn exit_car(&mut self) -> GameResult<CarId> {
        let (car, spot) = self.vehicles.exit(&self.world).ok_or(GameError::NotDriving)?;
        self.player.body.teleport(spot);
        self.car_input = CarInput::default();
        self.sender.send(GameEvent::ExitedCar { car });
        Ok(car)
    }

    /// Sets the pedals and wheel. The input holds until changed.
    ///
    /// # Errors
    ///
    /// [`GameError::NotDriving`].
    pub fn drive(&mut self, input: CarInput) -> GameResult<()> {
        if self.vehicles.driving().is_none() {
            return Err(GameError::NotDriving);
        }
        self.car_input = CarInput {
            throttle: input.throttle.clamp(-1.0, 1.0),
            steer: input.steer.clamp(-1.0, 1.0),
            brake: input.brake,
        };
        Ok(())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Writes every block the player changed and every prop they smashed.
    ///
    /// # Errors
    ///
    /// I/O failures.
    pub fn save(&self, path: &Path) -> GameResult<()> {
        self.world.save_modifications(path)?;
        Ok(())
    }

    /// Restores changes written by [`Game::save`] for the same seed.
    ///
    /// # Errors
    ///
    /// I/O failures, corrupt saves, or a save from another town.
    pub fn load(&mut self, path: &Path) -> GameResult<()> {
        self.world.load_modifications(path)?;
        self.breaker.clear();
        Ok(())
    }
}

/// Whether a player-placed block is within reach of `feet`.
fn near_player_built(world: &World, feet: [f32; 3]) -> bool {
    let base = BlockPos::containing(feet);
    let r = NEAR_BUILT_RADIUS;
    (-r..=r).any(|dx| {
        (-1..=r).any(|dy| (-r..=r).any(|dz| world.get_block(base.offset(dx, dy, dz)).is_player_placed()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragamuffin_world::{Block, BlockType};

    use crate::gameplay::npc::NpcState;

    const DT: f32 = 1.0 / 30.0;

    fn game() -> Game {
        Game::new(GameConfig::default().with_seed(42)).unwrap()
    }

    /// Puts a wall block at eye height 1.5 blocks east of the player and
    /// faces it.
    fn face_wall(game: &mut Game, block: BlockType) -> BlockPos {
        let [x, y, z] = game.player.position();
        let wall = BlockPos::new(x.floor() as i32 + 2, y as i32 + 1, z.floor() as i32);
        game.world.set_block(wall, Block::of(block)).unwrap();
        game.look(90.0, 0.0);
        wall
    }

    fn step(game: &mut Game, seconds: f32) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for _ in 0..(seconds / DT) as usize {
            game.update(DT);
            events.extend(game.events());
        }
        events
    }

    #[test]
    fn test_new_game_starts_in_the_park() {
        let game = game();
        let spawn = game.world.plan().spawn_point();
        assert_eq!(game.player.position(), spawn);
        assert!(game.world.loaded_chunk_count() >= 9);
        assert_eq!(game.wallet.balance(), game.config.player.starting_money);
        assert_eq!(game.current_landmark(), None);
        assert!(game.driving().is_none());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = GameConfig::default();
        config.world.load_radius = 0;
        assert!(matches!(Game::new(config), Err(GameError::Config(_))));
    }

    #[test]
    fn test_player_settles_on_the_ground() {
        let mut game = game();
        step(&mut game, 1.0);
        assert!(game.player.body.on_ground);
        assert!((game.player.position()[1] - 5.0).abs() < 1e-3);
        assert!(game.jump().unwrap());
    }

    #[test]
    fn test_walking_moves_the_player() {
        let mut game = game();
        game.look(90.0, 0.0);
        let start = game.player.position();
        game.move_player(1.0, 0.0, false).unwrap();
        step(&mut game, 0.5);
        assert!(game.player.position()[0] > start[0] + 1.0);
        assert!((game.player.position()[2] - start[2]).abs() < 0.1);
    }

    #[test]
    fn test_punching_breaks_a_block() {
        let mut game = game();
        let wall = face_wall(&mut game, BlockType::Brick);

        let mut broken = false;
        for _ in 0..BlockType::Brick.hits_to_break() {
            match game.punch_block().unwrap() {
                PunchOutcome::Block { pos, outcome } => {
                    assert_eq!(pos, wall);
                    if matches!(outcome, BreakOutcome::Broken(_)) {
                        broken = true;
                        break;
                    }
                }
                PunchOutcome::Prop { .. } => panic!("hit a prop"),
            }
        }
        assert!(broken);
        assert!(game.world.get_block(wall).is_air());
        assert!(game
            .events()
            .iter()
            .any(|e| matches!(e, GameEvent::BlockBroken { pos, block: BlockType::Brick, .. } if *pos == wall)));
    }

    #[test]
    fn test_punching_air_is_out_of_reach() {
        let mut game = game();
        game.look(0.0, 89.0);
        assert!(matches!(game.punch_block(), Err(GameError::NothingInReach)));
    }

    #[test]
    fn test_place_block_from_hotbar() {
        let mut game = game();
        let wall = face_wall(&mut game, BlockType::Stone);
        game.inventory.add(Material::Brick, 2).unwrap();
        game.select_hotbar(0);

        let pos = game.place_block().unwrap();
        assert_eq!(pos, wall.offset(-1, 0, 0));
        assert!(game.world.get_block(pos).is_player_placed());
        assert_eq!(game.inventory.count(Material::Brick), 1);
        assert!(game
            .events()
            .contains(&GameEvent::BlockPlaced { pos, block: BlockType::Brick }));

        // Occupied now
        assert!(matches!(game.place_block(), Err(GameError::InvalidPlacement(_))));
    }

    #[test]
    fn test_place_requires_a_placeable_selection() {
        let mut game = game();
        face_wall(&mut game, BlockType::Stone);
        assert!(matches!(game.place_block(), Err(GameError::NothingSelected)));

        game.inventory.add(Material::SausageRoll, 1).unwrap();
        game.select_hotbar(0);
        assert!(matches!(
            game.place_block(),
            Err(GameError::NotPlaceable(Material::SausageRoll))
        ));
    }

    #[test]
    fn test_eating_restores_hunger() {
        let mut game = game();
        game.player.stats.hunger.set(10.0);
        game.inventory.add(Material::SausageRoll, 1).unwrap();
        game.select_hotbar(0);

        assert_eq!(game.eat_selected().unwrap(), Material::SausageRoll);
        assert!(game.player.stats.hunger.value() > 10.0);
        assert_eq!(game.inventory.count(Material::SausageRoll), 0);
        assert!(game.events().contains(&GameEvent::Ate { food: Material::SausageRoll }));

        game.inventory.add(Material::Brick, 1).unwrap();
        assert!(matches!(game.eat_selected(), Err(GameError::NotEdible(Material::Brick))));
    }

    #[test]
    fn test_disguise_swap_emits_events() {
        let mut game = game();
        game.inventory.add(Material::HiVis, 1).unwrap();
        game.inventory.add(Material::Tracksuit, 1).unwrap();

        assert_eq!(game.equip_disguise(Material::HiVis).unwrap(), DisguiseKind::HiVis);
        assert_eq!(game.equip_disguise(Material::Tracksuit).unwrap(), DisguiseKind::Tracksuit);
        assert_eq!(game.remove_disguise().unwrap(), DisguiseKind::Tracksuit);

        let events = game.events();
        assert!(events.contains(&GameEvent::DisguiseEquipped { kind: DisguiseKind::HiVis }));
        assert!(events.contains(&GameEvent::DisguiseRemoved { kind: DisguiseKind::HiVis }));
        assert!(events.contains(&GameEvent::DisguiseRemoved { kind: DisguiseKind::Tracksuit }));
        assert_eq!(game.inventory.count(Material::HiVis), 1);
    }

    #[test]
    fn test_trading_needs_a_shop() {
        let mut game = game();
        assert!(matches!(game.buy(Material::SausageRoll, 1), Err(GameError::NotInShop)));

        let greggs = game.world.plan().landmark(LandmarkType::Greggs).unwrap().interior();
        game.player.body.teleport(greggs);
        assert_eq!(game.current_landmark(), Some(LandmarkType::Greggs));

        let before = game.wallet.balance();
        let paid = game.buy(Material::SausageRoll, 2).unwrap();
        assert_eq!(game.wallet.balance(), before - paid);
        assert_eq!(game.inventory.count(Material::SausageRoll), 2);
        assert!(game.sell(Material::SausageRoll, 1).is_err());
    }

    #[test]
    fn test_betting_at_the_bookies() {
        let mut game = game();
        assert!(matches!(game.place_bet(0, 100), Err(GameError::NotAtBookies)));

        let bookies = game.world.plan().landmark(LandmarkType::Bookies).unwrap().interior();
        game.player.body.teleport(bookies);

        let before = game.wallet.balance();
        let bet = game.place_bet(0, 100).unwrap();
        assert_eq!(game.wallet.balance(), before - 100);

        let result = game.settle_race().unwrap();
        assert_eq!(result.race_id, bet.race_id);
        assert_eq!(game.wallet.balance(), before - 100 + result.payout);

        let events = game.events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::BetPlaced { stake: 100, .. })));
        assert!(events.iter().any(|e| matches!(e, GameEvent::RaceSettled { .. })));
    }

    #[test]
    fn test_assault_is_witnessed_by_the_victim() {
        let mut game = game();
        let [x, y, z] = game.player.position();
        let victim = game.npcs.spawn(NpcType::Public, [x + 1.2, y, z], 3, &game.sender);
        game.look(90.0, 0.0);

        let punch = game.punch_npc().unwrap();
        assert_eq!(punch.npc, victim);
        assert!(!punch.mugged);
        assert_eq!(game.player.record().count(Crime::Assault), 1);
        assert!(game.player.notoriety() > 0.0);
        assert!(game.events().iter().any(|e| matches!(
            e,
            GameEvent::CrimeReported { crime: Crime::Assault, witnessed: true, .. }
        )));
    }

    #[test]
    fn test_knocked_out_victim_gets_mugged() {
        let mut game = game();
        let [x, y, z] = game.player.position();
        let victim = game.npcs.spawn(NpcType::Pensioner, [x + 1.2, y, z], 3, &game.sender);
        game.look(90.0, 0.0);

        let mut punch = game.punch_npc().unwrap();
        while !punch.outcome.knocked_out {
            punch = game.punch_npc().unwrap();
        }
        assert_eq!(game.npcs.get(victim).unwrap().state(), NpcState::KnockedOut);

        let before = game.wallet.balance();
        let punch = game.punch_npc().unwrap();
        assert!(punch.mugged);
        assert!(game.wallet.balance() > before);
        assert_eq!(game.inventory.count(Material::StolenPhone), 1);
        assert!(!game.punch_npc().unwrap().mugged);
    }

    #[test]
    fn test_police_arrest_a_wanted_player() {
        let mut game = game();
        step(&mut game, 0.5);
        game.player.add_notoriety(80.0);
        game.wallet.deposit(10_000);
        game.inventory.add(Material::GoldRing, 1).unwrap();
        let [x, y, z] = game.player.position();
        game.npcs.spawn(NpcType::Police, [x + 1.0, y, z], 9, &game.sender);

        let mut arrested = None;
        for _ in 0..300 {
            game.update(DT);
            arrested = game.events().into_iter().find_map(|e| match e {
                GameEvent::PlayerArrested { fine, confiscated } => Some((fine, confiscated)),
                _ => None,
            });
            if arrested.is_some() {
                break;
            }
        }

        let (fine, confiscated) = arrested.expect("no arrest");
        assert!(fine > 0);
        assert!(confiscated.iter().any(|s| s.material == Material::GoldRing));
        assert_eq!(game.player.notoriety(), 0.0);
        assert!(game.arrests.is_cooling_down());
        let station = game.world.plan().landmark(LandmarkType::PoliceStation).unwrap();
        assert_eq!(game.player.position(), station.entrance());
    }

    #[test]
    fn test_death_and_respawn() {
        let mut game = game();
        game.player.body.teleport([100.0, 5.0, 100.0]);
        game.hurt_player(1_000.0, DamageCause::Assault);
        assert!(game.player.is_dead());
        assert!(matches!(game.move_player(1.0, 0.0, false), Err(GameError::PlayerDead)));

        let events = step(&mut game, RESPAWN_DELAY + 0.5);
        assert!(!game.player.is_dead());
        let spawn = game.world.plan().spawn_point();
        assert!((game.player.position()[0] - spawn[0]).abs() < 1e-3);
        assert!(events.contains(&GameEvent::PlayerRespawned { position: spawn }));
    }

    #[test]
    fn test_starving_to_death_is_reported_once() {
        let mut game = game();
        game.player.stats.hunger.set(0.0);
        game.player.stats.health.set(0.01);

        let events = step(&mut game, 1.0);
        assert!(game.player.is_dead());
        let deaths: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, GameEvent::PlayerDied { .. }))
            .collect();
        assert_eq!(deaths, [&GameEvent::PlayerDied { cause: DamageCause::Starvation }]);
    }

    #[test]
    fn test_the_dead_cannot_craft() {
        let mut game = game();
        game.inventory.add(Material::Wood, 1).unwrap();
        game.hurt_player(1_000.0, DamageCause::Assault);

        assert!(matches!(game.craft(RecipeBook::PLANKS), Err(GameError::PlayerDead)));
        assert_eq!(game.inventory.count(Material::Wood), 1);
        assert!(!game.events().iter().any(|e| matches!(e, GameEvent::Crafted { .. })));
    }

    #[test]
    fn test_driving_a_car() {
        let mut game = game();
        let [x, y, z] = game.player.position();
        let car = game.vehicles.spawn([x + 2.0, y, z], 90.0, &game.config.vehicle);
        assert!(matches!(game.drive(CarInput::default()), Err(GameError::NotDriving)));

        assert_eq!(game.enter_car().unwrap(), car);
        game.drive(CarInput { throttle: 1.0, steer: 0.0, brake: false }).unwrap();
        step(&mut game, 0.5);
        let seat = game.vehicles.get(car).unwrap().position;
        assert!(seat[0] > x + 2.0);
        assert_eq!(game.player.position(), seat);

        assert_eq!(game.exit_car().unwrap(), car);
        assert!(matches!(game.exit_car(), Err(GameError::NotDriving)));
        let events = game.events();
        assert!(events.contains(&GameEvent::EnteredCar { car }));
        assert!(events.contains(&GameEvent::ExitedCar { car }));
    }

    #[test]
    fn test_no_car_in_reach() {
        let mut game = game();
        game.vehicles = VehicleManager::new();
        assert!(matches!(game.enter_car(), Err(GameError::NoCarInReach)));
    }

    #[test]
    fn test_save_and_load_round_trip_player_builds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("town.rgm");

        let mut game = game();
        let wall = face_wall(&mut game, BlockType::Stone);
        game.inventory.add(Material::Brick, 1).unwrap();
        let placed = game.place_block().unwrap();
        game.save(&path).unwrap();

        let mut fresh = Game::new(GameConfig::default().with_seed(42)).unwrap();
        assert!(fresh.world.get_block(placed).is_air());
        fresh.load(&path).unwrap();
        assert_eq!(fresh.world.block_type(placed), BlockType::Brick);
        assert_eq!(fresh.world.block_type(wall), BlockType::Stone);
        assert!(!fresh.world.get_block(wall).is_player_placed());

        let mut other = Game::new(GameConfig::default().with_seed(43)).unwrap();
        assert!(other.load(&path).is_err());
    }

    #[test]
    fn test_clock_reports_nightfall() {
        let mut config = GameConfig::default().with_seed(42);
        config.clock.start_hour = 19.9;
        config.clock.day_length_seconds = 24.0;
        let mut game = Game::new(config).unwrap();

        let events = step(&mut game, 1.0);
        assert!(events.contains(&GameEvent::NightFell { day: 1 }));
        assert!(game.clock.is_night());
    }
}
