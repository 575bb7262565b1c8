//! # Game Configuration
//!
//! Every gameplay number lives here. A config file only needs the values it
//! wants to change; everything else falls back to the defaults below.
//!
//! ```toml
//! [world]
//! seed = 1234
//!
//! [police]
//! warn_notoriety = 10.0
//!
//! [gang]
//! hostile_after = 15.0
//! ```

use std::path::{Path, PathBuf};

use ragamuffin_world::WorldConfig;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, GameResult};

/// World seed and streaming.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSection {
    /// Seed for the town layout and everything rolled from it.
    pub seed: u64,
    /// Chunks within this radius of the player are loaded.
    pub load_radius: i32,
    /// Chunks beyond this radius are unloaded.
    pub unload_radius: i32,
    /// Chunks generated per update.
    pub max_generate_per_update: usize,
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            seed: 0x5241_4741,
            load_radius: 4,
            unload_radius: 6,
            max_generate_per_update: 4,
        }
    }
}

impl WorldSection {
    /// Streaming parameters for the world.
    #[must_use]
    pub const fn streaming(&self) -> WorldConfig {
        WorldConfig {
            load_radius: self.load_radius,
            unload_radius: self.unload_radius,
            max_generate_per_update: self.max_generate_per_update,
        }
    }
}

/// Survival stats, movement and reach.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSection {
    /// Maximum health.
    pub max_health: f32,
    /// Maximum hunger (full stomach).
    pub max_hunger: f32,
    /// Maximum warmth.
    pub max_warmth: f32,
    /// Maximum energy.
    pub max_energy: f32,
    /// Walking speed in blocks per second.
    pub walk_speed: f32,
    /// Sprinting speed in blocks per second.
    pub sprint_speed: f32,
    /// Upward speed of a jump.
    pub jump_velocity: f32,
    /// Reach for punching, placing and talking.
    pub reach: f32,
    /// Hunger lost per second.
    pub hunger_drain: f32,
    /// Energy lost per second while walking.
    pub energy_drain: f32,
    /// Energy lost per second while sprinting.
    pub sprint_energy_drain: f32,
    /// Energy regained per second while standing still.
    pub energy_regen: f32,
    /// Warmth lost per second outdoors by day.
    pub warmth_drain: f32,
    /// Warmth lost per second outdoors at night.
    pub night_warmth_drain: f32,
    /// Warmth regained per second when sheltered or by a fire.
    pub warmth_regen: f32,
    /// Health lost per second with an empty stomach.
    pub starvation_damage: f32,
    /// Health lost per second when frozen.
    pub cold_damage: f32,
    /// Health regained per second when fed and warm.
    pub health_regen: f32,
    /// Notoriety lost per second.
    pub notoriety_decay: f32,
    /// Damage of a bare-handed punch on an NPC.
    pub punch_damage: f32,
    /// Inventory slots.
    pub inventory_slots: usize,
    /// Money in pence at the start.
    pub starting_money: u64,
    /// Seconds before a hit counter on a block is forgotten.
    pub block_hit_timeout: f32,
    /// Radius in blocks that counts as "by the fire".
    pub campfire_radius: i32,
}

impl Default for PlayerSection {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            max_hunger: 100.0,
            max_warmth: 100.0,
            max_energy: 100.0,
            walk_speed: 4.3,
            sprint_speed: 6.5,
            jump_velocity: 9.0,
            reach: 5.0,
            hunger_drain: 0.2,
            energy_drain: 0.15,
            sprint_energy_drain: 1.2,
            energy_regen: 2.0,
            warmth_drain: 0.15,
            night_warmth_drain: 0.5,
            warmth_regen: 2.5,
            starvation_damage: 1.0,
            cold_damage: 1.5,
            health_regen: 0.5,
            notoriety_decay: 0.1,
            punch_damage: 10.0,
            inventory_slots: 36,
            starting_money: 500,
            block_hit_timeout: 5.0,
            campfire_radius: 4,
        }
    }
}

/// Spawning and the shared parts of NPC behaviour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcSection {
    /// Chance a loaded street chunk gets passers-by.
    pub spawn_chance: f32,
    /// Most passers-by spawned per chunk.
    pub max_per_chunk: u32,
    /// How far civilians and gangs notice the player.
    pub detection_range: f32,
    /// How far wanderers stray from home.
    pub wander_radius: f32,
    /// Seconds between path recalculations.
    pub repath_interval: f32,
    /// A* node budget per search.
    pub path_node_budget: usize,
    /// Seconds a speech bubble stays up.
    pub speech_duration: f32,
    /// Seconds a knocked-out NPC stays down.
    pub knockout_time: f32,
    /// Notoriety at which civilians run from the player.
    pub flee_notoriety: f32,
    /// Reach of an NPC punch.
    pub melee_range: f32,
    /// Damage of an NPC punch.
    pub melee_damage: f32,
    /// Seconds between NPC punches.
    pub melee_cooldown: f32,
    /// Seconds a council builder spends taking down one block.
    pub demolish_interval: f32,
}

impl Default for NpcSection {
    fn default() -> Self {
        Self {
            spawn_chance: 0.35,
            max_per_chunk: 2,
            detection_range: 12.0,
            wander_radius: 8.0,
            repath_interval: 1.0,
            path_node_budget: 2000,
            speech_duration: 3.0,
            knockout_time: 10.0,
            flee_notoriety: 30.0,
            melee_range: 1.6,
            melee_damage: 8.0,
            melee_cooldown: 1.2,
            demolish_interval: 4.0,
        }
    }
}

/// Police behaviour and the arrest system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoliceSection {
    /// How far an officer notices the player.
    pub detection_range: f32,
    /// Notoriety at which an officer issues a warning.
    pub warn_notoriety: f32,
    /// Notoriety at which an officer gives chase straight away.
    pub pursuit_notoriety: f32,
    /// Seconds between a warning and a chase.
    pub warning_duration: f32,
    /// The warning only escalates while the player stays this close.
    pub warning_range: f32,
    /// Distance at which an officer makes the arrest.
    pub arrest_range: f32,
    /// Chases end beyond this distance.
    pub give_up_range: f32,
    /// Chases end after the player has been out of sight this long.
    pub hidden_give_up_time: f32,
    /// Chase speed as a multiple of walking speed.
    pub chase_speed_multiplier: f32,
    /// Seconds after an arrest during which police leave the player alone.
    pub post_arrest_cooldown: f32,
    /// Pence fined per point of notoriety.
    pub fine_per_point: u64,
    /// How far a witness sees a crime.
    pub witness_range: f32,
    /// Notoriety multiplier for crimes committed in a balaclava.
    pub balaclava_factor: f32,
    /// Chance that a loaded chunk gets an officer walking its pavement.
    pub patrol_chance: f32,
}

impl Default for PoliceSection {
    fn default() -> Self {
        Self {
            detection_range: 16.0,
            warn_notoriety: 20.0,
            pursuit_notoriety: 60.0,
            warning_duration: 5.0,
            warning_range: 12.0,
            arrest_range: 1.8,
            give_up_range: 40.0,
            hidden_give_up_time: 8.0,
            chase_speed_multiplier: 1.4,
            post_arrest_cooldown: 30.0,
            fine_per_point: 10,
            witness_range: 16.0,
            balaclava_factor: 0.5,
            patrol_chance: 0.15,
        }
    }
}

/// Gang territory hostility.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GangSection {
    /// Radius of a territory around its centre.
    pub territory_radius: f32,
    /// Seconds of lingering before the gang gets wary.
    pub warn_after: f32,
    /// Seconds of lingering before the gang turns hostile.
    pub hostile_after: f32,
    /// Linger seconds forgotten per second away.
    pub decay_rate: f32,
    /// How close a wary gang member lets the player get before warning.
    pub warning_range: f32,
    /// Gang members spawned per territory.
    pub members_per_territory: u32,
}

impl Default for GangSection {
    fn default() -> Self {
        Self {
            territory_radius: 18.0,
            warn_after: 8.0,
            hostile_after: 20.0,
            decay_rate: 1.0,
            warning_range: 8.0,
            members_per_territory: 3,
        }
    }
}

/// Disguise scrutiny.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisguiseSection {
    /// Matching-faction NPCs closer than this scrutinise the player.
    pub scrutiny_range: f32,
    /// Scrutiny per second from one NPC standing right next to the player.
    pub scrutiny_rate: f32,
    /// Scrutiny lost per second when nobody is looking.
    pub decay_rate: f32,
    /// Scrutiny added by a witnessed crime.
    pub crime_penalty: f32,
    /// Notoriety added when a disguise is blown.
    pub blown_notoriety: f32,
}

impl Default for DisguiseSection {
    fn default() -> Self {
        Self {
            scrutiny_range: 8.0,
            scrutiny_rate: 0.25,
            decay_rate: 0.1,
            crime_penalty: 0.35,
            blown_notoriety: 15.0,
        }
    }
}

/// Car handling and spawning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleSection {
    /// Forward acceleration at full throttle.
    pub acceleration: f32,
    /// Deceleration when braking.
    pub braking: f32,
    /// Deceleration when coasting.
    pub friction: f32,
    /// Top speed forwards.
    pub max_speed: f32,
    /// Top speed in reverse.
    pub max_reverse_speed: f32,
    /// Degrees per second at full lock and top speed.
    pub turn_rate: f32,
    /// Damage from hitting a wall at top speed.
    pub collision_damage: f32,
    /// Car health.
    pub max_health: f32,
    /// Hitting a pedestrian faster than this injures them.
    pub injury_speed: f32,
    /// How close the player must be to get in.
    pub enter_reach: f32,
    /// Chance a road chunk has a parked car.
    pub spawn_chance: f32,
}

impl Default for VehicleSection {
    fn default() -> Self {
        Self {
            acceleration: 8.0,
            braking: 16.0,
            friction: 3.0,
            max_speed: 18.0,
            max_reverse_speed: 5.0,
            turn_rate: 90.0,
            collision_damage: 40.0,
            max_health: 100.0,
            injury_speed: 6.0,
            enter_reach: 3.0,
            spawn_chance: 0.2,
        }
    }
}

/// Time of day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockSection {
    /// Hour the game starts at.
    pub start_hour: f32,
    /// Real seconds in one game day.
    pub day_length_seconds: f32,
}

impl Default for ClockSection {
    fn default() -> Self {
        Self {
            start_hour: 8.0,
            day_length_seconds: 1200.0,
        }
    }
}

/// Drop tables, recipes and the bookies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomySection {
    /// TOML drop tables replacing the built-in ones.
    pub drop_tables: Option<PathBuf>,
    /// TOML recipe book replacing the built-in one.
    pub recipes: Option<PathBuf>,
    /// Smallest accepted stake in pence.
    pub min_stake: u64,
    /// Largest accepted stake in pence.
    pub max_stake: u64,
}

impl Default for EconomySection {
    fn default() -> Self {
        Self {
            drop_tables: None,
            recipes: None,
            min_stake: 50,
            max_stake: 5000,
        }
    }
}

/// Complete game configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// World seed and streaming.
    pub world: WorldSection,
    /// Player stats and movement.
    pub player: PlayerSection,
    /// NPC spawning and shared behaviour.
    pub npc: NpcSection,
    /// Police and arrests.
    pub police: PoliceSection,
    /// Gang territories.
    pub gang: GangSection,
    /// Disguise scrutiny.
    pub disguise: DisguiseSection,
    /// Cars.
    pub vehicle: VehicleSection,
    /// Time of day.
    pub clock: ClockSection,
    /// Drops, recipes and betting.
    pub economy: EconomySection,
}

impl GameConfig {
    /// Parses and validates a TOML config.
    ///
    /// # Errors
    ///
    /// [`GameError::ConfigParse`] for bad TOML, [`GameError::Config`] for
    /// values that fail [`GameConfig::validate`].
    pub fn from_toml_str(text: &str) -> GameResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// [`GameError::Io`] if the file cannot be read, otherwise as
    /// [`GameConfig::from_toml_str`].
    pub fn load(path: &Path) -> GameResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Defaults with a different world seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.world.seed = seed;
        self
    }

    /// Checks ranges and orderings the simulation relies on.
    ///
    /// # Errors
    ///
    /// [`GameError::Config`] naming the first bad value.
    pub fn validate(&self) -> GameResult<()> {
        fn check(ok: bool, what: &str) -> GameResult<()> {
            if ok {
                Ok(())
            } else {
                Err(GameError::Config(what.to_owned()))
            }
        }

        let w = &self.world;
        check(w.load_radius >= 1, "world.load_radius must be at least 1")?;
        check(
            w.unload_radius >= w.load_radius,
            "world.unload_radius must be >= world.load_radius",
        )?;
        check(w.max_generate_per_update >= 1, "world.max_generate_per_update must be at least 1")?;

        let p = &self.player;
        for (value, name) in [
            (p.max_health, "player.max_health"),
            (p.max_hunger, "player.max_hunger"),
            (p.max_warmth, "player.max_warmth"),
            (p.max_energy, "player.max_energy"),
            (p.walk_speed, "player.walk_speed"),
            (p.reach, "player.reach"),
        ] {
            check(value > 0.0, &format!("{name} must be positive"))?;
        }
        check(p.sprint_speed >= p.walk_speed, "player.sprint_speed must be >= player.walk_speed")?;
        check(p.inventory_slots >= 9, "player.inventory_slots must cover the hotbar")?;

        let n = &self.npc;
        check((0.0..=1.0).contains(&n.spawn_chance), "npc.spawn_chance must be in 0..=1")?;
        check(n.path_node_budget > 0, "npc.path_node_budget must be positive")?;
        check(n.repath_interval > 0.0, "npc.repath_interval must be positive")?;

        let c = &self.police;
        check(
            c.warn_notoriety <= c.pursuit_notoriety,
            "police.warn_notoriety must be <= police.pursuit_notoriety",
        )?;
        check(
            c.pursuit_notoriety <= 100.0,
            "police.pursuit_notoriety must be reachable (<= 100)",
        )?;
        check(c.arrest_range > 0.0, "police.arrest_range must be positive")?;
        check(
            c.give_up_range > c.detection_range,
            "police.give_up_range must exceed police.detection_range",
        )?;
        check(
            (0.0..=1.0).contains(&c.balaclava_factor),
            "police.balaclava_factor must be in 0..=1",
        )?;
        check(
            (0.0..=1.0).contains(&c.patrol_chance),
            "police.patrol_chance must be in 0..=1",
        )?;

        let g = &self.gang;
        check(g.territory_radius > 0.0, "gang.territory_radius must be positive")?;
        check(
            0.0 < g.warn_after && g.warn_after < g.hostile_after,
            "gang.warn_after must be positive and below gang.hostile_after",
        )?;

        let d = &self.disguise;
        check(d.scrutiny_range > 0.0, "disguise.scrutiny_range must be positive")?;

        let v = &self.vehicle;
        check(v.max_speed > 0.0, "vehicle.max_speed must be positive")?;
        check(v.max_health > 0.0, "vehicle.max_health must be positive")?;
        check((0.0..=1.0).contains(&v.spawn_chance), "vehicle.spawn_chance must be in 0..=1")?;

        check(
            (0.0..24.0).contains(&self.clock.start_hour),
            "clock.start_hour must be in 0..24",
        )?;
        check(self.clock.day_length_seconds > 0.0, "clock.day_length_seconds must be positive")?;

        check(
            self.economy.min_stake <= self.economy.max_stake,
            "economy.min_stake must be <= economy.max_stake",
        )?;
        Ok(())
    }
}
