//! # Player
//!
//! Survival stats, notoriety and the criminal record. Movement lives in the
//! player's [`Body`]; the game feeds it input every step.
//!
//! ## Survival
//!
//! ```text
//! hunger  ── drains always ───────────────> 0 ──> starvation damage
//! warmth  ── drains outdoors (faster at night) ─> 0 ──> cold damage
//!         <─ regenerates in shelter / by a fire
//! energy  ── drains walking, faster sprinting
//!         <─ regenerates standing still
//! health  <─ regenerates while hunger and warmth are both above half
//! ```

use std::collections::BTreeMap;

use crate::config::PlayerSection;
use crate::gameplay::police::Crime;
use crate::physics::{look_direction, Body, PLAYER_EYE_HEIGHT, PLAYER_HEIGHT, PLAYER_WIDTH};

/// Notoriety ceiling.
pub const MAX_NOTORIETY: f32 = 100.0;

/// A value clamped to `0..=max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stat {
    value: f32,
    max: f32,
}

impl Stat {
    /// A full stat.
    #[must_use]
    pub const fn new(max: f32) -> Self {
        Self { value: max, max }
    }

    /// Current value.
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.value
    }

    /// Maximum value.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// `value / max`.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        self.value / self.max
    }

    /// Sets the value, clamped.
    pub fn set(&mut self, value: f32) {
        self.value = value.clamp(0.0, self.max);
    }

    /// Adds a (possibly negative) amount, clamped. Returns the actual change.
    pub fn add(&mut self, amount: f32) -> f32 {
        let before = self.value;
        self.set(before + amount);
        self.value - before
    }

    /// At zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value <= 0.0
    }

    /// At max.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.value >= self.max
    }

    /// Back to max.
    pub fn refill(&mut self) {
        self.value = self.max;
    }
}

/// The four survival stats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stats {
    /// Dead at zero.
    pub health: Stat,
    /// Starving at zero.
    pub hunger: Stat,
    /// Freezing at zero.
    pub warmth: Stat,
    /// No sprinting at zero.
    pub energy: Stat,
}

impl Stats {
    /// Full stats.
    #[must_use]
    pub const fn new(config: &PlayerSection) -> Self {
        Self {
            health: Stat::new(config.max_health),
            hunger: Stat::new(config.max_hunger),
            warmth: Stat::new(config.max_warmth),
            energy: Stat::new(config.max_energy),
        }
    }
}

/// Conditions around the player this step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Environment {
    /// Roof and walls nearby.
    pub sheltered: bool,
    /// Within reach of a campfire.
    pub near_campfire: bool,
    /// Between 20:00 and 06:00.
    pub night: bool,
    /// Moving under their own steam.
    pub moving: bool,
    /// Moving at a sprint.
    pub sprinting: bool,
}

/// Why health went down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DamageCause {
    /// Empty stomach.
    Starvation,
    /// Frozen.
    Cold,
    /// Punched.
    Assault,
    /// Car crash.
    Crash,
}

/// What one [`Player::update`] did to health.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SurvivalTick {
    /// Health lost, with the main cause.
    pub damage: Option<(f32, DamageCause)>,
    /// Health hit zero this step.
    pub died: bool,
}

/// Per-offence counts. Never cleared, not even by an arrest.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CriminalRecord {
    counts: BTreeMap<Crime, u32>,
}

impl CriminalRecord {
    /// Adds one offence.
    pub fn record(&mut self, crime: Crime) {
        *self.counts.entry(crime).or_insert(0) += 1;
    }

    /// Times a crime was committed.
    #[must_use]
    pub fn count(&self, crime: Crime) -> u32 {
        self.counts.get(&crime).copied().unwrap_or(0)
    }

    /// Total offences.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    /// Offences in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (Crime, u32)> + '_ {
        self.counts.iter().map(|(c, n)| (*c, *n))
    }
}

/// The player character.
#[derive(Clone, Debug)]
pub struct Player {
    /// Physical body.
    pub body: Body,
    /// Horizontal look angle in degrees. 0 faces -Z.
    pub yaw: f32,
    /// Vertical look angle in degrees, clamped to ±89.
    pub pitch: f32,
    /// Survival stats.
    pub stats: Stats,
    notoriety: f32,
    record: CriminalRecord,
    dead: bool,
}

impl Player {
    /// A healthy player standing at `position`.
    #[must_use]
    pub fn new(position: [f32; 3], config: &PlayerSection) -> Self {
        Self {
            body: Body::new(position, PLAYER_WIDTH, PLAYER_HEIGHT),
            yaw: 0.0,
            pitch: 0.0,
            stats: Stats::new(config),
            notoriety: 0.0,
            record: CriminalRecord::default(),
            dead: false,
        }
    }

    /// Feet position.
    #[must_use]
    pub const fn position(&self) -> [f32; 3] {
        self.body.position
    }

    /// Camera position.
    #[must_use]
    pub fn eye_position(&self) -> [f32; 3] {
        let [x, y, z] = self.body.position;
        [x, y + PLAYER_EYE_HEIGHT, z]
    }

    /// Unit vector the player is looking along.
    #[must_use]
    pub fn look_direction(&self) -> [f32; 3] {
        look_direction(self.yaw, self.pitch)
    }

    /// Sets the look angles.
    pub fn set_look(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw.rem_euclid(360.0);
        self.pitch = pitch.clamp(-89.0, 89.0);
    }

    /// Dead and waiting to respawn.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.dead
    }

    /// Runs the survival model for one step.
    pub fn update(&mut self, dt: f32, env: Environment, config: &PlayerSection) -> SurvivalTick {
        if self.dead {
            return SurvivalTick::default();
        }
        let stats = &mut self.stats;

        stats.hunger.add(-config.hunger_drain * dt);

        if env.moving {
            let drain = if env.sprinting { config.sprint_energy_drain } else { config.energy_drain };
            stats.energy.add(-drain * dt);
        } else {
            stats.energy.add(config.energy_regen * dt);
        }

        if env.sheltered || env.near_campfire {
            stats.warmth.add(config.warmth_regen * dt);
        } else {
            let drain = if env.night { config.night_warmth_drain } else { config.warmth_drain };
            stats.warmth.add(-drain * dt);
        }

        let mut damage = None;
        if stats.hunger.is_empty() {
            damage = Some((config.starvation_damage * dt, DamageCause::Starvation));
        }
        if stats.warmth.is_empty() {
            let cold = config.cold_damage * dt;
            damage = Some(match damage {
                Some((starving, _)) => (starving + cold, DamageCause::Cold),
                None => (cold, DamageCause::Cold),
            });
        }

        if let Some((amount, cause)) = damage {
            let died = self.damage(amount);
            return SurvivalTick { damage, died };
        }

        if stats.hunger.fraction() > 0.5 && stats.warmth.fraction() > 0.5 {
            stats.health.add(config.health_regen * dt);
        }
        SurvivalTick::default()
    }

    /// Restores hunger.
    pub fn eat(&mut self, food_value: f32) {
        self.stats.hunger.add(food_value);
    }

    /// Takes damage. Returns `true` if this killed the player.
    pub fn damage(&mut self, amount: f32) -> bool {
        if self.dead {
            return false;
        }
        self.stats.health.add(-amount);
        if self.stats.health.is_empty() {
            self.dead = true;
            self.body.stop();
            return true;
        }
        false
    }

    /// Back on their feet at `position` with full stats. Notoriety and the
    /// record carry over.
    pub fn respawn(&mut self, position: [f32; 3]) {
        self.stats.health.refill();
        self.stats.hunger.refill();
        self.stats.warmth.refill();
        self.stats.energy.refill();
        self.body.teleport(position);
        self.dead = false;
    }

    /// Current notoriety, `0..=100`.
    #[must_use]
    pub const fn notoriety(&self) -> f32 {
        self.notoriety
    }

    /// Raises (or lowers) notoriety, clamped.
    pub fn add_notoriety(&mut self, amount: f32) {
        self.notoriety = (self.notoriety + amount).clamp(0.0, MAX_NOTORIETY);
    }

    /// Clean slate after an arrest.
    pub fn reset_notoriety(&mut self) {
        self.notoriety = 0.0;
    }

    /// Notoriety fades over time.
    pub fn decay_notoriety(&mut self, dt: f32, rate: f32) {
        self.add_notoriety(-rate * dt);
    }

    /// Criminal record.
    #[must_use]
    pub const fn record(&self) -> &CriminalRecord {
        &self.record
    }

    /// Adds an offence to the record.
    pub fn record_crime(&mut self, crime: Crime) {
        self.record.record(crime);
    }
}
