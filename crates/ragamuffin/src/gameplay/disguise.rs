//! # Disguises
//!
//! Wearing the right clothes lets the player pass as one of a faction.
//! People from that faction who get a good look grow suspicious; stand too
//! close for too long and the cover is blown.
//!
//! ```text
//!            matching faction nearby
//! scrutiny ────────────────────────────> 1.0 ──> blown, clothing lost
//!          <──── decays when alone
//! ```
//!
//! A balaclava matches no faction. Nobody scrutinises it, because everybody
//! already knows something is up.

use ragamuffin_economy::{DisguiseKind, Inventory, Material};
use tracing::{debug, info};

use crate::config::DisguiseSection;
use crate::error::{GameError, GameResult};
use crate::gameplay::npc::Faction;

/// Faction a disguise passes with.
#[must_use]
pub const fn disguise_faction(kind: DisguiseKind) -> Option<Faction> {
    match kind {
        DisguiseKind::PoliceUniform => Some(Faction::Police),
        DisguiseKind::HiVis => Some(Faction::Council),
        DisguiseKind::Tracksuit => Some(Faction::Gang),
        DisguiseKind::Balaclava => None,
    }
}

/// The player's worn disguise and how close it is to being seen through.
#[derive(Clone, Debug, Default)]
pub struct DisguiseSystem {
    worn: Option<DisguiseKind>,
    scrutiny: f32,
}

impl DisguiseSystem {
    /// Nothing worn.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The disguise being worn.
    #[must_use]
    pub const fn worn(&self) -> Option<DisguiseKind> {
        self.worn
    }

    /// Whether a specific disguise is being worn.
    #[must_use]
    pub fn is_wearing(&self, kind: DisguiseKind) -> bool {
        self.worn == Some(kind)
    }

    /// Suspicion, `0.0..1.0`.
    #[must_use]
    pub const fn scrutiny(&self) -> f32 {
        self.scrutiny
    }

    /// Faction the player currently passes with.
    #[must_use]
    pub fn passes_as(&self) -> Option<Faction> {
        self.worn.and_then(disguise_faction)
    }

    /// Puts on clothing from the inventory. Any disguise already worn goes
    /// back in the inventory. Returns the previous disguise.
    ///
    /// # Errors
    ///
    /// [`GameError::NotWearable`] for non-clothing, or an economy error when
    /// the item is missing or the old disguise will not fit back in the
    /// pockets. Nothing changes on error.
    pub fn equip(&mut self, inventory: &mut Inventory, material: Material) -> GameResult<Option<DisguiseKind>> {
        let kind = material.disguise().ok_or(GameError::NotWearable(material))?;

        let snapshot = inventory.snapshot();
        inventory.remove(material, 1)?;
        let previous = self.worn;
        if let Some(prev) = previous {
            if let Err(err) = inventory.add(prev.material(), 1) {
                inventory.restore(&snapshot);
                return Err(err.into());
            }
        }

        self.worn = Some(kind);
        self.scrutiny = 0.0;
        debug!(?kind, ?previous, "disguise equipped");
        Ok(previous)
    }

    /// Takes the disguise off and puts it in the inventory.
    ///
    /// # Errors
    ///
    /// [`GameError::NotDisguised`] if nothing is worn, or an economy error
    /// when the inventory is full.
    pub fn remove(&mut self, inventory: &mut Inventory) -> GameResult<DisguiseKind> {
        let kind = self.worn.ok_or(GameError::NotDisguised)?;
        inventory.add(kind.material(), 1)?;
        self.worn = None;
        self.scrutiny = 0.0;
        Ok(kind)
    }

    /// Takes the disguise away for good.
    pub fn confiscate(&mut self) -> Option<DisguiseKind> {
        self.scrutiny = 0.0;
        self.worn.take()
    }

    /// Updates scrutiny from the factions and distances of nearby NPCs.
    /// Returns the disguise if it was blown.
    pub fn update(
        &mut self,
        dt: f32,
        observers: impl IntoIterator<Item = (Faction, f32)>,
        config: &DisguiseSection,
    ) -> Option<DisguiseKind> {
        let faction = self.passes_as()?;

        let closeness: f32 = observers
            .into_iter()
            .filter(|&(f, d)| f == faction && d <= config.scrutiny_range)
            .map(|(_, d)| 1.0 - d / config.scrutiny_range)
            .sum();

        if closeness > 0.0 {
            self.scrutiny += config.scrutiny_rate * closeness * dt;
        } else {
            self.scrutiny = (self.scrutiny - config.decay_rate * dt).max(0.0);
        }
        self.check_blown()
    }

    /// A witnessed crime draws attention. Returns the disguise if it was
    /// blown.
    pub fn crime_penalty(&mut self, config: &DisguiseSection) -> Option<DisguiseKind> {
        self.passes_as()?;
        self.scrutiny += config.crime_penalty;
        self.check_blown()
    }

    fn check_blown(&mut self) -> Option<DisguiseKind> {
        if self.scrutiny < 1.0 {
            return None;
        }
        let kind = self.confiscate()?;
        info!(?kind, "disguise blown");
        Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragamuffin_economy::EconomyError;

    fn wearing(material: Material) -> (DisguiseSystem, Inventory) {
        let mut inventory = Inventory::new();
        inventory.add(material, 1).unwrap();
        let mut system = DisguiseSystem::new();
        system.equip(&mut inventory, material).unwrap();
        (system, inventory)
    }

    #[test]
    fn test_equip_consumes_and_swaps() {
        let (mut system, mut inventory) = wearing(Material::HiVis);
        assert!(system.is_wearing(DisguiseKind::HiVis));
        assert_eq!(inventory.count(Material::HiVis), 0);
        assert_eq!(system.passes_as(), Some(Faction::Council));

        inventory.add(Material::Tracksuit, 1).unwrap();
        let previous = system.equip(&mut inventory, Material::Tracksuit).unwrap();
        assert_eq!(previous, Some(DisguiseKind::HiVis));
        assert_eq!(inventory.count(Material::HiVis), 1);
        assert_eq!(inventory.count(Material::Tracksuit), 0);

        assert_eq!(system.remove(&mut inventory).unwrap(), DisguiseKind::Tracksuit);
        assert_eq!(inventory.count(Material::Tracksuit), 1);
        assert!(matches!(system.remove(&mut inventory), Err(GameError::NotDisguised)));
    }

    #[test]
    fn test_equip_rejects_non_clothing_and_missing_items() {
        let mut system = DisguiseSystem::new();
        let mut inventory = Inventory::new();
        inventory.add(Material::Bread, 1).unwrap();

        assert!(matches!(
            system.equip(&mut inventory, Material::Bread),
            Err(GameError::NotWearable(Material::Bread))
        ));
        assert!(matches!(
            system.equip(&mut inventory, Material::HiVis),
            Err(GameError::Economy(EconomyError::InsufficientMaterials { .. }))
        ));
        assert_eq!(system.worn(), None);
    }

    #[test]
    fn test_close_matching_observer_blows_cover() {
        let config = DisguiseSection::default();
        let (mut system, _) = wearing(Material::PoliceUniform);

        // Other factions do not look twice
        for _ in 0..100 {
            assert_eq!(system.update(0.1, [(Faction::Gang, 0.5)], &config), None);
        }
        assert_eq!(system.scrutiny(), 0.0);

        let mut blown = None;
        for _ in 0..200 {
            blown = system.update(0.1, [(Faction::Police, 1.0)], &config);
            if blown.is_some() {
                break;
            }
        }
        assert_eq!(blown, Some(DisguiseKind::PoliceUniform));
        assert_eq!(system.worn(), None);
    }

    #[test]
    fn test_scrutiny_decays_when_alone() {
        let config = DisguiseSection::default();
        let (mut system, _) = wearing(Material::Tracksuit);

        system.update(1.0, [(Faction::Gang, 2.0)], &config);
        let raised = system.scrutiny();
        assert!(raised > 0.0);

        system.update(1.0, [(Faction::Gang, config.scrutiny_range + 1.0)], &config);
        assert!(system.scrutiny() < raised);
    }

    #[test]
    fn test_balaclava_is_never_scrutinised() {
        let config = DisguiseSection::default();
        let (mut system, _) = wearing(Material::Balaclava);
        assert_eq!(system.update(10.0, [(Faction::Police, 0.0)], &config), None);
        assert_eq!(system.crime_penalty(&config), None);
        assert!(system.is_wearing(DisguiseKind::Balaclava));
    }

    #[test]
    fn test_crime_penalty_adds_scrutiny() {
        let config = DisguiseSection::default();
        let (mut system, _) = wearing(Material::HiVis);
        assert_eq!(system.crime_penalty(&config), None);
        assert!((system.scrutiny() - config.crime_penalty).abs() < 1e-6);

        let mut blown = None;
        for _ in 0..5 {
            blown = blown.or(system.crime_penalty(&config));
        }
        assert_eq!(blown, Some(DisguiseKind::HiVis));
    }
}
