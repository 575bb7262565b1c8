//! # Gang Territory
//!
//! The youth gangs hold the council flats and a park. Hanging around on
//! their patch wears their patience thin:
//!
//! ```text
//!          linger >= warn_after        linger >= hostile_after
//! Neutral ─────────────────────> Wary ─────────────────────────> Hostile
//!         <───────────────────── Wary <───────────────────────── Hostile
//!              linger == 0                linger < warn_after
//! ```
//!
//! Linger time only builds while the player is inside without a tracksuit;
//! anywhere else it drains at `decay_rate`. Hitting a member makes the whole
//! territory hostile at once.

use ragamuffin_world::town::PLOT_SIZE;
use ragamuffin_world::{CellCoord, LandmarkType, PlotKind, TownPlan, SURFACE_Y};
use tracing::info;

use crate::config::GangSection;
use crate::physics::horizontal_distance;

/// Index of a territory.
pub type TerritoryId = usize;

/// How a gang feels about the player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Hostility {
    /// Ignoring them.
    #[default]
    Neutral,
    /// Watching them.
    Wary,
    /// Coming for them.
    Hostile,
}

/// One gang's patch.
#[derive(Clone, Debug, PartialEq)]
pub struct Territory {
    /// Index in [`GangTerritories`].
    pub id: TerritoryId,
    /// Name of the patch.
    pub name: &'static str,
    /// Centre at ground level.
    pub center: [f32; 3],
    /// Where members hang about.
    pub rally: [f32; 3],
    /// Horizontal radius.
    pub radius: f32,
    linger: f32,
    hostility: Hostility,
}

impl Territory {
    fn new(id: TerritoryId, name: &'static str, center: [f32; 3], rally: [f32; 3], radius: f32) -> Self {
        Self {
            id,
            name,
            center,
            rally,
            radius,
            linger: 0.0,
            hostility: Hostility::Neutral,
        }
    }

    /// Whether a point lies on the patch.
    #[must_use]
    pub fn contains(&self, point: [f32; 3]) -> bool {
        horizontal_distance(self.center, point) <= self.radius
    }

    /// Current mood.
    #[must_use]
    pub const fn hostility(&self) -> Hostility {
        self.hostility
    }

    /// Accumulated linger seconds.
    #[must_use]
    pub const fn linger(&self) -> f32 {
        self.linger
    }

    fn next_hostility(&self, config: &GangSection) -> Hostility {
        match self.hostility {
            _ if self.linger >= config.hostile_after => Hostility::Hostile,
            Hostility::Hostile if self.linger < config.warn_after => Hostility::Wary,
            Hostility::Wary if self.linger <= 0.0 => Hostility::Neutral,
            Hostility::Neutral if self.linger >= config.warn_after => Hostility::Wary,
            current => current,
        }
    }
}

/// A hostility change on one territory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostilityChange {
    /// Which territory.
    pub territory: TerritoryId,
    /// Before.
    pub from: Hostility,
    /// After.
    pub to: Hostility,
}

/// All gang territories in the town.
#[derive(Clone, Debug, Default)]
pub struct GangTerritories {
    territories: Vec<Territory>,
}

impl GangTerritories {
    /// Rings of cells searched for a park to claim.
    const PARK_SEARCH_RINGS: i32 = 6;

    /// Claims the council flats and the nearest park that is not the spawn
    /// park.
    #[must_use]
    pub fn from_plan(plan: &TownPlan, config: &GangSection) -> Self {
        let mut territories = Vec::new();

        if let Some(flats) = plan.landmark(LandmarkType::CouncilFlats) {
            territories.push(Territory::new(
                territories.len(),
                "Council Flats",
                flats.center(),
                flats.entrance(),
                config.territory_radius,
            ));
        }
        if let Some(cell) = Self::find_park(plan) {
            let half = PLOT_SIZE as f32 / 2.0;
            let center = [
                cell.plot_x() as f32 + half,
                (SURFACE_Y + 1) as f32,
                cell.plot_z() as f32 + half,
            ];
            territories.push(Territory::new(
                territories.len(),
                "The Park",
                center,
                center,
                config.territory_radius,
            ));
        }

        Self { territories }
    }

    fn find_park(plan: &TownPlan) -> Option<CellCoord> {
        (1..=Self::PARK_SEARCH_RINGS).find_map(|ring| {
            (-ring..=ring)
                .flat_map(|z| (-ring..=ring).map(move |x| CellCoord::new(x, z)))
                .filter(|c| c.x.abs() == ring || c.z.abs() == ring)
                .find(|&c| plan.plot(c) == PlotKind::Park)
        })
    }

    /// Every territory.
    pub fn iter(&self) -> impl Iterator<Item = &Territory> {
        self.territories.iter()
    }

    /// Number of territories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.territories.len()
    }

    /// No territories at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.territories.is_empty()
    }

    /// A territory by id.
    #[must_use]
    pub fn get(&self, id: TerritoryId) -> Option<&Territory> {
        self.territories.get(id)
    }

    /// Territory covering a point.
    #[must_use]
    pub fn territory_at(&self, point: [f32; 3]) -> Option<TerritoryId> {
        self.territories.iter().find(|t| t.contains(point)).map(|t| t.id)
    }

    /// Hostility of a territory; neutral for unknown ids.
    #[must_use]
    pub fn hostility(&self, id: TerritoryId) -> Hostility {
        self.get(id).map_or(Hostility::Neutral, Territory::hostility)
    }

    /// Advances linger timers from where the player is.
    pub fn update(
        &mut self,
        dt: f32,
        player_position: [f32; 3],
        wearing_tracksuit: bool,
        config: &GangSection,
    ) -> Vec<HostilityChange> {
        let mut changes = Vec::new();
        for territory in &mut self.territories {
            if !wearing_tracksuit && territory.contains(player_position) {
                territory.linger += dt;
            } else {
                territory.linger = (territory.linger - config.decay_rate * dt).max(0.0);
            }

            let next = territory.next_hostility(config);
            if next != territory.hostility {
                changes.push(Self::transition(territory, next));
            }
        }
        changes
    }

    /// A member was assaulted: the territory turns hostile.
    pub fn provoke(&mut self, id: TerritoryId, config: &GangSection) -> Option<HostilityChange> {
        let territory = self.territories.get_mut(id)?;
        territory.linger = territory.linger.max(config.hostile_after);
        if territory.hostility == Hostility::Hostile {
            return None;
        }
        Some(Self::transition(territory, Hostility::Hostile))
    }

    fn transition(territory: &mut Territory, to: Hostility) -> HostilityChange {
        let from = territory.hostility;
        territory.hostility = to;
        info!(territory = territory.name, ?from, ?to, "gang hostility changed");
        HostilityChange {
            territory: territory.id,
            from,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragamuffin_world::WorldSeed;

    fn territories() -> GangTerritories {
        GangTerritories::from_plan(&TownPlan::new(WorldSeed::new(11)), &GangSection::default())
    }

    #[test]
    fn test_flats_are_always_claimed() {
        let plan = TownPlan::new(WorldSeed::new(11));
        let gangs = territories();
        let flats = gangs.get(0).unwrap();
        assert_eq!(flats.name, "Council Flats");
        let landmark = plan.landmark(LandmarkType::CouncilFlats).unwrap();
        assert_eq!(gangs.territory_at(landmark.center()), Some(0));
        assert_eq!(gangs.territory_at(plan.spawn_point()), None);
    }

    #[test]
    fn test_lingering_escalates_then_decays() {
        let config = GangSection::default();
        let mut gangs = territories();
        let inside = gangs.get(0).unwrap().center;

        let mut seen = Vec::new();
        for _ in 0..(config.hostile_after as usize + 1) {
            seen.extend(gangs.update(1.0, inside, false, &config));
        }
        assert_eq!(gangs.hostility(0), Hostility::Hostile);
        assert_eq!(
            seen.iter().map(|c| c.to).collect::<Vec<_>>(),
            vec![Hostility::Wary, Hostility::Hostile]
        );

        let outside = [inside[0] + 500.0, inside[1], inside[2]];
        let mut steps = 0;
        while gangs.hostility(0) == Hostility::Hostile {
            gangs.update(1.0, outside, false, &config);
            steps += 1;
        }
        assert_eq!(gangs.hostility(0), Hostility::Wary);
        assert!(gangs.get(0).unwrap().linger() < config.warn_after);
        assert!(steps > 1);

        while gangs.hostility(0) == Hostility::Wary {
            gangs.update(1.0, outside, false, &config);
        }
        assert_eq!(gangs.hostility(0), Hostility::Neutral);
        assert_eq!(gangs.get(0).unwrap().linger(), 0.0);
    }

    #[test]
    fn test_tracksuit_blends_in() {
        let config = GangSection::default();
        let mut gangs = territories();
        let inside = gangs.get(0).unwrap().center;
        for _ in 0..60 {
            assert!(gangs.update(1.0, inside, true, &config).is_empty());
        }
        assert_eq!(gangs.hostility(0), Hostility::Neutral);
    }

    #[test]
    fn test_provoke_goes_straight_to_hostile() {
        let config = GangSection::default();
        let mut gangs = territories();

        let change = gangs.provoke(0, &config).unwrap();
        assert_eq!((change.from, change.to), (Hostility::Neutral, Hostility::Hostile));
        assert!(gangs.provoke(0, &config).is_none());
        assert!(gangs.provoke(99, &config).is_none());

        // Stays hostile while the grudge is fresh
        let outside = [10_000.0, 5.0, 10_000.0];
        assert!(gangs.update(1.0, outside, false, &config).is_empty());
        assert_eq!(gangs.hostility(0), Hostility::Hostile);
    }
}
