//! # Crime and Arrest
//!
//! Every crime goes on the record. A crime only raises notoriety when a
//! conscious bystander sees it; the game decides who saw it and which
//! officers are sent after the player.
//!
//! An arrest empties the pockets of anything nicked, strips any disguise,
//! fines the player in proportion to their notoriety and drops them outside
//! the police station with a clean slate. For a while afterwards the police
//! leave them alone.

use ragamuffin_economy::{DisguiseKind, Inventory, ItemStack, Wallet};
use tracing::info;

use crate::config::PoliceSection;
use crate::gameplay::disguise::DisguiseSystem;
use crate::player::Player;

/// Offences the player can commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Crime {
    /// Breaking bits off a shop.
    ShopDamage,
    /// Hitting a member of the public.
    Assault,
    /// Hitting a police officer.
    AssaultOnOfficer,
    /// Taking what isn't yours.
    Theft,
    /// Running someone over.
    DangerousDriving,
}

impl Crime {
    /// Notoriety a witnessed offence adds.
    #[must_use]
    pub const fn severity(self) -> f32 {
        match self {
            Self::ShopDamage => 8.0,
            Self::Assault => 15.0,
            Self::AssaultOnOfficer => 30.0,
            Self::Theft => 12.0,
            Self::DangerousDriving => 10.0,
        }
    }

    /// Charge sheet wording.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ShopDamage => "criminal damage",
            Self::Assault => "assault",
            Self::AssaultOnOfficer => "assaulting a police officer",
            Self::Theft => "theft",
            Self::DangerousDriving => "dangerous driving",
        }
    }
}

/// What reporting a crime did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CrimeReport {
    /// The offence.
    pub crime: Crime,
    /// Whether anyone saw it.
    pub witnessed: bool,
    /// Notoriety added.
    pub notoriety: f32,
}

/// What an arrest cost the player.
#[derive(Clone, Debug, PartialEq)]
pub struct Arrest {
    /// Pence taken from the wallet.
    pub fine: u64,
    /// Items taken off the player, including a worn disguise.
    pub confiscated: Vec<ItemStack>,
    /// Where the player was released.
    pub released_at: [f32; 3],
}

/// Crime bookkeeping and the post-arrest grace period.
#[derive(Clone, Debug, Default)]
pub struct ArrestSystem {
    cooldown: f32,
    arrests: u32,
}

impl ArrestSystem {
    /// Creates the system with no cooldown running.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the police are still ignoring the player after an arrest.
    #[must_use]
    pub fn is_cooling_down(&self) -> bool {
        self.cooldown > 0.0
    }

    /// Seconds of grace left.
    #[must_use]
    pub const fn cooldown(&self) -> f32 {
        self.cooldown
    }

    /// Arrests so far.
    #[must_use]
    pub const fn arrests(&self) -> u32 {
        self.arrests
    }

    /// Runs the cooldown down.
    pub fn tick(&mut self, dt: f32) {
        self.cooldown = (self.cooldown - dt).max(0.0);
    }

    /// Notoriety a witnessed crime is worth.
    #[must_use]
    pub fn notoriety_for(crime: Crime, disguise: Option<DisguiseKind>, config: &PoliceSection) -> f32 {
        if disguise == Some(DisguiseKind::Balaclava) {
            crime.severity() * config.balaclava_factor
        } else {
            crime.severity()
        }
    }

    /// Puts a crime on the record and, if witnessed, on the player's
    /// reputation.
    pub fn report_crime(
        &mut self,
        player: &mut Player,
        crime: Crime,
        witnessed: bool,
        disguise: Option<DisguiseKind>,
        config: &PoliceSection,
    ) -> CrimeReport {
        player.record_crime(crime);

        let notoriety = if witnessed {
            let amount = Self::notoriety_for(crime, disguise, config);
            player.add_notoriety(amount);
            amount
        } else {
            0.0
        };

        info!(
            crime = crime.name(),
            witnessed,
            notoriety = player.notoriety(),
            "crime committed"
        );
        CrimeReport {
            crime,
            witnessed,
            notoriety,
        }
    }

    /// Nicks the player.
    pub fn arrest(
        &mut self,
        player: &mut Player,
        inventory: &mut Inventory,
        wallet: &mut Wallet,
        disguise: &mut DisguiseSystem,
        station_entrance: [f32; 3],
        config: &PoliceSection,
    ) -> Arrest {
        let mut confiscated = inventory.remove_where(|m| m.is_contraband());
        if let Some(kind) = disguise.confiscate() {
            confiscated.push(ItemStack::new(kind.material(), 1));
        }

        // Fractional notoriety still costs a full point
        let points = player.notoriety().ceil() as u64;
        let fine = wallet.take_up_to(points.saturating_mul(config.fine_per_point));

        player.reset_notoriety();
        player.body.teleport(station_entrance);
        self.cooldown = config.post_arrest_cooldown;
        self.arrests += 1;

        info!(
            fine,
            confiscated = confiscated.len(),
            arrests = self.arrests,
            "player arrested"
        );
        Arrest {
            fine,
            confiscated,
            released_at: station_entrance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerSection;
    use ragamuffin_economy::Material;

    fn player() -> Player {
        Player::new([0.0, 5.0, 0.0], &PlayerSection::default())
    }

    #[test]
    fn test_unwitnessed_crime_only_goes_on_record() {
        let config = PoliceSection::default();
        let mut system = ArrestSystem::new();
        let mut p = player();

        let report = system.report_crime(&mut p, Crime::Theft, false, None, &config);
        assert!(!report.witnessed);
        assert_eq!(report.notoriety, 0.0);
        assert_eq!(p.notoriety(), 0.0);
        assert_eq!(p.record().count(Crime::Theft), 1);
    }

    #[test]
    fn test_witnessed_crime_raises_notoriety() {
        let config = PoliceSection::default();
        let mut system = ArrestSystem::new();
        let mut p = player();

        system.report_crime(&mut p, Crime::Assault, true, None, &config);
        assert_eq!(p.notoriety(), Crime::Assault.severity());

        let report = system.report_crime(&mut p, Crime::Assault, true, Some(DisguiseKind::Balaclava), &config);
        assert_eq!(report.notoriety, Crime::Assault.severity() * config.balaclava_factor);
        assert_eq!(p.record().count(Crime::Assault), 2);
    }

    #[test]
    fn test_arrest_fines_confiscates_and_resets() {
        let config = PoliceSection::default();
        let mut system = ArrestSystem::new();
        let mut p = player();
        let mut inventory = Inventory::new();
        let mut wallet = Wallet::new(10_000);
        let mut disguise = DisguiseSystem::new();

        inventory.add(Material::Diamond, 2).unwrap();
        inventory.add(Material::Crowbar, 1).unwrap();
        inventory.add(Material::Bread, 3).unwrap();
        inventory.add(Material::Balaclava, 1).unwrap();
        disguise.equip(&mut inventory, Material::Balaclava).unwrap();
        p.add_notoriety(42.5);

        let station = [100.0, 5.0, 50.0];
        let arrest = system.arrest(&mut p, &mut inventory, &mut wallet, &mut disguise, station, &config);

        assert_eq!(arrest.fine, 43 * config.fine_per_point);
        assert_eq!(wallet.balance(), 10_000 - arrest.fine);
        assert_eq!(arrest.confiscated.len(), 3);
        assert!(arrest.confiscated.contains(&ItemStack::new(Material::Balaclava, 1)));
        assert_eq!(inventory.count(Material::Diamond), 0);
        assert_eq!(inventory.count(Material::Bread), 3);
        assert_eq!(disguise.worn(), None);
        assert_eq!(p.notoriety(), 0.0);
        assert_eq!(p.position(), station);
        assert!(system.is_cooling_down());

        system.tick(config.post_arrest_cooldown + 1.0);
        assert!(!system.is_cooling_down());
        assert_eq!(system.arrests(), 1);
    }

    #[test]
    fn test_fine_capped_by_wallet() {
        let config = PoliceSection::default();
        let mut system = ArrestSystem::new();
        let mut p = player();
        p.add_notoriety(100.0);
        let mut wallet = Wallet::new(120);

        let arrest = system.arrest(
            &mut p,
            &mut Inventory::new(),
            &mut wallet,
            &mut DisguiseSystem::new(),
            [0.0, 5.0, 0.0],
            &config,
        );
        assert_eq!(arrest.fine, 120);
        assert_eq!(wallet.balance(), 0);
    }
}
