//! # Shops
//!
//! Money is kept in pence. Shops are keyed by landmark: each one has a list
//! of what it sells and a list of what it will take off your hands.

use std::collections::HashMap;
use std::fmt;

use ragamuffin_world::LandmarkType;
use tracing::debug;

use crate::error::{EconomyError, EconomyResult};
use crate::inventory::Inventory;
use crate::material::Material;

/// Money in pence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Wallet {
    pence: u64,
}

impl Wallet {
    /// A wallet holding `pence`.
    #[must_use]
    pub const fn new(pence: u64) -> Self {
        Self { pence }
    }

    /// Current balance in pence.
    #[must_use]
    pub const fn balance(&self) -> u64 {
        self.pence
    }

    /// Adds money.
    pub fn deposit(&mut self, pence: u64) {
        self.pence = self.pence.saturating_add(pence);
    }

    /// Takes money out.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` if the balance is too low; the wallet is unchanged.
    pub fn withdraw(&mut self, pence: u64) -> EconomyResult<()> {
        if pence > self.pence {
            return Err(EconomyError::InsufficientFunds { price: pence, balance: self.pence });
        }
        self.pence -= pence;
        Ok(())
    }

    /// Takes up to `pence` and returns how much was actually taken.
    pub fn take_up_to(&mut self, pence: u64) -> u64 {
        let taken = pence.min(self.pence);
        self.pence -= taken;
        taken
    }
}

impl fmt::Display for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "£{}.{:02}", self.pence / 100, self.pence % 100)
    }
}

/// What one shop trades in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShopStock {
    /// Materials for sale and their price each.
    pub sells: Vec<(Material, u64)>,
    /// Materials the shop takes and what it pays each.
    pub buys: Vec<(Material, u64)>,
}

impl ShopStock {
    fn sell_price(&self, material: Material) -> Option<u64> {
        self.sells.iter().find(|(m, _)| *m == material).map(|&(_, p)| p)
    }

    fn buy_price(&self, material: Material) -> Option<u64> {
        self.buys.iter().find(|(m, _)| *m == material).map(|&(_, p)| p)
    }
}

/// Every shop in town.
#[derive(Clone, Debug)]
pub struct ShopCatalogue {
    shops: HashMap<LandmarkType, ShopStock>,
}

impl ShopCatalogue {
    /// Stock for one shop.
    #[must_use]
    pub fn stock(&self, shop: LandmarkType) -> Option<&ShopStock> {
        self.shops.get(&shop)
    }

    /// Replaces a shop's stock.
    pub fn set_stock(&mut self, shop: LandmarkType, stock: ShopStock) {
        self.shops.insert(shop, stock);
    }

    /// Price of one `material` at `shop`.
    #[must_use]
    pub fn price(&self, shop: LandmarkType, material: Material) -> Option<u64> {
        self.stock(shop)?.sell_price(material)
    }

    /// Buys `quantity` of `material`. Pays first, then stocks the inventory;
    /// if it does not fit, the money goes back.
    ///
    /// Returns the amount paid.
    ///
    /// # Errors
    ///
    /// `NotStocked`, `InsufficientFunds` or `InventoryFull`. On error neither
    /// the wallet nor the inventory has changed.
    pub fn buy(
        &self,
        wallet: &mut Wallet,
        inventory: &mut Inventory,
        shop: LandmarkType,
        material: Material,
        quantity: u32,
    ) -> EconomyResult<u64> {
        let price = self
            .price(shop, material)
            .ok_or(EconomyError::NotStocked { shop, material })?;
        let total = price * u64::from(quantity);

        wallet.withdraw(total)?;
        if let Err(e) = inventory.add(material, quantity) {
            wallet.deposit(total);
            return Err(e);
        }

        debug!(shop = ?shop, item = material.name(), quantity, total, "bought");
        Ok(total)
    }

    /// Sells `quantity` of `material` to the shop. Returns the amount paid.
    ///
    /// # Errors
    ///
    /// `NotBuying` or `InsufficientMaterials`.
    pub fn sell(
        &self,
        wallet: &mut Wallet,
        inventory: &mut Inventory,
        shop: LandmarkType,
        material: Material,
        quantity: u32,
    ) -> EconomyResult<u64> {
        let price = self
            .stock(shop)
            .and_then(|s| s.buy_price(material))
            .ok_or(EconomyError::NotBuying { shop, material })?;

        inventory.remove(material, quantity)?;
        let total = price * u64::from(quantity);
        wallet.deposit(total);

        debug!(shop = ?shop, item = material.name(), quantity, total, "sold");
        Ok(total)
    }
}

impl Default for ShopCatalogue {
    fn default() -> Self {
        use LandmarkType as L;
        use Material as M;

        let shops = [
            (
                L::Greggs,
                ShopStock { sells: vec![(M::SausageRoll, 120), (M::SteakBake, 185)], buys: vec![] },
            ),
            (
                L::Supermarket,
                ShopStock {
                    sells: vec![(M::Bread, 95), (M::Bacon, 250), (M::Crisps, 80), (M::CanOfLager, 110)],
                    buys: vec![],
                },
            ),
            (
                L::OffLicence,
                ShopStock { sells: vec![(M::CanOfLager, 150), (M::Crisps, 90)], buys: vec![] },
            ),
            (L::KebabShop, ShopStock { sells: vec![(M::Kebab, 550)], buys: vec![] }),
            (L::Pub, ShopStock { sells: vec![(M::CanOfLager, 450), (M::Crisps, 120)], buys: vec![] }),
            (
                // Fenced goods, no questions asked
                L::Jeweller,
                ShopStock {
                    sells: vec![],
                    buys: vec![(M::Diamond, 5_000), (M::GoldRing, 1_500), (M::StolenPhone, 800)],
                },
            ),
            (
                // Donations are free; you just get rid of the stuff
                L::CharityShop,
                ShopStock {
                    sells: vec![(M::Tracksuit, 400), (M::HiVis, 300), (M::SleepingBag, 600)],
                    buys: vec![(M::Tracksuit, 0), (M::HiVis, 0), (M::Balaclava, 0), (M::SleepingBag, 0)],
                },
            ),
            (L::Launderette, ShopStock { sells: vec![(M::Balaclava, 250)], buys: vec![] }),
        ];

        Self { shops: shops.into_iter().collect() }
    }
}
