//! # The Bookies
//!
//! One race at a time. Each race card has six runners with fractional odds;
//! the player may hold one bet per race. When the race is settled a winner is
//! drawn weighted by each runner's implied probability and a winning bet pays
//! `stake * num / den` plus the stake back.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;
use tracing::info;

use crate::error::{EconomyError, EconomyResult};
use crate::shop::Wallet;

/// Runners per race.
pub const RUNNERS_PER_RACE: usize = 6;

const HORSE_NAMES: [&str; 16] = [
    "Dole Queue Dancer",
    "Greggs Glory",
    "Tinned Beans",
    "Council Tax",
    "Soggy Chips",
    "Last Orders",
    "Kebab Knight",
    "Wet Weekend",
    "Bus Replacement",
    "Nan's Pension",
    "Pound Shop Prince",
    "Giro Day",
    "Drizzle",
    "Cash Converter",
    "Lager Top",
    "Grey Skies",
];

const ODDS: [Odds; 10] = [
    Odds::new(1, 1),
    Odds::new(6, 4),
    Odds::new(2, 1),
    Odds::new(5, 2),
    Odds::new(3, 1),
    Odds::new(4, 1),
    Odds::new(6, 1),
    Odds::new(8, 1),
    Odds::new(12, 1),
    Odds::new(20, 1),
];

/// Fractional odds `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Odds {
    /// Numerator.
    pub num: u32,
    /// Denominator.
    pub den: u32,
}

impl Odds {
    /// `num/den`.
    #[must_use]
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Chance of winning the odds imply.
    #[must_use]
    pub fn implied_probability(self) -> f64 {
        f64::from(self.den) / f64::from(self.num + self.den)
    }

    /// Total returned on a winning `stake`, stake included.
    #[must_use]
    pub const fn payout(self, stake: u64) -> u64 {
        stake * self.num as u64 / self.den as u64 + stake
    }
}

impl fmt::Display for Odds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.num == self.den {
            write!(f, "evens")
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// A horse on the card.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Runner {
    /// Name on the card.
    pub name: &'static str,
    /// Price.
    pub odds: Odds,
}

/// One race.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RaceCard {
    /// Race number, counting up from zero.
    pub race_id: u32,
    /// The field.
    pub runners: [Runner; RUNNERS_PER_RACE],
}

impl RaceCard {
    /// Draws a card. The same seed and race id always give the same card.
    #[must_use]
    pub fn generate(seed: u64, race_id: u32) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ ((u64::from(race_id) << 32) | 0x5241_4345));

        // Partial shuffle picks six distinct names
        let mut names = HORSE_NAMES;
        for i in 0..RUNNERS_PER_RACE {
            let j = rng.gen_range(i..names.len());
            names.swap(i, j);
        }

        let runners = std::array::from_fn(|i| Runner {
            name: names[i],
            odds: ODDS[rng.gen_range(0..ODDS.len())],
        });

        Self { race_id, runners }
    }
}

/// An open bet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bet {
    /// Race the bet is on.
    pub race_id: u32,
    /// Index into the runners.
    pub runner: usize,
    /// Stake in pence.
    pub stake: u64,
    /// Odds taken.
    pub odds: Odds,
}

/// Outcome of a settled race.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RaceResult {
    /// Race that ran.
    pub race_id: u32,
    /// Index of the winning runner.
    pub winner: usize,
    /// Name of the winner.
    pub winner_name: &'static str,
    /// The player's bet, if any.
    pub bet: Option<Bet>,
    /// Paid into the wallet, stake included. Zero for a losing bet.
    pub payout: u64,
}

impl RaceResult {
    /// Whether the player's horse came in.
    #[must_use]
    pub fn won(&self) -> bool {
        self.bet.is_some_and(|b| b.runner == self.winner)
    }
}

/// Takes bets and runs races.
#[derive(Clone, Debug)]
pub struct Bookmaker {
    seed: u64,
    min_stake: u64,
    max_stake: u64,
    card: RaceCard,
    open_bet: Option<Bet>,
    rng: ChaCha8Rng,
}

impl Bookmaker {
    /// A bookmaker with stake limits in pence.
    #[must_use]
    pub fn new(seed: u64, min_stake: u64, max_stake: u64) -> Self {
        Self {
            seed,
            min_stake,
            max_stake: max_stake.max(min_stake),
            card: RaceCard::generate(seed, 0),
            open_bet: None,
            rng: ChaCha8Rng::seed_from_u64(seed.rotate_left(17)),
        }
    }

    /// The race currently taking bets.
    #[must_use]
    pub const fn current_race(&self) -> &RaceCard {
        &self.card
    }

    /// The player's bet on the current race.
    #[must_use]
    pub const fn open_bet(&self) -> Option<Bet> {
        self.open_bet
    }

    /// Places a bet on the current race and takes the stake.
    ///
    /// # Errors
    ///
    /// `BetRejected` for an unknown runner, a stake outside the limits or a
    /// second bet on the same race; `InsufficientFunds` if the stake is not
    /// in the wallet.
    pub fn place_bet(&mut self, wallet: &mut Wallet, runner: usize, stake: u64) -> EconomyResult<Bet> {
        if self.open_bet.is_some() {
            return Err(EconomyError::BetRejected("already have a bet on this race".into()));
        }
        let Some(entry) = self.card.runners.get(runner) else {
            return Err(EconomyError::BetRejected(format!("no runner {runner}")));
        };
        if stake < self.min_stake || stake > self.max_stake {
            return Err(EconomyError::BetRejected(format!(
                "stake must be between {}p and {}p",
                self.min_stake, self.max_stake
            )));
        }

        wallet.withdraw(stake)?;
        let bet = Bet { race_id: self.card.race_id, runner, stake, odds: entry.odds };
        self.open_bet = Some(bet);
        Ok(bet)
    }

    /// Runs the current race, pays out a winning bet and opens the next race.
    pub fn settle(&mut self, wallet: &mut Wallet) -> RaceResult {
        let weights = self.card.runners.each_ref().map(|r| r.odds.implied_probability());
        let total: f64 = weights.iter().sum();
        let mut pick = self.rng.gen_range(0.0..total);
        let mut winner = RUNNERS_PER_RACE - 1;
        for (i, w) in weights.iter().enumerate() {
            if pick < *w {
                winner = i;
                break;
            }
            pick -= w;
        }

        let bet = self.open_bet.take();
        let payout = match bet {
            Some(b) if b.runner == winner => b.odds.payout(b.stake),
            _ => 0,
        };
        wallet.deposit(payout);

        let result = RaceResult {
            race_id: self.card.race_id,
            winner,
            winner_name: self.card.runners[winner].name,
            bet,
            payout,
        };
        info!(
            race = result.race_id,
            winner = result.winner_name,
            payout,
            "race settled"
        );

        self.card = RaceCard::generate(self.seed, self.card.race_id + 1);
        result
    }
}
