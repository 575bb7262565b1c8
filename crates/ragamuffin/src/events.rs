//! # Game Events
//!
//! Everything that happens in the simulation is reported as a [`GameEvent`]
//! on a bounded channel. A front end (or a test) drains the receiver once per
//! frame and reacts: speech bubbles, sounds, HUD messages.
//!
//! ```text
//! ┌─────────────┐   try_send   ┌─────────────┐   drain   ┌─────────────┐
//! │    Game     │─────────────>│   Channel   │──────────>│  Front end  │
//! │  (update)   │              │  (bounded)  │           │  / tests    │
//! └─────────────┘              └─────────────┘           └─────────────┘
//! ```
//!
//! Sending never blocks the simulation. When the channel is full the event is
//! dropped.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use ragamuffin_economy::{DisguiseKind, ItemStack, Material, RecipeId};
use ragamuffin_world::{BlockPos, BlockType, LandmarkType, PropType};

use crate::gameplay::gang::{Hostility, TerritoryId};
use crate::gameplay::npc::{NpcId, NpcState, NpcType};
use crate::gameplay::police::Crime;
use crate::player::DamageCause;
use crate::vehicle::CarId;

/// Default channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Something that happened in the town.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    // =========================================================================
    // Blocks and props
    // =========================================================================
    /// The player broke a block.
    BlockBroken {
        /// Where it was.
        pos: BlockPos,
        /// What it was.
        block: BlockType,
        /// What went into the inventory.
        drops: Vec<ItemStack>,
    },

    /// The player placed a block.
    BlockPlaced {
        /// Where.
        pos: BlockPos,
        /// What.
        block: BlockType,
    },

    /// A council builder took down a player-placed block.
    BlockDemolished {
        /// The builder.
        npc: NpcId,
        /// Where the block was.
        pos: BlockPos,
    },

    /// The player smashed a prop.
    PropDestroyed {
        /// What it was.
        kind: PropType,
        /// What went into the inventory.
        drops: Vec<ItemStack>,
    },

    // =========================================================================
    // Items and money
    // =========================================================================
    /// A recipe was crafted.
    Crafted {
        /// Which recipe.
        recipe: RecipeId,
    },

    /// Food was eaten.
    Ate {
        /// What.
        food: Material,
    },

    /// Items were bought.
    Purchased {
        /// Which shop.
        shop: LandmarkType,
        /// What.
        material: Material,
        /// How many.
        quantity: u32,
        /// Pence paid.
        total: u64,
    },

    /// Items were sold.
    Sold {
        /// Which shop.
        shop: LandmarkType,
        /// What.
        material: Material,
        /// How many.
        quantity: u32,
        /// Pence received.
        total: u64,
    },

    /// A bet went on.
    BetPlaced {
        /// Race.
        race_id: u32,
        /// Horse name.
        runner: &'static str,
        /// Stake in pence.
        stake: u64,
    },

    /// A race was run.
    RaceSettled {
        /// Race.
        race_id: u32,
        /// Winning horse.
        winner: &'static str,
        /// Pence paid out, zero if the bet lost or there was none.
        payout: u64,
    },

    // =========================================================================
    // NPCs
    // =========================================================================
    /// An NPC appeared in a freshly loaded chunk.
    NpcSpawned {
        /// Who.
        id: NpcId,
        /// What kind.
        kind: NpcType,
    },

    /// An NPC went away with its chunk.
    NpcDespawned {
        /// Who.
        id: NpcId,
    },

    /// An NPC changed behaviour.
    NpcStateChanged {
        /// Who.
        id: NpcId,
        /// What kind.
        kind: NpcType,
        /// Old state.
        from: NpcState,
        /// New state.
        to: NpcState,
    },

    /// An NPC said something.
    NpcSpoke {
        /// Who.
        id: NpcId,
        /// The words.
        text: &'static str,
    },

    /// An NPC was knocked out.
    NpcKnockedOut {
        /// Who.
        id: NpcId,
    },

    // =========================================================================
    // Crime and factions
    // =========================================================================
    /// A crime was recorded.
    CrimeReported {
        /// What.
        crime: Crime,
        /// Whether anyone saw it.
        witnessed: bool,
        /// Notoriety after the crime.
        notoriety: f32,
    },

    /// The player was arrested.
    PlayerArrested {
        /// Pence taken.
        fine: u64,
        /// Items taken.
        confiscated: Vec<ItemStack>,
    },

    /// A gang territory's mood changed.
    GangHostilityChanged {
        /// Which territory.
        territory: TerritoryId,
        /// Old mood.
        from: Hostility,
        /// New mood.
        to: Hostility,
    },

    /// A disguise went on.
    DisguiseEquipped {
        /// What.
        kind: DisguiseKind,
    },

    /// A disguise came off.
    DisguiseRemoved {
        /// What.
        kind: DisguiseKind,
    },

    /// A disguise was seen through and lost.
    DisguiseBlown {
        /// What.
        kind: DisguiseKind,
    },

    // =========================================================================
    // Player
    // =========================================================================
    /// The player took damage.
    PlayerDamaged {
        /// Health lost.
        amount: f32,
        /// Why.
        cause: DamageCause,
    },

    /// The player died.
    PlayerDied {
        /// What finished them off.
        cause: DamageCause,
    },

    /// The player came back at the park.
    PlayerRespawned {
        /// Where.
        position: [f32; 3],
    },

    // =========================================================================
    // Cars
    // =========================================================================
    /// The player got into a car.
    EnteredCar {
        /// Which.
        car: CarId,
    },

    /// The player got out.
    ExitedCar {
        /// Which.
        car: CarId,
    },

    /// A car hit a wall.
    CarCrashed {
        /// Which.
        car: CarId,
        /// Damage taken.
        damage: f32,
    },

    /// A car hit a pedestrian.
    PedestrianHit {
        /// Which car.
        car: CarId,
        /// Who.
        npc: NpcId,
        /// Speed at impact.
        speed: f32,
    },

    // =========================================================================
    // Clock
    // =========================================================================
    /// Night fell.
    NightFell {
        /// Day number.
        day: u32,
    },

    /// A new day began at midnight.
    NewDay {
        /// Day number.
        day: u32,
    },
}

/// Bounded event channel.
pub struct EventBus {
    sender: Sender<GameEvent>,
    receiver: Receiver<GameEvent>,
}

impl EventBus {
    /// Creates a new event bus holding at most `capacity` undrained events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates a sender handle.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Creates a receiver handle.
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }

    /// Creates a new pair of sender and receiver.
    #[must_use]
    pub fn create_pair(capacity: usize) -> (EventSender, EventReceiver) {
        let bus = Self::new(capacity);
        (bus.sender(), bus.receiver())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

/// Handle for sending events.
#[derive(Clone)]
pub struct EventSender {
    sender: Sender<GameEvent>,
}

impl EventSender {
    /// Sends an event (non-blocking).
    ///
    /// Returns `false` if the channel is full or nobody is listening; the
    /// event is dropped.
    #[inline]
    pub fn send(&self, event: GameEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Handle for receiving events.
#[derive(Clone)]
pub struct EventReceiver {
    receiver: Receiver<GameEvent>,
}

impl EventReceiver {
    /// Receives all pending events (non-blocking).
    #[inline]
    pub fn drain(&self) -> Vec<GameEvent> {
        let mut events = Vec::with_capacity(self.receiver.len());
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Receives one event (non-blocking).
    #[inline]
    pub fn try_recv(&self) -> Option<GameEvent> {
        self.receiver.try_recv().ok()
    }

    /// Returns the number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Checks if there are pending events.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placed_block_reaches_the_front_end() {
        let bus = EventBus::default();
        let sender = bus.sender();
        let receiver = bus.receiver();

        assert!(!receiver.has_events());
        assert!(sender.send(GameEvent::BlockPlaced {
            pos: BlockPos::new(10, 5, 30),
            block: BlockType::Cardboard,
        }));

        assert!(matches!(
            receiver.try_recv(),
            Some(GameEvent::BlockPlaced { pos, block: BlockType::Cardboard }) if pos == BlockPos::new(10, 5, 30)
        ));
        assert_eq!(receiver.try_recv(), None);
    }

    #[test]
    fn test_drain_empties_a_busy_street() {
        let (sender, receiver) = EventBus::create_pair(16);
        for id in 0..6 {
            sender.send(GameEvent::NpcSpawned {
                id,
                kind: NpcType::Pensioner,
            });
        }
        sender.send(GameEvent::NightFell { day: 1 });

        assert_eq!(receiver.pending_count(), 7);
        let events = receiver.drain();
        assert!(matches!(events.last(), Some(GameEvent::NightFell { day: 1 })));
        assert!(receiver.drain().is_empty());
    }

    #[test]
    fn test_full_channel_drops_instead_of_blocking() {
        let (sender, receiver) = EventBus::create_pair(2);
        assert!(sender.send(GameEvent::NewDay { day: 1 }));
        assert!(sender.send(GameEvent::NewDay { day: 2 }));
        assert!(!sender.send(GameEvent::NewDay { day: 3 }));

        assert_eq!(
            receiver.drain(),
            vec![GameEvent::NewDay { day: 1 }, GameEvent::NewDay { day: 2 }]
        );
    }
}
