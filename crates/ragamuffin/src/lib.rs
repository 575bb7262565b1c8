//! # RAGAMUFFIN
//!
//! A headless life simulation for someone with nothing: a procedurally
//! generated British town built from voxels, people who react to you, and
//! the daily grind of staying fed, warm and out of the nick.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               Game                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐   │
//! │  │  ragamuffin_    │     │   gameplay      │     │  ragamuffin_    │   │
//! │  │  world          │<────│                 │────>│  economy        │   │
//! │  │                 │     │  • NPC brains   │     │                 │   │
//! │  │  • Chunks       │     │  • Police       │     │  • Inventory    │   │
//! │  │  • Town plan    │     │  • Gangs        │     │  • Crafting     │   │
//! │  │  • Props, saves │     │  • Disguises    │     │  • Drops, shops │   │
//! │  └────────┬────────┘     └────────┬────────┘     └─────────────────┘   │
//! │           │                       │                                     │
//! │           │              ┌────────┴────────┐                            │
//! │           └─────────────>│  physics        │                            │
//! │                          │  player, cars   │                            │
//! │                          │  clock, shelter │                            │
//! │                          └─────────────────┘                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `simulation`: The [`Game`] facade
//! - `game_loop`: Fixed-timestep driver and frame statistics
//! - `events`: Bounded channel of everything that happened
//! - `gameplay`: NPCs, pathfinding, police, gangs, disguises
//! - `physics`, `interaction`: Bodies, raycasts, breaking and placing
//! - `player`, `clock`, `shelter`: Survival
//! - `vehicle`: Cars
//! - `config`, `error`: Settings and failures

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod game_loop;
pub mod gameplay;
pub mod interaction;
pub mod physics;
pub mod player;
pub mod shelter;
pub mod simulation;
pub mod vehicle;

// Re-export the lower layers
pub use ragamuffin_economy as economy;
pub use ragamuffin_world as world;

// Re-export commonly used types
pub use config::GameConfig;
pub use error::{GameError, GameResult};
pub use events::{EventBus, EventReceiver, EventSender, GameEvent};
pub use game_loop::{FrameStats, FrameStatsAccumulator, GameLoop, GameLoopConfig};
pub use gameplay::npc::{NpcId, NpcState, NpcType};
pub use gameplay::police::Crime;
pub use simulation::{Game, NpcPunch, PunchOutcome};
pub use vehicle::{CarId, CarInput};
