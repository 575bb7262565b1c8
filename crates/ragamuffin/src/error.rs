//! # Game Error Types
//!
//! Everything a player action or a config load can fail with. World and
//! economy errors pass through unchanged.

use ragamuffin_economy::{EconomyError, Material};
use ragamuffin_world::WorldError;
use thiserror::Error;

/// Errors returned by the game facade and its systems.
#[derive(Error, Debug)]
pub enum GameError {
    /// Voxel world rejected the operation.
    #[error(transparent)]
    World(#[from] WorldError),

    /// Inventory, crafting, shop or bookies rejected the operation.
    #[error(transparent)]
    Economy(#[from] EconomyError),

    /// Config values failed validation.
    #[error("invalid config: {0}")]
    Config(String),

    /// Config file was not valid TOML for [`crate::config::GameConfig`].
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The look ray hit nothing within reach.
    #[error("nothing in reach")]
    NothingInReach,

    /// Block placement rejected.
    #[error("cannot place block: {0}")]
    InvalidPlacement(&'static str),

    /// The selected hotbar slot is empty.
    #[error("nothing selected")]
    NothingSelected,

    /// The item cannot be placed as a block.
    #[error("{} cannot be placed", .0.name())]
    NotPlaceable(Material),

    /// The item is not food.
    #[error("{} is not edible", .0.name())]
    NotEdible(Material),

    /// The item is not a disguise.
    #[error("{} is not something you can wear", .0.name())]
    NotWearable(Material),

    /// No disguise is being worn.
    #[error("not wearing a disguise")]
    NotDisguised,

    /// Trading needs the player to be inside a shop.
    #[error("not inside a shop")]
    NotInShop,

    /// Betting needs the player to be inside the bookies.
    #[error("not inside the bookies")]
    NotAtBookies,

    /// No usable car within reach.
    #[error("no car in reach")]
    NoCarInReach,

    /// Driving input without being in a car.
    #[error("not driving")]
    NotDriving,

    /// The player is dead and waiting to respawn.
    #[error("player is dead")]
    PlayerDead,
}

/// Result type for game operations.
pub type GameResult<T> = Result<T, GameError>;
