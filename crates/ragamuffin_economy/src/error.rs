//! # Economy Error Types
//!
//! All errors that can occur in the economy system.

use ragamuffin_world::LandmarkType;
use thiserror::Error;

use crate::material::Material;

/// Errors that can occur in the economy system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EconomyError {
    /// Not enough of a material for a recipe or removal.
    #[error("insufficient materials: need {required} {}, have {available}", .material.name())]
    InsufficientMaterials {
        /// The material that was missing.
        material: Material,
        /// The amount required.
        required: u32,
        /// The amount available.
        available: u32,
    },

    /// Recipe not found in the crafting graph.
    #[error("recipe not found: {0}")]
    RecipeNotFound(u32),

    /// Detected a cycle in the crafting graph (infinite resource generation).
    #[error("cycle detected in crafting graph at recipe {0}")]
    CycleDetected(u32),

    /// Inventory is full, cannot add more items.
    #[error("inventory full: capacity {capacity}, tried to add {amount}")]
    InventoryFull {
        /// Slot capacity.
        capacity: u32,
        /// Amount tried to add.
        amount: u32,
    },

    /// The wallet does not hold enough money.
    #[error("insufficient funds: costs {price}p, have {balance}p")]
    InsufficientFunds {
        /// Price in pence.
        price: u64,
        /// Balance in pence.
        balance: u64,
    },

    /// The shop does not sell this material.
    #[error("{shop:?} does not sell {}", .material.name())]
    NotStocked {
        /// The shop asked.
        shop: LandmarkType,
        /// The material asked for.
        material: Material,
    },

    /// The shop will not take this material.
    #[error("{shop:?} will not take {}", .material.name())]
    NotBuying {
        /// The shop asked.
        shop: LandmarkType,
        /// The material offered.
        material: Material,
    },

    /// The bookmaker refused the bet.
    #[error("bet rejected: {0}")]
    BetRejected(String),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;
