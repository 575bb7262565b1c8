//! # RAGAMUFFIN Economy
//!
//! Everything the player carries, makes, nicks and spends.
//!
//! ## Design Principles
//!
//! 1. **Integer money** - All prices and stakes are pence (`u64`)
//! 2. **Transactional crafting** - All-or-nothing item transformations
//! 3. **Seeded luck** - Drops and races roll on `ChaCha8`, never the OS
//! 4. **External configuration** - Drop tables and recipe books have TOML forms
//!
//! ## Example
//!
//! ```rust,ignore
//! use ragamuffin_economy::{DropRoller, DropTables, Inventory, RecipeBook};
//!
//! let tables = DropTables::default();
//! let mut roller = DropRoller::new(seed);
//! let mut inventory = Inventory::new();
//!
//! for stack in roller.roll_block(&tables, BlockType::Wood, None) {
//!     inventory.add(stack.material, stack.count)?;
//! }
//!
//! let graph = RecipeBook::builtin().into_graph()?;
//! graph.craft(&mut inventory, RecipeBook::PLANKS)?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod betting;
pub mod crafting;
pub mod drops;
pub mod error;
pub mod inventory;
pub mod material;
pub mod shop;

pub use betting::{Bet, Bookmaker, Odds, RaceCard, RaceResult, Runner, RUNNERS_PER_RACE};
pub use crafting::{CraftResult, CraftingGraph, Recipe, RecipeBook, RecipeId, RecipeItem};
pub use drops::{DropEntry, DropRoller, DropTable, DropTables};
pub use error::{EconomyError, EconomyResult};
pub use inventory::{Inventory, InventorySnapshot, ItemStack, HOTBAR_SIZE};
pub use material::{DisguiseKind, Material};
pub use shop::{ShopCatalogue, ShopStock, Wallet};
