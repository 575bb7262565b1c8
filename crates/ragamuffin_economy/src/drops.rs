//! # Drop Tables
//!
//! What breaking things gives you.
//!
//! Every breakable block has a table, landmarks add bonus tables on top (a
//! brick out of the Jeweller might come with a diamond) and props have their
//! own (bins are full of cardboard). Chances are in basis points, where
//! 10000 is certain.
//!
//! Rolls come from a seeded `ChaCha8Rng`, so a replay with the same seed and
//! the same actions produces the same drops.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use ragamuffin_world::{BlockType, LandmarkType, PropType};

use crate::error::{EconomyError, EconomyResult};
use crate::inventory::ItemStack;
use crate::material::Material;

/// Basis points meaning "always".
pub const CERTAIN: u32 = 10_000;

/// One possible drop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropEntry {
    /// Material dropped.
    pub material: Material,
    /// Minimum quantity.
    pub min: u32,
    /// Maximum quantity (inclusive).
    pub max: u32,
    /// Chance in basis points.
    #[serde(default = "certain")]
    pub chance_bp: u32,
}

const fn certain() -> u32 {
    CERTAIN
}

impl DropEntry {
    /// A drop of `min..=max` with the given chance.
    #[must_use]
    pub const fn new(material: Material, min: u32, max: u32, chance_bp: u32) -> Self {
        Self { material, min, max, chance_bp }
    }

    /// Exactly one, every time.
    #[must_use]
    pub const fn always(material: Material) -> Self {
        Self::new(material, 1, 1, CERTAIN)
    }

    fn validate(&self) -> EconomyResult<()> {
        if self.min > self.max || self.max == 0 || self.chance_bp > CERTAIN {
            return Err(EconomyError::InvalidConfig(format!(
                "bad drop entry for {}: {}..={} at {}bp",
                self.material.name(),
                self.min,
                self.max,
                self.chance_bp
            )));
        }
        Ok(())
    }
}

/// Independent drop entries rolled together.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTable {
    /// Entries, each rolled on its own.
    #[serde(default)]
    pub entries: Vec<DropEntry>,
}

impl DropTable {
    /// A table of the given entries.
    #[must_use]
    pub fn new(entries: Vec<DropEntry>) -> Self {
        Self { entries }
    }
}

/// All drop tables in the game.
#[derive(Clone, Debug)]
pub struct DropTables {
    blocks: HashMap<BlockType, DropTable>,
    landmarks: HashMap<LandmarkType, DropTable>,
    props: HashMap<PropType, DropTable>,
}

/// TOML form of [`DropTables`].
///
/// ```toml
/// [blocks.brick]
/// entries = [{ material = "Brick", min = 1, max = 1 }]
///
/// [landmarks.Jeweller]
/// entries = [{ material = "Diamond", min = 1, max = 1, chance_bp = 500 }]
///
/// [props.bin]
/// entries = [{ material = "Cardboard", min = 1, max = 2 }]
/// ```
#[derive(Debug, Default, Deserialize)]
struct DropTablesFile {
    #[serde(default)]
    blocks: HashMap<String, DropTable>,
    #[serde(default)]
    landmarks: HashMap<String, DropTable>,
    #[serde(default)]
    props: HashMap<String, DropTable>,
}

fn lookup<T: Copy + std::fmt::Debug>(
    all: &[T],
    name: &str,
    display: impl Fn(T) -> &'static str,
) -> EconomyResult<T> {
    let wanted = name.replace('_', " ");
    all.iter()
        .copied()
        .find(|&t| display(t).eq_ignore_ascii_case(&wanted) || format!("{t:?}").eq_ignore_ascii_case(name))
        .ok_or_else(|| EconomyError::InvalidConfig(format!("unknown drop table key '{name}'")))
}

impl DropTables {
    /// Tables with nothing in them.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            blocks: HashMap::new(),
            landmarks: HashMap::new(),
            props: HashMap::new(),
        }
    }

    /// Parses tables from TOML. Keys not present keep no table.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for malformed TOML, unknown keys or bad entries.
    pub fn from_toml_str(text: &str) -> EconomyResult<Self> {
        let file: DropTablesFile =
            toml::from_str(text).map_err(|e| EconomyError::InvalidConfig(e.to_string()))?;
        let mut tables = Self::empty();

        for (name, table) in file.blocks {
            tables.set_block(lookup(&BlockType::ALL, &name, BlockType::name)?, table)?;
        }
        for (name, table) in file.landmarks {
            tables.set_landmark(lookup(&LandmarkType::ALL, &name, LandmarkType::sign)?, table)?;
        }
        for (name, table) in file.props {
            tables.set_prop(lookup(&PropType::ALL, &name, PropType::name)?, table)?;
        }

        Ok(tables)
    }

    /// Replaces the table for a block.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for bad entries.
    pub fn set_block(&mut self, block: BlockType, table: DropTable) -> EconomyResult<()> {
        table.entries.iter().try_for_each(DropEntry::validate)?;
        self.blocks.insert(block, table);
        Ok(())
    }

    /// Replaces the bonus table for a landmark.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for bad entries.
    pub fn set_landmark(&mut self, landmark: LandmarkType, table: DropTable) -> EconomyResult<()> {
        table.entries.iter().try_for_each(DropEntry::validate)?;
        self.landmarks.insert(landmark, table);
        Ok(())
    }

    /// Replaces the table for a prop.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for bad entries.
    pub fn set_prop(&mut self, prop: PropType, table: DropTable) -> EconomyResult<()> {
        table.entries.iter().try_for_each(DropEntry::validate)?;
        self.props.insert(prop, table);
        Ok(())
    }

    /// Table for a block.
    #[must_use]
    pub fn block(&self, block: BlockType) -> Option<&DropTable> {
        self.blocks.get(&block)
    }

    /// Bonus table for a landmark.
    #[must_use]
    pub fn landmark(&self, landmark: LandmarkType) -> Option<&DropTable> {
        self.landmarks.get(&landmark)
    }

    /// Table for a prop.
    #[must_use]
    pub fn prop(&self, prop: PropType) -> Option<&DropTable> {
        self.props.get(&prop)
    }
}

impl Default for DropTables {
    fn default() -> Self {
        use DropEntry as E;
        use Material as M;

        let blocks = [
            (BlockType::Grass, vec![E::always(M::Turf)]),
            (BlockType::Dirt, vec![E::always(M::Dirt)]),
            (BlockType::Stone, vec![E::always(M::Stone)]),
            (BlockType::Pavement, vec![E::always(M::PavingSlab)]),
            (BlockType::Road, vec![E::new(M::Stone, 1, 1, 5_000)]),
            (BlockType::Brick, vec![E::always(M::Brick)]),
            // Glass mostly shatters
            (BlockType::Glass, vec![E::new(M::Glass, 1, 1, 3_000)]),
            (BlockType::Wood, vec![E::always(M::Wood)]),
            (BlockType::Leaves, vec![]),
            (BlockType::Cardboard, vec![E::new(M::Cardboard, 1, 2, CERTAIN)]),
            (BlockType::Concrete, vec![E::always(M::Concrete)]),
            (BlockType::Planks, vec![E::always(M::Planks)]),
            (BlockType::Campfire, vec![E::new(M::Planks, 1, 2, CERTAIN)]),
        ];

        let landmarks = [
            (
                LandmarkType::Jeweller,
                vec![E::new(M::Diamond, 1, 1, 500), E::new(M::GoldRing, 1, 1, 1_500)],
            ),
            (
                LandmarkType::Greggs,
                vec![E::new(M::SausageRoll, 1, 1, 3_000), E::new(M::SteakBake, 1, 1, 2_000)],
            ),
            (
                LandmarkType::Supermarket,
                vec![
                    E::new(M::Bread, 1, 1, 2_500),
                    E::new(M::Bacon, 1, 1, 2_000),
                    E::new(M::Crisps, 1, 2, 2_500),
                ],
            ),
            (
                LandmarkType::OffLicence,
                vec![E::new(M::CanOfLager, 1, 2, 3_000), E::new(M::Crisps, 1, 1, 1_500)],
            ),
            (LandmarkType::KebabShop, vec![E::new(M::Kebab, 1, 1, 2_500)]),
            (
                LandmarkType::CharityShop,
                vec![E::new(M::Tracksuit, 1, 1, 800), E::new(M::HiVis, 1, 1, 500)],
            ),
            (LandmarkType::PoliceStation, vec![E::new(M::PoliceUniform, 1, 1, 500)]),
            (
                LandmarkType::Launderette,
                vec![E::new(M::Tracksuit, 1, 1, 600), E::new(M::Balaclava, 1, 1, 400)],
            ),
        ];

        let props = [
            (
                PropType::Bin,
                vec![E::new(M::Cardboard, 1, 2, CERTAIN), E::new(M::Newspaper, 1, 2, 7_000)],
            ),
            (PropType::Bench, vec![E::new(M::Planks, 2, 3, CERTAIN)]),
            (PropType::Lamppost, vec![E::new(M::ScrapMetal, 1, 2, CERTAIN)]),
            (PropType::PhoneBox, vec![E::always(M::Glass), E::always(M::ScrapMetal)]),
            (
                PropType::BusShelter,
                vec![E::new(M::Glass, 1, 2, CERTAIN), E::always(M::ScrapMetal)],
            ),
            (PropType::Bollard, vec![E::always(M::ScrapMetal)]),
            (PropType::Postbox, vec![E::new(M::ScrapMetal, 2, 2, CERTAIN)]),
        ];

        Self {
            blocks: blocks.into_iter().map(|(k, v)| (k, DropTable::new(v))).collect(),
            landmarks: landmarks.into_iter().map(|(k, v)| (k, DropTable::new(v))).collect(),
            props: props.into_iter().map(|(k, v)| (k, DropTable::new(v))).collect(),
        }
    }
}

/// Rolls drop tables with a seeded RNG.
#[derive(Clone, Debug)]
pub struct DropRoller {
    rng: ChaCha8Rng,
}

impl DropRoller {
    /// Creates a roller for a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// Rolls every entry of a table.
    pub fn roll(&mut self, table: &DropTable) -> Vec<ItemStack> {
        let mut out = Vec::new();
        for entry in &table.entries {
            if entry.chance_bp < CERTAIN && self.rng.gen_range(0..CERTAIN) >= entry.chance_bp {
                continue;
            }
            let count = if entry.min == entry.max {
                entry.max
            } else {
                self.rng.gen_range(entry.min..=entry.max)
            };
            if count > 0 {
                out.push(ItemStack::new(entry.material, count));
            }
        }
        out
    }

    /// Drops for breaking a block, plus the landmark bonus when the block
    /// belonged to a landmark.
    pub fn roll_block(
        &mut self,
        tables: &DropTables,
        block: BlockType,
        landmark: Option<LandmarkType>,
    ) -> Vec<ItemStack> {
        let mut out = tables.block(block).map(|t| self.roll(t)).unwrap_or_default();
        if let Some(bonus) = landmark.and_then(|l| tables.landmark(l)) {
            out.extend(self.roll(bonus));
        }
        out
    }

    /// Drops for smashing a prop.
    pub fn roll_prop(&mut self, tables: &DropTables, prop: PropType) -> Vec<ItemStack> {
        tables.prop(prop).map(|t| self.roll(t)).unwrap_or_default()
    }
}
