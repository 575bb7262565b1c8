//! # Blocks
//!
//! Every voxel is a [`Block`]: a `u16` type id plus `u16` of metadata. The id
//! maps onto [`BlockType`], which carries the gameplay properties (is it
//! solid, how many punches it takes, does it let light through).

use bytemuck::{Pod, Zeroable};

/// Kind of voxel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum BlockType {
    /// Empty space.
    Air = 0,
    /// Park grass.
    Grass = 1,
    /// Soil under the surface.
    Dirt = 2,
    /// Deep ground.
    Stone = 3,
    /// Paving slabs between road and plot.
    Pavement = 4,
    /// Tarmac.
    Road = 5,
    /// Terrace and shop walls.
    Brick = 6,
    /// Windows and shop fronts.
    Glass = 7,
    /// Tree trunks.
    Wood = 8,
    /// Tree canopies.
    Leaves = 9,
    /// Bottom of the world.
    Bedrock = 10,
    /// Puddles and canal water.
    Water = 11,
    /// Flattened boxes.
    Cardboard = 12,
    /// Tower blocks, roofs and floors.
    Concrete = 13,
    /// Sawn wood.
    Planks = 14,
    /// A lit fire that warms anyone standing nearby.
    Campfire = 15,
}

impl BlockType {
    /// Every block type, in id order.
    pub const ALL: [Self; 16] = [
        Self::Air,
        Self::Grass,
        Self::Dirt,
        Self::Stone,
        Self::Pavement,
        Self::Road,
        Self::Brick,
        Self::Glass,
        Self::Wood,
        Self::Leaves,
        Self::Bedrock,
        Self::Water,
        Self::Cardboard,
        Self::Concrete,
        Self::Planks,
        Self::Campfire,
    ];

    /// Looks up a block type from its numeric id.
    #[must_use]
    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.get(usize::from(id)).copied()
    }

    /// Numeric id stored in [`Block::id`].
    #[inline]
    #[must_use]
    pub const fn id(self) -> u16 {
        self as u16
    }

    /// Blocks movement and supports actors standing on it.
    #[must_use]
    pub const fn is_solid(self) -> bool {
        !matches!(self, Self::Air | Self::Water)
    }

    /// Can be punched out of the world.
    #[must_use]
    pub const fn is_breakable(self) -> bool {
        !matches!(self, Self::Air | Self::Water | Self::Bedrock)
    }

    /// Lets light and line of sight through.
    #[must_use]
    pub const fn is_transparent(self) -> bool {
        matches!(self, Self::Air | Self::Water | Self::Glass | Self::Leaves)
    }

    /// Warms players standing close to it.
    #[must_use]
    pub const fn emits_heat(self) -> bool {
        matches!(self, Self::Campfire)
    }

    /// Bare-handed hits needed to break the block.
    ///
    /// Zero for blocks that cannot be broken.
    #[must_use]
    pub const fn hits_to_break(self) -> u32 {
        match self {
            Self::Air | Self::Water | Self::Bedrock => 0,
            Self::Leaves => 1,
            Self::Glass | Self::Cardboard => 2,
            Self::Grass | Self::Dirt | Self::Campfire => 3,
            Self::Wood | Self::Planks => 5,
            Self::Pavement | Self::Road => 6,
            Self::Brick | Self::Stone | Self::Concrete => 8,
        }
    }

    /// Lowercase display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Air => "air",
            Self::Grass => "grass",
            Self::Dirt => "dirt",
            Self::Stone => "stone",
            Self::Pavement => "pavement",
            Self::Road => "road",
            Self::Brick => "brick",
            Self::Glass => "glass",
            Self::Wood => "wood",
            Self::Leaves => "leaves",
            Self::Bedrock => "bedrock",
            Self::Water => "water",
            Self::Cardboard => "cardboard",
            Self::Concrete => "concrete",
            Self::Planks => "planks",
            Self::Campfire => "campfire",
        }
    }
}

/// A single block in the world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Block {
    /// Block type ID.
    pub id: u16,
    /// Block metadata flags.
    pub meta: u16,
}

impl Block {
    /// Meta flag: the block was placed by the player rather than generated.
    pub const PLAYER_PLACED: u16 = 1;

    /// Air block (empty).
    pub const AIR: Self = Self::of(BlockType::Air);

    /// Creates a generated block of the given type.
    #[inline]
    #[must_use]
    pub const fn of(kind: BlockType) -> Self {
        Self { id: kind.id(), meta: 0 }
    }

    /// Creates a block marked as player-built.
    #[inline]
    #[must_use]
    pub const fn placed(kind: BlockType) -> Self {
        Self { id: kind.id(), meta: Self::PLAYER_PLACED }
    }

    /// Block type, or `Air` for unknown ids.
    #[inline]
    #[must_use]
    pub fn kind(self) -> BlockType {
        BlockType::from_id(self.id).unwrap_or(BlockType::Air)
    }

    /// Returns true if this is an air block.
    #[inline]
    #[must_use]
    pub const fn is_air(self) -> bool {
        self.id == 0
    }

    /// Returns true if the block blocks movement.
    #[inline]
    #[must_use]
    pub fn is_solid(self) -> bool {
        self.kind().is_solid()
    }

    /// Returns true if the player built this block.
    #[inline]
    #[must_use]
    pub const fn is_player_placed(self) -> bool {
        self.meta & Self::PLAYER_PLACED != 0
    }
}

impl From<BlockType> for Block {
    fn from(kind: BlockType) -> Self {
        Self::of(kind)
    }
}
