//! # Materials
//!
//! Everything that fits in a pocket: building blocks, food, clothes that
//! double as disguises, stolen valuables and tools.

use ragamuffin_world::BlockType;
use serde::{Deserialize, Serialize};

/// Clothing that changes how NPCs read the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisguiseKind {
    /// Passes with the police.
    PoliceUniform,
    /// Passes with council workers.
    HiVis,
    /// Passes with the youth gangs.
    Tracksuit,
    /// Hides the face. Nobody trusts it.
    Balaclava,
}

impl DisguiseKind {
    /// The clothing item for this disguise.
    #[must_use]
    pub const fn material(self) -> Material {
        match self {
            Self::PoliceUniform => Material::PoliceUniform,
            Self::HiVis => Material::HiVis,
            Self::Tracksuit => Material::Tracksuit,
            Self::Balaclava => Material::Balaclava,
        }
    }
}

/// An item type that can be carried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Material {
    // Building
    /// Soil.
    Dirt,
    /// A square of turf.
    Turf,
    /// Rubble and stone.
    Stone,
    /// A brick.
    Brick,
    /// A pane of glass.
    Glass,
    /// A log.
    Wood,
    /// Sawn planks.
    Planks,
    /// Flattened cardboard.
    Cardboard,
    /// A lump of concrete.
    Concrete,
    /// A paving slab.
    PavingSlab,
    /// Bent metal off street furniture.
    ScrapMetal,
    /// Old newspapers.
    Newspaper,

    // Food
    /// Greggs' finest.
    SausageRoll,
    /// Also Greggs.
    SteakBake,
    /// A loaf of sliced white.
    Bread,
    /// Rashers.
    Bacon,
    /// Bacon in bread.
    BaconButty,
    /// Ready salted.
    Crisps,
    /// Doner with everything.
    Kebab,
    /// Warm lager.
    CanOfLager,

    // Clothing
    /// Police uniform.
    PoliceUniform,
    /// High-visibility vest.
    HiVis,
    /// Shell suit.
    Tracksuit,
    /// Balaclava.
    Balaclava,

    // Valuables
    /// A diamond.
    Diamond,
    /// A gold ring.
    GoldRing,
    /// Someone else's phone.
    StolenPhone,

    // Tools and crafted goods
    /// Breaks blocks three times faster. Police do not like it.
    Crowbar,
    /// A placeable campfire.
    Campfire,
    /// Sleep rough in slightly more comfort.
    SleepingBag,
    /// Cardboard box wall for shelters.
    ShelterWall,
}

impl Material {
    /// Every material.
    pub const ALL: [Self; 31] = [
        Self::Dirt,
        Self::Turf,
        Self::Stone,
        Self::Brick,
        Self::Glass,
        Self::Wood,
        Self::Planks,
        Self::Cardboard,
        Self::Concrete,
        Self::PavingSlab,
        Self::ScrapMetal,
        Self::Newspaper,
        Self::SausageRoll,
        Self::SteakBake,
        Self::Bread,
        Self::Bacon,
        Self::BaconButty,
        Self::Crisps,
        Self::Kebab,
        Self::CanOfLager,
        Self::PoliceUniform,
        Self::HiVis,
        Self::Tracksuit,
        Self::Balaclava,
        Self::Diamond,
        Self::GoldRing,
        Self::StolenPhone,
        Self::Crowbar,
        Self::Campfire,
        Self::SleepingBag,
        Self::ShelterWall,
    ];

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dirt => "dirt",
            Self::Turf => "turf",
            Self::Stone => "stone",
            Self::Brick => "brick",
            Self::Glass => "glass",
            Self::Wood => "wood",
            Self::Planks => "planks",
            Self::Cardboard => "cardboard",
            Self::Concrete => "concrete",
            Self::PavingSlab => "paving slab",
            Self::ScrapMetal => "scrap metal",
            Self::Newspaper => "newspaper",
            Self::SausageRoll => "sausage roll",
            Self::SteakBake => "steak bake",
            Self::Bread => "bread",
            Self::Bacon => "bacon",
            Self::BaconButty => "bacon butty",
            Self::Crisps => "crisps",
            Self::Kebab => "kebab",
            Self::CanOfLager => "can of lager",
            Self::PoliceUniform => "police uniform",
            Self::HiVis => "hi-vis vest",
            Self::Tracksuit => "tracksuit",
            Self::Balaclava => "balaclava",
            Self::Diamond => "diamond",
            Self::GoldRing => "gold ring",
            Self::StolenPhone => "stolen phone",
            Self::Crowbar => "crowbar",
            Self::Campfire => "campfire",
            Self::SleepingBag => "sleeping bag",
            Self::ShelterWall => "cardboard box wall",
        }
    }

    /// Maximum stack size in one slot.
    #[must_use]
    pub const fn max_stack(self) -> u32 {
        match self {
            Self::PoliceUniform
            | Self::HiVis
            | Self::Tracksuit
            | Self::Balaclava
            | Self::Crowbar
            | Self::SleepingBag => 1,
            Self::SausageRoll
            | Self::SteakBake
            | Self::Bread
            | Self::Bacon
            | Self::BaconButty
            | Self::Crisps
            | Self::Kebab
            | Self::CanOfLager
            | Self::Diamond
            | Self::GoldRing
            | Self::StolenPhone => 16,
            _ => 64,
        }
    }

    /// Block placed when this material is used on the world.
    #[must_use]
    pub const fn placeable_block(self) -> Option<BlockType> {
        match self {
            Self::Dirt => Some(BlockType::Dirt),
            Self::Turf => Some(BlockType::Grass),
            Self::Stone => Some(BlockType::Stone),
            Self::Brick => Some(BlockType::Brick),
            Self::Glass => Some(BlockType::Glass),
            Self::Wood => Some(BlockType::Wood),
            Self::Planks => Some(BlockType::Planks),
            Self::Concrete => Some(BlockType::Concrete),
            Self::PavingSlab => Some(BlockType::Pavement),
            Self::Campfire => Some(BlockType::Campfire),
            Self::ShelterWall => Some(BlockType::Cardboard),
            _ => None,
        }
    }

    /// Hunger restored by eating, if edible.
    #[must_use]
    pub const fn food_value(self) -> Option<f32> {
        match self {
            Self::SausageRoll => Some(25.0),
            Self::SteakBake => Some(30.0),
            Self::Bread => Some(15.0),
            Self::Bacon => Some(10.0),
            Self::BaconButty => Some(40.0),
            Self::Crisps => Some(8.0),
            Self::Kebab => Some(45.0),
            Self::CanOfLager => Some(5.0),
            _ => None,
        }
    }

    /// Disguise granted by wearing this material.
    #[must_use]
    pub const fn disguise(self) -> Option<DisguiseKind> {
        match self {
            Self::PoliceUniform => Some(DisguiseKind::PoliceUniform),
            Self::HiVis => Some(DisguiseKind::HiVis),
            Self::Tracksuit => Some(DisguiseKind::Tracksuit),
            Self::Balaclava => Some(DisguiseKind::Balaclava),
            _ => None,
        }
    }

    /// Confiscated on arrest.
    #[must_use]
    pub const fn is_contraband(self) -> bool {
        matches!(self, Self::Diamond | Self::GoldRing | Self::StolenPhone | Self::Crowbar)
    }

    /// Block-breaking multiplier when held. Bare hands are 1.
    #[must_use]
    pub const fn tool_power(self) -> u32 {
        match self {
            Self::Crowbar => 3,
            _ => 1,
        }
    }

    /// Looks a material up by variant or display name, ignoring case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim();
        Self::ALL.into_iter().find(|m| {
            m.name().eq_ignore_ascii_case(wanted) || format!("{m:?}").eq_ignore_ascii_case(wanted)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_block_material_places_a_solid_block() {
        for material in Material::ALL {
            if let Some(block) = material.placeable_block() {
                assert!(block.is_solid(), "{material:?} places {block:?}");
                assert!(block.is_breakable());
            }
        }
    }

    #[test]
    fn test_disguises_round_trip_to_clothing() {
        for material in Material::ALL {
            if let Some(kind) = material.disguise() {
                assert_eq!(kind.material(), material);
                assert_eq!(material.max_stack(), 1);
            }
        }
    }

    #[test]
    fn test_categories_do_not_overlap() {
        for material in Material::ALL {
            let roles = [
                material.placeable_block().is_some(),
                material.food_value().is_some(),
                material.disguise().is_some(),
            ];
            assert!(roles.iter().filter(|&&r| r).count() <= 1, "{material:?}");
        }
        assert!(Material::Diamond.is_contraband());
        assert!(!Material::SausageRoll.is_contraband());
        assert_eq!(Material::Crowbar.tool_power(), 3);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Material::from_name("BaconButty"), Some(Material::BaconButty));
        assert_eq!(Material::from_name("bacon butty"), Some(Material::BaconButty));
        assert_eq!(Material::from_name("Sausage Roll"), Some(Material::SausageRoll));
        assert_eq!(Material::from_name("caviar"), None);
    }
}
