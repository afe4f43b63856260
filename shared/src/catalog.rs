//! Identifiers both ends of the wire agree on: entity types, items, tiles,
//! biomes and research techs. Each carries a stable numeric tag and a
//! command-language name.

use crate::codec::CodecError;

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
    Player = 1,
    Cow = 2,
    Tree = 3,
    Boulder = 4,
    ItemEntity = 5,
    Totem = 6,
}

impl EntityType {
    pub const ALL: [EntityType; 6] = [
        EntityType::Player,
        EntityType::Cow,
        EntityType::Tree,
        EntityType::Boulder,
        EntityType::ItemEntity,
        EntityType::Totem,
    ];

    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Result<Self, CodecError> {
        Self::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .ok_or(CodecError::InvalidValue {
                field: "entity type",
                value: tag,
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            EntityType::Player => "player",
            EntityType::Cow => "cow",
            EntityType::Tree => "tree",
            EntityType::Boulder => "boulder",
            EntityType::ItemEntity => "item",
            EntityType::Totem => "totem",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemType {
    Wood = 1,
    Rock = 2,
    RawBeef = 3,
    Leather = 4,
    Berry = 5,
}

impl ItemType {
    pub const ALL: [ItemType; 5] = [
        ItemType::Wood,
        ItemType::Rock,
        ItemType::RawBeef,
        ItemType::Leather,
        ItemType::Berry,
    ];

    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Result<Self, CodecError> {
        Self::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .ok_or(CodecError::InvalidValue {
                field: "item type",
                value: tag,
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            ItemType::Wood => "wood",
            ItemType::Rock => "rock",
            ItemType::RawBeef => "raw_beef",
            ItemType::Leather => "leather",
            ItemType::Berry => "berry",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Health restored by eating one of this item, if it is edible.
    pub fn food_value(self) -> Option<f32> {
        match self {
            ItemType::RawBeef => Some(5.0),
            ItemType::Berry => Some(2.0),
            _ => None,
        }
    }

    pub fn stack_size(self) -> u32 {
        match self {
            ItemType::Leather => 64,
            ItemType::RawBeef | ItemType::Berry => 32,
            _ => 99,
        }
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TileType {
    Grass = 1,
    Dirt = 2,
    Sand = 3,
    Snow = 4,
    Water = 5,
    Rock = 6,
}

impl TileType {
    pub const ALL: [TileType; 6] = [
        TileType::Grass,
        TileType::Dirt,
        TileType::Sand,
        TileType::Snow,
        TileType::Water,
        TileType::Rock,
    ];

    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Result<Self, CodecError> {
        Self::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .ok_or(CodecError::InvalidValue {
                field: "tile type",
                value: tag,
            })
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Biome {
    Grassland = 1,
    Tundra = 2,
    Desert = 3,
    River = 4,
    Mountains = 5,
}

impl Biome {
    pub const ALL: [Biome; 5] = [
        Biome::Grassland,
        Biome::Tundra,
        Biome::Desert,
        Biome::River,
        Biome::Mountains,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Biome::Grassland => "grassland",
            Biome::Tundra => "tundra",
            Biome::Desert => "desert",
            Biome::River => "river",
            Biome::Mountains => "mountains",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TechType {
    Woodworking = 1,
    Stonecarving = 2,
    Herding = 3,
}

impl TechType {
    pub const ALL: [TechType; 3] = [
        TechType::Woodworking,
        TechType::Stonecarving,
        TechType::Herding,
    ];

    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Result<Self, CodecError> {
        Self::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .ok_or(CodecError::InvalidValue {
                field: "tech type",
                value: tag,
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            TechType::Woodworking => "woodworking",
            TechType::Stonecarving => "stonecarving",
            TechType::Herding => "herding",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Study points a tribe must accumulate to unlock the tech.
    pub fn research_cost(self) -> u32 {
        match self {
            TechType::Woodworking => 200,
            TechType::Stonecarving => 400,
            TechType::Herding => 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_tags_and_names_round_trip() {
        for entity_type in EntityType::ALL {
            assert_eq!(EntityType::from_tag(entity_type.tag()), Ok(entity_type));
            assert_eq!(EntityType::from_name(entity_type.name()), Some(entity_type));
        }
        assert!(EntityType::from_tag(0).is_err());
        assert_eq!(EntityType::from_name("dragon"), None);
    }

    #[test]
    fn test_food_values() {
        assert!(ItemType::RawBeef.food_value().is_some());
        assert!(ItemType::Wood.food_value().is_none());
    }

    #[test]
    fn test_biome_lookup() {
        assert_eq!(Biome::from_name("tundra"), Some(Biome::Tundra));
        assert_eq!(Biome::from_name("ocean"), None);
    }
}
