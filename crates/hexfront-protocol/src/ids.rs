use std::marker::PhantomData;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Data IDs are strings used in YAML files (human-readable, stable across versions)
pub type DataId = String;

/// Runtime IDs are integers compiled at catalog-load (fast, deterministic)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuntimeId<T> {
    pub raw: u16,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> RuntimeId<T> {
    #[inline]
    pub const fn new(raw: u16) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }
}

// Type-safe runtime IDs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionTag;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitTypeTag;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileTypeTag;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactionTag;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceTag;

pub type ActionId = RuntimeId<ActionTag>;
pub type UnitTypeId = RuntimeId<UnitTypeTag>;
pub type TileTypeId = RuntimeId<TileTypeTag>;
pub type FactionId = RuntimeId<FactionTag>;
pub type ResourceId = RuntimeId<ResourceTag>;

/// Entity IDs are generational (safe handles to mutable storage)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    pub index: u32,
    pub generation: u32,
}

impl EntityId {
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self {
            index: (raw >> 32) as u32,
            generation: raw as u32,
        }
    }

    #[inline]
    pub const fn to_raw(self) -> u64 {
        ((self.index as u64) << 32) | (self.generation as u64)
    }
}

impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.to_raw())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = u64::deserialize(deserializer)?;
        Ok(Self::from_raw(raw))
    }
}

pub type UnitId = EntityId;

/// Player ID is a simple index (max 6 players)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u8);
