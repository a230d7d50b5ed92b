// snap-overlay-rs/src/core/spawn.rs

//! Per-stage spawn wrappers
//!
//! Stage overlays expose small entry points that forward to the shared
//! `spawn_pokemon_on_ground` routine with a fixed init-data record baked
//! in. The init data passed by the caller is ignored.

use std::fmt;

/// Opaque RAM handle to a world block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldBlock(pub u32);

/// Opaque RAM handle to a spawn record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectSpawn(pub u32);

/// VRAM address of a static `PokemonInitData` record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PokemonInitData(pub u32);

/// Object created by the spawner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(pub u32);

impl fmt::Display for PokemonInitData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "init@0x{:08X}", self.0)
    }
}

/// Game-side object spawner
pub trait ObjectSpawner {
    fn spawn_pokemon_on_ground(
        &mut self,
        object_id: i32,
        id: u16,
        block: WorldBlock,
        block_b: WorldBlock,
        spawn: ObjectSpawn,
        init_data: PokemonInitData,
    ) -> Option<ObjectHandle>;
}

/// Stage areas whose overlays carry spawn wrappers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnArea {
    Volcano,
    Cave,
}

/// A wrapper entry point bound to one init-data record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSpawnEntry {
    pub area: SpawnArea,
    /// VRAM address of the wrapper inside the stage overlay
    pub entry: u32,
    pub init_data: PokemonInitData,
}

impl StageSpawnEntry {
    /// Forwards to the spawner with the bound init data
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        &self,
        spawner: &mut dyn ObjectSpawner,
        object_id: i32,
        id: u16,
        block: WorldBlock,
        block_b: WorldBlock,
        spawn: ObjectSpawn,
        _init_data: PokemonInitData,
    ) -> Option<ObjectHandle> {
        spawner.spawn_pokemon_on_ground(object_id, id, block, block_b, spawn, self.init_data)
    }
}

const VOLCANO_ENTRIES: [StageSpawnEntry; 2] = [
    StageSpawnEntry {
        area: SpawnArea::Volcano,
        entry: 0x802D_B558,
        init_data: PokemonInitData(0x802E_2710),
    },
    StageSpawnEntry {
        area: SpawnArea::Volcano,
        entry: 0x802D_E34C,
        init_data: PokemonInitData(0x802E_31B0),
    },
];

const CAVE_ENTRIES: [StageSpawnEntry; 3] = [
    StageSpawnEntry {
        area: SpawnArea::Cave,
        entry: 0x802C_10C8,
        init_data: PokemonInitData(0x802C_7040),
    },
    StageSpawnEntry {
        area: SpawnArea::Cave,
        entry: 0x802C_13B4,
        init_data: PokemonInitData(0x802C_714C),
    },
    StageSpawnEntry {
        area: SpawnArea::Cave,
        entry: 0x802C_13EC,
        init_data: PokemonInitData(0x802C_7194),
    },
];

impl SpawnArea {
    pub fn entries(self) -> &'static [StageSpawnEntry] {
        match self {
            SpawnArea::Volcano => &VOLCANO_ENTRIES,
            SpawnArea::Cave => &CAVE_ENTRIES,
        }
    }

    /// Wrapper at a given VRAM entry address
    pub fn entry_at(self, entry: u32) -> Option<&'static StageSpawnEntry> {
        self.entries().iter().find(|e| e.entry == entry)
    }
}
