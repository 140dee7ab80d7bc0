use std::path::Path;

use crate::collision::{CollisionIndex, PassSet};
use crate::error::LoadError;
use crate::light::LightRegistry;
use crate::map::MapData;
use crate::math::Vec2;

/// State owned by the currently loaded map.
///
/// Lights and tiles are mutated during the update phase of a frame and only
/// read while rendering. Loading a map replaces everything at once.
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub lights: LightRegistry,
    pub tiles: CollisionIndex,
    pub pass_set: PassSet,
    pub spawn: Vec2,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: &MapData) -> Self {
        let mut session = Self::new();
        session.load_map(map);
        session
    }

    /// Replace the session contents with `map`.
    pub fn load_map(&mut self, map: &MapData) {
        self.clear();
        for light in map.lights() {
            self.lights.add(light.x, light.y, light.strength);
        }
        for (row, col, material) in map.tiles() {
            self.tiles.add_tile(row, col, material);
        }
        self.pass_set.extend(map.passable());
        self.spawn = map.spawn();

        log::debug!(
            "loaded map: {} tiles, {} lights, spawn ({}, {})",
            self.tiles.len(),
            self.lights.len(),
            self.spawn.x,
            self.spawn.y
        );
    }

    /// Read and parse a map file, then load it.
    ///
    /// The session is left untouched if the file cannot be read or parsed.
    pub fn load_map_file(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let map = MapData::load(path)?;
        self.load_map(&map);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.lights.clear();
        self.tiles.clear();
        self.pass_set.clear();
        self.spawn = Vec2::ZERO;
    }
}
