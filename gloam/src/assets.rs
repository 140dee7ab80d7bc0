use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{self, LoadError};
use crate::render::{TextureInfo, WgpuDevice};

/// Name of the texture used for material codes the palette does not know.
pub const MISSING_TEXTURE: &str = "missingTexture";

/// Caches loaded textures by name.
#[derive(Clone, Debug, Default)]
pub struct TextureCache {
    textures: HashMap<String, TextureInfo>,
}

impl TextureCache {
    /// Create a new cache with no textures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a texture that was uploaded elsewhere.
    pub fn insert(&mut self, name: impl Into<String>, texture: TextureInfo) {
        self.textures.insert(name.into(), texture);
    }

    /// Upload RGBA8 pixels under `name`, returning the cached texture if the
    /// name was already loaded.
    pub fn load_rgba(
        &mut self,
        device: &mut WgpuDevice,
        name: &str,
        rgba: &[u8],
        width: u32,
        height: u32,
    ) -> anyhow::Result<TextureInfo> {
        if let Some(texture) = self.textures.get(name) {
            return Ok(*texture);
        }

        let texture = device.load_texture_from_rgba(rgba, width, height)?;
        self.textures.insert(name.to_string(), texture);
        Ok(texture)
    }

    /// Decode and upload an encoded image under `name`, returning the cached
    /// texture if the name was already loaded.
    pub fn load_bytes(
        &mut self,
        device: &mut WgpuDevice,
        name: &str,
        bytes: &[u8],
    ) -> anyhow::Result<TextureInfo> {
        if let Some(texture) = self.textures.get(name) {
            return Ok(*texture);
        }

        let texture = device.load_texture_from_bytes(bytes)?;
        self.textures.insert(name.to_string(), texture);
        Ok(texture)
    }

    /// Load every `.png` in `dir`, keyed by file name without extension.
    ///
    /// Returns the number of textures loaded.
    pub fn load_dir(
        &mut self,
        device: &mut WgpuDevice,
        dir: impl AsRef<Path>,
    ) -> anyhow::Result<usize> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|err| anyhow::anyhow!("failed to read {}: {err}", dir.display()))?;

        let mut loaded = 0;
        for entry in entries {
            let path = entry?.path();
            let is_png = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if !is_png || !path.is_file() {
                continue;
            }

            let bytes = std::fs::read(&path)
                .map_err(|err| anyhow::anyhow!("failed to read {}: {err}", path.display()))?;
            let texture = self.load_bytes(device, name, &bytes)?;
            log::debug!(
                "loaded texture {name} ({}x{})",
                texture.width,
                texture.height
            );
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn get(&self, name: &str) -> Option<TextureInfo> {
        self.textures.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.textures.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Forget every cached texture. Device memory is not released.
    pub fn clear(&mut self) {
        self.textures.clear();
    }
}

#[derive(Deserialize)]
struct PaletteFile {
    textures: HashMap<String, String>,
}

/// Maps single-character material codes to texture names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Palette {
    names: HashMap<char, String>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a palette of the form `{"textures": {"1": "wall"}}`.
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let file: PaletteFile = serde_json::from_str(json)?;
        let mut palette = Self::new();
        for (key, name) in file.textures {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(code), None) => palette.insert(code, name),
                _ => {
                    return Err(LoadError::InvalidPalette(format!(
                        "key {key:?} is not a single character"
                    )))
                }
            }
        }
        Ok(palette)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let palette = Self::from_json_str(&error::read_to_string(path)?)?;
        log::debug!(
            "loaded palette with {} entries from {}",
            palette.names.len(),
            path.display()
        );
        Ok(palette)
    }

    pub fn insert(&mut self, code: char, name: impl Into<String>) {
        self.names.insert(code, name.into());
    }

    /// Texture name for `code`, or [`MISSING_TEXTURE`] when unmapped.
    pub fn texture_name(&self, code: char) -> &str {
        self.names.get(&code).map_or(MISSING_TEXTURE, String::as_str)
    }

    /// Look up the texture for `code`, falling back to the missing texture
    /// when either the code or its texture is unknown.
    pub fn resolve(&self, code: char, cache: &TextureCache) -> Option<TextureInfo> {
        let name = self.texture_name(code);
        if let Some(texture) = cache.get(name) {
            return Some(texture);
        }
        log::warn!("Texture not found for material {code:?}: {name}");
        cache.get(MISSING_TEXTURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::TextureHandle;

    fn cache() -> TextureCache {
        let mut cache = TextureCache::new();
        cache.insert("wall", TextureInfo::new(TextureHandle(1), 16, 16));
        cache.insert(MISSING_TEXTURE, TextureInfo::new(TextureHandle(99), 1, 1));
        cache
    }

    #[test]
    fn palette_parses_texture_table() {
        let palette = Palette::from_json_str(r##"{"textures": {"1": "wall", "#": "floor"}}"##)
            .unwrap();
        assert_eq!(palette.texture_name('1'), "wall");
        assert_eq!(palette.texture_name('#'), "floor");
        assert_eq!(palette.texture_name('?'), MISSING_TEXTURE);
    }

    #[test]
    fn multi_character_keys_are_rejected() {
        let err = Palette::from_json_str(r#"{"textures": {"ab": "wall"}}"#).unwrap_err();
        assert!(matches!(err, LoadError::InvalidPalette(_)));
    }

    #[test]
    fn missing_textures_table_is_a_json_error() {
        let err = Palette::from_json_str("{}").unwrap_err();
        assert!(matches!(err, LoadError::Json(_)));
    }

    #[test]
    fn resolve_falls_back_to_missing_texture() {
        let mut palette = Palette::new();
        palette.insert('1', "wall");
        palette.insert('2', "not-loaded");
        let cache = cache();

        assert_eq!(palette.resolve('1', &cache).unwrap().handle, TextureHandle(1));
        assert_eq!(palette.resolve('2', &cache).unwrap().handle, TextureHandle(99));
        assert_eq!(palette.resolve('x', &cache).unwrap().handle, TextureHandle(99));
        assert!(palette.resolve('x', &TextureCache::new()).is_none());
    }

    #[test]
    fn cache_lookup() {
        let mut cache = cache();
        assert_eq!(cache.len(), 2);
        assert!(cache.contains("wall"));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("wall"), None);
    }
}
