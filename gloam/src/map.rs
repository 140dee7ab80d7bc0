//! Map file format.
//!
//! A map is a JSON array of parts. Every non-space character in a part's
//! slices becomes a tile at (row, column), and every entry of `lighting`
//! becomes a point light:
//!
//! ```json
//! [{
//!     "type": "map",
//!     "xsize": 3, "ysize": 2,
//!     "playerx": 2, "playery": -2,
//!     "slices": [["111", "1.1"]],
//!     "lighting": [{"x": 2.0, "y": -2.0, "strength": 6.0}],
//!     "passable": ["."]
//! }]
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{self, LoadError};
use crate::math::Vec2;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct LightDef {
    pub x: f32,
    pub y: f32,
    /// Range of the light, see [`LightSource::range`](crate::light::LightSource::range).
    pub strength: f32,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MapPart {
    /// Free-form label of the part. Not interpreted.
    #[serde(rename = "type")]
    pub kind: String,
    /// Widest row allowed in any layer.
    pub xsize: u32,
    /// Most rows allowed in any layer.
    pub ysize: u32,
    pub playerx: i32,
    pub playery: i32,
    /// Layers of rows; each row is one string, one character per column.
    pub slices: Vec<Vec<String>>,
    pub lighting: Vec<LightDef>,
    /// Materials added to the session's pass-set.
    #[serde(default)]
    pub passable: Vec<char>,
}

/// A fully parsed map, ready to be loaded into a [`Session`](crate::session::Session).
#[derive(Clone, Debug, PartialEq)]
pub struct MapData {
    parts: Vec<MapPart>,
}

impl MapData {
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let parts: Vec<MapPart> = serde_json::from_str(json)?;
        if parts.is_empty() {
            return Err(LoadError::InvalidMap("map has no parts".into()));
        }
        for (index, part) in parts.iter().enumerate() {
            let rows = part.slices.iter().map(Vec::len).max().unwrap_or(0);
            let cols = part
                .slices
                .iter()
                .flatten()
                .map(|row| row.chars().count())
                .max()
                .unwrap_or(0);
            if rows > part.ysize as usize || cols > part.xsize as usize {
                return Err(LoadError::InvalidMap(format!(
                    "part {index} is {cols}x{rows}, larger than its declared {}x{}",
                    part.xsize, part.ysize
                )));
            }
            if i32::try_from(rows).is_err() || i32::try_from(cols).is_err() {
                return Err(LoadError::InvalidMap(format!(
                    "part {index} is too large to index"
                )));
            }
            if let Some(light) = part.lighting.iter().find(|light| {
                !(light.x.is_finite() && light.y.is_finite() && light.strength.is_finite())
            }) {
                return Err(LoadError::InvalidMap(format!(
                    "part {index} has a non-finite light: {light:?}"
                )));
            }
        }
        Ok(Self { parts })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        Self::from_json_str(&error::read_to_string(path)?)
    }

    pub fn parts(&self) -> &[MapPart] {
        &self.parts
    }

    /// Every tile as `(row, col, material)` in load order.
    pub fn tiles(&self) -> impl Iterator<Item = (i32, i32, char)> + '_ {
        self.parts
            .iter()
            .flat_map(|part| part.slices.iter())
            .flat_map(|layer| {
                layer.iter().enumerate().flat_map(|(row, line)| {
                    line.chars()
                        .enumerate()
                        .filter(|(_, material)| *material != ' ')
                        .map(move |(col, material)| (row as i32, col as i32, material))
                })
            })
    }

    /// Lights of the last part. Each part replaces the lighting of the
    /// parts before it.
    pub fn lights(&self) -> impl Iterator<Item = &LightDef> + '_ {
        self.parts.last().into_iter().flat_map(|part| part.lighting.iter())
    }

    pub fn passable(&self) -> impl Iterator<Item = char> + '_ {
        self.parts
            .iter()
            .flat_map(|part| part.passable.iter().copied())
    }

    /// Spawn point. Later parts override earlier ones.
    pub fn spawn(&self) -> Vec2 {
        self.parts
            .last()
            .map_or(Vec2::ZERO, |part| {
                Vec2::new(part.playerx as f32, part.playery as f32)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = r##"[{
        "type": "map",
        "xsize": 3, "ysize": 2,
        "playerx": 2, "playery": -2,
        "slices": [["1 1", "#.1"], [" X"]],
        "lighting": [{"x": 2.0, "y": -2.0, "strength": 6.0}],
        "passable": ["."]
    }]"##;

    const TWO_PARTS: &str = r#"[
        {"type": "ground", "xsize": 2, "ysize": 1, "playerx": 0, "playery": 0,
         "slices": [["11"]],
         "lighting": [{"x": 0.0, "y": 0.0, "strength": 4.0}],
         "passable": [":"]},
        {"type": "upper", "xsize": 1, "ysize": 1, "playerx": 5, "playery": -5,
         "slices": [["2"]],
         "lighting": [{"x": 9.0, "y": -9.0, "strength": 2.0}]}
    ]"#;

    #[test]
    fn tiles_skip_spaces_and_follow_layers() {
        let map = MapData::from_json_str(MAP).unwrap();
        let tiles: Vec<_> = map.tiles().collect();
        assert_eq!(
            tiles,
            vec![
                (0, 0, '1'),
                (0, 2, '1'),
                (1, 0, '#'),
                (1, 1, '.'),
                (1, 2, '1'),
                (0, 1, 'X'),
            ]
        );
    }

    #[test]
    fn lights_spawn_and_passable() {
        let map = MapData::from_json_str(MAP).unwrap();
        let lights: Vec<_> = map.lights().copied().collect();
        assert_eq!(
            lights,
            vec![LightDef {
                x: 2.0,
                y: -2.0,
                strength: 6.0
            }]
        );
        assert_eq!(map.spawn(), Vec2::new(2.0, -2.0));
        assert_eq!(map.passable().collect::<Vec<_>>(), vec!['.']);
    }

    #[test]
    fn later_parts_replace_lighting_but_add_tiles() {
        let map = MapData::from_json_str(TWO_PARTS).unwrap();
        let lights: Vec<_> = map.lights().copied().collect();
        assert_eq!(
            lights,
            vec![LightDef {
                x: 9.0,
                y: -9.0,
                strength: 2.0
            }]
        );
        assert_eq!(map.tiles().count(), 3);
        assert_eq!(map.passable().collect::<Vec<_>>(), vec![':']);
        assert_eq!(map.spawn(), Vec2::new(5.0, -5.0));
    }

    #[test]
    fn rows_wider_than_xsize_are_invalid() {
        let err = MapData::from_json_str(
            r#"[{"type": "map", "xsize": 2, "ysize": 1, "playerx": 0, "playery": 0,
                 "slices": [["111"]], "lighting": []}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidMap(_)));
    }

    #[test]
    fn more_rows_than_ysize_are_invalid() {
        let err = MapData::from_json_str(
            r#"[{"type": "map", "xsize": 1, "ysize": 1, "playerx": 0, "playery": 0,
                 "slices": [["1", "1"]], "lighting": []}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidMap(_)));
    }

    #[test]
    fn passable_defaults_to_empty() {
        let map = MapData::from_json_str(
            r#"[{"type": "map", "xsize": 1, "ysize": 1, "playerx": 0, "playery": 0,
                 "slices": [["1"]], "lighting": []}]"#,
        )
        .unwrap();
        assert_eq!(map.passable().count(), 0);
    }

    #[test]
    fn missing_keys_are_rejected() {
        let err = MapData::from_json_str(r#"[{"type": "map", "xsize": 1}]"#).unwrap_err();
        assert!(matches!(err, LoadError::Json(_)));
    }

    #[test]
    fn empty_map_is_invalid() {
        let err = MapData::from_json_str("[]").unwrap_err();
        assert!(matches!(err, LoadError::InvalidMap(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = MapData::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
