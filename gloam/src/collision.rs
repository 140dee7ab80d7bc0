//! Tile collision index.
//!
//! Tiles are stored as axis-aligned boxes on a fixed grid and resolved with a
//! constant nudge rather than exact penetration depth. The imprecision is part
//! of how movement feels against walls, so the resolution order and the
//! per-step constant are kept exactly as they are.

use std::collections::HashSet;

use crate::math::Vec2;

/// Half extent of a tile's collision box. Slightly larger than half the
/// pitch so neighbouring boxes overlap.
pub const TILE_HALF_SIZE: f32 = 1.1;
/// Distance between neighbouring tile centres.
pub const TILE_PITCH: f32 = 2.0;
/// Positional correction applied per overlapping edge test.
pub const NUDGE: f32 = 0.02;
/// Material that marks a probe as hard-blocked.
pub const BLOCKING_MATERIAL: char = '1';

/// Index of a tile in load order.
pub type TileId = usize;

/// World-space box of a tile. Rows grow downwards, so `top > bottom`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileExtents {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
    pub center_x: f32,
    pub center_y: f32,
}

impl TileExtents {
    pub fn from_grid(row: i32, col: i32) -> Self {
        let row = row as f32;
        let col = col as f32;
        Self {
            top: row * -TILE_PITCH + TILE_HALF_SIZE,
            bottom: row * -TILE_PITCH - TILE_HALF_SIZE,
            left: col * TILE_PITCH - TILE_HALF_SIZE,
            right: col * TILE_PITCH + TILE_HALF_SIZE,
            center_x: col * TILE_PITCH,
            center_y: row * -TILE_PITCH,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.center_x, self.center_y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tile {
    pub extents: TileExtents,
    /// Single-character material code from the map.
    pub material: char,
}

/// Materials that never push the probe back (floor markers and the like).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassSet {
    materials: HashSet<char>,
}

impl PassSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the material was not already passable.
    pub fn insert(&mut self, material: char) -> bool {
        self.materials.insert(material)
    }

    pub fn remove(&mut self, material: char) -> bool {
        self.materials.remove(&material)
    }

    pub fn contains(&self, material: char) -> bool {
        self.materials.contains(&material)
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn clear(&mut self) {
        self.materials.clear();
    }
}

impl FromIterator<char> for PassSet {
    fn from_iter<T: IntoIterator<Item = char>>(iter: T) -> Self {
        Self {
            materials: iter.into_iter().collect(),
        }
    }
}

impl Extend<char> for PassSet {
    fn extend<T: IntoIterator<Item = char>>(&mut self, iter: T) {
        self.materials.extend(iter);
    }
}

/// Outcome of a collision query.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Resolution {
    /// Correction to add to the probe position.
    pub delta: Vec2,
    /// The probe touched [`BLOCKING_MATERIAL`]; callers slow movement down.
    pub blocked: bool,
}

/// Static tile boxes of the loaded map, queried every movement step.
#[derive(Clone, Debug, Default)]
pub struct CollisionIndex {
    tiles: Vec<Tile>,
}

impl CollisionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tile at grid `(row, col)`. Duplicates are kept.
    pub fn add_tile(&mut self, row: i32, col: i32, material: char) -> TileId {
        self.tiles.push(Tile {
            extents: TileExtents::from_grid(row, col),
            material,
        });
        self.tiles.len() - 1
    }

    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id)
    }

    /// All tiles in load order.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    /// Resolve a square probe against every tile, newest first.
    pub fn query_and_resolve(&self, probe: Vec2, half_size: f32, pass: &PassSet) -> Resolution {
        resolve(probe, half_size, pass, self.tiles.iter().rev())
    }

    /// Resolve a probe against a subset of tiles, visited from the end of
    /// `ids` to the start. Unknown ids are skipped.
    pub fn query_and_resolve_ids(
        &self,
        ids: &[TileId],
        probe: Vec2,
        half_size: f32,
        pass: &PassSet,
    ) -> Resolution {
        let tiles: Vec<&Tile> = ids
            .iter()
            .rev()
            .filter_map(|&id| {
                let tile = self.tiles.get(id);
                if tile.is_none() {
                    log::warn!(
                        "skipping tile id {id} during collision query ({} tiles loaded)",
                        self.tiles.len()
                    );
                }
                tile
            })
            .collect();
        resolve(probe, half_size, pass, tiles.into_iter())
    }
}

fn resolve<'a, I>(probe: Vec2, half_size: f32, pass: &PassSet, tiles: I) -> Resolution
where
    I: Iterator<Item = &'a Tile> + Clone,
{
    let mut resolution = Resolution::default();
    for step in [1.0_f32, 0.0, -1.0] {
        let k = step * half_size;
        for tile in tiles.clone() {
            nudge_against(tile, probe, k, pass, &mut resolution);
        }
    }
    resolution
}

/// Runs the four edge tests of one tile against the probe offset by `k` on
/// both axes. Every test sees the corrections made by the previous ones.
///
/// The right-half test accepts a probe level with the centre row while the
/// left-half test does not, so a probe sitting on a centre line is always
/// pushed towards +x and sticks differently against left and right corners.
fn nudge_against(tile: &Tile, probe: Vec2, k: f32, pass: &PassSet, out: &mut Resolution) {
    let e = &tile.extents;
    let at = |out: &Resolution| (probe.x + out.delta.x + k, probe.y + out.delta.y + k);

    // Upper half pushes up.
    let (x, y) = at(out);
    if y <= e.top && y >= e.center_y && in_left_or_right_half(x, e) {
        push(tile, pass, out, Vec2::new(0.0, NUDGE));
    }

    // Lower half pushes down.
    let (x, y) = at(out);
    if y >= e.bottom && y <= e.center_y && in_left_or_right_half(x, e) {
        push(tile, pass, out, Vec2::new(0.0, -NUDGE));
    }

    // Right half pushes right.
    let (x, y) = at(out);
    if x <= e.right
        && x >= e.center_x
        && ((y >= e.bottom && !(y > e.center_y)) || (y <= e.top && !(y <= e.center_y)))
    {
        push(tile, pass, out, Vec2::new(NUDGE, 0.0));
    }

    // Left half pushes left.
    let (x, y) = at(out);
    if x >= e.left
        && x <= e.center_x
        && ((y >= e.bottom && !(y >= e.center_y)) || (y <= e.top && !(y <= e.center_y)))
    {
        push(tile, pass, out, Vec2::new(-NUDGE, 0.0));
    }
}

/// Strictly left or strictly right of the centre column; the column itself
/// matches neither.
fn in_left_or_right_half(x: f32, e: &TileExtents) -> bool {
    (x >= e.left && !(x >= e.center_x)) || (x <= e.right && !(x <= e.center_x))
}

fn push(tile: &Tile, pass: &PassSet, out: &mut Resolution, nudge: Vec2) {
    if pass.contains(tile.material) {
        return;
    }
    out.delta += nudge;
    if tile.material == BLOCKING_MATERIAL {
        out.blocked = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn extents_follow_grid_constants() {
        let mut index = CollisionIndex::new();
        let id = index.add_tile(2, 3, 'X');
        let e = index.get(id).unwrap().extents;
        assert_relative_eq!(e.top, -2.9, epsilon = 1e-6);
        assert_relative_eq!(e.bottom, -5.1, epsilon = 1e-6);
        assert_relative_eq!(e.left, 4.9, epsilon = 1e-6);
        assert_relative_eq!(e.right, 7.1, epsilon = 1e-6);
        assert_relative_eq!(e.center_x, 6.0);
        assert_relative_eq!(e.center_y, -4.0);
    }

    #[test]
    fn add_tile_does_not_deduplicate() {
        let mut index = CollisionIndex::new();
        assert_eq!(index.add_tile(0, 0, '1'), 0);
        assert_eq!(index.add_tile(0, 0, '1'), 1);
        assert_eq!(index.len(), 2);
        index.clear();
        assert!(index.is_empty());
    }

    #[test]
    fn probe_at_blocking_centre_is_blocked() {
        let mut index = CollisionIndex::new();
        index.add_tile(2, 3, BLOCKING_MATERIAL);
        let centre = Vec2::new(6.0, -4.0);

        let hit = index.query_and_resolve(centre, 0.5, &PassSet::new());
        assert!(hit.blocked);
        assert_ne!(hit.delta, Vec2::ZERO);
    }

    #[test]
    fn passable_material_is_ignored() {
        let mut index = CollisionIndex::new();
        index.add_tile(2, 3, BLOCKING_MATERIAL);
        let pass: PassSet = [BLOCKING_MATERIAL].into_iter().collect();

        let hit = index.query_and_resolve(Vec2::new(6.0, -4.0), 0.5, &pass);
        assert!(!hit.blocked);
        assert_eq!(hit.delta, Vec2::ZERO);
    }

    #[test]
    fn other_solid_materials_nudge_without_blocking() {
        let mut index = CollisionIndex::new();
        index.add_tile(0, 0, '#');
        let hit = index.query_and_resolve(Vec2::new(0.5, 0.5), 0.25, &PassSet::new());
        assert!(!hit.blocked);
        assert_ne!(hit.delta, Vec2::ZERO);
    }

    #[test]
    fn distant_probe_is_untouched() {
        let mut index = CollisionIndex::new();
        index.add_tile(0, 0, BLOCKING_MATERIAL);
        let hit = index.query_and_resolve(Vec2::new(20.0, 20.0), 0.5, &PassSet::new());
        assert_eq!(hit, Resolution::default());
    }

    // Centre-line ties resolve towards +x first, then +y, a step at a time.
    #[test]
    fn centred_point_probe_drifts_up_and_right() {
        let mut index = CollisionIndex::new();
        index.add_tile(2, 3, BLOCKING_MATERIAL);
        let hit = index.query_and_resolve(Vec2::new(6.0, -4.0), 0.0, &PassSet::new());
        assert!(hit.blocked);
        assert_relative_eq!(hit.delta.x, 3.0 * NUDGE, epsilon = 1e-5);
        assert_relative_eq!(hit.delta.y, 2.0 * NUDGE, epsilon = 1e-5);
    }

    #[test]
    fn nudge_is_constant_regardless_of_depth() {
        let mut index = CollisionIndex::new();
        index.add_tile(0, 0, '#');
        let pass = PassSet::new();
        // Just inside the upper-right quadrant versus deep inside it.
        let shallow = index.query_and_resolve(Vec2::new(1.0, 1.0), 0.0, &pass);
        let deep = index.query_and_resolve(Vec2::new(0.3, 0.3), 0.0, &pass);
        assert_relative_eq!(shallow.delta.x, deep.delta.x, epsilon = 1e-5);
        assert_relative_eq!(shallow.delta.y, deep.delta.y, epsilon = 1e-5);
    }

    #[test]
    fn subset_query_skips_unknown_ids() {
        let mut index = CollisionIndex::new();
        let wall = index.add_tile(2, 3, BLOCKING_MATERIAL);
        index.add_tile(10, 10, '#');
        let probe = Vec2::new(6.0, -4.0);
        let pass = PassSet::new();

        let subset = index.query_and_resolve_ids(&[wall, 99], probe, 0.5, &pass);
        let full = index.query_and_resolve(probe, 0.5, &pass);
        assert_eq!(subset, full);
    }

    #[test]
    fn pass_set_membership() {
        let mut pass = PassSet::new();
        assert!(pass.insert(':'));
        assert!(!pass.insert(':'));
        assert!(pass.contains(':'));
        assert!(pass.remove(':'));
        assert!(pass.is_empty());
    }
}
