//! Gloam - the render and collision core of a small tile-based 2D engine.
//!
//! Quads are batched by texture into as few draw calls as submission order
//! allows, tiles are shaded by quantized point-light tiers, and movement is
//! resolved against a fixed tile grid with a constant nudge.

pub mod assets;
pub mod collision;
pub mod config;
pub mod error;
pub mod frame;
pub mod light;
pub mod map;
pub mod math;
pub mod movement;
pub mod render;
pub mod session;

pub use crate::assets::{Palette, TextureCache, MISSING_TEXTURE};
pub use crate::collision::{CollisionIndex, PassSet, Resolution, Tile, TileExtents, TileId};
pub use crate::config::CoreConfig;
pub use crate::error::LoadError;
pub use crate::frame::{draw_tiles, DrawContext, FrameContext, FrameLoop, Game};
pub use crate::light::{light_level, light_tier, LightRegistry, LightSource};
pub use crate::map::MapData;
pub use crate::math::{Camera, Vec2};
pub use crate::movement::Walker;
pub use crate::render::{
    GraphicsDevice, Quad, QuadBatch, RecordingDevice, TextureHandle, TextureInfo, WgpuDevice,
};
pub use crate::session::Session;
