//! Dynamic point lights and the tiered light-level function used to tint quads.

mod level;
mod registry;

pub use level::{light_level, light_tier, tier_tint, MAX_TIER, TIER_COLORS};
pub use registry::{LightRegistry, LightSource};
