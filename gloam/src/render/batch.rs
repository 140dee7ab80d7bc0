use anyhow::Result;

use super::device::{DrawRun, GraphicsDevice};
use super::quad::{Quad, QuadVertex, TextureHandle, VERTICES_PER_QUAD};
use crate::light::{light_level, light_tier, tier_tint, LightSource};
use crate::math::Vec2;

/// A quad that has been triangulated and is waiting for submission.
#[derive(Clone, Debug)]
struct PendingQuad {
    texture: TextureHandle,
    vertices: [QuadVertex; VERTICES_PER_QUAD],
}

/// Counters accumulated since the batch was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Non-empty `render_batch` submissions, implicit ones included.
    pub submissions: usize,
    /// Draw calls issued, one per draw run.
    pub draw_runs: usize,
    /// Flushes triggered by inserting into a full batch.
    pub implicit_flushes: usize,
    pub quads_submitted: usize,
}

/// Accumulates quads for a frame and submits them grouped into draw runs.
///
/// Quads are never reordered: submission order is the only thing deciding
/// which quad ends up on top. Consecutive quads with the same texture form a
/// run and each run costs exactly one draw.
///
/// Adding a quad to a full batch renders the pending quads first, so every
/// `add_quad*` call may submit work to the device.
pub struct QuadBatch {
    capacity: usize,
    pending: Vec<PendingQuad>,
    staging: Vec<QuadVertex>,
    stats: BatchStats,
}

impl QuadBatch {
    /// Create a batch holding up to `capacity` quads. A capacity of zero is
    /// raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            pending: Vec::with_capacity(capacity),
            staging: Vec::with_capacity(capacity * VERTICES_PER_QUAD),
            stats: BatchStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of quads waiting for submission.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    /// Drop all pending quads and staged vertices.
    pub fn begin_batch(&mut self) {
        self.pending.clear();
        self.staging.clear();
    }

    /// Queue a quad with its own rotation and tint.
    pub fn add_quad(&mut self, device: &mut dyn GraphicsDevice, quad: &Quad) -> Result<()> {
        if self.pending.len() >= self.capacity {
            log::debug!(
                "batch full at {} quads, flushing before insert",
                self.pending.len()
            );
            self.render_batch(device)?;
            self.begin_batch();
            self.stats.implicit_flushes += 1;
        }

        self.pending.push(PendingQuad {
            texture: quad.texture.handle,
            vertices: quad.vertices(),
        });
        Ok(())
    }

    /// Queue a quad rotated to face `target`.
    pub fn add_quad_facing(
        &mut self,
        device: &mut dyn GraphicsDevice,
        quad: &Quad,
        target: Vec2,
    ) -> Result<()> {
        let facing = quad.with_rotation(quad.position.angle_to(target));
        self.add_quad(device, &facing)
    }

    /// Queue a quad tinted by the light tier sampled at its four corners.
    /// The quad's own tint is replaced.
    pub fn add_quad_lit(
        &mut self,
        device: &mut dyn GraphicsDevice,
        quad: &Quad,
        lights: &[LightSource],
    ) -> Result<()> {
        let tier = light_tier(light_level(lights, &quad.corners()));
        let lit = quad.with_tint(tier_tint(tier));
        self.add_quad(device, &lit)
    }

    /// Submit every pending quad, one draw per texture run.
    ///
    /// Pending quads are kept until the next [`begin_batch`](Self::begin_batch).
    /// Returns the number of draw runs issued.
    pub fn render_batch(&mut self, device: &mut dyn GraphicsDevice) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let mut runs = 0;
        for run in self.pending.chunk_by(|a, b| a.texture == b.texture) {
            self.staging.clear();
            for quad in run {
                self.staging.extend_from_slice(&quad.vertices);
            }
            log::trace!("draw run: {:?} x{}", run[0].texture, run.len());
            device.draw_run(DrawRun {
                texture: run[0].texture,
                vertices: &self.staging,
            })?;
            runs += 1;
        }

        self.stats.submissions += 1;
        self.stats.draw_runs += runs;
        self.stats.quads_submitted += self.pending.len();
        Ok(runs)
    }

    /// Toggle alpha blending around batch rendering.
    pub fn set_blending_enabled(&self, device: &mut dyn GraphicsDevice, enabled: bool) {
        device.set_blending(enabled);
    }
}
