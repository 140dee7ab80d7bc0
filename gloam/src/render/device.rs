use anyhow::Result;

use super::quad::{QuadVertex, TextureHandle, VERTICES_PER_QUAD};

/// A contiguous slice of a batch whose quads share one texture.
#[derive(Clone, Copy, Debug)]
pub struct DrawRun<'a> {
    pub texture: TextureHandle,
    pub vertices: &'a [QuadVertex],
}

impl DrawRun<'_> {
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_QUAD
    }
}

/// The device side of batch submission.
///
/// Implementations upload a run's vertices to device-resident memory and
/// issue exactly one draw for it. Texture handles are not validated by the
/// batch; how an unknown handle renders is up to the device.
pub trait GraphicsDevice {
    fn draw_run(&mut self, run: DrawRun<'_>) -> Result<()>;

    /// Enable or disable alpha blending for subsequent draws.
    fn set_blending(&mut self, enabled: bool);
}

/// What a [`RecordingDevice`] saw for one draw.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedRun {
    pub texture: TextureHandle,
    pub vertices: Vec<QuadVertex>,
    pub blending: bool,
}

impl RecordedRun {
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_QUAD
    }
}

/// Device that keeps every submission in memory instead of drawing.
///
/// Useful for headless runs and for checking draw-call counts.
#[derive(Clone, Debug, Default)]
pub struct RecordingDevice {
    runs: Vec<RecordedRun>,
    blending: bool,
    blending_toggles: usize,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> &[RecordedRun] {
        &self.runs
    }

    /// Number of draw submissions issued so far.
    pub fn draw_calls(&self) -> usize {
        self.runs.len()
    }

    pub fn blending(&self) -> bool {
        self.blending
    }

    pub fn blending_toggles(&self) -> usize {
        self.blending_toggles
    }

    pub fn clear(&mut self) {
        self.runs.clear();
    }
}

impl GraphicsDevice for RecordingDevice {
    fn draw_run(&mut self, run: DrawRun<'_>) -> Result<()> {
        self.runs.push(RecordedRun {
            texture: run.texture,
            vertices: run.vertices.to_vec(),
            blending: self.blending,
        });
        Ok(())
    }

    fn set_blending(&mut self, enabled: bool) {
        self.blending = enabled;
        self.blending_toggles += 1;
    }
}
