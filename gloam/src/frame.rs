use std::time::Duration;

use anyhow::Result;

use crate::assets::{Palette, TextureCache};
use crate::config::CoreConfig;
use crate::math::Vec2;
use crate::render::{BatchStats, GraphicsDevice, Quad, QuadBatch};
use crate::session::Session;

/// Depth tiles are drawn at.
pub const TILE_Z: f32 = 0.0001;

/// Shared state handed to game code during the update phase.
pub struct FrameContext {
    delta_time: Duration,
    elapsed_time: Duration,
    fixed_delta_time: Duration,
    fixed_time_accumulator: Duration,
    frame_index: u64,
    exit_requested: bool,
    config: CoreConfig,
    session: Session,
}

impl FrameContext {
    pub fn new(config: CoreConfig, session: Session) -> Self {
        Self {
            delta_time: Duration::ZERO,
            elapsed_time: Duration::ZERO,
            fixed_delta_time: Duration::from_secs_f64(1.0 / 60.0),
            fixed_time_accumulator: Duration::ZERO,
            frame_index: 0,
            exit_requested: false,
            config,
            session,
        }
    }

    fn begin_frame(&mut self, delta: Duration) {
        self.delta_time = delta;
        self.elapsed_time += delta;
        self.fixed_time_accumulator += delta;
        self.frame_index += 1;
    }

    /// Duration between the current and previous frames.
    pub fn delta_time(&self) -> Duration {
        self.delta_time
    }

    pub fn elapsed_time(&self) -> Duration {
        self.elapsed_time
    }

    /// Number of frames started so far, the current one included.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn fixed_delta_time(&self) -> Duration {
        self.fixed_delta_time
    }

    pub fn set_fixed_delta_time(&mut self, step: Duration) {
        self.fixed_delta_time = step;
    }

    /// Consume one fixed step from the accumulated time.
    ///
    /// Call in a loop until it returns `false`:
    ///
    /// ```ignore
    /// while ctx.should_run_fixed_update() {
    ///     walker.step(ctx.session(), direction);
    /// }
    /// ```
    pub fn should_run_fixed_update(&mut self) -> bool {
        if self.fixed_delta_time > Duration::ZERO
            && self.fixed_time_accumulator >= self.fixed_delta_time
        {
            self.fixed_time_accumulator -= self.fixed_delta_time;
            true
        } else {
            false
        }
    }

    /// How far between two fixed steps the current frame is, in `[0, 1]`.
    pub fn fixed_update_alpha(&self) -> f32 {
        if self.fixed_delta_time.as_secs_f32() > 0.0 {
            (self.fixed_time_accumulator.as_secs_f32() / self.fixed_delta_time.as_secs_f32())
                .min(1.0)
        } else {
            0.0
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }
}

/// Handed to [`Game::draw`]. Quads added here are rendered at the end of
/// the frame; a full batch is flushed early.
pub struct DrawContext<'a> {
    batch: &'a mut QuadBatch,
    device: &'a mut dyn GraphicsDevice,
    frame: &'a FrameContext,
}

impl<'a> DrawContext<'a> {
    pub fn new(
        batch: &'a mut QuadBatch,
        device: &'a mut dyn GraphicsDevice,
        frame: &'a FrameContext,
    ) -> Self {
        Self {
            batch,
            device,
            frame,
        }
    }

    pub fn frame(&self) -> &FrameContext {
        self.frame
    }

    pub fn session(&self) -> &Session {
        &self.frame.session
    }

    pub fn add_quad(&mut self, quad: &Quad) -> Result<()> {
        self.batch.add_quad(&mut *self.device, quad)
    }

    pub fn add_quad_facing(&mut self, quad: &Quad, target: Vec2) -> Result<()> {
        self.batch.add_quad_facing(&mut *self.device, quad, target)
    }

    /// Add a quad tinted by the session's lights.
    pub fn add_quad_lit(&mut self, quad: &Quad) -> Result<()> {
        self.batch
            .add_quad_lit(&mut *self.device, quad, self.frame.session.lights.all())
    }
}

/// Trait implemented by user code to hook into the frame loop.
pub trait Game {
    /// Called once before the first frame.
    fn init(&mut self, _ctx: &mut FrameContext) -> Result<()> {
        Ok(())
    }

    /// Move things and mutate the session. Runs before drawing.
    fn update(&mut self, ctx: &mut FrameContext) -> Result<()>;

    /// Queue the quads of this frame.
    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<()>;
}

/// Drives a [`Game`] one frame at a time against a graphics device.
///
/// Every frame runs the update phase to completion before the batch is
/// re-armed, filled by [`Game::draw`] and rendered with blending enabled.
pub struct FrameLoop<D: GraphicsDevice> {
    ctx: FrameContext,
    batch: QuadBatch,
    device: D,
}

impl<D: GraphicsDevice> FrameLoop<D> {
    pub fn new(device: D, config: CoreConfig, session: Session) -> Self {
        let batch = QuadBatch::new(config.max_quads_per_batch);
        Self {
            ctx: FrameContext::new(config, session),
            batch,
            device,
        }
    }

    pub fn init<G: Game>(&mut self, game: &mut G) -> Result<()> {
        game.init(&mut self.ctx)
    }

    /// Run one frame. Returns `false` once the game requested exit.
    pub fn run_frame<G: Game>(&mut self, game: &mut G, delta: Duration) -> Result<bool> {
        self.ctx.begin_frame(delta);
        game.update(&mut self.ctx)?;

        self.batch.begin_batch();
        game.draw(&mut DrawContext::new(
            &mut self.batch,
            &mut self.device,
            &self.ctx,
        ))?;

        self.batch.set_blending_enabled(&mut self.device, true);
        let rendered = self.batch.render_batch(&mut self.device);
        self.batch.set_blending_enabled(&mut self.device, false);
        rendered?;

        Ok(!self.ctx.exit_requested)
    }

    /// Run frames with a fixed `delta` until the game exits or `max_frames`
    /// have run. Returns the number of frames run.
    pub fn run<G: Game>(&mut self, game: &mut G, delta: Duration, max_frames: u64) -> Result<u64> {
        let mut frames = 0;
        while frames < max_frames {
            frames += 1;
            if !self.run_frame(game, delta)? {
                break;
            }
        }
        Ok(frames)
    }

    pub fn context(&self) -> &FrameContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut FrameContext {
        &mut self.ctx
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn batch_stats(&self) -> BatchStats {
        self.batch.stats()
    }
}

/// Queue every tile of the session, newest first, lit by the session's
/// lights. Tiles whose texture cannot be resolved are skipped.
///
/// Returns the number of tiles queued.
pub fn draw_tiles(
    ctx: &mut DrawContext<'_>,
    palette: &Palette,
    textures: &TextureCache,
) -> Result<usize> {
    let frame = ctx.frame;
    let mut drawn = 0;
    for tile in frame.session.tiles.tiles().iter().rev() {
        let Some(texture) = palette.resolve(tile.material, textures) else {
            continue;
        };
        let quad = Quad::new(texture, tile.extents.center()).with_z(TILE_Z);
        ctx.add_quad_lit(&quad)?;
        drawn += 1;
    }
    Ok(drawn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RecordingDevice, TextureHandle, TextureInfo};

    struct Counter {
        updates: u32,
        fixed_steps: u32,
    }

    impl Game for Counter {
        fn update(&mut self, ctx: &mut FrameContext) -> Result<()> {
            self.updates += 1;
            while ctx.should_run_fixed_update() {
                self.fixed_steps += 1;
            }
            if self.updates == 3 {
                ctx.request_exit();
            }
            Ok(())
        }

        fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<()> {
            let texture = TextureInfo::new(TextureHandle(1), 8, 8);
            ctx.add_quad(&Quad::new(texture, Vec2::ZERO))
        }
    }

    #[test]
    fn frame_renders_with_blending_on_then_off() {
        let mut frames = FrameLoop::new(RecordingDevice::new(), CoreConfig::default(), Session::new());
        let mut game = Counter {
            updates: 0,
            fixed_steps: 0,
        };
        assert!(frames.run_frame(&mut game, Duration::from_millis(16)).unwrap());

        let device = frames.device();
        assert_eq!(device.draw_calls(), 1);
        assert!(device.runs()[0].blending);
        assert!(!device.blending());
        assert_eq!(frames.context().frame_index(), 1);
    }

    #[test]
    fn run_stops_when_exit_requested() {
        let mut frames = FrameLoop::new(RecordingDevice::new(), CoreConfig::default(), Session::new());
        let mut game = Counter {
            updates: 0,
            fixed_steps: 0,
        };
        let ran = frames.run(&mut game, Duration::from_millis(16), 10).unwrap();
        assert_eq!(ran, 3);
        // Each frame renders its own batch; nothing leaks across frames.
        assert_eq!(frames.device().draw_calls(), 3);
        assert!(frames.device().runs().iter().all(|run| run.quad_count() == 1));
    }

    #[test]
    fn fixed_steps_follow_accumulated_time() {
        let mut frames = FrameLoop::new(RecordingDevice::new(), CoreConfig::default(), Session::new());
        frames
            .context_mut()
            .set_fixed_delta_time(Duration::from_millis(10));
        let mut game = Counter {
            updates: 0,
            fixed_steps: 0,
        };
        frames.run_frame(&mut game, Duration::from_millis(25)).unwrap();
        assert_eq!(game.fixed_steps, 2);
        frames.run_frame(&mut game, Duration::from_millis(5)).unwrap();
        assert_eq!(game.fixed_steps, 3);
        assert_eq!(frames.context().elapsed_time(), Duration::from_millis(30));
    }
}
