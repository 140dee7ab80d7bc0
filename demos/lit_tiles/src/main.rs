use std::time::Duration;

use anyhow::Result;
use gloam::{
    draw_tiles, Camera, CoreConfig, DrawContext, FrameContext, FrameLoop, Game, GraphicsDevice,
    MapData, Palette, Quad, RecordingDevice, Session, TextureCache, TextureHandle, TextureInfo,
    Vec2, Walker, WgpuDevice,
};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
const FRAMES: u64 = 480;
const FRAME_TIME: Duration = Duration::from_millis(16);
const BACKGROUND: [f32; 4] = [0.02, 0.02, 0.03, 1.0];

const MAP: &str = r#"[{
    "type": "room",
    "xsize": 8, "ysize": 6,
    "playerx": 4, "playery": -4,
    "slices": [[
        "11111111",
        "1......1",
        "1..##..1",
        "1......1",
        "1......1",
        "11111111"
    ]],
    "lighting": [
        {"x": 2.0, "y": -2.0, "strength": 5.0},
        {"x": 12.0, "y": -8.0, "strength": 7.0}
    ],
    "passable": ["."]
}]"#;

const PALETTE: &str = r##"{"textures": {"1": "wall", ".": "floor", "#": "crate"}}"##;

const TEXTURES: [(&str, [u8; 3]); 5] = [
    ("wall", [150, 140, 130]),
    ("floor", [90, 70, 50]),
    ("crate", [160, 110, 40]),
    ("player", [220, 60, 60]),
    (gloam::MISSING_TEXTURE, [255, 0, 255]),
];

/// Walks a square around the room, pausing between legs so the trailing
/// light gets a chance to build up.
struct Wanderer {
    walker: Walker,
    palette: Palette,
    textures: TextureCache,
    leg: usize,
    leg_steps: u32,
}

impl Wanderer {
    const LEGS: [Vec2; 8] = [
        Vec2 { x: 1.0, y: 0.0 },
        Vec2 { x: 0.0, y: 0.0 },
        Vec2 { x: 0.0, y: -1.0 },
        Vec2 { x: 0.0, y: 0.0 },
        Vec2 { x: -1.0, y: 0.0 },
        Vec2 { x: 0.0, y: 0.0 },
        Vec2 { x: 0.0, y: 1.0 },
        Vec2 { x: 0.0, y: 0.0 },
    ];
    const STEPS_PER_LEG: u32 = 60;

    fn new(session: &Session, config: &CoreConfig, palette: Palette, textures: TextureCache) -> Self {
        Self {
            walker: Walker::spawn(session, config),
            palette,
            textures,
            leg: 0,
            leg_steps: 0,
        }
    }
}

impl Game for Wanderer {
    fn update(&mut self, ctx: &mut FrameContext) -> Result<()> {
        while ctx.should_run_fixed_update() {
            let direction = Self::LEGS[self.leg];
            let resolution = self.walker.step(ctx.session(), direction);
            if resolution.blocked {
                log::debug!("walker blocked at {:?}", self.walker.position);
            }

            self.leg_steps += 1;
            if self.leg_steps == Self::STEPS_PER_LEG {
                self.leg_steps = 0;
                self.leg = (self.leg + 1) % Self::LEGS.len();
            }
        }
        self.walker.update_light(&mut ctx.session_mut().lights);
        Ok(())
    }

    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<()> {
        draw_tiles(ctx, &self.palette, &self.textures)?;

        if let Some(player) = self.textures.get("player") {
            // Face the first map light, if it is still around.
            let target = ctx
                .session()
                .lights
                .all()
                .first()
                .map_or(self.walker.position + Vec2::new(1.0, 0.0), |light| {
                    light.position
                });
            let quad = Quad::new(player, self.walker.position)
                .with_z(0.1)
                .with_scale(0.5, 0.5);
            ctx.add_quad_facing(&quad, target)?;
        }
        Ok(())
    }
}

fn solid_rgba(color: [u8; 3], size: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let edge = x == 0 || y == 0 || x == size - 1 || y == size - 1;
            let shade = if edge { 2 } else { 1 };
            pixels.extend(color.iter().map(|c| c / shade));
            pixels.push(255);
        }
    }
    pixels
}

fn report<D: GraphicsDevice>(frames: &FrameLoop<D>) {
    let stats = frames.batch_stats();
    let session = frames.context().session();
    log::info!(
        "{} frames: {} quads in {} draw runs ({} implicit flushes), {} lights left",
        frames.context().frame_index(),
        stats.quads_submitted,
        stats.draw_runs,
        stats.implicit_flushes,
        session.lights.len()
    );
}

fn run_on_gpu(mut device: WgpuDevice, config: &CoreConfig, session: Session) -> Result<()> {
    let mut textures = TextureCache::new();
    for (name, color) in TEXTURES {
        textures.load_rgba(&mut device, name, &solid_rgba(color, 16), 16, 16)?;
    }

    let palette = Palette::from_json_str(PALETTE)?;
    let mut game = Wanderer::new(&session, config, palette, textures);
    let mut frames = FrameLoop::new(device, config.clone(), session);
    frames.init(&mut game)?;

    let mut camera = Camera::new(game.walker.position, config.max_zoom);
    for _ in 0..FRAMES {
        camera.position = game.walker.position;
        camera.zoom_by(-0.05, config.min_zoom, config.max_zoom);
        frames.device_mut().set_camera(&camera);
        frames.device_mut().clear(BACKGROUND)?;
        if !frames.run_frame(&mut game, FRAME_TIME)? {
            break;
        }
    }

    report(&frames);
    Ok(())
}

fn run_recorded(config: &CoreConfig, session: Session) -> Result<()> {
    let mut textures = TextureCache::new();
    for (id, (name, _)) in (1..).zip(TEXTURES) {
        textures.insert(name, TextureInfo::new(TextureHandle(id), 16, 16));
    }

    let palette = Palette::from_json_str(PALETTE)?;
    let mut game = Wanderer::new(&session, config, palette, textures);
    let mut frames = FrameLoop::new(RecordingDevice::new(), config.clone(), session);
    frames.init(&mut game)?;
    frames.run(&mut game, FRAME_TIME, FRAMES)?;

    log::info!("recorded {} draw calls", frames.device().draw_calls());
    report(&frames);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = CoreConfig::default();
    let session = Session::from_map(&MapData::from_json_str(MAP)?);

    match WgpuDevice::headless(WIDTH, HEIGHT, config.max_quads_per_batch) {
        Ok(device) => run_on_gpu(device, &config, session),
        Err(err) => {
            log::warn!("No GPU adapter available ({err}), recording draws instead");
            run_recorded(&config, session)
        }
    }
}
