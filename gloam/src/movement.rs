use crate::collision::Resolution;
use crate::config::CoreConfig;
use crate::light::LightRegistry;
use crate::math::Vec2;
use crate::session::Session;

/// A square probe that moves through the tile grid.
///
/// Each step is resolved against the session's collision index before the
/// requested movement is applied. Touching the blocking material slows the
/// walker down for that step.
#[derive(Clone, Debug, PartialEq)]
pub struct Walker {
    pub position: Vec2,
    pub half_size: f32,
    walk_speed: f32,
    blocked_speed: f32,
    light_range: f32,
    speed: f32,
    previous: Vec2,
}

impl Walker {
    pub fn new(position: Vec2, config: &CoreConfig) -> Self {
        Self {
            position,
            half_size: config.player_half_size,
            walk_speed: config.walk_speed,
            blocked_speed: config.blocked_speed,
            light_range: config.player_light_range,
            speed: config.walk_speed,
            previous: position,
        }
    }

    /// Spawn at the session's spawn point.
    pub fn spawn(session: &Session, config: &CoreConfig) -> Self {
        Self::new(session.spawn, config)
    }

    /// Speed used by the last step.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Whether the position changed since the last [`update_light`](Self::update_light).
    pub fn moved(&self) -> bool {
        self.position != self.previous
    }

    /// Resolve collisions at the current position, then move along
    /// `direction`. A zero direction only applies the collision correction.
    pub fn step(&mut self, session: &Session, direction: Vec2) -> Resolution {
        let resolution =
            session
                .tiles
                .query_and_resolve(self.position, self.half_size, &session.pass_set);
        self.position += resolution.delta;
        self.speed = if resolution.blocked {
            self.blocked_speed
        } else {
            self.walk_speed
        };
        self.position += direction.normalized() * self.speed;
        resolution
    }

    /// Trailing light: while moving the oldest light fades out, while
    /// standing still a new light is left at the walker's position.
    pub fn update_light(&mut self, lights: &mut LightRegistry) {
        if self.moved() {
            lights.remove_oldest();
        } else {
            lights.add(self.position.x, self.position.y, self.light_range);
        }
        self.previous = self.position;
    }
}
