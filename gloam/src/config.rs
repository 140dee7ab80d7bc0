use std::path::Path;

use serde::Deserialize;

use crate::error::{self, LoadError};

/// Tunables shared by the batch renderer, movement and camera.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Number of quads a batch holds before an implicit flush.
    pub max_quads_per_batch: usize,
    /// Half extent of the movement probe used for tile collision.
    pub player_half_size: f32,
    pub walk_speed: f32,
    /// Speed applied while the probe touches the blocking material.
    pub blocked_speed: f32,
    /// Range of the light left behind by a stationary walker.
    pub player_light_range: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_quads_per_batch: 100,
            player_half_size: 0.5,
            walk_speed: 0.02,
            blocked_speed: 0.010,
            player_light_range: 4.0,
            min_zoom: 3.0,
            max_zoom: 25.0,
        }
    }
}

impl CoreConfig {
    /// Parse and validate a configuration from JSON. Missing fields keep
    /// their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let config = Self::from_json_str(&error::read_to_string(path)?)?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Override the batch capacity.
    #[must_use]
    pub fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.max_quads_per_batch = capacity;
        self
    }

    /// Override the movement probe half size.
    #[must_use]
    pub fn with_player_half_size(mut self, half_size: f32) -> Self {
        self.player_half_size = half_size;
        self
    }

    /// Override the walking and blocked speeds.
    #[must_use]
    pub fn with_speeds(mut self, walk: f32, blocked: f32) -> Self {
        self.walk_speed = walk;
        self.blocked_speed = blocked;
        self
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        if self.max_quads_per_batch == 0 {
            return Err(LoadError::InvalidConfig(
                "max_quads_per_batch must be at least 1".into(),
            ));
        }
        if !is_positive(self.player_half_size) {
            return Err(LoadError::InvalidConfig(format!(
                "player_half_size must be positive, got {}",
                self.player_half_size
            )));
        }
        if !is_positive(self.player_light_range) {
            return Err(LoadError::InvalidConfig(format!(
                "player_light_range must be positive, got {}",
                self.player_light_range
            )));
        }
        if self.min_zoom > self.max_zoom {
            return Err(LoadError::InvalidConfig(format!(
                "min_zoom {} exceeds max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        Ok(())
    }
}

fn is_positive(value: f32) -> bool {
    value > 0.0
}
