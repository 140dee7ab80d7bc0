use crate::math::Vec2;

/// A point light with linear falloff.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightSource {
    /// Position of the light in world coordinates
    pub position: Vec2,
    /// Distance at which the light's contribution reaches zero
    pub range: f32,
}

impl LightSource {
    pub fn new(x: f32, y: f32, range: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            range,
        }
    }

    /// Contribution of this light at `point`, in `[0, 1]`.
    ///
    /// Lights with a non-positive range contribute nothing.
    pub fn contribution(&self, point: Vec2) -> f32 {
        if self.range.is_nan() || self.range <= 0.0 {
            return 0.0;
        }
        (1.0 - point.distance(self.position) / self.range).max(0.0)
    }
}

/// Insertion-ordered collection of the lights in the current map.
///
/// Owned by the [`Session`](crate::session::Session); mutated during the
/// update phase and only read during rendering.
#[derive(Clone, Debug, Default)]
pub struct LightRegistry {
    lights: Vec<LightSource>,
}

impl LightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a light at the end of the registry.
    pub fn add(&mut self, x: f32, y: f32, range: f32) {
        self.lights.push(LightSource::new(x, y, range));
    }

    /// Remove the first light whose fields match exactly.
    ///
    /// Returns `false` and leaves the registry untouched when nothing matches.
    pub fn remove(&mut self, x: f32, y: f32, range: f32) -> bool {
        let target = LightSource::new(x, y, range);
        match self.lights.iter().position(|light| *light == target) {
            Some(index) => {
                self.lights.remove(index);
                true
            }
            None => false,
        }
    }

    /// Evict the oldest light, if any.
    pub fn remove_oldest(&mut self) -> Option<LightSource> {
        if self.lights.is_empty() {
            return None;
        }
        let evicted = self.lights.remove(0);
        log::debug!(
            "evicted light at ({}, {}) range {}",
            evicted.position.x,
            evicted.position.y,
            evicted.range
        );
        Some(evicted)
    }

    /// Read-only view of every light, oldest first.
    pub fn all(&self) -> &[LightSource] {
        &self.lights
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn clear(&mut self) {
        self.lights.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> LightRegistry {
        let mut registry = LightRegistry::new();
        registry.add(0.0, 0.0, 5.0);
        registry.add(1.0, 1.0, 5.0);
        registry.add(2.0, 2.0, 5.0);
        registry
    }

    #[test]
    fn remove_oldest_is_fifo() {
        let mut registry = abc();
        let evicted = registry.remove_oldest().unwrap();
        assert_eq!(evicted, LightSource::new(0.0, 0.0, 5.0));
        assert_eq!(
            registry.all(),
            &[LightSource::new(1.0, 1.0, 5.0), LightSource::new(2.0, 2.0, 5.0)]
        );
    }

    #[test]
    fn remove_oldest_on_empty_is_noop() {
        let mut registry = LightRegistry::new();
        assert!(registry.remove_oldest().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn add_then_remove_restores_size() {
        let mut registry = abc();
        let before = registry.len();
        registry.add(7.0, -3.0, 2.5);
        assert!(registry.remove(7.0, -3.0, 2.5));
        assert_eq!(registry.len(), before);
    }

    #[test]
    fn remove_missing_light_leaves_registry_unchanged() {
        let mut registry = abc();
        let before = registry.all().to_vec();
        assert!(!registry.remove(1.0, 1.0, 4.0));
        assert_eq!(registry.all(), before.as_slice());
    }

    #[test]
    fn remove_takes_first_of_duplicates() {
        let mut registry = LightRegistry::new();
        registry.add(1.0, 1.0, 5.0);
        registry.add(9.0, 9.0, 1.0);
        registry.add(1.0, 1.0, 5.0);
        assert!(registry.remove(1.0, 1.0, 5.0));
        assert_eq!(
            registry.all(),
            &[LightSource::new(9.0, 9.0, 1.0), LightSource::new(1.0, 1.0, 5.0)]
        );
    }

    #[test]
    fn zero_range_contributes_nothing() {
        let light = LightSource::new(0.0, 0.0, 0.0);
        assert_eq!(light.contribution(Vec2::ZERO), 0.0);
    }
}
