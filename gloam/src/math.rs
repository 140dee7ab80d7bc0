use glam::{Mat4, Vec3};

/// 2D vector type used throughout Gloam.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalized(&self) -> Self {
        let len = self.length();
        if len == 0.0 {
            Self::ZERO
        } else {
            Self::new(self.x / len, self.y / len)
        }
    }

    /// Computes the distance between two points.
    pub fn distance(self, rhs: Self) -> f32 {
        (self - rhs).length()
    }

    /// Angle in radians of the vector pointing from `self` towards `target`.
    pub fn angle_to(self, target: Self) -> f32 {
        (target.y - self.y).atan2(target.x - self.x)
    }

    /// Rotates the vector counter-clockwise around the origin.
    pub fn rotated(self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

impl From<(f32, f32)> for Vec2 {
    fn from(value: (f32, f32)) -> Self {
        Self {
            x: value.0,
            y: value.1,
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Perspective camera looking down the -Z axis at the tile plane.
///
/// `z` is the distance from the plane, so a larger value shows more of the map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec2,
    pub z: f32,
    /// Vertical field of view in radians.
    pub fov_y: f32,
}

impl Camera {
    pub fn new(position: Vec2, z: f32) -> Self {
        Self {
            position,
            z,
            ..Self::default()
        }
    }

    /// Moves the camera along Z, keeping it within `[min, max]`.
    pub fn zoom_by(&mut self, amount: f32, min: f32, max: f32) {
        self.z = (self.z + amount).clamp(min, max);
    }

    pub fn view_projection(&self, width: u32, height: u32) -> Mat4 {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let projection = Mat4::perspective_rh(self.fov_y, aspect, 0.1, 100.0);
        let view = Mat4::from_translation(Vec3::new(-self.position.x, -self.position.y, -self.z));

        projection * view
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            z: 2.0,
            fov_y: std::f32::consts::FRAC_PI_4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rotation_by_quarter_turn_swaps_axes() {
        let v = Vec2::new(1.0, 0.0).rotated(std::f32::consts::FRAC_PI_2);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn angle_to_points_at_target() {
        let angle = Vec2::new(1.0, 1.0).angle_to(Vec2::new(1.0, 5.0));
        assert_relative_eq!(angle, std::f32::consts::FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = Camera::new(Vec2::ZERO, 10.0);
        camera.zoom_by(100.0, 3.0, 25.0);
        assert_eq!(camera.z, 25.0);
        camera.zoom_by(-100.0, 3.0, 25.0);
        assert_eq!(camera.z, 3.0);
    }

    #[test]
    fn camera_centre_projects_to_clip_origin() {
        let camera = Camera::new(Vec2::new(4.0, -6.0), 5.0);
        let clip = camera.view_projection(800, 600) * glam::Vec4::new(4.0, -6.0, 0.0, 1.0);
        assert_relative_eq!(clip.x / clip.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(clip.y / clip.w, 0.0, epsilon = 1e-5);
    }
}
