use bytemuck::{Pod, Zeroable};

use crate::math::Vec2;

/// Opaque handle used to reference textures owned by a graphics device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// A texture handle together with the pixel size it was created with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureInfo {
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
}

impl TextureInfo {
    pub fn new(handle: TextureHandle, width: u32, height: u32) -> Self {
        Self {
            handle,
            width,
            height,
        }
    }

    /// Width over height; a zero height is treated as square.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// One vertex as uploaded to the device: position, texture coordinate and tint.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

/// Vertices per quad: two triangles sharing the 0-2 diagonal.
pub const VERTICES_PER_QUAD: usize = 6;

const CORNER_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
const TRIANGLE_CORNERS: [usize; VERTICES_PER_QUAD] = [0, 1, 2, 0, 2, 3];

/// A textured quad to be drawn this frame.
///
/// The quad's half extents are `aspect * scale.x` by `scale.y` world units,
/// so a square texture at unit scale covers two units, one tile pitch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    pub texture: TextureInfo,
    pub position: Vec2,
    pub z: f32,
    /// Rotation in radians around the quad centre.
    pub rotation: f32,
    pub scale: Vec2,
    /// Multiplicative tint applied to the sampled texture color.
    pub tint: [f32; 4],
}

impl Quad {
    pub fn new(texture: TextureInfo, position: Vec2) -> Self {
        Self {
            texture,
            position,
            z: 0.0,
            rotation: 0.0,
            scale: Vec2::new(1.0, 1.0),
            tint: [1.0, 1.0, 1.0, 1.0],
        }
    }

    #[must_use]
    pub fn with_z(mut self, z: f32) -> Self {
        self.z = z;
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale_x: f32, scale_y: f32) -> Self {
        self.scale = Vec2::new(scale_x, scale_y);
        self
    }

    #[must_use]
    pub fn with_tint(mut self, tint: [f32; 4]) -> Self {
        self.tint = tint;
        self
    }

    /// World-space corners, counter-clockwise from bottom-left.
    pub fn corners(&self) -> [Vec2; 4] {
        let half_x = self.texture.aspect_ratio() * self.scale.x;
        let half_y = self.scale.y;
        [
            Vec2::new(-half_x, -half_y),
            Vec2::new(half_x, -half_y),
            Vec2::new(half_x, half_y),
            Vec2::new(-half_x, half_y),
        ]
        .map(|corner| self.position + corner.rotated(self.rotation))
    }

    /// Triangulate into the six vertices uploaded for this quad.
    pub fn vertices(&self) -> [QuadVertex; VERTICES_PER_QUAD] {
        let corners = self.corners();
        TRIANGLE_CORNERS.map(|corner| QuadVertex {
            position: [corners[corner].x, corners[corner].y, self.z],
            uv: CORNER_UVS[corner],
            color: self.tint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn texture(width: u32, height: u32) -> TextureInfo {
        TextureInfo::new(TextureHandle(1), width, height)
    }

    #[test]
    fn corners_scale_with_aspect_ratio() {
        let quad = Quad::new(texture(64, 32), Vec2::new(10.0, 5.0)).with_scale(1.0, 0.5);
        let [bl, br, tr, tl] = quad.corners();
        assert_eq!(bl, Vec2::new(8.0, 4.5));
        assert_eq!(br, Vec2::new(12.0, 4.5));
        assert_eq!(tr, Vec2::new(12.0, 5.5));
        assert_eq!(tl, Vec2::new(8.0, 5.5));
    }

    #[test]
    fn rotation_is_about_the_centre() {
        let quad = Quad::new(texture(16, 16), Vec2::new(2.0, 2.0))
            .with_rotation(std::f32::consts::FRAC_PI_2);
        let [bl, ..] = quad.corners();
        // (-1, -1) rotated a quarter turn is (1, -1).
        assert_relative_eq!(bl.x, 3.0, epsilon = 1e-6);
        assert_relative_eq!(bl.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn vertices_share_the_diagonal_and_tint() {
        let tint = [0.5, 0.25, 1.0, 0.75];
        let quad = Quad::new(texture(8, 8), Vec2::ZERO).with_z(0.3).with_tint(tint);
        let vertices = quad.vertices();
        assert_eq!(vertices[0], vertices[3]);
        assert_eq!(vertices[2], vertices[4]);
        assert_eq!(vertices[5].uv, [0.0, 1.0]);
        assert!(vertices.iter().all(|v| v.color == tint && v.position[2] == 0.3));
    }

    #[test]
    fn zero_height_texture_is_square() {
        assert_eq!(texture(10, 0).aspect_ratio(), 1.0);
    }
}
