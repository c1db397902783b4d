//! Camera, viewport and screen/world conversions.

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

/// Pixel size of the display region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x < self.width as f32 && p.y < self.height as f32
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 10.0),
            target: Vec3::ZERO,
            fov_y_degrees: 50.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// View and projection for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransform {
    pub config: CameraConfig,
    pub viewport: Viewport,
    pub view: Mat4,
    pub proj: Mat4,
    pub view_proj: Mat4,
    inv_view_proj: Mat4,
}

impl CameraTransform {
    pub fn new(config: CameraConfig, viewport: Viewport) -> Self {
        let view = Mat4::look_at_rh(config.position, config.target, Vec3::Y);
        let proj = Mat4::perspective_rh(
            config.fov_y_degrees.to_radians(),
            viewport.aspect(),
            config.near,
            config.far,
        );
        let view_proj = proj * view;
        Self {
            config,
            viewport,
            view,
            proj,
            view_proj,
            inv_view_proj: view_proj.inverse(),
        }
    }

    /// Pixel coordinates (origin top-left) to normalized device coordinates.
    pub fn pixel_to_ndc(&self, pixel: Vec2) -> Vec2 {
        let w = self.viewport.width as f32;
        let h = self.viewport.height as f32;
        Vec2::new(2.0 * pixel.x / w - 1.0, 1.0 - 2.0 * pixel.y / h)
    }

    /// World ray through a pixel, or `None` outside the viewport.
    pub fn screen_to_ray(&self, pixel: Vec2) -> Option<Ray> {
        if !self.viewport.contains(pixel) {
            return None;
        }
        let ndc = self.pixel_to_ndc(pixel);
        // wgpu-style depth range: near plane at 0, far plane at 1.
        let near = self.inv_view_proj * ndc.extend(0.0).extend(1.0);
        let far = self.inv_view_proj * ndc.extend(1.0).extend(1.0);
        let near = near.xyz() / near.w;
        let far = far.xyz() / far.w;
        let direction = (far - near).normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }
        Some(Ray {
            origin: near,
            direction,
        })
    }

    /// World point to pixel coordinates plus NDC depth. `None` behind the camera.
    pub fn project(&self, world: Vec3) -> Option<(Vec2, f32)> {
        let clip = self.view_proj * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        let w = self.viewport.width as f32;
        let h = self.viewport.height as f32;
        Some((
            Vec2::new((ndc.x + 1.0) * 0.5 * w, (1.0 - ndc.y) * 0.5 * h),
            ndc.z,
        ))
    }

    /// Approximate on-screen radius in pixels of a sphere at `world`.
    pub fn projected_radius(&self, world: Vec3, radius: f32) -> f32 {
        let depth = (world - self.config.position).length().max(self.config.near);
        let half_fov = (self.config.fov_y_degrees.to_radians() * 0.5).tan();
        radius / (depth * half_fov) * self.viewport.height as f32 * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_pixel_looks_at_target() {
        let cam = CameraTransform::new(CameraConfig::default(), Viewport::new(800, 600));
        let ray = cam.screen_to_ray(Vec2::new(400.0, 300.0)).unwrap();
        assert!(ray.direction.distance(Vec3::NEG_Z) < 1e-3);
        assert!((ray.origin.x).abs() < 1e-3 && (ray.origin.y).abs() < 1e-3);
    }

    #[test]
    fn project_inverts_screen_to_ray() {
        let cam = CameraTransform::new(CameraConfig::default(), Viewport::new(640, 480));
        let world = Vec3::new(1.5, -0.75, 0.5);
        let (pixel, depth) = cam.project(world).unwrap();
        assert!((0.0..=1.0).contains(&depth));
        let ray = cam.screen_to_ray(pixel).unwrap();
        let t = (world - ray.origin).dot(ray.direction);
        assert!(ray.at(t).distance(world) < 1e-2);
    }

    #[test]
    fn outside_viewport_has_no_ray() {
        let cam = CameraTransform::new(CameraConfig::default(), Viewport::new(100, 100));
        assert!(cam.screen_to_ray(Vec2::new(-1.0, 50.0)).is_none());
        assert!(cam.screen_to_ray(Vec2::new(50.0, 100.0)).is_none());
        assert!(cam.project(Vec3::new(0.0, 0.0, 20.0)).is_none());
    }
}
