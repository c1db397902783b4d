//! Pointer hit-testing against bounding spheres.

use glam::{Vec2, Vec3};

use crate::camera::{CameraTransform, Ray};

/// What a pick target stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitElementId {
    Particle(usize),
    Node(usize),
    Electrode(usize),
    Nucleus,
    /// The full-screen shader surface.
    Surface,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickShape {
    Sphere { center: Vec3, radius: f32 },
    /// Covers the whole viewport at the given distance from the camera.
    Viewport { distance: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickTarget {
    pub id: HitElementId,
    pub shape: PickShape,
}

impl PickTarget {
    pub fn sphere(id: HitElementId, center: Vec3, radius: f32) -> Self {
        Self {
            id,
            shape: PickShape::Sphere { center, radius },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub id: HitElementId,
    /// Distance along the ray.
    pub distance: f32,
    pub point: Vec3,
}

/// Nearest positive intersection of `ray` with a sphere.
pub fn ray_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    if radius.is_nan() || radius <= 0.0 {
        return None;
    }
    let oc = ray.origin - center;
    let b = oc.dot(ray.direction);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let t0 = -b - root;
    let t1 = -b + root;
    if t0 > 0.0 {
        Some(t0)
    } else if t1 > 0.0 {
        // Ray starts inside the sphere.
        Some(t1)
    } else {
        None
    }
}

/// The closest target under `pointer`, if any.
pub fn pick(pointer: Vec2, camera: &CameraTransform, targets: &[PickTarget]) -> Option<Hit> {
    let ray = camera.screen_to_ray(pointer)?;
    let mut best: Option<Hit> = None;
    for target in targets {
        let t = match target.shape {
            PickShape::Sphere { center, radius } => ray_sphere(&ray, center, radius),
            PickShape::Viewport { distance } => Some(distance.max(0.0)),
        };
        let Some(t) = t else {
            continue;
        };
        if best.map_or(true, |b| t < b.distance) {
            best = Some(Hit {
                id: target.id,
                distance: t,
                point: ray.at(t),
            });
        }
    }
    if let Some(hit) = &best {
        tracing::trace!(id = ?hit.id, distance = hit.distance, "pick hit");
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraConfig, Viewport};

    fn camera() -> CameraTransform {
        CameraTransform::new(CameraConfig::default(), Viewport::new(800, 600))
    }

    #[test]
    fn closest_sphere_wins() {
        let cam = camera();
        let targets = [
            PickTarget::sphere(HitElementId::Node(0), Vec3::new(0.0, 0.0, -2.0), 0.5),
            PickTarget::sphere(HitElementId::Node(1), Vec3::new(0.0, 0.0, 2.0), 0.5),
        ];
        let hit = pick(Vec2::new(400.0, 300.0), &cam, &targets).unwrap();
        assert_eq!(hit.id, HitElementId::Node(1));
        assert!((hit.point.z - 2.5).abs() < 1e-3);
    }

    #[test]
    fn background_misses() {
        let cam = camera();
        let targets = [PickTarget::sphere(
            HitElementId::Electrode(0),
            Vec3::new(2.5, 0.0, 0.0),
            0.08,
        )];
        assert!(pick(Vec2::new(10.0, 10.0), &cam, &targets).is_none());
        assert!(pick(Vec2::new(400.0, 300.0), &cam, &targets).is_none());
        assert!(pick(Vec2::new(900.0, 300.0), &cam, &targets).is_none());
    }

    #[test]
    fn projected_electrode_is_hit() {
        let cam = camera();
        let center = Vec3::new(2.5, 0.2, 0.0);
        let (pixel, _) = cam.project(center).unwrap();
        let targets = [
            PickTarget::sphere(HitElementId::Nucleus, Vec3::ZERO, 0.4),
            PickTarget::sphere(HitElementId::Electrode(3), center, 0.08),
        ];
        let hit = pick(pixel, &cam, &targets).unwrap();
        assert_eq!(hit.id, HitElementId::Electrode(3));
    }

    #[test]
    fn viewport_surface_catches_everything_on_screen() {
        let cam = camera();
        let targets = [PickTarget {
            id: HitElementId::Surface,
            shape: PickShape::Viewport { distance: 10.0 },
        }];
        assert_eq!(
            pick(Vec2::new(1.0, 599.0), &cam, &targets).map(|h| h.id),
            Some(HitElementId::Surface)
        );
        assert!(pick(Vec2::new(1.0, 600.0), &cam, &targets).is_none());
    }

    #[test]
    fn ray_inside_sphere_hits_far_side() {
        let ray = Ray {
            origin: Vec3::ZERO,
            direction: Vec3::X,
        };
        assert_eq!(ray_sphere(&ray, Vec3::ZERO, 1.0), Some(1.0));
        assert_eq!(ray_sphere(&ray, Vec3::new(-5.0, 0.0, 0.0), 1.0), None);
        assert_eq!(ray_sphere(&ray, Vec3::new(5.0, 0.0, 0.0), 0.0), None);
    }
}
