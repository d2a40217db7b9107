//! Ray and triangle primitives for the nearest-hit query

use crate::foundation::math::{Mat4, Point3, Vec3};
use crate::scene::NodeId;

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Point3,
    /// The direction of the ray, unit length
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray, normalizing the direction
    ///
    /// Returns `None` for a zero-length direction.
    pub fn new(origin: Point3, direction: Vec3) -> Option<Self> {
        let direction = direction.try_normalize(f32::EPSILON)?;
        Some(Self { origin, direction })
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Point3 {
        self.origin + self.direction * t
    }
}

/// A world-space triangle tagged with the collider it came from
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    /// First vertex, world space
    pub v0: Point3,
    /// Second vertex
    pub v1: Point3,
    /// Third vertex
    pub v2: Point3,
    /// Collider node that owns this triangle
    pub owner: NodeId,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Point3, v1: Point3, v2: Point3, owner: NodeId) -> Self {
        Self { v0, v1, v2, owner }
    }

    /// Copy of this triangle with every vertex transformed by a model matrix
    pub fn transformed(&self, model: &Mat4) -> Self {
        Self {
            v0: model.transform_point(&self.v0),
            v1: model.transform_point(&self.v1),
            v2: model.transform_point(&self.v2),
            owner: self.owner,
        }
    }

    /// Möller-Trumbore ray-triangle intersection
    ///
    /// Returns the distance along the ray. Parallel rays (|det| < epsilon),
    /// barycentrics outside the triangle and hits at `t <= epsilon` are rejected.
    pub fn intersect_ray(&self, ray: &Ray, epsilon: f32) -> Option<f32> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(&edge2);
        let a = edge1.dot(&h);

        // Ray parallel to triangle?
        if a.abs() < epsilon {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * ray.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);
        (t > epsilon).then_some(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use slotmap::KeyData;

    fn owner() -> NodeId {
        NodeId::from(KeyData::from_ffi(1))
    }

    fn facing_triangle(z: f32) -> Triangle {
        Triangle::new(
            Point3::new(-1.0, -1.0, z),
            Point3::new(1.0, -1.0, z),
            Point3::new(0.0, 1.0, z),
            owner(),
        )
    }

    #[test]
    fn test_ray_normalizes_direction() {
        let ray = Ray::new(Point3::origin(), Vec3::new(0.0, 0.0, -5.0)).unwrap();
        assert_relative_eq!(ray.direction.norm(), 1.0);
        assert_relative_eq!(ray.point_at(2.0), Point3::new(0.0, 0.0, -2.0));
    }

    #[test]
    fn test_zero_direction_is_rejected() {
        assert!(Ray::new(Point3::origin(), Vec3::zeros()).is_none());
    }

    #[test]
    fn test_hit_in_front() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0)).unwrap();
        let t = facing_triangle(0.0).intersect_ray(&ray, 1e-6).unwrap();
        assert_relative_eq!(t, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_behind_origin_misses() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 1.0)).unwrap();
        assert!(facing_triangle(0.0).intersect_ray(&ray, 1e-6).is_none());
    }

    #[test]
    fn test_parallel_ray_misses() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert!(facing_triangle(0.0).intersect_ray(&ray, 1e-6).is_none());
    }

    #[test]
    fn test_outside_barycentrics_miss() {
        let ray = Ray::new(Point3::new(5.0, 5.0, 5.0), Vec3::new(0.0, 0.0, -1.0)).unwrap();
        assert!(facing_triangle(0.0).intersect_ray(&ray, 1e-6).is_none());
    }

    #[test]
    fn test_transformed_moves_vertices() {
        let model = Mat4::new_translation(&Vec3::new(0.0, 0.0, -2.0));
        let moved = facing_triangle(0.0).transformed(&model);
        assert_relative_eq!(moved.v0.z, -2.0);
        assert_eq!(moved.owner, owner());
    }
}
