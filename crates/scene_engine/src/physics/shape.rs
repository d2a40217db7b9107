//! Declarative collider shapes
//!
//! Shapes are described in the entity's local space and turned into native
//! rapier shapes once, at registration time, using the transform's scale.

use rapier3d::prelude::SharedShape;

use super::PhysicsError;
use crate::components::VertexBuffer;
use crate::foundation::math::utils::pose_from_offset;
use crate::foundation::math::{Iso3, Point3, Vec3};

/// Primitive a [`ShapeDescriptor`] builds
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// Unit cube scaled by the entity scale
    Cube,
    /// Y-aligned capsule; not scaled
    Capsule {
        /// Cap radius
        radius: f32,
        /// Length of the cylindrical part
        height: f32,
    },
    /// Raw triangle list scaled per vertex
    Mesh(VertexBuffer),
}

/// One shape with an optional local pose
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDescriptor {
    kind: ShapeKind,
    local: Option<Iso3>,
}

impl ShapeDescriptor {
    /// Unit cube
    pub fn cube() -> Self {
        Self::from_kind(ShapeKind::Cube)
    }

    /// Capsule along Y
    pub fn capsule(radius: f32, height: f32) -> Self {
        Self::from_kind(ShapeKind::Capsule { radius, height })
    }

    /// Raw triangle mesh
    pub fn mesh(vertices: VertexBuffer) -> Self {
        Self::from_kind(ShapeKind::Mesh(vertices))
    }

    fn from_kind(kind: ShapeKind) -> Self {
        Self { kind, local: None }
    }

    /// Builder pattern: Place the shape at an offset, rotated by Euler degrees
    /// about its own centre
    pub fn with_offset(mut self, position: Option<Vec3>, orientation: Option<Vec3>) -> Self {
        self.local = (position.is_some() || orientation.is_some())
            .then(|| pose_from_offset(position, orientation));
        self
    }

    /// Primitive
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Local pose, if any
    pub fn local(&self) -> Option<&Iso3> {
        self.local.as_ref()
    }

    /// Build the native shape
    ///
    /// Meshes become a triangle mesh when `concave` is allowed and a convex
    /// hull otherwise.
    pub fn build(&self, scale: &Vec3, concave: bool) -> Result<SharedShape, PhysicsError> {
        match &self.kind {
            ShapeKind::Cube => {
                let half = scale * 0.5;
                if half.iter().any(|h| !(h.is_finite() && *h > 0.0)) {
                    return Err(PhysicsError::InvalidShape(format!("cube with scale {scale:?}")));
                }
                Ok(SharedShape::cuboid(half.x, half.y, half.z))
            }
            ShapeKind::Capsule { radius, height } => {
                if !(*radius > 0.0 && *height >= 0.0) {
                    return Err(PhysicsError::InvalidShape(format!(
                        "capsule with radius {radius} and height {height}"
                    )));
                }
                Ok(SharedShape::capsule_y(height * 0.5, *radius))
            }
            ShapeKind::Mesh(vertices) => {
                if vertices.is_empty() {
                    return Err(PhysicsError::InvalidShape("empty mesh".to_string()));
                }
                let points: Vec<Point3> = vertices
                    .points()
                    .map(|p| Point3::from(p.coords.component_mul(scale)))
                    .collect();
                if concave {
                    let indices = (0..vertices.triangle_count())
                        .map(|t| {
                            let base = (t * 3) as u32;
                            [base, base + 1, base + 2]
                        })
                        .collect();
                    Ok(SharedShape::trimesh(points, indices))
                } else {
                    SharedShape::convex_hull(&points).ok_or_else(|| {
                        PhysicsError::InvalidShape("mesh has no convex hull".to_string())
                    })
                }
            }
        }
    }
}

/// Combine descriptors into one native shape
///
/// A single descriptor without a local pose is used directly; anything else
/// becomes a compound of convex parts, each at its local pose.
pub fn combine(descriptors: &[ShapeDescriptor], scale: &Vec3, concave: bool) -> Result<SharedShape, PhysicsError> {
    match descriptors {
        [] => Err(PhysicsError::InvalidShape("no shapes to combine".to_string())),
        [single] if single.local.is_none() => single.build(scale, concave),
        many => {
            let parts = many
                .iter()
                .map(|d| Ok((d.local.unwrap_or_else(Iso3::identity), d.build(scale, false)?)))
                .collect::<Result<Vec<_>, PhysicsError>>()?;
            Ok(SharedShape::compound(parts))
        }
    }
}
