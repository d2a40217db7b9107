//! Mesh component and raw vertex data
//!
//! Vertex data arrives from an external loader as a flat `f32` triangle list:
//! three vertices of three coordinates per triangle, no indices.

use std::sync::Arc;

use crate::foundation::math::Point3;
use crate::scene::{Component, NodeId, SceneError, SceneGraph, SceneResult};

use super::{ColliderBridge, PhysicsMode};

/// Floats per triangle in a [`VertexBuffer`]
pub const FLOATS_PER_TRIANGLE: usize = 9;

/// Shared, immutable flat triangle list
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBuffer(Arc<[f32]>);

impl VertexBuffer {
    /// Wrap a flat triangle list; the length must be a multiple of 9
    pub fn new(data: impl Into<Arc<[f32]>>) -> SceneResult<Self> {
        let data = data.into();
        if data.len() % FLOATS_PER_TRIANGLE != 0 {
            return Err(SceneError::StructuralPrecondition(format!(
                "vertex buffer of {} floats is not a whole number of triangles",
                data.len()
            )));
        }
        Ok(Self(data))
    }

    /// Build from triangle corner points
    pub fn from_triangles(triangles: &[[Point3; 3]]) -> Self {
        let data: Vec<f32> = triangles
            .iter()
            .flat_map(|corners| corners.iter().flat_map(|p| [p.x, p.y, p.z]))
            .collect();
        Self(data.into())
    }

    /// Axis-aligned cube of side 1 centred on the origin, 12 triangles
    pub fn unit_cube() -> Self {
        let p = |x: f32, y: f32, z: f32| Point3::new(x * 0.5, y * 0.5, z * 0.5);
        let quad = |a: Point3, b: Point3, c: Point3, d: Point3| [[a, b, c], [a, c, d]];

        let faces = [
            // +Z
            quad(p(-1.0, -1.0, 1.0), p(1.0, -1.0, 1.0), p(1.0, 1.0, 1.0), p(-1.0, 1.0, 1.0)),
            // -Z
            quad(p(1.0, -1.0, -1.0), p(-1.0, -1.0, -1.0), p(-1.0, 1.0, -1.0), p(1.0, 1.0, -1.0)),
            // +X
            quad(p(1.0, -1.0, 1.0), p(1.0, -1.0, -1.0), p(1.0, 1.0, -1.0), p(1.0, 1.0, 1.0)),
            // -X
            quad(p(-1.0, -1.0, -1.0), p(-1.0, -1.0, 1.0), p(-1.0, 1.0, 1.0), p(-1.0, 1.0, -1.0)),
            // +Y
            quad(p(-1.0, 1.0, 1.0), p(1.0, 1.0, 1.0), p(1.0, 1.0, -1.0), p(-1.0, 1.0, -1.0)),
            // -Y
            quad(p(-1.0, -1.0, -1.0), p(1.0, -1.0, -1.0), p(1.0, -1.0, 1.0), p(-1.0, -1.0, 1.0)),
        ];
        let triangles: Vec<[Point3; 3]> = faces.into_iter().flatten().collect();
        Self::from_triangles(&triangles)
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.0.len() / FLOATS_PER_TRIANGLE
    }

    /// Whether the buffer holds no triangles
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw floats
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Every vertex, three per triangle
    pub fn points(&self) -> impl Iterator<Item = Point3> + '_ {
        self.0
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
    }

    /// Triangles as corner triples
    pub fn triangles(&self) -> impl Iterator<Item = [Point3; 3]> + '_ {
        self.0.chunks_exact(FLOATS_PER_TRIANGLE).map(|c| {
            [
                Point3::new(c[0], c[1], c[2]),
                Point3::new(c[3], c[4], c[5]),
                Point3::new(c[6], c[7], c[8]),
            ]
        })
    }
}

/// Renderable geometry attached to an entity
///
/// Rendering is external; the scene keeps the vertex data so colliders and
/// ray queries can use it.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: VertexBuffer,
    /// Skipped by renderers when set
    pub hidden: bool,
    create_collider: bool,
}

impl Mesh {
    /// Mesh over the given vertex data
    pub fn new(vertices: VertexBuffer) -> Self {
        Self {
            vertices,
            hidden: false,
            create_collider: true,
        }
    }

    /// Builder pattern: whether activation adds a non-simulated collider when
    /// the mesh has none
    pub fn with_collider(mut self, create_collider: bool) -> Self {
        self.create_collider = create_collider;
        self
    }

    /// Vertex data
    pub fn vertices(&self) -> &VertexBuffer {
        &self.vertices
    }
}

impl Component for Mesh {
    fn on_activate(&mut self, scene: &mut SceneGraph, node: NodeId) -> SceneResult<()> {
        if !self.create_collider || scene.try_get_component::<ColliderBridge>(node).is_some() {
            return Ok(());
        }

        // Our own payload is moved out during this hook, so the collider
        // gets its vertices directly instead of reading them from the parent
        let collider = scene.create(
            ColliderBridge::new(PhysicsMode::None).with_vertices(self.vertices.clone()),
        );
        log::debug!("mesh {node:?}: adding raycast collider {collider:?}");
        scene.add_component(node, collider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_partial_triangles() {
        assert!(VertexBuffer::new(vec![0.0; 9]).is_ok());
        assert!(matches!(
            VertexBuffer::new(vec![0.0; 10]),
            Err(SceneError::StructuralPrecondition(_))
        ));
    }

    #[test]
    fn test_unit_cube_shape() {
        let cube = VertexBuffer::unit_cube();
        assert_eq!(cube.triangle_count(), 12);
        assert_eq!(cube.points().count(), 36);
        assert!(cube.as_slice().iter().all(|c| (c.abs() - 0.5).abs() < f32::EPSILON));
    }

    #[test]
    fn test_triangles_follow_layout() {
        let buffer = VertexBuffer::new(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]).unwrap();
        let triangles: Vec<_> = buffer.triangles().collect();
        assert_eq!(triangles.len(), 1);
        assert_eq!(triangles[0][1], Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_activation_adds_collider_once() {
        let mut scene = SceneGraph::new();
        let mesh = scene.create(Mesh::new(VertexBuffer::unit_cube()));
        let entity = scene.spawn_entity([mesh]).unwrap();

        scene.initialize_all(entity).unwrap();
        scene.initialize_all(entity).unwrap();

        let collider = scene.get_component::<ColliderBridge>(mesh).unwrap();
        assert!(scene.is_activated(collider));
        assert_eq!(scene.get_all_in_children::<ColliderBridge>(entity).count(), 1);
        assert_eq!(
            scene.get::<ColliderBridge>(collider).unwrap().vertices(),
            Some(&VertexBuffer::unit_cube())
        );
    }

    #[test]
    fn test_activation_respects_opt_out() {
        let mut scene = SceneGraph::new();
        let mesh = scene.create(Mesh::new(VertexBuffer::unit_cube()).with_collider(false));
        let entity = scene.spawn_entity([mesh]).unwrap();

        scene.initialize_all(entity).unwrap();
        assert!(scene.try_get_component::<ColliderBridge>(mesh).is_none());
    }
}
