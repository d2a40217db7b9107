//! Collider bridge between scene entities and physics bodies
//!
//! A `ColliderBridge` registers one body with the physics world found on its
//! scene root when activated, and releases it on teardown. The body mirrors the
//! owning transform in both directions:
//! - After each step, dynamic bodies write their pose back into the transform
//! - User edits to the transform queue a resync that moves the body before the
//!   next step

use crate::events::SubscriptionId;
use crate::foundation::math::{Iso3, Vec3};
use crate::physics::{
    combine, BodyDesc, BodyHandle, BodyKind, ResyncRequest, ScenePhysics, ShapeDescriptor,
};
use crate::scene::{Component, NodeId, SceneError, SceneGraph, SceneResult};

use super::{Mesh, TransformChange, TransformState, VertexBuffer};

/// How the collider takes part in the simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhysicsMode {
    /// Geometry only: raycastable, no body
    None,
    /// Fixed body at the entity pose
    Static,
    /// Simulated body
    Dynamic {
        /// Total mass in kilograms
        mass: f32,
    },
}

impl PhysicsMode {
    fn body_kind(self) -> Option<BodyKind> {
        match self {
            Self::None => None,
            Self::Static => Some(BodyKind::Static),
            Self::Dynamic { mass } => Some(BodyKind::Dynamic { mass }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Registration {
    world: NodeId,
    body: BodyHandle,
    subscription: Option<(NodeId, SubscriptionId)>,
}

/// Per-entity physics registration
#[derive(Debug)]
pub struct ColliderBridge {
    mode: PhysicsMode,
    shapes: Vec<ShapeDescriptor>,
    transform: Option<NodeId>,
    vertices: Option<VertexBuffer>,
    keep_always_active: bool,
    registration: Option<Registration>,
}

impl ColliderBridge {
    /// Collider with no declared shapes
    pub fn new(mode: PhysicsMode) -> Self {
        Self {
            mode,
            shapes: Vec::new(),
            transform: None,
            vertices: None,
            keep_always_active: false,
            registration: None,
        }
    }

    /// Builder pattern: Add a declared shape
    pub fn with_shape(mut self, shape: ShapeDescriptor) -> Self {
        self.shapes.push(shape);
        self
    }

    /// Builder pattern: Add several declared shapes
    pub fn with_shapes(mut self, shapes: impl IntoIterator<Item = ShapeDescriptor>) -> Self {
        self.shapes.extend(shapes);
        self
    }

    /// Builder pattern: Use this transform node instead of discovering one
    pub fn with_transform(mut self, transform: NodeId) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Builder pattern: Use this vertex data instead of a parent mesh's
    pub fn with_vertices(mut self, vertices: VertexBuffer) -> Self {
        self.vertices = Some(vertices);
        self
    }

    /// Builder pattern: Never let the body sleep
    pub fn keep_always_active(mut self, keep: bool) -> Self {
        self.keep_always_active = keep;
        self
    }

    /// Simulation mode
    pub fn mode(&self) -> PhysicsMode {
        self.mode
    }

    /// Declared shapes
    pub fn shapes(&self) -> &[ShapeDescriptor] {
        &self.shapes
    }

    /// Raw triangles, used for ray queries and mesh shapes
    pub fn vertices(&self) -> Option<&VertexBuffer> {
        self.vertices.as_ref()
    }

    /// Live body, if registered
    pub fn body(&self) -> Option<BodyHandle> {
        self.registration.map(|r| r.body)
    }

    /// Transform this collider follows
    ///
    /// The explicit transform if set, else the parent's transform slot, else
    /// (when the parent is a mesh) the mesh parent's transform slot.
    pub fn transform_node(&self, scene: &SceneGraph, node: NodeId) -> Option<NodeId> {
        if let Some(explicit) = self.transform {
            return Some(explicit);
        }
        let parent = scene.parent_of(node)?;
        scene.try_get_component::<TransformState>(parent).or_else(|| {
            if scene.is::<Mesh>(parent) {
                let owner = scene.parent_of(parent)?;
                scene.try_get_component::<TransformState>(owner)
            } else {
                None
            }
        })
    }

    /// Register a body with the root's physics world
    ///
    /// No-op if already registered, if the mode is [`PhysicsMode::None`], or
    /// if the scene root carries no physics world.
    pub fn enable_physics(&mut self, scene: &mut SceneGraph, node: NodeId) -> SceneResult<()> {
        if self.registration.is_some() {
            return Ok(());
        }
        let Some(kind) = self.mode.body_kind() else {
            return Ok(());
        };
        let Some(world) = scene.physics_of(node) else {
            log::debug!("collider {node:?}: no physics world on the scene root, skipping");
            return Ok(());
        };

        let transform = self.transform_node(scene, node);
        let (pose, scale) = transform
            .and_then(|t| scene.get::<TransformState>(t))
            .map_or_else(
                || (Iso3::identity(), Vec3::new(1.0, 1.0, 1.0)),
                |t| (t.rigid_pose(), t.scale()),
            );
        let shape = self.build_shape(&scale, kind == BodyKind::Static)?;

        let mut desc = BodyDesc::new(shape, kind, pose, node)
            .keep_always_active(self.keep_always_active);
        if let Some(t) = transform {
            desc = desc.with_write_back(move |scene: &mut SceneGraph, pose: &Iso3| {
                if let Some(state) = scene.get_mut::<TransformState>(t) {
                    state.apply_physics_pose(pose);
                }
            });
        }

        let Some(physics) = scene.get_mut::<ScenePhysics>(world) else {
            log::warn!("collider {node:?}: physics world is busy, skipping");
            return Ok(());
        };
        let body = physics.create(desc)?;
        let resync = physics.resync_sender();

        let subscription = transform.and_then(|t| {
            let state = scene.get_mut::<TransformState>(t)?;
            let id = state.subscribe(move |change: &TransformChange| {
                if change.moves_body() {
                    // The receiver only goes away with the world, and then
                    // there is no body left to move
                    let _ = resync.send(ResyncRequest { body, pose: change.pose });
                }
            });
            Some((t, id))
        });

        self.registration = Some(Registration {
            world,
            body,
            subscription,
        });
        Ok(())
    }

    /// Release the body, waking everything touching it first
    ///
    /// No-op if not registered.
    pub fn disable_physics(&mut self, scene: &mut SceneGraph, node: NodeId) {
        let Some(registration) = self.registration.take() else {
            return;
        };

        if let Some(physics) = scene.get_mut::<ScenePhysics>(registration.world) {
            let neighbours: Vec<NodeId> = physics.get_all_colliding(node).collect();
            for neighbour in neighbours {
                physics.wake(neighbour);
            }
        }

        if let Some((t, id)) = registration.subscription {
            if let Some(state) = scene.get_mut::<TransformState>(t) {
                state.unsubscribe(id);
            }
        }

        match scene.get_mut::<ScenePhysics>(registration.world) {
            Some(physics) => {
                physics.remove(registration.body);
            }
            None => log::warn!("collider {node:?}: physics world gone before body release"),
        }
    }

    fn build_shape(&self, scale: &Vec3, concave: bool) -> SceneResult<rapier3d::prelude::SharedShape> {
        if self.shapes.is_empty() {
            let vertices = self.vertices.clone().ok_or_else(missing_geometry)?;
            return Ok(ShapeDescriptor::mesh(vertices).build(scale, concave)?);
        }
        Ok(combine(&self.shapes, scale, concave)?)
    }
}

fn missing_geometry() -> SceneError {
    SceneError::StructuralPrecondition(
        "collider has no declared shapes and no vertex data".to_string(),
    )
}

impl Component for ColliderBridge {
    fn on_activate(&mut self, scene: &mut SceneGraph, node: NodeId) -> SceneResult<()> {
        if self.vertices.is_none() {
            self.vertices = scene
                .parent_of(node)
                .and_then(|parent| scene.get::<Mesh>(parent))
                .map(|mesh| mesh.vertices().clone());
        }
        if self.vertices.is_none() && self.shapes.is_empty() {
            return Err(missing_geometry());
        }
        self.enable_physics(scene, node)
    }

    fn on_teardown(&mut self, scene: &mut SceneGraph, node: NodeId) {
        self.disable_physics(scene, node);
    }
}

impl SceneGraph {
    /// Run [`ColliderBridge::enable_physics`] on a collider node
    pub fn enable_physics(&mut self, collider: NodeId) -> SceneResult<()> {
        self.with_component::<ColliderBridge, _>(collider, |bridge, scene| {
            bridge.enable_physics(scene, collider)
        })?
    }

    /// Run [`ColliderBridge::disable_physics`] on a collider node
    pub fn disable_physics(&mut self, collider: NodeId) -> SceneResult<()> {
        self.with_component::<ColliderBridge, _>(collider, |bridge, scene| {
            bridge.disable_physics(scene, collider);
        })
    }
}
