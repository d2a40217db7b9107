//! Physics
//!
//! Rigid-body simulation wrapper, declarative collider shapes and the
//! parallel nearest-hit ray query.

pub mod collision;
pub mod raycast;
pub mod shape;
pub mod world;

pub use collision::{Ray, Triangle};
pub use raycast::{RaycastEngine, RaycastHit};
pub use shape::{combine, ShapeDescriptor, ShapeKind};
pub use world::{BodyDesc, BodyHandle, BodyKind, PhysicsWorld, ResyncRequest, WriteBack};

use crate::scene::{Component, NodeId, SceneGraph, SceneResult};

/// Physics world whose write-backs update scene transforms
pub type ScenePhysics = PhysicsWorld<SceneGraph>;

impl Component for ScenePhysics {}

/// Physics errors
#[derive(thiserror::Error, Debug)]
pub enum PhysicsError {
    /// The owner already has a body
    #[error("node {0:?} already owns a physics body")]
    DuplicateOwner(NodeId),

    /// Dynamic mass must be positive and finite
    #[error("invalid mass: {0}")]
    InvalidMass(f32),

    /// A shape could not be built
    #[error("invalid shape: {0}")]
    InvalidShape(String),
}

impl SceneGraph {
    /// Step the physics world attached to `root`, running its write-backs
    /// against this graph
    ///
    /// Returns `Ok(false)` if `root` carries no physics world.
    pub fn step_physics(&mut self, root: NodeId, dt: f32) -> SceneResult<bool> {
        let Some(world) = self.try_get_component::<ScenePhysics>(root) else {
            return Ok(false);
        };
        self.with_component::<ScenePhysics, _>(world, |physics, scene| physics.step(dt, scene))?;
        Ok(true)
    }

    /// One frame of simulation: physics step with write-backs, then animation
    pub fn advance_frame(&mut self, root: NodeId, dt: f32) -> SceneResult<()> {
        if !self.step_physics(root, dt)? {
            log::trace!("no physics world on {root:?}, advancing animations only");
        }
        self.update_animations(root, dt);
        Ok(())
    }

    /// Physics world attached to the root of `node`'s tree
    pub fn physics_of(&self, node: NodeId) -> Option<NodeId> {
        let root = self.root_of(node).ok()?;
        self.try_get_component::<ScenePhysics>(root)
    }
}
