//! # Scene Engine
//!
//! Runtime core of a real-time 3D engine: a typed scene graph kept in sync
//! with a rigid-body simulation, plus a parallel nearest-hit raycaster.
//!
//! ## Features
//!
//! - **Scene Graph**: One component per kind per node, collections for repeats
//! - **Transforms**: Lazily rebuilt model matrices with change notifications
//! - **Physics**: rapier bodies registered and released with the scene tree
//! - **Raycasting**: Nearest triangle hit across every collider, on rayon
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), SceneError> {
//!     let mut scene = SceneGraph::new();
//!     let physics = scene.create(ScenePhysics::default());
//!     let world = scene.spawn_entity([physics])?;
//!
//!     let transform = scene.create(TransformState::new().with_position(Vec3::new(0.0, 5.0, 0.0)));
//!     let mesh = scene.create(Mesh::new(VertexBuffer::unit_cube()));
//!     let collider = scene.create(
//!         ColliderBridge::new(PhysicsMode::Dynamic { mass: 1.0 }).with_shape(ShapeDescriptor::cube()),
//!     );
//!     let crate_ = scene.spawn_entity([transform, mesh, collider])?;
//!     let group = scene.create_collection();
//!     scene.collection_add(group, &[crate_])?;
//!     scene.add_component(world, group)?;
//!
//!     scene.initialize_all(world)?;
//!     scene.advance_frame(world, 1.0 / 60.0)?;
//!
//!     let hit = RaycastEngine::default().cast(
//!         &scene,
//!         world,
//!         Point3::new(0.0, 10.0, 0.0),
//!         Vec3::new(0.0, -1.0, 0.0),
//!     );
//!     println!("{hit:?}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod components;
pub mod config;
pub mod events;
pub mod foundation;
pub mod physics;
pub mod scene;

#[cfg(test)]
mod tests;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        components::{
            Animation, AnimationController, ChangeOrigin, ColliderBridge, Keyframe, Mesh, Name,
            PhysicsMode, TransformChange, TransformState, VertexBuffer,
        },
        config::{Config, EngineConfig, PhysicsConfig, RaycastConfig},
        foundation::math::{Iso3, Mat4, Point3, Quat, Transform, Vec3},
        physics::{PhysicsError, RaycastEngine, RaycastHit, ScenePhysics, ShapeDescriptor},
        scene::{Collection, Component, Entity, NodeId, SceneError, SceneGraph, SceneResult},
    };
}
