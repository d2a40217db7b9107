//! Scene components
//!
//! Payloads carried by scene nodes: spatial state, names, mesh data, physics
//! colliders and keyframe animation.

pub mod animation;
pub mod collider;
pub mod mesh;
pub mod name;
pub mod transform;

pub use animation::{Animation, AnimationController, Keyframe};
pub use collider::{ColliderBridge, PhysicsMode};
pub use mesh::{Mesh, VertexBuffer, FLOATS_PER_TRIANGLE};
pub use name::Name;
pub use transform::{compose_model, ChangeOrigin, TransformChange, TransformField, TransformState};
