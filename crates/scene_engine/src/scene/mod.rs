//! Scene graph
//!
//! A tree of typed component nodes stored in an arena:
//! - Fixed slots keyed by component kind, one child per kind
//! - Collections with ordered members that may repeat kinds
//! - One-shot activation (`initialize_all`) and bottom-up teardown on delete
//! - Lazy subtree queries by kind or by name

mod component;
mod error;
mod graph;
mod query;

pub use component::{AsAny, Collection, Component, ComponentKind, Entity};
pub use error::{SceneError, SceneResult};
pub use graph::{NodeId, SceneGraph};
pub use query::Descendants;
