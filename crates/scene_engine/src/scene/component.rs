//! Component trait and kind identification

use std::any::{Any, TypeId};
use std::fmt;

use super::{NodeId, SceneGraph, SceneResult};

/// Upcast helper so trait objects can be downcast to their concrete type
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`
    fn as_any(&self) -> &dyn Any;
    /// Borrow as `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Payload carried by a scene node
///
/// A node holds at most one child per component kind. Hooks run with the
/// component moved out of its slot, so they can borrow the whole graph; a
/// hook that looks up its own node sees an empty payload.
pub trait Component: AsAny {
    /// One-shot activation, run when the node first becomes part of an
    /// activated subtree
    fn on_activate(&mut self, scene: &mut SceneGraph, node: NodeId) -> SceneResult<()> {
        let _ = (scene, node);
        Ok(())
    }

    /// One-shot teardown, run before the node is deleted
    fn on_teardown(&mut self, scene: &mut SceneGraph, node: NodeId) {
        let _ = (scene, node);
    }
}

/// Stable identifier for a component type
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentKind {
    id: TypeId,
    name: &'static str,
}

impl ComponentKind {
    /// Kind of the component type `T`
    pub fn of<T: Component>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Underlying type id
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Type name, for diagnostics only
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this is the kind of `T`
    pub fn is<T: Component>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Plain grouping node
#[derive(Debug, Clone, Copy, Default)]
pub struct Entity;

impl Component for Entity {}

/// Ordered list node whose members may share a component kind
#[derive(Debug, Clone, Copy, Default)]
pub struct Collection;

impl Component for Collection {}
