//! Subtree traversal and typed queries

use super::{Component, NodeId, SceneGraph};
use crate::components::Name;

/// Lazy depth-first walk over a subtree, root first
///
/// Each node is followed by its fixed slots in insertion order, then its
/// collection members.
pub struct Descendants<'a> {
    graph: &'a SceneGraph,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack.extend(self.graph.children(id).rev());
        Some(id)
    }
}

impl SceneGraph {
    /// Walk the subtree rooted at `root`, including `root` itself
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        let stack = if self.contains(root) { vec![root] } else { Vec::new() };
        Descendants { graph: self, stack }
    }

    /// Every node of kind `T` in the subtree, including `root`
    pub fn get_all_in_children<T: Component>(&self, root: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(root).filter(move |id| self.is::<T>(*id))
    }

    /// Every node in the subtree whose [`Name`] component equals `name`
    pub fn get_all_with_name<'a>(&'a self, root: NodeId, name: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(root).filter(move |id| {
            self.component_of::<Name>(*id)
                .is_some_and(|tag| tag.as_str() == name)
        })
    }
}
