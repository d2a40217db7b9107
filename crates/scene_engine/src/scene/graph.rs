//! Arena-backed scene graph
//!
//! Nodes live in a `SlotMap` and refer to each other by [`NodeId`]. A root's
//! parent is itself. Fixed slots hold at most one child per component kind;
//! collection nodes additionally keep an ordered member list.

use std::any::{type_name, TypeId};
use std::fmt;

use slotmap::SlotMap;

use super::component::{Collection, Component, ComponentKind, Entity};
use super::{SceneError, SceneResult};

slotmap::new_key_type! {
    /// Handle to a node in a [`SceneGraph`]
    pub struct NodeId;
}

struct Node {
    parent: NodeId,
    kind: ComponentKind,
    // `None` while a hook or `with_component` has the payload moved out
    component: Option<Box<dyn Component>>,
    slots: Vec<(TypeId, NodeId)>,
    members: Option<Vec<NodeId>>,
    activated: bool,
    torn_down: bool,
}

impl Node {
    fn children(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.slots
            .iter()
            .map(|(_, id)| *id)
            .chain(self.members.iter().flatten().copied())
    }

    fn slot(&self, kind: TypeId) -> Option<NodeId> {
        self.slots
            .iter()
            .find(|(existing, _)| *existing == kind)
            .map(|(_, id)| *id)
    }
}

/// Tree of typed component nodes
#[derive(Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
}

impl SceneGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an unattached node carrying `component`
    pub fn create<T: Component>(&mut self, component: T) -> NodeId {
        self.insert(Box::new(component), ComponentKind::of::<T>(), None)
    }

    /// Allocate an unattached, empty collection node
    pub fn create_collection(&mut self) -> NodeId {
        self.insert(
            Box::new(Collection),
            ComponentKind::of::<Collection>(),
            Some(Vec::new()),
        )
    }

    /// Allocate a node and attach an initial set of children to its slots
    ///
    /// On a kind conflict, the children attached so far are detached again and
    /// the new node is freed.
    pub fn create_with<T: Component>(
        &mut self,
        component: T,
        children: impl IntoIterator<Item = NodeId>,
    ) -> SceneResult<NodeId> {
        let id = self.create(component);
        for child in children {
            if let Err(err) = self.add_component(id, child) {
                self.dismantle(id);
                return Err(err);
            }
        }
        Ok(id)
    }

    /// Allocate an [`Entity`] grouping node with the given children
    pub fn spawn_entity(&mut self, children: impl IntoIterator<Item = NodeId>) -> SceneResult<NodeId> {
        self.create_with(Entity, children)
    }

    fn insert(
        &mut self,
        component: Box<dyn Component>,
        kind: ComponentKind,
        members: Option<Vec<NodeId>>,
    ) -> NodeId {
        self.nodes.insert_with_key(|id| Node {
            parent: id,
            kind,
            component: Some(component),
            slots: Vec::new(),
            members,
            activated: false,
            torn_down: false,
        })
    }

    fn dismantle(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(id) {
            for child in node.children() {
                if let Some(child_node) = self.nodes.get_mut(child) {
                    child_node.parent = child;
                }
            }
        }
    }

    /// Whether `id` names a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Component kind carried by a node
    pub fn kind(&self, id: NodeId) -> Option<ComponentKind> {
        self.nodes.get(id).map(|node| node.kind)
    }

    /// Whether the node carries a `T`
    pub fn is<T: Component>(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|node| node.kind.is::<T>())
    }

    /// Parent of a node; a root is its own parent
    pub fn parent(&self, id: NodeId) -> SceneResult<NodeId> {
        Ok(self.node(id)?.parent)
    }

    /// Parent of a node, or `None` for roots and unknown ids
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes
            .get(id)
            .and_then(|node| (node.parent != id).then_some(node.parent))
    }

    /// Whether the node is the root of its tree
    pub fn is_root(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|node| node.parent == id)
    }

    /// Root of the tree containing `id`
    pub fn root_of(&self, id: NodeId) -> SceneResult<NodeId> {
        let mut current = id;
        loop {
            let parent = self.node(current)?.parent;
            if parent == current {
                return Ok(current);
            }
            current = parent;
        }
    }

    /// Whether the node's activation hook has run
    pub fn is_activated(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|node| node.activated)
    }

    /// Direct children: fixed slots in insertion order, then collection members
    pub fn children(&self, id: NodeId) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|node| node.children())
    }

    /// Members of a collection node; empty for other nodes
    pub fn members(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .and_then(|node| node.members.as_deref())
            .unwrap_or(&[])
    }

    /// Borrow a node's payload as `T`
    pub fn get<T: Component>(&self, id: NodeId) -> Option<&T> {
        self.nodes
            .get(id)?
            .component
            .as_deref()?
            .as_any()
            .downcast_ref::<T>()
    }

    /// Mutably borrow a node's payload as `T`
    pub fn get_mut<T: Component>(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes
            .get_mut(id)?
            .component
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Child of kind `T` in a node's fixed slots
    pub fn try_get_component<T: Component>(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node)?.slot(TypeId::of::<T>())
    }

    /// Child of kind `T` in a node's fixed slots, failing if absent
    pub fn get_component<T: Component>(&self, node: NodeId) -> SceneResult<NodeId> {
        self.node(node)?;
        self.try_get_component::<T>(node)
            .ok_or(SceneError::ComponentNotFound {
                node,
                kind: type_name::<T>(),
            })
    }

    /// Payload of the `T` child of a node
    pub fn component_of<T: Component>(&self, node: NodeId) -> Option<&T> {
        self.get::<T>(self.try_get_component::<T>(node)?)
    }

    /// Mutable payload of the `T` child of a node
    pub fn component_of_mut<T: Component>(&mut self, node: NodeId) -> Option<&mut T> {
        let child = self.try_get_component::<T>(node)?;
        self.get_mut::<T>(child)
    }

    /// Run `f` with the node's `T` payload moved out, so it can borrow the graph
    pub fn with_component<T: Component, R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut T, &mut Self) -> R,
    ) -> SceneResult<R> {
        let not_found = SceneError::ComponentNotFound {
            node: id,
            kind: type_name::<T>(),
        };
        let node = self.node_mut(id)?;
        if !node.kind.is::<T>() {
            return Err(not_found);
        }
        let mut component = node.component.take().ok_or_else(|| {
            SceneError::StructuralPrecondition(format!(
                "payload of node {id:?} is already borrowed"
            ))
        })?;

        let result = component
            .as_mut()
            .as_any_mut()
            .downcast_mut::<T>()
            .map(|typed| f(typed, self));
        self.restore(id, component);
        result.ok_or(not_found)
    }

    /// Attach `child` to the slot for its kind
    ///
    /// Fails with `ComponentConflict` if the slot is taken. If `parent` is
    /// already activated, the child's subtree is activated immediately.
    pub fn add_component(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        let kind = self.check_attachable(parent, child)?;
        let parent_node = self.node_mut(parent)?;
        if parent_node.slot(kind.type_id()).is_some() {
            return Err(SceneError::ComponentConflict {
                parent,
                kind: kind.name(),
            });
        }
        parent_node.slots.push((kind.type_id(), child));
        let activated = parent_node.activated;
        self.node_mut(child)?.parent = parent;
        log::trace!("attached {kind:?} {child:?} to {parent:?}");

        if activated {
            self.initialize_all(child)?;
        }
        Ok(())
    }

    /// Like [`add_component`](Self::add_component), but a kind conflict
    /// returns `Ok(false)` instead of an error
    pub fn try_add_component(&mut self, parent: NodeId, child: NodeId) -> SceneResult<bool> {
        match self.add_component(parent, child) {
            Ok(()) => Ok(true),
            Err(SceneError::ComponentConflict { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Detach `child` from `parent`'s slots
    ///
    /// With `delete`, the child's subtree is torn down bottom-up and freed;
    /// otherwise the child becomes the root of its own tree.
    pub fn remove_component(&mut self, parent: NodeId, child: NodeId, delete: bool) -> SceneResult<()> {
        let kind = self.node(child)?.kind;
        if self.node(parent)?.slot(kind.type_id()) != Some(child) {
            return Err(SceneError::ComponentNotFound {
                node: parent,
                kind: kind.name(),
            });
        }

        if delete {
            self.teardown_subtree(child);
        }
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.slots.retain(|(_, id)| *id != child);
        }
        self.release(child, delete);
        log::trace!("removed {kind:?} {child:?} from {parent:?} (delete: {delete})");
        Ok(())
    }

    /// Like [`remove_component`](Self::remove_component), but a missing entry
    /// returns `Ok(false)`
    pub fn try_remove_component(&mut self, parent: NodeId, child: NodeId, delete: bool) -> SceneResult<bool> {
        match self.remove_component(parent, child, delete) {
            Ok(()) => Ok(true),
            Err(SceneError::ComponentNotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Append members to a collection; kinds may repeat
    ///
    /// Every child is checked before any is attached, so a failure leaves
    /// the collection unchanged.
    pub fn collection_add(&mut self, collection: NodeId, children: &[NodeId]) -> SceneResult<()> {
        let activated = self.collection_node(collection)?.activated;
        for (i, &child) in children.iter().enumerate() {
            self.check_attachable(collection, child)?;
            if children[..i].contains(&child) {
                return Err(SceneError::StructuralPrecondition(format!(
                    "node {child:?} is listed twice for collection {collection:?}"
                )));
            }
        }

        for &child in children {
            if let Some(members) = self.node_mut(collection)?.members.as_mut() {
                members.push(child);
            }
            self.node_mut(child)?.parent = collection;
        }
        log::trace!("added {} members to {collection:?}", children.len());

        if activated {
            for &child in children {
                self.initialize_all(child)?;
            }
        }
        Ok(())
    }

    /// Remove members from a collection, tearing them down first with `delete`
    ///
    /// Fails without touching any member if one of `children` is not a member.
    pub fn collection_remove(&mut self, collection: NodeId, children: &[NodeId], delete: bool) -> SceneResult<()> {
        let node = self.collection_node(collection)?;
        let members = node.members.as_deref().unwrap_or_default();
        for (i, &child) in children.iter().enumerate() {
            if !members.contains(&child) || children[..i].contains(&child) {
                return Err(SceneError::StructuralPrecondition(format!(
                    "node {child:?} is not a member of collection {collection:?} or is listed twice"
                )));
            }
        }

        for &child in children {
            if delete {
                self.teardown_subtree(child);
            }
            if let Some(members) = self.node_mut(collection)?.members.as_mut() {
                members.retain(|id| *id != child);
            }
            self.release(child, delete);
        }
        Ok(())
    }

    /// Activate every not-yet-activated node of the subtree, parents first
    ///
    /// Children attached by a hook are visited in the same walk. Calling this
    /// again is a no-op for nodes already activated.
    pub fn initialize_all(&mut self, root: NodeId) -> SceneResult<()> {
        self.node(root)?;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            self.activate(id)?;
            stack.extend(self.children(id).rev());
        }
        Ok(())
    }

    fn activate(&mut self, id: NodeId) -> SceneResult<()> {
        let Some(node) = self.nodes.get_mut(id) else {
            return Ok(());
        };
        if node.activated {
            return Ok(());
        }
        node.activated = true;
        let kind = node.kind;
        let Some(mut component) = node.component.take() else {
            return Ok(());
        };

        log::trace!("activating {kind:?} {id:?}");
        let result = component.on_activate(self, id);
        self.restore(id, component);
        result
    }

    fn teardown_subtree(&mut self, id: NodeId) {
        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            self.teardown_subtree(child);
        }

        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if node.torn_down {
            return;
        }
        node.torn_down = true;
        let kind = node.kind;
        let Some(mut component) = node.component.take() else {
            return;
        };

        log::trace!("tearing down {kind:?} {id:?}");
        component.on_teardown(self, id);
        self.restore(id, component);
    }

    fn release(&mut self, child: NodeId, delete: bool) {
        if delete {
            self.free_subtree(child);
        } else if let Some(node) = self.nodes.get_mut(child) {
            node.parent = child;
        }
    }

    fn free_subtree(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(id) {
            for child in node.children() {
                self.free_subtree(child);
            }
        }
    }

    fn restore(&mut self, id: NodeId, component: Box<dyn Component>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.component = Some(component);
        }
    }

    fn check_attachable(&self, parent: NodeId, child: NodeId) -> SceneResult<ComponentKind> {
        self.node(parent)?;
        let child_node = self.node(child)?;
        if child_node.parent != child {
            return Err(SceneError::StructuralPrecondition(format!(
                "node {child:?} is already attached to {:?}",
                child_node.parent
            )));
        }
        if self.root_of(parent)? == child {
            return Err(SceneError::StructuralPrecondition(format!(
                "attaching {child:?} under {parent:?} would create a cycle"
            )));
        }
        Ok(child_node.kind)
    }

    fn collection_node(&self, id: NodeId) -> SceneResult<&Node> {
        let node = self.node(id)?;
        if node.members.is_none() {
            return Err(SceneError::StructuralPrecondition(format!(
                "node {id:?} is not a collection"
            )));
        }
        Ok(node)
    }

    fn node(&self, id: NodeId) -> SceneResult<&Node> {
        self.nodes.get(id).ok_or(SceneError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> SceneResult<&mut Node> {
        self.nodes.get_mut(id).ok_or(SceneError::UnknownNode(id))
    }
}

impl fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneGraph")
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
