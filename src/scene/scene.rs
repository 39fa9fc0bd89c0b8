use slotmap::{SecondaryMap, SlotMap};

use crate::scene::node::Node;
use crate::scene::skeleton::{Skeleton, SkinBinding};
use crate::scene::transform_system;
use crate::scene::{NodeHandle, SkeletonKey};

/// Scene graph container.
///
/// `Scene` is the pure data layer shared by the asset loader, the attachment
/// resolver and the animation mixer. Nodes live in a slotmap arena; optional
/// per-node data (names, skin bindings) is stored in secondary maps.
pub struct Scene {
    pub nodes: SlotMap<NodeHandle, Node>,
    pub root_nodes: Vec<NodeHandle>,

    // ==== Components ====
    pub names: SecondaryMap<NodeHandle, String>,
    pub skins: SecondaryMap<NodeHandle, SkinBinding>,

    pub skeleton_pool: SlotMap<SkeletonKey, Skeleton>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root_nodes: Vec::new(),
            names: SecondaryMap::new(),
            skins: SecondaryMap::new(),
            skeleton_pool: SlotMap::with_key(),
        }
    }

    // ========================================================================
    // Node lifecycle
    // ========================================================================

    /// Creates a detached node. It is not a root until attached or added.
    pub fn create_node(&mut self) -> NodeHandle {
        self.nodes.insert(Node::new())
    }

    pub fn create_node_with_name(&mut self, name: &str) -> NodeHandle {
        let handle = self.create_node();
        self.names.insert(handle, name.to_string());
        handle
    }

    /// Adds a node as a scene root.
    pub fn add_node(&mut self, node: Node) -> NodeHandle {
        let handle = self.nodes.insert(node);
        self.root_nodes.push(handle);
        handle
    }

    /// Removes a node and its whole subtree.
    pub fn remove_node(&mut self, handle: NodeHandle) {
        if !self.nodes.contains_key(handle) {
            return;
        }

        self.unlink(handle);

        for node in self.traverse(handle) {
            self.names.remove(node);
            self.skins.remove(node);
            self.nodes.remove(node);
        }
    }

    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    pub fn get_node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    #[must_use]
    pub fn get_name(&self, handle: NodeHandle) -> Option<&str> {
        self.names.get(handle).map(String::as_str)
    }

    pub fn set_name(&mut self, handle: NodeHandle, name: &str) {
        if self.nodes.contains_key(handle) {
            self.names.insert(handle, name.to_string());
        }
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Makes `child` a child of `parent`, detaching it from its previous parent.
    ///
    /// Refuses (and logs) self-attachment and attachments that would create a
    /// cycle. The child's world matrix is recomputed on the next update.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) -> bool {
        if child == parent {
            log::warn!("Cannot attach node to itself!");
            return false;
        }
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            log::error!("attach: node not found");
            return false;
        }
        if self.is_descendant_of(parent, child) {
            log::warn!("attach: refusing to create a cycle");
            return false;
        }

        self.unlink(child);

        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
            c.transform.mark_dirty();
        }
        true
    }

    /// Detaches `child` from its parent and makes it a scene root.
    /// Returns false if the node had no parent.
    pub fn detach(&mut self, child: NodeHandle) -> bool {
        let Some(parent) = self.nodes.get(child).and_then(|n| n.parent) else {
            return false;
        };
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|&c| c != child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = None;
            c.transform.mark_dirty();
        }
        self.root_nodes.push(child);
        true
    }

    /// Removes `handle` from its parent's children or from the root list.
    fn unlink(&mut self, handle: NodeHandle) {
        let old_parent = self.nodes.get(handle).and_then(|n| n.parent);
        if let Some(p) = old_parent {
            if let Some(n) = self.nodes.get_mut(p) {
                n.children.retain(|&c| c != handle);
            }
        } else {
            self.root_nodes.retain(|&r| r != handle);
        }
        if let Some(n) = self.nodes.get_mut(handle) {
            n.parent = None;
        }
    }

    /// True if `node` is `ancestor` or lies below it.
    #[must_use]
    pub fn is_descendant_of(&self, node: NodeHandle, ancestor: NodeHandle) -> bool {
        let mut current = Some(node);
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            current = self.nodes.get(handle).and_then(|n| n.parent);
        }
        false
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Pre-order traversal of the subtree rooted at `root` (inclusive).
    #[must_use]
    pub fn traverse(&self, root: NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            let Some(node) = self.nodes.get(handle) else {
                continue;
            };
            out.push(handle);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// First node named `name` in pre-order below (and including) `root`.
    #[must_use]
    pub fn find_node_by_name(&self, root: NodeHandle, name: &str) -> Option<NodeHandle> {
        self.traverse(root)
            .into_iter()
            .find(|&h| self.get_name(h) == Some(name))
    }

    /// First node below `root` carrying a skin binding.
    #[must_use]
    pub fn find_skinned_mesh(&self, root: NodeHandle) -> Option<NodeHandle> {
        self.traverse(root)
            .into_iter()
            .find(|&h| self.skins.contains_key(h))
    }

    // ========================================================================
    // Skeletons
    // ========================================================================

    pub fn add_skeleton(&mut self, skeleton: Skeleton) -> SkeletonKey {
        self.skeleton_pool.insert(skeleton)
    }

    pub fn bind_skeleton(&mut self, mesh_node: NodeHandle, skeleton: SkeletonKey) {
        if self.nodes.contains_key(mesh_node) {
            self.skins.insert(mesh_node, SkinBinding { skeleton });
        }
    }

    #[must_use]
    pub fn skeleton_of(&self, mesh_node: NodeHandle) -> Option<&Skeleton> {
        let binding = self.skins.get(mesh_node)?;
        self.skeleton_pool.get(binding.skeleton)
    }

    // ========================================================================
    // Matrix update pipeline
    // ========================================================================

    /// Updates world matrices of the whole scene. Call once per frame.
    pub fn update_matrix_world(&mut self) {
        transform_system::update_hierarchy_iterative(&mut self.nodes, &self.root_nodes);
    }

    pub fn update_subtree(&mut self, root: NodeHandle) {
        transform_system::update_subtree(&mut self.nodes, root);
    }

    /// Refreshes joint matrices of every bound skeleton.
    pub fn update_skeletons(&mut self) {
        for (mesh_node, binding) in &self.skins {
            let Some(node) = self.nodes.get(mesh_node) else {
                continue;
            };
            let root_inv = node.transform.world_matrix.inverse();
            if let Some(skeleton) = self.skeleton_pool.get_mut(binding.skeleton) {
                skeleton.compute_joint_matrices(&self.nodes, root_inv);
            }
        }
    }

    /// Per-frame scene update: world matrices, then skinning matrices.
    pub fn update(&mut self) {
        self.update_matrix_world();
        self.update_skeletons();
    }
}
