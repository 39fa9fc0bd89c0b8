//! Transform System
//!
//! Propagates local matrices down the hierarchy into world matrices. Kept
//! separate from [`Scene`](crate::scene::Scene) so it only borrows the node
//! storage and the root list.

use glam::Affine3A;
use slotmap::SlotMap;

use crate::scene::NodeHandle;
use crate::scene::node::Node;

/// Updates world matrices for every node reachable from `roots`.
///
/// Iterative (explicit stack) so deep rigs cannot overflow the call stack.
/// Parents are always processed before their children.
pub fn update_hierarchy_iterative(nodes: &mut SlotMap<NodeHandle, Node>, roots: &[NodeHandle]) {
    let mut stack: Vec<(NodeHandle, Affine3A, bool)> = roots
        .iter()
        .rev()
        .map(|&root| (root, Affine3A::IDENTITY, false))
        .collect();

    while let Some((handle, parent_world, parent_changed)) = stack.pop() {
        let Some(node) = nodes.get_mut(handle) else {
            continue;
        };

        let local_changed = node.transform.update_local_matrix();
        let changed = local_changed || parent_changed;
        if changed {
            let world = parent_world * node.transform.local_matrix;
            node.transform.set_world_matrix(world);
        }

        let world = node.transform.world_matrix;
        for &child in node.children.iter().rev() {
            stack.push((child, world, changed));
        }
    }
}

/// Updates a subtree, using the current world matrix of `root`'s parent.
pub fn update_subtree(nodes: &mut SlotMap<NodeHandle, Node>, root: NodeHandle) {
    let parent_world = nodes
        .get(root)
        .and_then(|n| n.parent)
        .and_then(|p| nodes.get(p))
        .map_or(Affine3A::IDENTITY, |p| p.transform.world_matrix);

    if let Some(node) = nodes.get_mut(root) {
        node.transform.mark_dirty();
    } else {
        return;
    }

    let mut stack = vec![(root, parent_world, true)];
    while let Some((handle, parent_world, parent_changed)) = stack.pop() {
        let Some(node) = nodes.get_mut(handle) else {
            continue;
        };
        let changed = node.transform.update_local_matrix() || parent_changed;
        if changed {
            node.transform
                .set_world_matrix(parent_world * node.transform.local_matrix);
        }
        let world = node.transform.world_matrix;
        for &child in &node.children {
            stack.push((child, world, changed));
        }
    }
}
