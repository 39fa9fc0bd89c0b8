use glam::{Affine3A, Mat4};
use slotmap::SlotMap;

use crate::scene::{Node, NodeHandle, SkeletonKey};

/// Attaches a mesh node to a skeleton in the skeleton pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkinBinding {
    pub skeleton: SkeletonKey,
}

/// Runtime skeleton: bone nodes in joint order plus their inverse bind matrices.
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub name: String,

    /// `bones[i]` is joint `i` of the skinned mesh's `JOINTS_0` attribute.
    pub bones: Vec<NodeHandle>,

    /// Transforms vertices from mesh space into each bone's local space.
    pub(crate) inverse_bind_matrices: Vec<Affine3A>,

    pub(crate) root_bone_index: usize,

    /// Final per-joint skinning matrices, refreshed by `compute_joint_matrices`.
    pub(crate) joint_matrices: Vec<Mat4>,
}

impl Skeleton {
    #[must_use]
    pub fn new(
        name: &str,
        bones: Vec<NodeHandle>,
        inverse_bind_matrices: Vec<Affine3A>,
        root_bone_index: usize,
    ) -> Self {
        let count = bones.len();
        Self {
            name: name.to_string(),
            bones,
            inverse_bind_matrices,
            root_bone_index,
            joint_matrices: vec![Mat4::IDENTITY; count],
        }
    }

    #[inline]
    #[must_use]
    pub fn root_bone(&self) -> Option<NodeHandle> {
        self.bones.get(self.root_bone_index).copied()
    }

    #[inline]
    #[must_use]
    pub fn joint_matrices(&self) -> &[Mat4] {
        &self.joint_matrices
    }

    #[inline]
    #[must_use]
    pub fn inverse_bind_matrices(&self) -> &[Affine3A] {
        &self.inverse_bind_matrices
    }

    /// Updates joint matrices from the bones' current world matrices.
    ///
    /// `root_matrix_inv` is the inverse world matrix of the skinned mesh node,
    /// which cancels the mesh's own placement.
    pub fn compute_joint_matrices(
        &mut self,
        nodes: &SlotMap<NodeHandle, Node>,
        root_matrix_inv: Affine3A,
    ) {
        for (i, &bone_handle) in self.bones.iter().enumerate() {
            let Some(bone_node) = nodes.get(bone_handle) else {
                continue;
            };
            let ibm = self
                .inverse_bind_matrices
                .get(i)
                .copied()
                .unwrap_or(Affine3A::IDENTITY);
            // IBM first (mesh -> bone local), then the bone's current world pose.
            self.joint_matrices[i] =
                (root_matrix_inv * bone_node.transform.world_matrix * ibm).into();
        }
    }
}
