use glam::{Affine3A, Quat, Vec3};

/// Transform component.
///
/// Holds a node's position, rotation and scale (TRS) relative to its parent,
/// plus the cached local and world matrices and a dirty flag.
#[derive(Debug, Clone)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,

    pub(crate) local_matrix: Affine3A,
    pub(crate) world_matrix: Affine3A,

    // Shadow state for dirty checking
    last_position: Vec3,
    last_rotation: Quat,
    last_scale: Vec3,
    force_update: bool,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,

            local_matrix: Affine3A::IDENTITY,
            world_matrix: Affine3A::IDENTITY,

            last_position: Vec3::ZERO,
            last_rotation: Quat::IDENTITY,
            last_scale: Vec3::ONE,
            force_update: true,
        }
    }

    #[must_use]
    pub fn from_translation(position: Vec3) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }

    /// Recomputes the local matrix if TRS changed since the last call.
    /// Returns whether anything changed.
    pub fn update_local_matrix(&mut self) -> bool {
        let changed = self.position != self.last_position
            || self.rotation != self.last_rotation
            || self.scale != self.last_scale
            || self.force_update;

        if changed {
            self.local_matrix =
                Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position);
            self.last_position = self.position;
            self.last_rotation = self.rotation;
            self.last_scale = self.scale;
            self.force_update = false;
        }

        changed
    }

    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> &Affine3A {
        &self.local_matrix
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.world_matrix
    }

    #[inline]
    #[must_use]
    pub fn world_position(&self) -> Vec3 {
        self.world_matrix.translation.into()
    }

    pub fn set_world_matrix(&mut self, mat: Affine3A) {
        self.world_matrix = mat;
    }

    /// Forces the next `update_local_matrix` to recompute.
    pub fn mark_dirty(&mut self) {
        self.force_update = true;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
