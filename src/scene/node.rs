use crate::scene::NodeHandle;
use crate::scene::transform::Transform;
use glam::Affine3A;

/// A minimal scene node containing only hierarchy and transform.
///
/// Names, skin bindings and other attributes live in the [`Scene`]'s
/// component maps, keyed by [`NodeHandle`].
///
/// [`Scene`]: crate::scene::Scene
#[derive(Debug, Clone)]
pub struct Node {
    /// Parent node handle (None for root nodes)
    pub(crate) parent: Option<NodeHandle>,
    /// Child node handles, in insertion order
    pub(crate) children: Vec<NodeHandle>,

    pub transform: Transform,
}

impl Node {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Returns a reference to the world transformation matrix, as of the last
    /// [`Scene::update_matrix_world`](crate::scene::Scene::update_matrix_world).
    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.transform.world_matrix
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}
