//! Scene anchors driven by tracking results.

use std::cell::RefCell;
use std::rc::Rc;

use image_ar_core::{compose_anchor_transform, marker_post_matrix, TargetDimensions, WorldMatrix};
use log::debug;
use nalgebra::Matrix4;

/// Host scene node that an anchor writes into.
pub trait SceneNode {
    fn set_visible(&mut self, visible: bool);

    /// Disable recomposition of the node matrix from position/rotation/scale.
    fn set_matrix_auto_update(&mut self, enabled: bool);

    /// Overwrite the node's local matrix.
    fn set_matrix(&mut self, matrix: Matrix4<f64>);
}

/// Entry points the session calls on a registered anchor.
pub trait Anchor {
    /// Called once target dimensions are known for the anchor's index.
    fn setup_marker(&mut self, dims: TargetDimensions);

    /// Apply a pose, or hide the anchor when `world` is `None`.
    fn update_world_matrix(&mut self, world: Option<&WorldMatrix>);
}

/// Shared handle stored in the session registry.
pub type AnchorHandle = Rc<RefCell<dyn Anchor>>;

/// Anchor bound to one image target.
///
/// The node's matrix is written directly as `world * post`, where `post`
/// rescales the local unit to the physical target width.
#[derive(Debug)]
pub struct ImageTargetAnchor<N> {
    node: N,
    post_matrix: Option<Matrix4<f64>>,
}

impl<N: SceneNode> ImageTargetAnchor<N> {
    pub fn new(mut node: N) -> Self {
        node.set_matrix_auto_update(false);
        Self {
            node,
            post_matrix: None,
        }
    }

    /// Wrap into a shareable handle for registration.
    pub fn into_handle(self) -> Rc<RefCell<Self>>
    where
        N: 'static,
    {
        Rc::new(RefCell::new(self))
    }

    #[inline]
    pub fn node(&self) -> &N {
        &self.node
    }

    #[inline]
    pub fn post_matrix(&self) -> Option<&Matrix4<f64>> {
        self.post_matrix.as_ref()
    }
}

impl<N: SceneNode> Anchor for ImageTargetAnchor<N> {
    fn setup_marker(&mut self, dims: TargetDimensions) {
        self.post_matrix = Some(marker_post_matrix(dims));
    }

    fn update_world_matrix(&mut self, world: Option<&WorldMatrix>) {
        let Some(world) = world else {
            // keep the last transform so tracking resumes where it left off
            self.node.set_visible(false);
            return;
        };
        let Some(post) = self.post_matrix.as_ref() else {
            debug!("pose received before marker setup; keeping anchor hidden");
            self.node.set_visible(false);
            return;
        };

        self.node.set_visible(true);
        self.node.set_matrix(compose_anchor_transform(world, post));
    }
}
