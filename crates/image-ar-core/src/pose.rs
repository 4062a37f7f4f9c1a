use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};

/// Physical size of an image target, in the engine's world units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetDimensions {
    pub width: f64,
    pub height: f64,
}

impl TargetDimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl From<[f64; 2]> for TargetDimensions {
    fn from([width, height]: [f64; 2]) -> Self {
        Self { width, height }
    }
}

/// Column-major camera-space pose of a recognized target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldMatrix(pub [f64; 16]);

impl WorldMatrix {
    pub fn new(elements: [f64; 16]) -> Self {
        Self(elements)
    }

    pub fn identity() -> Self {
        Self::from_matrix(&Matrix4::identity())
    }

    pub fn from_matrix(m: &Matrix4<f64>) -> Self {
        let mut elements = [0.0; 16];
        elements.copy_from_slice(m.as_slice());
        Self(elements)
    }

    pub fn to_matrix(&self) -> Matrix4<f64> {
        Matrix4::from_column_slice(&self.0)
    }
}

/// Per-anchor adjustment applied after the engine pose.
///
/// Scales the anchor's local unit to the physical target width and moves the
/// origin from the target's top-left corner to its vertical center line.
pub fn marker_post_matrix(dims: TargetDimensions) -> Matrix4<f64> {
    let TargetDimensions { width, height } = dims;
    let translation = Vector3::new(width / 2.0, width / 2.0 + (height - width) / 2.0, 0.0);
    Matrix4::new_nonuniform_scaling(&Vector3::repeat(width)).append_translation(&translation)
}

/// Final scene transform for an anchor: `world * post`.
#[inline]
pub fn compose_anchor_transform(world: &WorldMatrix, post: &Matrix4<f64>) -> Matrix4<f64> {
    world.to_matrix() * post
}
