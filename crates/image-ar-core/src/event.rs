use serde::{Deserialize, Serialize};

use crate::WorldMatrix;

/// Notification emitted by the tracking engine.
///
/// The serialized form matches the engine's message shape
/// (`{"type": "updateMatrix", "targetIndex": 0, "worldMatrix": [...]}`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TrackingEvent {
    /// One frame was processed on the main loop.
    #[serde(rename = "processDone")]
    ProcessCycleCompleted,
    /// The background worker finished a matching pass.
    #[serde(rename = "workerDone")]
    WorkerCycleCompleted,
    /// New pose for a target; `None` means the target is not visible.
    #[serde(rename = "updateMatrix", rename_all = "camelCase")]
    PoseUpdate {
        target_index: usize,
        world_matrix: Option<WorldMatrix>,
    },
}

impl TrackingEvent {
    pub fn pose(target_index: usize, world_matrix: Option<WorldMatrix>) -> Self {
        Self::PoseUpdate {
            target_index,
            world_matrix,
        }
    }

    pub fn target_index(&self) -> Option<usize> {
        match self {
            Self::PoseUpdate { target_index, .. } => Some(*target_index),
            _ => None,
        }
    }
}
