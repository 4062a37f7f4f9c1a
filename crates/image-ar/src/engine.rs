//! Tracking engine boundary.
//!
//! The engine is an opaque asynchronous service. It is constructed once per
//! session start with the capture size and an [`EventSink`]; everything it
//! reports afterwards flows through that sink as [`TrackingEvent`]s, in order.

use image_ar_core::{FrameSize, ProjectionMatrix, TargetDimensions, TrackingEvent};
use tokio::sync::mpsc;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("failed to load image targets: {0}")]
    TargetLoad(String),
    #[error("warm-up run failed: {0}")]
    WarmUp(String),
}

/// Sending half of the session's event channel.
///
/// Unbounded: every event is delivered, nothing is coalesced or dropped.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<TrackingEvent>,
}

impl EventSink {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<TrackingEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue an event. Returns `false` once the session side is gone.
    pub fn emit(&self, event: TrackingEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Factory for engine instances.
pub trait TrackingBackend {
    type Engine: TrackingEngine;

    fn create_engine(&self, frame: FrameSize, events: EventSink) -> Self::Engine;
}

#[allow(async_fn_in_trait)]
pub trait TrackingEngine {
    /// Video handle the engine reads frames from.
    type Video;

    /// Projection derived from the engine's intrinsic calibration.
    fn projection_matrix(&self) -> ProjectionMatrix;

    /// Load targets from `source`; one entry per target index.
    async fn add_image_targets(&self, source: &str) -> Result<Vec<TargetDimensions>, EngineError>;

    /// Single warm-up pass over the current frame.
    async fn dummy_run(&self, video: &Self::Video) -> Result<(), EngineError>;

    /// Begin continuous processing; results arrive through the sink.
    fn process_video(&self, video: &Self::Video);

    fn stop_processing(&self);
}
