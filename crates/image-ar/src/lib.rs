//! Live AR session orchestration.
//!
//! This crate connects a camera stream to an image-tracking engine and
//! propagates the engine's per-target poses to scene anchors:
//! - [`capture`]: stream acquisition and frame-size readiness,
//! - [`engine`]: the tracking engine boundary and its event channel,
//! - [`anchor`]: scene anchors and the pose applier,
//! - [`session`]: the state machine that sequences all of the above.
//!
//! Geometry (calibration mapping, video placement, marker post-matrix) and
//! the anchor registry live in `image-ar-core`, re-exported as [`core`].
//!
//! ## Quickstart
//!
//! ```ignore
//! use image_ar::{ImageTargetAnchor, Session, SessionConfig};
//!
//! let session = Session::new(camera, display, backend);
//! session.setup(SessionConfig::new("targets.mind"));
//! session.register_anchor(ImageTargetAnchor::new(node).into_handle(), 0);
//!
//! session.start().await?;
//! session.run().await;
//! ```

pub use image_ar_core as core;

pub mod anchor;
pub mod capture;
pub mod config;
pub mod diagnostics;
pub mod display;
pub mod engine;
pub mod session;

pub use anchor::{Anchor, AnchorHandle, ImageTargetAnchor, SceneNode};
pub use capture::{
    acquire_video, CaptureConstraints, CaptureDevice, CaptureError, FacingMode, ReadyVideo,
    VideoStream,
};
pub use config::{ConfigError, SessionConfig};
pub use diagnostics::{Diagnostics, DiagnosticsSnapshot};
pub use display::DisplaySurface;
pub use engine::{EngineError, EventSink, TrackingBackend, TrackingEngine};
pub use session::{Session, SessionError, SessionState};

pub use image_ar_core::{
    AnchorId, DisplayCalibration, DisplaySize, FrameSize, ProjectionMatrix, TargetDimensions,
    TrackingEvent, VideoPlacement, VirtualCamera, WorldMatrix,
};
