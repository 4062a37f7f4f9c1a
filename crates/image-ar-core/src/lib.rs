//! Core types for image-target AR sessions.
//!
//! This crate is purely geometric and synchronous. It knows nothing about
//! cameras, tracking engines or scene graphs; `image-ar` wires those
//! together on top of the types defined here.

mod event;
mod logger;
mod pose;
mod projection;
mod registry;

pub use event::TrackingEvent;
pub use pose::{compose_anchor_transform, marker_post_matrix, TargetDimensions, WorldMatrix};
pub use projection::{
    calibrate_display, CalibrationError, DisplayCalibration, DisplaySize, FrameSize,
    ProjectionMatrix, VideoPlacement, VirtualCamera,
};
pub use registry::{AnchorId, AnchorRegistry};

pub use logger::init_logging;
