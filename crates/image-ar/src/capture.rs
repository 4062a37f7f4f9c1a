//! Camera acquisition.
//!
//! A stream is requested from the platform, attached to a video layer at the
//! back of the display, and only handed to the session once the platform
//! reports non-zero frame dimensions. Calibration is undefined before that.

use image_ar_core::FrameSize;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::display::DisplaySurface;

/// How many metadata notifications to wait for before giving up on a stream
/// that never reports its frame size.
const METADATA_ATTEMPTS: usize = 8;

/// Which physical camera to prefer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    #[default]
    Environment,
    User,
}

/// Constraints passed to the platform when requesting a stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConstraints {
    pub audio: bool,
    pub facing_mode: FacingMode,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            audio: false,
            facing_mode: FacingMode::Environment,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("camera capture is not available on this platform")]
    Unavailable,
    #[error("camera access was denied")]
    PermissionDenied,
    #[error("video stream never reported frame dimensions")]
    NoFrameDimensions,
    #[error("video stream failed: {0}")]
    Stream(String),
}

/// Platform camera access.
#[allow(async_fn_in_trait)]
pub trait CaptureDevice {
    type Stream: VideoStream;

    /// Request a live stream. Resolves with `Unavailable` when the platform
    /// has no capture API and `PermissionDenied` when access is refused.
    async fn request_stream(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Self::Stream, CaptureError>;
}

/// Handle to a live video source.
///
/// Handles are cheap to clone and refer to the same underlying stream.
#[allow(async_fn_in_trait)]
pub trait VideoStream: Clone {
    /// Frame size as currently reported; may be zero before metadata loads.
    fn frame_size(&self) -> Option<FrameSize>;

    /// Resolves on the next metadata notification.
    async fn loaded_metadata(&self) -> Result<(), CaptureError>;

    fn pause(&self);
}

/// A stream whose frame size is known.
#[derive(Clone, Debug)]
pub struct ReadyVideo<S> {
    pub stream: S,
    pub size: FrameSize,
}

/// Request a stream, attach it to the display and wait for its frame size.
pub async fn acquire_video<C, D>(
    device: &C,
    display: &D,
    constraints: &CaptureConstraints,
) -> Result<ReadyVideo<C::Stream>, CaptureError>
where
    C: CaptureDevice,
    D: DisplaySurface<Video = C::Stream>,
{
    debug!("requesting camera stream ({:?})", constraints.facing_mode);
    let stream = device.request_stream(constraints).await?;
    display.insert_video_layer(&stream);

    match wait_for_frame_size(&stream).await {
        Ok(size) => {
            info!("video ready: {}x{}", size.width, size.height);
            Ok(ReadyVideo { stream, size })
        }
        Err(err) => {
            stream.pause();
            display.remove_video_layer(&stream);
            Err(err)
        }
    }
}

async fn wait_for_frame_size<S: VideoStream>(stream: &S) -> Result<FrameSize, CaptureError> {
    for _ in 0..METADATA_ATTEMPTS {
        if let Some(size) = stream.frame_size().filter(FrameSize::is_valid) {
            return Ok(size);
        }
        stream.loaded_metadata().await?;
    }
    stream
        .frame_size()
        .filter(FrameSize::is_valid)
        .ok_or(CaptureError::NoFrameDimensions)
}
