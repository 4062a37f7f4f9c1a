//! Calibration-to-display mapping.
//!
//! The tracking engine calibrates against the raw capture frame, while the
//! virtual camera renders into a display container of arbitrary size. The
//! video is scaled to *cover* the container (cropping the overscanned axis)
//! and the virtual camera's vertical field of view is adjusted so that
//! rendered content stays registered with the visible part of the frame.

use nalgebra::{Matrix4, Perspective3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Terms whose magnitude falls below this are treated as zero.
const DEGENERATE_EPS: f64 = 1e-9;

/// Errors produced while turning engine calibration into display parameters.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("degenerate focal term in projection matrix (proj[5]={0})")]
    DegenerateFocal(f64),
    #[error("degenerate depth term in projection matrix (proj[10]={0})")]
    DegenerateDepth(f64),
    #[error("invalid capture frame size ({width}x{height})")]
    InvalidFrameSize { width: u32, height: u32 },
    #[error("invalid display size ({width}x{height})")]
    InvalidDisplay { width: f64, height: f64 },
    #[error("clip planes out of order (near={near}, far={far})")]
    ClipPlanes { near: f64, far: f64 },
    #[error("invalid virtual camera (fov={fov_y_deg}deg, aspect={aspect})")]
    InvalidCamera { fov_y_deg: f64, aspect: f64 },
    #[error("calibration produced non-finite camera parameters")]
    NonFinite,
}

/// Pixel dimensions of the captured video frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `true` once both dimensions are known (non-zero).
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    #[inline]
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// On-screen size of the display container, in layout units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl DisplaySize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    #[inline]
    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }
}

/// Column-major 4x4 perspective projection produced by engine calibration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectionMatrix(pub [f64; 16]);

impl ProjectionMatrix {
    pub fn new(elements: [f64; 16]) -> Self {
        Self(elements)
    }

    pub fn from_matrix(m: &Matrix4<f64>) -> Self {
        let mut elements = [0.0; 16];
        elements.copy_from_slice(m.as_slice());
        Self(elements)
    }

    #[inline]
    pub fn elements(&self) -> &[f64; 16] {
        &self.0
    }

    pub fn to_matrix(&self) -> Matrix4<f64> {
        Matrix4::from_column_slice(&self.0)
    }

    /// Near clip distance encoded in the matrix.
    #[inline]
    pub fn near(&self) -> f64 {
        self.0[14] / (self.0[10] - 1.0)
    }

    /// Far clip distance encoded in the matrix.
    #[inline]
    pub fn far(&self) -> f64 {
        self.0[14] / (self.0[10] + 1.0)
    }
}

/// Size and offset of the video layer inside the display container.
///
/// Offsets are relative to the container's top-left corner and are never
/// positive: the overscanned axis is shifted so its center aligns with the
/// container center.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoPlacement {
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
}

impl VideoPlacement {
    /// Scale `frame` so it fully covers `display`, cropping the longer axis.
    pub fn cover(frame: FrameSize, display: DisplaySize) -> Result<Self, CalibrationError> {
        if !frame.is_valid() {
            return Err(CalibrationError::InvalidFrameSize {
                width: frame.width,
                height: frame.height,
            });
        }
        if !display.is_valid() {
            return Err(CalibrationError::InvalidDisplay {
                width: display.width,
                height: display.height,
            });
        }

        let video_ratio = frame.aspect();
        let (width, height) = if video_ratio > display.aspect() {
            // wider than the container: fit height, crop left/right
            (display.height * video_ratio, display.height)
        } else {
            (display.width, display.width / video_ratio)
        };

        Ok(Self {
            width,
            height,
            left: -(width - display.width) / 2.0,
            top: -(height - display.height) / 2.0,
        })
    }
}

/// Perspective parameters for the display camera.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VirtualCamera {
    /// Vertical field of view in degrees.
    pub fov_y_deg: f64,
    /// Display aspect ratio (width / height), not the capture aspect.
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

impl VirtualCamera {
    /// OpenGL-style projection matrix for these parameters.
    ///
    /// Requires `0 < fov_y_deg < 180`, a positive aspect and
    /// `0 < near < far`, all finite.
    pub fn projection_matrix(&self) -> Result<Matrix4<f64>, CalibrationError> {
        let Self {
            fov_y_deg,
            aspect,
            near,
            far,
        } = *self;
        if !(fov_y_deg > 0.0 && fov_y_deg < 180.0 && aspect.is_finite() && aspect > 0.0) {
            return Err(CalibrationError::InvalidCamera { fov_y_deg, aspect });
        }
        if !(near.is_finite() && far.is_finite() && near > 0.0 && far > near) {
            return Err(CalibrationError::ClipPlanes { near, far });
        }
        Ok(Perspective3::new(aspect, fov_y_deg.to_radians(), near, far).to_homogeneous())
    }
}

/// Result of reconciling engine calibration with the display.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayCalibration {
    pub camera: VirtualCamera,
    pub placement: VideoPlacement,
}

/// Derive the display camera and video placement from engine calibration.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(proj), fields(frame_w = frame.width, frame_h = frame.height))
)]
pub fn calibrate_display(
    proj: &ProjectionMatrix,
    frame: FrameSize,
    display: DisplaySize,
) -> Result<DisplayCalibration, CalibrationError> {
    let p = proj.elements();
    if p[5].abs() < DEGENERATE_EPS {
        return Err(CalibrationError::DegenerateFocal(p[5]));
    }
    if (p[10] - 1.0).abs() < DEGENERATE_EPS || (p[10] + 1.0).abs() < DEGENERATE_EPS {
        return Err(CalibrationError::DegenerateDepth(p[10]));
    }

    let placement = VideoPlacement::cover(frame, display)?;

    let fov_y_deg = 2.0 * (1.0 / p[5] / placement.height * display.height).atan() * 180.0
        / std::f64::consts::PI;
    let near = proj.near();
    let far = proj.far();

    if !(fov_y_deg.is_finite() && near.is_finite() && far.is_finite()) {
        return Err(CalibrationError::NonFinite);
    }
    if !(near > 0.0 && far > near) {
        return Err(CalibrationError::ClipPlanes { near, far });
    }

    Ok(DisplayCalibration {
        camera: VirtualCamera {
            fov_y_deg,
            aspect: display.aspect(),
            near,
            far,
        },
        placement,
    })
}
