use image_ar_core::CalibrationError;

use crate::capture::CaptureError;
use crate::engine::EngineError;

/// Session-scoped failures. None of them is fatal to the host.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("session is not configured; call setup() before start()")]
    NotConfigured,
    #[error("invalid session config: {0}")]
    InvalidConfig(String),
    #[error("camera capture unavailable: {0}")]
    CaptureUnavailable(CaptureError),
    #[error("camera permission denied")]
    CapturePermissionDenied,
    #[error("target load failed: {0}")]
    TargetLoadFailure(String),
    #[error("calibration unavailable: {0}")]
    CalibrationUnavailable(#[from] CalibrationError),
    #[error("tracking engine failed: {0}")]
    EngineFailure(String),
    #[error("session was stopped or restarted before start completed")]
    Cancelled,
}

impl From<CaptureError> for SessionError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied => SessionError::CapturePermissionDenied,
            other => SessionError::CaptureUnavailable(other),
        }
    }
}

impl From<EngineError> for SessionError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::TargetLoad(reason) => SessionError::TargetLoadFailure(reason),
            EngineError::WarmUp(reason) => SessionError::EngineFailure(reason),
        }
    }
}
