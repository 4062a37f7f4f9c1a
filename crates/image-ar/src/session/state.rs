use std::fmt;

/// Lifecycle of a session.
///
/// `Idle -> AcquiringVideo -> Calibrating -> LoadingTargets -> Running -> Stopped`,
/// with `Error` reachable from any in-progress state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    #[default]
    Idle,
    AcquiringVideo,
    Calibrating,
    LoadingTargets,
    Running,
    Stopped,
    Error,
}

impl SessionState {
    /// A start pipeline is underway or already finished successfully.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::AcquiringVideo | Self::Calibrating | Self::LoadingTargets | Self::Running
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AcquiringVideo => "acquiring-video",
            Self::Calibrating => "calibrating",
            Self::LoadingTargets => "loading-targets",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}
