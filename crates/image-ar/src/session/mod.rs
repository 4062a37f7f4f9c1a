//! Session orchestration.
//!
//! A [`Session`] sequences camera acquisition, calibration, target loading
//! and the per-frame event pump, and routes engine events to registered
//! anchors and diagnostics.

mod error;
mod orchestrator;
mod state;

pub use error::SessionError;
pub use orchestrator::Session;
pub use state::SessionState;
