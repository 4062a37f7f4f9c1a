mod common;

use common::{standard_backend, FakeCamera, FakeDisplay};
use image_ar::{Session, SessionConfig};
use log::LevelFilter;

#[test]
fn setup_installs_log_output_at_configured_level() {
    let session = Session::new(
        FakeCamera::new(1280, 720),
        FakeDisplay::new(800.0, 600.0),
        standard_backend(),
    );

    session.setup(SessionConfig::new("targets.mind").with_log_level(LevelFilter::Trace));
    assert_eq!(log::max_level(), LevelFilter::Trace);
    log::trace!("session logging at trace");

    session.setup(SessionConfig::new("targets.mind").with_log_level(LevelFilter::Warn));
    assert_eq!(log::max_level(), LevelFilter::Warn);

    // configs without a level leave the host's choice alone
    session.setup(SessionConfig::new("targets.mind"));
    assert_eq!(log::max_level(), LevelFilter::Warn);
}
