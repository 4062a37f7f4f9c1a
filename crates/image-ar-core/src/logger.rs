//! Process-wide log output for AR hosts.
//!
//! Sessions log through the `log` facade. A host either installs its own
//! logger or sets `log_level` in its session config, in which case
//! [`init_logging`] runs when the session is set up.

use std::sync::OnceLock;

use log::LevelFilter;

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Route `log` records to stderr and cap them at `level`.
///
/// The first call installs the output; later calls, or calls after the host
/// installed its own logger, only move the global max level. Returns `true`
/// when this crate's output is the active logger.
pub fn init_logging(level: LevelFilter) -> bool {
    let installed = *INSTALLED.get_or_init(install);
    log::set_max_level(level);
    installed
}

/// Records carry the time since installation and their target module, which
/// is enough to follow a session through its start pipeline.
#[cfg(not(feature = "tracing"))]
fn install() -> bool {
    use std::io::Write;
    use std::time::Instant;

    let started = Instant::now();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Trace)
        .format(move |buf, record| {
            writeln!(
                buf,
                "[{:8.3}s {:>5} {}] {}",
                started.elapsed().as_secs_f64(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init()
        .is_ok()
}

/// With `tracing`, `log` records and `instrument` spans share one
/// subscriber; span close events report how long each start stage took.
#[cfg(feature = "tracing")]
fn install() -> bool {
    use tracing_subscriber::fmt::{format::FmtSpan, time::Uptime};
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::TRACE)
        .with_span_events(FmtSpan::CLOSE)
        .with_timer(Uptime::default())
        .finish()
        .try_init()
        .is_ok()
}
