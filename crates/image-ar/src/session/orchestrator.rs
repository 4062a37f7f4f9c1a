use std::cell::{Cell, RefCell};
use std::rc::Rc;

use image_ar_core::{
    calibrate_display, AnchorId, AnchorRegistry, DisplayCalibration, TargetDimensions,
    TrackingEvent,
};
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, Notify};

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::{SessionError, SessionState};
use crate::anchor::AnchorHandle;
use crate::capture::{acquire_video, CaptureDevice, ReadyVideo, VideoStream};
use crate::config::SessionConfig;
use crate::diagnostics::{Diagnostics, DiagnosticsSnapshot};
use crate::display::DisplaySurface;
use crate::engine::{EventSink, TrackingBackend, TrackingEngine};

type ErrorListener = Box<dyn Fn(&SessionError)>;

struct Inner<C: CaptureDevice, D, B: TrackingBackend> {
    capture: C,
    display: D,
    backend: B,
    config: RefCell<Option<SessionConfig>>,
    state: Cell<SessionState>,
    // bumped by every start and stop; async steps compare against it
    generation: Cell<u64>,
    processing: Cell<bool>,
    registry: RefCell<AnchorRegistry<AnchorHandle>>,
    targets: RefCell<Option<Vec<TargetDimensions>>>,
    calibration: Cell<Option<DisplayCalibration>>,
    video: RefCell<Option<ReadyVideo<C::Stream>>>,
    engine: RefCell<Option<Rc<B::Engine>>>,
    events: RefCell<Option<mpsc::UnboundedReceiver<TrackingEvent>>>,
    stop_signal: Notify,
    diagnostics: RefCell<Diagnostics>,
    error_listeners: RefCell<Vec<ErrorListener>>,
}

/// Handle to one AR session.
///
/// Cloning yields another handle to the same session. The session is
/// single-threaded: drive it from a current-thread runtime or a `LocalSet`.
pub struct Session<C: CaptureDevice, D, B: TrackingBackend> {
    inner: Rc<Inner<C, D, B>>,
}

impl<C: CaptureDevice, D, B: TrackingBackend> Clone for Session<C, D, B> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<C, D, B> Session<C, D, B>
where
    C: CaptureDevice,
    D: DisplaySurface<Video = C::Stream>,
    B: TrackingBackend,
    B::Engine: TrackingEngine<Video = C::Stream>,
{
    pub fn new(capture: C, display: D, backend: B) -> Self {
        Self {
            inner: Rc::new(Inner {
                capture,
                display,
                backend,
                config: RefCell::new(None),
                state: Cell::new(SessionState::Idle),
                generation: Cell::new(0),
                processing: Cell::new(false),
                registry: RefCell::new(AnchorRegistry::new()),
                targets: RefCell::new(None),
                calibration: Cell::new(None),
                video: RefCell::new(None),
                engine: RefCell::new(None),
                events: RefCell::new(None),
                stop_signal: Notify::new(),
                diagnostics: RefCell::new(Diagnostics::default()),
                error_listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Record the session configuration. Takes effect on the next `start`,
    /// except `log_level`, which installs the log output right away.
    pub fn setup(&self, config: SessionConfig) {
        if let Some(level) = config.log_level {
            image_ar_core::init_logging(level);
        }
        debug!(
            "session setup: targets={:?}, diagnostics={}",
            config.target_source, config.diagnostics
        );
        *self.inner.diagnostics.borrow_mut() = Diagnostics::new(config.diagnostics);
        *self.inner.config.borrow_mut() = Some(config);
    }

    pub fn config(&self) -> Option<SessionConfig> {
        self.inner.config.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.get()
    }

    /// `true` only while the session is running and delivering poses.
    pub fn is_processing(&self) -> bool {
        self.inner.processing.get()
    }

    pub fn calibration(&self) -> Option<DisplayCalibration> {
        self.inner.calibration.get()
    }

    pub fn target_dimensions(&self) -> Option<Vec<TargetDimensions>> {
        self.inner.targets.borrow().clone()
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.inner.diagnostics.borrow().snapshot()
    }

    pub fn display(&self) -> &D {
        &self.inner.display
    }

    pub fn anchor_count(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    /// Register a callback invoked whenever the session enters `Error`.
    pub fn on_error(&self, listener: impl Fn(&SessionError) + 'static) {
        self.inner
            .error_listeners
            .borrow_mut()
            .push(Box::new(listener));
    }

    /// Register an anchor for `target_index`.
    ///
    /// If targets are already loaded and the index is in range, the anchor
    /// receives its marker setup immediately.
    pub fn register_anchor(&self, anchor: AnchorHandle, target_index: usize) -> AnchorId {
        let id = self
            .inner
            .registry
            .borrow_mut()
            .insert(target_index, Rc::clone(&anchor));

        let dims = self
            .inner
            .targets
            .borrow()
            .as_ref()
            .and_then(|targets| targets.get(target_index).copied());
        if let Some(dims) = dims {
            debug!("{id}: late registration, applying target {target_index} dimensions");
            anchor.borrow_mut().setup_marker(dims);
        }
        id
    }

    /// Remove an anchor, e.g. when its scene node is torn down.
    pub fn deregister_anchor(&self, id: AnchorId) -> Option<AnchorHandle> {
        self.inner
            .registry
            .borrow_mut()
            .remove(id)
            .map(|(_, handle)| handle)
    }

    /// Host hook for the first rendered frame; starts when `auto_start` is set.
    pub async fn on_render_start(&self) -> Result<(), SessionError> {
        let auto_start = self
            .inner
            .config
            .borrow()
            .as_ref()
            .is_some_and(|config| config.auto_start);
        if auto_start {
            self.start().await
        } else {
            Ok(())
        }
    }

    /// Acquire video, calibrate, load targets and begin processing.
    ///
    /// Calling `start` while a start is underway or the session is running
    /// is a no-op. Starting from `Stopped` or `Error` tears down the previous
    /// engine and video layer first. Resolves with `Cancelled` if `stop` (or
    /// another `start`) intervened.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self)))]
    pub async fn start(&self) -> Result<(), SessionError> {
        let config = self.config().ok_or(SessionError::NotConfigured)?;
        config
            .validate()
            .map_err(|err| SessionError::InvalidConfig(err.to_string()))?;

        let state = self.state();
        if state.is_active() {
            warn!("start() ignored: session is already {state}");
            return Ok(());
        }

        self.teardown();
        self.inner.display.set_loading_visible(true);
        let generation = self.bump_generation();

        match self.run_start(generation, &config).await {
            Ok(()) => {
                info!("session running ({} anchors)", self.anchor_count());
                Ok(())
            }
            Err(err) if !self.is_current(generation) => {
                info!("start superseded; discarding in-flight result ({err})");
                Err(SessionError::Cancelled)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Halt processing and pause the video.
    ///
    /// The stream itself is kept; a later `start` re-acquires. In-flight
    /// start work observes the stop and is discarded.
    pub fn stop(&self) {
        self.bump_generation();
        self.inner.processing.set(false);

        if let Some(engine) = self.inner.engine.borrow().as_ref() {
            engine.stop_processing();
        }
        if let Some(video) = self.inner.video.borrow().as_ref() {
            video.stream.pause();
        }

        let previous = self.inner.state.replace(SessionState::Stopped);
        info!("session stopped (was {previous})");
        self.inner.stop_signal.notify_waiters();
    }

    /// Dispatch everything already queued by the engine. Returns the count.
    pub fn poll_events(&self) -> usize {
        let Some(mut rx) = self.inner.events.borrow_mut().take() else {
            return 0;
        };
        let generation = self.inner.generation.get();

        let mut dispatched = 0;
        while let Ok(event) = rx.try_recv() {
            self.dispatch(event);
            dispatched += 1;
        }

        self.restore_events(rx, generation);
        dispatched
    }

    /// Dispatch engine events as they arrive until the session stops or the
    /// engine goes away.
    pub async fn run(&self) {
        if !self.is_processing() {
            return;
        }
        let Some(mut rx) = self.inner.events.borrow_mut().take() else {
            return;
        };
        let generation = self.inner.generation.get();

        while self.is_processing() {
            let next = tokio::select! {
                event = rx.recv() => event,
                _ = self.inner.stop_signal.notified() => None,
            };
            match next {
                Some(event) => self.dispatch(event),
                None => break,
            }
        }

        self.restore_events(rx, generation);
    }

    /// Route one engine event.
    pub fn dispatch(&self, event: TrackingEvent) {
        match event {
            TrackingEvent::ProcessCycleCompleted | TrackingEvent::WorkerCycleCompleted => {
                self.inner.diagnostics.borrow_mut().record(&event);
            }
            TrackingEvent::PoseUpdate {
                target_index,
                world_matrix,
            } => {
                if !self.is_processing() {
                    debug!("dropping pose for target {target_index}: session not running");
                    return;
                }
                // collect first so anchors may call back into the session
                let anchors: Vec<AnchorHandle> = self
                    .inner
                    .registry
                    .borrow()
                    .for_target(target_index)
                    .cloned()
                    .collect();
                for anchor in anchors {
                    anchor
                        .borrow_mut()
                        .update_world_matrix(world_matrix.as_ref());
                }
            }
        }
    }

    async fn run_start(&self, generation: u64, config: &SessionConfig) -> Result<(), SessionError> {
        let display = &self.inner.display;

        self.transition(SessionState::AcquiringVideo);
        let video = acquire_video(&self.inner.capture, display, &config.capture).await?;
        if !self.is_current(generation) {
            video.stream.pause();
            display.remove_video_layer(&video.stream);
            return Err(SessionError::Cancelled);
        }
        let stream = video.stream.clone();
        let frame = video.size;
        *self.inner.video.borrow_mut() = Some(video);

        self.transition(SessionState::Calibrating);
        let (sink, events) = EventSink::channel();
        let engine = Rc::new(self.inner.backend.create_engine(frame, sink));
        *self.inner.engine.borrow_mut() = Some(Rc::clone(&engine));
        *self.inner.events.borrow_mut() = Some(events);

        let calibration =
            calibrate_display(&engine.projection_matrix(), frame, display.container_size())?;
        debug!(
            "virtual camera: fov={:.3}deg aspect={:.4} near={:.3} far={:.3}",
            calibration.camera.fov_y_deg,
            calibration.camera.aspect,
            calibration.camera.near,
            calibration.camera.far
        );
        display.apply_camera(&calibration.camera);
        display.place_video(&calibration.placement);
        self.inner.calibration.set(Some(calibration));

        self.transition(SessionState::LoadingTargets);
        let targets = engine.add_image_targets(&config.target_source).await?;
        self.ensure_current(generation)?;
        info!("loaded {} image targets", targets.len());
        self.setup_anchors(&targets);
        *self.inner.targets.borrow_mut() = Some(targets);

        engine.dummy_run(&stream).await?;
        self.ensure_current(generation)?;

        display.set_loading_visible(false);
        engine.process_video(&stream);
        self.inner.processing.set(true);
        self.transition(SessionState::Running);
        Ok(())
    }

    fn setup_anchors(&self, targets: &[TargetDimensions]) {
        let anchors: Vec<(usize, AnchorHandle)> = self
            .inner
            .registry
            .borrow()
            .iter()
            .map(|(target_index, _, handle)| (target_index, Rc::clone(handle)))
            .collect();

        for (target_index, anchor) in anchors {
            match targets.get(target_index) {
                Some(&dims) => anchor.borrow_mut().setup_marker(dims),
                None => warn!(
                    "anchor target {target_index} out of range ({} targets loaded)",
                    targets.len()
                ),
            }
        }
    }

    fn fail(&self, err: &SessionError) {
        error!("session failed: {err}");
        self.inner.processing.set(false);
        self.inner.state.set(SessionState::Error);
        self.inner.display.set_loading_visible(true);
        if let Some(engine) = self.inner.engine.borrow().as_ref() {
            engine.stop_processing();
        }
        if let Some(video) = self.inner.video.borrow().as_ref() {
            video.stream.pause();
        }

        let anchors: Vec<AnchorHandle> = self
            .inner
            .registry
            .borrow()
            .iter()
            .map(|(_, _, handle)| Rc::clone(handle))
            .collect();
        for anchor in anchors {
            anchor.borrow_mut().update_world_matrix(None);
        }

        for listener in self.inner.error_listeners.borrow().iter() {
            listener(err);
        }
    }

    /// Release the engine and video layer of a previous run.
    fn teardown(&self) {
        if let Some(engine) = self.inner.engine.borrow_mut().take() {
            engine.stop_processing();
        }
        if let Some(video) = self.inner.video.borrow_mut().take() {
            video.stream.pause();
            self.inner.display.remove_video_layer(&video.stream);
        }
        self.inner.events.borrow_mut().take();
        self.inner.targets.borrow_mut().take();
        self.inner.calibration.set(None);
        self.inner.processing.set(false);
    }

    fn restore_events(&self, rx: mpsc::UnboundedReceiver<TrackingEvent>, generation: u64) {
        if !self.is_current(generation) {
            return;
        }
        let mut slot = self.inner.events.borrow_mut();
        if slot.is_none() {
            *slot = Some(rx);
        }
    }

    fn transition(&self, next: SessionState) {
        let previous = self.inner.state.replace(next);
        debug!("session state: {previous} -> {next}");
    }

    fn bump_generation(&self) -> u64 {
        let next = self.inner.generation.get() + 1;
        self.inner.generation.set(next);
        next
    }

    #[inline]
    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.get() == generation
    }

    fn ensure_current(&self, generation: u64) -> Result<(), SessionError> {
        if self.is_current(generation) {
            Ok(())
        } else {
            Err(SessionError::Cancelled)
        }
    }
}
