#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use image_ar::{
    CaptureConstraints, CaptureDevice, CaptureError, DisplaySize, DisplaySurface, EngineError,
    EventSink, FrameSize, ImageTargetAnchor, ProjectionMatrix, SceneNode, Session, SessionConfig,
    TargetDimensions, TrackingBackend, TrackingEngine, TrackingEvent, VideoPlacement,
    VideoStream, VirtualCamera,
};
use nalgebra::{Matrix4, Perspective3};
use tokio::sync::Notify;

pub type TestSession = Session<FakeCamera, FakeDisplay, FakeBackend>;

// ---------------------------------------------------------------- video

#[derive(Debug)]
pub struct StreamState {
    pub id: u32,
    pub size: FrameSize,
    pub paused: Cell<bool>,
}

#[derive(Clone, Debug)]
pub struct FakeStream(pub Rc<StreamState>);

impl VideoStream for FakeStream {
    fn frame_size(&self) -> Option<FrameSize> {
        Some(self.0.size)
    }

    async fn loaded_metadata(&self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn pause(&self) {
        self.0.paused.set(true);
    }
}

#[derive(Debug)]
pub struct CameraState {
    pub size: FrameSize,
    pub denial: Option<CaptureError>,
    pub requests: Cell<u32>,
    pub streams: RefCell<Vec<FakeStream>>,
}

#[derive(Clone, Debug)]
pub struct FakeCamera(pub Rc<CameraState>);

impl FakeCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self(Rc::new(CameraState {
            size: FrameSize::new(width, height),
            denial: None,
            requests: Cell::new(0),
            streams: RefCell::new(Vec::new()),
        }))
    }

    pub fn failing(err: CaptureError) -> Self {
        Self(Rc::new(CameraState {
            size: FrameSize::new(0, 0),
            denial: Some(err),
            requests: Cell::new(0),
            streams: RefCell::new(Vec::new()),
        }))
    }

    pub fn last_stream(&self) -> Option<FakeStream> {
        self.0.streams.borrow().last().cloned()
    }
}

impl CaptureDevice for FakeCamera {
    type Stream = FakeStream;

    async fn request_stream(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<FakeStream, CaptureError> {
        assert!(!constraints.audio, "audio must not be requested");
        let n = self.0.requests.get() + 1;
        self.0.requests.set(n);
        if let Some(err) = &self.0.denial {
            return Err(err.clone());
        }
        let stream = FakeStream(Rc::new(StreamState {
            id: n,
            size: self.0.size,
            paused: Cell::new(false),
        }));
        self.0.streams.borrow_mut().push(stream.clone());
        Ok(stream)
    }
}

// -------------------------------------------------------------- display

#[derive(Debug)]
pub struct DisplayState {
    pub size: DisplaySize,
    pub layers: RefCell<Vec<u32>>,
    pub placement: Cell<Option<VideoPlacement>>,
    pub camera: Cell<Option<VirtualCamera>>,
    pub loading_visible: Cell<bool>,
}

#[derive(Clone, Debug)]
pub struct FakeDisplay(pub Rc<DisplayState>);

impl FakeDisplay {
    pub fn new(width: f64, height: f64) -> Self {
        Self(Rc::new(DisplayState {
            size: DisplaySize::new(width, height),
            layers: RefCell::new(Vec::new()),
            placement: Cell::new(None),
            camera: Cell::new(None),
            loading_visible: Cell::new(true),
        }))
    }

    pub fn layer_count(&self) -> usize {
        self.0.layers.borrow().len()
    }
}

impl DisplaySurface for FakeDisplay {
    type Video = FakeStream;

    fn container_size(&self) -> DisplaySize {
        self.0.size
    }

    fn insert_video_layer(&self, video: &FakeStream) {
        self.0.layers.borrow_mut().push(video.0.id);
    }

    fn remove_video_layer(&self, video: &FakeStream) {
        self.0.layers.borrow_mut().retain(|&id| id != video.0.id);
    }

    fn place_video(&self, placement: &VideoPlacement) {
        self.0.placement.set(Some(*placement));
    }

    fn apply_camera(&self, camera: &VirtualCamera) {
        self.0.camera.set(Some(*camera));
    }

    fn set_loading_visible(&self, visible: bool) {
        self.0.loading_visible.set(visible);
    }
}

// --------------------------------------------------------------- engine

pub struct BackendState {
    pub projection: ProjectionMatrix,
    pub targets: RefCell<Result<Vec<TargetDimensions>, EngineError>>,
    pub gate: Option<Rc<Notify>>,
    pub created: Cell<usize>,
    pub alive: Cell<usize>,
    pub processing: Cell<bool>,
    pub warmups: Cell<usize>,
    pub frame: Cell<Option<FrameSize>>,
    pub sink: RefCell<Option<EventSink>>,
}

#[derive(Clone)]
pub struct FakeBackend(pub Rc<BackendState>);

impl FakeBackend {
    pub fn new(projection: ProjectionMatrix, targets: Vec<TargetDimensions>) -> Self {
        Self::build(projection, Ok(targets), None)
    }

    pub fn gated(
        projection: ProjectionMatrix,
        targets: Vec<TargetDimensions>,
        gate: Rc<Notify>,
    ) -> Self {
        Self::build(projection, Ok(targets), Some(gate))
    }

    pub fn failing_targets(projection: ProjectionMatrix, reason: &str) -> Self {
        Self::build(
            projection,
            Err(EngineError::TargetLoad(reason.to_string())),
            None,
        )
    }

    fn build(
        projection: ProjectionMatrix,
        targets: Result<Vec<TargetDimensions>, EngineError>,
        gate: Option<Rc<Notify>>,
    ) -> Self {
        Self(Rc::new(BackendState {
            projection,
            targets: RefCell::new(targets),
            gate,
            created: Cell::new(0),
            alive: Cell::new(0),
            processing: Cell::new(false),
            warmups: Cell::new(0),
            frame: Cell::new(None),
            sink: RefCell::new(None),
        }))
    }

    /// Deliver an event as the engine would.
    pub fn emit(&self, event: TrackingEvent) -> bool {
        self.0
            .sink
            .borrow()
            .as_ref()
            .is_some_and(|sink| sink.emit(event))
    }
}

pub struct FakeEngine(Rc<BackendState>);

impl Drop for FakeEngine {
    fn drop(&mut self) {
        self.0.alive.set(self.0.alive.get() - 1);
    }
}

impl TrackingBackend for FakeBackend {
    type Engine = FakeEngine;

    fn create_engine(&self, frame: FrameSize, events: EventSink) -> FakeEngine {
        self.0.created.set(self.0.created.get() + 1);
        self.0.alive.set(self.0.alive.get() + 1);
        self.0.frame.set(Some(frame));
        *self.0.sink.borrow_mut() = Some(events);
        FakeEngine(Rc::clone(&self.0))
    }
}

impl TrackingEngine for FakeEngine {
    type Video = FakeStream;

    fn projection_matrix(&self) -> ProjectionMatrix {
        self.0.projection
    }

    async fn add_image_targets(&self, source: &str) -> Result<Vec<TargetDimensions>, EngineError> {
        assert!(!source.is_empty());
        if let Some(gate) = &self.0.gate {
            gate.notified().await;
        }
        self.0.targets.borrow().clone()
    }

    async fn dummy_run(&self, _video: &FakeStream) -> Result<(), EngineError> {
        self.0.warmups.set(self.0.warmups.get() + 1);
        Ok(())
    }

    fn process_video(&self, _video: &FakeStream) {
        self.0.processing.set(true);
    }

    fn stop_processing(&self) {
        self.0.processing.set(false);
    }
}

// ---------------------------------------------------------------- nodes

#[derive(Debug, Default)]
pub struct NodeState {
    pub visible: bool,
    pub auto_update: bool,
    pub matrix: Option<Matrix4<f64>>,
    pub history: Vec<Matrix4<f64>>,
}

#[derive(Clone, Debug, Default)]
pub struct FakeNode(pub Rc<RefCell<NodeState>>);

impl FakeNode {
    pub fn visible(&self) -> bool {
        self.0.borrow().visible
    }

    pub fn matrix(&self) -> Option<Matrix4<f64>> {
        self.0.borrow().matrix
    }

    pub fn writes(&self) -> usize {
        self.0.borrow().history.len()
    }
}

impl SceneNode for FakeNode {
    fn set_visible(&mut self, visible: bool) {
        self.0.borrow_mut().visible = visible;
    }

    fn set_matrix_auto_update(&mut self, enabled: bool) {
        self.0.borrow_mut().auto_update = enabled;
    }

    fn set_matrix(&mut self, matrix: Matrix4<f64>) {
        let mut node = self.0.borrow_mut();
        node.matrix = Some(matrix);
        node.history.push(matrix);
    }
}

pub type TestAnchor = Rc<RefCell<ImageTargetAnchor<FakeNode>>>;

/// Register a fresh anchor and return it with its node.
pub fn add_anchor(session: &TestSession, target_index: usize) -> (TestAnchor, FakeNode) {
    let node = FakeNode::default();
    let anchor = ImageTargetAnchor::new(node.clone()).into_handle();
    session.register_anchor(anchor.clone(), target_index);
    (anchor, node)
}

// -------------------------------------------------------------- helpers

pub fn engine_projection(aspect: f64, fov_y_deg: f64, near: f64, far: f64) -> ProjectionMatrix {
    let m = Perspective3::new(aspect, fov_y_deg.to_radians(), near, far).to_homogeneous();
    ProjectionMatrix::from_matrix(&m)
}

pub fn default_targets() -> Vec<TargetDimensions> {
    vec![TargetDimensions::new(2.0, 4.0), TargetDimensions::new(1.0, 1.0)]
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn session_with(backend: FakeBackend) -> (TestSession, FakeCamera, FakeDisplay) {
    init_logging();
    let camera = FakeCamera::new(1280, 720);
    let display = FakeDisplay::new(800.0, 600.0);
    let session = Session::new(camera.clone(), display.clone(), backend);
    session.setup(SessionConfig::new("targets.mind"));
    (session, camera, display)
}

pub fn standard_backend() -> FakeBackend {
    FakeBackend::new(
        engine_projection(1280.0 / 720.0, 45.0, 10.0, 100000.0),
        default_targets(),
    )
}
