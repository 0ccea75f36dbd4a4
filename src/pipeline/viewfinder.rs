//! The view-finder: one camera preview with scanning and streaming.

use super::events::EventSink;
use super::executor::DecodeExecutor;
use super::orchestrator::FramePipeline;
use crate::capture::{
    CameraError, CameraHandle, CameraPool, CameraType, CaptureMode, FileConfig, FlashMode,
    FrameCallback, PreviewFrame, PreviewSurface, StartOutcome, SwitchOutcome,
};
use crate::decode::{BarcodeDecoder, DeviceOrientation, SymbologySet};
use crate::gesture::{GestureController, GestureError, GestureOutcome, TouchEvent};
use crate::streaming::{IngestionClientFactory, StreamSession};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// A camera preview surface with barcode scanning and optional streaming.
///
/// Composes a [`CameraHandle`], a [`FramePipeline`] fed by the camera's
/// frame callback, a [`GestureController`] and an optional
/// [`StreamSession`]. The host drives it through the surface lifecycle
/// callbacks and the setters below.
///
/// The host's event sink is kept here and reconnected to the pipeline on
/// every surface start, so only decodes in flight across a teardown lose
/// their results.
pub struct ViewFinder {
    camera: Arc<CameraHandle>,
    pipeline: Arc<FramePipeline>,
    sink: Mutex<Option<Arc<dyn EventSink>>>,
    gestures: GestureController,
    stream: Option<StreamSession>,
}

impl ViewFinder {
    pub fn new(pool: Arc<dyn CameraPool>, camera_type: CameraType, pipeline: Arc<FramePipeline>) -> Self {
        let frames = Arc::clone(&pipeline);
        let callback: FrameCallback = Arc::new(move |frame: PreviewFrame| {
            frames.on_frame(frame);
        });

        Self {
            camera: Arc::new(CameraHandle::new(pool, camera_type, callback)),
            pipeline,
            sink: Mutex::new(None),
            gestures: GestureController::new(),
            stream: None,
        }
    }

    /// Builds a view-finder from file configuration.
    ///
    /// Streaming is only set up when enabled in `config` and an ingestion
    /// factory is given.
    pub fn from_config(
        config: &FileConfig,
        pool: Arc<dyn CameraPool>,
        executor: Arc<dyn DecodeExecutor>,
        ingestion: Option<Arc<dyn IngestionClientFactory>>,
    ) -> Self {
        let symbologies = SymbologySet::from_names(&config.scanner.symbologies);
        let pipeline = FramePipeline::new(BarcodeDecoder::new(symbologies), executor);
        pipeline.set_scanning_enabled(config.scanner.enabled);
        pipeline.set_orientation(DeviceOrientation::from_code(config.scanner.orientation));

        let viewfinder = Self::new(pool, config.camera.camera_type, Arc::new(pipeline));
        viewfinder.camera.set_capture_mode(config.camera.capture_mode);

        match ingestion {
            Some(factory) if config.stream.enabled => {
                viewfinder.with_stream(StreamSession::new(factory, config.stream.clone()))
            }
            _ => viewfinder,
        }
    }

    /// Adds a streaming sibling started with the preview surface.
    pub fn with_stream(mut self, stream: StreamSession) -> Self {
        self.stream = Some(stream);
        self
    }

    /// The preview surface became available: start the camera, then streaming.
    ///
    /// A streaming failure is logged and does not affect the camera.
    pub fn on_surface_available(&self, surface: PreviewSurface) -> Result<StartOutcome, CameraError> {
        self.camera.attach_surface(Some(surface));
        self.pipeline.begin_start();

        let outcome = self.camera.start(self.camera.camera_type(), self.camera.capture_mode());
        match &outcome {
            Ok(StartOutcome::Started | StartOutcome::AlreadyOpen) => {
                if let Some(sink) = self.sink.lock().clone() {
                    self.pipeline.attach_sink(sink);
                }
                self.pipeline.mark_running();
            }
            Ok(StartOutcome::Coalesced) => {}
            Ok(StartOutcome::Unavailable) | Err(_) => {
                self.pipeline.begin_stop();
                self.pipeline.mark_idle();
            }
        }

        if let Some(stream) = &self.stream {
            if let Err(e) = stream.start(&surface) {
                warn!(error = %e, "Unable to start streaming");
            }
        }
        outcome
    }

    /// The surface was resized. Only the recorded dimensions change.
    pub fn on_surface_size_changed(&self, width: u32, height: u32) {
        if let Some(surface) = self.camera.surface() {
            self.camera.attach_surface(Some(surface.resized(width, height)));
            debug!(width, height, "Preview surface resized");
        }
    }

    /// The surface is gone: stop the camera and tear down streaming.
    ///
    /// The pipeline's event sink is detached first, so a decode still in
    /// flight completes and releases the gate but its result is discarded.
    /// The host's sink is reconnected by the next surface start.
    pub fn on_surface_destroyed(&self) -> Result<(), CameraError> {
        self.pipeline.begin_stop();
        self.pipeline.detach_sink();
        let stopped = self.camera.stop();
        self.camera.attach_surface(None);
        self.pipeline.mark_idle();

        if let Some(stream) = &self.stream {
            if let Err(e) = stream.teardown() {
                warn!(error = %e, "Streaming teardown failed");
            }
        }
        info!("View-finder surface destroyed");
        stopped
    }

    /// Applies a touch gesture. Failures are logged and returned.
    pub fn on_touch(&self, event: &TouchEvent) -> Result<GestureOutcome, GestureError> {
        let surface = self.camera.surface().ok_or(GestureError::NoCamera)?;
        self.gestures
            .handle(&self.camera, event, surface.width(), surface.height())
            .inspect_err(|e| debug!(error = %e, action = ?event.action, "Touch ignored"))
    }

    /// Switches cameras on a dedicated thread. `None` if unchanged.
    pub fn set_camera_type(
        &self,
        camera_type: CameraType,
    ) -> Option<JoinHandle<Result<SwitchOutcome, CameraError>>> {
        self.camera.set_camera_type(camera_type)
    }

    pub fn set_capture_mode(&self, capture_mode: CaptureMode) {
        self.camera.set_capture_mode(capture_mode);
    }

    pub fn set_flash_mode(&self, flash_mode: FlashMode) -> Result<(), CameraError> {
        self.camera.set_flash_mode(flash_mode)
    }

    pub fn set_torch(&self, on: bool) -> Result<(), CameraError> {
        self.camera.set_torch(on)
    }

    pub fn set_barcode_scanning(&self, enabled: bool) {
        self.pipeline.set_scanning_enabled(enabled);
    }

    pub fn set_orientation(&self, orientation: DeviceOrientation) {
        self.pipeline.set_orientation(orientation);
    }

    /// Sets the host's event sink, used now and after every surface restart.
    pub fn attach_sink(&self, sink: Arc<dyn EventSink>) {
        *self.sink.lock() = Some(Arc::clone(&sink));
        self.pipeline.attach_sink(sink);
    }

    /// Preview width / height of the running camera.
    pub fn preview_ratio(&self) -> Option<f64> {
        self.camera.preview_ratio()
    }

    pub fn camera(&self) -> &Arc<CameraHandle> {
        &self.camera
    }

    pub fn pipeline(&self) -> &Arc<FramePipeline> {
        &self.pipeline
    }

    pub fn stream(&self) -> Option<&StreamSession> {
        self.stream.as_ref()
    }
}
