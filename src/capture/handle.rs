//! Camera handle: owns one camera resource and its start/stop transitions.
//!
//! Transitions are coalesced, not queued. A `start` that arrives while
//! another start is in progress returns [`StartOutcome::Coalesced`] without
//! touching the hardware, and the same holds for overlapping `stop`s.

use super::{
    best_size, CameraDevice, CameraError, CameraParameters, CameraPool, CameraType, CaptureMode,
    FlashMode, FocusMode, FrameCallback, PreviewSurface, Size,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// The negotiated state of an open camera.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSession {
    pub camera_type: CameraType,
    pub capture_mode: CaptureMode,
    pub picture_size: Size,
    pub preview_size: Size,
    pub focus_mode: Option<FocusMode>,
}

/// Result of a [`CameraHandle::start`] call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A camera was acquired and the preview is running.
    Started,
    /// A session was already open; nothing changed.
    AlreadyOpen,
    /// Another start was in progress; this call was dropped.
    Coalesced,
    /// No camera resource was available. Logged, not an error.
    Unavailable,
}

/// Result of a camera type switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The requested type was already active.
    Unchanged,
    /// The type changed; no surface was attached so nothing was started.
    Switched,
    /// The type changed and a start was attempted.
    Restarted(StartOutcome),
}

/// Clears a transition flag when dropped.
struct TransitionGuard<'a>(&'a AtomicBool);

impl<'a> TransitionGuard<'a> {
    fn try_enter(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Inner {
    camera_type: CameraType,
    capture_mode: CaptureMode,
    surface: Option<PreviewSurface>,
    device: Option<Arc<dyn CameraDevice>>,
    session: Option<CameraSession>,
}

/// Owns a single camera resource.
pub struct CameraHandle {
    pool: Arc<dyn CameraPool>,
    frame_callback: FrameCallback,
    inner: Mutex<Inner>,
    starting: AtomicBool,
    stopping: AtomicBool,
    starts: AtomicU64,
    stops: AtomicU64,
}

impl CameraHandle {
    /// Creates a closed handle. `frame_callback` is registered on every start.
    pub fn new(pool: Arc<dyn CameraPool>, camera_type: CameraType, frame_callback: FrameCallback) -> Self {
        Self {
            pool,
            frame_callback,
            inner: Mutex::new(Inner {
                camera_type,
                capture_mode: CaptureMode::default(),
                surface: None,
                device: None,
                session: None,
            }),
            starting: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
            starts: AtomicU64::new(0),
            stops: AtomicU64::new(0),
        }
    }

    /// Acquires and configures the camera, then starts the preview.
    ///
    /// On a configuration failure the camera is torn down again and the
    /// error is returned once. A camera that is missing or vanishes during
    /// configuration yields `Ok(StartOutcome::Unavailable)`.
    pub fn start(&self, camera_type: CameraType, capture_mode: CaptureMode) -> Result<StartOutcome, CameraError> {
        let Some(_guard) = TransitionGuard::try_enter(&self.starting) else {
            debug!(camera = %camera_type, "Start already in progress");
            return Ok(StartOutcome::Coalesced);
        };

        let mut inner = self.inner.lock();
        if inner.session.is_some() {
            return Ok(StartOutcome::AlreadyOpen);
        }
        inner.camera_type = camera_type;
        inner.capture_mode = capture_mode;

        let device = match self.pool.acquire(camera_type) {
            Ok(device) => device,
            Err(CameraError::HardwareUnavailable(reason)) => {
                warn!(camera = %camera_type, %reason, "Camera unavailable");
                return Ok(StartOutcome::Unavailable);
            }
            Err(e) => return Err(e),
        };
        inner.device = Some(Arc::clone(&device));

        match self.configure(device.as_ref(), camera_type, capture_mode, inner.surface.as_ref()) {
            Ok(session) => {
                info!(
                    camera = %camera_type,
                    picture = %session.picture_size,
                    focus = ?session.focus_mode,
                    "Camera started"
                );
                inner.session = Some(session);
                self.starts.fetch_add(1, Ordering::Relaxed);
                Ok(StartOutcome::Started)
            }
            Err(CameraError::NotOpen) => {
                warn!(camera = %camera_type, "Camera vanished during configuration");
                if let Err(stop_err) = self.teardown(&mut inner) {
                    debug!(error = %stop_err, "Teardown of vanished camera reported an error");
                }
                Ok(StartOutcome::Unavailable)
            }
            Err(e) => {
                warn!(camera = %camera_type, error = %e, "Camera configuration failed");
                if let Err(stop_err) = self.teardown(&mut inner) {
                    debug!(error = %stop_err, "Teardown after failed start reported an error");
                }
                Err(e)
            }
        }
    }

    fn configure(
        &self,
        device: &dyn CameraDevice,
        camera_type: CameraType,
        capture_mode: CaptureMode,
        surface: Option<&PreviewSurface>,
    ) -> Result<CameraSession, CameraError> {
        let mut params = device.parameters()?;

        if let Some(mode) = FocusMode::select(capture_mode, &params.supported_focus_modes) {
            params.focus_mode = Some(mode);
        }

        let picture_size = best_size(params.sizes_for(capture_mode), u32::MAX, u32::MAX)
            .ok_or_else(|| {
                CameraError::ConfigurationRejected(format!(
                    "no supported sizes for {capture_mode:?} capture"
                ))
            })?;
        params.picture_size = picture_size;

        device.set_parameters(&params).map_err(|e| match e {
            CameraError::NotOpen | CameraError::ConfigurationRejected(_) => e,
            other => CameraError::ConfigurationRejected(other.to_string()),
        })?;
        device.set_preview_surface(surface)?;
        device.start_preview()?;
        device.set_frame_callback(Some(Arc::clone(&self.frame_callback)))?;

        Ok(CameraSession {
            camera_type,
            capture_mode,
            picture_size,
            preview_size: params.preview_size,
            focus_mode: params.focus_mode,
        })
    }

    /// Stops the preview and returns the camera to the pool.
    ///
    /// A no-op when nothing is open or another stop is in progress. The
    /// resource is released even if a driver command fails; the first such
    /// failure is returned.
    pub fn stop(&self) -> Result<(), CameraError> {
        let Some(_guard) = TransitionGuard::try_enter(&self.stopping) else {
            debug!("Stop already in progress");
            return Ok(());
        };
        let mut inner = self.inner.lock();
        self.teardown(&mut inner)
    }

    fn teardown(&self, inner: &mut Inner) -> Result<(), CameraError> {
        let Some(device) = inner.device.take() else {
            return Ok(());
        };
        inner.session = None;

        // A camera released underneath us has nothing left to stop.
        let ignore_closed = |r: Result<(), CameraError>| match r {
            Err(CameraError::NotOpen) => Ok(()),
            other => other,
        };
        let preview = ignore_closed(device.stop_preview());
        let callback = ignore_closed(device.set_frame_callback(None));

        self.pool.release(inner.camera_type);
        self.stops.fetch_add(1, Ordering::Relaxed);
        info!(camera = %inner.camera_type, "Camera stopped");

        preview.and(callback)
    }

    /// Stops the current camera and starts `camera_type` as one transition.
    ///
    /// Does nothing if `camera_type` is already active. The new camera is
    /// only started when a preview surface is attached.
    pub fn switch_camera(&self, camera_type: CameraType) -> Result<SwitchOutcome, CameraError> {
        let (current, capture_mode, has_surface) = {
            let inner = self.inner.lock();
            (inner.camera_type, inner.capture_mode, inner.surface.is_some())
        };
        if current == camera_type {
            return Ok(SwitchOutcome::Unchanged);
        }

        if let Err(e) = self.stop() {
            warn!(camera = %current, error = %e, "Stop during camera switch failed");
        }
        self.inner.lock().camera_type = camera_type;

        if !has_surface {
            return Ok(SwitchOutcome::Switched);
        }
        self.start(camera_type, capture_mode).map(SwitchOutcome::Restarted)
    }

    /// Runs [`switch_camera`](Self::switch_camera) on a dedicated thread.
    ///
    /// Returns `None` without spawning anything if the type is unchanged.
    pub fn set_camera_type(
        self: &Arc<Self>,
        camera_type: CameraType,
    ) -> Option<JoinHandle<Result<SwitchOutcome, CameraError>>> {
        if self.camera_type() == camera_type {
            return None;
        }
        let handle = Arc::clone(self);
        match thread::Builder::new()
            .name("camera-switch".into())
            .spawn(move || handle.switch_camera(camera_type))
        {
            Ok(join) => Some(join),
            Err(e) => {
                warn!(error = %e, "Failed to spawn camera switch thread");
                None
            }
        }
    }

    /// Records the capture mode used by the next start.
    pub fn set_capture_mode(&self, capture_mode: CaptureMode) {
        self.inner.lock().capture_mode = capture_mode;
    }

    /// Attaches (or detaches) the preview output surface for future starts.
    pub fn attach_surface(&self, surface: Option<PreviewSurface>) {
        self.inner.lock().surface = surface;
    }

    pub fn surface(&self) -> Option<PreviewSurface> {
        self.inner.lock().surface
    }

    /// Reads, modifies and writes back the live parameter block.
    ///
    /// Does not hold the transition lock: a write racing a stop fails with
    /// [`CameraError::NotOpen`] rather than blocking.
    pub fn update_parameters(
        &self,
        update: impl FnOnce(&mut CameraParameters),
    ) -> Result<CameraParameters, CameraError> {
        let device = self.device().ok_or(CameraError::NotOpen)?;
        let mut params = device.parameters()?;
        update(&mut params);
        device.set_parameters(&params)?;
        Ok(params)
    }

    pub fn set_flash_mode(&self, flash_mode: FlashMode) -> Result<(), CameraError> {
        self.update_parameters(|p| p.flash_mode = flash_mode)
            .map(|_| ())
            .inspect_err(|e| debug!(error = %e, ?flash_mode, "Flash mode not applied"))
    }

    pub fn set_torch(&self, on: bool) -> Result<(), CameraError> {
        self.set_flash_mode(if on { FlashMode::Torch } else { FlashMode::Off })
    }

    /// The open camera device, if any.
    pub fn device(&self) -> Option<Arc<dyn CameraDevice>> {
        self.inner.lock().device.clone()
    }

    pub fn session(&self) -> Option<CameraSession> {
        self.inner.lock().session.clone()
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().session.is_some()
    }

    pub fn camera_type(&self) -> CameraType {
        self.inner.lock().camera_type
    }

    pub fn capture_mode(&self) -> CaptureMode {
        self.inner.lock().capture_mode
    }

    /// Preview width / height of the open session.
    pub fn preview_ratio(&self) -> Option<f64> {
        let inner = self.inner.lock();
        let size = inner.session.as_ref()?.preview_size;
        (size.height > 0).then(|| f64::from(size.width) / f64::from(size.height))
    }

    /// Successful starts since creation.
    pub fn starts(&self) -> u64 {
        self.starts.load(Ordering::Relaxed)
    }

    /// Completed stops since creation.
    pub fn stops(&self) -> u64 {
        self.stops.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{MockCamera, MockCameraPool, PreviewFrame};
    use std::sync::Barrier;
    use std::time::Duration;

    /// Hands out cameras that are closed again before configuration.
    struct VanishingPool(Arc<MockCameraPool>);

    impl CameraPool for VanishingPool {
        fn acquire(&self, camera_type: CameraType) -> Result<Arc<dyn CameraDevice>, CameraError> {
            let device = self.0.acquire(camera_type)?;
            if let Some(mock) = self.0.device(camera_type) {
                mock.close();
            }
            Ok(device)
        }

        fn release(&self, camera_type: CameraType) {
            self.0.release(camera_type);
        }
    }

    #[test]
    fn test_vanished_camera_is_returned_to_pool() {
        let pool = Arc::new(MockCameraPool::with_both());
        let handle = CameraHandle::new(
            Arc::new(VanishingPool(pool.clone())),
            CameraType::Back,
            Arc::new(|_: PreviewFrame| {}),
        );

        let outcome = handle.start(CameraType::Back, CaptureMode::Still).unwrap();
        assert_eq!(outcome, StartOutcome::Unavailable);
        assert!(!handle.is_open());
        assert!(handle.session().is_none());
        assert_eq!(pool.acquisitions(CameraType::Back), 1);
        assert_eq!(pool.releases(CameraType::Back), 1);
        assert_eq!(handle.stops(), 1);
    }

    fn handle_with(pool: Arc<MockCameraPool>) -> Arc<CameraHandle> {
        let handle = CameraHandle::new(pool, CameraType::Back, Arc::new(|_: PreviewFrame| {}));
        handle.attach_surface(Some(PreviewSurface::new(1, 640, 480)));
        Arc::new(handle)
    }

    #[test]
    fn test_start_configures_camera() {
        let pool = Arc::new(MockCameraPool::with_both());
        let handle = handle_with(Arc::clone(&pool));

        let outcome = handle.start(CameraType::Back, CaptureMode::Still).unwrap();
        assert_eq!(outcome, StartOutcome::Started);

        let camera = pool.device(CameraType::Back).unwrap();
        let params = camera.current_parameters();
        assert_eq!(params.focus_mode, Some(FocusMode::ContinuousPicture));
        assert_eq!(params.picture_size, Size::new(4032, 3024));
        assert!(camera.is_previewing());
        assert!(camera.has_frame_callback());
        assert_eq!(camera.surface().map(|s| s.id()), Some(1));
        assert_eq!(handle.preview_ratio(), Some(640.0 / 480.0));
    }

    #[test]
    fn test_video_mode_uses_video_sizes() {
        let pool = Arc::new(MockCameraPool::with_both());
        let handle = handle_with(Arc::clone(&pool));

        handle.start(CameraType::Back, CaptureMode::Video).unwrap();
        let session = handle.session().unwrap();
        assert_eq!(session.picture_size, Size::new(1920, 1080));
        assert_eq!(session.focus_mode, Some(FocusMode::ContinuousVideo));
    }

    #[test]
    fn test_second_start_is_noop() {
        let pool = Arc::new(MockCameraPool::with_both());
        let handle = handle_with(Arc::clone(&pool));

        handle.start(CameraType::Back, CaptureMode::Still).unwrap();
        let outcome = handle.start(CameraType::Back, CaptureMode::Still).unwrap();
        assert_eq!(outcome, StartOutcome::AlreadyOpen);
        assert_eq!(pool.acquisitions(CameraType::Back), 1);
    }

    #[test]
    fn test_concurrent_starts_acquire_once() {
        let pool = Arc::new(MockCameraPool::with_both());
        pool.set_acquire_delay(Duration::from_millis(50));
        let handle = handle_with(Arc::clone(&pool));
        let barrier = Arc::new(Barrier::new(2));

        let threads: Vec<_> = (0..2)
            .map(|_| {
                let handle = Arc::clone(&handle);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    handle.start(CameraType::Back, CaptureMode::Still).unwrap()
                })
            })
            .collect();
        let outcomes: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();

        assert_eq!(pool.acquisitions(CameraType::Back), 1);
        assert_eq!(
            outcomes.iter().filter(|o| **o == StartOutcome::Started).count(),
            1
        );
        assert!(handle.is_open());
    }

    #[test]
    fn test_stop_without_camera_is_noop() {
        let pool = Arc::new(MockCameraPool::with_both());
        let handle = handle_with(Arc::clone(&pool));

        assert!(handle.stop().is_ok());
        assert!(handle.stop().is_ok());
        assert_eq!(pool.releases(CameraType::Back), 0);
        assert_eq!(handle.stops(), 0);
    }

    #[test]
    fn test_stop_releases_camera() {
        let pool = Arc::new(MockCameraPool::with_both());
        let handle = handle_with(Arc::clone(&pool));
        handle.start(CameraType::Back, CaptureMode::Still).unwrap();
        let camera = pool.device(CameraType::Back).unwrap();

        handle.stop().unwrap();
        assert!(!handle.is_open());
        assert_eq!(pool.releases(CameraType::Back), 1);
        assert_eq!(camera.calls().stop_preview, 1);
        assert!(!camera.has_frame_callback());
        assert!(handle.preview_ratio().is_none());
    }

    #[test]
    fn test_unavailable_camera_is_swallowed() {
        let pool = Arc::new(MockCameraPool::with_both());
        pool.set_unavailable(CameraType::Back, true);
        let handle = handle_with(Arc::clone(&pool));

        let outcome = handle.start(CameraType::Back, CaptureMode::Still).unwrap();
        assert_eq!(outcome, StartOutcome::Unavailable);
        assert!(!handle.is_open());
        assert_eq!(pool.releases(CameraType::Back), 0);
    }

    #[test]
    fn test_rejected_parameters_unwind() {
        let pool = Arc::new(MockCameraPool::with_both());
        let handle = handle_with(Arc::clone(&pool));
        pool.device(CameraType::Back).unwrap().reject_parameters(true);

        let result = handle.start(CameraType::Back, CaptureMode::Still);
        assert!(matches!(result, Err(CameraError::ConfigurationRejected(_))));
        assert!(!handle.is_open());
        assert_eq!(pool.releases(CameraType::Back), 1);

        // Self-healing: a later start succeeds once the camera cooperates
        pool.device(CameraType::Back).unwrap().reject_parameters(false);
        assert_eq!(
            handle.start(CameraType::Back, CaptureMode::Still).unwrap(),
            StartOutcome::Started
        );
    }

    #[test]
    fn test_no_sizes_rejected() {
        let pool = Arc::new(MockCameraPool::new());
        let mut params = MockCamera::default_parameters();
        params.supported_picture_sizes.clear();
        pool.insert(CameraType::Back, Arc::new(MockCamera::with_parameters(params)));
        let handle = handle_with(Arc::clone(&pool));

        assert!(matches!(
            handle.start(CameraType::Back, CaptureMode::Still),
            Err(CameraError::ConfigurationRejected(_))
        ));
        assert_eq!(pool.releases(CameraType::Back), 1);
    }

    #[test]
    fn test_set_same_camera_type_does_nothing() {
        let pool = Arc::new(MockCameraPool::with_both());
        let handle = handle_with(Arc::clone(&pool));
        handle.start(CameraType::Back, CaptureMode::Still).unwrap();

        assert!(handle.set_camera_type(CameraType::Back).is_none());
        assert_eq!(handle.switch_camera(CameraType::Back).unwrap(), SwitchOutcome::Unchanged);
        assert_eq!(pool.acquisitions(CameraType::Back), 1);
        assert_eq!(pool.releases(CameraType::Back), 0);
        assert_eq!((handle.starts(), handle.stops()), (1, 0));
    }

    #[test]
    fn test_set_camera_type_switches_on_thread() {
        let pool = Arc::new(MockCameraPool::with_both());
        let handle = handle_with(Arc::clone(&pool));
        handle.start(CameraType::Back, CaptureMode::Still).unwrap();

        let join = handle.set_camera_type(CameraType::Front).unwrap();
        let outcome = join.join().unwrap().unwrap();

        assert_eq!(outcome, SwitchOutcome::Restarted(StartOutcome::Started));
        assert_eq!(pool.releases(CameraType::Back), 1);
        assert_eq!(pool.acquisitions(CameraType::Front), 1);
        assert_eq!(handle.camera_type(), CameraType::Front);
    }

    #[test]
    fn test_switch_without_surface_only_records_type() {
        let pool = Arc::new(MockCameraPool::with_both());
        let handle = CameraHandle::new(pool.clone(), CameraType::Back, Arc::new(|_: PreviewFrame| {}));

        assert_eq!(handle.switch_camera(CameraType::Front).unwrap(), SwitchOutcome::Switched);
        assert_eq!(handle.camera_type(), CameraType::Front);
        assert_eq!(pool.acquisitions(CameraType::Front), 0);
    }

    #[test]
    fn test_parameter_write_after_release_fails_quietly() {
        let pool = Arc::new(MockCameraPool::with_both());
        let handle = handle_with(Arc::clone(&pool));
        handle.start(CameraType::Back, CaptureMode::Still).unwrap();

        // Device released behind the handle's back
        let device = handle.device().unwrap();
        pool.release(CameraType::Back);
        assert!(matches!(device.set_parameters(&CameraParameters::default()), Err(CameraError::NotOpen)));
        assert!(matches!(handle.set_torch(true), Err(CameraError::NotOpen)));

        handle.stop().unwrap();
        assert!(matches!(handle.set_flash_mode(FlashMode::On), Err(CameraError::NotOpen)));
    }

    #[test]
    fn test_torch_sets_flash_mode() {
        let pool = Arc::new(MockCameraPool::with_both());
        let handle = handle_with(Arc::clone(&pool));
        handle.start(CameraType::Back, CaptureMode::Still).unwrap();

        handle.set_torch(true).unwrap();
        let camera = pool.device(CameraType::Back).unwrap();
        assert_eq!(camera.current_parameters().flash_mode, FlashMode::Torch);
    }
}
