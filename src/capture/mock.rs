//! Mock camera devices for testing and the demonstration binary.
//!
//! [`MockCamera`] behaves like a driver-owned camera: it keeps a parameter
//! block, accepts a preview surface and frame callback, and delivers frames
//! pushed through [`MockCamera::emit_frame`]. [`MockCameraPool`] counts
//! acquisitions and releases per camera type.

use super::{
    AutoFocusCallback, CameraDevice, CameraError, CameraParameters, CameraPool, CameraType,
    FocusMode, FrameCallback, PreviewFrame, PreviewSurface, Size,
};
use parking_lot::Mutex;
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Counts of driver commands received by a [`MockCamera`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub set_parameters: u32,
    pub start_preview: u32,
    pub stop_preview: u32,
    pub auto_focus: u32,
    pub cancel_auto_focus: u32,
}

#[derive(Default)]
struct MockState {
    params: CameraParameters,
    open: bool,
    previewing: bool,
    surface: Option<PreviewSurface>,
    callback: Option<FrameCallback>,
    calls: MockCalls,
    reject_parameters: bool,
    fail_auto_focus: bool,
    auto_focus_result: bool,
}

/// Mock camera driven entirely from test code.
pub struct MockCamera {
    state: Mutex<MockState>,
}

impl MockCamera {
    /// Creates an open mock camera with typical phone-camera capabilities.
    pub fn new() -> Self {
        Self::with_parameters(Self::default_parameters())
    }

    pub fn with_parameters(params: CameraParameters) -> Self {
        Self {
            state: Mutex::new(MockState {
                params,
                open: true,
                auto_focus_result: true,
                ..Default::default()
            }),
        }
    }

    /// Parameters of a typical rear camera.
    pub fn default_parameters() -> CameraParameters {
        CameraParameters {
            supported_focus_modes: vec![
                FocusMode::Auto,
                FocusMode::ContinuousPicture,
                FocusMode::ContinuousVideo,
            ],
            supported_picture_sizes: vec![
                Size::new(640, 480),
                Size::new(4032, 3024),
                Size::new(1920, 1080),
            ],
            supported_video_sizes: vec![Size::new(1280, 720), Size::new(1920, 1080)],
            focus_mode: None,
            picture_size: Size::new(640, 480),
            preview_size: Size::new(640, 480),
            zoom_supported: true,
            zoom: 0,
            max_zoom: 10,
            max_focus_areas: 1,
            max_metering_areas: 1,
            ..Default::default()
        }
    }

    /// Makes every subsequent `set_parameters` fail.
    pub fn reject_parameters(&self, reject: bool) {
        self.state.lock().reject_parameters = reject;
    }

    /// Makes every subsequent `auto_focus` fail.
    pub fn fail_auto_focus(&self, fail: bool) {
        self.state.lock().fail_auto_focus = fail;
    }

    /// Result reported to autofocus callbacks.
    pub fn set_auto_focus_result(&self, success: bool) {
        self.state.lock().auto_focus_result = success;
    }

    /// Marks the camera released; later commands fail with `NotOpen`.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.open = false;
        state.previewing = false;
        state.callback = None;
    }

    /// Reopens a closed camera.
    pub fn reopen(&self) {
        self.state.lock().open = true;
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    pub fn is_previewing(&self) -> bool {
        self.state.lock().previewing
    }

    pub fn has_frame_callback(&self) -> bool {
        self.state.lock().callback.is_some()
    }

    pub fn surface(&self) -> Option<PreviewSurface> {
        self.state.lock().surface
    }

    pub fn calls(&self) -> MockCalls {
        self.state.lock().calls
    }

    /// Snapshot of the current parameter block, regardless of open state.
    pub fn current_parameters(&self) -> CameraParameters {
        self.state.lock().params.clone()
    }

    /// Delivers a frame to the registered callback as the producer thread would.
    ///
    /// Returns false when the camera is not previewing or has no callback.
    pub fn emit_frame(&self, frame: PreviewFrame) -> bool {
        // The callback runs outside the lock, like a driver thread.
        let callback = {
            let state = self.state.lock();
            if !state.open || !state.previewing {
                return false;
            }
            state.callback.clone()
        };
        match callback {
            Some(callback) => {
                callback(frame);
                true
            }
            None => false,
        }
    }

    /// Generates a deterministic noise frame in Gray8.
    pub fn noise_frame(width: u32, height: u32, seed: u64) -> PreviewFrame {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut pixels = vec![0u8; (width as usize) * (height as usize)];
        rng.fill_bytes(&mut pixels);
        PreviewFrame::gray(pixels, width, height, seed)
    }

    fn with_open<T>(&self, f: impl FnOnce(&mut MockState) -> Result<T, CameraError>) -> Result<T, CameraError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(CameraError::NotOpen);
        }
        f(&mut state)
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraDevice for MockCamera {
    fn parameters(&self) -> Result<CameraParameters, CameraError> {
        self.with_open(|state| Ok(state.params.clone()))
    }

    fn set_parameters(&self, params: &CameraParameters) -> Result<(), CameraError> {
        self.with_open(|state| {
            state.calls.set_parameters += 1;
            if state.reject_parameters {
                return Err(CameraError::ConfigurationRejected(
                    "setParameters failed".into(),
                ));
            }
            state.params = params.clone();
            Ok(())
        })
    }

    fn set_preview_surface(&self, surface: Option<&PreviewSurface>) -> Result<(), CameraError> {
        self.with_open(|state| {
            state.surface = surface.copied();
            Ok(())
        })
    }

    fn set_frame_callback(&self, callback: Option<FrameCallback>) -> Result<(), CameraError> {
        self.with_open(|state| {
            state.callback = callback;
            Ok(())
        })
    }

    fn start_preview(&self) -> Result<(), CameraError> {
        self.with_open(|state| {
            state.calls.start_preview += 1;
            state.previewing = true;
            Ok(())
        })
    }

    fn stop_preview(&self) -> Result<(), CameraError> {
        self.with_open(|state| {
            state.calls.stop_preview += 1;
            state.previewing = false;
            Ok(())
        })
    }

    fn auto_focus(&self, done: AutoFocusCallback) -> Result<(), CameraError> {
        let success = self.with_open(|state| {
            state.calls.auto_focus += 1;
            if state.fail_auto_focus {
                return Err(CameraError::Device("autoFocus failed".into()));
            }
            Ok(state.auto_focus_result)
        })?;
        done(success);
        Ok(())
    }

    fn cancel_auto_focus(&self) -> Result<(), CameraError> {
        self.with_open(|state| {
            state.calls.cancel_auto_focus += 1;
            Ok(())
        })
    }
}

#[derive(Default)]
struct PoolState {
    devices: HashMap<CameraType, Arc<MockCamera>>,
    unavailable: HashSet<CameraType>,
    acquisitions: HashMap<CameraType, u32>,
    releases: HashMap<CameraType, u32>,
}

/// Camera pool handing out [`MockCamera`]s.
#[derive(Default)]
pub struct MockCameraPool {
    state: Mutex<PoolState>,
    acquire_delay: Mutex<Option<Duration>>,
}

impl MockCameraPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a device for a camera type.
    pub fn insert(&self, camera_type: CameraType, camera: Arc<MockCamera>) {
        self.state.lock().devices.insert(camera_type, camera);
    }

    /// Creates a pool with a default mock for both camera types.
    pub fn with_both() -> Self {
        let pool = Self::new();
        pool.insert(CameraType::Back, Arc::new(MockCamera::new()));
        pool.insert(CameraType::Front, Arc::new(MockCamera::new()));
        pool
    }

    /// Returns the mock registered for `camera_type`.
    pub fn device(&self, camera_type: CameraType) -> Option<Arc<MockCamera>> {
        self.state.lock().devices.get(&camera_type).cloned()
    }

    /// Makes acquisitions of `camera_type` fail as if no hardware existed.
    pub fn set_unavailable(&self, camera_type: CameraType, unavailable: bool) {
        let mut state = self.state.lock();
        if unavailable {
            state.unavailable.insert(camera_type);
        } else {
            state.unavailable.remove(&camera_type);
        }
    }

    /// Sleeps inside `acquire`, simulating slow hardware I/O.
    pub fn set_acquire_delay(&self, delay: Duration) {
        *self.acquire_delay.lock() = Some(delay);
    }

    pub fn acquisitions(&self, camera_type: CameraType) -> u32 {
        self.state.lock().acquisitions.get(&camera_type).copied().unwrap_or(0)
    }

    pub fn releases(&self, camera_type: CameraType) -> u32 {
        self.state.lock().releases.get(&camera_type).copied().unwrap_or(0)
    }
}

impl CameraPool for MockCameraPool {
    fn acquire(&self, camera_type: CameraType) -> Result<Arc<dyn CameraDevice>, CameraError> {
        let delay = *self.acquire_delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let mut state = self.state.lock();
        if state.unavailable.contains(&camera_type) {
            return Err(CameraError::HardwareUnavailable(format!(
                "no {camera_type} camera"
            )));
        }
        let device = state
            .devices
            .get(&camera_type)
            .cloned()
            .ok_or_else(|| CameraError::HardwareUnavailable(format!("no {camera_type} camera")))?;
        device.reopen();
        *state.acquisitions.entry(camera_type).or_insert(0) += 1;
        Ok(device)
    }

    fn release(&self, camera_type: CameraType) {
        let mut state = self.state.lock();
        if let Some(device) = state.devices.get(&camera_type) {
            device.close();
        }
        *state.releases.entry(camera_type).or_insert(0) += 1;
    }
}
