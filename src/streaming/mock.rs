//! In-process ingestion service for tests and the demonstration binary.

use super::{
    CameraInfo, IngestionClient, IngestionClientFactory, MediaSource, MediaSourceConfig,
    StreamError,
};
use crate::capture::{CameraType, PreviewSurface};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Counts of ingestion calls seen by a [`MockIngestion`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionCalls {
    pub clients_created: u32,
    pub sources_created: u32,
    pub source_starts: u32,
    pub source_stops: u32,
    pub stop_all: u32,
    pub frees: u32,
}

struct IngestionState {
    cameras: Vec<CameraInfo>,
    mime_types: Vec<String>,
    fail_client_creation: bool,
    fail_source_stop: bool,
    calls: IngestionCalls,
    stream_name: Option<String>,
    last_config: Option<MediaSourceConfig>,
    surface: Option<PreviewSurface>,
    streaming: bool,
}

/// Mock ingestion service. Clients and sources it creates share its state.
pub struct MockIngestion {
    state: Arc<Mutex<IngestionState>>,
}

impl MockIngestion {
    /// One back camera at 90 degrees and an `video/avc` encoder.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(IngestionState {
                cameras: vec![CameraInfo {
                    camera_id: "0".into(),
                    facing: CameraType::Back,
                    orientation: 90,
                    hardware_accelerated: true,
                }],
                mime_types: vec!["video/avc".into()],
                fail_client_creation: false,
                fail_source_stop: false,
                calls: IngestionCalls::default(),
                stream_name: None,
                last_config: None,
                surface: None,
                streaming: false,
            })),
        }
    }

    pub fn set_cameras(&self, cameras: Vec<CameraInfo>) {
        self.state.lock().cameras = cameras;
    }

    pub fn set_mime_types(&self, mime_types: Vec<String>) {
        self.state.lock().mime_types = mime_types;
    }

    pub fn fail_client_creation(&self, fail: bool) {
        self.state.lock().fail_client_creation = fail;
    }

    pub fn fail_source_stop(&self, fail: bool) {
        self.state.lock().fail_source_stop = fail;
    }

    pub fn calls(&self) -> IngestionCalls {
        self.state.lock().calls
    }

    pub fn stream_name(&self) -> Option<String> {
        self.state.lock().stream_name.clone()
    }

    pub fn last_config(&self) -> Option<MediaSourceConfig> {
        self.state.lock().last_config.clone()
    }

    pub fn surface(&self) -> Option<PreviewSurface> {
        self.state.lock().surface
    }

    /// Whether a media source is currently started.
    pub fn is_streaming(&self) -> bool {
        self.state.lock().streaming
    }
}

impl Default for MockIngestion {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestionClientFactory for MockIngestion {
    fn create_client(&self, credentials: &Path) -> Result<Box<dyn IngestionClient>, StreamError> {
        let mut state = self.state.lock();
        if state.fail_client_creation {
            return Err(StreamError::Ingestion(format!(
                "cannot load credentials from {}",
                credentials.display()
            )));
        }
        state.calls.clients_created += 1;
        Ok(Box::new(MockClient {
            state: Arc::clone(&self.state),
            freed: false,
        }))
    }
}

struct MockClient {
    state: Arc<Mutex<IngestionState>>,
    freed: bool,
}

impl MockClient {
    fn check(&self) -> Result<(), StreamError> {
        if self.freed {
            return Err(StreamError::Ingestion("client already freed".into()));
        }
        Ok(())
    }
}

impl IngestionClient for MockClient {
    fn cameras(&self) -> Result<Vec<CameraInfo>, StreamError> {
        self.check()?;
        Ok(self.state.lock().cameras.clone())
    }

    fn supported_mime_types(&self) -> Vec<String> {
        self.state.lock().mime_types.clone()
    }

    fn create_media_source(
        &mut self,
        stream_name: &str,
        config: &MediaSourceConfig,
    ) -> Result<Box<dyn MediaSource>, StreamError> {
        self.check()?;
        let mut state = self.state.lock();
        state.calls.sources_created += 1;
        state.stream_name = Some(stream_name.to_string());
        state.last_config = Some(config.clone());
        Ok(Box::new(MockSource {
            state: Arc::clone(&self.state),
        }))
    }

    fn stop_all_media_sources(&mut self) -> Result<(), StreamError> {
        self.check()?;
        let mut state = self.state.lock();
        state.calls.stop_all += 1;
        state.streaming = false;
        Ok(())
    }

    fn free(&mut self) -> Result<(), StreamError> {
        self.check()?;
        self.freed = true;
        self.state.lock().calls.frees += 1;
        Ok(())
    }
}

struct MockSource {
    state: Arc<Mutex<IngestionState>>,
}

impl MediaSource for MockSource {
    fn set_preview_surface(&mut self, surface: &PreviewSurface) -> Result<(), StreamError> {
        self.state.lock().surface = Some(*surface);
        Ok(())
    }

    fn start(&mut self) -> Result<(), StreamError> {
        let mut state = self.state.lock();
        state.calls.source_starts += 1;
        state.streaming = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), StreamError> {
        let mut state = self.state.lock();
        if state.fail_source_stop {
            return Err(StreamError::Ingestion("media source stop failed".into()));
        }
        state.calls.source_stops += 1;
        state.streaming = false;
        Ok(())
    }
}
