//! Live upload of the preview surface.

use super::{
    write_credentials_file, IngestionClient, IngestionClientFactory, MediaSource,
    MediaSourceConfig, StreamError,
};
use crate::capture::{PreviewSurface, StreamConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Default)]
struct SessionInner {
    client: Option<Box<dyn IngestionClient>>,
    source: Option<Box<dyn MediaSource>>,
}

/// Streams the preview surface to the ingestion service.
///
/// Runs beside the decode pipeline and shares nothing with it but the
/// preview surface. Every error stays inside the session.
pub struct StreamSession {
    factory: Arc<dyn IngestionClientFactory>,
    config: StreamConfig,
    inner: Mutex<SessionInner>,
    active: AtomicBool,
}

impl StreamSession {
    pub fn new(factory: Arc<dyn IngestionClientFactory>, config: StreamConfig) -> Self {
        Self {
            factory,
            config,
            inner: Mutex::new(SessionInner::default()),
            active: AtomicBool::new(false),
        }
    }

    /// Creates the client and media source for `surface` and starts upload.
    ///
    /// A session that already has a media source just resumes.
    pub fn start(&self, surface: &PreviewSurface) -> Result<(), StreamError> {
        let mut inner = self.inner.lock();
        if inner.source.is_none() {
            self.create(&mut inner, surface)?;
        }
        self.resume_locked(&mut inner)
    }

    fn create(&self, inner: &mut SessionInner, surface: &PreviewSurface) -> Result<(), StreamError> {
        let credentials = write_credentials_file(&self.config.credentials_dir, "")?;
        let client = match inner.client.take() {
            Some(client) => client,
            None => self.factory.create_client(&credentials)?,
        };
        let client = inner.client.insert(client);

        let cameras = client.cameras()?;
        let camera = cameras.first().ok_or(StreamError::NoCamera)?;
        let mime_types = client.supported_mime_types();
        let mime_type = mime_types.first().ok_or(StreamError::NoEncoder)?;
        debug!(cameras = cameras.len(), ?mime_types, "Ingestion capabilities");

        let media_config = MediaSourceConfig::for_camera(camera, mime_type, &self.config);
        info!(
            stream = %self.config.stream_name,
            camera = %media_config.camera_id,
            mime = %media_config.mime_type,
            width = media_config.width,
            height = media_config.height,
            surface_width = surface.width(),
            surface_height = surface.height(),
            "Creating media source"
        );

        let mut source = client.create_media_source(&self.config.stream_name, &media_config)?;
        source.set_preview_surface(surface)?;
        inner.source = Some(source);
        Ok(())
    }

    /// Starts the media source. A no-op before it exists.
    pub fn resume(&self) -> Result<(), StreamError> {
        let mut inner = self.inner.lock();
        self.resume_locked(&mut inner)
    }

    fn resume_locked(&self, inner: &mut SessionInner) -> Result<(), StreamError> {
        let Some(source) = inner.source.as_mut() else {
            return Ok(());
        };
        source.start()?;
        self.active.store(true, Ordering::Release);
        info!(stream = %self.config.stream_name, "Streaming started");
        Ok(())
    }

    /// Stops the media source. A no-op before it exists.
    pub fn pause(&self) -> Result<(), StreamError> {
        let mut inner = self.inner.lock();
        let Some(source) = inner.source.as_mut() else {
            return Ok(());
        };
        source.stop()?;
        self.active.store(false, Ordering::Release);
        info!(stream = %self.config.stream_name, "Streaming paused");
        Ok(())
    }

    /// Stops the media source, stops all sources on the client and frees it.
    ///
    /// Every step runs even if an earlier one fails; failures are logged and
    /// the first is returned.
    pub fn teardown(&self) -> Result<(), StreamError> {
        let mut inner = self.inner.lock();
        self.active.store(false, Ordering::Release);
        let mut first_error = None;

        let mut record = |step: &str, result: Result<(), StreamError>| {
            if let Err(e) = result {
                warn!(step, error = %e, "Streaming teardown step failed");
                first_error.get_or_insert(e);
            }
        };

        if let Some(mut source) = inner.source.take() {
            record("stop media source", source.stop());
        }
        if let Some(mut client) = inner.client.take() {
            record("stop all media sources", client.stop_all_media_sources());
            record("free client", client.free());
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}
