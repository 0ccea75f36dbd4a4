//! Video ingestion capability.
//!
//! The remote ingestion service is reached through a client library this
//! crate does not implement. These traits describe the calls the stream
//! session makes into it.

use super::StreamError;
use crate::capture::{CameraType, PreviewSurface, StreamConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A camera as enumerated by the ingestion client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraInfo {
    pub camera_id: String,
    pub facing: CameraType,
    /// Sensor orientation in degrees.
    pub orientation: i32,
    pub hardware_accelerated: bool,
}

/// How encoder NAL units are framed before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NalAdaptation {
    /// Annex-B codec private data and frame NALs.
    #[default]
    AnnexBCpdAndFrameNals,
    None,
}

/// Media source configuration handed to the ingestion client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSourceConfig {
    pub camera_id: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub facing: CameraType,
    pub hardware_accelerated: bool,
    pub frame_rate: u32,
    pub retention_hours: u32,
    pub bitrate_bps: u32,
    /// Negated sensor orientation.
    pub orientation: i32,
    pub nal_adaptation: NalAdaptation,
    pub absolute_timecode: bool,
}

impl MediaSourceConfig {
    /// Builds the configuration for `camera` from the stream settings.
    pub fn for_camera(camera: &CameraInfo, mime_type: &str, stream: &StreamConfig) -> Self {
        Self {
            camera_id: camera.camera_id.clone(),
            mime_type: mime_type.to_string(),
            width: stream.width,
            height: stream.height,
            facing: camera.facing,
            hardware_accelerated: camera.hardware_accelerated,
            frame_rate: stream.frame_rate,
            retention_hours: stream.retention_hours,
            bitrate_bps: stream.bitrate_bps,
            orientation: -camera.orientation,
            nal_adaptation: NalAdaptation::AnnexBCpdAndFrameNals,
            absolute_timecode: false,
        }
    }
}

/// Creates ingestion clients from a credentials file.
pub trait IngestionClientFactory: Send + Sync {
    fn create_client(&self, credentials: &Path) -> Result<Box<dyn IngestionClient>, StreamError>;
}

/// A connected ingestion client.
pub trait IngestionClient: Send {
    fn cameras(&self) -> Result<Vec<CameraInfo>, StreamError>;

    /// Encoder MIME types in preference order.
    fn supported_mime_types(&self) -> Vec<String>;

    fn create_media_source(
        &mut self,
        stream_name: &str,
        config: &MediaSourceConfig,
    ) -> Result<Box<dyn MediaSource>, StreamError>;

    fn stop_all_media_sources(&mut self) -> Result<(), StreamError>;

    /// Releases the client's resources. The client is unusable afterwards.
    fn free(&mut self) -> Result<(), StreamError>;
}

/// A media source that encodes the preview surface and uploads it.
pub trait MediaSource: Send {
    fn set_preview_surface(&mut self, surface: &PreviewSurface) -> Result<(), StreamError>;
    fn start(&mut self) -> Result<(), StreamError>;
    fn stop(&mut self) -> Result<(), StreamError>;
}
