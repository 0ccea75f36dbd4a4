//! Live upload of the camera preview to a video ingestion service.
//!
//! Streaming is a sibling consumer of the preview surface. It never touches
//! preview frames or the decode gate, and every failure here is reported as
//! a [`StreamError`] that leaves camera and decode state alone.

mod credentials;
mod ingestion;
mod mock;
mod session;

pub use credentials::{write_credentials_file, CREDENTIALS_FILE_NAME};
pub use ingestion::{
    CameraInfo, IngestionClient, IngestionClientFactory, MediaSource, MediaSourceConfig,
    NalAdaptation,
};
pub use mock::{IngestionCalls, MockIngestion};
pub use session::StreamSession;

use std::path::PathBuf;
use thiserror::Error;

/// Streaming setup and control failures.
///
/// Fatal to the stream session only.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("failed to write credentials file {path}: {source}")]
    Credentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("ingestion client reported no cameras")]
    NoCamera,
    #[error("ingestion client supports no encoder")]
    NoEncoder,
    #[error("ingestion service error: {0}")]
    Ingestion(String),
}
