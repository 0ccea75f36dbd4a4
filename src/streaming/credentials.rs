//! Credentials file handed to the ingestion client.

use super::StreamError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name the ingestion client reads its credentials from.
pub const CREDENTIALS_FILE_NAME: &str = "credentials.properties";

/// Writes `contents` to `dir/credentials.properties`, replacing any existing
/// file, and returns the file's path.
pub fn write_credentials_file(dir: &Path, contents: &str) -> Result<PathBuf, StreamError> {
    let path = dir.join(CREDENTIALS_FILE_NAME);
    let credentials_error = |source| StreamError::Credentials {
        path: path.clone(),
        source,
    };

    fs::create_dir_all(dir).map_err(credentials_error)?;
    fs::write(&path, contents).map_err(credentials_error)?;
    debug!(path = %path.display(), "Credentials file written");
    Ok(path)
}
