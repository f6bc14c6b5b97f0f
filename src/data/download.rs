//! Dataset download over HTTP.

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::info;

use crate::error::AppError;

/// Fetch `url` and write the body to `dest`. Returns the number of bytes written.
pub fn download_dataset(url: &str, dest: &Path) -> Result<u64, AppError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(300))
        .build()
        .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;

    info!(%url, "downloading dataset");
    let resp = client
        .get(url)
        .send()
        .map_err(|e| AppError::new(4, format!("Download request failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(AppError::new(
            4,
            format!("Download failed with status {}.", resp.status()),
        ));
    }

    let bytes = resp
        .bytes()
        .map_err(|e| AppError::new(4, format!("Failed to read download body: {e}")))?;
    if bytes.is_empty() {
        return Err(AppError::new(4, "Download returned an empty body."));
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", parent.display())))?;
    }
    std::fs::write(dest, &bytes)
        .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", dest.display())))?;

    info!(path = %dest.display(), bytes = bytes.len(), "dataset saved");
    Ok(bytes.len() as u64)
}
