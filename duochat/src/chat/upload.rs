//! File sharing: upload placeholders, HTTP transfer, downloads.
//!
//! Selecting files creates one pending placeholder per file and one
//! [`UploadJob`] per file. Jobs run independently; the server's
//! `file-shared` broadcast carries the placeholder's temporary id back so
//! the ledger can confirm it. A transfer failure only removes its own
//! placeholder.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use reqwest::multipart::{Form, Part};
use url::Url;

use super::ledger::{EntryId, LedgerEntry};

/// Errors from file transfers.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The local file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadFile {
        /// File that was selected.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The downloaded file could not be written.
    #[error("failed to write {path}: {source}")]
    WriteFile {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The HTTP request failed or returned a non-success status.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A server-relative path could not be turned into a URL.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// A download name had no usable base name.
    #[error("file name {0:?} cannot be saved")]
    InvalidFileName(String),
}

/// One file upload, bound to its placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    /// Temporary id of the placeholder entry.
    pub temp_id: EntryId,
    /// Local path of the selected file.
    pub path: PathBuf,
    /// Base name shown to users and sent as the multipart file name.
    pub file_name: String,
    /// Room the file is shared into.
    pub room_id: String,
    /// Transport identifier of the uploader.
    pub sender_id: String,
}

/// Tracks which placeholders still have a transfer running.
#[derive(Debug, Default)]
pub struct UploadOrchestrator {
    in_flight: HashMap<EntryId, String>,
}

impl UploadOrchestrator {
    /// No uploads in flight.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an upload: build its placeholder and job.
    ///
    /// The placeholder's size comes from the file's metadata when readable;
    /// an unreadable file still gets a placeholder and fails in transfer.
    pub fn begin(&mut self, path: &Path, room_id: &str, sender_id: &str) -> (LedgerEntry, UploadJob) {
        let temp_id = EntryId::placeholder();
        let file_name = file_name_of(path);
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

        self.in_flight.insert(temp_id.clone(), file_name.clone());
        tracing::debug!(temp_id = %temp_id, file = %file_name, size, "upload queued");

        let placeholder = LedgerEntry::upload_placeholder(temp_id.clone(), &file_name, size);
        let job = UploadJob {
            temp_id,
            path: path.to_path_buf(),
            file_name,
            room_id: room_id.to_string(),
            sender_id: sender_id.to_string(),
        };
        (placeholder, job)
    }

    /// Mark an upload as settled. Returns its file name if it was in flight.
    pub fn finish(&mut self, temp_id: &EntryId) -> Option<String> {
        self.in_flight.remove(temp_id)
    }

    /// Whether a transfer for this placeholder is still running.
    #[must_use]
    pub fn is_in_flight(&self, temp_id: &EntryId) -> bool {
        self.in_flight.contains_key(temp_id)
    }

    /// Number of transfers still running.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Forget all transfers (entering a new room).
    pub fn clear(&mut self) {
        self.in_flight.clear();
    }
}

/// Base name of a path, falling back to the whole path.
#[must_use]
pub fn file_name_of(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// Join a base URL and a server path by concatenation.
///
/// The base URL's own path prefix is kept, so `https://host/api` plus
/// `/uploads/a.txt` yields `https://host/api/uploads/a.txt`.
///
/// # Errors
///
/// Returns [`UploadError::Url`] if the result does not parse.
pub fn resolve_file_url(base: &Url, path: &str) -> Result<Url, UploadError> {
    let base = base.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    Ok(Url::parse(&format!("{base}/{path}"))?)
}

/// POST one file as multipart form data.
///
/// Form fields are `file`, `roomId`, `senderId` and `tempId`. A non-success
/// status counts as failure.
///
/// # Errors
///
/// Returns [`UploadError::ReadFile`] if the file cannot be read and
/// [`UploadError::Http`] on transport failure or an error status.
pub async fn upload_file(
    http: &reqwest::Client,
    endpoint: &Url,
    job: &UploadJob,
) -> Result<(), UploadError> {
    let bytes = tokio::fs::read(&job.path)
        .await
        .map_err(|source| UploadError::ReadFile {
            path: job.path.clone(),
            source,
        })?;
    let size = bytes.len();

    let form = Form::new()
        .part("file", Part::bytes(bytes).file_name(job.file_name.clone()))
        .text("roomId", job.room_id.clone())
        .text("senderId", job.sender_id.clone())
        .text("tempId", job.temp_id.to_string());

    http.post(endpoint.clone())
        .multipart(form)
        .send()
        .await?
        .error_for_status()?;

    tracing::info!(temp_id = %job.temp_id, file = %job.file_name, size, "upload complete");
    Ok(())
}

/// Fetch a shared file into `dest_dir`.
///
/// Only the base name of `file_name` is used for the destination.
///
/// # Errors
///
/// Returns [`UploadError::InvalidFileName`] for names without a base name,
/// [`UploadError::Http`] on request failure and [`UploadError::WriteFile`]
/// if the file cannot be stored.
pub async fn download_file(
    http: &reqwest::Client,
    url: Url,
    dest_dir: &Path,
    file_name: &str,
) -> Result<PathBuf, UploadError> {
    let base = Path::new(file_name)
        .file_name()
        .ok_or_else(|| UploadError::InvalidFileName(file_name.to_string()))?;
    let target = dest_dir.join(base);

    let bytes = http
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|source| UploadError::WriteFile {
            path: dest_dir.to_path_buf(),
            source,
        })?;
    tokio::fs::write(&target, &bytes)
        .await
        .map_err(|source| UploadError::WriteFile {
            path: target.clone(),
            source,
        })?;

    tracing::info!(path = %target.display(), size = bytes.len(), "download complete");
    Ok(target)
}

/// Human-readable size: `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{rounded:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text} {}", UNITS[unit])
}
