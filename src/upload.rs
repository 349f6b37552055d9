//! # Upload Intake & Temp-File Management
//!
//! Reads the multipart `file` field into memory and persists it to a
//! uniquely-named temporary file for the speech engine to read.
//!
//! The temp file is owned by [`TempAudioFile`]: dropping the handle removes
//! the file, so every exit path — success, engine failure, panic unwind —
//! cleans up without explicit bookkeeping. Removal failures are swallowed;
//! a file that is already gone is not worth failing a response over.

use std::io::Write;
use std::path::Path;

use actix_multipart::Multipart;
use futures_util::stream::StreamExt;

use crate::error::AppError;

/// Uploads above this size are rejected before anything touches disk.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Suffix used when the client declares no filename or an extensionless one.
pub const DEFAULT_SUFFIX: &str = ".mp3";

/// An exclusively-owned audio file in the system temp directory.
///
/// Exactly one exists per request; the backing file is deleted when this
/// handle drops.
#[derive(Debug)]
pub struct TempAudioFile {
    path: tempfile::TempPath,
}

impl TempAudioFile {
    /// Write the upload to a fresh temp file, byte-for-byte, before
    /// returning. The suffix is derived from the declared filename so the
    /// engine's container probe sees a meaningful extension.
    pub fn store(bytes: &[u8], declared_filename: Option<&str>) -> std::io::Result<Self> {
        let suffix = suffix_for(declared_filename);
        let mut file = tempfile::Builder::new()
            .prefix("transcribe-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// File suffix (with leading dot) for a declared filename, or the default.
pub fn suffix_for(declared_filename: Option<&str>) -> String {
    declared_filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| DEFAULT_SUFFIX.to_string())
}

/// Drain the multipart payload and return the `file` field's bytes along
/// with its declared filename.
///
/// Fields other than `file` are skipped. A payload with no `file` field, a
/// malformed stream, or an oversized upload is a 400.
pub async fn read_audio_field(
    mut payload: Multipart,
) -> Result<(Vec<u8>, Option<String>), AppError> {
    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::BadRequest(format!("multipart error: {}", e)))?;

        let Some(content_disposition) = field.content_disposition() else {
            continue;
        };
        if content_disposition.get_name() != Some("file") {
            continue;
        }
        let filename = content_disposition.get_filename().map(|s| s.to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| AppError::BadRequest(format!("upload read error: {}", e)))?;
            if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(AppError::BadRequest(format!(
                    "upload exceeds {} byte limit",
                    MAX_UPLOAD_BYTES
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok((bytes, filename));
    }

    Err(AppError::BadRequest(
        "missing multipart field \"file\"".to_string(),
    ))
}
