//! Reference images: file validation, MIME detection, base64 encoding.

use std::path::{Path, PathBuf};

use base64::Engine;
use gf_protocol::Attachment;
use thiserror::Error;

/// Maximum inline payload the Gemini API accepts per request (20 MB).
const MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("no file extension: {}", .0.display())]
    NoExtension(PathBuf),
    #[error("unsupported image format '.{0}' (supported: png, jpg, jpeg, gif, webp)")]
    Unsupported(String),
    #[error("file too large: {size} bytes (max {} MB)", MAX_FILE_SIZE / 1024 / 1024)]
    TooLarge { size: u64 },
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Map file extension to MIME type. Returns `None` for unsupported formats.
fn mime_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Load and validate a reference image from a file path.
pub fn load_attachment(path: &Path) -> Result<Attachment, AttachmentError> {
    if !path.exists() {
        return Err(AttachmentError::NotFound(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| AttachmentError::NoExtension(path.to_path_buf()))?;

    let media_type =
        mime_type_for_extension(ext).ok_or_else(|| AttachmentError::Unsupported(ext.to_string()))?;

    let read_err = |source| AttachmentError::Read {
        path: path.to_path_buf(),
        source,
    };

    let size = std::fs::metadata(path).map_err(read_err)?.len();
    if size > MAX_FILE_SIZE {
        return Err(AttachmentError::TooLarge { size });
    }

    let data = std::fs::read(path).map_err(read_err)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&data);

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    tracing::debug!(%filename, media_type, bytes = data.len(), "attachment loaded");

    Ok(Attachment {
        filename,
        media_type: media_type.to_string(),
        data: encoded,
    })
}

/// Load every path, stopping at the first invalid one.
pub fn load_all(paths: &[PathBuf]) -> Result<Vec<Attachment>, AttachmentError> {
    paths.iter().map(|p| load_attachment(p)).collect()
}
