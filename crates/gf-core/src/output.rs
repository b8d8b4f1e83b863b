//! Decoding inline images and writing them to disk.

use std::fs::OpenOptions;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use base64::Engine;
use chrono::{DateTime, Local};
use gf_protocol::InlineImage;
use image::{ImageFormat, ImageReader};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("image payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image payload is empty")]
    Empty,
    #[error("unrecognised image format (declared {0})")]
    UnknownFormat(String),
    #[error("cannot decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("cannot write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Raw image bytes with the format and size read from their header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl DecodedImage {
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("img")
    }
}

/// Decode a base64 inline image.
///
/// The bytes are sniffed first; the declared MIME type is only a fallback.
pub fn decode_image(img: &InlineImage) -> Result<DecodedImage, OutputError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(img.data.trim())?;
    if bytes.is_empty() {
        return Err(OutputError::Empty);
    }

    let format = image::guess_format(&bytes)
        .ok()
        .or_else(|| ImageFormat::from_mime_type(&img.mime_type))
        .ok_or_else(|| OutputError::UnknownFormat(img.mime_type.clone()))?;

    let mut reader = ImageReader::new(Cursor::new(bytes.as_slice()));
    reader.set_format(format);
    let (width, height) = reader.into_dimensions()?;

    Ok(DecodedImage {
        bytes,
        format,
        width,
        height,
    })
}

/// Write `image` into `dir` as `{prefix}-{timestamp}-{index}.{ext}`.
///
/// Existing files are never replaced; a numeric suffix is added instead.
pub fn save_image(
    dir: &Path,
    prefix: &str,
    index: usize,
    image: &DecodedImage,
    now: DateTime<Local>,
) -> Result<PathBuf, OutputError> {
    std::fs::create_dir_all(dir).map_err(|source| OutputError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    let stem = format!("{prefix}-{}-{index}", now.format("%Y%m%d-%H%M%S"));
    let ext = image.extension();

    let mut attempt = 0usize;
    loop {
        let name = if attempt == 0 {
            format!("{stem}.{ext}")
        } else {
            format!("{stem}-{attempt}.{ext}")
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                write_or_remove(&path, &mut file, &image.bytes)?;
                tracing::debug!(path = %path.display(), bytes = image.bytes.len(), "image written");
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(source) => return Err(OutputError::Write { path, source }),
        }
    }
}

/// Write `bytes` to the freshly created file at `path`. On failure the file
/// is removed.
fn write_or_remove(path: &Path, out: &mut impl Write, bytes: &[u8]) -> Result<(), OutputError> {
    if let Err(source) = out.write_all(bytes).and_then(|()| out.flush()) {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %e, "cannot remove partial image");
        }
        return Err(OutputError::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gf_backend::mock::ONE_PIXEL_PNG_BASE64;

    fn png_inline() -> InlineImage {
        InlineImage {
            mime_type: "image/png".to_string(),
            data: ONE_PIXEL_PNG_BASE64.to_string(),
        }
    }

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap()
    }

    #[test]
    fn decode_png() {
        let decoded = decode_image(&png_inline()).unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!((decoded.width, decoded.height), (1, 1));
        assert_eq!(decoded.extension(), "png");
        assert_eq!(&decoded.bytes[..4], b"\x89PNG");
    }

    #[test]
    fn decode_sniffs_over_declared_mime() {
        let img = InlineImage {
            mime_type: "image/jpeg".to_string(),
            ..png_inline()
        };
        assert_eq!(decode_image(&img).unwrap().format, ImageFormat::Png);
    }

    #[test]
    fn decode_rejects_bad_base64() {
        let img = InlineImage {
            mime_type: "image/png".to_string(),
            data: "not base64!!".to_string(),
        };
        assert!(matches!(decode_image(&img), Err(OutputError::Base64(_))));
    }

    #[test]
    fn decode_rejects_empty() {
        let img = InlineImage {
            mime_type: "image/png".to_string(),
            data: String::new(),
        };
        assert!(matches!(decode_image(&img), Err(OutputError::Empty)));
    }

    #[test]
    fn decode_rejects_unknown_format() {
        let img = InlineImage {
            mime_type: "application/octet-stream".to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(b"definitely not an image"),
        };
        assert!(matches!(decode_image(&img), Err(OutputError::UnknownFormat(_))));
    }

    #[test]
    fn decode_rejects_truncated_png() {
        let img = InlineImage {
            mime_type: "image/png".to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(b"\x89PNG\r\n\x1a\n"),
        };
        assert!(matches!(decode_image(&img), Err(OutputError::Image(_))));
    }

    #[test]
    fn save_uses_timestamped_name() {
        let dir = tempfile::tempdir().unwrap();
        let decoded = decode_image(&png_inline()).unwrap();
        let path = save_image(dir.path(), "banana", 1, &decoded, fixed_time()).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "banana-20250314-150926-1.png"
        );
        assert_eq!(std::fs::read(&path).unwrap(), decoded.bytes);
    }

    #[test]
    fn save_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let decoded = decode_image(&png_inline()).unwrap();

        let first = save_image(dir.path(), "gf", 1, &decoded, fixed_time()).unwrap();
        let second = save_image(dir.path(), "gf", 1, &decoded, fixed_time()).unwrap();
        let third = save_image(dir.path(), "gf", 1, &decoded, fixed_time()).unwrap();

        assert_ne!(first, second);
        assert!(second.to_string_lossy().ends_with("gf-20250314-150926-1-1.png"));
        assert!(third.to_string_lossy().ends_with("gf-20250314-150926-1-2.png"));
    }

    #[test]
    fn save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("renders").join("today");
        let decoded = decode_image(&png_inline()).unwrap();
        let path = save_image(&nested, "gf", 2, &decoded, fixed_time()).unwrap();
        assert!(path.starts_with(&nested));
        assert!(path.exists());
    }

    struct DiskFull;

    impl Write for DiskFull {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gf-partial.png");
        std::fs::write(&path, b"\x89PN").unwrap();

        let err = write_or_remove(&path, &mut DiskFull, b"\x89PNG\r\n").unwrap_err();
        assert!(matches!(err, OutputError::Write { ref path, .. } if path.ends_with("gf-partial.png")));
        assert!(!path.exists());
    }

    #[test]
    fn successful_write_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gf-ok.png");
        let mut file = std::fs::File::create(&path).unwrap();
        write_or_remove(&path, &mut file, b"pixels").unwrap();
        drop(file);
        assert_eq!(std::fs::read(&path).unwrap(), b"pixels");
    }
}
