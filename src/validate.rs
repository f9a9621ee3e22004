//! File intake: the uploaded image and the type/size policy applied to it.
//!
//! The validator trusts only what the file claims: a media type starting with
//! `image/` and a length within [`MAX_UPLOAD_BYTES`]. No magic-byte sniffing
//! and no dimension checks happen here.

use crate::error::LeafError;
use axum::body::Bytes;
use std::path::PathBuf;

/// Largest accepted upload: 20 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Where the bytes of an [`UploadedImage`] come from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Already buffered in memory (multipart upload).
    Memory(Bytes),
    /// Still on disk; read lazily by the encoder.
    File(PathBuf),
}

/// A user-selected file before it has been read and encoded.
///
/// Consumed by [`crate::encode::encode`]; it does not outlive one upload.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub media_type: String,
    pub len: u64,
    pub source: ImageSource,
}

impl UploadedImage {
    pub fn from_bytes(media_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            media_type: media_type.into(),
            len: bytes.len() as u64,
            source: ImageSource::Memory(bytes),
        }
    }

    pub fn from_file(media_type: impl Into<String>, len: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            media_type: media_type.into(),
            len,
            source: ImageSource::File(path.into()),
        }
    }
}

/// Check a file against the intake policy. First failing rule wins:
/// type, then size.
pub fn validate(file: &UploadedImage) -> Result<(), LeafError> {
    if !file.media_type.starts_with("image/") {
        return Err(LeafError::InvalidType {
            media_type: file.media_type.clone(),
        });
    }
    if file.len > MAX_UPLOAD_BYTES {
        return Err(LeafError::TooLarge {
            size: file.len,
            limit: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claimed(media_type: &str, len: u64) -> UploadedImage {
        UploadedImage::from_file(media_type, len, "unused.jpg")
    }

    #[test]
    fn accepts_common_image_types() {
        for t in ["image/jpeg", "image/png", "image/jpg", "image/webp"] {
            assert!(validate(&claimed(t, 1024)).is_ok(), "{t} rejected");
        }
    }

    #[test]
    fn rejects_non_image_types() {
        for t in ["application/pdf", "text/plain", "", "IMAGE/PNG", "video/image"] {
            assert!(
                matches!(validate(&claimed(t, 10)), Err(LeafError::InvalidType { .. })),
                "{t:?} accepted"
            );
        }
    }

    #[test]
    fn size_boundary_is_inclusive() {
        assert!(validate(&claimed("image/png", MAX_UPLOAD_BYTES)).is_ok());
        assert_eq!(
            validate(&claimed("image/png", MAX_UPLOAD_BYTES + 1)),
            Err(LeafError::TooLarge {
                size: MAX_UPLOAD_BYTES + 1,
                limit: MAX_UPLOAD_BYTES,
            })
        );
    }

    #[test]
    fn type_check_wins_over_size() {
        let result = validate(&claimed("text/plain", MAX_UPLOAD_BYTES * 2));
        assert!(matches!(result, Err(LeafError::InvalidType { .. })));
    }

    #[test]
    fn from_bytes_takes_length_from_buffer() {
        let file = UploadedImage::from_bytes("image/png", Bytes::from_static(b"abcd"));
        assert_eq!(file.len, 4);
    }
}
