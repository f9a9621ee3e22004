//! Image encoding: uploaded bytes → base64 data URI.
//!
//! The same string is used as the page's `<img src>` and as the payload sent
//! to the analysis service, so a file is read exactly once.

use crate::error::LeafError;
use crate::validate::{ImageSource, UploadedImage};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// `data:<media-type>;base64,<payload>`. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EncodedImage(String);

impl EncodedImage {
    pub fn from_bytes(media_type: &str, bytes: &[u8]) -> Self {
        Self(format!("data:{};base64,{}", media_type, STANDARD.encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Media type between `data:` and `;base64,`.
    pub fn media_type(&self) -> &str {
        self.split().0
    }

    /// The base64 payload after the comma.
    pub fn payload(&self) -> &str {
        self.split().1
    }

    fn split(&self) -> (&str, &str) {
        let rest = self.0.strip_prefix("data:").unwrap_or(&self.0);
        rest.split_once(";base64,").unwrap_or(("", rest))
    }
}

impl fmt::Display for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read the file (the suspend point) and wrap it as a data URI.
pub async fn encode(file: UploadedImage) -> Result<EncodedImage, LeafError> {
    let bytes = match file.source {
        ImageSource::Memory(bytes) => bytes.to_vec(),
        ImageSource::File(path) => tokio::fs::read(&path).await.map_err(|e| LeafError::ReadFailure {
            detail: format!("{}: {}", path.display(), e),
        })?,
    };

    let encoded = EncodedImage::from_bytes(&file.media_type, &bytes);
    debug!("Encoded {} bytes → {} byte data URI", bytes.len(), encoded.0.len());
    Ok(encoded)
}
