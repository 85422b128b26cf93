//! Image attachments — local image files encoded as `data:` URIs.
//!
//! Every image is labelled `image/jpeg` regardless of its real format.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use thiserror::Error;
use tracing::debug;

/// Extensions accepted for attachment (lowercase).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("cannot read image {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported image type '{0}' (expected .png, .jpg or .jpeg)")]
    UnsupportedExtension(String),

    #[error("model '{0}' does not accept image input")]
    ModelWithoutVision(String),
}

/// An image waiting to be sent with the next message.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingImage {
    /// File name shown in the transcript.
    pub file_name: String,
    /// `data:image/jpeg;base64,...` URI.
    pub data_uri: String,
}

/// Read an image file and encode it as a `data:` URI.
pub fn encode_image(path: &Path) -> Result<PendingImage, AttachmentError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AttachmentError::UnsupportedExtension(extension));
    }

    let bytes = std::fs::read(path).map_err(|e| AttachmentError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    debug!(file = %file_name, bytes = bytes.len(), "encoded image attachment");

    Ok(PendingImage {
        file_name,
        data_uri: to_data_uri(&bytes),
    })
}

/// Wrap raw image bytes in a JPEG-labelled base64 data URI.
pub fn to_data_uri(bytes: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", BASE64_STANDARD.encode(bytes))
}

/// Check that `model` is allowed to receive images.
pub fn ensure_vision_model(model: &str, vision_models: &[String]) -> Result<(), AttachmentError> {
    if vision_models.iter().any(|m| m == model) {
        Ok(())
    } else {
        Err(AttachmentError::ModelWithoutVision(model.to_string()))
    }
}
