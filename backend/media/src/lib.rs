//! Upload intake: turns files, raw uploads and data URIs into [`ImageRef`]s,
//! rejecting anything that is not an image before a run starts.

use std::path::Path;

use anyhow::Context;
use bytes::Bytes;
use platelens_core::{ImageRef, PlateLensError};
use tracing::{debug, warn};

pub mod image;
pub mod mime_detect;

pub use image::{read_dimensions, ImageInfo};
pub use mime_detect::{detect_mime_type, is_image, is_model_supported, sniff_image_mime};

/// Shown when the upload is not an image.
pub const INVALID_FILE_TYPE: &str = "Invalid file type. Please upload an image.";

/// Shown when the upload carries no bytes.
pub const EMPTY_UPLOAD: &str = "Uploaded file is empty.";

/// Accept raw upload bytes with an optional declared media type.
///
/// The declared type wins when present; otherwise the content is sniffed.
pub fn accept_upload(declared_mime: Option<&str>, data: impl Into<Bytes>) -> Result<ImageRef, PlateLensError> {
    let data: Bytes = data.into();
    if data.is_empty() {
        return Err(PlateLensError::InvalidInput(EMPTY_UPLOAD.into()));
    }

    let mime = declared_mime
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .or_else(|| sniff_image_mime(&data).map(str::to_string))
        .unwrap_or_else(|| "application/octet-stream".to_string());

    if !is_image(&mime) {
        warn!(mime = %mime, "Rejected non-image upload");
        return Err(PlateLensError::InvalidInput(INVALID_FILE_TYPE.into()));
    }
    if !is_model_supported(&mime) {
        debug!(mime = %mime, "Image type may not be accepted by the hosted model");
    }

    debug!(mime = %mime, bytes = data.len(), "Accepted upload");
    Ok(ImageRef::new(mime, data))
}

/// Accept a `data:` URI upload, as sent by the browser.
pub fn accept_data_uri(uri: &str) -> Result<ImageRef, PlateLensError> {
    let image = ImageRef::from_data_uri(uri)
        .map_err(|e| PlateLensError::InvalidInput(format!("{INVALID_FILE_TYPE} ({e})")))?;
    if !image.is_image() {
        return Err(PlateLensError::InvalidInput(INVALID_FILE_TYPE.into()));
    }
    if image.is_empty() {
        return Err(PlateLensError::InvalidInput(EMPTY_UPLOAD.into()));
    }
    Ok(image)
}

/// Load an image from disk, sniffing the format before trusting the extension.
pub async fn load_image(path: &Path) -> Result<ImageRef, PlateLensError> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image file: {}", path.display()))?;
    let mime = sniff_image_mime(&data).unwrap_or_else(|| detect_mime_type(path));
    accept_upload(Some(mime), data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const JPEG_MAGIC: [u8; 4] = [0xff, 0xd8, 0xff, 0xe0];

    #[test]
    fn rejects_non_image_upload() {
        let err = accept_upload(Some("text/plain"), b"hello".to_vec()).unwrap_err();
        assert!(matches!(err, PlateLensError::InvalidInput(ref m) if m == INVALID_FILE_TYPE));
    }

    #[test]
    fn rejects_empty_upload() {
        assert!(accept_upload(Some("image/png"), Vec::new()).is_err());
    }

    #[test]
    fn sniffs_when_undeclared() {
        let img = accept_upload(None, JPEG_MAGIC.to_vec()).unwrap();
        assert_eq!(img.mime_type(), "image/jpeg");
    }

    #[test]
    fn data_uri_must_be_image() {
        assert!(accept_data_uri("data:image/jpeg;base64,/9j/4A==").is_ok());
        let err = accept_data_uri("data:application/pdf;base64,JVBERi0=").unwrap_err();
        assert_eq!(err.to_string(), INVALID_FILE_TYPE);
        assert!(accept_data_uri("not a uri").is_err());
    }

    #[tokio::test]
    async fn loads_from_disk_with_misleading_extension() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(&JPEG_MAGIC).unwrap();
        let img = load_image(file.path()).await.unwrap();
        assert_eq!(img.mime_type(), "image/jpeg");
        assert_eq!(img.data(), &JPEG_MAGIC);
    }

    #[tokio::test]
    async fn text_file_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"just some notes").unwrap();
        let err = load_image(file.path()).await.unwrap_err();
        assert!(matches!(err, PlateLensError::InvalidInput(_)));
    }
}
