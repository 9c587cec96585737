use std::io::Cursor;

use image::ImageReader;
use platelens_core::ImageRef;

/// Pixel dimensions of an encoded image, when the decoder understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

/// Read the dimensions from the image header without decoding pixels.
pub fn read_dimensions(image: &ImageRef) -> Option<ImageInfo> {
    let reader = ImageReader::new(Cursor::new(image.data()))
        .with_guessed_format()
        .ok()?;
    let (width, height) = reader.into_dimensions().ok()?;
    Some(ImageInfo { width, height })
}
