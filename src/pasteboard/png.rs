//! PNG conversion for clipboard bitmaps
//!
//! arboard hands out raw RGBA; history entries store PNG bytes.

use std::borrow::Cow;
use std::io::Cursor;

use crate::error::PasteboardError;

/// Encode an RGBA bitmap as PNG.
pub fn encode_png(image: &arboard::ImageData) -> Result<Vec<u8>, PasteboardError> {
    let rgba = image::RgbaImage::from_raw(
        image.width as u32,
        image.height as u32,
        image.bytes.to_vec(),
    )
    .ok_or_else(|| {
        PasteboardError::ImageDecode(format!(
            "RGBA buffer does not match {}x{}",
            image.width, image.height
        ))
    })?;

    let mut png = Vec::new();
    rgba.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| PasteboardError::ImageDecode(e.to_string()))?;
    Ok(png)
}

/// Decode PNG bytes into a bitmap arboard can write.
pub fn decode_png(png: &[u8]) -> Result<arboard::ImageData<'static>, PasteboardError> {
    let decoded = image::load_from_memory_with_format(png, image::ImageFormat::Png)
        .map_err(|e| PasteboardError::ImageDecode(e.to_string()))?;
    let rgba = decoded.to_rgba8();

    Ok(arboard::ImageData {
        width: rgba.width() as usize,
        height: rgba.height() as usize,
        bytes: Cow::Owned(rgba.into_raw()),
    })
}
