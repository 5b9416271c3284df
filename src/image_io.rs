//! PNG decode/encode helpers over `image::RgbaImage`.
//!
//! All persisted artifacts (baseline, current, diff) are lossless PNG.

use crate::error::CompareError;
use crate::error::Error;
use crate::error::Result;
use image::ImageFormat;
use image::RgbaImage;
use std::io::Cursor;

/// Decode PNG bytes into an RGBA buffer.
///
/// `role` names the artifact in the error message (`"baseline"`, `"current"`).
pub fn decode_png(data: &[u8], role: &'static str) -> std::result::Result<RgbaImage, CompareError> {
  image::load_from_memory_with_format(data, ImageFormat::Png)
    .map(|img| img.to_rgba8())
    .map_err(|e| CompareError::Decode {
      role,
      reason: e.to_string(),
    })
}

/// Encode an RGBA buffer to PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
  let mut buffer = Vec::new();
  image
    .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
    .map_err(|e| Error::Encode(e.to_string()))?;
  Ok(buffer)
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgba;

  #[test]
  fn png_round_trip_preserves_pixels() {
    let img = RgbaImage::from_pixel(3, 2, Rgba([5, 6, 7, 255]));
    let encoded = encode_png(&img).unwrap();
    let decoded = decode_png(&encoded, "baseline").unwrap();
    assert_eq!(decoded.dimensions(), (3, 2));
    assert_eq!(decoded.get_pixel(2, 1), img.get_pixel(2, 1));
  }

  #[test]
  fn decode_rejects_garbage() {
    let err = decode_png(b"not a png", "current").unwrap_err();
    assert!(matches!(err, CompareError::Decode { role: "current", .. }));
  }
}
