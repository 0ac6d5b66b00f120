use std::io::Cursor;

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::ImageEncoder as _;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};

use super::Bitmap;
use crate::foundation::error::{RelayError, RelayResult};
use crate::route::Route;

pub fn decode_image(bytes: &[u8]) -> RelayResult<Bitmap> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| RelayError::decode(format!("could not decode image: {e}")))?;
    Ok(Bitmap::from_straight(dyn_img.to_rgba8()))
}

/// PNG with the fastest compression setting; postcards are re-encoded on every hop, so
/// encode latency matters more than size.
pub fn encode_png(bitmap: &Bitmap) -> RelayResult<Vec<u8>> {
    let rgba = bitmap
        .to_straight()
        .ok_or_else(|| RelayError::validation("bitmap buffer does not match its dimensions"))?;

    let mut buf = Vec::new();
    PngEncoder::new_with_quality(
        Cursor::new(&mut buf),
        CompressionType::Fast,
        FilterType::Adaptive,
    )
    .write_image(
        rgba.as_raw(),
        bitmap.width,
        bitmap.height,
        image::ExtendedColorType::Rgba8,
    )
    .context("encode postcard png")?;
    Ok(buf)
}

pub fn decode_postcard(encoded: &str) -> RelayResult<Bitmap> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| RelayError::decode(format!("postcard is not valid base64: {e}")))?;
    decode_image(&bytes)
}

impl Route {
    /// Decodes the payload carried by the route.
    pub fn postcard_bitmap(&self) -> RelayResult<Bitmap> {
        decode_postcard(&self.postcard)
    }

    /// Stores `bitmap` as the route payload.
    pub fn set_postcard(&mut self, bitmap: &Bitmap) -> RelayResult<()> {
        let png = encode_png(bitmap)?;
        self.postcard = STANDARD.encode(png);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/postcard/codec.rs"]
mod tests;
