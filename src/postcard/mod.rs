//! Postcard compositing.
//!
//! The payload travels inside the route as a base64 PNG. In memory it is a [`Bitmap`]
//! holding premultiplied RGBA8, which is what every compositing routine here expects.

pub(crate) mod boundary;
pub(crate) mod codec;
pub(crate) mod composite;
pub(crate) mod compositor;
pub(crate) mod label;
pub(crate) mod overlays;
pub(crate) mod rotate;

pub use boundary::{BOUNDARIES, Boundary};
pub use codec::{decode_image, decode_postcard, encode_png};
pub use compositor::Compositor;
pub use overlays::{MATTE, OverlaySet, POSTCARD, load_fonts};
pub use rotate::rotate;

/// Premultiplied RGBA8 image, row-major, tightly packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Vec<u8>,
}

impl Bitmap {
    /// Fully transparent bitmap.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba8_premul: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn from_straight(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        let mut rgba8_premul = img.into_raw();
        crate::foundation::math::premultiply_rgba8_in_place(&mut rgba8_premul);
        Self {
            width,
            height,
            rgba8_premul,
        }
    }

    pub fn to_straight(&self) -> Option<image::RgbaImage> {
        let mut raw = self.rgba8_premul.clone();
        crate::foundation::math::unpremultiply_rgba8_in_place(&mut raw);
        image::RgbaImage::from_raw(self.width, self.height, raw)
    }

    /// Pixel at `(x, y)`; transparent outside the bitmap.
    pub fn pixel(&self, x: i64, y: i64) -> [u8; 4] {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return [0; 4];
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.rgba8_premul[i..i + 4];
        [px[0], px[1], px[2], px[3]]
    }
}
