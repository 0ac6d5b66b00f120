use kurbo::{Affine, Point, Vec2};

use super::Bitmap;

/// Rotates `src` counter-clockwise by `degrees` around its centre.
///
/// The canvas grows to hold the whole rotated image; uncovered pixels are transparent.
/// Sampling is bilinear in premultiplied space.
pub fn rotate(src: &Bitmap, degrees: f64) -> Bitmap {
    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();
    let w = f64::from(src.width);
    let h = f64::from(src.height);

    let out_w = snap_extent(w * cos.abs() + h * sin.abs());
    let out_h = snap_extent(w * sin.abs() + h * cos.abs());
    let mut out = Bitmap::new(out_w, out_h);

    let src_center = Vec2::new(w / 2.0, h / 2.0);
    let dst_center = Vec2::new(f64::from(out_w) / 2.0, f64::from(out_h) / 2.0);
    // Output pixel centres back into source space.
    let inverse =
        Affine::translate(src_center) * Affine::rotate(theta) * Affine::translate(-dst_center);

    for y in 0..out_h {
        for x in 0..out_w {
            let p = inverse * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            let px = sample_bilinear(src, p.x - 0.5, p.y - 0.5);
            let i = (y as usize * out_w as usize + x as usize) * 4;
            out.rgba8_premul[i..i + 4].copy_from_slice(&px);
        }
    }
    out
}

fn snap_extent(v: f64) -> u32 {
    // Trig noise on right angles would otherwise add a spurious row/column.
    (v - 1e-9).ceil().max(1.0) as u32
}

fn sample_bilinear(src: &Bitmap, fx: f64, fy: f64) -> [u8; 4] {
    if fx <= -1.0 || fy <= -1.0 || fx >= f64::from(src.width) || fy >= f64::from(src.height) {
        return [0; 4];
    }

    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let p00 = src.pixel(x0, y0);
    let p10 = src.pixel(x0 + 1, y0);
    let p01 = src.pixel(x0, y0 + 1);
    let p11 = src.pixel(x0 + 1, y0 + 1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f64::from(p00[c]) * (1.0 - tx) + f64::from(p10[c]) * tx;
        let bottom = f64::from(p01[c]) * (1.0 - tx) + f64::from(p11[c]) * tx;
        out[c] = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/postcard/rotate.rs"]
mod tests;
