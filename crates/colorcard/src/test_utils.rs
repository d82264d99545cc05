//! Shared test utilities for image-based unit tests.

use image::{Rgb, RgbImage};

/// Render a synthetic color card: a `cols` x `rows` grid of flat patches,
/// each `patch_w` x `patch_h` pixels, colored from `palette` in canonical
/// row-major order.
pub(crate) fn draw_card_image(
    patch_w: u32,
    patch_h: u32,
    cols: usize,
    rows: usize,
    palette: &[[f64; 3]],
) -> RgbImage {
    let mut img = RgbImage::new(patch_w * cols as u32, patch_h * rows as u32);
    for y in 0..img.height() {
        for x in 0..img.width() {
            let col = (x / patch_w) as usize;
            let row = (y / patch_h) as usize;
            let c = palette[row * cols + col];
            img.put_pixel(x, y, Rgb([c[0] as u8, c[1] as u8, c[2] as u8]));
        }
    }
    img
}

/// Paste a card onto a flat mid-gray background at `(x, y)`.
pub(crate) fn embed_in_background(card: &RgbImage, w: u32, h: u32, x: u32, y: u32) -> RgbImage {
    let mut photo = RgbImage::from_pixel(w, h, Rgb([90, 90, 90]));
    image::imageops::replace(&mut photo, card, i64::from(x), i64::from(y));
    photo
}
