//! Grayscale image helpers shared by the preprocessing profiles.
//!
//! Everything here works on `image::GrayImage`; OCR crops are small, so the
//! helpers favour clarity over in-place tricks, except resizing which goes
//! through `fast_image_resize`.

use image::{GrayImage, Luma};

/// Upscale so the image is at least `min_height` pixels tall (aspect preserved).
///
/// OCR engines read small glyphs poorly; name plates are often only ~20px high.
pub fn upscale_to_height(img: &GrayImage, min_height: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 || height >= min_height {
        return img.clone();
    }

    let new_width = ((width as u64 * min_height as u64) / height as u64).max(1) as u32;

    let src = match fast_image_resize::images::ImageRef::new(width, height, img.as_raw(), fast_image_resize::PixelType::U8) {
        Ok(src) => src,
        Err(err) => {
            tracing::warn!(error = %err, "upscale skipped: bad source buffer");
            return img.clone();
        }
    };
    let mut dst = fast_image_resize::images::Image::new(new_width, min_height, fast_image_resize::PixelType::U8);

    let mut resizer = fast_image_resize::Resizer::new();
    let options = fast_image_resize::ResizeOptions::new().resize_alg(
        fast_image_resize::ResizeAlg::Interpolation(fast_image_resize::FilterType::CatmullRom),
    );
    if let Err(err) = resizer.resize(&src, &mut dst, &Some(options)) {
        tracing::warn!(error = %err, "upscale failed");
        return img.clone();
    }

    GrayImage::from_raw(new_width, min_height, dst.into_vec()).unwrap_or_else(|| img.clone())
}

/// Surround the image with a `border`-pixel white frame. Tesseract segments
/// text touching the image edge badly.
pub fn pad(img: &GrayImage, border: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut canvas = GrayImage::from_pixel(width + border * 2, height + border * 2, Luma([255]));
    image::imageops::replace(&mut canvas, img, border as i64, border as i64);
    canvas
}

/// Invert a binary image when it is mostly black, so text ends up dark on light.
pub fn ensure_dark_text_on_light(mut bin: GrayImage) -> GrayImage {
    let (mut white, mut black) = (0u64, 0u64);
    for p in bin.pixels() {
        if p.0[0] > 127 {
            white += 1;
        } else {
            black += 1;
        }
    }
    if black > white {
        for p in bin.pixels_mut() {
            p.0[0] = 255u8.saturating_sub(p.0[0]);
        }
    }
    bin
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `grid` x `grid` layout of tiles; each tile gets a
/// clipped equalization table (`clip_limit` is relative to a flat histogram)
/// and pixels blend the tables of their four nearest tiles bilinearly.
pub fn clahe(img: &GrayImage, grid: u32, clip_limit: f32) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    let tile_w = width.div_ceil(grid.clamp(1, width));
    let tile_h = height.div_ceil(grid.clamp(1, height));
    // Recount so that no tile is empty.
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let (x0, y0) = (tx * tile_w, ty * tile_h);
            let (x1, y1) = ((x0 + tile_w).min(width), (y0 + tile_h).min(height));
            luts.push(tile_lut(img, x0, y0, x1, y1, clip_limit));
        }
    }

    let lut = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];
    let locate = |pos: u32, tile: u32, tiles: u32| -> (u32, u32, f32) {
        let f = (pos as f32 + 0.5) / tile as f32 - 0.5;
        let lo = f.floor().clamp(0.0, (tiles - 1) as f32);
        let hi = (lo + 1.0).min((tiles - 1) as f32);
        (lo as u32, hi as u32, (f - lo).clamp(0.0, 1.0))
    };

    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        let (ty0, ty1, ay) = locate(y, tile_h, tiles_y);
        for x in 0..width {
            let (tx0, tx1, ax) = locate(x, tile_w, tiles_x);
            let v = img.get_pixel(x, y).0[0] as usize;
            let top = lut(tx0, ty0)[v] as f32 * (1.0 - ax) + lut(tx1, ty0)[v] as f32 * ax;
            let bottom = lut(tx0, ty1)[v] as f32 * (1.0 - ax) + lut(tx1, ty1)[v] as f32 * ax;
            let blended = top * (1.0 - ay) + bottom * ay;
            out.put_pixel(x, y, Luma([blended.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

fn tile_lut(img: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[img.get_pixel(x, y).0[0] as usize] += 1;
        }
    }
    let count = (x1 - x0) * (y1 - y0);

    let limit = ((clip_limit * count as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let bonus = excess / 256;
    let mut residual = excess % 256;
    for bin in hist.iter_mut() {
        *bin += bonus;
    }
    if residual > 0 {
        let step = (256 / residual as usize).max(1);
        for bin in hist.iter_mut().step_by(step) {
            if residual == 0 {
                break;
            }
            *bin += 1;
            residual -= 1;
        }
    }

    let mut lut = [0u8; 256];
    let mut cdf = 0u32;
    for (value, bin) in hist.iter().enumerate() {
        cdf += bin;
        lut[value] = (cdf as f32 * 255.0 / count as f32).round().min(255.0) as u8;
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upscale_keeps_aspect_ratio() {
        let img = GrayImage::from_pixel(40, 10, Luma([200]));
        let up = upscale_to_height(&img, 80);
        assert_eq!(up.dimensions(), (320, 80));

        let tall = GrayImage::new(5, 100);
        assert_eq!(upscale_to_height(&tall, 80).dimensions(), (5, 100));
    }

    #[test]
    fn pad_adds_white_border() {
        let img = GrayImage::from_pixel(4, 2, Luma([0]));
        let padded = pad(&img, 3);
        assert_eq!(padded.dimensions(), (10, 8));
        assert_eq!(padded.get_pixel(0, 0).0[0], 255);
        assert_eq!(padded.get_pixel(3, 3).0[0], 0);
    }

    #[test]
    fn mostly_black_binary_is_inverted() {
        let mut bin = GrayImage::from_pixel(4, 4, Luma([0]));
        bin.put_pixel(1, 1, Luma([255]));
        let out = ensure_dark_text_on_light(bin);
        assert_eq!(out.get_pixel(0, 0).0[0], 255);
        assert_eq!(out.get_pixel(1, 1).0[0], 0);
    }

    #[test]
    fn clahe_keeps_size_and_flat_images_flat() {
        let img = GrayImage::from_pixel(16, 16, Luma([90]));
        let out = clahe(&img, 8, 2.0);
        assert_eq!(out.dimensions(), (16, 16));
        let first = out.get_pixel(0, 0).0[0];
        assert!(out.pixels().all(|p| p.0[0] == first));
    }

    #[test]
    fn clahe_handles_images_smaller_than_the_grid() {
        let mut img = GrayImage::new(3, 2);
        img.put_pixel(2, 1, Luma([250]));
        assert_eq!(clahe(&img, 8, 2.0).dimensions(), (3, 2));
    }
}
