//! Image preparation applied before matching: array conversion, thresholding
//! and Atkinson dithering.

use image::{GrayImage, Luma};
use ndarray::Array2;

/// Copies a grayscale image into a `height x width` array.
pub fn to_gray_array(image: &GrayImage) -> Array2<u8> {
    let (w, h) = image.dimensions();
    Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
        image.get_pixel(x as u32, y as u32).0[0]
    })
}

/// Pixels at or above `threshold` become white, the rest black.
pub fn binarize(image: &mut GrayImage, threshold: u8) {
    for Luma([v]) in image.pixels_mut() {
        *v = if *v >= threshold { 255 } else { 0 };
    }
}

/// Atkinson dithering on blocks of `scale x scale` pixels.
///
/// The image is averaged down by `scale`, diffused to black and white at that
/// resolution, then expanded back so the dots are roughly glyph sized.
pub fn dither_atkinson(image: &GrayImage, scale: u32) -> GrayImage {
    let scale = scale.max(1);
    let (w, h) = image.dimensions();
    let (bw, bh) = (w.div_ceil(scale), h.div_ceil(scale));

    let mut levels = block_means(image, scale, bw, bh);
    let dots = diffuse(&mut levels, bw as usize, bh as usize);

    GrayImage::from_fn(w, h, |x, y| {
        let (bx, by) = ((x / scale).min(bw - 1), (y / scale).min(bh - 1));
        Luma([dots[(by * bw + bx) as usize]])
    })
}

fn block_means(image: &GrayImage, scale: u32, bw: u32, bh: u32) -> Vec<f32> {
    let (w, h) = image.dimensions();
    let mut means = Vec::with_capacity((bw * bh) as usize);
    for by in 0..bh {
        for bx in 0..bw {
            let xs = bx * scale..((bx + 1) * scale).min(w);
            let ys = by * scale..((by + 1) * scale).min(h);
            let count = (xs.len() * ys.len()) as f32;
            let sum: f32 = ys
                .flat_map(|y| xs.clone().map(move |x| (x, y)))
                .map(|(x, y)| image.get_pixel(x, y).0[0] as f32)
                .sum();
            means.push(sum / count);
        }
    }
    means
}

/// Quantizes `levels` in place order, spreading 6/8 of each error to the
/// Atkinson neighbourhood.
fn diffuse(levels: &mut [f32], w: usize, h: usize) -> Vec<u8> {
    const NEIGHBOURS: [(isize, usize); 6] = [(1, 0), (2, 0), (-1, 1), (0, 1), (1, 1), (0, 2)];
    let mut dots = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let old = levels[y * w + x].clamp(0.0, 255.0);
            let new = if old > 127.5 { 255.0 } else { 0.0 };
            dots[y * w + x] = new as u8;
            let share = (old - new) / 8.0;
            for (dx, dy) in NEIGHBOURS {
                let (nx, ny) = (x as isize + dx, y + dy);
                if nx >= 0 && (nx as usize) < w && ny < h {
                    levels[ny * w + nx as usize] += share;
                }
            }
        }
    }
    dots
}
