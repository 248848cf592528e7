#![allow(dead_code)]

use glyphgrid::glyph::{GlyphRenderer, RasterGlyph, VerticalMetrics};
use ndarray::Array2;

/// Geometric stand-in for a font: ascent 3/4 and descent 1/4 of the size.
///
/// `#` is a solid block filling the line box at half the size in width,
/// `-` a bar above the baseline, `.` a dot on the baseline, ` ` has no ink.
/// Every other character is missing. Sizes above `max_px` cannot be rendered.
pub struct BlockRenderer {
    pub max_px: f32,
}

impl Default for BlockRenderer {
    fn default() -> Self {
        Self { max_px: f32::INFINITY }
    }
}

fn solid(width: usize, height: usize, ymin: i32, advance: f32) -> RasterGlyph {
    RasterGlyph {
        width,
        height,
        xmin: 0,
        ymin,
        advance,
        coverage: vec![255; width * height],
    }
}

impl GlyphRenderer for BlockRenderer {
    fn vertical_metrics(&self, px: f32) -> Option<VerticalMetrics> {
        (px <= self.max_px).then(|| VerticalMetrics {
            ascent: px * 0.75,
            descent: -px * 0.25,
        })
    }

    fn glyph(&self, ch: char, px: f32) -> Option<RasterGlyph> {
        let advance = px / 2.0;
        let (width, height) = ((px / 2.0) as usize, px as usize);
        let small = ((px / 8.0) as usize).max(1);
        match ch {
            '#' => Some(solid(width, height, -((px / 4.0) as i32), advance)),
            '-' => Some(solid(width, small, (px / 4.0) as i32, advance)),
            '.' => Some(solid(small, small, 0, advance)),
            ' ' => Some(solid(0, 0, 0, advance)),
            _ => None,
        }
    }
}

pub fn solid_image(width: usize, height: usize, value: u8) -> Array2<u8> {
    Array2::from_elem((height, width), value)
}
