//! Glyph templates - renders a character set into equally sized bitmaps.

use crate::window::{Shape, BACKGROUND};
use crate::{GlyphgridError, Result};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Coverage bitmap of one rasterized glyph, positioned against the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGlyph {
    pub width: usize,
    pub height: usize,
    /// Left edge relative to the pen position.
    pub xmin: i32,
    /// Bottom edge relative to the baseline, positive up.
    pub ymin: i32,
    pub advance: f32,
    /// Row-major ink coverage, 0 = none, 255 = full.
    pub coverage: Vec<u8>,
}

impl RasterGlyph {
    fn has_ink(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Widens the ink by a disk of `radius` pixels.
    fn stroked(self, radius: u32) -> RasterGlyph {
        if radius == 0 || !self.has_ink() {
            return self;
        }
        let r = radius as usize;
        let reach = radius as i64;
        let (width, height) = (self.width + 2 * r, self.height + 2 * r);
        let mut coverage = vec![0u8; width * height];

        for sy in 0..self.height {
            for sx in 0..self.width {
                let ink = self.coverage[sy * self.width + sx];
                if ink == 0 {
                    continue;
                }
                for dy in -reach..=reach {
                    for dx in -reach..=reach {
                        if dx * dx + dy * dy > reach * reach {
                            continue;
                        }
                        let tx = (sx + r) as i64 + dx;
                        let ty = (sy + r) as i64 + dy;
                        let cell = &mut coverage[ty as usize * width + tx as usize];
                        *cell = (*cell).max(ink);
                    }
                }
            }
        }

        RasterGlyph {
            width,
            height,
            xmin: self.xmin - radius as i32,
            ymin: self.ymin - radius as i32,
            advance: self.advance,
            coverage,
        }
    }
}

/// Ascent and descent of a font's line box at one size; descent is negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalMetrics {
    pub ascent: f32,
    pub descent: f32,
}

/// Anything that can rasterize characters at a pixel size.
///
/// Implementations are shared across search workers, so they must be `Sync`.
pub trait GlyphRenderer: Sync {
    /// Line box at `px`, or `None` if the renderer cannot work at that size.
    fn vertical_metrics(&self, px: f32) -> Option<VerticalMetrics>;

    /// Rasterized glyph, or `None` if the character is missing.
    fn glyph(&self, ch: char, px: f32) -> Option<RasterGlyph>;
}

impl GlyphRenderer for fontdue::Font {
    fn vertical_metrics(&self, px: f32) -> Option<VerticalMetrics> {
        self.horizontal_line_metrics(px).map(|m| VerticalMetrics {
            ascent: m.ascent,
            descent: m.descent,
        })
    }

    fn glyph(&self, ch: char, px: f32) -> Option<RasterGlyph> {
        if self.lookup_glyph_index(ch) == 0 {
            return None;
        }
        let (metrics, coverage) = self.rasterize(ch, px);
        Some(RasterGlyph {
            width: metrics.width,
            height: metrics.height,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            advance: metrics.advance_width,
            coverage,
        })
    }
}

/// Glyph size relative to the vertical step, and stroke radius in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlyphStyle {
    pub scale: f32,
    pub stroke: u32,
}

impl Default for GlyphStyle {
    fn default() -> Self {
        Self { scale: 1.0, stroke: 0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlyphTemplate {
    ch: char,
    bitmap: Array2<u8>,
}

impl GlyphTemplate {
    pub fn new(ch: char, bitmap: Array2<u8>) -> Self {
        Self { ch, bitmap }
    }

    pub fn ch(&self) -> char {
        self.ch
    }

    pub fn bitmap(&self) -> ArrayView2<'_, u8> {
        self.bitmap.view()
    }

    pub fn shape(&self) -> Shape {
        let (height, width) = self.bitmap.dim();
        Shape::new(width, height)
    }
}

/// Templates of one window shape, in tie-break order.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSet {
    templates: Vec<GlyphTemplate>,
    window: Shape,
}

impl TemplateSet {
    /// Validates that every template shares one even, non-empty shape.
    pub fn from_templates(templates: Vec<GlyphTemplate>) -> Result<Self> {
        let window = templates
            .first()
            .map(GlyphTemplate::shape)
            .ok_or(GlyphgridError::EmptyCharset)?;
        if window.area() == 0 || !window.is_even() {
            return Err(GlyphgridError::InvalidGeometry(format!(
                "template window {window} must be non-empty with even sides"
            )));
        }
        if let Some(odd) = templates.iter().find(|t| t.shape() != window) {
            return Err(GlyphgridError::ShapeMismatch {
                expected: window,
                found: odd.shape(),
            });
        }
        Ok(Self { templates, window })
    }

    pub fn window(&self) -> Shape {
        self.window
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn templates(&self) -> &[GlyphTemplate] {
        &self.templates
    }

    pub fn char_at(&self, index: usize) -> char {
        self.templates[index].ch
    }

    /// One flattened template per row, as `f64` intensities.
    pub fn matrix(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.len(), self.window.area()));
        for (mut row, template) in out.outer_iter_mut().zip(&self.templates) {
            row.iter_mut()
                .zip(template.bitmap.iter())
                .for_each(|(dst, &v)| *dst = f64::from(v));
        }
        out
    }
}

/// Renders `charset` into a template set.
///
/// The glyph size is `step.height * style.scale` pixels. The window is the
/// largest glyph box of the set (line box, advance, stroked ink), rounded up to
/// even sides and never smaller than the step. Characters missing from the
/// renderer become blank templates.
pub fn build_templates<R: GlyphRenderer + ?Sized>(
    renderer: &R,
    charset: &[char],
    step: Shape,
    style: GlyphStyle,
) -> Result<TemplateSet> {
    if charset.is_empty() {
        return Err(GlyphgridError::EmptyCharset);
    }
    let px = step.height as f32 * style.scale;
    if !px.is_finite() || px <= 0.0 {
        return Err(GlyphgridError::RenderUnavailable {
            px,
            reason: format!("scale {} gives no usable glyph size", style.scale),
        });
    }
    let line = renderer
        .vertical_metrics(px)
        .ok_or_else(|| GlyphgridError::RenderUnavailable {
            px,
            reason: "renderer has no line metrics at this size".into(),
        })?;

    let glyphs: Vec<Option<RasterGlyph>> = charset
        .iter()
        .map(|&ch| renderer.glyph(ch, px).map(|g| g.stroked(style.stroke)))
        .collect();
    let missing = glyphs.iter().filter(|g| g.is_none()).count();
    if missing == glyphs.len() {
        return Err(GlyphgridError::RenderUnavailable {
            px,
            reason: format!("none of the {} characters are in the font", charset.len()),
        });
    }

    let layout = Layout::measure(&glyphs, line, style.stroke, step);
    debug!(px, stroke = style.stroke, window = %layout.window, missing, "rendered glyph set");

    let templates = charset
        .iter()
        .zip(&glyphs)
        .map(|(&ch, glyph)| GlyphTemplate::new(ch, layout.draw(glyph.as_ref())))
        .collect();
    TemplateSet::from_templates(templates)
}

/// Shared window and baseline row for one glyph set.
struct Layout {
    window: Shape,
    baseline: i32,
}

impl Layout {
    fn measure(
        glyphs: &[Option<RasterGlyph>],
        line: VerticalMetrics,
        stroke: u32,
        step: Shape,
    ) -> Self {
        let pad = stroke as f32;
        let mut top = line.ascent + pad;
        let mut bottom = line.descent - pad;
        let mut width = 0usize;
        for glyph in glyphs.iter().flatten() {
            width = width.max((glyph.advance + 2.0 * pad).ceil() as usize);
            if glyph.has_ink() {
                width = width.max(glyph.width);
                top = top.max((glyph.ymin + glyph.height as i32) as f32);
                bottom = bottom.min(glyph.ymin as f32);
            }
        }

        let (top, bottom) = (top.ceil() as i32, bottom.floor() as i32);
        let box_height = (top - bottom).max(0) as usize;
        let window = Shape::new(
            even_up(width.max(step.width)),
            even_up(box_height.max(step.height)),
        );
        let margin = ((window.height - box_height) / 2) as i32;
        Self {
            window,
            baseline: margin + top,
        }
    }

    /// Ink drawn dark on white, centred horizontally, on the shared baseline.
    fn draw(&self, glyph: Option<&RasterGlyph>) -> Array2<u8> {
        let (w, h) = (self.window.width, self.window.height);
        let mut bitmap = Array2::from_elem((h, w), BACKGROUND);
        let Some(glyph) = glyph.filter(|g| g.has_ink()) else {
            return bitmap;
        };

        let x0 = (w as i32 - glyph.width as i32) / 2;
        let y0 = self.baseline - (glyph.ymin + glyph.height as i32);
        for (sy, row) in glyph.coverage.chunks_exact(glyph.width).enumerate() {
            for (sx, &ink) in row.iter().enumerate() {
                let (tx, ty) = (x0 + sx as i32, y0 + sy as i32);
                if tx >= 0 && ty >= 0 && (tx as usize) < w && (ty as usize) < h {
                    bitmap[[ty as usize, tx as usize]] = BACKGROUND - ink;
                }
            }
        }
        bitmap
    }
}

fn even_up(n: usize) -> usize {
    (n + n % 2).max(2)
}
