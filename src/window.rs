//! Window sampling - pads an image onto a white canvas and exposes every
//! step-aligned window as an overlapping view into that canvas.

use crate::{GlyphgridError, Result};
use ndarray::{s, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canvas fill outside the source image.
pub const BACKGROUND: u8 = 255;

/// Width and height in pixels, used for both windows and steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub width: usize,
    pub height: usize,
}

impl Shape {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Step for a horizontal stride and a cell aspect ratio (height / width).
    /// The vertical step is at least one pixel.
    pub fn from_aspect(step_x: usize, aspect: f32) -> Result<Self> {
        if step_x == 0 {
            return Err(GlyphgridError::Config("step must be at least 1".into()));
        }
        if !aspect.is_finite() || aspect <= 0.0 {
            return Err(GlyphgridError::Config(format!(
                "aspect ratio {aspect} must be positive"
            )));
        }
        let step_y = (step_x as f32 * aspect).round().max(1.0) as usize;
        Ok(Self::new(step_x, step_y))
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }

    pub fn is_even(&self) -> bool {
        self.width % 2 == 0 && self.height % 2 == 0
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Sub-cell offset of the image on the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shift {
    pub x: isize,
    pub y: isize,
}

impl Shift {
    pub fn new(x: isize, y: isize) -> Self {
        Self { x, y }
    }
}

/// White padded copy of an image, sized so every window of the grid fits.
pub struct Canvas {
    pixels: Array2<u8>,
    window: Shape,
    step: Shape,
    rows: usize,
    cols: usize,
}

impl Canvas {
    pub fn pixels(&self) -> ArrayView2<'_, u8> {
        self.pixels.view()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Borrowed view of every window on the grid.
    pub fn patches(&self) -> PatchGrid<'_> {
        PatchGrid {
            canvas: self.pixels.view(),
            window: self.window,
            step: self.step,
            rows: self.rows,
            cols: self.cols,
        }
    }
}

/// Pastes `image` (rows x cols = height x width) onto a white canvas and lays
/// out a `ceil(h / step_y) x ceil(w / step_x)` grid of windows over it.
///
/// The image lands at `(window / 2 - step / 2) + shift`, which centres each
/// step cell inside its window. Shifts of any size are clipped; whatever falls
/// outside the canvas is dropped and uncovered canvas stays white.
pub fn sample_windows(
    image: ArrayView2<'_, u8>,
    window: Shape,
    step: Shape,
    shift: Shift,
) -> Result<Canvas> {
    check_geometry(window, step)?;
    let (img_h, img_w) = image.dim();
    if img_w == 0 || img_h == 0 {
        return Err(GlyphgridError::InvalidGeometry(format!(
            "image is empty ({img_w}x{img_h})"
        )));
    }

    let cols = img_w.div_ceil(step.width);
    let rows = img_h.div_ceil(step.height);
    let canvas_w = cols * step.width + window.width;
    let canvas_h = rows * step.height + window.height;
    let mut pixels = Array2::from_elem((canvas_h, canvas_w), BACKGROUND);

    let left = (window.width / 2 - step.width / 2) as isize + shift.x;
    let top = (window.height / 2 - step.height / 2) as isize + shift.y;
    if let (Some((dx, sx, w)), Some((dy, sy, h))) =
        (overlap(left, img_w, canvas_w), overlap(top, img_h, canvas_h))
    {
        pixels
            .slice_mut(s![dy..dy + h, dx..dx + w])
            .assign(&image.slice(s![sy..sy + h, sx..sx + w]));
    }

    Ok(Canvas { pixels, window, step, rows, cols })
}

fn check_geometry(window: Shape, step: Shape) -> Result<()> {
    if window.area() == 0 || !window.is_even() {
        return Err(GlyphgridError::InvalidGeometry(format!(
            "window {window} must be non-empty with even sides"
        )));
    }
    if step.area() == 0 {
        return Err(GlyphgridError::InvalidGeometry(format!("step {step} is empty")));
    }
    if window.width < step.width || window.height < step.height {
        return Err(GlyphgridError::InvalidGeometry(format!(
            "window {window} is smaller than step {step}"
        )));
    }
    Ok(())
}

/// Overlap of a span of `len` placed at `offset` with `[0, bound)`, as
/// (destination start, source start, length).
fn overlap(offset: isize, len: usize, bound: usize) -> Option<(usize, usize, usize)> {
    let start = offset.max(0);
    let end = offset.saturating_add(len as isize).min(bound as isize);
    if start >= end {
        return None;
    }
    Some((start as usize, (start - offset) as usize, (end - start) as usize))
}

/// Overlapping windows over one canvas buffer. Window `(row, col)` starts at
/// canvas pixel `(row * step_y, col * step_x)`; nothing is copied per window.
#[derive(Clone, Copy)]
pub struct PatchGrid<'a> {
    canvas: ArrayView2<'a, u8>,
    window: Shape,
    step: Shape,
    rows: usize,
    cols: usize,
}

impl<'a> PatchGrid<'a> {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn window(&self) -> Shape {
        self.window
    }

    /// Window at `(row, col)`. Iterating it yields pixels in row-major order.
    ///
    /// Panics if the cell is outside the grid.
    pub fn patch(&self, row: usize, col: usize) -> ArrayView2<'a, u8> {
        assert!(row < self.rows && col < self.cols, "cell ({row}, {col}) outside grid");
        let (y, x) = (row * self.step.height, col * self.step.width);
        self.canvas
            .slice_move(s![y..y + self.window.height, x..x + self.window.width])
    }

    /// All windows in row-major grid order.
    pub fn iter(&self) -> impl Iterator<Item = ArrayView2<'a, u8>> + '_ {
        (0..self.rows).flat_map(move |r| (0..self.cols).map(move |c| self.patch(r, c)))
    }
}
