//! Minimum mean-squared-error matching of grid windows against glyph templates.

use crate::glyph::TemplateSet;
use crate::window::PatchGrid;
use crate::{GlyphgridError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use std::ops::Range;

/// Windows gathered into one matrix product.
const BATCH_CELLS: usize = 4096;

/// Best template per cell and the summed error of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub rows: Vec<String>,
    /// Winning template index per cell.
    pub indices: Array2<usize>,
    /// Mean-squared error of the winner per cell.
    pub scores: Array2<f64>,
    pub total_score: f64,
}

impl MatchOutcome {
    pub fn cells(&self) -> usize {
        self.scores.len()
    }

    pub fn mean_score(&self) -> f64 {
        match self.cells() {
            0 => 0.0,
            n => self.total_score / n as f64,
        }
    }
}

/// Scores every window against every template and keeps the per-cell minimum.
///
/// Windows are processed in bands of grid rows: a band is flattened into a
/// `cells x pixels` matrix and multiplied against the template matrix once, so
/// `|p - t|^2 = |p|^2 - 2 p.t + |t|^2` costs one GEMM per band. Intensities are
/// small integers held in `f64`, which keeps every sum exact; equal errors are
/// really equal and the earlier template wins.
pub fn match_patches(grid: &PatchGrid<'_>, templates: &TemplateSet) -> Result<MatchOutcome> {
    if grid.window() != templates.window() {
        return Err(GlyphgridError::ShapeMismatch {
            expected: grid.window(),
            found: templates.window(),
        });
    }

    let pixels = grid.window().area() as f64;
    let bank = templates.matrix();
    let bank_sq: Array1<f64> = bank.map_axis(Axis(1), |t| t.dot(&t));

    let (rows, cols) = (grid.rows(), grid.cols());
    let mut indices = Array2::zeros((rows, cols));
    let mut scores = Array2::zeros((rows, cols));
    let band = (BATCH_CELLS / cols.max(1)).max(1);

    for first in (0..rows).step_by(band) {
        let last = (first + band).min(rows);
        let patches = gather(grid, first..last);
        let cross = patches.dot(&bank.t());
        for (i, (patch, dots)) in patches.outer_iter().zip(cross.outer_iter()).enumerate() {
            let (best, err) = closest(patch.dot(&patch), dots, bank_sq.view());
            let cell = [first + i / cols, i % cols];
            indices[cell] = best;
            scores[cell] = err / pixels;
        }
    }

    let total_score = scores.sum();
    let rows = indices
        .outer_iter()
        .map(|row| row.iter().map(|&i| templates.char_at(i)).collect())
        .collect();
    Ok(MatchOutcome {
        rows,
        indices,
        scores,
        total_score,
    })
}

/// Flattens the windows of grid rows `rows` into one matrix, one window per row.
fn gather(grid: &PatchGrid<'_>, rows: Range<usize>) -> Array2<f64> {
    let cols = grid.cols();
    let mut out = Array2::zeros((rows.len() * cols, grid.window().area()));
    let cells = rows.flat_map(|r| (0..cols).map(move |c| (r, c)));
    for (mut dst, (r, c)) in out.outer_iter_mut().zip(cells) {
        dst.iter_mut()
            .zip(grid.patch(r, c).iter())
            .for_each(|(d, &p)| *d = f64::from(p));
    }
    out
}

/// Index and summed squared error of the nearest template; strict `<` keeps the first on ties.
fn closest(patch_sq: f64, dots: ArrayView1<'_, f64>, bank_sq: ArrayView1<'_, f64>) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (j, (&dot, &t_sq)) in dots.iter().zip(bank_sq.iter()).enumerate() {
        let err = patch_sq - 2.0 * dot + t_sq;
        if err < best.1 {
            best = (j, err);
        }
    }
    best
}
