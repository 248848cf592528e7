//! Parameter search - evaluates rendering and alignment variants in parallel
//! and keeps the grid with the lowest score.

use crate::glyph::{build_templates, GlyphRenderer, GlyphStyle, TemplateSet};
use crate::matcher::match_patches;
use crate::window::{sample_windows, Shape, Shift};
use crate::{GlyphgridError, Result};
use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, info_span, warn};

/// One concrete rendering configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterVariant {
    pub scale: f32,
    pub stroke: u32,
    pub shift: Shift,
}

impl ParameterVariant {
    pub fn new(style: GlyphStyle, shift: Shift) -> Self {
        Self {
            scale: style.scale,
            stroke: style.stroke,
            shift,
        }
    }

    pub fn style(&self) -> GlyphStyle {
        GlyphStyle {
            scale: self.scale,
            stroke: self.stroke,
        }
    }
}

impl Default for ParameterVariant {
    fn default() -> Self {
        Self::new(GlyphStyle::default(), Shift::default())
    }
}

impl fmt::Display for ParameterVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scale={} stroke={} shift=({}, {})",
            self.scale, self.stroke, self.shift.x, self.shift.y
        )
    }
}

/// Candidate lists for auto mode. Vertical shifts are the horizontal ones
/// scaled by the cell aspect ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpace {
    pub scales: Vec<f32>,
    pub strokes: Vec<u32>,
    pub shifts: Vec<isize>,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            scales: vec![0.9, 1.0, 1.1],
            strokes: vec![0, 1],
            shifts: vec![0, 2, 4],
        }
    }
}

impl SearchSpace {
    pub fn validate(&self) -> Result<()> {
        let empty = [
            ("scales", self.scales.is_empty()),
            ("strokes", self.strokes.is_empty()),
            ("shifts", self.shifts.is_empty()),
        ];
        match empty.iter().find(|(_, is_empty)| *is_empty) {
            Some((name, _)) => Err(GlyphgridError::Config(format!(
                "search space needs at least one entry in {name}"
            ))),
            None => Ok(()),
        }
    }

    /// Glyph styles in scale-major order.
    pub fn styles(&self) -> Vec<GlyphStyle> {
        self.scales
            .iter()
            .flat_map(|&scale| self.strokes.iter().map(move |&stroke| GlyphStyle { scale, stroke }))
            .collect()
    }

    /// Every (shift_x, shift_y) pair, shift_x-major. Derived vertical shifts
    /// that round to the same value are kept once.
    pub fn shift_pairs(&self, aspect: f32) -> Vec<Shift> {
        let mut ys: Vec<isize> = Vec::with_capacity(self.shifts.len());
        for &x in &self.shifts {
            let y = (x as f32 * aspect).round() as isize;
            if !ys.contains(&y) {
                ys.push(y);
            }
        }
        self.shifts
            .iter()
            .flat_map(|&x| ys.iter().map(move |&y| Shift::new(x, y)))
            .collect()
    }

    /// All variants in canonical order: scale, stroke, shift_x, shift_y.
    pub fn variants(&self, aspect: f32) -> Vec<ParameterVariant> {
        let shifts = self.shift_pairs(aspect);
        self.styles()
            .into_iter()
            .flat_map(|style| shifts.iter().map(move |&shift| ParameterVariant::new(style, shift)))
            .collect()
    }
}

/// A fully evaluated variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub variant: ParameterVariant,
    pub rows: Vec<String>,
    pub total_score: f64,
    pub mean_score: f64,
    pub cells: usize,
    pub window: Shape,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub best: Evaluation,
    pub evaluated: usize,
    /// Variants dropped because their glyphs could not be rendered.
    pub skipped: Vec<ParameterVariant>,
}

/// Samples and matches one variant against an already rendered template set.
pub fn evaluate_variant(
    image: ArrayView2<'_, u8>,
    step: Shape,
    templates: &TemplateSet,
    variant: ParameterVariant,
) -> Result<Evaluation> {
    let canvas = sample_windows(image, templates.window(), step, variant.shift)?;
    let outcome = match_patches(&canvas.patches(), templates)?;
    debug!(%variant, total = outcome.total_score, "evaluated variant");
    Ok(Evaluation {
        variant,
        mean_score: outcome.mean_score(),
        cells: outcome.cells(),
        total_score: outcome.total_score,
        rows: outcome.rows,
        window: templates.window(),
    })
}

/// Renders the glyphs for `variant` and evaluates it; the single-shot pipeline.
pub fn render_variant<R: GlyphRenderer + ?Sized>(
    renderer: &R,
    image: ArrayView2<'_, u8>,
    step: Shape,
    charset: &[char],
    variant: ParameterVariant,
) -> Result<Evaluation> {
    let templates = build_templates(renderer, charset, step, variant.style())?;
    evaluate_variant(image, step, &templates, variant)
}

/// Evaluates every variant of `space` and returns the one with the lowest
/// mean per-cell score; equal scores go to the earliest in canonical order.
///
/// Templates are rendered once per (scale, stroke) and shared by all shifts.
/// Styles that cannot be rendered are skipped; if none can, the search fails
/// with [`GlyphgridError::AllVariantsFailed`]. Any other failure comes back as
/// [`GlyphgridError::Variant`] naming the variant it hit.
pub fn search_best<R: GlyphRenderer + ?Sized>(
    renderer: &R,
    image: ArrayView2<'_, u8>,
    step_x: usize,
    aspect: f32,
    charset: &[char],
    space: &SearchSpace,
) -> Result<SearchResult> {
    if charset.is_empty() {
        return Err(GlyphgridError::EmptyCharset);
    }
    space.validate()?;
    let step = Shape::from_aspect(step_x, aspect)?;
    let styles = space.styles();
    let shifts = space.shift_pairs(aspect);
    let _span = info_span!("search", %step, variants = styles.len() * shifts.len()).entered();

    let banks: Vec<Result<TemplateSet>> = styles
        .par_iter()
        .map(|&style| build_templates(renderer, charset, step, style))
        .collect();

    let mut built = Vec::with_capacity(banks.len());
    let mut skipped = Vec::new();
    for (style, bank) in styles.into_iter().zip(banks) {
        match bank {
            Ok(templates) => built.push((style, templates)),
            Err(GlyphgridError::RenderUnavailable { px, reason }) => {
                warn!(scale = style.scale, stroke = style.stroke, px, %reason, "skipping style");
                skipped.extend(shifts.iter().map(|&shift| ParameterVariant::new(style, shift)));
            }
            Err(err) => {
                let first = shifts.first().copied().unwrap_or_default();
                return Err(err.in_variant(ParameterVariant::new(style, first)));
            }
        }
    }

    let jobs: Vec<(ParameterVariant, &TemplateSet)> = built
        .iter()
        .flat_map(|(style, templates)| {
            shifts
                .iter()
                .map(move |&shift| (ParameterVariant::new(*style, shift), templates))
        })
        .collect();

    let evaluations = jobs
        .par_iter()
        .map(|&(variant, templates)| {
            evaluate_variant(image, step, templates, variant).map_err(|e| e.in_variant(variant))
        })
        .collect::<Result<Vec<_>>>()?;
    let evaluated = evaluations.len();

    let Some(best) = evaluations
        .into_iter()
        .reduce(|best, next| if next.mean_score < best.mean_score { next } else { best })
    else {
        return Err(GlyphgridError::AllVariantsFailed { attempted: skipped });
    };

    info!(
        variant = %best.variant,
        mean = best.mean_score,
        evaluated,
        skipped = skipped.len(),
        "search finished"
    );
    Ok(SearchResult {
        best,
        evaluated,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_shifts_follow_aspect() {
        let space = SearchSpace {
            scales: vec![1.0],
            strokes: vec![0],
            shifts: vec![0, 3],
        };
        let pairs = space.shift_pairs(2.0);
        assert_eq!(
            pairs,
            vec![Shift::new(0, 0), Shift::new(0, 6), Shift::new(3, 0), Shift::new(3, 6)]
        );
    }

    #[test]
    fn canonical_order_is_scale_stroke_shift() {
        let space = SearchSpace {
            scales: vec![0.5, 1.0],
            strokes: vec![0, 2],
            shifts: vec![0, 1],
        };
        let variants = space.variants(1.0);
        assert_eq!(variants.len(), 2 * 2 * 2 * 2);
        let first = ParameterVariant {
            scale: 0.5,
            ..ParameterVariant::default()
        };
        assert_eq!(variants[0], first);
        assert_eq!(variants[1].shift, Shift::new(0, 1));
        assert_eq!(variants[4].stroke, 2);
        assert_eq!(variants[8].scale, 1.0);
    }

    #[test]
    fn colliding_vertical_shifts_kept_once() {
        let space = SearchSpace {
            scales: vec![1.0],
            strokes: vec![0],
            shifts: vec![0, 1],
        };
        assert_eq!(space.shift_pairs(0.1).len(), 2);
    }

    #[test]
    fn empty_lists_are_rejected() {
        let space = SearchSpace {
            strokes: Vec::new(),
            ..SearchSpace::default()
        };
        assert!(matches!(space.validate(), Err(GlyphgridError::Config(_))));
        assert!(SearchSpace::default().validate().is_ok());
    }
}
