//! Image to character grid converter using glyph template matching.
//!
//! Every character of a glyph set is rendered into a bitmap, the image is cut
//! into overlapping windows on a fixed step, and each window picks the glyph
//! with the lowest mean-squared error. Auto mode repeats this over a grid of
//! rendering and alignment parameters and keeps the best result.

pub mod config;
pub mod font;
pub mod glyph;
pub mod matcher;
pub mod prepare;
pub mod search;
pub mod window;

pub use config::Settings;
pub use glyph::{build_templates, GlyphRenderer, GlyphStyle, GlyphTemplate, TemplateSet};
pub use matcher::{match_patches, MatchOutcome};
pub use search::{
    evaluate_variant, render_variant, search_best, Evaluation, ParameterVariant, SearchResult,
    SearchSpace,
};
pub use window::{sample_windows, Canvas, PatchGrid, Shape, Shift};

use image::DynamicImage;
use ndarray::{Array2, ArrayView2};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlyphgridError {
    #[error("Image error: {0}")]
    ImageUnavailable(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Font error: no usable font after trying {} paths", .tried.len())]
    FontUnavailable { tried: Vec<PathBuf> },
    #[error("Render error at {px}px: {reason}")]
    RenderUnavailable { px: f32, reason: String },
    #[error("Character set is empty")]
    EmptyCharset,
    #[error("All {} parameter variants failed to render", .attempted.len())]
    AllVariantsFailed { attempted: Vec<ParameterVariant> },
    #[error("Shape mismatch: patch window is {expected}, template window is {found}")]
    ShapeMismatch { expected: Shape, found: Shape },
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Variant {variant} failed: {source}")]
    Variant {
        variant: ParameterVariant,
        source: Box<GlyphgridError>,
    },
}

impl GlyphgridError {
    /// Attaches the variant being evaluated when the error was raised.
    pub fn in_variant(self, variant: ParameterVariant) -> Self {
        Self::Variant {
            variant,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, GlyphgridError>;

/// Printable ASCII, 0x20 through 0x7E, in code point order.
pub fn printable_ascii() -> Vec<char> {
    (0x20u8..=0x7E).map(char::from).collect()
}

/// How a [`Converter`] picks its rendering parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    /// Render once with the given parameters.
    Fixed(ParameterVariant),
    /// Evaluate every variant of the space and keep the best.
    Auto(SearchSpace),
}

/// Main converter: image preparation plus fixed or auto-tuned matching.
pub struct Converter<R> {
    renderer: R,
    charset: Vec<char>,
    step: usize,
    aspect: f32,
    mode: Mode,
    threshold: Option<u8>,
    dither: bool,
    invert: bool,
}

impl<R: GlyphRenderer> Converter<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            charset: printable_ascii(),
            step: 8,
            aspect: 2.0,
            mode: Mode::Fixed(ParameterVariant::default()),
            threshold: None,
            dither: false,
            invert: false,
        }
    }

    /// Builds a converter from validated settings.
    pub fn from_settings(renderer: R, settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let mode = if settings.auto {
            Mode::Auto(settings.search.clone())
        } else {
            Mode::Fixed(settings.variant())
        };
        Ok(Self::new(renderer)
            .with_charset(settings.charset.chars())
            .with_step(settings.step)
            .with_aspect(settings.aspect)
            .with_mode(mode)
            .with_threshold(settings.threshold)
            .with_dither(settings.dither)
            .with_invert(settings.invert))
    }

    /// Horizontal step in pixels between neighbouring cells.
    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    /// Vertical step as a multiple of the horizontal step.
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn with_charset(mut self, charset: impl IntoIterator<Item = char>) -> Self {
        self.charset = charset.into_iter().collect();
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_threshold(mut self, threshold: Option<u8>) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_dither(mut self, enabled: bool) -> Self {
        self.dither = enabled;
        self
    }

    pub fn with_invert(mut self, enabled: bool) -> Self {
        self.invert = enabled;
        self
    }

    /// Grayscale conversion, inversion and optional binarization.
    pub fn prepare(&self, image: &DynamicImage) -> Array2<u8> {
        let mut gray = image.to_luma8();
        if self.invert {
            image::imageops::invert(&mut gray);
        }
        if self.dither {
            gray = prepare::dither_atkinson(&gray, self.step as u32);
        } else if let Some(level) = self.threshold {
            prepare::binarize(&mut gray, level);
        }
        prepare::to_gray_array(&gray)
    }

    pub fn convert(&self, image: &DynamicImage) -> Result<SearchResult> {
        let pixels = self.prepare(image);
        self.convert_pixels(pixels.view())
    }

    /// Runs the configured mode on an already prepared grayscale array.
    pub fn convert_pixels(&self, pixels: ArrayView2<'_, u8>) -> Result<SearchResult> {
        match &self.mode {
            Mode::Fixed(variant) => {
                let step = Shape::from_aspect(self.step, self.aspect)?;
                let best = render_variant(&self.renderer, pixels, step, &self.charset, *variant)?;
                Ok(SearchResult {
                    best,
                    evaluated: 1,
                    skipped: Vec::new(),
                })
            }
            Mode::Auto(space) => search_best(
                &self.renderer,
                pixels,
                self.step,
                self.aspect,
                &self.charset,
                space,
            ),
        }
    }
}
