//! JSON settings shared by the CLI and
//! [`Converter::from_settings`](crate::Converter::from_settings).

use crate::search::{ParameterVariant, SearchSpace};
use crate::window::Shift;
use crate::{printable_ascii, GlyphgridError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Horizontal step in pixels.
    pub step: usize,
    /// Vertical step as a multiple of `step`.
    pub aspect: f32,
    pub charset: String,
    pub font: Option<PathBuf>,
    pub scale: f32,
    pub stroke: u32,
    pub shift_x: isize,
    pub shift_y: isize,
    pub auto: bool,
    pub search: SearchSpace,
    pub threshold: Option<u8>,
    pub dither: bool,
    pub invert: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            step: 8,
            aspect: 2.0,
            charset: printable_ascii().into_iter().collect(),
            font: None,
            scale: 1.0,
            stroke: 0,
            shift_x: 0,
            shift_y: 0,
            auto: false,
            search: SearchSpace::default(),
            threshold: None,
            dither: false,
            invert: false,
        }
    }
}

impl Settings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| GlyphgridError::Config(format!("{}: {e}", path.display())))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| GlyphgridError::Config(e.to_string()))
    }

    /// The fixed-mode variant described by `scale`, `stroke` and the shifts.
    pub fn variant(&self) -> ParameterVariant {
        ParameterVariant {
            scale: self.scale,
            stroke: self.stroke,
            shift: Shift::new(self.shift_x, self.shift_y),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.charset.is_empty() {
            return Err(GlyphgridError::EmptyCharset);
        }
        if self.step == 0 {
            return Err(GlyphgridError::Config("step must be at least 1".into()));
        }
        if !self.aspect.is_finite() || self.aspect <= 0.0 {
            return Err(GlyphgridError::Config(format!(
                "aspect must be positive, got {}",
                self.aspect
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(GlyphgridError::Config(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        if self.auto {
            self.search.validate()?;
        }
        Ok(())
    }
}
