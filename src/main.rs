//! glyphgrid CLI - Convert images to character grids by glyph template matching

use clap::Parser;
use glyphgrid::{font, Converter, GlyphgridError, Settings};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "glyphgrid", version, about = "Convert images to character grids")]
struct Args {
    /// Input image file
    input: Option<PathBuf>,
    /// Horizontal step in pixels per character
    #[arg(short, long)]
    step: Option<usize>,
    /// Vertical step as a multiple of the horizontal step
    #[arg(long)]
    aspect: Option<f32>,
    /// Font file (falls back to common system fonts)
    #[arg(short, long)]
    font: Option<PathBuf>,
    /// Characters to match against, in tie-break order
    #[arg(long)]
    charset: Option<String>,
    /// Glyph size relative to the vertical step
    #[arg(long)]
    scale: Option<f32>,
    /// Stroke radius in pixels
    #[arg(long)]
    stroke: Option<u32>,
    /// Search scales, strokes and shifts for the lowest error
    #[arg(short, long)]
    auto: bool,
    /// Binarize at this gray level before matching
    #[arg(short, long)]
    threshold: Option<u8>,
    /// Enable Atkinson dithering
    #[arg(short, long)]
    dither: bool,
    /// Invert the image
    #[arg(short, long)]
    invert: bool,
    /// JSON settings file; flags override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print the effective settings as JSON and exit
    #[arg(long)]
    print_config: bool,
    /// Print the result with its parameters and scores as JSON
    #[arg(long)]
    json: bool,
    /// Log search progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn settings(&self) -> Result<Settings, GlyphgridError> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };
        if let Some(step) = self.step {
            settings.step = step;
        }
        if let Some(aspect) = self.aspect {
            settings.aspect = aspect;
        }
        if let Some(font) = &self.font {
            settings.font = Some(font.clone());
        }
        if let Some(charset) = &self.charset {
            settings.charset = charset.clone();
        }
        if let Some(scale) = self.scale {
            settings.scale = scale;
        }
        if let Some(stroke) = self.stroke {
            settings.stroke = stroke;
        }
        if self.threshold.is_some() {
            settings.threshold = self.threshold;
        }
        settings.auto |= self.auto;
        settings.dither |= self.dither;
        settings.invert |= self.invert;
        settings.validate()?;
        Ok(settings)
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "glyphgrid=debug" } else { "glyphgrid=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), GlyphgridError> {
    let args = Args::parse();
    init_logging(args.verbose);

    let settings = args.settings()?;
    if args.print_config {
        println!("{}", settings.to_json()?);
        return Ok(());
    }
    let input = args
        .input
        .as_ref()
        .ok_or_else(|| GlyphgridError::Config("an input image is required".into()))?;

    let font = font::load_font(settings.font.as_deref())?;
    let converter = Converter::from_settings(font, &settings)?;
    let image = image::open(input)?;
    let result = converter.convert(&image)?;

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| GlyphgridError::Config(e.to_string()))?;
        println!("{json}");
    } else {
        for row in &result.best.rows {
            println!("{row}");
        }
    }
    Ok(())
}
