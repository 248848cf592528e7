//! Font resolution: an explicit file first, then a fixed fallback chain.

use crate::{GlyphgridError, Result};
use fontdue::{Font, FontSettings};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Tried in order in every font directory.
const FALLBACK_FONTS: &[&str] = &[
    "arial.ttf",
    "cour.ttf",
    "courbd.ttf",
    "couri.ttf",
    "lucon.ttf",
    "consola.ttf",
    "DejaVuSansMono.ttf",
];

const FONT_DIRS: &[&str] = &[
    ".",
    "assets",
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/truetype/msttcorefonts",
    "/usr/share/fonts/TTF",
    "/usr/share/fonts/dejavu",
    "/Library/Fonts",
    "/System/Library/Fonts",
];

/// Paths tried after an explicit font, in priority order.
pub fn fallback_paths() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = FONT_DIRS.iter().map(PathBuf::from).collect();
    if let Some(windir) = std::env::var_os("WINDIR") {
        dirs.push(PathBuf::from(windir).join("Fonts"));
    }
    FALLBACK_FONTS
        .iter()
        .flat_map(|name| dirs.iter().map(move |dir| dir.join(name)))
        .collect()
}

/// Loads `explicit` if it parses, otherwise the first fallback that does.
pub fn load_font(explicit: Option<&Path>) -> Result<Font> {
    load_first(explicit.map(Path::to_path_buf).into_iter().chain(fallback_paths()))
}

/// First candidate that reads and parses as a font. Paths that fail are
/// reported in order in [`GlyphgridError::FontUnavailable`].
pub fn load_first(candidates: impl IntoIterator<Item = PathBuf>) -> Result<Font> {
    let mut tried = Vec::new();
    for path in candidates {
        match std::fs::read(&path) {
            Ok(bytes) => match parse_font(bytes) {
                Ok(font) => {
                    info!(path = %path.display(), "loaded font");
                    return Ok(font);
                }
                Err(err) => debug!(path = %path.display(), %err, "font rejected"),
            },
            Err(err) => debug!(path = %path.display(), %err, "font not readable"),
        }
        tried.push(path);
    }
    Err(GlyphgridError::FontUnavailable { tried })
}

pub fn parse_font(bytes: Vec<u8>) -> Result<Font> {
    Font::from_bytes(bytes, FontSettings::default())
        .map_err(|e| GlyphgridError::Config(format!("font parse failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_chain_keeps_font_priority() {
        let paths = fallback_paths();
        assert!(paths.len() >= FALLBACK_FONTS.len() * FONT_DIRS.len());
        assert!(paths[0].ends_with("arial.ttf"));
        assert!(paths.last().is_some_and(|p| p.ends_with("DejaVuSansMono.ttf")));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(matches!(parse_font(vec![0, 1, 2, 3]), Err(GlyphgridError::Config(_))));
    }

    fn missing(name: &str) -> PathBuf {
        PathBuf::from("/nonexistent/glyphgrid").join(name)
    }

    #[test]
    fn unreadable_candidates_are_listed_in_order() {
        let candidates = vec![missing("a.ttf"), missing("b.ttf"), missing("c.ttf")];
        match load_first(candidates.clone()) {
            Err(GlyphgridError::FontUnavailable { tried }) => assert_eq!(tried, candidates),
            other => panic!("expected FontUnavailable, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn unparseable_explicit_font_falls_through() {
        let garbage = std::env::temp_dir().join(format!("glyphgrid-{}.ttf", std::process::id()));
        std::fs::write(&garbage, b"not a font").unwrap();
        let result = load_first(vec![garbage.clone(), missing("fallback.ttf")]);
        std::fs::remove_file(&garbage).unwrap();
        match result {
            Err(GlyphgridError::FontUnavailable { tried }) => {
                assert_eq!(tried, vec![garbage, missing("fallback.ttf")]);
            }
            other => panic!("expected FontUnavailable, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn empty_candidate_list_is_unavailable() {
        assert!(matches!(
            load_first(Vec::new()),
            Err(GlyphgridError::FontUnavailable { tried }) if tried.is_empty()
        ));
    }
}
