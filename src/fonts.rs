use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use ab_glyph::FontArc;

const PLATFORM_CANDIDATES: &[&str] = &[
    "C:\\Windows\\Fonts\\msyh.ttc",
    "C:\\Windows\\Fonts\\arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/System/Library/Fonts/SFNS.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
];

const BUNDLED_PREFERENCE: &[&str] = &["Ubuntu-Light", "Hack"];

/// Resolves the font used to burn text into the raster. Resolution happens
/// once per session and degrades to egui's bundled font; it never fails loudly.
pub struct FontResolver {
    candidates: Vec<PathBuf>,
    resolved: OnceCell<Option<FontArc>>,
}

impl FontResolver {
    pub fn new(extra_candidates: &[PathBuf]) -> Self {
        let mut candidates = extra_candidates.to_vec();
        candidates.extend(PLATFORM_CANDIDATES.iter().map(PathBuf::from));
        Self {
            candidates,
            resolved: OnceCell::new(),
        }
    }

    pub fn font(&self) -> Option<&FontArc> {
        self.resolved
            .get_or_init(|| resolve_font(&self.candidates))
            .as_ref()
    }
}

fn resolve_font(candidates: &[PathBuf]) -> Option<FontArc> {
    for path in candidates {
        if let Some(font) = load_font_file(path) {
            log::debug!("text font: {}", path.display());
            return Some(font);
        }
    }

    let bundled = bundled_font();
    if bundled.is_none() {
        log::warn!("no usable font found, text annotations will not be rendered");
    }
    bundled
}

fn load_font_file(path: &Path) -> Option<FontArc> {
    let bytes = std::fs::read(path).ok()?;
    FontArc::try_from_vec(bytes).ok()
}

fn bundled_font() -> Option<FontArc> {
    let definitions = egui::FontDefinitions::default();
    let preferred = BUNDLED_PREFERENCE
        .iter()
        .filter_map(|name| definitions.font_data.get(*name));

    for data in preferred.chain(definitions.font_data.values()) {
        if let Ok(font) = FontArc::try_from_vec(data.font.to_vec()) {
            log::debug!("text font: bundled fallback");
            return Some(font);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{bundled_font, load_font_file, FontResolver};

    #[test]
    fn missing_and_garbage_files_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let garbage = dir.path().join("broken.ttf");
        std::fs::write(&garbage, b"not a font").expect("write garbage");

        assert!(load_font_file(&garbage).is_none());
        assert!(load_font_file(&dir.path().join("missing.ttf")).is_none());
    }

    #[test]
    fn resolver_always_ends_with_a_font() {
        let resolver = FontResolver::new(&[PathBuf::from("/definitely/not/here.ttf")]);
        assert!(bundled_font().is_some());
        assert!(resolver.font().is_some());
    }
}
