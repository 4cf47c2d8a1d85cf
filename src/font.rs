use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};
use ttf_parser::Face;
use usvg::fontdb;

use crate::fit::{Font, TextMeasure};

/// Families tried, in order, for the generic `sans-serif` face.
const SANS_SERIF_CANDIDATES: &[&str] = &[
    "Arial",
    "Helvetica",
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Roboto",
];

/// Advance-width metrics of a single parsed font face.
#[derive(Clone)]
pub struct FontMetrics {
    data: Arc<Vec<u8>>,
    units_per_em: u16,
    space_advance: u16,
    face_index: u32,
    advances: Arc<RwLock<HashMap<char, u16>>>,
}

impl FontMetrics {
    fn width_px(&self, text: &str, font_size: f32) -> Option<f32> {
        let mut advance = 0u32;
        let mut missing = Vec::new();
        {
            let cache = self.advances.read().unwrap_or_else(|err| err.into_inner());
            for ch in text.chars() {
                if ch == ' ' {
                    advance = advance.saturating_add(self.space_advance as u32);
                    continue;
                }
                match cache.get(&ch) {
                    Some(glyph_advance) => advance = advance.saturating_add(*glyph_advance as u32),
                    None => missing.push(ch),
                }
            }
        }
        if !missing.is_empty() {
            let face = Face::parse(&self.data, self.face_index).ok()?;
            let mut cache = self.advances.write().unwrap_or_else(|err| err.into_inner());
            for ch in missing {
                let glyph_advance = *cache.entry(ch).or_insert_with(|| {
                    face.glyph_index(ch)
                        .and_then(|glyph| face.glyph_hor_advance(glyph))
                        .unwrap_or(self.space_advance)
                });
                advance = advance.saturating_add(glyph_advance as u32);
            }
        }
        let units = self.units_per_em.max(1) as f32;
        Some(advance as f32 * (font_size / units))
    }

    #[cfg(test)]
    fn cached_advances(&self) -> usize {
        self.advances.read().map(|cache| cache.len()).unwrap_or(0)
    }
}

impl TextMeasure for FontMetrics {
    fn measure_text(&self, text: &str, font: &Font<'_>) -> f32 {
        self.width_px(text, font.size)
            .unwrap_or_else(|| EstimatedMetrics.measure_text(text, font))
    }
}

/// Per-character width guess for when no face is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatedMetrics;

impl TextMeasure for EstimatedMetrics {
    fn measure_text(&self, text: &str, font: &Font<'_>) -> f32 {
        text.chars().map(estimate_char_units).sum::<f32>() * font.size
    }
}

fn estimate_char_units(ch: char) -> f32 {
    if ch.is_whitespace() {
        0.25
    } else if ch.is_ascii_alphanumeric() {
        0.55
    } else if ch.is_ascii() {
        0.35
    } else {
        0.9
    }
}

/// Font database shared by measurement and rasterization.
///
/// A family missing from the database is measured with the database's
/// `sans-serif` face, which is what the rasterizer draws it with. Only a
/// database without faces falls back to [`EstimatedMetrics`]. Lookups are
/// cached per family.
pub struct FontBook {
    db: Arc<fontdb::Database>,
    faces: RwLock<HashMap<String, Option<FontMetrics>>>,
}

impl FontBook {
    pub fn new(fonts_dir: Option<&Path>) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        if let Some(dir) = fonts_dir {
            if dir.is_dir() {
                db.load_fonts_dir(dir);
            } else {
                warn!("fonts directory not found: {}", dir.display());
            }
        }
        debug!("font database loaded ({} faces)", db.len());
        Self::from_database(db)
    }

    /// A book with no faces at all; every measurement is estimated.
    pub fn empty() -> Self {
        Self::from_database(fontdb::Database::new())
    }

    fn from_database(mut db: fontdb::Database) -> Self {
        if let Some(family) = pick_sans_serif_family(&db) {
            debug!("sans-serif resolves to '{}'", family);
            db.set_sans_serif_family(family);
        }
        Self {
            db: Arc::new(db),
            faces: RwLock::new(HashMap::new()),
        }
    }

    pub fn database(&self) -> Arc<fontdb::Database> {
        self.db.clone()
    }

    pub fn resolve(&self, family: &str) -> Option<FontMetrics> {
        if let Some(found) = self
            .faces
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .get(family)
        {
            return found.clone();
        }
        let resolved = load_font_metrics_from_family(&self.db, family)
            .or_else(|err| {
                debug!("measuring '{}' with sans-serif: {}", family, err);
                load_font_metrics_from_family(&self.db, "sans-serif")
            })
            .map_err(|err| debug!("falling back to estimated metrics for '{}': {}", family, err))
            .ok();
        self.faces
            .write()
            .unwrap_or_else(|err| err.into_inner())
            .insert(family.to_string(), resolved.clone());
        resolved
    }
}

impl TextMeasure for FontBook {
    fn measure_text(&self, text: &str, font: &Font<'_>) -> f32 {
        match self.resolve(font.family) {
            Some(metrics) => metrics.measure_text(text, font),
            None => EstimatedMetrics.measure_text(text, font),
        }
    }
}

/// First preferred sans family present in `db`, else the first family of
/// any face.
fn pick_sans_serif_family(db: &fontdb::Database) -> Option<String> {
    SANS_SERIF_CANDIDATES
        .iter()
        .find(|name| {
            db.query(&fontdb::Query {
                families: &[fontdb::Family::Name(**name)],
                ..Default::default()
            })
            .is_some()
        })
        .map(|name| name.to_string())
        .or_else(|| {
            db.faces()
                .find_map(|face| face.families.first().map(|(name, _)| name.clone()))
        })
}

fn metrics_for_face(data: Arc<Vec<u8>>, face_index: u32) -> Option<FontMetrics> {
    let face = Face::parse(&data, face_index).ok()?;
    let units_per_em = face.units_per_em().max(1);
    let space_advance = face
        .glyph_index(' ')
        .and_then(|id| face.glyph_hor_advance(id))
        .unwrap_or(units_per_em / 2);
    Some(FontMetrics {
        data,
        units_per_em,
        space_advance,
        face_index,
        advances: Arc::new(RwLock::new(HashMap::new())),
    })
}

fn load_font_metrics_from_family(db: &fontdb::Database, family: &str) -> Result<FontMetrics> {
    let families = if family.eq_ignore_ascii_case("sans-serif") {
        vec![fontdb::Family::SansSerif]
    } else if family.eq_ignore_ascii_case("serif") {
        vec![fontdb::Family::Serif]
    } else {
        vec![fontdb::Family::Name(family)]
    };
    let query = fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    let (data, face_index) = db
        .with_face_data(id, |data, index| (data.to_vec(), index))
        .ok_or_else(|| anyhow!("failed to load font data: {}", family))?;
    metrics_for_face(Arc::new(data), face_index)
        .ok_or_else(|| anyhow!("failed to parse font: {}", family))
}
