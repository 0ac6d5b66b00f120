use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use super::Bitmap;
use super::codec::decode_image;
use crate::foundation::error::{RelayError, RelayResult};

/// Reserved overlay drawn full-frame over a fresh postcard.
pub const MATTE: &str = "matte";
/// Reserved overlay used as the default payload of a new route.
pub const POSTCARD: &str = "postcard";

/// Overlay images keyed by name, loaded once at startup and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct OverlaySet {
    images: HashMap<String, Bitmap>,
}

impl OverlaySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.png` in `dir`, keyed by file name without the extension.
    pub fn load_dir(dir: &Path) -> RelayResult<Self> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("read overlay dir '{}'", dir.display()))?;

        let mut set = Self::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("list overlay dir '{}'", dir.display()))?
                .path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("png") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let bytes = std::fs::read(&path)
                .with_context(|| format!("read overlay '{}'", path.display()))?;
            let bitmap = decode_image(&bytes).map_err(|e| {
                RelayError::decode(format!("overlay '{}': {e}", path.display()))
            })?;
            set.insert(name, bitmap);
        }

        tracing::info!(dir = %dir.display(), count = set.len(), "loaded overlay images");
        Ok(set)
    }

    pub fn insert(&mut self, name: impl Into<String>, bitmap: Bitmap) {
        self.images.insert(name.into(), bitmap);
    }

    pub fn get(&self, name: &str) -> RelayResult<&Bitmap> {
        self.images
            .get(name)
            .ok_or_else(|| RelayError::asset_not_found(format!("image '{name}' does not exist")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.images.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// System fonts plus any font files found in `extra_dir`.
///
/// When the system has no face for the generic sans-serif family, the first available
/// face stands in for it so labels still render.
pub fn load_fonts(extra_dir: Option<&Path>) -> Arc<usvg::fontdb::Database> {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    if let Some(dir) = extra_dir {
        load_fonts_from_dir(&mut db, dir);
    }

    let query = usvg::fontdb::Query {
        families: &[usvg::fontdb::Family::SansSerif],
        ..Default::default()
    };
    if db.query(&query).is_none() {
        let fallback = db
            .faces()
            .find_map(|face| face.families.first().map(|(name, _)| name.clone()));
        if let Some(family) = fallback {
            db.set_sans_serif_family(family);
        }
    }

    tracing::debug!(faces = db.len(), "font database ready");
    Arc::new(db)
}

fn load_fonts_from_dir(db: &mut usvg::fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            continue;
        }
        let _ = db.load_font_file(&path);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/postcard/overlays.rs"]
mod tests;
