//! Font asset discovery and loading

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rayon::prelude::*;
use read_fonts::tables::name::NameId;
use read_fonts::{FontRef, TableProvider};
use serde::Serialize;
use skrifa::instance::{LocationRef, Size};
use skrifa::{FontRef as SkrifaFontRef, MetadataProvider};
use walkdir::WalkDir;

use crate::error::UserError;
use crate::spec::{CaptionSpec, CharacterStyle};
use crate::user_error;

/// Advance used for whitespace the font does not map, as a share of the pixel size.
const FALLBACK_SPACE_ADVANCE: f32 = 0.25;

/// A font face loaded at the pixel size one character speaks in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedFont {
    pub path: PathBuf,
    pub index: u32,
    pub family: Option<String>,
    pub pixel_size: f32,
    pub ascent: f32,
    /// Negative below the baseline.
    pub descent: f32,
    pub leading: f32,
    #[serde(skip)]
    pub advances: HashMap<char, f32>,
}

impl LoadedFont {
    pub fn covers(&self, ch: char) -> bool {
        self.advances.contains_key(&ch)
    }

    pub fn advance(&self, ch: char) -> Option<f32> {
        match self.advances.get(&ch) {
            Some(advance) => Some(*advance),
            None if ch.is_whitespace() => Some(self.pixel_size * FALLBACK_SPACE_ADVANCE),
            None => None,
        }
    }

    /// Baseline-to-baseline distance before line spacing is applied.
    pub fn line_height(&self) -> f32 {
        self.ascent - self.descent + self.leading
    }

    /// Sum of advances; unmapped glyphs count as zero width.
    pub fn text_width(&self, text: &str) -> f32 {
        text.chars().filter_map(|ch| self.advance(ch)).sum()
    }

    /// Printable characters of `text` with no glyph in this face, sorted and deduplicated.
    pub fn missing_glyphs(&self, text: &str) -> Vec<char> {
        let mut missing: Vec<char> = text
            .chars()
            .filter(|ch| !ch.is_whitespace() && !self.covers(*ch))
            .collect();
        missing.sort_unstable();
        missing.dedup();
        missing
    }
}

/// Loaded fonts keyed by character name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontSet {
    fonts: BTreeMap<String, LoadedFont>,
}

impl FontSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, character: impl Into<String>, font: LoadedFont) {
        self.fonts.insert(character.into(), font);
    }

    pub fn get(&self, character: &str) -> Option<&LoadedFont> {
        self.fonts.get(character)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &LoadedFont)> {
        self.fonts.iter()
    }
}

impl FromIterator<(String, LoadedFont)> for FontSet {
    fn from_iter<I: IntoIterator<Item = (String, LoadedFont)>>(iter: I) -> Self {
        Self {
            fonts: iter.into_iter().collect(),
        }
    }
}

/// Where font files for characters can come from.
///
/// Lookup order for a character: its explicit `font`, then a file in the
/// fonts directory whose stem matches the character name (ignoring case),
/// then the spec-wide default font.
#[derive(Debug, Clone, Default)]
pub struct FontAssets {
    base_dir: PathBuf,
    by_stem: HashMap<String, PathBuf>,
    default_font: Option<PathBuf>,
}

impl FontAssets {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn from_spec(spec: &CaptionSpec) -> Result<Self, UserError> {
        Ok(Self::new(&spec.base_dir)
            .with_fonts_dir(&spec.fonts_dir())?
            .with_default_font(spec.default_font()))
    }

    /// Index every font file below `dir`. A missing directory indexes nothing.
    pub fn with_fonts_dir(mut self, dir: &Path) -> Result<Self, UserError> {
        if !dir.exists() {
            debug!("fonts directory {} does not exist", dir.display());
            return Ok(self);
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|err| {
                user_error!("failed to scan fonts directory {}: {err}", dir.display())
            })?;
            if entry.file_type().is_file() && is_font(entry.path()) {
                found.push(entry.into_path());
            }
        }

        for path in found {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                self.by_stem.entry(stem.to_lowercase()).or_insert(path);
            }
        }

        debug!(
            "indexed {} font file(s) in {}",
            self.by_stem.len(),
            dir.display()
        );
        Ok(self)
    }

    pub fn with_default_font(mut self, path: Option<PathBuf>) -> Self {
        self.default_font = path;
        self
    }

    /// Pick the font file for one character.
    pub fn locate(&self, name: &str, style: &CharacterStyle) -> Result<PathBuf, UserError> {
        if let Some(font) = &style.font {
            return Ok(if font.is_absolute() {
                font.clone()
            } else {
                self.base_dir.join(font)
            });
        }

        if let Some(path) = self.by_stem.get(&name.to_lowercase()) {
            return Ok(path.clone());
        }

        self.default_font
            .clone()
            .ok_or_else(|| user_error!("no font asset for character '{name}'"))
    }
}

/// Load one font per character, sized at `base_font_height * style.height`.
///
/// Files are parsed in parallel; when several fail, the error of the first
/// character in name order is reported.
pub fn load_fonts(
    characters: &BTreeMap<String, CharacterStyle>,
    base_font_height: f32,
    assets: &FontAssets,
) -> Result<FontSet, UserError> {
    let jobs: Vec<(&String, &CharacterStyle)> = characters.iter().collect();

    let loaded: Vec<Result<(String, LoadedFont), UserError>> = jobs
        .par_iter()
        .map(|(name, style)| {
            let path = assets.locate(name, style)?;
            let font = load_font(name, &path, style.index, style.pixel_size(base_font_height))?;
            Ok((name.to_string(), font))
        })
        .collect();

    let fonts = loaded.into_iter().collect::<Result<FontSet, UserError>>()?;
    info!("loaded {} font(s)", fonts.len());
    Ok(fonts)
}

/// Read and measure a single face; `character` only labels error messages.
pub fn load_font(
    character: &str,
    path: &Path,
    index: u32,
    pixel_size: f32,
) -> Result<LoadedFont, UserError> {
    let data = fs::read(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => user_error!(
            "font for character '{character}' not found: {}",
            path.display()
        ),
        _ => user_error!(
            "failed to read font for character '{character}' ({}): {err}",
            path.display()
        ),
    })?;

    let font =
        FontRef::from_index(&data, index).map_err(|err| invalid_font(character, path, err))?;
    let sfont = SkrifaFontRef::from_index(&data, index)
        .map_err(|err| invalid_font(character, path, err))?;

    let size = Size::new(pixel_size);
    let metrics = sfont.metrics(size, LocationRef::default());
    let glyph_metrics = sfont.glyph_metrics(size, LocationRef::default());

    let advances: HashMap<char, f32> = sfont
        .charmap()
        .mappings()
        .filter_map(|(cp, gid)| {
            let ch = char::from_u32(cp)?;
            Some((ch, glyph_metrics.advance_width(gid).unwrap_or(0.0)))
        })
        .collect();

    let family = family_name(&font);
    debug!(
        "loaded {} for '{character}' ({} glyphs mapped, {pixel_size}px)",
        path.display(),
        advances.len()
    );

    Ok(LoadedFont {
        path: path.to_path_buf(),
        index,
        family,
        pixel_size,
        ascent: metrics.ascent,
        descent: metrics.descent,
        leading: metrics.leading,
        advances,
    })
}

fn invalid_font(character: &str, path: &Path, err: impl std::fmt::Display) -> UserError {
    user_error!(
        "font for character '{character}' is not a valid font ({}): {err}",
        path.display()
    )
}

fn family_name(font: &FontRef) -> Option<String> {
    let name_table = font.name().ok()?;
    let data = name_table.string_data();
    let wanted = [NameId::TYPOGRAPHIC_FAMILY_NAME, NameId::FAMILY_NAME];

    for id in wanted {
        for record in name_table.name_record() {
            if !record.is_unicode() || record.name_id() != id {
                continue;
            }
            if let Ok(entry) = record.string(data) {
                let rendered = entry.to_string();
                if !rendered.trim().is_empty() {
                    return Some(rendered.trim().to_string());
                }
            }
        }
    }

    None
}

fn is_font(path: &Path) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return false,
    };

    matches!(ext.as_str(), "ttf" | "otf" | "ttc" | "otc")
}
