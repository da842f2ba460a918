//! Spec file parsing and validation

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use log::debug;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::UserError;
use crate::user_error;

pub const DEFAULT_LINE_SPACING: f32 = 1.2;
pub const DEFAULT_MARGIN: f32 = 16.0;
pub const DEFAULT_OUTPUT: &str = "captions.json";
pub const DEFAULT_FONTS_DIR: &str = "fonts";

/// Parsed and validated contents of a spec file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSpec {
    #[serde(deserialize_with = "deserialize_characters")]
    pub characters: BTreeMap<String, CharacterStyle>,
    pub text: TextSettings,
    #[serde(default)]
    pub input: InputSection,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub fonts: FontsSection,
    /// Directory relative paths are resolved against (the spec file's parent).
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// A single `{ value = ... }` entry of the `[text]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting<T> {
    pub value: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSettings {
    pub base_font_height: Setting<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_spacing: Option<Setting<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_line_width: Option<Setting<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<Setting<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_gap: Option<Setting<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Setting<Alignment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_font: Option<Setting<PathBuf>>,
}

impl TextSettings {
    pub fn base_font_height(&self) -> f32 {
        self.base_font_height.value
    }

    pub fn line_spacing(&self) -> f32 {
        self.line_spacing
            .as_ref()
            .map_or(DEFAULT_LINE_SPACING, |s| s.value)
    }

    pub fn max_line_width(&self) -> Option<f32> {
        self.max_line_width.as_ref().map(|s| s.value)
    }

    pub fn margin(&self) -> f32 {
        self.margin.as_ref().map_or(DEFAULT_MARGIN, |s| s.value)
    }

    /// Vertical space between two captions; half the base height unless set.
    pub fn caption_gap(&self) -> f32 {
        self.caption_gap
            .as_ref()
            .map_or(self.base_font_height() / 2.0, |s| s.value)
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment.as_ref().map(|s| s.value).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

/// Per-character styling. Every field is optional in the spec file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<PathBuf>,
    /// Face index inside a TTC/OTC collection.
    pub index: u32,
    /// Height relative to `text.base_font_height`.
    pub height: f32,
    pub color: Color,
    pub stroke_width: f32,
    pub stroke_color: Color,
}

impl CharacterStyle {
    /// Base height scaled by this character's relative height.
    pub fn pixel_size(&self, base_font_height: f32) -> f32 {
        base_font_height * self.height
    }
}

impl Default for CharacterStyle {
    fn default() -> Self {
        Self {
            font: None,
            index: 0,
            height: 1.0,
            color: Color::BLACK,
            stroke_width: 0.0,
            stroke_color: Color::WHITE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSection {
    /// Dialogue script; without one every character is previewed by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<PathBuf>,
    /// Background image recorded in the output document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub path: PathBuf,
    pub format: OutputFormat,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_OUTPUT),
            format: OutputFormat::default(),
        }
    }
}

/// Layout document encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One pretty-printed JSON document.
    #[default]
    Json,
    /// Canvas header line followed by one caption per line.
    Ndjson,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontsSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl CaptionSpec {
    /// Read, parse and validate a spec file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, UserError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => user_error!("spec file not found: {}", path.display()),
            _ => user_error!("failed to read spec file {}: {err}", path.display()),
        })?;

        let mut spec = Self::from_toml_str(&raw)
            .map_err(|err| user_error!("invalid spec file {}: {err}", path.display()))?;
        spec.base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        debug!(
            "loaded spec {} with {} character(s)",
            path.display(),
            spec.characters.len()
        );
        Ok(spec)
    }

    /// Parse and validate spec text. Relative paths resolve against `.`.
    pub fn from_toml_str(raw: &str) -> Result<Self, UserError> {
        let mut spec: CaptionSpec =
            toml::from_str(raw).map_err(|err| UserError::new(err.message().to_string()))?;
        spec.base_dir = PathBuf::from(".");
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), UserError> {
        if self.characters.is_empty() {
            return Err(user_error!("characters must not be empty"));
        }

        for (name, style) in &self.characters {
            if name.trim().is_empty() {
                return Err(user_error!("character names must not be blank"));
            }
            if name.contains(['[', ']']) {
                return Err(user_error!(
                    "character name '{name}' cannot contain square brackets"
                ));
            }
            ensure_positive(&format!("characters.{name}.height"), style.height)?;
            ensure_non_negative(&format!("characters.{name}.stroke_width"), style.stroke_width)?;
        }

        ensure_positive("text.base_font_height.value", self.text.base_font_height())?;
        ensure_positive("text.line_spacing.value", self.text.line_spacing())?;
        if let Some(width) = self.text.max_line_width() {
            ensure_positive("text.max_line_width.value", width)?;
        }
        ensure_non_negative("text.margin.value", self.text.margin())?;
        ensure_non_negative("text.caption_gap.value", self.text.caption_gap())?;

        Ok(())
    }

    /// Join a spec-relative path onto the spec directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn fonts_dir(&self) -> PathBuf {
        let dir = self
            .fonts
            .dir
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_FONTS_DIR));
        self.resolve(dir)
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output.path)
    }

    pub fn script_path(&self) -> Option<PathBuf> {
        self.input.script.as_deref().map(|p| self.resolve(p))
    }

    pub fn image_path(&self) -> Option<PathBuf> {
        self.input.image.as_deref().map(|p| self.resolve(p))
    }

    pub fn default_font(&self) -> Option<PathBuf> {
        self.text
            .default_font
            .as_ref()
            .map(|s| self.resolve(&s.value))
    }

    /// Render the resolved spec back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serializing spec to TOML")
    }
}

fn ensure_positive(field: &str, value: f32) -> Result<(), UserError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(user_error!("{field} must be a positive number, got {value}"))
    }
}

fn ensure_non_negative(field: &str, value: f32) -> Result<(), UserError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(user_error!("{field} must not be negative, got {value}"))
    }
}

fn deserialize_characters<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, CharacterStyle>, D::Error>
where
    D: Deserializer<'de>,
{
    struct CharactersVisitor;

    impl<'de> Visitor<'de> for CharactersVisitor {
        type Value = BTreeMap<String, CharacterStyle>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of character names or a table of character styles")
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut out = BTreeMap::new();
            while let Some(name) = seq.next_element::<String>()? {
                if out.insert(name.clone(), CharacterStyle::default()).is_some() {
                    return Err(de::Error::custom(format!("duplicate character '{name}'")));
                }
            }
            Ok(out)
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut out = BTreeMap::new();
            while let Some((name, style)) = map.next_entry::<String, CharacterStyle>()? {
                out.insert(name, style);
            }
            Ok(out)
        }
    }

    deserializer.deserialize_any(CharactersVisitor)
}

/// RGBA colour written as `#rgb`, `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }
}

impl FromStr for Color {
    type Err = UserError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || user_error!("invalid colour '{raw}', expected #rgb, #rrggbb or #rrggbbaa");
        let hex = raw.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let nibble = |i: usize| {
            u8::from_str_radix(&hex[i..i + 1], 16)
                .map(|v| v * 17)
                .map_err(|_| invalid())
        };

        match hex.len() {
            3 => Ok(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            6 => Ok(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Color {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = UserError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 0xff {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}
