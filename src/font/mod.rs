//! # Font Management
//!
//! Maps the converter's logical font families to concrete PDF fonts and
//! measures text with their metrics.
//!
//! By default every family resolves to one of the standard PDF fonts
//! (Helvetica, Courier), which need no embedding. A font directory can
//! supply TrueType replacements; those are parsed with ttf-parser and
//! embedded by the PDF writer.

pub mod metrics;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::ConvertError;
pub use metrics::StandardFontMetrics;

/// Logical font families used by the layout engine.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum FontFamily {
    /// Body text.
    Common,
    /// Author and title on the cover page.
    Cover,
    /// Section titles.
    Title,
    /// Subtitles.
    Subtitle,
    /// Page numbers.
    Mono,
}

impl FontFamily {
    pub fn name(self) -> &'static str {
        match self {
            FontFamily::Common => "common",
            FontFamily::Cover => "cover",
            FontFamily::Title => "title",
            FontFamily::Subtitle => "subtitle",
            FontFamily::Mono => "mono",
        }
    }
}

/// One of the four emphasis combinations of a family.
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum FontVariant {
    #[default]
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontVariant {
    pub fn from_flags(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => FontVariant::Regular,
            (true, false) => FontVariant::Bold,
            (false, true) => FontVariant::Italic,
            (true, true) => FontVariant::BoldItalic,
        }
    }

    pub fn is_bold(self) -> bool {
        matches!(self, FontVariant::Bold | FontVariant::BoldItalic)
    }

    pub fn is_italic(self) -> bool {
        matches!(self, FontVariant::Italic | FontVariant::BoldItalic)
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct FontKey {
    pub family: FontFamily,
    pub variant: FontVariant,
}

impl FontKey {
    pub fn new(family: FontFamily, variant: FontVariant) -> Self {
        Self { family, variant }
    }
}

#[derive(Debug, Clone)]
pub enum FontData {
    /// One of the standard PDF fonts. No embedding needed.
    Standard(StandardFont),
    /// A TrueType font that needs to be embedded.
    Custom {
        data: Vec<u8>,
        metrics: CustomFontMetrics,
    },
}

/// Parsed metrics from a TrueType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    /// Maps characters to their glyph IDs.
    pub glyph_ids: HashMap<char, u16>,
    pub ascender: i16,
    pub descender: i16,
    pub cap_height: i16,
    /// `[x_min, y_min, x_max, y_max]` in font units.
    pub bbox: [i16; 4],
}

impl CustomFontMetrics {
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    /// Parse metrics from font data. Only the Basic Multilingual Plane is
    /// sampled.
    pub fn from_font_data(data: &[u8]) -> Result<Self, ttf_parser::FaceParsingError> {
        let face = ttf_parser::Face::parse(data, 0)?;
        let units_per_em = face.units_per_em();
        let ascender = face.ascender();
        let descender = face.descender();
        let cap_height = face.capital_height().unwrap_or(ascender);
        let bbox = face.global_bounding_box();

        let mut advance_widths = HashMap::new();
        let mut glyph_ids = HashMap::new();
        let mut default_advance = 0u16;

        for code in 32u32..=0xFFFF {
            let Some(ch) = char::from_u32(code) else {
                continue;
            };
            if let Some(glyph_id) = face.glyph_index(ch) {
                let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                advance_widths.insert(ch, advance);
                glyph_ids.insert(ch, glyph_id.0);
                if ch == ' ' {
                    default_advance = advance;
                }
            }
        }

        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        Ok(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            glyph_ids,
            ascender,
            descender,
            cap_height,
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
        })
    }
}

/// The standard PDF fonts the preset maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    pub fn metrics(&self) -> StandardFontMetrics {
        match self {
            Self::Helvetica | Self::HelveticaOblique => metrics::HELVETICA,
            Self::HelveticaBold | Self::HelveticaBoldOblique => metrics::HELVETICA_BOLD,
            _ => metrics::COURIER,
        }
    }

    /// Default face for a logical font. Title and subtitle faces are bold
    /// even in their regular variant.
    fn for_key(key: FontKey) -> Self {
        let (bold, italic) = (key.variant.is_bold(), key.variant.is_italic());
        match key.family {
            FontFamily::Mono => match (bold, italic) {
                (false, false) => Self::Courier,
                (true, false) => Self::CourierBold,
                (false, true) => Self::CourierOblique,
                (true, true) => Self::CourierBoldOblique,
            },
            FontFamily::Title | FontFamily::Subtitle => {
                if italic {
                    Self::HelveticaBoldOblique
                } else {
                    Self::HelveticaBold
                }
            }
            FontFamily::Common | FontFamily::Cover => match (bold, italic) {
                (false, false) => Self::Helvetica,
                (true, false) => Self::HelveticaBold,
                (false, true) => Self::HelveticaOblique,
                (true, true) => Self::HelveticaBoldOblique,
            },
        }
    }
}

/// File names looked up in a font directory, and the logical font each
/// one replaces.
pub const FONT_FILES: &[(&str, FontFamily, FontVariant)] = &[
    ("common-regular.ttf", FontFamily::Common, FontVariant::Regular),
    ("common-bold.ttf", FontFamily::Common, FontVariant::Bold),
    ("common-italic.ttf", FontFamily::Common, FontVariant::Italic),
    ("common-bolditalic.ttf", FontFamily::Common, FontVariant::BoldItalic),
    ("cover-regular.ttf", FontFamily::Cover, FontVariant::Regular),
    ("cover-bold.ttf", FontFamily::Cover, FontVariant::Bold),
    ("title.ttf", FontFamily::Title, FontVariant::Regular),
    ("subtitle.ttf", FontFamily::Subtitle, FontVariant::Regular),
    ("mono.ttf", FontFamily::Mono, FontVariant::Regular),
];

/// Maps every logical font to its data.
pub struct FontRegistry {
    fonts: HashMap<FontKey, FontData>,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    /// A registry where every family and variant resolves to a standard font.
    pub fn new() -> Self {
        let families = [
            FontFamily::Common,
            FontFamily::Cover,
            FontFamily::Title,
            FontFamily::Subtitle,
            FontFamily::Mono,
        ];
        let variants = [
            FontVariant::Regular,
            FontVariant::Bold,
            FontVariant::Italic,
            FontVariant::BoldItalic,
        ];

        let mut fonts = HashMap::new();
        for family in families {
            for variant in variants {
                let key = FontKey::new(family, variant);
                fonts.insert(key, FontData::Standard(StandardFont::for_key(key)));
            }
        }
        Self { fonts }
    }

    pub fn resolve(&self, key: FontKey) -> &FontData {
        // Every key is populated in `new`, and `register` only replaces.
        &self.fonts[&key]
    }

    /// Replace a logical font with TrueType data.
    pub fn register(
        &mut self,
        key: FontKey,
        data: Vec<u8>,
    ) -> Result<(), ttf_parser::FaceParsingError> {
        let metrics = CustomFontMetrics::from_font_data(&data)?;
        self.fonts.insert(key, FontData::Custom { data, metrics });
        Ok(())
    }

    /// Register every known font file present in `dir`. Returns how many
    /// were loaded. Missing files keep their standard default.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, ConvertError> {
        let mut loaded = 0;
        for &(file_name, family, variant) in FONT_FILES {
            let path = dir.join(file_name);
            if !path.is_file() {
                continue;
            }
            let data = fs::read(&path).map_err(|e| ConvertError::FontLoad {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            self.register(FontKey::new(family, variant), data)
                .map_err(|e| ConvertError::FontLoad {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            tracing::debug!("embedded font {} for {}", path.display(), family.name());
            loaded += 1;
        }
        Ok(loaded)
    }
}

/// Shared font context used by the document builder and PDF serialization.
pub struct FontContext {
    registry: FontRegistry,
}

impl Default for FontContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FontContext {
    pub fn new() -> Self {
        Self {
            registry: FontRegistry::new(),
        }
    }

    pub fn with_registry(registry: FontRegistry) -> Self {
        Self { registry }
    }

    pub fn char_width(&self, ch: char, key: FontKey, font_size: f64) -> f64 {
        match self.registry.resolve(key) {
            FontData::Standard(std_font) => std_font.metrics().char_width(ch, font_size),
            FontData::Custom { metrics, .. } => metrics.char_width(ch, font_size),
        }
    }

    /// Measure the width of a string, in the unit `font_size` is given in.
    pub fn measure_string(&self, text: &str, key: FontKey, font_size: f64) -> f64 {
        match self.registry.resolve(key) {
            FontData::Standard(std_font) => std_font.metrics().measure_string(text, font_size, 0.0),
            FontData::Custom { metrics, .. } => {
                text.chars().map(|ch| metrics.char_width(ch, font_size)).sum()
            }
        }
    }

    pub fn resolve(&self, key: FontKey) -> &FontData {
        self.registry.resolve(key)
    }

    pub fn registry(&self) -> &FontRegistry {
        &self.registry
    }
}
